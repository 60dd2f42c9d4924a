//! Inline rules of a network ACL.

use serde::{Deserialize, Serialize};

use crate::api::types::PortRange;
use crate::api::{
    NetworkAclRule, NetworkAclRulePrototype, RuleAction, RuleDirection, RuleProtocol, VpcApi,
};
use crate::error::{ProviderError, Scope};
use crate::pagination::collect_pages;
use crate::resources::validation;

const PORT_MIN: i64 = 1;
const PORT_MAX: i64 = 65535;

const fn default_port_min() -> i64 {
    PORT_MIN
}

const fn default_port_max() -> i64 {
    PORT_MAX
}

/// ICMP match parameters.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct IcmpSpec {
    /// ICMP type, 0-254; absent matches every type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub icmp_type: Option<i64>,
    /// ICMP code, 0-255; absent matches every code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

/// TCP or UDP port bounds. Unset bounds default to the full port range.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PortSpec {
    /// Lowest destination port.
    #[serde(default = "default_port_min")]
    pub port_min: i64,
    /// Highest destination port.
    #[serde(default = "default_port_max")]
    pub port_max: i64,
    /// Lowest source port.
    #[serde(default = "default_port_min")]
    pub source_port_min: i64,
    /// Highest source port.
    #[serde(default = "default_port_max")]
    pub source_port_max: i64,
}

impl Default for PortSpec {
    fn default() -> Self {
        Self {
            port_min: PORT_MIN,
            port_max: PORT_MAX,
            source_port_min: PORT_MIN,
            source_port_max: PORT_MAX,
        }
    }
}

/// User-supplied rule. At most one of `icmp`, `tcp`, and `udp` may be set;
/// none means all protocols.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RuleSpec {
    /// Rule name.
    pub name: String,
    /// `allow` or `deny`.
    pub action: String,
    /// `inbound` or `outbound`, case-insensitive.
    pub direction: String,
    /// Source IP address or CIDR block.
    pub source: String,
    /// Destination IP address or CIDR block.
    pub destination: String,
    /// ICMP parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp: Option<IcmpSpec>,
    /// TCP port bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<PortSpec>,
    /// UDP port bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<PortSpec>,
}

/// Rule as reported in resource state.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RuleState {
    /// Rule identifier.
    pub id: String,
    /// IP version the rule applies to.
    pub ip_version: String,
    /// Number of subnets the owning ACL is attached to.
    pub subnets: usize,
    /// Configurable fields.
    #[serde(flatten)]
    pub rule: RuleSpec,
}

impl RuleState {
    /// Maps an API rule into state.
    #[must_use]
    pub fn from_api(rule: &NetworkAclRule, subnets: usize) -> Self {
        let (icmp, tcp, udp) = match rule.protocol {
            RuleProtocol::All => (None, None, None),
            RuleProtocol::Icmp { icmp_type, code } => {
                let spec = match (icmp_type, code) {
                    (Some(kind), Some(value)) => IcmpSpec {
                        icmp_type: Some(i64::from(kind)),
                        code: Some(i64::from(value)),
                    },
                    _ => IcmpSpec::default(),
                };
                (Some(spec), None, None)
            }
            RuleProtocol::Tcp(ports) => (None, Some(port_spec(ports)), None),
            RuleProtocol::Udp(ports) => (None, None, Some(port_spec(ports))),
        };
        Self {
            id: rule.id.clone(),
            ip_version: rule.ip_version.clone(),
            subnets,
            rule: RuleSpec {
                name: rule.name.clone(),
                action: rule.action.to_string(),
                direction: rule.direction.to_string(),
                source: rule.source.clone(),
                destination: rule.destination.clone(),
                icmp,
                tcp,
                udp,
            },
        }
    }
}

fn port_spec(ports: PortRange) -> PortSpec {
    PortSpec {
        port_min: i64::from(ports.destination_port_min),
        port_max: i64::from(ports.destination_port_max),
        source_port_min: i64::from(ports.source_port_min),
        source_port_max: i64::from(ports.source_port_max),
    }
}

fn port_range(index: usize, ports: PortSpec) -> Result<PortRange, String> {
    let bound = |field: &str, value: i64| {
        validation::int_between(&format!("rules[{index}].{field}"), value, 1_u16, 65535_u16)
    };
    Ok(PortRange {
        destination_port_min: bound("port_min", ports.port_min)?,
        destination_port_max: bound("port_max", ports.port_max)?,
        source_port_min: bound("source_port_min", ports.source_port_min)?,
        source_port_max: bound("source_port_max", ports.source_port_max)?,
    })
}

fn protocol_of(index: usize, spec: &RuleSpec) -> Result<RuleProtocol, String> {
    match (spec.icmp, spec.tcp, spec.udp) {
        (None, None, None) => Ok(RuleProtocol::All),
        (Some(icmp), None, None) => Ok(RuleProtocol::Icmp {
            icmp_type: icmp
                .icmp_type
                .map(|value| {
                    let field = format!("rules[{index}].icmp.type");
                    validation::int_between(&field, value, 0_u8, 254_u8)
                })
                .transpose()?,
            code: icmp
                .code
                .map(|value| {
                    let field = format!("rules[{index}].icmp.code");
                    validation::int_between(&field, value, 0_u8, 255_u8)
                })
                .transpose()?,
        }),
        (None, Some(tcp), None) => Ok(RuleProtocol::Tcp(port_range(index, tcp)?)),
        (None, None, Some(udp)) => Ok(RuleProtocol::Udp(port_range(index, udp)?)),
        _ => Err(format!(
            "rules[{index}]: only one of icmp|tcp|udp can be defined per rule"
        )),
    }
}

impl RuleSpec {
    /// Validates the rule and builds its creation request.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending field of `rules[index]`.
    pub fn to_prototype(&self, index: usize) -> Result<NetworkAclRulePrototype, String> {
        validation::resource_name(&format!("rules[{index}].name"), &self.name)?;
        let action = self
            .action
            .parse::<RuleAction>()
            .map_err(|err: String| format!("rules[{index}]: {err}"))?;
        let direction = self
            .direction
            .parse::<RuleDirection>()
            .map_err(|err: String| format!("rules[{index}]: {err}"))?;
        let protocol = protocol_of(index, self)?;
        validation::ip_or_cidr(&format!("rules[{index}].source"), &self.source)?;
        validation::ip_or_cidr(&format!("rules[{index}].destination"), &self.destination)?;
        Ok(NetworkAclRulePrototype {
            name: self.name.clone(),
            action,
            direction,
            source: self.source.clone(),
            destination: self.destination.clone(),
            before: None,
            protocol,
        })
    }
}

/// Validates every rule, in order.
///
/// # Errors
///
/// Returns the first validation message.
pub fn to_prototypes(rules: &[RuleSpec]) -> Result<Vec<NetworkAclRulePrototype>, String> {
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| rule.to_prototype(index))
        .collect()
}

/// Reports whether the rules held in state already implement `desired`.
///
/// Both sides are compared as creation requests, so the case of a direction
/// or an ICMP block that sets only one of type and code is not a change.
#[must_use]
pub fn rules_match(current: &[RuleState], desired: &[NetworkAclRulePrototype]) -> bool {
    current.len() == desired.len()
        && current
            .iter()
            .zip(desired)
            .enumerate()
            .all(|(index, (state, wanted))| {
                state
                    .rule
                    .to_prototype(index)
                    .is_ok_and(|have| comparable(have) == comparable(wanted.clone()))
            })
}

/// The API only narrows ICMP rules when both type and code are present.
fn comparable(mut prototype: NetworkAclRulePrototype) -> NetworkAclRulePrototype {
    if matches!(
        prototype.protocol,
        RuleProtocol::Icmp {
            icmp_type: Some(_),
            code: None
        } | RuleProtocol::Icmp {
            icmp_type: None,
            code: Some(_)
        }
    ) {
        prototype.protocol = RuleProtocol::Icmp {
            icmp_type: None,
            code: None,
        };
    }
    prototype
}

/// Deletes every rule of the ACL, following pagination.
///
/// # Errors
///
/// Returns [`ProviderError::Remote`] when listing or deleting fails.
pub async fn clear_rules(
    api: &dyn VpcApi,
    acl_id: &str,
    scope: Scope,
) -> Result<(), ProviderError> {
    let rules = collect_pages(|start| async move {
        api.list_network_acl_rules(acl_id, start.as_deref()).await
    })
    .await
    .map_err(|err| scope.remote("list_network_acl_rules", err))?;

    tracing::debug!(acl = %acl_id, count = rules.len(), "clearing rules");
    for rule in &rules {
        api.delete_network_acl_rule(acl_id, &rule.id)
            .await
            .map_err(|err| scope.remote("delete_network_acl_rule", err))?;
    }
    Ok(())
}

/// Creates rules in order, each appended after the previous one.
///
/// # Errors
///
/// Returns [`ProviderError::Remote`] when a creation fails; earlier rules
/// stay in place.
pub async fn create_rules(
    api: &dyn VpcApi,
    acl_id: &str,
    prototypes: &[NetworkAclRulePrototype],
    scope: Scope,
) -> Result<(), ProviderError> {
    for prototype in prototypes {
        let created = api
            .create_network_acl_rule(acl_id, prototype)
            .await
            .map_err(|err| scope.remote("create_network_acl_rule", err))?;
        tracing::debug!(acl = %acl_id, rule = %created.id, "rule created");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn api_rule(protocol: RuleProtocol) -> NetworkAclRule {
        NetworkAclRule {
            id: String::from("rule-1"),
            name: String::from("r"),
            action: RuleAction::Deny,
            direction: RuleDirection::Outbound,
            ip_version: String::from("ipv4"),
            source: String::from("0.0.0.0/0"),
            destination: String::from("0.0.0.0/0"),
            protocol,
        }
    }

    #[rstest]
    #[case(Some(8), Some(0), IcmpSpec { icmp_type: Some(8), code: Some(0) })]
    #[case(Some(8), None, IcmpSpec::default())]
    #[case(None, None, IcmpSpec::default())]
    fn icmp_fields_are_kept_only_in_pairs(
        #[case] icmp_type: Option<u8>,
        #[case] code: Option<u8>,
        #[case] expected: IcmpSpec,
    ) {
        let state = RuleState::from_api(&api_rule(RuleProtocol::Icmp { icmp_type, code }), 3);
        assert_eq!(state.rule.icmp, Some(expected));
        assert_eq!(state.subnets, 3);
        assert_eq!(state.rule.action, "deny");
    }

    #[test]
    fn unset_ports_default_to_full_range() {
        let spec: RuleSpec = serde_json::from_value(serde_json::json!({
            "name": "web",
            "action": "allow",
            "direction": "inbound",
            "source": "0.0.0.0/0",
            "destination": "10.0.0.0/24",
            "udp": { "port_min": 53, "port_max": 53 }
        }))
        .expect("rule decodes");

        let prototype = spec.to_prototype(0).expect("rule is valid");
        assert_eq!(
            prototype.protocol,
            RuleProtocol::Udp(PortRange {
                destination_port_min: 53,
                destination_port_max: 53,
                source_port_min: 1,
                source_port_max: 65535,
            })
        );
    }

    #[rstest]
    #[case::direction_case("Inbound", None)]
    #[case::icmp_type_only("inbound", Some(IcmpSpec { icmp_type: Some(8), code: None }))]
    #[case::icmp_code_only("INBOUND", Some(IcmpSpec { icmp_type: None, code: Some(0) }))]
    fn normalised_rules_match_their_state(
        #[case] direction: &str,
        #[case] icmp: Option<IcmpSpec>,
    ) {
        let spec = RuleSpec {
            name: String::from("ping"),
            action: String::from("allow"),
            direction: direction.to_owned(),
            source: String::from("0.0.0.0/0"),
            destination: String::from("10.0.0.0/24"),
            icmp,
            tcp: None,
            udp: None,
        };
        let desired = to_prototypes(std::slice::from_ref(&spec)).expect("rule is valid");
        let Some(first) = desired.first() else {
            panic!("one prototype expected");
        };
        let stored = NetworkAclRule {
            id: String::from("rule-1"),
            name: first.name.clone(),
            action: first.action,
            direction: first.direction,
            ip_version: String::from("ipv4"),
            source: first.source.clone(),
            destination: first.destination.clone(),
            protocol: first.protocol,
        };
        let state = [RuleState::from_api(&stored, 0)];

        assert!(rules_match(&state, &desired));
    }

    #[test]
    fn changed_or_missing_rules_do_not_match() {
        let spec = RuleSpec {
            name: String::from("ping"),
            action: String::from("allow"),
            direction: String::from("inbound"),
            source: String::from("0.0.0.0/0"),
            destination: String::from("10.0.0.0/24"),
            icmp: Some(IcmpSpec {
                icmp_type: Some(8),
                code: Some(0),
            }),
            tcp: None,
            udp: None,
        };
        let state = [RuleState::from_api(
            &api_rule(RuleProtocol::Icmp {
                icmp_type: Some(8),
                code: Some(0),
            }),
            0,
        )];
        let desired = to_prototypes(std::slice::from_ref(&spec)).expect("rule is valid");

        assert!(!rules_match(&state, &desired));
        assert!(!rules_match(&[], &desired));
    }

    #[test]
    fn out_of_range_port_names_the_field() {
        let spec = RuleSpec {
            name: String::from("web"),
            action: String::from("allow"),
            direction: String::from("inbound"),
            source: String::from("0.0.0.0/0"),
            destination: String::from("0.0.0.0/0"),
            icmp: None,
            tcp: Some(PortSpec {
                port_max: 70000,
                ..PortSpec::default()
            }),
            udp: None,
        };
        let err = spec.to_prototype(2).expect_err("port rejected");
        assert!(err.contains("rules[2].port_max"), "{err}");
    }
}
