//! Test support utilities shared across unit and integration tests.
//!
//! [`FakeVpcApi`] and [`FakeTagApi`] are in-memory stand-ins for the remote
//! APIs. They record every mutating call and can be scripted to return
//! failures, paginate aggressively, or report a sequence of statuses.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};

use tokio::sync::{Mutex, MutexGuard};

use crate::api::types::{Reference, ZoneReference};
use crate::api::{
    ApiError, ApiFuture, CodeEngineFunction, FloatingIp, ImageExportJob, InstanceGroupManager,
    NetworkAcl, NetworkAclPatch, NetworkAclPrototype, NetworkAclRule, NetworkAclRulePrototype,
    Page, RuleAction, RuleDirection, RuleProtocol, TagApi, TagKind, VpcApi,
};

const DEFAULT_PAGE_SIZE: usize = 2;

#[derive(Default)]
struct VpcState {
    next_id: u64,
    acls: BTreeMap<String, NetworkAcl>,
    default_rules: Option<Vec<NetworkAclRulePrototype>>,
    page_size: Option<usize>,
    managers: BTreeMap<String, Vec<InstanceGroupManager>>,
    floating_ips: BTreeMap<String, FloatingIp>,
    attachments: BTreeMap<(String, String, String), FloatingIp>,
    status_scripts: BTreeMap<String, VecDeque<String>>,
    add_status: Option<String>,
    removal_lag: u32,
    removing: BTreeMap<(String, String, String), u32>,
    export_jobs: BTreeMap<(String, String), ImageExportJob>,
    functions: BTreeMap<(String, String), CodeEngineFunction>,
    failures: BTreeMap<&'static str, VecDeque<ApiError>>,
    calls: Vec<String>,
}

impl VpcState {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn take_failure(&mut self, op: &'static str) -> Option<ApiError> {
        self.failures.get_mut(op).and_then(VecDeque::pop_front)
    }

    fn rule_from(&mut self, prototype: &NetworkAclRulePrototype) -> NetworkAclRule {
        NetworkAclRule {
            id: self.fresh_id("rule"),
            name: prototype.name.clone(),
            action: prototype.action,
            direction: prototype.direction,
            ip_version: String::from("ipv4"),
            source: prototype.source.clone(),
            destination: prototype.destination.clone(),
            protocol: prototype.protocol,
        }
    }
}

fn page_of<T: Clone>(items: &[T], start: Option<&str>, size: usize) -> Page<T> {
    let offset = start.and_then(|raw| raw.parse::<usize>().ok()).unwrap_or(0);
    let end = offset + size;
    Page {
        items: items.iter().skip(offset).take(size).cloned().collect(),
        next: (end < items.len()).then(|| end.to_string()),
    }
}

fn default_acl_rules() -> Vec<NetworkAclRulePrototype> {
    [RuleDirection::Inbound, RuleDirection::Outbound]
        .into_iter()
        .map(|direction| NetworkAclRulePrototype {
            name: format!("allow-{direction}"),
            action: RuleAction::Allow,
            direction,
            source: String::from("0.0.0.0/0"),
            destination: String::from("0.0.0.0/0"),
            before: None,
            protocol: RuleProtocol::All,
        })
        .collect()
}

fn missing(kind: &str, id: &str) -> ApiError {
    ApiError::not_found(format!("{kind} {id} not found"))
}

/// In-memory [`VpcApi`].
#[derive(Default)]
pub struct FakeVpcApi {
    state: StdMutex<VpcState>,
}

impl FakeVpcApi {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StdMutexGuard<'_, VpcState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the rules the server adds to every new ACL.
    pub fn set_default_rules(&self, rules: Vec<NetworkAclRulePrototype>) {
        self.lock().default_rules = Some(rules);
    }

    /// Sets how many items each list page holds.
    pub fn set_page_size(&self, size: usize) {
        self.lock().page_size = Some(size.max(1));
    }

    /// Seeds an existing ACL.
    pub fn insert_acl(&self, acl: NetworkAcl) {
        self.lock().acls.insert(acl.id.clone(), acl);
    }

    /// Returns a stored ACL.
    #[must_use]
    pub fn acl(&self, id: &str) -> Option<NetworkAcl> {
        self.lock().acls.get(id).cloned()
    }

    /// Seeds the managers of an instance group.
    pub fn set_managers(&self, group: &str, managers: Vec<InstanceGroupManager>) {
        self.lock().managers.insert(group.to_owned(), managers);
    }

    /// Registers a floating IP that can be bound to interfaces.
    pub fn insert_floating_ip(&self, floating_ip: FloatingIp) {
        self.lock()
            .floating_ips
            .insert(floating_ip.id.clone(), floating_ip);
    }

    /// Builds and registers an unbound floating IP.
    pub fn register_floating_ip(&self, id: &str, address: &str) {
        self.insert_floating_ip(FloatingIp {
            id: id.to_owned(),
            name: format!("{id}-name"),
            address: address.to_owned(),
            crn: format!("crn:v1:bluemix:public:is:us-south-1:a/acct::floating-ip:{id}"),
            status: String::from("available"),
            zone: ZoneReference {
                name: String::from("us-south-1"),
            },
            target: None,
        });
    }

    /// Status returned by the bind call. Defaults to `available`.
    pub fn set_add_status(&self, status: &str) {
        self.lock().add_status = Some(status.to_owned());
    }

    /// Statuses reported by successive reads of a bound floating IP. Once
    /// exhausted the last status sticks.
    pub fn script_statuses(&self, floating_ip_id: &str, statuses: &[&str]) {
        self.lock().status_scripts.insert(
            floating_ip_id.to_owned(),
            statuses.iter().map(|status| (*status).to_owned()).collect(),
        );
    }

    /// Number of reads after an unbind that still report `deleting`.
    pub fn set_removal_lag(&self, reads: u32) {
        self.lock().removal_lag = reads;
    }

    /// Returns `true` when the floating IP is bound to the interface.
    #[must_use]
    pub fn is_bound(&self, server_id: &str, nic_id: &str, floating_ip_id: &str) -> bool {
        self.lock().attachments.contains_key(&(
            server_id.to_owned(),
            nic_id.to_owned(),
            floating_ip_id.to_owned(),
        ))
    }

    /// Seeds an image export job.
    pub fn insert_export_job(&self, image_id: &str, job: ImageExportJob) {
        self.lock()
            .export_jobs
            .insert((image_id.to_owned(), job.id.clone()), job);
    }

    /// Seeds a Code Engine function.
    pub fn insert_function(&self, project_id: &str, function: CodeEngineFunction) {
        self.lock()
            .functions
            .insert((project_id.to_owned(), function.name.clone()), function);
    }

    /// Queues a failure for the next call of `op` (the trait method name).
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    /// Returns every call made so far, formatted as `method args`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Returns the calls whose method name is `op`.
    #[must_use]
    pub fn calls_to(&self, op: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.split(' ').next() == Some(op))
            .collect()
    }

    fn nic_floating_ip_read(
        &self,
        key: (String, String, String),
    ) -> Result<FloatingIp, ApiError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.record(format!(
            "get_bare_metal_nic_floating_ip {}/{}/{}",
            key.0, key.1, key.2
        ));
        if let Some(err) = state.take_failure("get_bare_metal_nic_floating_ip") {
            return Err(err);
        }
        if let Some(remaining) = state.removing.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                let mut ghost = state
                    .floating_ips
                    .get(&key.2)
                    .cloned()
                    .ok_or_else(|| missing("floating IP", &key.2))?;
                ghost.status = String::from("deleting");
                return Ok(ghost);
            }
            return Err(missing("floating IP", &key.2));
        }
        let scripted = state
            .status_scripts
            .get_mut(&key.2)
            .and_then(|script| {
                if script.len() > 1 {
                    script.pop_front()
                } else {
                    script.front().cloned()
                }
            });
        let entry = state
            .attachments
            .get_mut(&key)
            .ok_or_else(|| missing("floating IP", &key.2))?;
        if let Some(status) = scripted {
            entry.status = status;
        }
        Ok(entry.clone())
    }
}

impl VpcApi for FakeVpcApi {
    fn get_network_acl<'a>(&'a self, id: &'a str) -> ApiFuture<'a, NetworkAcl> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!("get_network_acl {id}"));
            if let Some(err) = state.take_failure("get_network_acl") {
                return Err(err);
            }
            state
                .acls
                .get(id)
                .cloned()
                .ok_or_else(|| missing("network ACL", id))
        })
    }

    fn create_network_acl<'a>(
        &'a self,
        prototype: &'a NetworkAclPrototype,
    ) -> ApiFuture<'a, NetworkAcl> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!("create_network_acl {}", prototype.vpc.id));
            if let Some(err) = state.take_failure("create_network_acl") {
                return Err(err);
            }
            let id = state.fresh_id("acl");
            let defaults = state
                .default_rules
                .clone()
                .unwrap_or_else(default_acl_rules);
            let rules = defaults
                .iter()
                .map(|rule| state.rule_from(rule))
                .collect();
            let acl = NetworkAcl {
                name: prototype
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("generated-{id}")),
                crn: format!("crn:v1:bluemix:public:is:us-south:a/acct::network-acl:{id}"),
                vpc: Reference {
                    id: prototype.vpc.id.clone(),
                    name: Some(String::from("test-vpc")),
                    crn: None,
                },
                resource_group: Some(Reference {
                    id: prototype
                        .resource_group
                        .as_ref()
                        .map_or_else(|| String::from("default-rg"), |group| group.id.clone()),
                    name: Some(String::from("Default")),
                    crn: None,
                }),
                rules,
                subnets: Vec::new(),
                id: id.clone(),
            };
            state.acls.insert(id, acl.clone());
            Ok(acl)
        })
    }

    fn update_network_acl<'a>(
        &'a self,
        id: &'a str,
        patch: &'a NetworkAclPatch,
    ) -> ApiFuture<'a, NetworkAcl> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!("update_network_acl {id} {}", patch.name));
            if let Some(err) = state.take_failure("update_network_acl") {
                return Err(err);
            }
            let acl = state
                .acls
                .get_mut(id)
                .ok_or_else(|| missing("network ACL", id))?;
            acl.name.clone_from(&patch.name);
            Ok(acl.clone())
        })
    }

    fn delete_network_acl<'a>(&'a self, id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!("delete_network_acl {id}"));
            if let Some(err) = state.take_failure("delete_network_acl") {
                return Err(err);
            }
            state
                .acls
                .remove(id)
                .map(drop)
                .ok_or_else(|| missing("network ACL", id))
        })
    }

    fn list_network_acl_rules<'a>(
        &'a self,
        acl_id: &'a str,
        start: Option<&'a str>,
    ) -> ApiFuture<'a, Page<NetworkAclRule>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!(
                "list_network_acl_rules {acl_id} {}",
                start.unwrap_or("-")
            ));
            if let Some(err) = state.take_failure("list_network_acl_rules") {
                return Err(err);
            }
            let size = state.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
            let acl = state
                .acls
                .get(acl_id)
                .ok_or_else(|| missing("network ACL", acl_id))?;
            Ok(page_of(&acl.rules, start, size))
        })
    }

    fn create_network_acl_rule<'a>(
        &'a self,
        acl_id: &'a str,
        prototype: &'a NetworkAclRulePrototype,
    ) -> ApiFuture<'a, NetworkAclRule> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!(
                "create_network_acl_rule {acl_id} {}",
                prototype.name
            ));
            if let Some(err) = state.take_failure("create_network_acl_rule") {
                return Err(err);
            }
            if !state.acls.contains_key(acl_id) {
                return Err(missing("network ACL", acl_id));
            }
            let rule = state.rule_from(prototype);
            let acl = state
                .acls
                .get_mut(acl_id)
                .ok_or_else(|| missing("network ACL", acl_id))?;
            let position = prototype
                .before
                .as_ref()
                .and_then(|before| acl.rules.iter().position(|item| item.id == before.id))
                .unwrap_or(acl.rules.len());
            acl.rules.insert(position, rule.clone());
            Ok(rule)
        })
    }

    fn delete_network_acl_rule<'a>(
        &'a self,
        acl_id: &'a str,
        rule_id: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!("delete_network_acl_rule {acl_id} {rule_id}"));
            if let Some(err) = state.take_failure("delete_network_acl_rule") {
                return Err(err);
            }
            let acl = state
                .acls
                .get_mut(acl_id)
                .ok_or_else(|| missing("network ACL", acl_id))?;
            let before = acl.rules.len();
            acl.rules.retain(|rule| rule.id != rule_id);
            if acl.rules.len() == before {
                return Err(missing("network ACL rule", rule_id));
            }
            Ok(())
        })
    }

    fn list_instance_group_managers<'a>(
        &'a self,
        instance_group_id: &'a str,
        start: Option<&'a str>,
    ) -> ApiFuture<'a, Page<InstanceGroupManager>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!(
                "list_instance_group_managers {instance_group_id} {}",
                start.unwrap_or("-")
            ));
            if let Some(err) = state.take_failure("list_instance_group_managers") {
                return Err(err);
            }
            let size = state.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
            let managers = state
                .managers
                .get(instance_group_id)
                .ok_or_else(|| missing("instance group", instance_group_id))?;
            Ok(page_of(managers, start, size))
        })
    }

    fn get_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, FloatingIp> {
        Box::pin(async move {
            self.nic_floating_ip_read((
                server_id.to_owned(),
                nic_id.to_owned(),
                floating_ip_id.to_owned(),
            ))
        })
    }

    fn add_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, FloatingIp> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!(
                "add_bare_metal_nic_floating_ip {server_id}/{nic_id}/{floating_ip_id}"
            ));
            if let Some(err) = state.take_failure("add_bare_metal_nic_floating_ip") {
                return Err(err);
            }
            let mut bound = state
                .floating_ips
                .get(floating_ip_id)
                .cloned()
                .ok_or_else(|| missing("floating IP", floating_ip_id))?;
            bound.status = state
                .add_status
                .clone()
                .unwrap_or_else(|| String::from("available"));
            bound.target = Some(Reference {
                id: nic_id.to_owned(),
                name: Some(format!("{nic_id}-name")),
                crn: None,
            });
            let key = (
                server_id.to_owned(),
                nic_id.to_owned(),
                floating_ip_id.to_owned(),
            );
            state.removing.remove(&key);
            state.attachments.insert(key, bound.clone());
            Ok(bound)
        })
    }

    fn remove_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!(
                "remove_bare_metal_nic_floating_ip {server_id}/{nic_id}/{floating_ip_id}"
            ));
            if let Some(err) = state.take_failure("remove_bare_metal_nic_floating_ip") {
                return Err(err);
            }
            let key = (
                server_id.to_owned(),
                nic_id.to_owned(),
                floating_ip_id.to_owned(),
            );
            if state.attachments.remove(&key).is_none() {
                return Err(missing("floating IP", floating_ip_id));
            }
            let lag = state.removal_lag;
            state.removing.insert(key, lag);
            Ok(())
        })
    }

    fn get_image_export_job<'a>(
        &'a self,
        image_id: &'a str,
        job_id: &'a str,
    ) -> ApiFuture<'a, ImageExportJob> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!("get_image_export_job {image_id}/{job_id}"));
            if let Some(err) = state.take_failure("get_image_export_job") {
                return Err(err);
            }
            state
                .export_jobs
                .get(&(image_id.to_owned(), job_id.to_owned()))
                .cloned()
                .ok_or_else(|| missing("image export job", job_id))
        })
    }

    fn get_code_engine_function<'a>(
        &'a self,
        project_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, CodeEngineFunction> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record(format!("get_code_engine_function {project_id}/{name}"));
            if let Some(err) = state.take_failure("get_code_engine_function") {
                return Err(err);
            }
            state
                .functions
                .get(&(project_id.to_owned(), name.to_owned()))
                .cloned()
                .ok_or_else(|| missing("function", name))
        })
    }
}

/// A mutating call recorded by [`FakeTagApi`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TagCall {
    /// Tags attached to a CRN.
    Attach {
        /// Target CRN.
        crn: String,
        /// Tags attached.
        tags: Vec<String>,
        /// Tag category.
        kind: TagKind,
    },
    /// Tags detached from a CRN.
    Detach {
        /// Target CRN.
        crn: String,
        /// Tags detached.
        tags: Vec<String>,
        /// Tag category.
        kind: TagKind,
    },
}

#[derive(Default)]
struct TagState {
    tags: BTreeMap<(String, TagKind), Vec<String>>,
    calls: Vec<TagCall>,
    failure: Option<String>,
}

/// In-memory [`TagApi`].
#[derive(Default)]
pub struct FakeTagApi {
    state: StdMutex<TagState>,
}

impl FakeTagApi {
    fn lock(&self) -> StdMutexGuard<'_, TagState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds the tags attached to `crn`.
    pub fn set_tags(&self, crn: &str, kind: TagKind, tags: &[&str]) {
        self.lock().tags.insert(
            (crn.to_owned(), kind),
            tags.iter().map(|tag| (*tag).to_owned()).collect(),
        );
    }

    /// Returns the tags currently attached to `crn`.
    #[must_use]
    pub fn tags_of(&self, crn: &str, kind: TagKind) -> Vec<String> {
        self.lock()
            .tags
            .get(&(crn.to_owned(), kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns recorded attach and detach calls.
    #[must_use]
    pub fn calls(&self) -> Vec<TagCall> {
        self.lock().calls.clone()
    }

    /// Makes every subsequent call fail with `message`.
    pub fn fail_all(&self, message: &str) {
        self.lock().failure = Some(message.to_owned());
    }

    fn failure(&self) -> Result<(), ApiError> {
        self.lock()
            .failure
            .clone()
            .map_or(Ok(()), |message| Err(ApiError::status(500, message)))
    }
}

impl TagApi for FakeTagApi {
    fn get_tags<'a>(&'a self, crn: &'a str, kind: TagKind) -> ApiFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.failure()?;
            Ok(self.tags_of(crn, kind))
        })
    }

    fn attach_tags<'a>(
        &'a self,
        crn: &'a str,
        tags: &'a [String],
        kind: TagKind,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.failure()?;
            let mut state = self.lock();
            state.calls.push(TagCall::Attach {
                crn: crn.to_owned(),
                tags: tags.to_vec(),
                kind,
            });
            let current = state.tags.entry((crn.to_owned(), kind)).or_default();
            for tag in tags {
                if !current.contains(tag) {
                    current.push(tag.clone());
                }
            }
            Ok(())
        })
    }

    fn detach_tags<'a>(
        &'a self,
        crn: &'a str,
        tags: &'a [String],
        kind: TagKind,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.failure()?;
            let mut state = self.lock();
            state.calls.push(TagCall::Detach {
                crn: crn.to_owned(),
                tags: tags.to_vec(),
                kind,
            });
            if let Some(current) = state.tags.get_mut(&(crn.to_owned(), kind)) {
                current.retain(|tag| !tags.contains(tag));
            }
            Ok(())
        })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
