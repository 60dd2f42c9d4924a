//! Composite identifiers built by joining component IDs with `/`.

use std::fmt;

use thiserror::Error;

const SEPARATOR: char = '/';

/// Errors raised when a composite identifier cannot be split.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum IdError {
    /// The identifier has the wrong number of segments.
    #[error("incorrect ID '{id}': expected {expected} '/'-separated segments, found {found}")]
    SegmentCount {
        /// Identifier as supplied.
        id: String,
        /// Number of segments required.
        expected: usize,
        /// Number of segments present.
        found: usize,
    },
    /// One of the segments is empty.
    #[error("incorrect ID '{id}': segment {position} is empty")]
    EmptySegment {
        /// Identifier as supplied.
        id: String,
        /// One-based position of the empty segment.
        position: usize,
    },
}

/// Joins segments with `/`.
#[must_use]
pub fn join(parts: &[&str]) -> String {
    parts.join("/")
}

/// Splits `id` into exactly `N` non-empty segments.
///
/// # Errors
///
/// Returns [`IdError::SegmentCount`] when the identifier does not have `N`
/// segments and [`IdError::EmptySegment`] when any segment is empty.
pub fn split<const N: usize>(id: &str) -> Result<[&str; N], IdError> {
    let parts: Vec<&str> = id.split(SEPARATOR).collect();
    let found = parts.len();
    let segments: [&str; N] = parts.try_into().map_err(|_| IdError::SegmentCount {
        id: id.to_owned(),
        expected: N,
        found,
    })?;
    if let Some(position) = segments.iter().position(|segment| segment.is_empty()) {
        return Err(IdError::EmptySegment {
            id: id.to_owned(),
            position: position + 1,
        });
    }
    Ok(segments)
}

/// Returns the network interface part of a value that may be either a bare
/// interface ID or a `server/interface` pair.
#[must_use]
pub fn trailing_segment(value: &str) -> &str {
    value.rsplit(SEPARATOR).next().unwrap_or(value)
}

/// Identifier of a floating IP bound to a bare metal server interface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NicFloatingIpId {
    /// Bare metal server ID.
    pub server: String,
    /// Network interface ID.
    pub nic: String,
    /// Floating IP ID.
    pub floating_ip: String,
}

impl NicFloatingIpId {
    /// Parses `server/nic/floating_ip`.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] when the identifier is malformed.
    pub fn parse(id: &str) -> Result<Self, IdError> {
        let [server, nic, floating_ip] = split::<3>(id)?;
        Ok(Self {
            server: server.to_owned(),
            nic: nic.to_owned(),
            floating_ip: floating_ip.to_owned(),
        })
    }
}

impl fmt::Display for NicFloatingIpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&[&self.server, &self.nic, &self.floating_ip]))
    }
}

/// Two-part identifier such as `instance_group/manager`, `image/job`, or
/// `project/function`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PairId {
    /// Owning object ID.
    pub parent: String,
    /// Child object ID or name.
    pub child: String,
}

impl PairId {
    /// Builds an identifier from its parts.
    #[must_use]
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }

    /// Parses `parent/child`.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] when the identifier is malformed.
    pub fn parse(id: &str) -> Result<Self, IdError> {
        let [parent, child] = split::<2>(id)?;
        Ok(Self::new(parent, child))
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&[&self.parent, &self.child]))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn nic_floating_ip_round_trips() {
        let id = NicFloatingIpId {
            server: String::from("srv-1"),
            nic: String::from("nic-2"),
            floating_ip: String::from("fip-3"),
        };
        let text = id.to_string();
        assert_eq!(text, "srv-1/nic-2/fip-3");
        assert_eq!(NicFloatingIpId::parse(&text), Ok(id));
    }

    #[test]
    fn pair_round_trips() {
        let id = PairId::new("group", "manager");
        assert_eq!(PairId::parse(&id.to_string()), Ok(id));
    }

    #[rstest]
    #[case("a/b", 2)]
    #[case("a/b/c/d", 4)]
    #[case("abc", 1)]
    fn wrong_segment_count_is_rejected(#[case] id: &str, #[case] found: usize) {
        assert_eq!(
            NicFloatingIpId::parse(id),
            Err(IdError::SegmentCount {
                id: id.to_owned(),
                expected: 3,
                found,
            })
        );
    }

    #[rstest]
    #[case("/b/c", 1)]
    #[case("a//c", 2)]
    #[case("a/b/", 3)]
    fn empty_segments_are_rejected(#[case] id: &str, #[case] position: usize) {
        assert_eq!(
            split::<3>(id),
            Err(IdError::EmptySegment {
                id: id.to_owned(),
                position,
            })
        );
    }

    #[rstest]
    #[case("nic-1", "nic-1")]
    #[case("srv-1/nic-1", "nic-1")]
    fn trailing_segment_accepts_both_forms(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(trailing_segment(value), expected);
    }
}
