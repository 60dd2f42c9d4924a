//! Input checks applied before any remote call.

use std::net::IpAddr;

const MAX_NAME_LEN: usize = 63;
const MAX_TAG_LEN: usize = 128;

/// Checks a lowercase resource name: a letter, then letters, digits, or
/// hyphens, ending in a letter or digit; at most 63 characters.
///
/// # Errors
///
/// Returns a message naming `field` when the value does not match.
pub fn resource_name(field: &str, value: &str) -> Result<(), String> {
    let valid = value.len() <= MAX_NAME_LEN
        && value.starts_with(|ch: char| ch.is_ascii_lowercase())
        && value.ends_with(|ch: char| ch.is_ascii_lowercase() || ch.is_ascii_digit())
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(format!(
            "invalid {field} '{value}': use 1-{MAX_NAME_LEN} lowercase letters, digits, or \
             hyphens, starting with a letter and ending with a letter or digit"
        ))
    }
}

/// Checks that `value` is an IP address or a CIDR block.
///
/// # Errors
///
/// Returns a message naming `field` when the value is neither.
pub fn ip_or_cidr(field: &str, value: &str) -> Result<(), String> {
    let valid = match value.split_once('/') {
        None => value.parse::<IpAddr>().is_ok(),
        Some((address, prefix)) => match (address.parse::<IpAddr>(), prefix.parse::<u8>()) {
            (Ok(IpAddr::V4(_)), Ok(bits)) => bits <= 32,
            (Ok(IpAddr::V6(_)), Ok(bits)) => bits <= 128,
            _ => false,
        },
    };
    if valid {
        Ok(())
    } else {
        Err(format!(
            "invalid {field} '{value}': expected an IP address or CIDR block"
        ))
    }
}

/// Checks that `value` lies within `min..=max` and narrows it.
///
/// # Errors
///
/// Returns a message naming `field` when the value is out of range.
pub fn int_between<T>(field: &str, value: i64, min: T, max: T) -> Result<T, String>
where
    T: TryFrom<i64> + Into<i64> + Copy + PartialOrd,
{
    let low: i64 = min.into();
    let high: i64 = max.into();
    T::try_from(value)
        .ok()
        .filter(|narrowed| *narrowed >= min && *narrowed <= max)
        .ok_or_else(|| format!("invalid {field} {value}: must be between {low} and {high}"))
}

fn tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

/// Checks a user tag: 1-128 characters from letters, digits, spaces, and
/// `:_.-`.
///
/// # Errors
///
/// Returns a message describing the rejected tag.
pub fn user_tag(value: &str) -> Result<(), String> {
    let valid = !value.is_empty()
        && value.len() <= MAX_TAG_LEN
        && value.chars().all(|ch| tag_char(ch) || matches!(ch, ':' | ' '));
    if valid {
        Ok(())
    } else {
        Err(format!(
            "invalid tag '{value}': use 1-{MAX_TAG_LEN} letters, digits, spaces, or ':_.-'"
        ))
    }
}

fn access_tag_part(part: &str) -> bool {
    !part.is_empty()
        && part.starts_with(tag_char)
        && part.ends_with(tag_char)
        && part.chars().all(|ch| tag_char(ch) || ch == ' ')
}

/// Checks an access management tag of the form `key:value`.
///
/// # Errors
///
/// Returns a message describing the rejected tag.
pub fn access_tag(value: &str) -> Result<(), String> {
    let valid = value.len() <= MAX_TAG_LEN
        && value
            .split_once(':')
            .is_some_and(|(key, val)| access_tag_part(key) && access_tag_part(val));
    if valid {
        Ok(())
    } else {
        Err(format!(
            "invalid access tag '{value}': expected 'key:value' using letters, digits, or '_.-'"
        ))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("a", true)]
    #[case("web-tier-1", true)]
    #[case("1abc", false)]
    #[case("abc-", false)]
    #[case("Abc", false)]
    #[case("", false)]
    #[case("a_b", false)]
    fn names_follow_lowercase_rule(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(resource_name("name", value).is_ok(), valid);
    }

    #[test]
    fn overlong_names_are_rejected() {
        assert!(resource_name("name", &"a".repeat(64)).is_err());
        assert!(resource_name("name", &"a".repeat(63)).is_ok());
    }

    #[rstest]
    #[case("10.0.0.1", true)]
    #[case("0.0.0.0/0", true)]
    #[case("192.168.1.0/24", true)]
    #[case("fd00::/8", true)]
    #[case("10.0.0.0/33", false)]
    #[case("10.0.0", false)]
    #[case("any", false)]
    fn addresses_and_blocks(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(ip_or_cidr("source", value).is_ok(), valid);
    }

    #[rstest]
    #[case(0, Some(0))]
    #[case(254, Some(254))]
    #[case(255, None)]
    #[case(-1, None)]
    fn icmp_type_bounds(#[case] value: i64, #[case] expected: Option<u8>) {
        assert_eq!(int_between("type", value, 0_u8, 254_u8).ok(), expected);
    }

    #[rstest]
    #[case(1, true)]
    #[case(65535, true)]
    #[case(0, false)]
    #[case(65536, false)]
    fn port_bounds(#[case] value: i64, #[case] valid: bool) {
        assert_eq!(int_between("port_min", value, 1_u16, 65535_u16).is_ok(), valid);
    }

    #[rstest]
    #[case("env:prod", true)]
    #[case("my tag", true)]
    #[case("", false)]
    #[case("bad/tag", false)]
    fn user_tags(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(user_tag(value).is_ok(), valid);
    }

    #[rstest]
    #[case("project:blue", true)]
    #[case("team name:net ops", true)]
    #[case("project", false)]
    #[case(":blue", false)]
    #[case("project: blue", false)]
    fn access_tags(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(access_tag(value).is_ok(), valid);
    }
}
