/// Family part of an instance type: everything before the first `.`.
///
/// A type without a `.` is its own family.
///
/// # Examples
///
/// ```
/// use fleetdeck::utils::base_type_prefix;
///
/// assert_eq!(base_type_prefix("g4dn.2xlarge"), "g4dn");
/// assert_eq!(base_type_prefix("p3"), "p3");
/// ```
pub fn base_type_prefix(instance_type: &str) -> &str {
    let trimmed = instance_type.trim();
    match trimmed.find('.') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    }
}

/// Whether two instance types belong to the same family.
pub fn shares_base_type(a: &str, b: &str) -> bool {
    base_type_prefix(a).eq_ignore_ascii_case(base_type_prefix(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_before_first_dot() {
        assert_eq!(base_type_prefix("g5.xlarge"), "g5");
        assert_eq!(base_type_prefix("p4d.24xlarge"), "p4d");
        assert_eq!(base_type_prefix("a.b.c"), "a");
    }

    #[test]
    fn test_prefix_trims_whitespace() {
        assert_eq!(base_type_prefix("  inf2.xlarge "), "inf2");
        assert_eq!(base_type_prefix(""), "");
    }

    #[test]
    fn test_shares_base_type() {
        assert!(shares_base_type("g4dn.xlarge", "g4dn.2xlarge"));
        assert!(shares_base_type("G4DN.xlarge", "g4dn.2xlarge"));
        assert!(!shares_base_type("g4dn.xlarge", "g4.xlarge"));
        assert!(!shares_base_type("p3.2xlarge", "g4dn.2xlarge"));
    }
}
