//! Tunnel type definitions and constants

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Strips an optional `/prefixlen` suffix.
pub fn strip_prefix_len(addr: &str) -> &str {
    addr.split('/').next().unwrap_or(addr)
}

/// True for an IPv4 address, with or without prefix length.
pub fn is_ipv4(addr: &str) -> bool {
    strip_prefix_len(addr).parse::<Ipv4Addr>().is_ok()
}

/// True for an IPv6 address, with or without prefix length.
pub fn is_ipv6(addr: &str) -> bool {
    strip_prefix_len(addr).parse::<Ipv6Addr>().is_ok()
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Family of an address. Anything that is not IPv6 (including the empty
    /// string) counts as IPv4.
    pub fn of(addr: &str) -> Self {
        if is_ipv6(addr) {
            AddressFamily::Ipv6
        } else {
            AddressFamily::Ipv4
        }
    }

    /// 4 or 6
    pub fn version(&self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 4,
            AddressFamily::Ipv6 => 6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPv{}", self.version())
    }
}

/// How a field (or a whole section) changed between the effective and the
/// current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Not in effective, present in current.
    Create,
    /// Present in both with the same value.
    Static,
    /// Present in both with different values.
    Modify,
    /// In neither.
    Absent,
    /// In effective, gone from current.
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Static,
        Action::Modify,
        Action::Absent,
        Action::Delete,
    ];

    /// Classifies from existence in both trees and whether the values differ.
    pub fn classify(in_current: bool, in_effective: bool, changed: bool) -> Self {
        match (in_current, in_effective) {
            (true, true) if changed => Action::Modify,
            (true, true) => Action::Static,
            (true, false) => Action::Create,
            (false, true) => Action::Delete,
            (false, false) => Action::Absent,
        }
    }

    /// True when the field exists in the current configuration.
    pub fn is_present(&self) -> bool {
        !matches!(self, Action::Absent | Action::Delete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Static => "static",
            Action::Modify => "modify",
            Action::Absent => "absent",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal finding, printed to the operator but never blocking apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    /// Option the advisory is about.
    pub field: String,
    pub message: String,
}

impl Advisory {
    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_family_detection() {
        assert!(is_ipv4("10.0.0.1"));
        assert!(is_ipv4("10.0.0.1/24"));
        assert!(!is_ipv4("2001:db8::1"));
        assert!(is_ipv6("2001:db8::1/64"));
        assert!(!is_ipv6("tun0"));

        assert_eq!(AddressFamily::of("192.0.2.1"), AddressFamily::Ipv4);
        assert_eq!(AddressFamily::of("fe80::1"), AddressFamily::Ipv6);
        assert_eq!(AddressFamily::of(""), AddressFamily::Ipv4);
        assert_eq!(AddressFamily::Ipv6.to_string(), "IPv6");
    }

    #[test]
    fn test_action_classify_is_total() {
        for in_current in [false, true] {
            for in_effective in [false, true] {
                for changed in [false, true] {
                    let action = Action::classify(in_current, in_effective, changed);
                    assert_eq!(action.is_present(), in_current);
                }
            }
        }
        assert_eq!(Action::classify(true, false, false), Action::Create);
        assert_eq!(Action::classify(false, true, false), Action::Delete);
        assert_eq!(Action::classify(true, true, true), Action::Modify);
        assert_eq!(Action::classify(true, true, false), Action::Static);
        assert_eq!(Action::classify(false, false, true), Action::Absent);
    }

    #[test]
    fn test_strip_prefix_len() {
        assert_eq!(strip_prefix_len("10.0.0.1/24"), "10.0.0.1");
        assert_eq!(strip_prefix_len("10.0.0.1"), "10.0.0.1");
    }
}
