//! Config paths, option names and the option ↔ config mapping

/// Parent path of every tunnel definition.
pub const CFG_TUNNEL_ROOT: &str = "interfaces tunnel";

/// Interfaces referenced by the NHRP daemon.
pub const CFG_NHRP_TUNNEL_ROOT: &str = "protocols nhrp tunnel";

/// Remote endpoint marker used in pair keys when `remote-ip` is unset.
pub const UNSET_REMOTE: &str = "<unset>";

/// Local endpoint substituted when a DHCP interface has no address.
pub const LOOPBACK_FALLBACK: &str = "127.0.0.1";

/// Config path of one tunnel.
pub fn tunnel_section(ifname: &str) -> String {
    format!("{} {}", CFG_TUNNEL_ROOT, ifname)
}

/// Paths relative to a tunnel section
pub mod tunnel_paths {
    pub const ENCAPSULATION: &str = "encapsulation";
    pub const DESCRIPTION: &str = "description";
    pub const MTU: &str = "mtu";
    pub const LOCAL_IP: &str = "local-ip";
    pub const REMOTE_IP: &str = "remote-ip";
    pub const MULTICAST: &str = "multicast";
    pub const IP_TTL: &str = "parameters ip ttl";
    pub const IP_TOS: &str = "parameters ip tos";
    pub const IP_KEY: &str = "parameters ip key";
    pub const IPV6_ENCAPLIMIT: &str = "parameters ipv6 encaplimit";
    pub const IPV6_FLOWLABEL: &str = "parameters ipv6 flowlabel";
    pub const IPV6_HOPLIMIT: &str = "parameters ipv6 hoplimit";
    pub const IPV6_TCLASS: &str = "parameters ipv6 tclass";
    pub const SIXRD_PREFIX: &str = "6rd-prefix";
    pub const SIXRD_RELAY_PREFIX: &str = "6rd-relay-prefix";
    pub const DHCP_INTERFACE: &str = "dhcp-interface";
    pub const DISABLE: &str = "disable";
    pub const DISABLE_LINK_DETECT: &str = "disable-link-detect";
    pub const VRF: &str = "vrf";
    pub const ADDRESS: &str = "address";
    pub const IPV6_AUTOCONF: &str = "ipv6 address autoconf";
    pub const IPV6_DISABLE_FORWARDING: &str = "ipv6 disable-forwarding";
    pub const IPV6_DAD_TRANSMITS: &str = "ipv6 dup-addr-detect-transmits";
}

/// Option names. Tunnel parameter names match the `ip tunnel` keywords.
pub mod option_fields {
    pub const IFNAME: &str = "ifname";
    pub const TYPE: &str = "type";
    pub const ALIAS: &str = "alias";
    pub const MTU: &str = "mtu";
    pub const LOCAL: &str = "local";
    pub const REMOTE: &str = "remote";
    pub const MULTICAST: &str = "multicast";
    pub const ALLMULTICAST: &str = "allmulticast";
    pub const TTL: &str = "ttl";
    pub const TOS: &str = "tos";
    pub const KEY: &str = "key";
    pub const ENCAPLIMIT: &str = "encaplimit";
    pub const FLOWLABEL: &str = "flowlabel";
    pub const HOPLIMIT: &str = "hoplimit";
    pub const TCLASS: &str = "tclass";
    pub const SIXRD_PREFIX: &str = "6rd-prefix";
    pub const SIXRD_RELAY_PREFIX: &str = "6rd-relay-prefix";
    pub const DHCP_INTERFACE: &str = "dhcp-interface";
    pub const STATE: &str = "state";
    pub const LINK_DETECT: &str = "link_detect";
    pub const VRF: &str = "vrf";
    pub const ADDRESSES_ADD: &str = "addresses-add";
    pub const ADDRESSES_DEL: &str = "addresses-del";
    pub const IPV6_AUTOCONF: &str = "ipv6_autoconf";
    pub const IPV6_FORWARDING: &str = "ipv6_forwarding";
    pub const IPV6_DAD_TRANSMITS: &str = "ipv6_dad_transmits";
    pub const NHRP: &str = "nhrp";
    pub const TUNNEL: &str = "tunnel";

    /// Parameters only meaningful with IPv4 endpoints.
    pub const IPV4_ONLY: &[&str] = &[TTL, TOS, KEY];

    /// Parameters only meaningful with IPv6 endpoints.
    pub const IPV6_ONLY: &[&str] = &[ENCAPLIMIT, FLOWLABEL, HOPLIMIT, TCLASS];

    /// Interface properties set on every run regardless of encapsulation.
    pub const GENERAL_PROPERTIES: &[&str] = &[
        ALIAS,
        MTU,
        LINK_DETECT,
        MULTICAST,
        ALLMULTICAST,
        VRF,
        IPV6_AUTOCONF,
        IPV6_FORWARDING,
        IPV6_DAD_TRANSMITS,
    ];

    /// Options that may be created, modified or removed on any tunnel.
    pub const ALWAYS_MUTABLE: &[&str] = &[
        ALIAS,
        MTU,
        LINK_DETECT,
        MULTICAST,
        VRF,
        STATE,
        DHCP_INTERFACE,
        IPV6_AUTOCONF,
        IPV6_FORWARDING,
        IPV6_DAD_TRANSMITS,
        ADDRESSES_ADD,
        ADDRESSES_DEL,
    ];
}

/// How one option is read from the tunnel's config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Option name in the [`OptionSet`](crate::options::OptionSet).
    pub field: &'static str,
    /// Path relative to the tunnel section.
    pub path: &'static str,
    /// Whether the path holds a list of values.
    pub multi: bool,
    /// Value used when the path exists without a value.
    pub override_default: Option<&'static str>,
}

const fn single(field: &'static str, path: &'static str) -> FieldMapping {
    FieldMapping {
        field,
        path,
        multi: false,
        override_default: None,
    }
}

const fn flagged(field: &'static str, path: &'static str, value: &'static str) -> FieldMapping {
    FieldMapping {
        field,
        path,
        multi: false,
        override_default: Some(value),
    }
}

/// Mapping used for every tunnel run.
pub const TUNNEL_FIELD_MAPPING: &[FieldMapping] = &[
    single(option_fields::TYPE, tunnel_paths::ENCAPSULATION),
    single(option_fields::ALIAS, tunnel_paths::DESCRIPTION),
    single(option_fields::MTU, tunnel_paths::MTU),
    single(option_fields::LOCAL, tunnel_paths::LOCAL_IP),
    single(option_fields::REMOTE, tunnel_paths::REMOTE_IP),
    single(option_fields::MULTICAST, tunnel_paths::MULTICAST),
    single(option_fields::TTL, tunnel_paths::IP_TTL),
    single(option_fields::TOS, tunnel_paths::IP_TOS),
    single(option_fields::KEY, tunnel_paths::IP_KEY),
    single(option_fields::ENCAPLIMIT, tunnel_paths::IPV6_ENCAPLIMIT),
    single(option_fields::FLOWLABEL, tunnel_paths::IPV6_FLOWLABEL),
    single(option_fields::HOPLIMIT, tunnel_paths::IPV6_HOPLIMIT),
    single(option_fields::TCLASS, tunnel_paths::IPV6_TCLASS),
    single(option_fields::SIXRD_PREFIX, tunnel_paths::SIXRD_PREFIX),
    single(option_fields::SIXRD_RELAY_PREFIX, tunnel_paths::SIXRD_RELAY_PREFIX),
    single(option_fields::DHCP_INTERFACE, tunnel_paths::DHCP_INTERFACE),
    flagged(option_fields::STATE, tunnel_paths::DISABLE, "down"),
    flagged(option_fields::LINK_DETECT, tunnel_paths::DISABLE_LINK_DETECT, "2"),
    single(option_fields::VRF, tunnel_paths::VRF),
    FieldMapping {
        field: option_fields::ADDRESSES_ADD,
        path: tunnel_paths::ADDRESS,
        multi: true,
        override_default: None,
    },
    flagged(option_fields::IPV6_AUTOCONF, tunnel_paths::IPV6_AUTOCONF, "1"),
    flagged(option_fields::IPV6_FORWARDING, tunnel_paths::IPV6_DISABLE_FORWARDING, "0"),
    single(option_fields::IPV6_DAD_TRANSMITS, tunnel_paths::IPV6_DAD_TRANSMITS),
];
