//! Tunnel variants and their capability tables
//!
//! The encapsulation name alone does not identify the kernel tunnel to
//! build: a `gre` tunnel without remote, key or multicast is a multipoint
//! (NBMA) GRE tunnel, and a `sit` tunnel with a 6RD prefix is a 6RD tunnel.

use std::fmt;

use crate::options::OptionSet;
use crate::tables::option_fields as f;
use crate::types::AddressFamily;
use crate::types::AddressFamily::{Ipv4, Ipv6};

/// One of the eight concrete tunnel implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelVariant {
    /// Point-to-point GRE over IPv4.
    Gre,
    /// GRE without fixed remote (NBMA, used with NHRP).
    MultipointGre,
    /// IPv4 in IPv4.
    Ipip,
    /// IPv4 in IPv6.
    Ipip6,
    /// IPv6 in IPv6.
    Ip6ip6,
    /// GRE over IPv6.
    Ip6gre,
    /// IPv6 in IPv4.
    Sit,
    /// 6RD over SIT.
    Sit6rd,
}

struct VariantSpec {
    encapsulation: &'static str,
    kind: &'static str,
    tunnel_family: AddressFamily,
    allowed_families: &'static [AddressFamily],
    required: &'static [&'static str],
    options: &'static [&'static str],
    updates: &'static [&'static str],
}

const V4_OPTIONS: &[&str] = &[f::LOCAL, f::REMOTE, f::TTL, f::TOS, f::KEY];
const V4_UPDATES: &[&str] = &[
    f::LOCAL,
    f::REMOTE,
    f::TTL,
    f::TOS,
    f::MTU,
    f::MULTICAST,
    f::ALLMULTICAST,
];
const V6_OPTIONS: &[&str] = &[
    f::LOCAL,
    f::REMOTE,
    f::ENCAPLIMIT,
    f::HOPLIMIT,
    f::TCLASS,
    f::FLOWLABEL,
];
const V6_UPDATES: &[&str] = &[
    f::LOCAL,
    f::REMOTE,
    f::ENCAPLIMIT,
    f::HOPLIMIT,
    f::TCLASS,
    f::FLOWLABEL,
    f::MTU,
    f::MULTICAST,
    f::ALLMULTICAST,
];
const LOCAL_REMOTE: &[&str] = &[f::LOCAL, f::REMOTE];

const GRE: VariantSpec = VariantSpec {
    encapsulation: "gre",
    kind: "gre",
    tunnel_family: Ipv4,
    allowed_families: &[Ipv4, Ipv6],
    required: &[f::LOCAL],
    options: V4_OPTIONS,
    updates: V4_UPDATES,
};

const MULTIPOINT_GRE: VariantSpec = VariantSpec {
    encapsulation: "gre",
    kind: "gre",
    tunnel_family: Ipv4,
    allowed_families: &[Ipv4],
    required: &[f::LOCAL],
    options: &[f::LOCAL, f::TTL, f::TOS],
    updates: &[f::LOCAL, f::TTL, f::TOS, f::MTU],
};

const IPIP: VariantSpec = VariantSpec {
    encapsulation: "ipip",
    kind: "ipip",
    tunnel_family: Ipv4,
    allowed_families: &[Ipv4],
    required: LOCAL_REMOTE,
    options: V4_OPTIONS,
    updates: V4_UPDATES,
};

const IPIP6: VariantSpec = VariantSpec {
    encapsulation: "ipip6",
    kind: "ipip6",
    tunnel_family: Ipv6,
    allowed_families: &[Ipv4],
    required: LOCAL_REMOTE,
    options: V6_OPTIONS,
    updates: V6_UPDATES,
};

const IP6IP6: VariantSpec = VariantSpec {
    encapsulation: "ip6ip6",
    kind: "ip6ip6",
    tunnel_family: Ipv6,
    allowed_families: &[Ipv6],
    required: LOCAL_REMOTE,
    options: V6_OPTIONS,
    updates: V6_UPDATES,
};

const IP6GRE: VariantSpec = VariantSpec {
    encapsulation: "ip6gre",
    kind: "ip6gre",
    tunnel_family: Ipv6,
    allowed_families: &[Ipv4, Ipv6],
    required: LOCAL_REMOTE,
    options: V6_OPTIONS,
    updates: &[
        f::LOCAL,
        f::REMOTE,
        f::ENCAPLIMIT,
        f::HOPLIMIT,
        f::TCLASS,
        f::FLOWLABEL,
        f::MULTICAST,
        f::ALLMULTICAST,
    ],
};

const SIT: VariantSpec = VariantSpec {
    encapsulation: "sit",
    kind: "sit",
    tunnel_family: Ipv4,
    allowed_families: &[Ipv6],
    required: LOCAL_REMOTE,
    options: V4_OPTIONS,
    updates: V4_UPDATES,
};

const SIT_6RD: VariantSpec = VariantSpec {
    encapsulation: "sit",
    kind: "sit",
    tunnel_family: Ipv4,
    allowed_families: &[Ipv6],
    required: &[f::REMOTE, f::SIXRD_PREFIX],
    options: &[
        f::REMOTE,
        f::TTL,
        f::TOS,
        f::KEY,
        f::SIXRD_PREFIX,
        f::SIXRD_RELAY_PREFIX,
    ],
    updates: &[
        f::REMOTE,
        f::TTL,
        f::TOS,
        f::MTU,
        f::MULTICAST,
        f::ALLMULTICAST,
    ],
};

impl TunnelVariant {
    pub const ALL: [TunnelVariant; 8] = [
        TunnelVariant::Gre,
        TunnelVariant::MultipointGre,
        TunnelVariant::Ipip,
        TunnelVariant::Ipip6,
        TunnelVariant::Ip6ip6,
        TunnelVariant::Ip6gre,
        TunnelVariant::Sit,
        TunnelVariant::Sit6rd,
    ];

    fn spec(&self) -> &'static VariantSpec {
        match self {
            TunnelVariant::Gre => &GRE,
            TunnelVariant::MultipointGre => &MULTIPOINT_GRE,
            TunnelVariant::Ipip => &IPIP,
            TunnelVariant::Ipip6 => &IPIP6,
            TunnelVariant::Ip6ip6 => &IP6IP6,
            TunnelVariant::Ip6gre => &IP6GRE,
            TunnelVariant::Sit => &SIT,
            TunnelVariant::Sit6rd => &SIT_6RD,
        }
    }

    /// The point-to-point variant named by an encapsulation.
    pub fn from_encapsulation(name: &str) -> Option<Self> {
        match name {
            "gre" => Some(TunnelVariant::Gre),
            "ipip" => Some(TunnelVariant::Ipip),
            "ipip6" => Some(TunnelVariant::Ipip6),
            "ip6ip6" => Some(TunnelVariant::Ip6ip6),
            "ip6gre" => Some(TunnelVariant::Ip6gre),
            "sit" => Some(TunnelVariant::Sit),
            _ => None,
        }
    }

    /// Picks the variant for a loaded option set.
    ///
    /// Never fails: an empty or unknown encapsulation yields [`Gre`] and is
    /// reported by the validator.
    ///
    /// [`Gre`]: TunnelVariant::Gre
    pub fn resolve(options: &OptionSet) -> Self {
        let encapsulation = options.text(f::TYPE);

        if encapsulation == "sit" && options.is_set(f::SIXRD_PREFIX) {
            return TunnelVariant::Sit6rd;
        }
        if encapsulation == "gre"
            && !options.is_set(f::REMOTE)
            && !options.is_set(f::KEY)
            && !options.flag(f::MULTICAST)
        {
            return TunnelVariant::MultipointGre;
        }
        Self::from_encapsulation(encapsulation).unwrap_or(TunnelVariant::Gre)
    }

    /// Encapsulation name as configured.
    pub fn encapsulation(&self) -> &'static str {
        self.spec().encapsulation
    }

    /// Kernel tunnel mode.
    pub fn kind(&self) -> &'static str {
        self.spec().kind
    }

    /// Address family of the outer endpoints.
    pub fn tunnel_family(&self) -> AddressFamily {
        self.spec().tunnel_family
    }

    /// Address families the tunnel can carry.
    pub fn allowed_families(&self) -> &'static [AddressFamily] {
        self.spec().allowed_families
    }

    pub fn allows(&self, family: AddressFamily) -> bool {
        self.allowed_families().contains(&family)
    }

    /// Options that can never be removed.
    pub fn required_fields(&self) -> &'static [&'static str] {
        self.spec().required
    }

    /// Options passed when the tunnel is built.
    pub fn option_fields(&self) -> &'static [&'static str] {
        self.spec().options
    }

    /// Options that may change after the tunnel was built.
    pub fn updatable_fields(&self) -> &'static [&'static str] {
        self.spec().updates
    }

    /// Options fixed once the tunnel was built.
    pub fn creation_only_fields(&self) -> Vec<&'static str> {
        self.option_fields()
            .iter()
            .copied()
            .filter(|o| !self.is_updatable(o))
            .collect()
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.required_fields().contains(&field)
    }

    pub fn is_option(&self, field: &str) -> bool {
        self.option_fields().contains(&field)
    }

    pub fn is_updatable(&self, field: &str) -> bool {
        self.updatable_fields().contains(&field)
    }

    /// Every option the variant knows about.
    pub fn is_declared(&self, field: &str) -> bool {
        self.is_option(field) || self.is_updatable(field) || self.is_required(field)
    }
}

impl fmt::Display for TunnelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TunnelVariant::Gre => "gre",
            TunnelVariant::MultipointGre => "mgre",
            TunnelVariant::Ipip => "ipip",
            TunnelVariant::Ipip6 => "ipip6",
            TunnelVariant::Ip6ip6 => "ip6ip6",
            TunnelVariant::Ip6gre => "ip6gre",
            TunnelVariant::Sit => "sit",
            TunnelVariant::Sit6rd => "6rd",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionValue;

    fn options(encap: &str) -> OptionSet {
        let mut options = OptionSet::default();
        options.set_text(f::TYPE, encap).unwrap();
        options.set_text(f::LOCAL, "10.0.0.1").unwrap();
        options
    }

    #[test]
    fn test_gre_without_remote_is_multipoint() {
        let opts = options("gre");
        assert_eq!(TunnelVariant::resolve(&opts), TunnelVariant::MultipointGre);
    }

    #[test]
    fn test_gre_with_remote_key_or_multicast_is_point_to_point() {
        let mut opts = options("gre");
        opts.set_text(f::REMOTE, "10.0.0.2").unwrap();
        assert_eq!(TunnelVariant::resolve(&opts), TunnelVariant::Gre);

        let mut opts = options("gre");
        opts.set_text(f::KEY, "42").unwrap();
        assert_eq!(TunnelVariant::resolve(&opts), TunnelVariant::Gre);

        let mut opts = options("gre");
        opts.set(f::MULTICAST, OptionValue::Flag(true)).unwrap();
        assert_eq!(TunnelVariant::resolve(&opts), TunnelVariant::Gre);
    }

    #[test]
    fn test_sit_with_6rd_prefix() {
        let mut opts = options("sit");
        assert_eq!(TunnelVariant::resolve(&opts), TunnelVariant::Sit);
        opts.set_text(f::SIXRD_PREFIX, "2001:db8::/32").unwrap();
        assert_eq!(TunnelVariant::resolve(&opts), TunnelVariant::Sit6rd);
    }

    #[test]
    fn test_6rd_prefix_ignored_for_other_encapsulations() {
        let mut opts = options("ipip");
        opts.set_text(f::SIXRD_PREFIX, "2001:db8::/32").unwrap();
        assert_eq!(TunnelVariant::resolve(&opts), TunnelVariant::Ipip);
    }

    #[test]
    fn test_direct_encapsulations() {
        for (encap, variant) in [
            ("ipip", TunnelVariant::Ipip),
            ("ipip6", TunnelVariant::Ipip6),
            ("ip6ip6", TunnelVariant::Ip6ip6),
            ("ip6gre", TunnelVariant::Ip6gre),
        ] {
            assert_eq!(TunnelVariant::resolve(&options(encap)), variant);
        }
    }

    #[test]
    fn test_unknown_encapsulation_falls_back() {
        assert_eq!(TunnelVariant::resolve(&options("")), TunnelVariant::Gre);
        assert_eq!(TunnelVariant::resolve(&options("vxlan")), TunnelVariant::Gre);
    }

    #[test]
    fn test_resolve_is_pure() {
        let opts = options("gre");
        let before = opts.clone();
        assert_eq!(TunnelVariant::resolve(&opts), TunnelVariant::resolve(&opts));
        assert_eq!(opts, before);
    }

    #[test]
    fn test_capability_tables() {
        assert_eq!(TunnelVariant::Gre.creation_only_fields(), vec![f::KEY]);
        assert_eq!(
            TunnelVariant::Ip6gre.creation_only_fields(),
            Vec::<&str>::new()
        );
        assert_eq!(
            TunnelVariant::Sit6rd.creation_only_fields(),
            vec![f::KEY, f::SIXRD_PREFIX, f::SIXRD_RELAY_PREFIX]
        );
        assert_eq!(TunnelVariant::Ip6gre.tunnel_family(), AddressFamily::Ipv6);
        assert!(TunnelVariant::Sit.allows(AddressFamily::Ipv6));
        assert!(!TunnelVariant::Sit.allows(AddressFamily::Ipv4));
        assert!(TunnelVariant::Sit6rd.is_required(f::SIXRD_PREFIX));
        assert!(!TunnelVariant::Sit6rd.is_declared(f::LOCAL));
        assert_eq!(TunnelVariant::MultipointGre.kind(), "gre");
        for variant in TunnelVariant::ALL {
            for required in variant.required_fields() {
                assert!(variant.is_option(required), "{} {}", variant, required);
            }
        }
    }
}
