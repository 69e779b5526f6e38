//! Plan validation
//!
//! Hard violations are collected in rule order and never stop the scan; the
//! first one is what the operator sees. Advisories are printed and otherwise
//! ignored.

use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::loader::Plan;
use crate::pair_index::pair_key;
use crate::tables::option_fields as f;
use crate::types::{is_ipv4, is_ipv6, Action, AddressFamily, Advisory};
use crate::variant::TunnelVariant;

/// (endpoint family, payload family, encapsulation) → better encapsulation
const UPGRADES: &[(u8, u8, &str, &str)] = &[
    (6, 4, "gre", "ip6gre"),
    (6, 6, "gre", "ip6gre"),
    (4, 6, "ipip", "ipip6"),
    (6, 6, "ipip", "ip6ip6"),
];

/// A hard rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub advisories: Vec<Advisory>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first_error(&self) -> Option<&Violation> {
        self.violations.first()
    }

    /// Turns the first violation into a configuration error.
    pub fn ensure_valid(&self) -> CfgMgrResult<()> {
        match self.first_error() {
            Some(v) => Err(CfgMgrError::invalid_config(&v.field, &v.message)),
            None => Ok(()),
        }
    }

    fn reject(&mut self, field: &str, message: String) {
        self.violations.push(Violation::new(field, message));
    }

    fn advise(&mut self, field: &str, message: String) {
        self.advisories.push(Advisory::for_field(field, message));
    }
}

/// Rejects the deletion of a tunnel still used by NHRP.
pub fn check_references(plan: &Plan) -> CfgMgrResult<()> {
    if plan.options.list(f::NHRP).iter().any(|n| n == &plan.ifname) {
        return Err(CfgMgrError::invalid_config(
            f::NHRP,
            format!(
                "Can not delete tunnel {} {}, it is used by nhrp",
                plan.encapsulation(),
                plan.ifname
            ),
        ));
    }
    Ok(())
}

pub fn validate(plan: &Plan, variant: TunnelVariant) -> ValidationReport {
    let mut report = ValidationReport::default();

    if plan.is_delete() {
        if let Err(CfgMgrError::InvalidConfig { field, message }) = check_references(plan) {
            report.reject(&field, message);
        }
        return report;
    }

    let v = Validation {
        plan,
        variant,
        tunnel: format!("tunnel {} {}", plan.encapsulation(), plan.ifname),
    };

    v.check_encapsulation(&mut report);
    v.check_whitelist(&mut report);
    v.check_endpoints(&mut report);
    v.check_upgrade(&mut report);
    v.check_families(&mut report);
    v.check_payload(&mut report);
    v.check_knobs(&mut report);
    v.check_duplicate_pair(&mut report);

    report
}

struct Validation<'a> {
    plan: &'a Plan,
    variant: TunnelVariant,
    /// "tunnel {encapsulation} {ifname}", used in every message.
    tunnel: String,
}

impl Validation<'_> {
    fn options(&self) -> &crate::options::OptionSet {
        &self.plan.options
    }

    fn local(&self) -> &str {
        self.options().text(f::LOCAL)
    }

    fn remote(&self) -> &str {
        match self.options().text(f::REMOTE) {
            "" => self.local(),
            remote => remote,
        }
    }

    fn check_encapsulation(&self, report: &mut ValidationReport) {
        let encapsulation = self.plan.encapsulation();

        if encapsulation.is_empty() {
            report.reject(
                f::TYPE,
                format!("Must provide an \"encapsulation\" for {}", self.tunnel),
            );
        } else if TunnelVariant::from_encapsulation(encapsulation).is_none() {
            report.reject(
                f::TYPE,
                format!("Unknown encapsulation \"{}\" for {}", encapsulation, self.tunnel),
            );
        }

        if self.plan.section == Action::Modify
            && matches!(
                self.plan.actions.action_of(f::TYPE),
                Some(Action::Modify | Action::Delete)
            )
        {
            report.reject(
                f::TYPE,
                format!("Encapsulation can only be set at creation for {}", self.tunnel),
            );
        }

        if encapsulation != "sit" && self.options().is_set(f::SIXRD_PREFIX) {
            report.advise(
                f::SIXRD_PREFIX,
                format!("6RD can only be configured for sit interfaces, not {}", self.tunnel),
            );
        }
    }

    fn is_updatable(&self, field: &str) -> bool {
        self.variant.is_updatable(field) || f::ALWAYS_MUTABLE.contains(&field)
    }

    fn is_creatable(&self, field: &str) -> bool {
        let v = self.variant;
        if self.is_updatable(field) || v.is_required(field) {
            return true;
        }
        self.plan.section == Action::Create && (field == f::TYPE || v.is_option(field))
    }

    fn check_whitelist(&self, report: &mut ValidationReport) {
        let actions = &self.plan.actions;

        for field in actions.fields_with(Action::Create) {
            if !self.is_creatable(field) {
                report.reject(
                    field,
                    format!("Can not set \"{}\" on {} after creation", field, self.tunnel),
                );
            }
        }
        // a modified encapsulation is reported by check_encapsulation
        for field in actions.fields_with(Action::Modify) {
            if field != f::TYPE && !self.is_updatable(field) {
                report.reject(
                    field,
                    format!(
                        "Can not modify \"{}\" on {}, it must be set at creation",
                        field, self.tunnel
                    ),
                );
            }
        }
        for field in actions.fields_with(Action::Delete) {
            if self.variant.is_required(field) {
                report.reject(
                    field,
                    format!("Can not remove \"{}\", it is mandatory for {}", field, self.tunnel),
                );
            }
        }
    }

    fn check_endpoints(&self, report: &mut ValidationReport) {
        if self.variant == TunnelVariant::Sit6rd {
            return;
        }
        let local = self.options().is_set(f::LOCAL);
        let dhcp = self.options().is_set(f::DHCP_INTERFACE);

        if !local && !dhcp {
            report.reject(
                f::LOCAL,
                format!("Must configure either local-ip or dhcp-interface for {}", self.tunnel),
            );
        }
        if local && dhcp {
            report.reject(
                f::DHCP_INTERFACE,
                format!("Must configure only one of local-ip or dhcp-interface for {}", self.tunnel),
            );
        }
    }

    /// Payload families present in the declared addresses.
    fn payload_families(&self) -> Vec<AddressFamily> {
        let addresses = self.options().list(f::ADDRESSES_ADD);
        let mut families = Vec::new();
        if addresses.iter().any(|a| is_ipv4(a)) {
            families.push(AddressFamily::Ipv4);
        }
        if addresses.iter().any(|a| is_ipv6(a)) {
            families.push(AddressFamily::Ipv6);
        }
        families
    }

    fn check_upgrade(&self, report: &mut ValidationReport) {
        let encapsulation = self.plan.encapsulation();
        let endpoint = AddressFamily::of(self.local()).version();

        for payload in self.payload_families() {
            let suggestion = UPGRADES.iter().find(|(e, p, encap, _)| {
                *e == endpoint && *p == payload.version() && *encap == encapsulation
            });
            if let Some((_, _, _, replace)) = suggestion {
                report.reject(
                    f::TYPE,
                    format!(
                        "Using {} endpoints with {} addresses is not possible with \"encapsulation {}\", use \"encapsulation {}\" for {} instead",
                        AddressFamily::of(self.local()),
                        payload,
                        encapsulation,
                        replace,
                        self.tunnel
                    ),
                );
            }
        }
    }

    fn check_families(&self, report: &mut ValidationReport) {
        let local = AddressFamily::of(self.local());
        let remote = AddressFamily::of(self.remote());

        if local != remote {
            report.reject(
                f::REMOTE,
                format!("{}/{} mismatch between local-ip and remote-ip for {}", local, remote, self.tunnel),
            );
        }
        if local != self.variant.tunnel_family() {
            report.reject(
                f::LOCAL,
                format!("Invalid {} local-ip for {}", local, self.tunnel),
            );
        }
        if self.variant == TunnelVariant::MultipointGre && local == AddressFamily::Ipv6 {
            report.reject(
                f::LOCAL,
                format!("Using an IPv6 local-ip is forbidden for mGRE {}", self.tunnel),
            );
        }
    }

    fn check_payload(&self, report: &mut ValidationReport) {
        for family in self.payload_families() {
            if !self.variant.allows(family) {
                report.advise(
                    f::ADDRESSES_ADD,
                    format!("Should not use {} addresses on {}", family, self.tunnel),
                );
            }
        }
    }

    fn check_knobs(&self, report: &mut ValidationReport) {
        let foreign = match AddressFamily::of(self.local()) {
            AddressFamily::Ipv6 => f::IPV4_ONLY,
            AddressFamily::Ipv4 => f::IPV6_ONLY,
        };
        for field in foreign {
            if self.options().contains(field) {
                report.advise(field, format!("Using \"{}\" is invalid for {}", field, self.tunnel));
            }
        }
    }

    fn check_duplicate_pair(&self, report: &mut ValidationReport) {
        let Some(pairs) = self.options().pairs(f::TUNNEL) else {
            return;
        };
        let pair = pair_key(self.local(), self.options().text(f::REMOTE));
        if pairs.count(self.variant.encapsulation(), &pair) > 1 {
            report.reject(
                f::TUNNEL,
                format!(
                    "More than one tunnel configured with the same encapsulation and endpoints {} for {}",
                    pair, self.tunnel
                ),
            );
        }
    }
}
