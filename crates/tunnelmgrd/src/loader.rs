//! Loader / defaulting pipeline
//!
//! Turns a [`ConfigSnapshot`] into a [`Plan`]: every mapped option is
//! classified and read, then the post-load adjustments run in order:
//!
//! 1. DHCP endpoint resolution
//! 2. cross-family parameter pruning
//! 3. address delta
//! 4. allmulticast follows multicast
//! 5. sibling pair indexing

use sonic_cfgmgr_common::{join_path, CfgMgrResult, ConfigStore, LinkDriver};
use tracing::{debug, info};

use crate::options::{OptionSet, OptionValue};
use crate::pair_index::{pair_key, SiblingPairIndex};
use crate::snapshot::{ActionTally, ConfigSnapshot};
use crate::tables::{
    option_fields as f, tunnel_paths, tunnel_section, FieldMapping, CFG_NHRP_TUNNEL_ROOT,
    CFG_TUNNEL_ROOT, LOOPBACK_FALLBACK,
};
use crate::types::{strip_prefix_len, Action, AddressFamily, Advisory};

/// Everything the validator and the applier need about one run.
#[derive(Debug, Clone)]
pub struct Plan {
    pub ifname: String,
    pub options: OptionSet,
    pub actions: ActionTally,
    /// Section-level action.
    pub section: Action,
    /// Advisories raised while loading.
    pub advisories: Vec<Advisory>,
}

impl Plan {
    /// Encapsulation as loaded (the effective one when deleting).
    pub fn encapsulation(&self) -> &str {
        self.options.text(f::TYPE)
    }

    pub fn is_delete(&self) -> bool {
        self.section == Action::Delete
    }
}

/// Reads one tunnel's options according to a field mapping.
pub struct Loader<'m> {
    mapping: &'m [FieldMapping],
    defaults: Vec<(&'static str, OptionValue)>,
}

impl<'m> Loader<'m> {
    pub fn new(mapping: &'m [FieldMapping], defaults: Vec<(&'static str, OptionValue)>) -> Self {
        Self { mapping, defaults }
    }

    /// Builds the plan. The driver is only queried for interface addresses.
    pub async fn load<S, D>(
        &self,
        snapshot: &ConfigSnapshot<'_, S>,
        ifname: &str,
        driver: &mut D,
    ) -> CfgMgrResult<Plan>
    where
        S: ConfigStore + ?Sized,
        D: LinkDriver + ?Sized,
    {
        let mut options = OptionSet::with_defaults(self.defaults.clone());
        let mut actions = ActionTally::new();
        let mut advisories = Vec::new();
        let section = snapshot.section_action();

        options.set_text(f::IFNAME, ifname)?;

        if section == Action::Delete {
            load_for_delete(snapshot, &mut options, &mut actions)?;
            info!(ifname = %ifname, encapsulation = %options.text(f::TYPE), "Tunnel removed from configuration");
            return Ok(Plan {
                ifname: ifname.to_string(),
                options,
                actions,
                section,
                advisories,
            });
        }

        for mapping in self.mapping {
            load_field(snapshot, mapping, &mut options, &mut actions)?;
        }
        options.set(
            f::NHRP,
            OptionValue::List(snapshot.store().child_names(CFG_NHRP_TUNNEL_ROOT)),
        )?;

        if let Some(advisory) = resolve_dhcp_local(&mut options, driver).await? {
            advisories.push(advisory);
        }

        prune_cross_family(&mut options, &actions)?;

        let declared = options.list(f::ADDRESSES_ADD).to_vec();
        let stale: Vec<String> = snapshot
            .effective_values(tunnel_paths::ADDRESS)
            .into_iter()
            .filter(|addr| !declared.contains(addr))
            .collect();
        options.set(f::ADDRESSES_DEL, OptionValue::List(stale))?;

        let multicast = options.flag(f::MULTICAST);
        options.set(f::ALLMULTICAST, OptionValue::Flag(multicast))?;

        let pairs = sibling_pairs(snapshot.store(), driver).await;
        options.set(f::TUNNEL, OptionValue::Pairs(pairs))?;

        debug!(
            ifname = %ifname,
            section = %section,
            created = ?actions.fields_with(Action::Create),
            modified = ?actions.fields_with(Action::Modify),
            deleted = ?actions.fields_with(Action::Delete),
            "Tunnel options loaded"
        );

        Ok(Plan {
            ifname: ifname.to_string(),
            options,
            actions,
            section,
            advisories,
        })
    }
}

/// On deletion only the effective encapsulation and the NHRP consumers are
/// needed.
fn load_for_delete<S: ConfigStore + ?Sized>(
    snapshot: &ConfigSnapshot<'_, S>,
    options: &mut OptionSet,
    actions: &mut ActionTally,
) -> CfgMgrResult<()> {
    actions.record(
        f::TYPE,
        snapshot.classify(tunnel_paths::ENCAPSULATION, false),
    );
    if let Some(encapsulation) = snapshot.effective_value(tunnel_paths::ENCAPSULATION) {
        options.set_text(f::TYPE, encapsulation)?;
    }
    options.set(
        f::NHRP,
        OptionValue::List(snapshot.store().child_names(CFG_NHRP_TUNNEL_ROOT)),
    )
}

fn load_field<S: ConfigStore + ?Sized>(
    snapshot: &ConfigSnapshot<'_, S>,
    mapping: &FieldMapping,
    options: &mut OptionSet,
    actions: &mut ActionTally,
) -> CfgMgrResult<()> {
    let action = snapshot.classify(mapping.path, mapping.multi);
    actions.record(mapping.field, action);
    if !action.is_present() {
        return Ok(());
    }

    let kind = options.kind_of(mapping.field)?;
    let stored = if mapping.multi {
        Some(snapshot.values(mapping.path))
            .filter(|values| !values.is_empty())
            .map(OptionValue::List)
    } else {
        snapshot
            .value(mapping.path)
            .filter(|raw| !raw.is_empty())
            .map(|raw| OptionValue::parse(kind, mapping.field, &raw))
            .transpose()?
    };

    match (stored, mapping.override_default) {
        (Some(value), _) => options.set(mapping.field, value),
        (None, Some(raw)) => options.set(mapping.field, OptionValue::parse(kind, mapping.field, raw)?),
        (None, None) => options.reset(mapping.field),
    }
}

/// First address bound to `ifname`, without prefix length.
async fn interface_address<D: LinkDriver + ?Sized>(driver: &mut D, ifname: &str) -> Option<String> {
    if ifname.is_empty() {
        return None;
    }
    match driver.current_addresses(ifname).await {
        Ok(addrs) => addrs
            .first()
            .map(|addr| strip_prefix_len(addr).to_string()),
        Err(e) => {
            debug!(ifname = %ifname, error = %e, "Could not read interface addresses");
            None
        }
    }
}

/// Replaces a DHCP interface by its current address. Falls back to the
/// loopback address, with an advisory, when the interface has none.
async fn resolve_dhcp_local<D: LinkDriver + ?Sized>(
    options: &mut OptionSet,
    driver: &mut D,
) -> CfgMgrResult<Option<Advisory>> {
    if options.is_set(f::LOCAL) || !options.is_set(f::DHCP_INTERFACE) {
        return Ok(None);
    }

    let dhcp = options.text(f::DHCP_INTERFACE).to_string();
    let mut advisory = None;
    let local = match interface_address(driver, &dhcp).await {
        Some(addr) => {
            info!(dhcp_interface = %dhcp, local = %addr, "Using DHCP interface address as local-ip");
            addr
        }
        None => {
            let message = format!(
                "No IP address found on {}, using {} as local-ip",
                dhcp, LOOPBACK_FALLBACK
            );
            debug!(dhcp_interface = %dhcp, "No address on DHCP interface");
            advisory = Some(Advisory::for_field(f::DHCP_INTERFACE, message));
            LOOPBACK_FALLBACK.to_string()
        }
    };

    options.set_text(f::LOCAL, local)?;
    options.set_text(f::DHCP_INTERFACE, "")?;
    Ok(advisory)
}

/// Drops parameters of the other endpoint family unless they were
/// explicitly configured to a non-default value.
fn prune_cross_family(options: &mut OptionSet, actions: &ActionTally) -> CfgMgrResult<()> {
    let foreign = match AddressFamily::of(options.text(f::LOCAL)) {
        AddressFamily::Ipv6 => f::IPV4_ONLY,
        AddressFamily::Ipv4 => f::IPV6_ONLY,
    };

    for field in foreign {
        let configured = actions.action_of(field).is_some_and(|a| a.is_present());
        if configured && options.get(field) != options.default_of(field) {
            continue;
        }
        options.prune(field)?;
    }
    Ok(())
}

/// Counts local/remote pairs per encapsulation over every configured
/// tunnel, this one included.
async fn sibling_pairs<S, D>(store: &S, driver: &mut D) -> SiblingPairIndex
where
    S: ConfigStore + ?Sized,
    D: LinkDriver + ?Sized,
{
    let mut index = SiblingPairIndex::new();

    for name in store.child_names(CFG_TUNNEL_ROOT) {
        let section = tunnel_section(&name);
        let value = |rel: &str| {
            store
                .value_at(&join_path(&section, rel))
                .unwrap_or_default()
        };

        let encapsulation = value(tunnel_paths::ENCAPSULATION);
        let remote = value(tunnel_paths::REMOTE_IP);
        let mut local = value(tunnel_paths::LOCAL_IP);
        if local.is_empty() {
            let dhcp = value(tunnel_paths::DHCP_INTERFACE);
            if !dhcp.is_empty() {
                local = interface_address(driver, &dhcp)
                    .await
                    .unwrap_or_else(|| LOOPBACK_FALLBACK.to_string());
            }
        }

        index.record(&encapsulation, pair_key(&local, &remote));
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::tunnel_defaults;
    use crate::tables::TUNNEL_FIELD_MAPPING;
    use serde_json::json;
    use sonic_cfgmgr_common::{CfgMgrError, ConfigTree};
    use sonic_cfgmgr_test::RecordingDriver;

    async fn load(store: &ConfigTree, driver: &mut RecordingDriver) -> CfgMgrResult<Plan> {
        let snapshot = ConfigSnapshot::new(store, tunnel_section("tun0"));
        Loader::new(TUNNEL_FIELD_MAPPING, tunnel_defaults())
            .load(&snapshot, "tun0", driver)
            .await
    }

    fn tunnels(current: serde_json::Value, effective: serde_json::Value) -> ConfigTree {
        ConfigTree::new(
            json!({ "interfaces": { "tunnel": current } }),
            json!({ "interfaces": { "tunnel": effective } }),
        )
    }

    #[tokio::test]
    async fn test_load_create_section() {
        let store = tunnels(
            json!({ "tun0": {
                "encapsulation": "gre",
                "local-ip": "10.0.0.1",
                "remote-ip": "10.0.0.2",
                "mtu": "1400",
                "disable": null,
                "address": ["10.1.0.1/30"],
            }}),
            json!({}),
        );
        let mut driver = RecordingDriver::new();
        let plan = load(&store, &mut driver).await.unwrap();

        assert_eq!(plan.section, Action::Create);
        assert_eq!(plan.encapsulation(), "gre");
        assert_eq!(plan.options.number(f::MTU), Some(1400));
        assert_eq!(plan.options.text(f::STATE), "down");
        assert_eq!(plan.options.text(f::IFNAME), "tun0");
        assert_eq!(plan.actions.action_of(f::LOCAL), Some(Action::Create));
        assert_eq!(plan.actions.action_of(f::VRF), Some(Action::Absent));
        // IPv4 endpoints drop the IPv6 parameters
        assert!(!plan.options.contains(f::ENCAPLIMIT));
        assert_eq!(plan.options.text(f::TTL), "255");
        assert!(plan.advisories.is_empty());
    }

    #[tokio::test]
    async fn test_valueless_nodes_use_override_defaults() {
        let store = tunnels(
            json!({ "tun0": {
                "encapsulation": "gre",
                "local-ip": "10.0.0.1",
                "disable-link-detect": null,
                "ipv6": { "address": { "autoconf": null }, "disable-forwarding": {} },
            }}),
            json!({}),
        );
        let plan = load(&store, &mut RecordingDriver::new()).await.unwrap();

        assert_eq!(plan.options.number(f::LINK_DETECT), Some(2));
        assert_eq!(plan.options.number(f::IPV6_AUTOCONF), Some(1));
        assert_eq!(plan.options.number(f::IPV6_FORWARDING), Some(0));
        assert_eq!(plan.options.number(f::IPV6_DAD_TRANSMITS), Some(1));
        assert_eq!(plan.options.text(f::STATE), "up");
    }

    #[tokio::test]
    async fn test_deleted_field_keeps_default() {
        let store = tunnels(
            json!({ "tun0": { "encapsulation": "gre", "local-ip": "10.0.0.1" } }),
            json!({ "tun0": { "encapsulation": "gre", "local-ip": "10.0.0.1", "mtu": "9000" } }),
        );
        let plan = load(&store, &mut RecordingDriver::new()).await.unwrap();

        assert_eq!(plan.section, Action::Modify);
        assert_eq!(plan.actions.action_of(f::MTU), Some(Action::Delete));
        assert_eq!(plan.options.number(f::MTU), Some(1476));
        assert_eq!(plan.actions.action_of(f::TYPE), Some(Action::Static));
    }

    #[tokio::test]
    async fn test_invalid_number_is_config_error() {
        let store = tunnels(
            json!({ "tun0": { "encapsulation": "gre", "mtu": "jumbo" } }),
            json!({}),
        );
        let err = load(&store, &mut RecordingDriver::new()).await.unwrap_err();
        assert!(matches!(err, CfgMgrError::InvalidConfig { ref field, .. } if field == f::MTU));
    }

    #[tokio::test]
    async fn test_unknown_mapping_field_is_schema_error() {
        let store = tunnels(
            json!({ "tun0": { "ipv6": { "dup-addr-detect-transmits": "3" } } }),
            json!({}),
        );
        let mapping = [FieldMapping {
            field: "ipv6_dad_transmits:",
            path: tunnel_paths::IPV6_DAD_TRANSMITS,
            multi: false,
            override_default: None,
        }];
        let snapshot = ConfigSnapshot::new(&store, tunnel_section("tun0"));
        let err = Loader::new(&mapping, tunnel_defaults())
            .load(&snapshot, "tun0", &mut RecordingDriver::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CfgMgrError::Schema { .. }));
    }

    #[tokio::test]
    async fn test_delete_section_reads_effective_encapsulation_only() {
        let store = ConfigTree::new(
            json!({ "interfaces": { "tunnel": {} },
                    "protocols": { "nhrp": { "tunnel": { "tun0": {}, "tun5": {} } } } }),
            json!({ "interfaces": { "tunnel": { "tun0": {
                "encapsulation": "gre", "local-ip": "10.0.0.1", "mtu": "1400" } } } }),
        );
        let plan = load(&store, &mut RecordingDriver::new()).await.unwrap();

        assert!(plan.is_delete());
        assert_eq!(plan.encapsulation(), "gre");
        assert_eq!(plan.options.list(f::NHRP), ["tun0", "tun5"]);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions.action_of(f::TYPE), Some(Action::Delete));
        assert_eq!(plan.options.number(f::MTU), Some(1476));
    }

    #[tokio::test]
    async fn test_address_delta() {
        let store = tunnels(
            json!({ "tun0": { "encapsulation": "gre", "local-ip": "10.0.0.1",
                              "address": ["10.9.0.2/30", "10.9.0.4/30"] } }),
            json!({ "tun0": { "encapsulation": "gre", "local-ip": "10.0.0.1",
                              "address": ["10.9.0.1/30", "10.9.0.2/30", "10.9.0.3/30"] } }),
        );
        let plan = load(&store, &mut RecordingDriver::new()).await.unwrap();

        assert_eq!(
            plan.options.list(f::ADDRESSES_DEL),
            ["10.9.0.1/30", "10.9.0.3/30"]
        );
        assert_eq!(
            plan.options.list(f::ADDRESSES_ADD),
            ["10.9.0.2/30", "10.9.0.4/30"]
        );
        assert_eq!(plan.actions.action_of(f::ADDRESSES_ADD), Some(Action::Modify));
    }

    #[tokio::test]
    async fn test_allmulticast_follows_multicast() {
        let store = tunnels(
            json!({ "tun0": { "encapsulation": "gre", "local-ip": "10.0.0.1",
                              "multicast": "enable" } }),
            json!({}),
        );
        let plan = load(&store, &mut RecordingDriver::new()).await.unwrap();
        assert!(plan.options.flag(f::MULTICAST));
        assert!(plan.options.flag(f::ALLMULTICAST));
    }

    #[tokio::test]
    async fn test_dhcp_interface_resolution() {
        let store = tunnels(
            json!({ "tun0": { "encapsulation": "gre", "dhcp-interface": "eth0" } }),
            json!({}),
        );
        let mut driver = RecordingDriver::new()
            .with_addresses("eth0", &["192.0.2.10/24", "192.0.2.11/24"]);
        let plan = load(&store, &mut driver).await.unwrap();

        assert_eq!(plan.options.text(f::LOCAL), "192.0.2.10");
        assert_eq!(plan.options.text(f::DHCP_INTERFACE), "");
        assert!(plan.advisories.is_empty());
    }

    #[tokio::test]
    async fn test_dhcp_interface_without_address_falls_back_to_loopback() {
        let store = tunnels(
            json!({ "tun0": { "encapsulation": "gre", "dhcp-interface": "eth1" } }),
            json!({}),
        );
        let plan = load(&store, &mut RecordingDriver::new()).await.unwrap();

        assert_eq!(plan.options.text(f::LOCAL), LOOPBACK_FALLBACK);
        assert_eq!(plan.advisories.len(), 1);
        assert_eq!(plan.advisories[0].field, f::DHCP_INTERFACE);
    }

    #[tokio::test]
    async fn test_ipv6_local_prunes_ipv4_parameters() {
        let store = tunnels(
            json!({ "tun0": {
                "encapsulation": "ip6gre",
                "local-ip": "2001:db8::1",
                "remote-ip": "2001:db8::2",
                "parameters": { "ip": { "ttl": "64", "tos": "inherit" } },
            }}),
            json!({}),
        );
        let plan = load(&store, &mut RecordingDriver::new()).await.unwrap();

        // explicitly configured to a non-default value: kept
        assert_eq!(plan.options.text(f::TTL), "64");
        // configured to the default value: pruned
        assert!(!plan.options.contains(f::TOS));
        assert!(!plan.options.contains(f::KEY));
        assert_eq!(plan.options.text(f::HOPLIMIT), "64");
    }

    #[tokio::test]
    async fn test_sibling_pair_index() {
        let store = tunnels(
            json!({
                "tun0": { "encapsulation": "gre", "local-ip": "10.0.0.1", "remote-ip": "10.0.0.2" },
                "tun1": { "encapsulation": "gre", "local-ip": "10.0.0.1", "remote-ip": "10.0.0.2" },
                "tun2": { "encapsulation": "ipip", "local-ip": "10.0.0.1" },
                "tun3": { "encapsulation": "gre", "dhcp-interface": "eth0" },
            }),
            json!({}),
        );
        let mut driver = RecordingDriver::new().with_addresses("eth0", &["198.51.100.7/24"]);
        let plan = load(&store, &mut driver).await.unwrap();
        let pairs = plan.options.pairs(f::TUNNEL).unwrap();

        assert_eq!(pairs.count("gre", "10.0.0.1-10.0.0.2"), 2);
        assert_eq!(pairs.count("ipip", "10.0.0.1-<unset>"), 1);
        assert_eq!(pairs.count("gre", "198.51.100.7-<unset>"), 1);
    }
}
