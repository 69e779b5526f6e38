//! Test fixtures for configuration snapshots
//!
//! Builds current/effective [`ConfigTree`] pairs from tunnel sections
//! without hand-writing nested JSON.

use serde_json::{Map, Value};
use sonic_cfgmgr_common::ConfigTree;

/// Root of the tunnel sections.
pub const TUNNEL_ROOT: &str = "interfaces tunnel";

/// Root of the NHRP consumer list.
pub const NHRP_TUNNEL_ROOT: &str = "protocols nhrp tunnel";

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

/// Inserts `leaf` at a space-delimited path, creating intermediate nodes.
pub fn insert_path(root: &mut Value, path: &str, leaf: Value) {
    let parts: Vec<&str> = path.split_whitespace().collect();
    let Some((last, parents)) = parts.split_last() else {
        *root = leaf;
        return;
    };

    let mut node = root;
    for part in parents {
        node = ensure_object(node)
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.to_string(), leaf);
}

/// One `interfaces tunnel <name>` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TunnelConfig {
    /// Interface name (e.g., "tun0")
    pub name: String,
    /// Section body
    pub body: Value,
}

impl TunnelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: Value::Object(Map::new()),
        }
    }

    /// Sets a single-valued leaf at a path relative to the section.
    pub fn with_field(mut self, path: &str, value: impl Into<String>) -> Self {
        insert_path(&mut self.body, path, Value::String(value.into()));
        self
    }

    /// Adds a valueless node (e.g. `disable`).
    pub fn with_flag(mut self, path: &str) -> Self {
        insert_path(&mut self.body, path, Value::Null);
        self
    }

    /// Sets the multi-valued `address` leaf.
    pub fn with_addresses(mut self, addresses: &[&str]) -> Self {
        let list = addresses
            .iter()
            .map(|a| Value::String(a.to_string()))
            .collect();
        insert_path(&mut self.body, "address", Value::Array(list));
        self
    }

    pub fn encapsulation(self, encapsulation: &str) -> Self {
        self.with_field("encapsulation", encapsulation)
    }

    pub fn local_ip(self, local: &str) -> Self {
        self.with_field("local-ip", local)
    }

    pub fn remote_ip(self, remote: &str) -> Self {
        self.with_field("remote-ip", remote)
    }

    pub fn dhcp_interface(self, ifname: &str) -> Self {
        self.with_field("dhcp-interface", ifname)
    }

    /// Path of the section in the configuration tree.
    pub fn section_path(&self) -> String {
        format!("{} {}", TUNNEL_ROOT, self.name)
    }
}

/// Builder for a current/effective configuration pair
#[derive(Debug, Clone)]
pub struct ConfigTreeBuilder {
    current: Value,
    effective: Value,
}

impl Default for ConfigTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTreeBuilder {
    pub fn new() -> Self {
        Self {
            current: Value::Object(Map::new()),
            effective: Value::Object(Map::new()),
        }
    }

    /// Adds a tunnel to the configuration being committed.
    pub fn with_current(mut self, tunnel: TunnelConfig) -> Self {
        let path = tunnel.section_path();
        insert_path(&mut self.current, &path, tunnel.body);
        self
    }

    /// Adds a tunnel to the previously applied configuration.
    pub fn with_effective(mut self, tunnel: TunnelConfig) -> Self {
        let path = tunnel.section_path();
        insert_path(&mut self.effective, &path, tunnel.body);
        self
    }

    /// Adds an unchanged tunnel to both configurations.
    pub fn with_applied(self, tunnel: TunnelConfig) -> Self {
        self.with_current(tunnel.clone()).with_effective(tunnel)
    }

    /// Marks a tunnel as used by NHRP in the configuration being committed.
    pub fn with_nhrp_consumer(mut self, ifname: &str) -> Self {
        let path = format!("{} {}", NHRP_TUNNEL_ROOT, ifname);
        insert_path(&mut self.current, &path, Value::Object(Map::new()));
        self
    }

    pub fn build(self) -> ConfigTree {
        ConfigTree::new(self.current, self.effective)
    }
}

/// Common tunnel configuration fixtures
pub mod tunnel_fixtures {
    use super::*;

    /// Point-to-point tunnel with both endpoints
    pub fn point_to_point(name: &str, encapsulation: &str, local: &str, remote: &str) -> TunnelConfig {
        TunnelConfig::new(name)
            .encapsulation(encapsulation)
            .local_ip(local)
            .remote_ip(remote)
    }

    /// GRE tunnel without remote endpoint (NBMA)
    pub fn multipoint_gre(name: &str, local: &str) -> TunnelConfig {
        TunnelConfig::new(name).encapsulation("gre").local_ip(local)
    }

    /// 6RD tunnel over sit
    pub fn sixrd(name: &str, remote: &str, prefix: &str) -> TunnelConfig {
        TunnelConfig::new(name)
            .encapsulation("sit")
            .remote_ip(remote)
            .with_field("6rd-prefix", prefix)
    }

    /// Tunnel whose local endpoint comes from a DHCP client interface
    pub fn dhcp_sourced(name: &str, encapsulation: &str, dhcp_interface: &str) -> TunnelConfig {
        TunnelConfig::new(name)
            .encapsulation(encapsulation)
            .dhcp_interface(dhcp_interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sonic_cfgmgr_common::ConfigStore;

    #[test]
    fn test_insert_path() {
        let mut root = json!({});
        insert_path(&mut root, "parameters ip ttl", json!("64"));
        insert_path(&mut root, "parameters ip tos", json!("inherit"));
        assert_eq!(
            root,
            json!({ "parameters": { "ip": { "ttl": "64", "tos": "inherit" } } })
        );
    }

    #[test]
    fn test_tunnel_config() {
        let tunnel = tunnel_fixtures::point_to_point("tun0", "gre", "10.0.0.1", "10.0.0.2")
            .with_flag("disable")
            .with_addresses(&["10.1.0.1/30"]);

        assert_eq!(tunnel.section_path(), "interfaces tunnel tun0");
        assert_eq!(
            tunnel.body,
            json!({
                "encapsulation": "gre",
                "local-ip": "10.0.0.1",
                "remote-ip": "10.0.0.2",
                "disable": null,
                "address": ["10.1.0.1/30"],
            })
        );
    }

    #[test]
    fn test_config_tree_builder() {
        let store = ConfigTreeBuilder::new()
            .with_applied(tunnel_fixtures::multipoint_gre("tun0", "10.0.0.1"))
            .with_current(tunnel_fixtures::sixrd("tun1", "10.0.0.9", "2001:db8::/32"))
            .with_nhrp_consumer("tun0")
            .build();

        assert!(store.exists("interfaces tunnel tun0"));
        assert!(store.exists_effective("interfaces tunnel tun0"));
        assert!(!store.exists_effective("interfaces tunnel tun1"));
        assert_eq!(
            store.value_at("interfaces tunnel tun1 6rd-prefix").as_deref(),
            Some("2001:db8::/32")
        );
        assert_eq!(store.child_names(NHRP_TUNNEL_ROOT), vec!["tun0".to_string()]);
    }
}
