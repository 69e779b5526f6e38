//! `ip`/`sysctl` backed link driver.

use async_trait::async_trait;
use sonic_cfgmgr_common::{
    shell, AdminState, CfgMgrError, CfgMgrResult, FieldValues, FieldValuesExt, LinkDriver,
    LinkHandle,
};
use tracing::{debug, info};

use crate::commands::*;
use crate::tables::option_fields as f;

/// Drives the kernel through the `ip` and `sysctl` tools.
///
/// In dry-run mode commands are logged and recorded instead of executed, and
/// no interface exists yet and none has addresses.
#[derive(Debug, Default)]
pub struct IpTunnelDriver {
    dry_run: bool,
    executed: Vec<String>,
}

impl IpTunnelDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            executed: Vec::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Commands issued so far.
    pub fn executed_commands(&self) -> &[String] {
        &self.executed
    }

    /// Execute shell command (or only record it in dry-run mode)
    async fn exec(&mut self, cmd: &str) -> CfgMgrResult<String> {
        self.executed.push(cmd.to_string());
        if self.dry_run {
            info!(command = %cmd, "dry-run");
            return Ok(String::new());
        }
        shell::exec_checked(cmd).await
    }

    async fn link_exists(&mut self, name: &str) -> bool {
        if self.dry_run {
            return false;
        }
        shell::succeeds(&build_link_show_cmd(name)).await
    }
}

#[async_trait]
impl LinkDriver for IpTunnelDriver {
    async fn create(
        &mut self,
        name: &str,
        kind: &str,
        fields: &FieldValues,
    ) -> CfgMgrResult<LinkHandle> {
        let link = LinkHandle::new(name, kind);
        if self.link_exists(name).await {
            debug!(ifname = %name, "Tunnel already exists");
            return Ok(link);
        }

        self.exec(&build_tunnel_add_cmd(name, kind, fields)).await?;
        if let Some(prefix) = fields.get_field(f::SIXRD_PREFIX) {
            let relay = fields.get_field(f::SIXRD_RELAY_PREFIX);
            self.exec(&build_tunnel_6rd_cmd(name, prefix, relay)).await?;
        }

        info!(ifname = %name, kind = %kind, "Tunnel created");
        Ok(link)
    }

    async fn set_field(&mut self, link: &LinkHandle, field: &str, value: &str) -> CfgMgrResult<()> {
        let cmd = match field {
            f::LOCAL | f::REMOTE | f::TTL | f::TOS | f::KEY | f::ENCAPLIMIT | f::FLOWLABEL
            | f::HOPLIMIT | f::TCLASS => {
                Some(build_tunnel_change_cmd(&link.name, &link.kind, field, value))
            }
            _ => build_link_set_cmd(&link.name, field, value)
                .or_else(|| build_sysctl_cmd(&link.name, field, value)),
        };
        let cmd = cmd.ok_or_else(|| {
            CfgMgrError::driver(
                format!("set {}", field),
                format!("unsupported field for {}", link.name),
            )
        })?;
        self.exec(&cmd).await?;
        Ok(())
    }

    async fn add_address(&mut self, link: &LinkHandle, cidr: &str) -> CfgMgrResult<()> {
        self.exec(&build_addr_add_cmd(&link.name, cidr)).await?;
        Ok(())
    }

    async fn remove_address(&mut self, link: &LinkHandle, cidr: &str) -> CfgMgrResult<()> {
        self.exec(&build_addr_del_cmd(&link.name, cidr)).await?;
        Ok(())
    }

    async fn set_admin_state(&mut self, link: &LinkHandle, state: AdminState) -> CfgMgrResult<()> {
        self.exec(&build_link_state_cmd(&link.name, state.as_str()))
            .await?;
        Ok(())
    }

    async fn remove(&mut self, link: &LinkHandle) -> CfgMgrResult<()> {
        self.exec(&build_tunnel_del_cmd(&link.name, &link.kind))
            .await?;
        info!(ifname = %link.name, "Tunnel removed");
        Ok(())
    }

    async fn current_addresses(&mut self, ifname: &str) -> CfgMgrResult<Vec<String>> {
        if self.dry_run {
            return Ok(Vec::new());
        }
        let output = shell::exec_checked(&build_addr_show_cmd(ifname)).await?;
        Ok(parse_addr_show(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_cfgmgr_common::field_values;

    #[tokio::test]
    async fn test_dry_run_records_commands() {
        let mut driver = IpTunnelDriver::dry_run();
        let fields: FieldValues = field_values! {
            "remote" => "10.0.0.2",
            "6rd-prefix" => "2001:db8::/32",
        };
        let link = driver.create("tun0", "sit", &fields).await.unwrap();
        driver.set_field(&link, f::MTU, "1400").await.unwrap();
        driver.set_field(&link, f::IPV6_AUTOCONF, "1").await.unwrap();
        driver.set_field(&link, f::TTL, "64").await.unwrap();
        driver.set_admin_state(&link, AdminState::Up).await.unwrap();

        let cmds = driver.executed_commands();
        assert_eq!(cmds.len(), 6);
        assert!(cmds[0].contains("ip tunnel add \"tun0\" mode \"sit\""));
        assert!(cmds[1].contains("ip tunnel 6rd dev \"tun0\""));
        assert!(cmds[2].contains("mtu \"1400\""));
        assert!(cmds[3].contains("net.ipv6.conf.tun0.autoconf=1"));
        assert!(cmds[4].contains("tunnel change \"tun0\" mode \"sit\" ttl \"64\""));
        assert!(cmds[5].ends_with("up"));
    }

    #[tokio::test]
    async fn test_unknown_field_is_driver_error() {
        let mut driver = IpTunnelDriver::dry_run();
        let link = LinkHandle::new("tun0", "gre");
        let err = driver.set_field(&link, "nhrp", "x").await.unwrap_err();
        assert!(err.is_driver_error());
        assert!(driver.executed_commands().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_has_no_addresses() {
        let mut driver = IpTunnelDriver::dry_run();
        assert!(driver.current_addresses("eth0").await.unwrap().is_empty());
        assert!(driver.is_dry_run());
    }
}
