//! Shell command builders for tunnel operations

use sonic_cfgmgr_common::shell::{self, shellquote};
use sonic_cfgmgr_common::FieldValue;

use crate::tables::option_fields as f;
use crate::types::is_ipv6;

/// Tunnel kinds that need `ip -6 tunnel`.
fn is_ipv6_kind(kind: &str) -> bool {
    matches!(kind, "ip6gre" | "ip6ip6" | "ipip6")
}

fn ip_tunnel(kind: &str) -> String {
    if is_ipv6_kind(kind) {
        format!("{} -6 tunnel", shell::IP_CMD)
    } else {
        format!("{} tunnel", shell::IP_CMD)
    }
}

fn on_off(value: &str) -> &'static str {
    if value == "enable" {
        "on"
    } else {
        "off"
    }
}

/// Build tunnel creation command
///
/// 6RD prefixes are not `ip tunnel add` arguments and are skipped, see
/// [`build_tunnel_6rd_cmd`].
pub fn build_tunnel_add_cmd(name: &str, kind: &str, fields: &[FieldValue]) -> String {
    let mut cmd = format!(
        "{} add {} mode {}",
        ip_tunnel(kind),
        shellquote(name),
        shellquote(kind)
    );
    for (field, value) in fields {
        if field == f::SIXRD_PREFIX || field == f::SIXRD_RELAY_PREFIX {
            continue;
        }
        cmd.push_str(&format!(" {} {}", field, shellquote(value)));
    }
    cmd
}

/// Build 6RD prefix command for a sit tunnel
pub fn build_tunnel_6rd_cmd(name: &str, prefix: &str, relay_prefix: Option<&str>) -> String {
    let mut cmd = format!(
        "{} tunnel 6rd dev {} 6rd-prefix {}",
        shell::IP_CMD,
        shellquote(name),
        shellquote(prefix)
    );
    if let Some(relay) = relay_prefix {
        cmd.push_str(&format!(" 6rd-relay_prefix {}", shellquote(relay)));
    }
    cmd
}

/// Build tunnel parameter change command (local, remote, ttl, ...)
pub fn build_tunnel_change_cmd(name: &str, kind: &str, field: &str, value: &str) -> String {
    format!(
        "{} change {} mode {} {} {}",
        ip_tunnel(kind),
        shellquote(name),
        shellquote(kind),
        field,
        shellquote(value)
    )
}

/// Build tunnel deletion command
pub fn build_tunnel_del_cmd(name: &str, kind: &str) -> String {
    format!("{} del {}", ip_tunnel(kind), shellquote(name))
}

/// Build link existence probe
pub fn build_link_show_cmd(name: &str) -> String {
    format!("{} link show dev {}", shell::IP_CMD, shellquote(name))
}

/// Build `ip link set` command for a general interface property
///
/// Returns `None` for fields that are not link properties.
pub fn build_link_set_cmd(name: &str, field: &str, value: &str) -> Option<String> {
    let args = match field {
        f::ALIAS => format!("alias {}", shellquote(value)),
        f::MTU => format!("mtu {}", shellquote(value)),
        f::MULTICAST => format!("multicast {}", on_off(value)),
        f::ALLMULTICAST => format!("allmulticast {}", on_off(value)),
        f::VRF if value.is_empty() => "nomaster".to_string(),
        f::VRF => format!("master {}", shellquote(value)),
        _ => return None,
    };
    Some(format!(
        "{} link set dev {} {}",
        shell::IP_CMD,
        shellquote(name),
        args
    ))
}

/// Build link up/down command
pub fn build_link_state_cmd(name: &str, state: &str) -> String {
    format!(
        "{} link set dev {} {}",
        shell::IP_CMD,
        shellquote(name),
        state
    )
}

/// Build `sysctl` command for a per-interface kernel knob
///
/// Returns `None` for fields that are not sysctl knobs.
pub fn build_sysctl_cmd(name: &str, field: &str, value: &str) -> Option<String> {
    let key = match field {
        f::LINK_DETECT => format!("net.ipv4.conf.{}.link_filter", name),
        f::IPV6_AUTOCONF => format!("net.ipv6.conf.{}.autoconf", name),
        f::IPV6_FORWARDING => format!("net.ipv6.conf.{}.forwarding", name),
        f::IPV6_DAD_TRANSMITS => format!("net.ipv6.conf.{}.dad_transmits", name),
        _ => return None,
    };
    Some(format!(
        "{} -wq {}",
        shell::SYSCTL_CMD,
        shellquote(&format!("{}={}", key, value))
    ))
}

fn build_addr_cmd(op: &str, name: &str, cidr: &str) -> String {
    let family = if is_ipv6(cidr) { " -6" } else { "" };
    format!(
        "{}{} addr {} {} dev {}",
        shell::IP_CMD,
        family,
        op,
        shellquote(cidr),
        shellquote(name)
    )
}

/// Build address assignment command
pub fn build_addr_add_cmd(name: &str, cidr: &str) -> String {
    build_addr_cmd("add", name, cidr)
}

/// Build address removal command
pub fn build_addr_del_cmd(name: &str, cidr: &str) -> String {
    build_addr_cmd("del", name, cidr)
}

/// Build one-line address listing command
pub fn build_addr_show_cmd(name: &str) -> String {
    format!("{} -o addr show dev {}", shell::IP_CMD, shellquote(name))
}

/// Extracts the CIDR addresses from `ip -o addr show` output, in order.
pub fn parse_addr_show(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            tokens.find(|t| *t == "inet" || *t == "inet6")?;
            tokens.next().map(str::to_string)
        })
        .collect()
}
