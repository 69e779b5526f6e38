//! Schema-checked option set
//!
//! The option set is a bounded map: its keys are fixed when it is built from
//! a defaults table, and every write to a key outside that table fails with
//! a schema error. The kind of each option (text, number, flag, list, pair
//! index) is the kind of its default value.

use std::collections::BTreeMap;
use std::fmt;

use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::pair_index::SiblingPairIndex;
use crate::tables::option_fields as f;

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Number(u32),
    /// Rendered in config form, `enable` / `disable`.
    Flag(bool),
    List(Vec<String>),
    Pairs(SiblingPairIndex),
}

/// Kind of an [`OptionValue`], used for schema checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Text,
    Number,
    Flag,
    List,
    Pairs,
}

impl OptionValue {
    pub fn text(value: impl Into<String>) -> Self {
        OptionValue::Text(value.into())
    }

    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Text(_) => OptionKind::Text,
            OptionValue::Number(_) => OptionKind::Number,
            OptionValue::Flag(_) => OptionKind::Flag,
            OptionValue::List(_) => OptionKind::List,
            OptionValue::Pairs(_) => OptionKind::Pairs,
        }
    }

    /// Whether the value counts as configured: non-empty text and lists,
    /// non-zero numbers, enabled flags.
    pub fn is_set(&self) -> bool {
        match self {
            OptionValue::Text(s) => !s.is_empty(),
            OptionValue::Number(n) => *n != 0,
            OptionValue::Flag(b) => *b,
            OptionValue::List(l) => !l.is_empty(),
            OptionValue::Pairs(p) => !p.is_empty(),
        }
    }

    /// Converts a raw config string into a value of `kind`.
    pub fn parse(kind: OptionKind, field: &str, raw: &str) -> CfgMgrResult<Self> {
        match kind {
            OptionKind::Text => Ok(OptionValue::text(raw)),
            OptionKind::Number => raw.trim().parse().map(OptionValue::Number).map_err(|_| {
                CfgMgrError::invalid_config(field, format!("\"{}\" is not a number", raw))
            }),
            OptionKind::Flag => match raw {
                "enable" => Ok(OptionValue::Flag(true)),
                "disable" => Ok(OptionValue::Flag(false)),
                other => Err(CfgMgrError::invalid_config(
                    field,
                    format!("\"{}\" must be enable or disable", other),
                )),
            },
            OptionKind::List => Ok(OptionValue::List(vec![raw.to_string()])),
            OptionKind::Pairs => Err(CfgMgrError::schema(
                field,
                "can not be read from the configuration",
            )),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::Number(n) => write!(f, "{}", n),
            OptionValue::Flag(true) => f.write_str("enable"),
            OptionValue::Flag(false) => f.write_str("disable"),
            OptionValue::List(l) => f.write_str(&l.join(" ")),
            OptionValue::Pairs(_) => f.write_str("<pairs>"),
        }
    }
}

/// Default value of every tunnel option.
pub fn tunnel_defaults() -> Vec<(&'static str, OptionValue)> {
    vec![
        // interface definition
        (f::VRF, OptionValue::text("")),
        (f::ADDRESSES_ADD, OptionValue::List(Vec::new())),
        (f::ADDRESSES_DEL, OptionValue::List(Vec::new())),
        (f::STATE, OptionValue::text("up")),
        (f::DHCP_INTERFACE, OptionValue::text("")),
        (f::LINK_DETECT, OptionValue::Number(1)),
        (f::NHRP, OptionValue::List(Vec::new())),
        (f::IPV6_AUTOCONF, OptionValue::Number(0)),
        (f::IPV6_FORWARDING, OptionValue::Number(1)),
        (f::IPV6_DAD_TRANSMITS, OptionValue::Number(1)),
        (f::TUNNEL, OptionValue::Pairs(SiblingPairIndex::new())),
        // tunnel parameters
        (f::IFNAME, OptionValue::text("")),
        (f::TYPE, OptionValue::text("")),
        (f::ALIAS, OptionValue::text("")),
        (f::MTU, OptionValue::Number(1476)),
        (f::LOCAL, OptionValue::text("")),
        (f::REMOTE, OptionValue::text("")),
        (f::MULTICAST, OptionValue::Flag(false)),
        (f::ALLMULTICAST, OptionValue::Flag(false)),
        (f::TTL, OptionValue::text("255")),
        (f::TOS, OptionValue::text("inherit")),
        (f::KEY, OptionValue::text("")),
        (f::ENCAPLIMIT, OptionValue::text("4")),
        (f::FLOWLABEL, OptionValue::text("inherit")),
        (f::HOPLIMIT, OptionValue::text("64")),
        (f::TCLASS, OptionValue::text("inherit")),
        (f::SIXRD_PREFIX, OptionValue::text("")),
        (f::SIXRD_RELAY_PREFIX, OptionValue::text("")),
    ]
}

/// Bounded, schema-checked map of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    defaults: BTreeMap<&'static str, OptionValue>,
    values: BTreeMap<&'static str, OptionValue>,
}

impl OptionSet {
    /// Builds a set holding every default.
    pub fn with_defaults<I>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, OptionValue)>,
    {
        let defaults: BTreeMap<_, _> = defaults.into_iter().collect();
        Self {
            values: defaults.clone(),
            defaults,
        }
    }

    fn declared(&self, name: &str) -> CfgMgrResult<(&'static str, &OptionValue)> {
        self.defaults
            .get_key_value(name)
            .map(|(k, v)| (*k, v))
            .ok_or_else(|| CfgMgrError::schema(name, "has no defined default"))
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }

    /// Kind of a declared option.
    pub fn kind_of(&self, name: &str) -> CfgMgrResult<OptionKind> {
        self.declared(name).map(|(_, default)| default.kind())
    }

    pub fn default_of(&self, name: &str) -> Option<&OptionValue> {
        self.defaults.get(name)
    }

    /// Writes a declared option. Unknown names and kind mismatches are
    /// schema errors.
    pub fn set(&mut self, name: &str, value: OptionValue) -> CfgMgrResult<()> {
        let (key, default) = self.declared(name)?;
        if default.kind() != value.kind() {
            return Err(CfgMgrError::schema(
                name,
                format!("expects {:?}, got {:?}", default.kind(), value.kind()),
            ));
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) -> CfgMgrResult<()> {
        self.set(name, OptionValue::Text(value.into()))
    }

    /// Restores the default, re-adding the option if it was pruned.
    pub fn reset(&mut self, name: &str) -> CfgMgrResult<()> {
        let (key, default) = self.declared(name)?;
        let default = default.clone();
        self.values.insert(key, default);
        Ok(())
    }

    /// Removes an option so that later stages do not see it at all.
    pub fn prune(&mut self, name: &str) -> CfgMgrResult<()> {
        self.declared(name)?;
        self.values.remove(name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// True unless the option was pruned.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some_and(OptionValue::is_set)
    }

    /// Text value; empty when pruned or not text.
    pub fn text(&self, name: &str) -> &str {
        match self.get(name) {
            Some(OptionValue::Text(s)) => s,
            _ => "",
        }
    }

    pub fn number(&self, name: &str) -> Option<u32> {
        match self.get(name) {
            Some(OptionValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(OptionValue::Flag(true)))
    }

    pub fn list(&self, name: &str) -> &[String] {
        match self.get(name) {
            Some(OptionValue::List(l)) => l,
            _ => &[],
        }
    }

    pub fn pairs(&self, name: &str) -> Option<&SiblingPairIndex> {
        match self.get(name) {
            Some(OptionValue::Pairs(p)) => Some(p),
            _ => None,
        }
    }

    /// Iterates over the options still present.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
}

impl Default for OptionSet {
    fn default() -> Self {
        Self::with_defaults(tunnel_defaults())
    }
}
