//! Link driver abstraction.
//!
//! Config managers never touch the network stack directly: every mutation
//! goes through a [`LinkDriver`]. Production code drives the kernel through
//! `ip`/`sysctl`; tests substitute a recording driver.

use std::fmt;

use async_trait::async_trait;

use crate::error::CfgMgrResult;

/// Key-value tuple representing a field and its value.
pub type FieldValue = (String, String);

/// Ordered collection of field-value pairs.
pub type FieldValues = Vec<FieldValue>;

/// Helper trait for working with field-value collections.
pub trait FieldValuesExt {
    /// Gets the value for a field, if present.
    fn get_field(&self, field: &str) -> Option<&str>;

    /// Gets the value for a field, returning the default if not present.
    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str;

    /// Checks if a field exists.
    fn has_field(&self, field: &str) -> bool;
}

impl FieldValuesExt for FieldValues {
    fn get_field(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.get_field(field).unwrap_or(default)
    }

    fn has_field(&self, field: &str) -> bool {
        self.iter().any(|(f, _)| f == field)
    }
}

/// Builds a FieldValues collection from key-value pairs.
#[macro_export]
macro_rules! field_values {
    ($($field:expr => $value:expr),* $(,)?) => {
        vec![
            $(($field.to_string(), $value.to_string()),)*
        ]
    };
}

/// Administrative state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    Up,
    Down,
}

impl AdminState {
    /// Parses the configuration form (`up`/`down`); anything but `down`
    /// means up.
    pub fn from_config(value: &str) -> Self {
        if value == "down" {
            AdminState::Down
        } else {
            AdminState::Up
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminState::Up => "up",
            AdminState::Down => "down",
        }
    }
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a link managed through a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHandle {
    /// Interface name (e.g. `tun0`).
    pub name: String,
    /// Kernel link kind (e.g. `gre`, `ip6gre`, `sit`).
    pub kind: String,
}

impl LinkHandle {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Network-stack mutations used by config managers.
///
/// Calls are issued one at a time and never retried; a failure leaves the
/// link in whatever state the stack left it.
#[async_trait]
pub trait LinkDriver: Send {
    /// Creates the link, or adopts it if it already exists, applying the
    /// creation-time fields.
    async fn create(
        &mut self,
        name: &str,
        kind: &str,
        fields: &FieldValues,
    ) -> CfgMgrResult<LinkHandle>;

    /// Sets a single link property.
    async fn set_field(&mut self, link: &LinkHandle, field: &str, value: &str)
        -> CfgMgrResult<()>;

    /// Adds an address in CIDR notation.
    async fn add_address(&mut self, link: &LinkHandle, cidr: &str) -> CfgMgrResult<()>;

    /// Removes an address in CIDR notation.
    async fn remove_address(&mut self, link: &LinkHandle, cidr: &str) -> CfgMgrResult<()>;

    /// Brings the link up or down.
    async fn set_admin_state(&mut self, link: &LinkHandle, state: AdminState)
        -> CfgMgrResult<()>;

    /// Deletes the link.
    async fn remove(&mut self, link: &LinkHandle) -> CfgMgrResult<()>;

    /// Addresses currently bound to an interface, in CIDR notation.
    async fn current_addresses(&mut self, ifname: &str) -> CfgMgrResult<Vec<String>>;
}
