//! Verification helpers for testing configuration managers
//!
//! Provides a recording [`LinkDriver`] and assertion helpers over the calls
//! and commands a manager issued.

use std::collections::HashMap;

use async_trait::async_trait;
use sonic_cfgmgr_common::{
    AdminState, CfgMgrError, CfgMgrResult, FieldValues, LinkDriver, LinkHandle,
};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected {expected} not found in {actual}")]
    NotFound { expected: String, actual: String },

    #[error("Unexpected {unexpected} found")]
    Unexpected { unexpected: String },

    #[error("Expected {expected} {what}, found {actual}")]
    CountMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Expected {first} before {second}")]
    OrderMismatch { first: String, second: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// One mutation issued through a [`RecordingDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Create {
        name: String,
        kind: String,
        fields: FieldValues,
    },
    SetField {
        name: String,
        field: String,
        value: String,
    },
    AddAddress {
        name: String,
        cidr: String,
    },
    RemoveAddress {
        name: String,
        cidr: String,
    },
    SetAdminState {
        name: String,
        state: AdminState,
    },
    Remove {
        name: String,
    },
}

impl DriverCall {
    /// Operation label: `create`, `set <field>`, `add address`,
    /// `remove address`, `set state` or `remove`.
    pub fn operation(&self) -> String {
        match self {
            DriverCall::Create { .. } => "create".to_string(),
            DriverCall::SetField { field, .. } => format!("set {}", field),
            DriverCall::AddAddress { .. } => "add address".to_string(),
            DriverCall::RemoveAddress { .. } => "remove address".to_string(),
            DriverCall::SetAdminState { .. } => "set state".to_string(),
            DriverCall::Remove { .. } => "remove".to_string(),
        }
    }

    /// Interface the call was issued for.
    pub fn name(&self) -> &str {
        match self {
            DriverCall::Create { name, .. }
            | DriverCall::SetField { name, .. }
            | DriverCall::AddAddress { name, .. }
            | DriverCall::RemoveAddress { name, .. }
            | DriverCall::SetAdminState { name, .. }
            | DriverCall::Remove { name } => name.as_str(),
        }
    }
}

/// In-memory [`LinkDriver`] recording every mutation.
///
/// Address reads are answered from a per-interface table that mutations
/// keep up to date. Reads are not recorded.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Vec<DriverCall>,
    addresses: HashMap<String, Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the addresses reported for an interface.
    pub fn with_addresses(mut self, ifname: &str, addresses: &[&str]) -> Self {
        self.addresses.insert(
            ifname.to_string(),
            addresses.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    /// Makes every call with this [`DriverCall::operation`] fail.
    pub fn fail_on(mut self, operation: &str) -> Self {
        self.fail_on = Some(operation.to_string());
        self
    }

    /// Calls issued so far, failed ones included.
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DriverCall> {
        std::mem::take(&mut self.calls)
    }

    fn record(&mut self, call: DriverCall) -> CfgMgrResult<()> {
        let operation = call.operation();
        self.calls.push(call);
        if self.fail_on.as_deref() == Some(operation.as_str()) {
            return Err(CfgMgrError::driver(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkDriver for RecordingDriver {
    async fn create(
        &mut self,
        name: &str,
        kind: &str,
        fields: &FieldValues,
    ) -> CfgMgrResult<LinkHandle> {
        self.record(DriverCall::Create {
            name: name.to_string(),
            kind: kind.to_string(),
            fields: fields.clone(),
        })?;
        Ok(LinkHandle::new(name, kind))
    }

    async fn set_field(&mut self, link: &LinkHandle, field: &str, value: &str) -> CfgMgrResult<()> {
        self.record(DriverCall::SetField {
            name: link.name.clone(),
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    async fn add_address(&mut self, link: &LinkHandle, cidr: &str) -> CfgMgrResult<()> {
        self.record(DriverCall::AddAddress {
            name: link.name.clone(),
            cidr: cidr.to_string(),
        })?;
        let addresses = self.addresses.entry(link.name.clone()).or_default();
        if !addresses.iter().any(|a| a == cidr) {
            addresses.push(cidr.to_string());
        }
        Ok(())
    }

    async fn remove_address(&mut self, link: &LinkHandle, cidr: &str) -> CfgMgrResult<()> {
        self.record(DriverCall::RemoveAddress {
            name: link.name.clone(),
            cidr: cidr.to_string(),
        })?;
        if let Some(addresses) = self.addresses.get_mut(&link.name) {
            addresses.retain(|a| a != cidr);
        }
        Ok(())
    }

    async fn set_admin_state(&mut self, link: &LinkHandle, state: AdminState) -> CfgMgrResult<()> {
        self.record(DriverCall::SetAdminState {
            name: link.name.clone(),
            state,
        })
    }

    async fn remove(&mut self, link: &LinkHandle) -> CfgMgrResult<()> {
        self.record(DriverCall::Remove {
            name: link.name.clone(),
        })?;
        self.addresses.remove(&link.name);
        Ok(())
    }

    async fn current_addresses(&mut self, ifname: &str) -> CfgMgrResult<Vec<String>> {
        Ok(self.addresses.get(ifname).cloned().unwrap_or_default())
    }
}

/// Driver call verifier
pub struct CallVerifier<'a> {
    calls: &'a [DriverCall],
}

impl<'a> CallVerifier<'a> {
    pub fn new(calls: &'a [DriverCall]) -> Self {
        Self { calls }
    }

    fn position(&self, operation: &str) -> Option<usize> {
        self.calls.iter().position(|c| c.operation() == operation)
    }

    /// Verify that an operation was issued
    pub fn assert_operation(&self, operation: &str) -> VerifyResult<()> {
        match self.position(operation) {
            Some(_) => Ok(()),
            None => Err(VerificationError::NotFound {
                expected: operation.to_string(),
                actual: format!("{:?}", self.operations()),
            }),
        }
    }

    /// Verify that an operation was NOT issued
    pub fn assert_no_operation(&self, operation: &str) -> VerifyResult<()> {
        match self.position(operation) {
            Some(_) => Err(VerificationError::Unexpected {
                unexpected: operation.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Verify that the first `first` precedes the last `second`
    pub fn assert_before(&self, first: &str, second: &str) -> VerifyResult<()> {
        let last_second = self.calls.iter().rposition(|c| c.operation() == second);
        match (self.position(first), last_second) {
            (Some(a), Some(b)) if a < b => Ok(()),
            _ => Err(VerificationError::OrderMismatch {
                first: first.to_string(),
                second: second.to_string(),
            }),
        }
    }

    /// Verify the number of calls issued
    pub fn assert_call_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.calls.len();
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                what: "driver calls".to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Operation labels in call order
    pub fn operations(&self) -> Vec<String> {
        self.calls.iter().map(DriverCall::operation).collect()
    }
}

/// Command execution verifier (for dry-run drivers)
pub struct CommandVerifier {
    captured_commands: Vec<String>,
}

impl CommandVerifier {
    /// Create a new command verifier
    pub fn new(captured_commands: Vec<String>) -> Self {
        Self { captured_commands }
    }

    /// Verify that a specific command was executed
    pub fn assert_command_executed(&self, expected: &str) -> VerifyResult<()> {
        if self
            .captured_commands
            .iter()
            .any(|cmd| cmd.contains(expected))
        {
            Ok(())
        } else {
            Err(VerificationError::NotFound {
                expected: expected.to_string(),
                actual: format!("{:?}", self.captured_commands),
            })
        }
    }

    /// Verify that a command was NOT executed
    pub fn assert_command_not_executed(&self, expected: &str) -> VerifyResult<()> {
        if self
            .captured_commands
            .iter()
            .any(|cmd| cmd.contains(expected))
        {
            Err(VerificationError::Unexpected {
                unexpected: expected.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Verify the number of commands executed
    pub fn assert_command_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.captured_commands.len();
        if actual != expected {
            Err(VerificationError::CountMismatch {
                what: "commands".to_string(),
                expected,
                actual,
            })
        } else {
            Ok(())
        }
    }

    /// Get all captured commands
    pub fn captured_commands(&self) -> &[String] {
        &self.captured_commands
    }
}
