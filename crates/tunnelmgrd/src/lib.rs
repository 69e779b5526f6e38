//! Tunnel Manager - GRE/IPIP/SIT tunnel interface reconciler
//!
//! tunnelmgrd reconciles one declared tunnel interface against the
//! configuration applied by the previous run:
//! - per-field change classification (create, static, modify, absent, delete)
//! - tunnel variant selection from encapsulation and endpoint options
//! - validation of field mutability, endpoint families and duplicate pairs
//! - ordered `ip`/`sysctl` mutations through a [`LinkDriver`]
//!
//! [`LinkDriver`]: sonic_cfgmgr_common::LinkDriver

pub mod applier;
pub mod commands;
pub mod config;
pub mod driver;
pub mod loader;
pub mod options;
pub mod pair_index;
pub mod snapshot;
pub mod tables;
pub mod tunnel_mgr;
pub mod types;
pub mod validator;
pub mod variant;

pub use config::TunnelMgrConfig;
pub use driver::IpTunnelDriver;
pub use loader::{Loader, Plan};
pub use options::{OptionSet, OptionValue};
pub use tunnel_mgr::{ReconcileOutcome, TunnelMgr};
pub use types::{Action, AddressFamily, Advisory};
pub use validator::{validate, ValidationReport, Violation};
pub use variant::TunnelVariant;
