//! Common infrastructure for SONiC configuration manager daemons.
//!
//! - [`shell`]: `ip`/`sysctl` command execution and argument quoting
//! - [`store`]: Current/effective configuration tree access
//! - [`driver`]: The [`LinkDriver`] seam between managers and the network stack
//! - [`error`]: Error types for cfgmgr operations
//!
//! # Architecture
//!
//! A configuration manager run follows this pattern:
//!
//! 1. Read the current and effective configuration through a [`ConfigStore`]
//! 2. Compute what changed and validate it
//! 3. Push the resulting mutations through a [`LinkDriver`]
//!
//! # Example
//!
//! ```ignore
//! use sonic_cfgmgr_common::{
//!     shell::{self, IP_CMD, shellquote},
//!     CfgMgrResult,
//! };
//!
//! async fn set_tunnel_mtu(ifname: &str, mtu: u32) -> CfgMgrResult<()> {
//!     let cmd = format!("{} link set dev {} mtu {}",
//!         IP_CMD, shellquote(ifname), mtu);
//!     shell::exec_checked(&cmd).await?;
//!     Ok(())
//! }
//! ```

pub mod driver;
pub mod error;
pub mod shell;
pub mod store;

// Re-export commonly used items at crate root
pub use driver::{AdminState, FieldValue, FieldValues, FieldValuesExt, LinkDriver, LinkHandle};
pub use error::{CfgMgrError, CfgMgrResult};
pub use store::{join_path, ConfigStore, ConfigTree};
