//! Test infrastructure for SONiC configuration managers
//!
//! Provides:
//! - Current/effective configuration tree fixtures
//! - A recording link driver with failure injection
//! - Driver call and shell command verification helpers

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
