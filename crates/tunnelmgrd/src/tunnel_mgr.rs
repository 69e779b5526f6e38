//! Tunnel Manager - one reconciliation run for one tunnel interface

use sonic_cfgmgr_common::{CfgMgrResult, ConfigStore, LinkDriver};
use tracing::{info, warn};

use crate::applier::apply;
use crate::loader::{Loader, Plan};
use crate::options::{tunnel_defaults, OptionValue};
use crate::snapshot::ConfigSnapshot;
use crate::tables::{tunnel_section, FieldMapping, TUNNEL_FIELD_MAPPING};
use crate::types::{Action, Advisory};
use crate::validator::validate;
use crate::variant::TunnelVariant;

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub section: Action,
    pub variant: TunnelVariant,
    /// Loader and validator advisories, in that order.
    pub advisories: Vec<Advisory>,
}

/// Tunnel Manager
///
/// Loads, validates and applies the configuration of a single tunnel
/// through a [`LinkDriver`].
pub struct TunnelMgr<D: LinkDriver> {
    ifname: String,
    driver: D,
    mapping: &'static [FieldMapping],
    defaults: Vec<(&'static str, OptionValue)>,
    advisories: Vec<Advisory>,
}

impl<D: LinkDriver> TunnelMgr<D> {
    pub fn new(ifname: impl Into<String>, driver: D) -> Self {
        Self {
            ifname: ifname.into(),
            driver,
            mapping: TUNNEL_FIELD_MAPPING,
            defaults: tunnel_defaults(),
            advisories: Vec::new(),
        }
    }

    /// Replaces the field mapping.
    pub fn with_mapping(mut self, mapping: &'static [FieldMapping]) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn ifname(&self) -> &str {
        &self.ifname
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Advisories of the last run, kept when the run was rejected.
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Loads the plan without validating or applying it.
    pub async fn plan<S: ConfigStore + ?Sized>(&mut self, store: &S) -> CfgMgrResult<Plan> {
        let snapshot = ConfigSnapshot::new(store, tunnel_section(&self.ifname));
        Loader::new(self.mapping, self.defaults.clone())
            .load(&snapshot, &self.ifname, &mut self.driver)
            .await
    }

    /// Runs load, resolve, validate and apply.
    ///
    /// Advisories are collected in [`advisories`](Self::advisories), also
    /// on rejection. A rejection returns the first violation as a
    /// configuration error and leaves the link alone.
    pub async fn reconcile<S: ConfigStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> CfgMgrResult<ReconcileOutcome> {
        self.advisories.clear();
        let plan = self.plan(store).await?;
        let variant = TunnelVariant::resolve(&plan.options);
        let report = validate(&plan, variant);

        self.advisories = plan.advisories.clone();
        self.advisories.extend(report.advisories.iter().cloned());

        if let Some(violation) = report.first_error() {
            warn!(
                ifname = %self.ifname,
                field = %violation.field,
                violations = report.violations.len(),
                "Tunnel configuration rejected"
            );
        }
        report.ensure_valid()?;

        apply(&plan, variant, &mut self.driver).await?;

        info!(
            ifname = %self.ifname,
            section = %plan.section,
            variant = %variant,
            "Tunnel reconciled"
        );
        Ok(ReconcileOutcome {
            section: plan.section,
            variant,
            advisories: self.advisories.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sonic_cfgmgr_common::ConfigTree;
    use sonic_cfgmgr_test::{DriverCall, RecordingDriver};

    #[tokio::test]
    async fn test_reconcile_new_tunnel() {
        let store = ConfigTree::new(
            json!({ "interfaces": { "tunnel": { "tun0": {
                "encapsulation": "gre",
                "local-ip": "10.0.0.1",
                "remote-ip": "10.0.0.2",
            }}}}),
            json!({}),
        );
        let mut mgr = TunnelMgr::new("tun0", RecordingDriver::new());
        let outcome = mgr.reconcile(&store).await.unwrap();

        assert_eq!(outcome.section, Action::Create);
        assert_eq!(outcome.variant, TunnelVariant::Gre);
        assert!(outcome.advisories.is_empty());
        assert!(matches!(
            mgr.driver().calls().first(),
            Some(DriverCall::Create { name, .. }) if name == "tun0"
        ));
    }

    #[tokio::test]
    async fn test_rejected_plan_leaves_link_alone() {
        let store = ConfigTree::new(
            json!({ "interfaces": { "tunnel": { "tun0": { "encapsulation": "gre" } } } }),
            json!({}),
        );
        let mut mgr = TunnelMgr::new("tun0", RecordingDriver::new());
        let err = mgr.reconcile(&store).await.unwrap_err();

        assert!(err.is_config_error());
        assert!(err.to_string().contains("tunnel gre tun0"));
        assert!(mgr.into_driver().calls().is_empty());
    }

    #[tokio::test]
    async fn test_advisories_kept_on_rejection() {
        let store = ConfigTree::new(
            json!({ "interfaces": { "tunnel": { "tun0": {
                "encapsulation": "gre",
                "6rd-prefix": "2001:db8::/32",
            }}}}),
            json!({}),
        );
        let mut mgr = TunnelMgr::new("tun0", RecordingDriver::new());
        assert!(mgr.reconcile(&store).await.is_err());

        let advisories = mgr.advisories();
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].field, "6rd-prefix");
        assert!(advisories[0].message.contains("only be configured for sit"));
    }

    #[tokio::test]
    async fn test_reconcile_unchanged_tunnel_is_idempotent() {
        let tunnel = json!({ "interfaces": { "tunnel": { "tun0": {
            "encapsulation": "ipip",
            "local-ip": "10.0.0.1",
            "remote-ip": "10.0.0.2",
        }}}});
        let store = ConfigTree::new(tunnel.clone(), tunnel);
        let mut mgr = TunnelMgr::new("tun0", RecordingDriver::new());
        let outcome = mgr.reconcile(&store).await.unwrap();

        assert_eq!(outcome.section, Action::Modify);
        assert_eq!(mgr.ifname(), "tun0");
    }
}
