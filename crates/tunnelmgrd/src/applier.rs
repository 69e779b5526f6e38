//! Translates a validated plan into ordered driver calls.

use sonic_cfgmgr_common::{AdminState, CfgMgrResult, FieldValues, LinkDriver, LinkHandle};
use tracing::{debug, info};

use crate::loader::Plan;
use crate::tables::option_fields as f;
use crate::types::Action;
use crate::validator::check_references;
use crate::variant::TunnelVariant;

/// Values passed when the link is built: the variant's construction options
/// that are still present and non-empty.
pub fn creation_fields(plan: &Plan, variant: TunnelVariant) -> FieldValues {
    variant
        .option_fields()
        .iter()
        .filter(|field| plan.options.is_set(field))
        .filter_map(|field| {
            plan.options
                .get(field)
                .map(|value| (field.to_string(), value.to_string()))
        })
        .collect()
}

pub async fn apply<D>(plan: &Plan, variant: TunnelVariant, driver: &mut D) -> CfgMgrResult<()>
where
    D: LinkDriver + ?Sized,
{
    let ifname = plan.ifname.as_str();

    if plan.is_delete() {
        check_references(plan)?;
        info!(ifname = %ifname, encapsulation = %plan.encapsulation(), "Removing tunnel");
        return driver.remove(&LinkHandle::new(ifname, variant.kind())).await;
    }

    let created = plan.section == Action::Create;
    let link = driver
        .create(ifname, variant.kind(), &creation_fields(plan, variant))
        .await?;

    for field in variant.updatable_fields() {
        if f::GENERAL_PROPERTIES.contains(field) {
            continue;
        }
        if created && variant.is_option(field) {
            continue;
        }
        if !plan.options.is_set(field) {
            continue;
        }
        if let Some(value) = plan.options.get(field) {
            driver.set_field(&link, field, &value.to_string()).await?;
        }
    }

    for field in f::GENERAL_PROPERTIES {
        if let Some(value) = plan.options.get(field) {
            driver.set_field(&link, field, &value.to_string()).await?;
        }
    }

    for cidr in plan.options.list(f::ADDRESSES_DEL) {
        driver.remove_address(&link, cidr).await?;
    }
    for cidr in plan.options.list(f::ADDRESSES_ADD) {
        driver.add_address(&link, cidr).await?;
    }

    let state = AdminState::from_config(plan.options.text(f::STATE));
    driver.set_admin_state(&link, state).await?;

    debug!(ifname = %ifname, variant = %variant, state = %state, "Tunnel applied");
    Ok(())
}
