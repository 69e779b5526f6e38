//! Per-run view of one tunnel's configuration section and the per-field
//! change classification.

use std::collections::BTreeMap;

use sonic_cfgmgr_common::{join_path, ConfigStore};
use tracing::debug;

use crate::types::Action;

/// The tunnel section as seen through both configuration versions.
///
/// The section-level action is computed once at construction:
/// `Delete` when the section is gone from the current tree, `Create` when it
/// is new, `Modify` otherwise.
pub struct ConfigSnapshot<'a, S: ConfigStore + ?Sized> {
    store: &'a S,
    section: String,
    section_action: Action,
}

impl<'a, S: ConfigStore + ?Sized> ConfigSnapshot<'a, S> {
    pub fn new(store: &'a S, section: impl Into<String>) -> Self {
        let section = section.into();
        let section_action = if !store.exists(&section) {
            Action::Delete
        } else if store.exists_effective(&section) {
            Action::Modify
        } else {
            Action::Create
        };
        debug!(section = %section, action = %section_action, "Section classified");

        Self {
            store,
            section,
            section_action,
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn section_action(&self) -> Action {
        self.section_action
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Absolute path of a field of this section.
    pub fn path(&self, rel: &str) -> String {
        join_path(&self.section, rel)
    }

    /// Classifies one field. Multi-valued fields compare their value lists.
    pub fn classify(&self, rel: &str, multi: bool) -> Action {
        let path = self.path(rel);
        let in_current = self.store.exists(&path);
        let in_effective = self.store.exists_effective(&path);
        let changed = in_current
            && in_effective
            && if multi {
                self.store.values_at(&path) != self.store.effective_values_at(&path)
            } else {
                self.store.value_at(&path) != self.store.effective_value_at(&path)
            };
        Action::classify(in_current, in_effective, changed)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.store.exists(&self.path(rel))
    }

    pub fn value(&self, rel: &str) -> Option<String> {
        self.store.value_at(&self.path(rel))
    }

    pub fn values(&self, rel: &str) -> Vec<String> {
        self.store.values_at(&self.path(rel))
    }

    pub fn effective_value(&self, rel: &str) -> Option<String> {
        self.store.effective_value_at(&self.path(rel))
    }

    pub fn effective_values(&self, rel: &str) -> Vec<String> {
        self.store.effective_values_at(&self.path(rel))
    }
}

/// Record of every classification made during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTally {
    by_field: BTreeMap<String, Action>,
    by_action: BTreeMap<Action, Vec<String>>,
}

impl ActionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the action of a field. A field is only ever classified once
    /// per run; a second record replaces the first.
    pub fn record(&mut self, field: &str, action: Action) {
        if let Some(previous) = self.by_field.insert(field.to_string(), action) {
            if let Some(fields) = self.by_action.get_mut(&previous) {
                fields.retain(|f| f != field);
            }
        }
        self.by_action
            .entry(action)
            .or_default()
            .push(field.to_string());
    }

    pub fn action_of(&self, field: &str) -> Option<Action> {
        self.by_field.get(field).copied()
    }

    /// Fields recorded with `action`, in classification order.
    pub fn fields_with(&self, action: Action) -> &[String] {
        self.by_action
            .get(&action)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }
}
