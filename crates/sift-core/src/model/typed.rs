//! Typed selections and the three-tier resolution protocol
//!
//! A concrete kind only declares *what* it selects ([`SelectionKind::Value`])
//! and how a selection matches an item. [`TypedPredicate`] implements the
//! saving, resolving and cloning of that selection once, driven by the
//! value type's [`Tier`]:
//!
//! - **Plain**: the value itself is written and read back.
//! - **Global**: a stable name is written; it is looked up in the global
//!   registry once names become resolvable after load.
//! - **Environment**: a stable name is written; it is looked up in whatever
//!   environment the tree is bound to, again for every new environment.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::RangeInclusive;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::predicate::Filter;
use crate::domain::{Domain, Environment};
use crate::errors::{Result, SiftError};

/// Saved name standing for "no selection"
pub const NULL_MARKER: &str = "null";

/// How a selection value is saved and restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Plain,
    Global,
    Environment,
}

/// Where a saved name is looked up
pub enum Scope<'a, D: Domain> {
    Global(&'a D::Registry),
    Environment(&'a D::Env),
}

/// A value a predicate can select
///
/// Plain values implement `encode`/`decode`; resolvable values implement
/// `name`/`lookup`. The other pair is never consulted.
pub trait Selection<D: Domain>: Clone + fmt::Debug + 'static {
    const TIER: Tier;

    fn encode(&self) -> Value {
        Value::Null
    }

    fn decode(_value: &Value) -> Option<Self> {
        None
    }

    /// Stable name this value is saved under
    fn name(&self) -> String {
        String::new()
    }

    fn lookup(_name: &str, _scope: Scope<'_, D>) -> Option<Self> {
        None
    }
}

macro_rules! plain_selection {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<D: Domain> Selection<D> for $ty {
                const TIER: Tier = Tier::Plain;

                fn encode(&self) -> Value {
                    serde_json::to_value(self).unwrap_or(Value::Null)
                }

                fn decode(value: &Value) -> Option<Self> {
                    serde_json::from_value(value.clone()).ok()
                }
            }
        )*
    };
}

plain_selection!(
    bool,
    i32,
    i64,
    u32,
    u64,
    f64,
    String,
    RangeInclusive<i64>,
    RangeInclusive<f64>,
);

/// Behavior of one concrete typed predicate kind
pub trait SelectionKind<D: Domain>:
    Clone + fmt::Debug + Serialize + DeserializeOwned + 'static
{
    type Value: Selection<D>;

    /// Whether `item` matches
    ///
    /// `extra_option` is 0 when the selection is in use; a positive value
    /// selects one of the kind's non-value modes and `selection` is `None`.
    fn matches(&self, selection: Option<&Self::Value>, extra_option: u32, item: &D::Item)
        -> bool;

    /// Fired whenever the selection is assigned, including after resolution
    /// and cloning
    fn post_process(&mut self, _selection: Option<&Self::Value>) {}

    /// Fired only when a user actively picks a new value
    fn post_chosen(&mut self, _selection: Option<&Self::Value>) {}
}

/// Persisted shape of a typed predicate, in write order
#[derive(Serialize, Deserialize)]
struct TypedState<K> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selection: Option<Value>,
    #[serde(
        rename = "selectionName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    selection_name: Option<String>,
    #[serde(rename = "extraOption", default)]
    extra_option: u32,
    config: K,
}

/// Generic predicate over a typed selection
#[derive(Debug)]
pub struct TypedPredicate<D: Domain, K: SelectionKind<D>> {
    kind: K,
    selection: Option<K::Value>,
    selection_name: Option<String>,
    extra_option: u32,
    selection_error: Option<String>,
    _domain: PhantomData<fn() -> D>,
}

impl<D: Domain, K: SelectionKind<D>> TypedPredicate<D, K> {
    pub fn new(kind: K) -> Self {
        let mut typed = Self {
            kind,
            selection: None,
            selection_name: None,
            extra_option: 0,
            selection_error: None,
            _domain: PhantomData,
        };
        typed.derive_name();
        typed
    }

    /// Builder form of [`TypedPredicate::set_selection`]
    pub fn with_selection(mut self, value: K::Value) -> Self {
        self.set_selection(Some(value));
        self
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut K {
        &mut self.kind
    }

    pub fn selection(&self) -> Option<&K::Value> {
        self.selection.as_ref()
    }

    pub fn selection_name(&self) -> Option<&str> {
        self.selection_name.as_deref()
    }

    pub fn extra_option(&self) -> u32 {
        self.extra_option
    }

    pub fn error(&self) -> Option<&str> {
        self.selection_error.as_deref()
    }

    /// Assign the selection
    ///
    /// Clears any selection error and extra option, and re-derives the saved
    /// name for resolvable tiers.
    pub fn set_selection(&mut self, value: Option<K::Value>) {
        self.selection = value;
        self.selection_error = None;
        self.extra_option = 0;
        self.derive_name();
        self.kind.post_process(self.selection.as_ref());
    }

    /// Assign the selection as an active user choice
    pub fn choose(&mut self, value: Option<K::Value>) {
        self.set_selection(value);
        self.kind.post_chosen(self.selection.as_ref());
    }

    /// Switch to one of the kind's non-value modes (0 returns to the selection)
    pub fn set_extra_option(&mut self, extra_option: u32) {
        self.extra_option = extra_option;
        self.selection_error = None;
    }

    /// Replace the saved name, dropping the live selection until resolved
    ///
    /// Plain kinds carry no name, so this is ignored for them.
    pub fn set_selection_name(&mut self, name: impl Into<String>) {
        if K::Value::TIER == Tier::Plain {
            return;
        }
        self.selection = None;
        self.selection_error = None;
        self.selection_name = Some(name.into());
    }

    fn derive_name(&mut self) {
        if K::Value::TIER == Tier::Plain {
            self.selection_name = None;
        } else {
            self.selection_name = Some(
                self.selection
                    .as_ref()
                    .map(|v| v.name())
                    .unwrap_or_else(|| NULL_MARKER.to_string()),
            );
        }
    }

    fn resolve(&mut self, label: &str, scope: Scope<'_, D>, scope_label: Option<String>) {
        if self.extra_option > 0 {
            return;
        }
        let Some(name) = self.selection_name.clone() else {
            return;
        };

        if name == NULL_MARKER {
            self.selection = None;
            self.selection_error = None;
        } else {
            match K::Value::lookup(&name, scope) {
                Some(value) => {
                    self.selection = Some(value);
                    self.selection_error = None;
                }
                None => {
                    self.selection = None;
                    self.selection_error = Some(match scope_label {
                        Some(env) => format!("{} '{}' not found in {}", label, name, env),
                        None => format!("{} '{}' not found", label, name),
                    });
                    return;
                }
            }
        }
        self.kind.post_process(self.selection.as_ref());
    }

    /// Copy following the tier's clone rules
    ///
    /// Environment-bound selections are not copied, only their names, so the
    /// copy re-resolves against whatever environment it is bound to.
    pub fn duplicate(&self) -> Self {
        let selection = match K::Value::TIER {
            Tier::Environment => None,
            Tier::Plain | Tier::Global => self.selection.clone(),
        };
        let mut copy = Self {
            kind: self.kind.clone(),
            selection,
            selection_name: self.selection_name.clone(),
            extra_option: self.extra_option,
            selection_error: self.selection_error.clone(),
            _domain: PhantomData,
        };
        copy.kind.post_process(copy.selection.as_ref());
        copy
    }
}

impl<D: Domain, K: SelectionKind<D>> Filter<D> for TypedPredicate<D, K> {
    fn evaluates_directly(&self, item: &D::Item) -> bool {
        if self.selection_error.is_some() {
            return false;
        }
        if self.extra_option > 0 {
            return self.kind.matches(None, self.extra_option, item);
        }
        self.kind.matches(self.selection.as_ref(), 0, item)
    }

    fn clone_filter(&self) -> Box<dyn Filter<D>> {
        Box::new(self.duplicate())
    }

    fn tier(&self) -> Option<Tier> {
        Some(K::Value::TIER)
    }

    fn resolve_global(&mut self, label: &str, registry: &D::Registry) {
        if K::Value::TIER == Tier::Global {
            self.resolve(label, Scope::Global(registry), None);
        }
    }

    fn resolve_in(&mut self, label: &str, env: &D::Env) {
        if K::Value::TIER == Tier::Environment {
            self.resolve(label, Scope::Environment(env), Some(env.label()));
        }
    }

    fn selection_error(&self) -> Option<&str> {
        self.selection_error.as_deref()
    }

    fn save_state(&self) -> Result<Value> {
        let (selection, selection_name) = match K::Value::TIER {
            Tier::Plain => (self.selection.as_ref().map(|v| v.encode()), None),
            Tier::Global | Tier::Environment => (
                None,
                Some(
                    self.selection_name
                        .clone()
                        .unwrap_or_else(|| NULL_MARKER.to_string()),
                ),
            ),
        };
        let state = TypedState {
            selection,
            selection_name,
            extra_option: self.extra_option,
            config: &self.kind,
        };
        Ok(serde_json::to_value(state)?)
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        let state: TypedState<K> = serde_json::from_value(state.clone())
            .map_err(|e| SiftError::invalid_state(std::any::type_name::<K>(), e.to_string()))?;

        self.kind = state.config;
        self.selection_error = None;
        match K::Value::TIER {
            Tier::Plain => {
                self.selection = match &state.selection {
                    Some(raw) => Some(K::Value::decode(raw).ok_or_else(|| {
                        SiftError::invalid_state(
                            std::any::type_name::<K>(),
                            format!("selection {} does not decode", raw),
                        )
                    })?),
                    None => None,
                };
                self.selection_name = None;
                self.kind.post_process(self.selection.as_ref());
            }
            Tier::Global | Tier::Environment => {
                self.selection = None;
                self.selection_name =
                    Some(state.selection_name.unwrap_or_else(|| NULL_MARKER.to_string()));
            }
        }
        self.extra_option = state.extra_option;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FilterItem;

    #[derive(Debug)]
    struct Lab;

    struct Bench {
        samples: Vec<String>,
    }

    impl Environment for Bench {
        fn label(&self) -> String {
            "bench A".to_string()
        }
    }

    struct Reagents {
        known: Vec<String>,
    }

    #[derive(Debug)]
    struct Vial {
        reagent: String,
        sample: String,
        volume: i64,
    }

    impl FilterItem for Vial {}

    impl Domain for Lab {
        type Item = Vial;
        type Registry = Reagents;
        type Env = Bench;
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Reagent(String);

    impl Selection<Lab> for Reagent {
        const TIER: Tier = Tier::Global;

        fn name(&self) -> String {
            self.0.clone()
        }

        fn lookup(name: &str, scope: Scope<'_, Lab>) -> Option<Self> {
            match scope {
                Scope::Global(reagents) => reagents
                    .known
                    .iter()
                    .find(|r| r.as_str() == name)
                    .map(|r| Reagent(r.clone())),
                Scope::Environment(_) => None,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Sample(String);

    impl Selection<Lab> for Sample {
        const TIER: Tier = Tier::Environment;

        fn name(&self) -> String {
            self.0.clone()
        }

        fn lookup(name: &str, scope: Scope<'_, Lab>) -> Option<Self> {
            match scope {
                Scope::Environment(bench) => bench
                    .samples
                    .iter()
                    .find(|s| s.as_str() == name)
                    .map(|s| Sample(s.clone())),
                Scope::Global(_) => None,
            }
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct ReagentKind {
        chosen_count: u32,
        processed_count: u32,
    }

    impl SelectionKind<Lab> for ReagentKind {
        type Value = Reagent;

        fn matches(&self, selection: Option<&Reagent>, extra_option: u32, item: &Vial) -> bool {
            if extra_option == 1 {
                return true;
            }
            selection.is_some_and(|r| r.0 == item.reagent)
        }

        fn post_process(&mut self, _selection: Option<&Reagent>) {
            self.processed_count += 1;
        }

        fn post_chosen(&mut self, _selection: Option<&Reagent>) {
            self.chosen_count += 1;
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct SampleKind;

    impl SelectionKind<Lab> for SampleKind {
        type Value = Sample;

        fn matches(&self, selection: Option<&Sample>, _extra_option: u32, item: &Vial) -> bool {
            selection.is_some_and(|s| s.0 == item.sample)
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct VolumeKind;

    impl SelectionKind<Lab> for VolumeKind {
        type Value = RangeInclusive<i64>;

        fn matches(&self, selection: Option<&RangeInclusive<i64>>, _: u32, item: &Vial) -> bool {
            selection.is_some_and(|r| r.contains(&item.volume))
        }
    }

    fn vial(reagent: &str, sample: &str, volume: i64) -> Vial {
        Vial {
            reagent: reagent.to_string(),
            sample: sample.to_string(),
            volume,
        }
    }

    fn reagents() -> Reagents {
        Reagents {
            known: vec!["saline".to_string(), "ethanol".to_string()],
        }
    }

    #[test]
    fn test_set_selection_derives_name_and_clears_state() {
        let mut p = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default());
        assert_eq!(p.selection_name(), Some(NULL_MARKER));

        p.set_extra_option(1);
        p.set_selection(Some(Reagent("saline".to_string())));

        assert_eq!(p.selection_name(), Some("saline"));
        assert_eq!(p.extra_option(), 0);
        assert!(p.error().is_none());
    }

    #[test]
    fn test_plain_selection_has_no_name() {
        let p = TypedPredicate::<Lab, VolumeKind>::new(VolumeKind).with_selection(1..=5);
        assert_eq!(p.selection_name(), None);
        assert_eq!(p.tier(), Some(Tier::Plain));
    }

    #[test]
    fn test_global_resolution_success_and_failure() {
        let mut ok = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default());
        ok.set_selection_name("ethanol");
        ok.resolve_global("Reagent", &reagents());
        assert_eq!(ok.selection(), Some(&Reagent("ethanol".to_string())));
        assert!(ok.error().is_none());

        let mut broken = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default());
        broken.set_selection_name("bleach");
        broken.resolve_global("Reagent", &reagents());
        assert!(broken.selection().is_none());
        assert_eq!(broken.error(), Some("Reagent 'bleach' not found"));
        assert!(!broken.evaluates_directly(&vial("bleach", "s1", 1)));
    }

    #[test]
    fn test_renaming_clears_error_and_plain_kinds_ignore_names() {
        let mut p = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default());
        p.set_selection_name("bleach");
        p.resolve_global("Reagent", &reagents());
        assert!(p.error().is_some());

        p.set_selection_name("saline");
        assert!(p.error().is_none());
        assert_eq!(p.selection_name(), Some("saline"));

        let mut volume = TypedPredicate::<Lab, VolumeKind>::new(VolumeKind).with_selection(1..=5);
        volume.set_selection_name("wide");
        assert_eq!(volume.selection_name(), None);
        assert_eq!(volume.selection(), Some(&(1..=5)));
    }

    #[test]
    fn test_null_marker_resolves_to_absent_without_error() {
        let mut p = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default());
        p.set_selection_name(NULL_MARKER);
        p.resolve_global("Reagent", &reagents());
        assert!(p.selection().is_none());
        assert!(p.error().is_none());
    }

    #[test]
    fn test_environment_error_names_environment() {
        let bench = Bench {
            samples: vec!["s1".to_string()],
        };
        let mut p = TypedPredicate::<Lab, SampleKind>::new(SampleKind);
        p.set_selection_name("s9");
        p.resolve_in("Sample", &bench);
        assert_eq!(p.error(), Some("Sample 's9' not found in bench A"));
    }

    #[test]
    fn test_global_predicate_ignores_environment_pass() {
        let bench = Bench { samples: vec![] };
        let mut p = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default());
        p.set_selection_name("saline");
        p.resolve_in("Reagent", &bench);
        assert!(p.selection().is_none());
        assert!(p.error().is_none());
    }

    #[test]
    fn test_extra_option_skips_selection() {
        let mut p = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default())
            .with_selection(Reagent("saline".to_string()));
        p.set_extra_option(1);
        assert!(p.evaluates_directly(&vial("ethanol", "s1", 1)));
    }

    #[test]
    fn test_choose_fires_post_chosen_but_resolution_does_not() {
        let mut p = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default());
        p.choose(Some(Reagent("saline".to_string())));
        assert_eq!(p.kind().chosen_count, 1);

        p.resolve_global("Reagent", &reagents());
        assert_eq!(p.kind().chosen_count, 1);
        assert!(p.kind().processed_count >= 2);
    }

    #[test]
    fn test_duplicate_drops_environment_bound_selection() {
        let bench = Bench {
            samples: vec!["s1".to_string()],
        };
        let mut p = TypedPredicate::<Lab, SampleKind>::new(SampleKind);
        p.set_selection_name("s1");
        p.resolve_in("Sample", &bench);
        assert!(p.selection().is_some());

        let copy = p.duplicate();
        assert!(copy.selection().is_none());
        assert_eq!(copy.selection_name(), Some("s1"));
    }

    #[test]
    fn test_duplicate_keeps_selection_error() {
        let mut p = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default());
        p.set_selection_name("bleach");
        p.resolve_global("Reagent", &reagents());

        let copy = p.duplicate();
        assert_eq!(copy.error(), p.error());
    }

    #[test]
    fn test_save_state_writes_name_for_resolvable_tiers() {
        let p = TypedPredicate::<Lab, ReagentKind>::new(ReagentKind::default())
            .with_selection(Reagent("saline".to_string()));
        let state = p.save_state().unwrap();
        assert_eq!(state["selectionName"], "saline");
        assert!(state.get("selection").is_none());
    }

    #[test]
    fn test_load_state_restores_plain_selection() {
        let p = TypedPredicate::<Lab, VolumeKind>::new(VolumeKind).with_selection(2..=8);
        let state = p.save_state().unwrap();

        let mut restored = TypedPredicate::<Lab, VolumeKind>::new(VolumeKind);
        restored.load_state(&state).unwrap();
        assert_eq!(restored.selection(), Some(&(2..=8)));
    }

    #[test]
    fn test_load_state_rejects_undecodable_selection() {
        let mut p = TypedPredicate::<Lab, VolumeKind>::new(VolumeKind);
        let state = serde_json::json!({ "selection": "wide", "extraOption": 0, "config": null });
        let err = p.load_state(&state).unwrap_err();
        assert!(matches!(err, SiftError::InvalidState { .. }));
    }
}
