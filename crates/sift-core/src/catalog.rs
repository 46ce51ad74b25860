//! Predicate kind catalog
//!
//! Maps a persisted `kind` string to the factory that builds its behavior.
//! A kind is *declared* (identity plus human label, usually from
//! configuration) separately from the *behavior* that implements it
//! (registered in code). A declaration that names no registered behavior is
//! a configuration defect; [`Catalog::validate`] reports it before any tree
//! is built, and [`Catalog::create`] refuses to run until validation has
//! passed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SiftConfig;
use crate::domain::Domain;
use crate::errors::{Result, SiftError};
use crate::kinds::{ContainerSearch, SubGroup, CONTAINER_SEARCH, SUB_GROUP};
use crate::model::{Combinator, Filter, Predicate};

/// Builds a fresh behavior for one predicate
pub type Behavior<D> = Box<dyn Fn() -> Box<dyn Filter<D>>>;

/// One declared predicate kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDecl {
    /// Identity written to persisted trees
    pub kind: String,
    /// Human label; defaults to the kind
    #[serde(default)]
    pub label: Option<String>,
    /// Registered behavior implementing the kind
    #[serde(default)]
    pub behavior: Option<String>,
}

impl KindDecl {
    pub fn new(kind: impl Into<String>, behavior: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            label: None,
            behavior: Some(behavior.into()),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

pub struct Catalog<D: Domain> {
    behaviors: HashMap<String, Behavior<D>>,
    declarations: BTreeMap<String, KindDecl>,
    default_combinator: Combinator,
    validated: bool,
}

impl<D: Domain> fmt::Debug for Catalog<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut behaviors: Vec<&String> = self.behaviors.keys().collect();
        behaviors.sort();
        f.debug_struct("Catalog")
            .field("behaviors", &behaviors)
            .field("declarations", &self.declarations)
            .field("default_combinator", &self.default_combinator)
            .field("validated", &self.validated)
            .finish()
    }
}

impl<D: Domain> Default for Catalog<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Domain> Catalog<D> {
    /// An empty catalog with no behaviors and no kinds
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            declarations: BTreeMap::new(),
            default_combinator: Combinator::default(),
            validated: false,
        }
    }

    /// A catalog that already offers the built-in holder kinds
    pub fn with_builtin_kinds() -> Self {
        let mut catalog = Self::new();
        catalog.register_behavior(SUB_GROUP, || Box::new(SubGroup::<D>::new(Combinator::All)));
        catalog.register_behavior(CONTAINER_SEARCH, || {
            Box::new(ContainerSearch::<D>::new(Combinator::All))
        });
        catalog
            .declarations
            .insert(SUB_GROUP.to_string(), KindDecl::new(SUB_GROUP, SUB_GROUP).with_label("Group"));
        catalog.declarations.insert(
            CONTAINER_SEARCH.to_string(),
            KindDecl::new(CONTAINER_SEARCH, CONTAINER_SEARCH).with_label("Container"),
        );
        catalog
    }

    /// Build a validated catalog from configuration plus code-side behaviors
    ///
    /// Built-in holder kinds are always present.
    ///
    /// # Errors
    ///
    /// - `DuplicateKind` if a kind is declared twice
    /// - `MissingBehavior` if a declared kind has no registered behavior
    pub fn from_config(
        config: &SiftConfig,
        behaviors: impl IntoIterator<Item = (String, Behavior<D>)>,
    ) -> Result<Self> {
        let mut catalog = Self::with_builtin_kinds();
        catalog.set_default_combinator(config.tree.default_combinator);
        for (name, factory) in behaviors {
            catalog.behaviors.insert(name, factory);
        }
        for decl in &config.kinds {
            catalog.declare(decl.clone())?;
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Register (or replace) a named behavior factory
    pub fn register_behavior<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Filter<D>> + 'static,
    {
        self.behaviors.insert(name.into(), Box::new(factory));
        self.validated = false;
    }

    /// Declare a kind
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKind` if the kind is already declared.
    pub fn declare(&mut self, decl: KindDecl) -> Result<()> {
        if self.declarations.contains_key(&decl.kind) {
            return Err(SiftError::DuplicateKind { kind: decl.kind });
        }
        self.declarations.insert(decl.kind.clone(), decl);
        self.validated = false;
        Ok(())
    }

    /// Combinator given to the group of every holder this catalog creates
    pub fn set_default_combinator(&mut self, combinator: Combinator) {
        self.default_combinator = combinator;
    }

    /// Check every declaration names a registered behavior
    ///
    /// # Errors
    ///
    /// Returns `MissingBehavior` for the first defective declaration, in
    /// kind order.
    pub fn validate(&mut self) -> Result<()> {
        for decl in self.declarations.values() {
            let registered = decl
                .behavior
                .as_ref()
                .is_some_and(|b| self.behaviors.contains_key(b));
            if !registered {
                self.validated = false;
                let err = SiftError::MissingBehavior {
                    kind: decl.kind.clone(),
                    behavior: decl.behavior.clone().unwrap_or_else(|| "<none>".to_string()),
                };
                tracing::error!(
                    kind = %decl.kind,
                    err.code = err.code(),
                    "predicate kind declared without a behavior"
                );
                return Err(err);
            }
        }
        self.validated = true;
        tracing::debug!(kinds = self.declarations.len(), "catalog validated");
        Ok(())
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.declarations.keys().map(String::as_str)
    }

    /// Human label of a declared kind
    pub fn label_of(&self, kind: &str) -> Option<&str> {
        self.declarations
            .get(kind)
            .map(|d| d.label.as_deref().unwrap_or(&d.kind))
    }

    /// Build a fresh, detached predicate of `kind`
    ///
    /// # Errors
    ///
    /// - `CatalogNotValidated` if [`Catalog::validate`] has not passed since
    ///   the last change
    /// - `UnknownKind` if the kind was never declared
    pub fn create(&self, kind: &str) -> Result<Predicate<D>> {
        if !self.validated {
            return Err(SiftError::CatalogNotValidated);
        }
        let decl = self
            .declarations
            .get(kind)
            .ok_or_else(|| SiftError::UnknownKind {
                kind: kind.to_string(),
            })?;
        let factory = decl
            .behavior
            .as_ref()
            .and_then(|b| self.behaviors.get(b))
            .ok_or_else(|| SiftError::MissingBehavior {
                kind: kind.to_string(),
                behavior: decl.behavior.clone().unwrap_or_else(|| "<none>".to_string()),
            })?;

        let mut predicate = Predicate::new(kind, factory())
            .with_label(decl.label.as_deref().unwrap_or(kind));
        if let Some(group) = predicate.group_mut() {
            group.set_combinator(self.default_combinator);
        }
        Ok(predicate)
    }
}
