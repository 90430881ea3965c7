//! The procedure and builtin catalog
//!
//! One [`Catalog`] is shared by every execution of an engine. Lookups are
//! lock-free reads of a sharded map; registration takes the shard's write
//! lock for the name being defined, so redefinitions of one name are
//! serialized while other names stay readable.

mod builtin;
mod procedure;
pub mod stdlib;

pub use builtin::{AsyncBuiltin, Builtin, BuiltinKind, SyncFn};
pub use procedure::{ParamMode, Parameter, ProcedureDef};

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CatalogError, EvalError};
use crate::types::ident_key;

/// Anything callable by name.
#[derive(Debug, Clone)]
pub enum Routine {
    /// Interpreted procedure or function
    Procedure(Arc<ProcedureDef>),
    /// Native routine
    Builtin(Arc<Builtin>),
}

impl Routine {
    /// Name as registered.
    pub fn name(&self) -> &str {
        match self {
            Routine::Procedure(def) => &def.name,
            Routine::Builtin(b) => &b.name,
        }
    }
}

/// What registering an existing name does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedefinePolicy {
    /// The new definition replaces the old one
    #[default]
    Replace,
    /// Redefinition is rejected
    Frozen,
}

/// Routines keyed by case-folded name.
#[derive(Debug, Default)]
pub struct Catalog {
    routines: DashMap<String, Routine>,
    policy: RedefinePolicy,
}

impl Catalog {
    /// Empty catalog with the replace policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty catalog with an explicit redefinition policy.
    pub fn with_policy(policy: RedefinePolicy) -> Self {
        Self {
            routines: DashMap::new(),
            policy,
        }
    }

    /// The redefinition policy.
    pub fn policy(&self) -> RedefinePolicy {
        self.policy
    }

    /// Add or replace a procedure definition.
    ///
    /// # Errors
    ///
    /// - `DuplicateParameter` if the parameter list repeats a name
    /// - `Frozen` if the name exists and the policy is `Frozen`
    pub fn register(&self, def: ProcedureDef) -> Result<(), CatalogError> {
        def.validate()?;
        let name = def.name.clone();
        self.insert(&name, Routine::Procedure(Arc::new(def)))
    }

    /// Add or replace a builtin.
    ///
    /// # Errors
    ///
    /// `Frozen` if the name exists and the policy is `Frozen`.
    pub fn register_builtin(&self, builtin: Builtin) -> Result<(), CatalogError> {
        let name = builtin.name.clone();
        self.insert(&name, Routine::Builtin(Arc::new(builtin)))
    }

    /// Install a builtin regardless of policy.
    pub(crate) fn install_builtin(&self, builtin: Builtin) {
        self.routines
            .insert(ident_key(&builtin.name), Routine::Builtin(Arc::new(builtin)));
    }

    fn insert(&self, name: &str, routine: Routine) -> Result<(), CatalogError> {
        match self.routines.entry(ident_key(name)) {
            Entry::Occupied(mut slot) => {
                if self.policy == RedefinePolicy::Frozen {
                    return Err(CatalogError::Frozen {
                        name: name.to_string(),
                    });
                }
                debug!(routine = name, previous = slot.get().name(), "replacing routine");
                slot.insert(routine);
            }
            Entry::Vacant(slot) => {
                debug!(routine = name, "registering routine");
                slot.insert(routine);
            }
        }
        Ok(())
    }

    /// The routine called `name`.
    ///
    /// # Errors
    ///
    /// `UndefinedProcedure` if nothing is registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<Routine, EvalError> {
        self.routines
            .get(&ident_key(name))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EvalError::UndefinedProcedure {
                name: name.to_string(),
                span: None,
            })
    }

    /// Remove `name`. Returns whether anything was removed.
    pub fn drop_routine(&self, name: &str) -> bool {
        let removed = self.routines.remove(&ident_key(name)).is_some();
        if removed {
            debug!(routine = name, "dropped routine");
        }
        removed
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.routines.contains_key(&ident_key(name))
    }

    /// Registered names as written, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .routines
            .iter()
            .map(|entry| entry.value().name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Number of routines.
    pub fn len(&self) -> usize {
        self.routines.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}
