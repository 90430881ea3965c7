//! Interpreted procedure definitions

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Block;
use crate::error::CatalogError;
use crate::types::{ident_key, DataType};

/// Direction of a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamMode {
    /// Caller's value is copied in
    #[default]
    In,
    /// Fresh NULL slot copied back to the caller's variable on return
    Out,
    /// Seeded with the caller's value, copied back on return
    InOut,
}

impl ParamMode {
    /// Whether the caller must pass a variable that receives a copy-back.
    pub fn writes_back(&self) -> bool {
        matches!(self, ParamMode::Out | ParamMode::InOut)
    }
}

impl fmt::Display for ParamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamMode::In => "IN",
            ParamMode::Out => "OUT",
            ParamMode::InOut => "INOUT",
        })
    }
}

/// A declared procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub ty: DataType,
    /// Direction
    #[serde(default)]
    pub mode: ParamMode,
}

impl Parameter {
    /// Parameter with an explicit mode.
    pub fn new(name: impl Into<String>, ty: DataType, mode: ParamMode) -> Self {
        Self {
            name: name.into(),
            ty,
            mode,
        }
    }
}

/// A procedure or function with an interpreted body.
///
/// A definition is immutable once registered; redefinition swaps the whole
/// `Arc` in the catalog, so an invocation in flight keeps running the body
/// it started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureDef {
    /// Name as written in the definition
    pub name: String,
    /// Parameters in declaration order
    #[serde(default)]
    pub params: Vec<Parameter>,
    /// Return type; `Some` makes this a function usable in expressions
    #[serde(default)]
    pub returns: Option<DataType>,
    /// Statements of the body
    pub body: Block,
}

impl ProcedureDef {
    /// Procedure without parameters or return type.
    pub fn new(name: impl Into<String>, body: impl Into<Block>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            body: body.into(),
        }
    }

    /// Append a parameter.
    pub fn param(mut self, name: impl Into<String>, ty: DataType, mode: ParamMode) -> Self {
        self.params.push(Parameter::new(name, ty, mode));
        self
    }

    /// Declare a return type.
    pub fn with_returns(mut self, ty: DataType) -> Self {
        self.returns = Some(ty);
        self
    }

    /// Whether the definition can be called in expression context.
    pub fn is_function(&self) -> bool {
        self.returns.is_some()
    }

    /// Position of the parameter called `name`.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        let key = ident_key(name);
        self.params.iter().position(|p| ident_key(&p.name) == key)
    }

    /// Reject parameter lists that name the same parameter twice.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for p in &self.params {
            if !seen.insert(ident_key(&p.name)) {
                return Err(CatalogError::DuplicateParameter {
                    procedure: self.name.clone(),
                    name: p.name.clone(),
                });
            }
        }
        Ok(())
    }
}
