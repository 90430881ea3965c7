//! Variable bindings and block scoping

mod frame;

pub use frame::ScopeGuard;

use indexmap::IndexMap;

use crate::ast::Span;
use crate::error::EnvironmentError;
use crate::types::{ident_key, DataType};
use crate::value::Value;

/// Default procedure nesting limit.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// A single declared variable.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The name as written in the declaration
    pub name: String,

    /// Case-folded lookup key
    key: String,

    /// Current value
    pub value: Value,

    /// Declared type; every assignment is coerced to it
    pub ty: DataType,

    /// Where the variable was declared
    pub span: Option<Span>,
}

/// Variables visible to one logical execution.
///
/// Scopes are kept in a single flat vector with frame boundaries, so a
/// block entry is a push of an index and a block exit is a truncate.
/// Lookups search backwards, which gives shadowing for free. One
/// `Environment` is never shared between executions; a procedure call gets
/// a fresh one from [`Environment::for_call`].
///
/// # Example
///
/// ```
/// use sproc::{DataType, Environment, Value};
///
/// let mut env = Environment::new();
/// env.declare("x", DataType::Int, Value::Int(1)).unwrap();
///
/// env.push_frame();
/// env.declare("x", DataType::Int, Value::Int(10)).unwrap(); // shadows outer x
/// env.declare("y", DataType::Int, Value::Int(2)).unwrap();
/// assert_eq!(env.get("X"), Some(&Value::Int(10)));
/// env.pop_frame();
///
/// assert_eq!(env.get("x"), Some(&Value::Int(1)));
/// assert_eq!(env.get("y"), None);
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    /// All bindings, most recent at the end
    bindings: Vec<Binding>,

    /// Frame boundaries (indices into `bindings`)
    frames: Vec<usize>,

    /// Procedure nesting depth of this environment
    call_depth: usize,

    /// Maximum allowed procedure nesting
    max_call_depth: usize,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Create an empty top-level environment.
    pub fn new() -> Self {
        Self::with_max_call_depth(DEFAULT_MAX_CALL_DEPTH)
    }

    /// Create an environment with a custom call depth limit.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            bindings: Vec::new(),
            frames: vec![0],
            call_depth: 0,
            max_call_depth: max_depth,
        }
    }

    /// Fresh root environment for a procedure body called from this one.
    ///
    /// # Errors
    ///
    /// `StackOverflow` when the nested depth would exceed the limit.
    pub fn for_call(&self) -> Result<Environment, EnvironmentError> {
        let depth = self.call_depth + 1;
        if depth > self.max_call_depth {
            return Err(EnvironmentError::StackOverflow {
                depth,
                max: self.max_call_depth,
            });
        }
        Ok(Self {
            bindings: Vec::new(),
            frames: vec![0],
            call_depth: depth,
            max_call_depth: self.max_call_depth,
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Frame Management
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a new scope.
    pub fn push_frame(&mut self) {
        self.frames.push(self.bindings.len());
    }

    /// Leave the current scope, dropping everything declared in it.
    ///
    /// The outermost frame is never popped.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            if let Some(boundary) = self.frames.pop() {
                self.bindings.truncate(boundary);
            }
        }
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether only the outermost frame is open.
    pub fn is_global_scope(&self) -> bool {
        self.frames.len() == 1
    }

    /// Procedure nesting depth.
    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    /// Configured nesting limit.
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    fn frame_start(&self) -> usize {
        self.frames.last().copied().unwrap_or(0)
    }

    fn position(&self, name: &str) -> Option<usize> {
        let key = ident_key(name);
        self.bindings.iter().rposition(|b| b.key == key)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Declaration
    // ═══════════════════════════════════════════════════════════════════

    /// Declare `name` in the current scope with an initial value.
    ///
    /// # Errors
    ///
    /// - `DuplicateDeclaration` if the current scope already declares `name`
    /// - `TypeMismatch` if `value` does not fit `ty`
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        ty: DataType,
        value: Value,
    ) -> Result<(), EnvironmentError> {
        self.declare_at(name, ty, value, None)
    }

    /// Like [`declare`](Self::declare), recording the declaration site.
    pub fn declare_at(
        &mut self,
        name: impl Into<String>,
        ty: DataType,
        value: Value,
        span: Option<Span>,
    ) -> Result<(), EnvironmentError> {
        let name = name.into();
        if self.contains_in_current_scope(&name) {
            return Err(EnvironmentError::DuplicateDeclaration { name });
        }
        let value = ty
            .coerce(value)
            .map_err(|rejected| EnvironmentError::TypeMismatch {
                name: name.clone(),
                expected: ty,
                found: rejected.type_name(),
            })?;
        self.bindings.push(Binding {
            key: ident_key(&name),
            name,
            value,
            ty,
            span,
        });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Value of the nearest binding named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.get_binding(name).map(|b| &b.value)
    }

    /// The nearest binding named `name`.
    pub fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.position(name).map(|i| &self.bindings[i])
    }

    /// Value of `name`, cloned.
    ///
    /// # Errors
    ///
    /// `UndefinedVariable` if no enclosing scope declares `name`.
    pub fn resolve(&self, name: &str) -> Result<Value, EnvironmentError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| EnvironmentError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Whether any enclosing scope declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Whether the innermost scope declares `name`.
    pub fn contains_in_current_scope(&self, name: &str) -> bool {
        let key = ident_key(name);
        self.bindings[self.frame_start()..]
            .iter()
            .any(|b| b.key == key)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Assignment
    // ═══════════════════════════════════════════════════════════════════

    /// Overwrite the nearest binding of `name`.
    ///
    /// # Errors
    ///
    /// - `UndefinedVariable` if `name` was never declared
    /// - `TypeMismatch` if `value` does not fit the declared type
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), EnvironmentError> {
        let Some(i) = self.position(name) else {
            return Err(EnvironmentError::UndefinedVariable {
                name: name.to_string(),
            });
        };
        let binding = &mut self.bindings[i];
        binding.value = binding
            .ty
            .coerce(value)
            .map_err(|rejected| EnvironmentError::TypeMismatch {
                name: binding.name.clone(),
                expected: binding.ty,
                found: rejected.type_name(),
            })?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════

    /// Iterate over all bindings, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Names declared in the innermost scope.
    pub fn names_in_current_scope(&self) -> Vec<&str> {
        self.bindings[self.frame_start()..]
            .iter()
            .map(|b| b.name.as_str())
            .collect()
    }

    /// Visible variables by declared name; shadowed bindings are hidden.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        let mut visible: IndexMap<String, (String, Value)> = IndexMap::new();
        for b in &self.bindings {
            visible.insert(b.key.clone(), (b.name.clone(), b.value.clone()));
        }
        visible.into_values().collect()
    }

    /// Number of bindings across all frames.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
