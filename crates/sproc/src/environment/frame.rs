//! RAII scope guard for block frames

use super::Environment;

/// Pushes a frame on creation and pops it on drop.
///
/// Evaluation futures hold the guard across suspension points, so a block
/// that is abandoned mid-flight (cancellation, `?` on an error) still
/// unwinds its declarations.
///
/// ```
/// use sproc::{DataType, Environment, Value};
///
/// let mut env = Environment::new();
/// {
///     let mut guard = env.scope_guard();
///     guard.declare("tmp", DataType::Int, Value::Int(2)).unwrap();
///     assert!(guard.contains("tmp"));
/// }
/// assert!(!env.contains("tmp"));
/// ```
pub struct ScopeGuard<'a> {
    env: &'a mut Environment,
}

impl Environment {
    /// Open a frame now and close it when the guard drops.
    pub fn scope_guard(&mut self) -> ScopeGuard<'_> {
        self.push_frame();
        ScopeGuard { env: self }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.env.pop_frame();
    }
}

impl std::ops::Deref for ScopeGuard<'_> {
    type Target = Environment;

    fn deref(&self) -> &Self::Target {
        self.env
    }
}

impl std::ops::DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataType, Value};

    #[test]
    fn test_scope_guard_restores_depth() {
        let mut env = Environment::new();
        let initial = env.depth();
        {
            let guard = env.scope_guard();
            assert_eq!(guard.depth(), initial + 1);
        }
        assert_eq!(env.depth(), initial);
    }

    #[test]
    fn test_nested_guards() {
        let mut env = Environment::new();
        env.declare("a", DataType::Int, Value::Int(1)).unwrap();
        {
            let mut outer = env.scope_guard();
            outer.declare("b", DataType::Int, Value::Int(2)).unwrap();
            {
                let mut inner = outer.scope_guard();
                inner.declare("c", DataType::Int, Value::Int(3)).unwrap();
                assert!(inner.contains("a") && inner.contains("b") && inner.contains("c"));
            }
            assert!(!outer.contains("c"));
        }
        assert!(env.contains("a"));
        assert!(!env.contains("b"));
    }

    #[test]
    fn test_mutation_through_guard_persists() {
        let mut env = Environment::new();
        env.declare("x", DataType::Int, Value::Int(10)).unwrap();
        {
            let mut guard = env.scope_guard();
            guard.assign("x", Value::Int(20)).unwrap();
        }
        assert_eq!(env.get("x"), Some(&Value::Int(20)));
    }
}
