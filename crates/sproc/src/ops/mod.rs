//! Operator dispatch
//!
//! Every operator symbol owns an ordered list of handlers. A handler covers
//! one symbol for a set of coarse operand categories; [`OperatorRegistry::dispatch`]
//! walks the list in registration order and applies the first handler whose
//! [`OperatorHandler::is_applicable`] accepts the operands. Numeric promotion
//! happens inside the numeric handlers, never here.

mod arithmetic;
mod comparison;
mod logical;
mod string;

pub use arithmetic::{ArithOp, NumericArithmetic, NumericNegate};
pub use comparison::{
    BooleanComparison, CompareOp, CompositeEquality, NullEquality, NullTest, NumericComparison,
    StringComparison,
};
pub use logical::{BooleanLogic, BooleanNot, LogicOp};
pub use string::StringConcat;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EvalError;
use crate::value::{TypeCategory, Value};

/// Binary operator symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    #[serde(rename = "+")]
    Add,
    /// `-`
    #[serde(rename = "-")]
    Sub,
    /// `*`
    #[serde(rename = "*")]
    Mul,
    /// `/`
    #[serde(rename = "/")]
    Div,
    /// `%`
    #[serde(rename = "%")]
    Mod,
    /// `||`
    #[serde(rename = "||")]
    Concat,
    /// `=`
    #[serde(rename = "=")]
    Eq,
    /// `<>`
    #[serde(rename = "<>")]
    Ne,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `AND`
    #[serde(rename = "AND")]
    And,
    /// `OR`
    #[serde(rename = "OR")]
    Or,
}

impl BinaryOp {
    /// Source spelling of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Concat => "||",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operator symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Numeric negation `-x`
    #[serde(rename = "-")]
    Neg,
    /// `NOT x`
    #[serde(rename = "NOT")]
    Not,
    /// `x IS NULL`
    #[serde(rename = "IS NULL")]
    IsNull,
    /// `x IS NOT NULL`
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

impl UnaryOp {
    /// Source spelling of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "NOT",
            UnaryOp::IsNull => "IS NULL",
            UnaryOp::IsNotNull => "IS NOT NULL",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Operand category pair accepted by a binary handler.
pub type CategoryPair = (TypeCategory, TypeCategory);

/// Implementation of one binary operator symbol for some operand categories.
pub trait OperatorHandler: Send + Sync {
    /// Name for diagnostics, e.g. `numeric-add`.
    fn name(&self) -> &str;

    /// Category pairs this handler claims. Used both for applicability and
    /// for rejecting overlapping registrations.
    fn operands(&self) -> &[CategoryPair];

    /// Whether this handler accepts the operands.
    fn is_applicable(&self, left: &Value, right: &Value) -> bool {
        self.operands()
            .contains(&(left.category(), right.category()))
    }

    /// Compute the result. Only called when `is_applicable` is true.
    fn apply(&self, left: &Value, right: &Value) -> Result<Value, EvalError>;
}

/// Implementation of one unary operator symbol for some operand categories.
pub trait UnaryHandler: Send + Sync {
    /// Name for diagnostics, e.g. `boolean-not`.
    fn name(&self) -> &str;

    /// Categories this handler claims.
    fn operands(&self) -> &[TypeCategory];

    /// Whether this handler accepts the operand.
    fn is_applicable(&self, operand: &Value) -> bool {
        self.operands().contains(&operand.category())
    }

    /// Compute the result. Only called when `is_applicable` is true.
    fn apply(&self, operand: &Value) -> Result<Value, EvalError>;
}

/// Rejected handler registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The new handler claims operand categories an existing one already covers
    #[error("handler `{added}` overlaps `{existing}` for operator `{symbol}` on {left} and {right}")]
    Overlap {
        /// Operator symbol
        symbol: String,
        /// Handler already registered
        existing: String,
        /// Handler being registered
        added: String,
        /// Shared left category
        left: TypeCategory,
        /// Shared right category
        right: TypeCategory,
    },
}

/// Handler lists keyed by operator symbol.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    binary: HashMap<BinaryOp, Vec<Arc<dyn OperatorHandler>>>,
    unary: HashMap<UnaryOp, Vec<Arc<dyn UnaryHandler>>>,
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("binary", &self.binary.len())
            .field("unary", &self.unary.len())
            .finish()
    }
}

impl OperatorRegistry {
    /// Registry without any handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the language's standard operators.
    pub fn standard() -> Self {
        let mut reg = Self::empty();

        for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div, ArithOp::Mod] {
            reg.push_binary(op.binary(), Arc::new(NumericArithmetic::new(op)));
        }
        reg.push_binary(BinaryOp::Concat, Arc::new(StringConcat::new()));

        for op in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
        ] {
            reg.push_binary(op.binary(), Arc::new(NumericComparison::new(op)));
            reg.push_binary(op.binary(), Arc::new(StringComparison::new(op)));
            reg.push_binary(op.binary(), Arc::new(BooleanComparison::new(op)));
        }
        for op in [CompareOp::Eq, CompareOp::Ne] {
            reg.push_binary(op.binary(), Arc::new(NullEquality::new(op)));
            reg.push_binary(op.binary(), Arc::new(CompositeEquality::new(op)));
        }

        reg.push_binary(BinaryOp::And, Arc::new(BooleanLogic::new(LogicOp::And)));
        reg.push_binary(BinaryOp::Or, Arc::new(BooleanLogic::new(LogicOp::Or)));

        reg.push_unary(UnaryOp::Neg, Arc::new(NumericNegate));
        reg.push_unary(UnaryOp::Not, Arc::new(BooleanNot));
        reg.push_unary(UnaryOp::IsNull, Arc::new(NullTest::new(false)));
        reg.push_unary(UnaryOp::IsNotNull, Arc::new(NullTest::new(true)));

        reg
    }

    // Built-in handler sets are disjoint by construction; see
    // `test_standard_registry_has_no_overlap`.
    fn push_binary(&mut self, op: BinaryOp, handler: Arc<dyn OperatorHandler>) {
        self.binary.entry(op).or_default().push(handler);
    }

    fn push_unary(&mut self, op: UnaryOp, handler: Arc<dyn UnaryHandler>) {
        self.unary.entry(op).or_default().push(handler);
    }

    /// Append a binary handler after the existing ones for `op`.
    ///
    /// # Errors
    ///
    /// `RegistryError::Overlap` if any claimed category pair is already
    /// covered by a handler for the same symbol.
    pub fn register(
        &mut self,
        op: BinaryOp,
        handler: Arc<dyn OperatorHandler>,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.binary.get(&op) {
            for current in existing {
                if let Some(&(left, right)) = handler
                    .operands()
                    .iter()
                    .find(|pair| current.operands().contains(pair))
                {
                    return Err(RegistryError::Overlap {
                        symbol: op.symbol().to_string(),
                        existing: current.name().to_string(),
                        added: handler.name().to_string(),
                        left,
                        right,
                    });
                }
            }
        }
        self.push_binary(op, handler);
        Ok(())
    }

    /// Append a unary handler after the existing ones for `op`.
    ///
    /// # Errors
    ///
    /// `RegistryError::Overlap` if any claimed category is already covered.
    pub fn register_unary(
        &mut self,
        op: UnaryOp,
        handler: Arc<dyn UnaryHandler>,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.unary.get(&op) {
            for current in existing {
                if let Some(&category) = handler
                    .operands()
                    .iter()
                    .find(|c| current.operands().contains(c))
                {
                    return Err(RegistryError::Overlap {
                        symbol: op.symbol().to_string(),
                        existing: current.name().to_string(),
                        added: handler.name().to_string(),
                        left: category,
                        right: category,
                    });
                }
            }
        }
        self.push_unary(op, handler);
        Ok(())
    }

    /// Apply binary operator `op`.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if no handler is applicable, or whatever the chosen
    /// handler reports (division by zero, overflow).
    pub fn dispatch(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        let handler = self
            .binary
            .get(&op)
            .and_then(|handlers| handlers.iter().find(|h| h.is_applicable(left, right)));

        match handler {
            Some(h) => h.apply(left, right),
            None => Err(EvalError::TypeMismatch {
                symbol: op.symbol().to_string(),
                left_type: left.type_name().to_string(),
                right_type: Some(right.type_name().to_string()),
                span: None,
            }),
        }
    }

    /// Apply unary operator `op`.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if no handler is applicable.
    pub fn dispatch_unary(&self, op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
        let handler = self
            .unary
            .get(&op)
            .and_then(|handlers| handlers.iter().find(|h| h.is_applicable(operand)));

        match handler {
            Some(h) => h.apply(operand),
            None => Err(EvalError::TypeMismatch {
                symbol: op.symbol().to_string(),
                left_type: operand.type_name().to_string(),
                right_type: None,
                span: None,
            }),
        }
    }

    /// Names of the handlers registered for `op`, in dispatch order.
    pub fn handlers(&self, op: BinaryOp) -> Vec<&str> {
        self.binary
            .get(&op)
            .map(|hs| hs.iter().map(|h| h.name()).collect())
            .unwrap_or_default()
    }
}

/// Every category pair where at least one side is `category`.
pub(crate) fn pairs_touching(category: TypeCategory) -> Vec<CategoryPair> {
    let mut pairs = Vec::new();
    for other in TypeCategory::ALL {
        pairs.push((category, other));
        if other != category {
            pairs.push((other, category));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_has_no_overlap() {
        let standard = OperatorRegistry::standard();
        let mut rebuilt = OperatorRegistry::empty();
        for (op, handlers) in &standard.binary {
            for h in handlers {
                rebuilt
                    .register(*op, Arc::clone(h))
                    .unwrap_or_else(|e| panic!("standard set overlaps: {e}"));
            }
        }
        for (op, handlers) in &standard.unary {
            for h in handlers {
                rebuilt
                    .register_unary(*op, Arc::clone(h))
                    .unwrap_or_else(|e| panic!("standard set overlaps: {e}"));
            }
        }
    }

    #[test]
    fn test_pairs_touching_null() {
        let pairs = pairs_touching(TypeCategory::Null);
        assert_eq!(pairs.len(), 9);
        assert!(pairs.contains(&(TypeCategory::Null, TypeCategory::Null)));
        assert!(pairs.contains(&(TypeCategory::String, TypeCategory::Null)));
        assert!(pairs.contains(&(TypeCategory::Null, TypeCategory::Composite)));
    }

    #[test]
    fn test_symbol_serde() {
        let op: BinaryOp = serde_json::from_str("\"<>\"").unwrap();
        assert_eq!(op, BinaryOp::Ne);
        let op: UnaryOp = serde_json::from_str("\"IS NOT NULL\"").unwrap();
        assert_eq!(op, UnaryOp::IsNotNull);
    }
}
