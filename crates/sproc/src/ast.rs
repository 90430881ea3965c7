//! Statement and expression tree consumed by the engine
//!
//! The tree is produced by an external parser. Every node derives `serde`
//! so a parser living in another process can hand over JSON; the `"t"` tag
//! names the node kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::ProcedureDef;
use crate::ops::{BinaryOp, UnaryOp};
use crate::types::DataType;
use crate::value::Value;

/// Source location of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl Span {
    /// Create a span at `line:column`.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════

/// A statement with its optional source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// What the statement does
    #[serde(flatten)]
    pub kind: StmtKind,

    /// Where the statement starts in the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// The statement node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum StmtKind {
    /// `BEGIN ... END`
    Block(Block),
    /// `DECLARE name TYPE [:= init]`
    Declare(DeclareStmt),
    /// `SET name = value`
    Set(SetStmt),
    /// `IF ... ELSIF ... ELSE ... END IF`
    If(IfStmt),
    /// `WHILE cond LOOP ... END LOOP`
    While(WhileStmt),
    /// `FOR var IN ... LOOP ... END LOOP`
    For(ForStmt),
    /// `EXECUTE query [USING params] [INTO var]`
    Execute(ExecuteStmt),
    /// `CALL name(args)`
    Call(CallStmt),
    /// `RETURN [value]`
    Return(ReturnStmt),
    /// `BREAK`
    Break,
    /// `CONTINUE`
    Continue,
    /// `THROW value`
    Throw(ThrowStmt),
    /// `TRY ... CATCH ... END TRY`
    Try(TryStmt),
    /// `CREATE OR REPLACE PROCEDURE ...`
    CreateProcedure(ProcedureDef),
    /// An expression evaluated for its effects
    Eval(EvalStmt),
}

impl StmtKind {
    /// Short human-readable name of the node kind.
    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Block(_) => "block",
            StmtKind::Declare(_) => "declare",
            StmtKind::Set(_) => "set",
            StmtKind::If(_) => "if",
            StmtKind::While(_) => "while",
            StmtKind::For(_) => "for",
            StmtKind::Execute(_) => "execute",
            StmtKind::Call(_) => "call",
            StmtKind::Return(_) => "return",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
            StmtKind::Throw(_) => "throw",
            StmtKind::Try(_) => "try",
            StmtKind::CreateProcedure(_) => "create procedure",
            StmtKind::Eval(_) => "expression",
        }
    }
}

/// A sequence of statements forming one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Statements in source order
    pub stmts: Vec<Stmt>,
}

impl Block {
    /// Create a block from statements.
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }
}

impl From<Vec<Stmt>> for Block {
    fn from(stmts: Vec<Stmt>) -> Self {
        Self::new(stmts)
    }
}

/// Variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclareStmt {
    /// Variable name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub ty: DataType,
    /// Optional initializer; the variable starts as NULL without one
    #[serde(default)]
    pub init: Option<Expr>,
}

/// Assignment to a declared variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetStmt {
    /// Target variable
    pub name: String,
    /// New value
    pub value: Expr,
}

/// One `IF`/`ELSIF` arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondBranch {
    /// Boolean condition
    pub cond: Expr,
    /// Statements run when the condition holds
    pub body: Block,
}

/// Conditional statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    /// `IF` arm followed by any `ELSIF` arms
    pub branches: Vec<CondBranch>,
    /// `ELSE` arm
    #[serde(default)]
    pub otherwise: Option<Block>,
}

/// `WHILE` loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    /// Condition checked before every iteration
    pub cond: Expr,
    /// Loop body
    pub body: Block,
}

/// What a `FOR` loop walks over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ForIter {
    /// Inclusive integer range `start..end`
    Range {
        /// Lower bound
        start: Expr,
        /// Upper bound (inclusive)
        end: Expr,
        /// Walk from `end` down to `start`
        #[serde(default)]
        reverse: bool,
    },
    /// Every element of an array value
    Each {
        /// Expression producing the array
        source: Expr,
    },
}

/// `FOR` loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStmt {
    /// Loop variable, declared fresh in every iteration
    pub var: String,
    /// Iteration source
    pub iter: ForIter,
    /// Loop body
    pub body: Block,
}

/// Backend query statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteStmt {
    /// Query text
    pub query: Expr,
    /// Bind parameters
    #[serde(default)]
    pub params: Vec<Expr>,
    /// Variable receiving the result
    #[serde(default)]
    pub into: Option<String>,
}

/// A call-site argument, positional or named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    /// Parameter name for `name => value` arguments
    #[serde(default)]
    pub name: Option<String>,
    /// Argument expression; must be a variable for OUT/INOUT parameters
    pub value: Expr,
}

impl Arg {
    /// Positional argument.
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }

    /// Named argument.
    pub fn named(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// Procedure call statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStmt {
    /// Procedure name
    pub name: String,
    /// Arguments in source order
    #[serde(default)]
    pub args: Vec<Arg>,
}

/// `RETURN` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    /// Returned value
    #[serde(default)]
    pub value: Option<Expr>,
}

/// `THROW` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowStmt {
    /// Payload bound by a catching handler
    pub value: Expr,
}

/// One `CATCH` handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// Variable the thrown payload is bound to
    pub var: String,
    /// Optional guard; the handler only matches when it evaluates to TRUE
    #[serde(default)]
    pub when: Option<Expr>,
    /// Handler body
    pub body: Block,
}

/// `TRY`/`CATCH` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStmt {
    /// Protected statements
    pub body: Block,
    /// Handlers, tried in order
    #[serde(default)]
    pub catches: Vec<CatchClause>,
}

/// Expression statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalStmt {
    /// Expression evaluated and discarded
    pub expr: Expr,
}

// ═══════════════════════════════════════════════════════════════════════
// Expressions
// ═══════════════════════════════════════════════════════════════════════

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    /// Constant value
    Literal {
        /// The constant
        value: Value,
    },
    /// Variable reference
    Var {
        /// Variable name
        name: String,
    },
    /// Binary operation
    Binary {
        /// Operator symbol
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Unary operation
    Unary {
        /// Operator symbol
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Function or builtin call
    Call {
        /// Routine name
        name: String,
        /// Positional arguments
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Record field access `base.field`
    Field {
        /// Record expression
        base: Box<Expr>,
        /// Field name
        field: String,
    },
    /// Array element access `base[index]` (0-based)
    Index {
        /// Array expression
        base: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
    /// Array constructor
    Array {
        /// Elements in order
        items: Vec<Expr>,
    },
    /// Record constructor
    Record {
        /// Fields in order
        fields: Vec<(String, Expr)>,
    },
}

impl Expr {
    /// Literal expression.
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal {
            value: value.into(),
        }
    }

    /// NULL literal.
    pub fn null() -> Self {
        Expr::Literal { value: Value::Null }
    }

    /// Variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    /// Binary operation.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Unary operation.
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Function call.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    /// Field access.
    pub fn field(base: Expr, field: impl Into<String>) -> Self {
        Expr::Field {
            base: Box::new(base),
            field: field.into(),
        }
    }

    /// Element access.
    pub fn index(base: Expr, index: Expr) -> Self {
        Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Array constructor.
    pub fn array(items: Vec<Expr>) -> Self {
        Expr::Array { items }
    }

    /// Record constructor; fields keep the given order.
    pub fn record<K: Into<String>>(fields: Vec<(K, Expr)>) -> Self {
        Expr::Record {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// The variable name if this expression is a plain variable reference.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var { name } => Some(name),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Statement constructors
// ═══════════════════════════════════════════════════════════════════════

impl Stmt {
    /// Wrap a kind without location.
    pub fn new(kind: StmtKind) -> Self {
        Self { kind, span: None }
    }

    /// Attach a source location.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.span = Some(Span::new(line, column));
        self
    }

    /// Nested block.
    pub fn block(stmts: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block(Block::new(stmts)))
    }

    /// `DECLARE name TYPE`.
    pub fn declare(name: impl Into<String>, ty: DataType) -> Self {
        Self::new(StmtKind::Declare(DeclareStmt {
            name: name.into(),
            ty,
            init: None,
        }))
    }

    /// `DECLARE name TYPE := init`.
    pub fn declare_init(name: impl Into<String>, ty: DataType, init: Expr) -> Self {
        Self::new(StmtKind::Declare(DeclareStmt {
            name: name.into(),
            ty,
            init: Some(init),
        }))
    }

    /// `SET name = value`.
    pub fn set(name: impl Into<String>, value: Expr) -> Self {
        Self::new(StmtKind::Set(SetStmt {
            name: name.into(),
            value,
        }))
    }

    /// `IF cond THEN body [ELSE otherwise]`.
    pub fn if_then(cond: Expr, body: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Self {
        Self::new(StmtKind::If(IfStmt {
            branches: vec![CondBranch {
                cond,
                body: Block::new(body),
            }],
            otherwise: otherwise.map(Block::new),
        }))
    }

    /// `WHILE cond LOOP body END LOOP`.
    pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::While(WhileStmt {
            cond,
            body: Block::new(body),
        }))
    }

    /// `FOR var IN start..end LOOP body END LOOP`.
    pub fn for_range(var: impl Into<String>, start: Expr, end: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::For(ForStmt {
            var: var.into(),
            iter: ForIter::Range {
                start,
                end,
                reverse: false,
            },
            body: Block::new(body),
        }))
    }

    /// `FOR var IN source LOOP body END LOOP` over an array.
    pub fn for_each(var: impl Into<String>, source: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::For(ForStmt {
            var: var.into(),
            iter: ForIter::Each { source },
            body: Block::new(body),
        }))
    }

    /// `EXECUTE query [INTO var]`.
    pub fn execute(query: Expr, into: Option<&str>) -> Self {
        Self::new(StmtKind::Execute(ExecuteStmt {
            query,
            params: Vec::new(),
            into: into.map(str::to_string),
        }))
    }

    /// `CALL name(args)` with positional arguments.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call_with(name, args.into_iter().map(Arg::positional).collect())
    }

    /// `CALL name(args)` with explicit argument forms.
    pub fn call_with(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Self::new(StmtKind::Call(CallStmt {
            name: name.into(),
            args,
        }))
    }

    /// `RETURN [value]`.
    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(ReturnStmt { value }))
    }

    /// `BREAK`.
    pub fn brk() -> Self {
        Self::new(StmtKind::Break)
    }

    /// `CONTINUE`.
    pub fn cont() -> Self {
        Self::new(StmtKind::Continue)
    }

    /// `THROW value`.
    pub fn throw(value: Expr) -> Self {
        Self::new(StmtKind::Throw(ThrowStmt { value }))
    }

    /// `TRY body CATCH var handler END TRY` with a single catch-all handler.
    pub fn try_catch(body: Vec<Stmt>, var: impl Into<String>, handler: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Try(TryStmt {
            body: Block::new(body),
            catches: vec![CatchClause {
                var: var.into(),
                when: None,
                body: Block::new(handler),
            }],
        }))
    }

    /// `CREATE OR REPLACE PROCEDURE`.
    pub fn create_procedure(def: ProcedureDef) -> Self {
        Self::new(StmtKind::CreateProcedure(def))
    }

    /// Expression statement.
    pub fn eval(expr: Expr) -> Self {
        Self::new(StmtKind::Eval(EvalStmt { expr }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stmt_json_shape() {
        let json = r#"{
            "t": "Set",
            "name": "x",
            "value": { "t": "Literal", "value": 7 },
            "span": { "line": 3, "column": 5 }
        }"#;
        let stmt: Stmt = serde_json::from_str(json).unwrap();
        assert_eq!(stmt, Stmt::set("x", Expr::lit(7)).at(3, 5));
    }

    #[test]
    fn test_unit_variants_deserialize() {
        let stmt: Stmt = serde_json::from_str(r#"{ "t": "Break" }"#).unwrap();
        assert_eq!(stmt.kind, StmtKind::Break);
        assert_eq!(stmt.span, None);
    }

    #[test]
    fn test_as_var() {
        assert_eq!(Expr::var("y").as_var(), Some("y"));
        assert_eq!(Expr::lit(1).as_var(), None);
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(4, 12).to_string(), "4:12");
    }
}
