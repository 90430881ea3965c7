//! Error taxonomy, messages and catchability

use pretty_assertions::assert_eq;
use sproc::ast::*;
use sproc::*;

async fn run(stmts: Vec<Stmt>) -> std::result::Result<ScriptOutcome, EvalError> {
    Engine::builder()
        .build()
        .execution()
        .run_script(&Block::new(stmts))
        .await
}

#[tokio::test]
async fn test_each_kind_from_a_script() {
    let cases: Vec<(Vec<Stmt>, ErrorKind)> = vec![
        (
            vec![Stmt::eval(Expr::binary(BinaryOp::Sub, Expr::lit("a"), Expr::lit(1)))],
            ErrorKind::TypeMismatch,
        ),
        (vec![Stmt::eval(Expr::var("nope"))], ErrorKind::UndefinedVariable),
        (
            vec![
                Stmt::declare("d", DataType::Int),
                Stmt::declare("d", DataType::Int),
            ],
            ErrorKind::DuplicateDeclaration,
        ),
        (vec![Stmt::call("nowhere", vec![])], ErrorKind::UndefinedProcedure),
        (
            vec![Stmt::eval(Expr::call("upper", vec![]))],
            ErrorKind::ArgumentMismatch,
        ),
        (vec![Stmt::brk()], ErrorKind::ControlFlowError),
        (vec![Stmt::throw(Expr::lit(1))], ErrorKind::ScriptThrow),
        (
            vec![Stmt::execute(Expr::lit("no such query"), None)],
            ErrorKind::BackendFailure,
        ),
        (
            vec![Stmt::eval(Expr::binary(BinaryOp::Mod, Expr::lit(1), Expr::lit(0)))],
            ErrorKind::Arithmetic,
        ),
    ];
    for (stmts, kind) in cases {
        let err = run(stmts).await.unwrap_err();
        assert_eq!(err.kind(), kind, "{err}");
    }
}

#[tokio::test]
async fn test_uncaught_throw_message() {
    let err = run(vec![Stmt::throw(Expr::record(vec![(
        "code",
        Expr::lit(7),
    )]))])
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "unhandled THROW: {code: 7}");
}

#[tokio::test]
async fn test_catch_when_guard_selects_handler() {
    let catches = vec![
        CatchClause {
            var: "e".into(),
            when: Some(Expr::binary(
                BinaryOp::Eq,
                Expr::field(Expr::var("e"), "code"),
                Expr::lit(404),
            )),
            body: Block::new(vec![Stmt::set("handled", Expr::lit("not found"))]),
        },
        CatchClause {
            var: "e".into(),
            when: None,
            body: Block::new(vec![Stmt::set("handled", Expr::lit("other"))]),
        },
    ];
    let script = |code: i64| {
        vec![
            Stmt::declare("handled", DataType::String),
            Stmt::new(StmtKind::Try(TryStmt {
                body: Block::new(vec![Stmt::throw(Expr::record(vec![(
                    "code",
                    Expr::lit(code),
                )]))]),
                catches: catches.clone(),
            })),
        ]
    };

    let outcome = run(script(404)).await.unwrap();
    assert_eq!(outcome.variables.get("handled"), Some(&Value::string("not found")));
    let outcome = run(script(500)).await.unwrap();
    assert_eq!(outcome.variables.get("handled"), Some(&Value::string("other")));
}

#[tokio::test]
async fn test_unmatched_guard_rethrows() {
    let err = run(vec![Stmt::new(StmtKind::Try(TryStmt {
        body: Block::new(vec![Stmt::throw(Expr::lit("kept"))]),
        catches: vec![CatchClause {
            var: "e".into(),
            when: Some(Expr::lit(false)),
            body: Block::default(),
        }],
    }))])
    .await
    .unwrap_err();
    assert!(matches!(err, EvalError::ScriptThrow { ref payload, .. } if *payload == Value::string("kept")));
}

#[tokio::test]
async fn test_rethrow_from_handler() {
    let err = run(vec![Stmt::try_catch(
        vec![Stmt::throw(Expr::lit("first"))],
        "e",
        vec![Stmt::throw(Expr::binary(
            BinaryOp::Concat,
            Expr::lit("wrapped: "),
            Expr::var("e"),
        ))],
    )])
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "unhandled THROW: wrapped: first");
}

#[tokio::test]
async fn test_engine_faults_are_not_catchable() {
    let err = run(vec![Stmt::try_catch(
        vec![Stmt::eval(Expr::var("undefined_thing"))],
        "e",
        vec![],
    )])
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
}

#[tokio::test]
async fn test_catch_variable_scoped_to_handler() {
    let err = run(vec![
        Stmt::try_catch(vec![Stmt::throw(Expr::lit(1))], "e", vec![]),
        Stmt::eval(Expr::var("e")),
    ])
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
}

#[tokio::test]
async fn test_throw_span_points_at_throw() {
    let err = run(vec![
        Stmt::eval(Expr::lit(1)).at(1, 1),
        Stmt::throw(Expr::lit("x")).at(2, 3),
    ])
    .await
    .unwrap_err();
    assert_eq!(err.span(), Some(Span::new(2, 3)));
}

#[test]
fn test_catchable_errors() {
    assert!(EvalError::division_by_zero().is_catchable());
    assert!(EvalError::BackendFailure {
        source: BackendError::new("x"),
        procedure: None,
        span: None
    }
    .is_catchable());
    assert!(!EvalError::Cancelled.is_catchable());
    assert!(!EvalError::control_flow("x").is_catchable());
    assert!(!EvalError::StackOverflow {
        depth: 2,
        max: 1,
        span: None
    }
    .is_catchable());
}

#[test]
fn test_with_span_keeps_first() {
    let err = EvalError::control_flow("x")
        .with_span(Some(Span::new(1, 1)))
        .with_span(Some(Span::new(9, 9)));
    assert_eq!(err.span(), Some(Span::new(1, 1)));
}

#[test]
fn test_error_kind_display() {
    assert_eq!(ErrorKind::ControlFlowError.to_string(), "ControlFlowError");
    assert_eq!(ErrorKind::BackendFailure.to_string(), "BackendFailure");
}
