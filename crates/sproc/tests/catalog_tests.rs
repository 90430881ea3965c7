//! Catalog, builtins and the standard library

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use sproc::ast::*;
use sproc::*;

fn constant(name: &str, value: i64) -> ProcedureDef {
    ProcedureDef::new(name, vec![Stmt::ret(Some(Expr::lit(value)))]).with_returns(DataType::Int)
}

async fn eval(engine: &Engine, expr: Expr) -> std::result::Result<Value, EvalError> {
    let outcome = engine
        .execution()
        .run_script(&Block::new(vec![Stmt::ret(Some(expr))]))
        .await?;
    Ok(outcome.value.unwrap_or(Value::Null))
}

// ═══════════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_names_keep_original_spelling() {
    let catalog = Catalog::new();
    catalog.register(constant("LoadOrders", 1)).unwrap();
    catalog.register(constant("archive", 2)).unwrap();
    assert_eq!(catalog.names(), vec!["LoadOrders", "archive"]);
    assert_eq!(catalog.lookup("LOADORDERS").unwrap().name(), "LoadOrders");
    assert_eq!(catalog.len(), 2);
}

#[test]
fn test_lookup_missing() {
    let catalog = Catalog::new();
    assert!(catalog.is_empty());
    assert!(matches!(
        catalog.lookup("ghost"),
        Err(EvalError::UndefinedProcedure { ref name, .. }) if name == "ghost"
    ));
}

#[test]
fn test_frozen_policy_also_guards_builtins() {
    let catalog = Catalog::with_policy(RedefinePolicy::Frozen);
    assert_eq!(catalog.policy(), RedefinePolicy::Frozen);
    catalog
        .register_builtin(Builtin::sync("one", 0..=0, |_| Ok(Value::Int(1))))
        .unwrap();
    assert_eq!(
        catalog.register(constant("ONE", 2)),
        Err(CatalogError::Frozen {
            name: "ONE".to_string()
        })
    );
    assert!(matches!(catalog.lookup("one"), Ok(Routine::Builtin(_))));
}

#[test]
fn test_concurrent_registration_and_lookup() {
    let catalog = Arc::new(Catalog::new());
    let writers: Vec<_> = (0..4)
        .map(|t| {
            let catalog = catalog.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    catalog.register(constant(&format!("p{t}_{i}"), i)).unwrap();
                    catalog.register(constant("shared", t)).unwrap();
                }
            })
        })
        .collect();
    let reader = {
        let catalog = catalog.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                if let Ok(Routine::Procedure(def)) = catalog.lookup("shared") {
                    assert_eq!(def.body.stmts.len(), 1);
                }
            }
        })
    };
    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();
    assert_eq!(catalog.len(), 4 * 50 + 1);
}

// ═══════════════════════════════════════════════════════════════════════
// User builtins
// ═══════════════════════════════════════════════════════════════════════

/// Answers with the number of arguments once the backend is reached.
struct CountArgs;

impl AsyncBuiltin for CountArgs {
    fn apply(
        &self,
        args: Vec<Value>,
        _backend: &dyn Backend,
        done: Continuation,
    ) -> std::result::Result<(), String> {
        if args.iter().any(Value::is_null) {
            return Err("arguments must not be NULL".to_string());
        }
        let n = args.len() as i64;
        tokio::spawn(async move {
            done.succeed(Value::Int(n));
        });
        Ok(())
    }
}

#[tokio::test]
async fn test_sync_builtin_registered_by_host() {
    let engine = Engine::builder().build();
    engine
        .register_builtin(Builtin::sync("double", 1..=1, |args| match &args[0] {
            Value::Int(n) => Ok(Value::Int(n * 2)),
            other => Err(format!("double expects INT, got {}", other.type_name())),
        }))
        .unwrap();

    assert_eq!(
        eval(&engine, Expr::call("DOUBLE", vec![Expr::lit(21)])).await.unwrap(),
        Value::Int(42)
    );
    let err = eval(&engine, Expr::call("double", vec![Expr::lit("x")]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument mismatch calling `double`: double expects INT, got STRING"
    );
}

#[tokio::test]
async fn test_async_builtin_registered_by_host() {
    let engine = Engine::builder().build();
    engine
        .register_builtin(Builtin::asynchronous("count_args", 0..=3, CountArgs))
        .unwrap();
    assert!(matches!(
        engine.lookup("count_args"),
        Ok(Routine::Builtin(ref b)) if b.is_async()
    ));

    let n = eval(
        &engine,
        Expr::call("count_args", vec![Expr::lit(1), Expr::lit("two")]),
    )
    .await
    .unwrap();
    assert_eq!(n, Value::Int(2));

    let err = eval(&engine, Expr::call("count_args", vec![Expr::null()]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);

    let err = eval(
        &engine,
        Expr::call("count_args", vec![Expr::lit(1); 4]),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument mismatch calling `count_args`: expected 0 to 3 arguments, got 4"
    );
}

#[tokio::test]
async fn test_builtin_in_call_statement() {
    let engine = Engine::builder().build();
    let outcome = engine
        .execution()
        .run_script(&Block::new(vec![Stmt::call("upper", vec![Expr::lit("x")])]))
        .await
        .unwrap();
    assert_eq!(outcome.value, None);
}

// ═══════════════════════════════════════════════════════════════════════
// Standard library
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_standard_builtins() {
    let engine = Engine::builder().build();
    let record = Expr::record(vec![("b", Expr::lit(1)), ("a", Expr::lit(2))]);
    let cases = vec![
        (Expr::call("length", vec![Expr::lit("héllo")]), Value::Int(5)),
        (
            Expr::call("length", vec![Expr::array(vec![Expr::null(), Expr::null()])]),
            Value::Int(2),
        ),
        (Expr::call("upper", vec![Expr::lit("abc")]), Value::string("ABC")),
        (Expr::call("lower", vec![Expr::lit("ABC")]), Value::string("abc")),
        (Expr::call("abs", vec![Expr::lit(-4)]), Value::Int(4)),
        (Expr::call("abs", vec![Expr::lit(-1.5)]), Value::Float(1.5)),
        (
            Expr::call("coalesce", vec![Expr::null(), Expr::lit(3), Expr::lit(4)]),
            Value::Int(3),
        ),
        (Expr::call("coalesce", vec![Expr::null()]), Value::Null),
        (Expr::call("to_string", vec![Expr::lit(2.0)]), Value::string("2.0")),
        (Expr::call("to_string", vec![Expr::null()]), Value::Null),
        (
            Expr::call("keys", vec![record]),
            Value::array(vec![Value::string("b"), Value::string("a")]),
        ),
        (Expr::call("upper", vec![Expr::null()]), Value::Null),
    ];
    for (expr, expected) in cases {
        assert_eq!(eval(&engine, expr.clone()).await.unwrap(), expected, "{expr:?}");
    }
}

#[tokio::test]
async fn test_search_passes_params() {
    let backend = Arc::new(MemoryBackend::new());
    backend.respond("find ?", Value::array(vec![Value::Int(1)]));
    let engine = Engine::builder().backend(backend.clone()).build();
    let value = eval(
        &engine,
        Expr::call(
            "search",
            vec![Expr::lit("find ?"), Expr::array(vec![Expr::lit("x")])],
        ),
    )
    .await
    .unwrap();
    assert_eq!(value, Value::array(vec![Value::Int(1)]));
    assert_eq!(backend.submitted()[0].params, vec![Value::string("x")]);
}

#[tokio::test]
async fn test_search_rejects_bad_query() {
    let engine = Engine::builder().build();
    let err = eval(&engine, Expr::call("search", vec![Expr::lit(1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
}
