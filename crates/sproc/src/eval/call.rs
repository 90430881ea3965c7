//! CALL statements, function calls and procedure invocation

use futures::future::{BoxFuture, FutureExt};
use tracing::{info_span, Instrument};

use super::{Evaluate, Execute, Signal};
use crate::ast::{Arg, CallStmt, Expr};
use crate::catalog::{Builtin, BuiltinKind, ParamMode, ProcedureDef, Routine};
use crate::environment::Binding;
use crate::{Environment, EvalContext, EvalError, Value};

/// A call-site argument borrowed from either call form.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ArgRef<'a> {
    pub name: Option<&'a str>,
    pub value: &'a Expr,
}

impl<'a> ArgRef<'a> {
    pub fn positional(value: &'a Expr) -> Self {
        Self { name: None, value }
    }
}

impl<'a> From<&'a Arg> for ArgRef<'a> {
    fn from(arg: &'a Arg) -> Self {
        Self {
            name: arg.name.as_deref(),
            value: &arg.value,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Call sites
// ═══════════════════════════════════════════════════════════════════════

impl Execute for CallStmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            let routine = ctx.catalog.lookup(&self.name)?;
            let args: Vec<ArgRef<'_>> = self.args.iter().map(ArgRef::from).collect();
            call_routine(routine, &args, env, ctx).await?;
            Ok(Signal::None)
        }
        .boxed()
    }
}

/// A call in expression context. Only functions and builtins produce
/// values there.
pub(crate) async fn eval_call(
    name: &str,
    args: &[Expr],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let routine = ctx.catalog.lookup(name)?;
    if let Routine::Procedure(def) = &routine {
        if !def.is_function() {
            return Err(EvalError::control_flow(format!(
                "procedure `{}` has no return type and cannot be used in an expression",
                def.name
            )));
        }
    }
    let args: Vec<ArgRef<'_>> = args.iter().map(ArgRef::positional).collect();
    call_routine(routine, &args, env, ctx).await
}

pub(crate) async fn call_routine(
    routine: Routine,
    args: &[ArgRef<'_>],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    match routine {
        Routine::Procedure(def) => invoke_procedure(&def, args, env, ctx).await,
        Routine::Builtin(builtin) => {
            if let Some(named) = args.iter().find_map(|a| a.name) {
                return Err(EvalError::argument_mismatch(
                    &builtin.name,
                    format!("builtins take positional arguments only, got `{named}`"),
                ));
            }
            builtin.check_arity(args.len())?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(arg.value.eval(env, ctx).await?);
            }
            call_builtin(&builtin, values, ctx).await
        }
    }
}

/// Run a builtin on evaluated arguments, suspending for async ones.
pub(crate) async fn call_builtin(
    builtin: &Builtin,
    args: Vec<Value>,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    builtin.check_arity(args.len())?;
    match &builtin.kind {
        BuiltinKind::Sync(f) => f(&args).map_err(|m| EvalError::argument_mismatch(&builtin.name, m)),
        BuiltinKind::Async(imp) => {
            ctx.suspend(|k| {
                imp.apply(args, ctx.backend.as_ref(), k)
                    .map_err(|m| EvalError::argument_mismatch(&builtin.name, m))
            })
            .await
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Procedure invocation
// ═══════════════════════════════════════════════════════════════════════

/// Invoke an interpreted procedure.
///
/// Arguments are matched to parameters (positional first, then by name),
/// evaluated in source order and coerced to the parameter types. The body
/// runs in a fresh root environment one call level deeper. The caller's
/// OUT and INOUT variables must be declared with types that can hold the
/// parameter's type. Their values are copied back only when the body
/// completes or RETURNs, and only if every one of them fits; a THROW
/// leaves the caller's variables untouched and escapes tagged with the
/// procedure name.
pub(crate) async fn invoke_procedure(
    def: &ProcedureDef,
    args: &[ArgRef<'_>],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let order = bind_arguments(def, args)?;

    let mut values = vec![Value::Null; def.params.len()];
    let mut targets: Vec<Option<&str>> = vec![None; def.params.len()];
    for (position, arg) in args.iter().enumerate() {
        let index = order[position];
        let param = &def.params[index];
        let incoming = match param.mode {
            ParamMode::In => arg.value.eval(env, ctx).await?,
            ParamMode::Out | ParamMode::InOut => {
                let target = out_target(def, index, arg)?;
                let binding = writable_target(def, index, target, env)?;
                targets[index] = Some(target);
                match param.mode {
                    ParamMode::InOut => binding.value.clone(),
                    _ => Value::Null,
                }
            }
        };
        values[index] = param.ty.coerce(incoming).map_err(|rejected| {
            EvalError::argument_mismatch(
                &def.name,
                format!(
                    "parameter `{}` expects {}, got {}",
                    param.name,
                    param.ty,
                    rejected.type_name()
                ),
            )
        })?;
    }

    let mut callee = env.for_call()?;
    for (param, value) in def.params.iter().zip(values) {
        callee.declare(param.name.as_str(), param.ty, value)?;
    }

    let span = info_span!("invoke", procedure = %def.name, depth = callee.call_depth());
    let signal = def.body.execute(&mut callee, ctx).instrument(span).await?;
    let result = complete(def, signal)?;

    // Every value is checked before the first write so the caller sees
    // all of the copy-back or none of it.
    let mut copy_back = Vec::new();
    for (index, param) in def.params.iter().enumerate() {
        if let Some(target) = targets[index] {
            let value = callee.resolve(&param.name)?;
            let binding = writable_target(def, index, target, env)?;
            let value = binding.ty.coerce(value).map_err(|rejected| {
                EvalError::argument_mismatch(
                    &def.name,
                    format!(
                        "{} parameter `{}` produced {}, which `{target}` ({}) cannot hold",
                        param.mode,
                        param.name,
                        rejected.type_name(),
                        binding.ty
                    ),
                )
            })?;
            copy_back.push((target, value));
        }
    }
    for (target, value) in copy_back {
        env.assign(target, value)?;
    }
    Ok(result)
}

/// The caller's variable behind an OUT/INOUT argument, checked against
/// the parameter type.
fn writable_target<'e>(
    def: &ProcedureDef,
    index: usize,
    target: &str,
    env: &'e Environment,
) -> Result<&'e Binding, EvalError> {
    let param = &def.params[index];
    let binding = env
        .get_binding(target)
        .ok_or_else(|| EvalError::UndefinedVariable {
            name: target.to_string(),
            span: None,
        })?;
    if !binding.ty.stores(param.ty) {
        return Err(EvalError::argument_mismatch(
            &def.name,
            format!(
                "{} parameter `{}` is {} but `{target}` is declared as {}",
                param.mode, param.name, param.ty, binding.ty
            ),
        ));
    }
    Ok(binding)
}

/// Parameter index for every argument, in source order.
fn bind_arguments(def: &ProcedureDef, args: &[ArgRef<'_>]) -> Result<Vec<usize>, EvalError> {
    let mismatch = |message: String| EvalError::argument_mismatch(&def.name, message);

    let mut bound: Vec<bool> = vec![false; def.params.len()];
    let mut order = Vec::with_capacity(args.len());
    let mut seen_named = false;

    for (position, arg) in args.iter().enumerate() {
        let index = match arg.name {
            None if seen_named => {
                return Err(mismatch(
                    "positional argument after a named argument".to_string(),
                ))
            }
            None if position >= def.params.len() => {
                return Err(mismatch(format!(
                    "expected {} arguments, got {}",
                    def.params.len(),
                    args.len()
                )))
            }
            None => position,
            Some(name) => {
                seen_named = true;
                def.param_index(name)
                    .ok_or_else(|| mismatch(format!("no parameter named `{name}`")))?
            }
        };
        if std::mem::replace(&mut bound[index], true) {
            return Err(mismatch(format!(
                "parameter `{}` is bound more than once",
                def.params[index].name
            )));
        }
        out_target(def, index, arg)?;
        order.push(index);
    }

    if let Some(missing) = bound.iter().position(|b| !b) {
        return Err(mismatch(format!(
            "missing argument for parameter `{}`",
            def.params[missing].name
        )));
    }
    Ok(order)
}

/// The caller variable an OUT/INOUT argument writes back to.
///
/// Returns `""` for IN parameters, which have no target.
fn out_target<'a>(
    def: &ProcedureDef,
    index: usize,
    arg: &ArgRef<'a>,
) -> Result<&'a str, EvalError> {
    let param = &def.params[index];
    if !param.mode.writes_back() {
        return Ok("");
    }
    arg.value.as_var().ok_or_else(|| {
        EvalError::argument_mismatch(
            &def.name,
            format!("{} parameter `{}` needs a variable argument", param.mode, param.name),
        )
    })
}

/// Turn the body's final signal into the call's result.
fn complete(def: &ProcedureDef, signal: Signal) -> Result<Value, EvalError> {
    match (signal, def.returns) {
        (Signal::Throw(mut thrown), _) => {
            thrown.procedure.get_or_insert_with(|| def.name.clone());
            Err(thrown.into_error())
        }
        (Signal::Break, _) => Err(EvalError::control_flow("BREAK outside loop")),
        (Signal::Continue, _) => Err(EvalError::control_flow("CONTINUE outside loop")),
        (Signal::None, None) | (Signal::Return(None), None) => Ok(Value::Null),
        (Signal::Return(Some(_)), None) => Err(EvalError::control_flow(format!(
            "procedure `{}` has no return type but RETURN carries a value",
            def.name
        ))),
        (Signal::None, Some(_)) => Err(EvalError::control_flow(format!(
            "function `{}` finished without RETURN",
            def.name
        ))),
        (Signal::Return(None), Some(ty)) => Err(EvalError::control_flow(format!(
            "function `{}` must RETURN a {ty} value",
            def.name
        ))),
        (Signal::Return(Some(value)), Some(ty)) => ty.coerce(value).map_err(|rejected| {
            EvalError::control_flow(format!(
                "RETURN type mismatch in `{}`: expected {ty}, got {}",
                def.name,
                rejected.type_name()
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Stmt;
    use crate::eval::run_stmts;
    use crate::eval::testing::context;
    use crate::ops::BinaryOp;
    use crate::{DataType, ErrorKind};

    fn double() -> ProcedureDef {
        ProcedureDef::new(
            "double",
            vec![Stmt::ret(Some(Expr::binary(
                BinaryOp::Mul,
                Expr::var("n"),
                Expr::lit(2),
            )))],
        )
        .param("n", DataType::Int, ParamMode::In)
        .with_returns(DataType::Int)
    }

    #[tokio::test]
    async fn test_function_in_expression() {
        let ctx = context();
        ctx.catalog.register(double()).unwrap();
        let mut env = Environment::new();
        let value = eval_call("DOUBLE", &[Expr::lit(21)], &mut env, &ctx)
            .await
            .unwrap();
        assert_eq!(value, Value::Int(42));
    }

    #[tokio::test]
    async fn test_procedure_in_expression_rejected() {
        let ctx = context();
        ctx.catalog
            .register(ProcedureDef::new("noop", vec![Stmt::ret(None)]))
            .unwrap();
        let mut env = Environment::new();
        let err = eval_call("noop", &[], &mut env, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ControlFlowError);
    }

    #[tokio::test]
    async fn test_argument_count_and_type() {
        let ctx = context();
        ctx.catalog.register(double()).unwrap();
        let mut env = Environment::new();

        let err = eval_call("double", &[], &mut env, &ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument mismatch calling `double`: missing argument for parameter `n`"
        );

        let err = eval_call("double", &[Expr::lit("x")], &mut env, &ctx)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument mismatch calling `double`: parameter `n` expects INT, got STRING"
        );

        let err = eval_call("double", &[Expr::lit(1), Expr::lit(2)], &mut env, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
    }

    #[tokio::test]
    async fn test_out_argument_must_be_variable() {
        let ctx = context();
        ctx.catalog
            .register(
                ProcedureDef::new("fill", vec![Stmt::set("x", Expr::lit(1))])
                    .param("x", DataType::Int, ParamMode::Out),
            )
            .unwrap();
        let mut env = Environment::new();
        let stmts = vec![Stmt::call("fill", vec![Expr::lit(5)])];
        let err = run_stmts(&stmts, &mut env, &ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument mismatch calling `fill`: OUT parameter `x` needs a variable argument"
        );
    }

    #[tokio::test]
    async fn test_named_arguments() {
        let ctx = context();
        ctx.catalog
            .register(
                ProcedureDef::new(
                    "sub",
                    vec![Stmt::ret(Some(Expr::binary(
                        BinaryOp::Sub,
                        Expr::var("a"),
                        Expr::var("b"),
                    )))],
                )
                .param("a", DataType::Int, ParamMode::In)
                .param("b", DataType::Int, ParamMode::In)
                .param("diff", DataType::Int, ParamMode::Out)
                .with_returns(DataType::Int),
            )
            .unwrap();
        let mut env = Environment::new();
        env.declare("d", DataType::Int, Value::Null).unwrap();
        let args = [
            Arg::positional(Expr::lit(10)),
            Arg::named("diff", Expr::var("d")),
            Arg::named("B", Expr::lit(4)),
        ];
        let refs: Vec<ArgRef<'_>> = args.iter().map(ArgRef::from).collect();
        let routine = ctx.catalog.lookup("sub").unwrap();
        let value = call_routine(routine, &refs, &mut env, &ctx).await.unwrap();
        assert_eq!(value, Value::Int(6));
        // diff was never set in the body, so the copy-back writes NULL.
        assert_eq!(env.get("d"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_function_without_return_fails() {
        let ctx = context();
        ctx.catalog
            .register(ProcedureDef::new("f", vec![Stmt::eval(Expr::lit(1))]).with_returns(DataType::Int))
            .unwrap();
        let mut env = Environment::new();
        let err = eval_call("f", &[], &mut env, &ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "control flow error: function `f` finished without RETURN"
        );
    }

    #[tokio::test]
    async fn test_builtin_call() {
        let ctx = context();
        let mut env = Environment::new();
        let value = eval_call("upper", &[Expr::lit("abc")], &mut env, &ctx)
            .await
            .unwrap();
        assert_eq!(value, Value::string("ABC"));

        let err = eval_call("upper", &[], &mut env, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
    }

    #[tokio::test]
    async fn test_recursion_limit() {
        let ctx = context();
        ctx.catalog
            .register(
                ProcedureDef::new("forever", vec![Stmt::call("forever", vec![])]),
            )
            .unwrap();
        let mut env = Environment::with_max_call_depth(8);
        let stmts = vec![Stmt::call("forever", vec![])];
        let err = run_stmts(&stmts, &mut env, &ctx).await.unwrap_err();
        assert!(matches!(err, EvalError::StackOverflow { depth: 9, max: 8, .. }));
    }
}
