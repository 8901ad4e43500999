// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Session integration tests
//!
//! Each test feeds a session several units in sequence, the way a REPL
//! submits one line at a time.

use std::rc::Rc;

use tarn_engine::ast::{
    Block, Expression, InfixOperator, Parameter, Program, Statement, StructType, Type,
};
use tarn_engine::{CompileError, EngineConfig, Error, RuntimeError, Session, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn eval(session: &mut Session, statements: Vec<Statement>) -> Result<Value, Error> {
    session.eval(&Program::new(statements))
}

fn fib() -> Statement {
    let n = || Expression::ident("n");
    let call = |k| {
        Expression::call(
            Expression::ident("fib"),
            vec![Expression::infix(n(), InfixOperator::Subtract, Expression::int(k))],
        )
    };
    Statement::function(
        "fib",
        vec![Parameter::new("n", Type::Int)],
        Some(Type::Int),
        Block::new(vec![
            Statement::expr(Expression::if_else(
                Expression::infix(n(), InfixOperator::LessThan, Expression::int(2)),
                Block::new(vec![Statement::ret(n())]),
                None,
            )),
            Statement::ret(Expression::infix(call(1), InfixOperator::Add, call(2))),
        ]),
    )
}

#[test]
fn test_globals_persist_between_units() {
    init_tracing();
    let mut session = Session::new();

    eval(&mut session, vec![Statement::let_("x", Expression::int(40))]).unwrap();
    eval(
        &mut session,
        vec![Statement::assign(
            "x",
            Expression::infix(Expression::ident("x"), InfixOperator::Add, Expression::int(2)),
        )],
    )
    .unwrap();

    let result = eval(&mut session, vec![Statement::expr(Expression::ident("x"))]).unwrap();
    assert_eq!(result.to_string(), "42");

    let globals = session.globals();
    assert_eq!(globals.len(), EngineConfig::default().globals_size);
    assert_eq!(globals.get(0), Ok(Value::Integer(42)));
}

#[test]
fn test_functions_persist_between_units() {
    init_tracing();
    let mut session = Session::new();

    eval(&mut session, vec![fib()]).unwrap();
    let result = eval(
        &mut session,
        vec![Statement::expr(Expression::call(
            Expression::ident("fib"),
            vec![Expression::int(15)],
        ))],
    )
    .unwrap();
    assert_eq!(result, Value::Integer(610));
}

#[test]
fn test_struct_types_persist_between_units() {
    init_tracing();
    let mut session = Session::new();
    let point = Rc::new(StructType::new("Point", vec![("x", Type::Int), ("y", Type::Int)]));

    eval(&mut session, vec![Statement::Struct(point)]).unwrap();
    let result = eval(
        &mut session,
        vec![Statement::expr(Expression::selector(
            Expression::struct_literal(
                "Point",
                vec![("y", Expression::int(2)), ("x", Expression::int(1))],
            ),
            "y",
        ))],
    )
    .unwrap();
    assert_eq!(result, Value::Integer(2));
}

#[test]
fn test_compile_error_leaves_session_unchanged() {
    init_tracing();
    let mut session = Session::new();

    let err = eval(
        &mut session,
        vec![
            Statement::let_("y", Expression::int(1)),
            Statement::expr(Expression::ident("missing")),
        ],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(CompileError::UndefinedVariable(ref name)) if name == "missing"
    ));

    // `y` was never committed
    let err = eval(&mut session, vec![Statement::expr(Expression::ident("y"))]).unwrap_err();
    assert!(matches!(err, Error::Compile(CompileError::UndefinedVariable(_))));

    let result = eval(&mut session, vec![Statement::let_("y", Expression::int(7))]);
    assert!(result.is_ok());
}

#[test]
fn test_runtime_error_keeps_earlier_writes() {
    init_tracing();
    let mut session = Session::new();

    let err = eval(
        &mut session,
        vec![
            Statement::let_("z", Expression::int(5)),
            Statement::expr(Expression::infix(
                Expression::int(1),
                InfixOperator::Divide,
                Expression::int(0),
            )),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::DivisionByZero)));

    let result = eval(&mut session, vec![Statement::expr(Expression::ident("z"))]).unwrap();
    assert_eq!(result, Value::Integer(5));
}

#[test]
fn test_sessions_are_deterministic() {
    init_tracing();
    let program = Program::new(vec![
        fib(),
        Statement::expr(Expression::call(Expression::ident("fib"), vec![Expression::int(12)])),
    ]);

    let first = Session::new().eval(&program).unwrap();
    let second = Session::new().eval(&program).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Value::Integer(144));
}

#[test]
fn test_config_from_toml_limits_recursion() {
    init_tracing();
    let config = EngineConfig::from_toml_str("max_frames = 4\nstack_size = 512\n").unwrap();
    assert_eq!(config.stack_size, 512);

    let mut session = Session::with_config(config);
    assert_eq!(session.config().max_frames, 4);

    let err = eval(
        &mut session,
        vec![
            fib(),
            Statement::expr(Expression::call(Expression::ident("fib"), vec![Expression::int(10)])),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::FrameOverflow(4))));
    assert_eq!(err.to_string(), "runtime error: frame stack overflow (max 4 frames)");
}
