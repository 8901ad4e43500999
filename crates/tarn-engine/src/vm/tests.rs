// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the virtual machine.

use std::rc::Rc;

use super::*;
use crate::ast::{
    Block, Expression, FieldAssignment, IndexAssignment, InfixOperator, Parameter,
    PrefixOperator, Program, Statement, StructType, Type,
};
use crate::compiler::{Bytecode, compile_program};
use crate::config::EngineConfig;
use crate::error::RuntimeError;
use crate::runtime::value::Value;

fn compile(statements: Vec<Statement>) -> Bytecode {
    compile_program(&Program::new(statements)).expect("Compilation should succeed")
}

fn run_with(statements: Vec<Statement>, config: &EngineConfig) -> Result<Value, RuntimeError> {
    let mut vm = VM::with_config(compile(statements), config);
    vm.run()?;
    Ok(vm.last_popped_stack_elem())
}

fn run(statements: Vec<Statement>) -> Result<Value, RuntimeError> {
    run_with(statements, &EngineConfig::default())
}

fn run_ok(statements: Vec<Statement>) -> Value {
    run(statements).expect("Execution should succeed")
}

fn eval(expression: Expression) -> Value {
    run_ok(vec![Statement::expr(expression)])
}

fn int(n: i64) -> Expression {
    Expression::int(n)
}

fn ident(name: &str) -> Expression {
    Expression::ident(name)
}

fn infix(left: Expression, operator: InfixOperator, right: Expression) -> Expression {
    Expression::infix(left, operator, right)
}

fn block(statements: Vec<Statement>) -> Block {
    Block::new(statements)
}

fn int_param(name: &str) -> Parameter {
    Parameter::new(name, Type::Int)
}

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().map(|&n| Value::Integer(n)).collect())
}

fn point_type() -> Rc<StructType> {
    Rc::new(StructType::new("Point", vec![("x", Type::Int), ("y", Type::Int)]))
}

// ============================================================================
// Arithmetic and comparison
// ============================================================================

#[test]
fn test_integer_arithmetic() {
    let expr = infix(
        infix(int(5), InfixOperator::Add, infix(int(10), InfixOperator::Multiply, int(2))),
        InfixOperator::Subtract,
        infix(int(9), InfixOperator::Divide, int(3)),
    );
    assert_eq!(eval(expr), Value::Integer(22));
    assert_eq!(eval(infix(int(7), InfixOperator::Divide, int(2))), Value::Integer(3));
    assert_eq!(eval(Expression::prefix(PrefixOperator::Minus, int(5))), Value::Integer(-5));
}

#[test]
fn test_integer_overflow_wraps() {
    assert_eq!(
        eval(infix(int(i64::MAX), InfixOperator::Add, int(1))),
        Value::Integer(i64::MIN)
    );
}

#[test]
fn test_integer_division_by_zero() {
    let result = run(vec![Statement::expr(infix(int(1), InfixOperator::Divide, int(0)))]);
    assert_eq!(result, Err(RuntimeError::DivisionByZero));
}

#[test]
fn test_float_arithmetic() {
    assert_eq!(
        eval(infix(Expression::Float(1.5), InfixOperator::Multiply, Expression::Float(2.0))),
        Value::Float(3.0)
    );
    assert_eq!(
        eval(infix(Expression::Float(1.0), InfixOperator::Divide, Expression::Float(0.0))),
        Value::Float(f64::INFINITY)
    );
}

#[test]
fn test_string_concatenation() {
    assert_eq!(
        eval(infix(Expression::string("tar"), InfixOperator::Add, Expression::string("n"))),
        Value::string("tarn")
    );

    let err = run(vec![Statement::expr(infix(
        Expression::string("a"),
        InfixOperator::Subtract,
        Expression::string("b"),
    ))])
    .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::UnsupportedOperands {
            op: "-",
            left: "string",
            right: "string",
        }
    );
    assert_eq!(err.to_string(), "unsupported types for -: string string");
}

#[test]
fn test_comparisons() {
    let cases = [
        (infix(int(1), InfixOperator::LessThan, int(2)), true),
        (infix(int(2), InfixOperator::LessThan, int(1)), false),
        (infix(int(2), InfixOperator::LessThanEqual, int(2)), true),
        (infix(int(1), InfixOperator::GreaterThanEqual, int(2)), false),
        (
            infix(Expression::Float(1.5), InfixOperator::GreaterThan, Expression::Float(1.0)),
            true,
        ),
        (infix(int(1), InfixOperator::Equal, int(1)), true),
        (infix(int(1), InfixOperator::NotEqual, int(1)), false),
        (
            infix(Expression::string("a"), InfixOperator::Equal, Expression::string("a")),
            true,
        ),
        (infix(Expression::Null, InfixOperator::Equal, Expression::Null), true),
    ];
    for (expr, expected) in cases {
        assert_eq!(eval(expr), Value::Boolean(expected));
    }
}

#[test]
fn test_boolean_operators() {
    assert_eq!(
        eval(infix(Expression::Boolean(true), InfixOperator::And, Expression::Boolean(false))),
        Value::Boolean(false)
    );
    assert_eq!(
        eval(infix(Expression::Boolean(false), InfixOperator::Or, Expression::Boolean(true))),
        Value::Boolean(true)
    );
    assert_eq!(
        eval(Expression::prefix(PrefixOperator::Bang, Expression::Null)),
        Value::Boolean(true)
    );
    assert_eq!(
        eval(Expression::prefix(PrefixOperator::Bang, int(0))),
        Value::Boolean(false)
    );

    let result = run(vec![Statement::expr(infix(
        int(1),
        InfixOperator::And,
        Expression::Boolean(true),
    ))]);
    assert_eq!(
        result,
        Err(RuntimeError::UnsupportedOperands {
            op: "&&",
            left: "int",
            right: "bool",
        })
    );
}

#[test]
fn test_compound_equality_is_identity() {
    let result = run_ok(vec![
        Statement::let_("a", Expression::Array(vec![int(1)])),
        Statement::let_("b", Expression::Array(vec![int(1)])),
        Statement::let_("same", infix(ident("a"), InfixOperator::Equal, ident("a"))),
        Statement::let_("different", infix(ident("a"), InfixOperator::Equal, ident("b"))),
        Statement::expr(Expression::Array(vec![ident("same"), ident("different")])),
    ]);
    assert_eq!(
        result,
        Value::array(vec![Value::Boolean(true), Value::Boolean(false)])
    );
}

// ============================================================================
// Control flow and bindings
// ============================================================================

#[test]
fn test_conditionals() {
    assert_eq!(
        eval(Expression::if_else(
            Expression::Boolean(false),
            block(vec![Statement::expr(int(10))]),
            None,
        )),
        Value::Null
    );
    assert_eq!(
        eval(Expression::if_else(
            infix(int(1), InfixOperator::GreaterThan, int(2)),
            block(vec![Statement::expr(int(10))]),
            Some(block(vec![Statement::expr(int(20))])),
        )),
        Value::Integer(20)
    );
    assert_eq!(
        eval(Expression::if_else(
            int(0),
            block(vec![Statement::expr(int(10))]),
            None,
        )),
        Value::Integer(10)
    );
}

#[test]
fn test_global_bindings() {
    let result = run_ok(vec![
        Statement::let_("one", int(1)),
        Statement::const_("two", infix(ident("one"), InfixOperator::Add, ident("one"))),
        Statement::expr(infix(ident("one"), InfixOperator::Add, ident("two"))),
    ]);
    assert_eq!(result, Value::Integer(3));
}

#[test]
fn test_for_loop() {
    let result = run_ok(vec![
        Statement::let_("i", int(0)),
        Statement::let_("sum", int(0)),
        Statement::for_loop(
            infix(ident("i"), InfixOperator::LessThan, int(5)),
            block(vec![
                Statement::assign("sum", infix(ident("sum"), InfixOperator::Add, ident("i"))),
                Statement::assign("i", infix(ident("i"), InfixOperator::Add, int(1))),
            ]),
        ),
        Statement::expr(ident("sum")),
    ]);
    assert_eq!(result, Value::Integer(10));
}

#[test]
fn test_zero_values() {
    let result = run_ok(vec![
        Statement::declare("n", Type::Int),
        Statement::declare("s", Type::Str),
        Statement::declare("xs", Type::array(Type::Int)),
        Statement::expr(Expression::Array(vec![ident("n"), ident("s"), ident("xs")])),
    ]);
    assert_eq!(
        result,
        Value::array(vec![Value::Integer(0), Value::string(""), Value::array(vec![])])
    );
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_array_index_out_of_range_is_null() {
    let array = || Expression::Array(vec![int(1), int(2), int(3)]);
    assert_eq!(eval(Expression::index(array(), int(1))), Value::Integer(2));
    assert_eq!(eval(Expression::index(array(), int(10))), Value::Null);
    assert_eq!(
        eval(Expression::index(array(), Expression::prefix(PrefixOperator::Minus, int(1)))),
        Value::Null
    );
}

#[test]
fn test_hash_index() {
    let hash = || Expression::Hash(vec![(int(1), int(2)), (Expression::string("k"), int(3))]);
    assert_eq!(eval(Expression::index(hash(), int(1))), Value::Integer(2));
    assert_eq!(eval(Expression::index(hash(), Expression::string("k"))), Value::Integer(3));
    assert_eq!(eval(Expression::index(hash(), int(0))), Value::Null);

    let result = run(vec![Statement::expr(Expression::index(hash(), Expression::Array(vec![])))]);
    assert_eq!(result, Err(RuntimeError::UnhashableKey("array")));
}

#[test]
fn test_index_assignment() {
    let assign = |index: i64, value: i64| {
        Statement::IndexAssignment(IndexAssignment {
            left: ident("xs"),
            index: int(index),
            value: int(value),
        })
    };

    let result = run_ok(vec![
        Statement::let_("xs", Expression::Array(vec![int(1)])),
        assign(1, 2),
        assign(0, 5),
        Statement::expr(ident("xs")),
    ]);
    assert_eq!(result, ints(&[5, 2]));

    let result = run(vec![
        Statement::let_("xs", Expression::Array(vec![int(1)])),
        assign(3, 1),
    ]);
    assert_eq!(result, Err(RuntimeError::IndexOutOfBounds { index: 3, len: 1 }));
}

#[test]
fn test_hash_index_assignment_upserts() {
    let assign = |key: &str, value: i64| {
        Statement::IndexAssignment(IndexAssignment {
            left: ident("h"),
            index: Expression::string(key),
            value: int(value),
        })
    };
    let lookup = |key: &str| Expression::index(ident("h"), Expression::string(key));

    let result = run_ok(vec![
        Statement::let_("h", Expression::Hash(vec![(Expression::string("a"), int(1))])),
        assign("a", 2),
        assign("b", 3),
        Statement::expr(infix(lookup("a"), InfixOperator::Add, lookup("b"))),
    ]);
    assert_eq!(result, Value::Integer(5));
}

// ============================================================================
// Functions and closures
// ============================================================================

fn fib_declaration() -> Statement {
    let n = || ident("n");
    Statement::function(
        "fib",
        vec![int_param("n")],
        Some(Type::Int),
        block(vec![
            Statement::expr(Expression::if_else(
                infix(n(), InfixOperator::LessThan, int(2)),
                block(vec![Statement::ret(n())]),
                None,
            )),
            Statement::ret(infix(
                Expression::call(ident("fib"), vec![infix(n(), InfixOperator::Subtract, int(1))]),
                InfixOperator::Add,
                Expression::call(ident("fib"), vec![infix(n(), InfixOperator::Subtract, int(2))]),
            )),
        ]),
    )
}

#[test]
fn test_recursive_fibonacci() {
    let result = run_ok(vec![
        fib_declaration(),
        Statement::expr(Expression::call(ident("fib"), vec![int(10)])),
    ]);
    assert_eq!(result, Value::Integer(55));
}

#[test]
fn test_functions_without_return_value() {
    let result = run_ok(vec![
        Statement::let_("noop", Expression::function(vec![], None, block(vec![]))),
        Statement::expr(Expression::call(ident("noop"), vec![])),
    ]);
    assert_eq!(result, Value::Null);
}

#[test]
fn test_closures() {
    let adder = Expression::function(
        vec![int_param("a")],
        None,
        block(vec![Statement::expr(Expression::function(
            vec![int_param("b")],
            None,
            block(vec![Statement::expr(infix(ident("a"), InfixOperator::Add, ident("b")))]),
        ))]),
    );
    let result = run_ok(vec![
        Statement::let_("newAdder", adder),
        Statement::let_("addTwo", Expression::call(ident("newAdder"), vec![int(2)])),
        Statement::expr(Expression::call(ident("addTwo"), vec![int(3)])),
    ]);
    assert_eq!(result, Value::Integer(5));
}

#[test]
fn test_closures_capture_by_value() {
    let body = block(vec![
        Statement::let_("x", int(1)),
        Statement::let_(
            "g",
            Expression::function(vec![], None, block(vec![Statement::expr(ident("x"))])),
        ),
        Statement::assign("x", int(2)),
        Statement::expr(Expression::call(ident("g"), vec![])),
    ]);
    let result = run_ok(vec![
        Statement::let_("f", Expression::function(vec![], None, body)),
        Statement::expr(Expression::call(ident("f"), vec![])),
    ]);
    assert_eq!(result, Value::Integer(1));
}

#[test]
fn test_closure_keeps_captured_value_after_global_reassignment() {
    let maker = Expression::function(
        vec![],
        None,
        block(vec![
            Statement::let_("x", int(10)),
            Statement::expr(Expression::function(
                vec![],
                None,
                block(vec![Statement::expr(ident("x"))]),
            )),
        ]),
    );
    let result = run_ok(vec![
        Statement::let_("x", int(1)),
        Statement::let_("maker", maker),
        Statement::let_("g", Expression::call(ident("maker"), vec![])),
        Statement::assign("x", int(99)),
        Statement::expr(Expression::call(ident("g"), vec![])),
    ]);
    assert_eq!(result, Value::Integer(10));
}

#[test]
fn test_local_function_calls_earlier_sibling() {
    let outer_body = block(vec![
        Statement::function("b", vec![], Some(Type::Int), block(vec![Statement::ret(int(1))])),
        Statement::function(
            "a",
            vec![],
            Some(Type::Int),
            block(vec![Statement::ret(Expression::call(ident("b"), vec![]))]),
        ),
        Statement::expr(Expression::call(ident("a"), vec![])),
    ]);
    let result = run_ok(vec![
        Statement::function("outer", vec![], Some(Type::Int), outer_body),
        Statement::expr(Expression::call(ident("outer"), vec![])),
    ]);
    assert_eq!(result, Value::Integer(1));
}

#[test]
fn test_unassigned_locals_start_null() {
    // `helper` leaves 666 in the slot that `outer` later uses for `y`.
    let helper = Statement::function(
        "helper",
        vec![],
        Some(Type::Int),
        block(vec![Statement::let_("t", int(666)), Statement::expr(ident("t"))]),
    );
    let outer = Statement::function(
        "outer",
        vec![],
        None,
        block(vec![
            Statement::expr(Expression::if_else(
                Expression::Boolean(false),
                block(vec![Statement::let_("y", int(5))]),
                None,
            )),
            Statement::expr(ident("y")),
        ]),
    );
    let result = run_ok(vec![
        helper,
        outer,
        Statement::expr(Expression::call(ident("helper"), vec![])),
        Statement::expr(Expression::call(ident("outer"), vec![])),
    ]);
    assert_eq!(result, Value::Null);
}

#[test]
fn test_recursive_closure_inside_function() {
    let count_down = Expression::function(
        vec![int_param("x")],
        None,
        block(vec![
            Statement::expr(Expression::if_else(
                infix(ident("x"), InfixOperator::Equal, int(0)),
                block(vec![Statement::ret(int(0))]),
                None,
            )),
            Statement::expr(Expression::call(
                ident("countDown"),
                vec![infix(ident("x"), InfixOperator::Subtract, int(1))],
            )),
        ]),
    );
    let wrapper = Expression::function(
        vec![],
        None,
        block(vec![
            Statement::let_("countDown", count_down),
            Statement::expr(Expression::call(ident("countDown"), vec![int(3)])),
        ]),
    );
    let result = run_ok(vec![
        Statement::let_("wrapper", wrapper),
        Statement::expr(Expression::call(ident("wrapper"), vec![])),
    ]);
    assert_eq!(result, Value::Integer(0));
}

#[test]
fn test_wrong_argument_count() {
    let call = Expression::call(
        Expression::function(vec![], None, block(vec![Statement::expr(int(1))])),
        vec![int(1)],
    );
    let err = run(vec![Statement::expr(call)]).unwrap_err();
    assert_eq!(err, RuntimeError::WrongArgumentCount { expected: 0, actual: 1 });
    assert_eq!(err.to_string(), "wrong number of arguments: want=0, got=1");
}

#[test]
fn test_calling_non_function() {
    let result = run(vec![Statement::expr(Expression::call(int(1), vec![]))]);
    assert_eq!(result, Err(RuntimeError::NotCallable("int")));
}

#[test]
fn test_runaway_recursion_overflows_frames() {
    let config = EngineConfig {
        max_frames: 16,
        ..EngineConfig::default()
    };
    let result = run_with(
        vec![
            Statement::function(
                "forever",
                vec![],
                None,
                block(vec![Statement::expr(Expression::call(ident("forever"), vec![]))]),
            ),
            Statement::expr(Expression::call(ident("forever"), vec![])),
        ],
        &config,
    );
    assert_eq!(result, Err(RuntimeError::FrameOverflow(16)));
}

#[test]
fn test_operand_stack_overflow() {
    let config = EngineConfig {
        stack_size: 8,
        ..EngineConfig::default()
    };
    let elements = (0..10).map(int).collect();
    let result = run_with(vec![Statement::expr(Expression::Array(elements))], &config);
    assert_eq!(result, Err(RuntimeError::StackOverflow));
}

// ============================================================================
// Builtins
// ============================================================================

#[test]
fn test_builtins() {
    let call = |name: &str, args: Vec<Expression>| eval(Expression::call(ident(name), args));
    let array = || Expression::Array(vec![int(1), int(2), int(3)]);

    assert_eq!(call("len", vec![Expression::string("four")]), Value::Integer(4));
    assert_eq!(call("len", vec![array()]), Value::Integer(3));
    assert_eq!(call("first", vec![array()]), Value::Integer(1));
    assert_eq!(call("last", vec![array()]), Value::Integer(3));
    assert_eq!(call("rest", vec![array()]), ints(&[2, 3]));
    assert_eq!(call("first", vec![Expression::Array(vec![])]), Value::Null);
    assert_eq!(call("push", vec![Expression::Array(vec![]), int(1)]), ints(&[1]));
    assert_eq!(call("puts", vec![Expression::string("hello")]), Value::Null);
}

#[test]
fn test_builtin_errors() {
    let err = run(vec![Statement::expr(Expression::call(ident("len"), vec![int(1)]))])
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Builtin {
            name: "len",
            message: "argument to `len` not supported, got int".to_string(),
        }
    );
}

#[test]
fn test_builtin_call_leaves_stack_balanced() {
    // Each builtin call must consume its callee and arguments exactly.
    let result = run_ok(vec![
        Statement::let_("a", Expression::call(ident("len"), vec![Expression::string("ab")])),
        Statement::let_("b", Expression::call(ident("len"), vec![Expression::string("abc")])),
        Statement::expr(infix(ident("a"), InfixOperator::Add, ident("b"))),
    ]);
    assert_eq!(result, Value::Integer(5));
}

// ============================================================================
// Structs
// ============================================================================

#[test]
fn test_struct_literal_and_selector() {
    let result = run_ok(vec![
        Statement::Struct(point_type()),
        Statement::expr(Expression::selector(
            Expression::struct_literal("Point", vec![("y", int(2)), ("x", int(1))]),
            "x",
        )),
    ]);
    assert_eq!(result, Value::Integer(1));
}

#[test]
fn test_struct_field_assignment_and_zero_fill() {
    let result = run_ok(vec![
        Statement::Struct(point_type()),
        Statement::let_("p", Expression::struct_literal("Point", vec![("x", int(4))])),
        Statement::FieldAssignment(FieldAssignment {
            object: ident("p"),
            field: "x".to_string(),
            value: int(7),
            struct_type: None,
        }),
        Statement::expr(Expression::Array(vec![
            Expression::selector(ident("p"), "x"),
            Expression::selector(ident("p"), "y"),
        ])),
    ]);
    assert_eq!(result, ints(&[7, 0]));
}

#[test]
fn test_field_access_on_non_struct_value() {
    let selector = Expression::Selector {
        object: Box::new(int(1)),
        field: "x".to_string(),
        struct_type: Some(point_type()),
    };
    let result = run(vec![Statement::Struct(point_type()), Statement::expr(selector)]);
    assert_eq!(result, Err(RuntimeError::NotAStruct("int")));
}

// ============================================================================
// Globals and malformed bytecode
// ============================================================================

#[test]
fn test_globals_survive_between_runs() {
    let mut compiler = crate::compiler::Compiler::new();
    let first = compiler
        .compile(&Program::new(vec![Statement::let_("a", int(40))]))
        .unwrap();
    let config = EngineConfig::default();
    let mut vm = VM::with_config(first, &config);
    vm.run().unwrap();
    let globals = vm.into_globals();

    let second = compiler
        .compile(&Program::new(vec![Statement::expr(infix(
            ident("a"),
            InfixOperator::Add,
            int(2),
        ))]))
        .unwrap();
    let mut vm = VM::with_globals(second, globals, &config);
    vm.run().unwrap();
    assert_eq!(vm.last_popped_stack_elem(), Value::Integer(42));
}

#[test]
fn test_unknown_opcode_is_an_error() {
    let bytecode = Bytecode {
        instructions: vec![255u8].into(),
        constants: vec![],
    };
    let mut vm = VM::new(bytecode);
    assert_eq!(
        vm.run(),
        Err(RuntimeError::Decode(crate::error::EncodeError::UnknownOpcode(255)))
    );
}
