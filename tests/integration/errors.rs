mod common;

use ceres::decl::{BinOp, Program, Stmt, Ty, UnOp};
use ceres::diagnostics::CompileError;
use common::*;

fn check_err(program: Program) -> CompileError {
    ceres::check(&program).expect_err("declarations should be rejected")
}

fn two_int_fn(name: &str) -> ceres::decl::FnDecl {
    fn_decl(name, int_params(&["a", "b"]), Some(Ty::Int), vec![ret(add(var("a"), var("b")))])
}

#[test]
fn call_with_wrong_arity() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![
            two_int_fn("add2"),
            fn_decl("f", vec![], Some(Ty::Int), vec![ret(call("add2", vec![int(1)]))]),
        ],
    });
    match err {
        CompileError::ArityMismatch { callee, expected, found, function } => {
            assert_eq!(callee, "add2");
            assert_eq!(expected, 2);
            assert_eq!(found, 1);
            assert_eq!(function, "f");
        }
        other => panic!("expected ArityMismatch, got {other}"),
    }
}

#[test]
fn constructor_call_with_wrong_arity() {
    let err = check_err(Program {
        structs: vec![struct_def("OneField", &[("num", Ty::Int)])],
        functions: vec![fn_decl(
            "f",
            vec![],
            Some(Ty::Struct("OneField".to_string())),
            vec![ret(new("OneField", vec![]))],
        )],
    });
    assert!(matches!(err, CompileError::ArityMismatch { expected: 1, found: 0, .. }));
}

#[test]
fn call_with_wrong_argument_type() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![
            two_int_fn("add2"),
            fn_decl(
                "f",
                vec![],
                Some(Ty::Int),
                vec![ret(call("add2", vec![int(1), float(2.0)]))],
            ),
        ],
    });
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
}

#[test]
fn constructor_call_with_wrong_argument_type() {
    let err = check_err(Program {
        structs: vec![struct_def("OneField", &[("num", Ty::Int)])],
        functions: vec![fn_decl(
            "f",
            vec![],
            Some(Ty::Struct("OneField".to_string())),
            vec![ret(new("OneField", vec![boolean(true)]))],
        )],
    });
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
}

#[test]
fn return_type_disagreement() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![fn_decl("f", vec![], Some(Ty::Int), vec![ret(float(1.5))])],
    });
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
}

#[test]
fn missing_return_in_a_value_function() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![fn_decl("f", vec![], Some(Ty::Int), vec![])],
    });
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
}

#[test]
fn let_annotation_disagreement() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![fn_decl(
            "f",
            vec![],
            Some(Ty::Int),
            vec![
                Stmt::Let {
                    name: "x".to_string(),
                    ty: Some(Ty::Float),
                    value: int(1),
                },
                ret(var("x")),
            ],
        )],
    });
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
}

#[test]
fn mixed_operand_types_are_a_type_mismatch() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![fn_decl(
            "f",
            vec![param("a", Ty::Int), param("x", Ty::Float)],
            Some(Ty::Int),
            vec![ret(add(var("a"), var("x")))],
        )],
    });
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
}

#[test]
fn remainder_on_floats_is_unsupported() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![fn_decl(
            "f",
            vec![param("a", Ty::Float), param("b", Ty::Float)],
            Some(Ty::Float),
            vec![ret(bin(BinOp::Rem, var("a"), var("b")))],
        )],
    });
    assert!(matches!(err, CompileError::UnsupportedOperation { .. }));
}

#[test]
fn arithmetic_on_bools_is_unsupported() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![fn_decl(
            "f",
            vec![param("a", Ty::Bool), param("b", Ty::Bool)],
            Some(Ty::Bool),
            vec![ret(add(var("a"), var("b")))],
        )],
    });
    assert!(matches!(err, CompileError::UnsupportedOperation { .. }));
}

#[test]
fn logical_not_on_ints_is_unsupported() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![fn_decl(
            "f",
            int_params(&["a"]),
            Some(Ty::Int),
            vec![ret(un(UnOp::Not, var("a")))],
        )],
    });
    assert!(matches!(err, CompileError::UnsupportedOperation { .. }));
}

#[test]
fn duplicate_field_is_invalid_layout() {
    let err = check_err(Program {
        structs: vec![struct_def("Dup", &[("x", Ty::Int), ("x", Ty::Bool)])],
        functions: vec![],
    });
    match err {
        CompileError::InvalidLayout { strukt, .. } => assert_eq!(strukt, "Dup"),
        other => panic!("expected InvalidLayout, got {other}"),
    }
}

#[test]
fn unknown_reference_target_is_invalid_layout() {
    let err = check_err(Program {
        structs: vec![struct_def("Holder", &[("other", Ty::Struct("Missing".to_string()))])],
        functions: vec![],
    });
    assert!(matches!(err, CompileError::InvalidLayout { .. }));
}

#[test]
fn duplicate_struct_is_invalid_layout() {
    let err = check_err(Program {
        structs: vec![struct_def("Twice", &[]), struct_def("Twice", &[])],
        functions: vec![],
    });
    assert!(matches!(err, CompileError::InvalidLayout { .. }));
}

#[test]
fn unknown_callee_is_a_codegen_error() {
    let err = check_err(Program {
        structs: vec![],
        functions: vec![fn_decl("f", vec![], Some(Ty::Int), vec![ret(call("nope", vec![]))])],
    });
    assert!(matches!(err, CompileError::Codegen { .. }));
}

#[test]
fn unknown_field_in_assignment() {
    let err = check_err(Program {
        structs: vec![struct_def("OneField", &[("num", Ty::Int)])],
        functions: vec![fn_decl(
            "f",
            vec![param("obj", Ty::Struct("OneField".to_string()))],
            None,
            vec![set_field(var("obj"), "missing", int(1))],
        )],
    });
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
}

#[test]
fn field_type_disagreement_in_assignment() {
    let err = check_err(Program {
        structs: vec![struct_def("OneField", &[("num", Ty::Int)])],
        functions: vec![fn_decl(
            "f",
            vec![param("obj", Ty::Struct("OneField".to_string()))],
            None,
            vec![set_field(var("obj"), "num", float(1.5))],
        )],
    });
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
}
