mod common;

use std::process::Command;

use ceres::decl::{Program, Ty};
use common::*;

fn ceresc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ceresc"))
}

fn sample_program() -> Program {
    Program {
        structs: vec![struct_def("Point", &[("x", Ty::Int), ("y", Ty::Int)])],
        functions: vec![fn_decl(
            "manhattan",
            int_params(&["x", "y"]),
            Some(Ty::Int),
            vec![ret(add(var("x"), var("y")))],
        )],
    }
}

#[test]
fn build_emits_an_object_file() {
    let dir = tempfile::tempdir().unwrap();
    let decls_path = dir.path().join("decls.json");
    let obj_path = dir.path().join("out.o");

    std::fs::write(&decls_path, serde_json::to_string(&sample_program()).unwrap()).unwrap();

    let output = ceresc()
        .arg("build")
        .arg(&decls_path)
        .arg("-o")
        .arg(&obj_path)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let bytes = std::fs::read(&obj_path).unwrap();
    assert!(!bytes.is_empty());
}

#[test]
fn build_honors_a_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let decls_path = dir.path().join("decls.json");
    let config_path = dir.path().join("ceres.toml");
    let obj_path = dir.path().join("out.o");

    std::fs::write(&decls_path, serde_json::to_string(&sample_program()).unwrap()).unwrap();
    std::fs::write(&config_path, "opt_level = \"speed\"\nverify = true\n").unwrap();

    let output = ceresc()
        .arg("build")
        .arg(&decls_path)
        .arg("-o")
        .arg(&obj_path)
        .arg("--config")
        .arg(&config_path)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(obj_path.exists());
}

#[test]
fn check_accepts_valid_declarations() {
    let dir = tempfile::tempdir().unwrap();
    let decls_path = dir.path().join("decls.json");
    std::fs::write(&decls_path, serde_json::to_string(&sample_program()).unwrap()).unwrap();

    let output = ceresc().arg("check").arg(&decls_path).output().unwrap();
    assert!(output.status.success());
}

#[test]
fn check_reports_generation_time_errors() {
    let mut program = sample_program();
    program.functions.push(fn_decl(
        "broken",
        vec![],
        Some(Ty::Int),
        vec![ret(call("manhattan", vec![int(1)]))],
    ));

    let dir = tempfile::tempdir().unwrap();
    let decls_path = dir.path().join("decls.json");
    std::fs::write(&decls_path, serde_json::to_string(&program).unwrap()).unwrap();

    let output = ceresc().arg("check").arg(&decls_path).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("arity mismatch"), "unexpected stderr: {stderr}");
}

#[test]
fn unreadable_declaration_file_is_a_config_error() {
    let output = ceresc().arg("check").arg("no-such-file.json").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config error"), "unexpected stderr: {stderr}");
}
