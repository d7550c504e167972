#![allow(dead_code)]

use ceres::decl::{
    BinOp, Expr, FieldDef, FnDecl, Param, Program, Stmt, StructDef, Ty, UnOp,
};
use ceres::CompiledProgram;

pub fn compile(program: Program) -> CompiledProgram {
    ceres::compile(&program).expect("declarations should compile")
}

/// Transmute a finalized symbol to its `extern "C" fn` type.
macro_rules! sym {
    ($prog:expr, $name:expr, $t:ty) => {
        unsafe {
            std::mem::transmute::<*const u8, $t>(
                $prog.symbol($name).expect("symbol should exist"),
            )
        }
    };
}
pub(crate) use sym;

// ── declaration builders ─────────────────────────────────────────────

pub fn struct_def(name: &str, fields: &[(&str, Ty)]) -> StructDef {
    StructDef {
        name: name.to_string(),
        fields: fields
            .iter()
            .map(|(n, t)| FieldDef { name: n.to_string(), ty: t.clone() })
            .collect(),
    }
}

pub fn fn_decl(name: &str, params: Vec<Param>, return_ty: Option<Ty>, body: Vec<Stmt>) -> FnDecl {
    FnDecl { name: name.to_string(), params, return_ty, body }
}

pub fn param(name: &str, ty: Ty) -> Param {
    Param { name: name.to_string(), ty }
}

pub fn int_params(names: &[&str]) -> Vec<Param> {
    names.iter().map(|n| param(n, Ty::Int)).collect()
}

// ── expression builders ──────────────────────────────────────────────

pub fn int(v: i64) -> Expr {
    Expr::Int(v)
}

pub fn float(v: f64) -> Expr {
    Expr::Float(v)
}

pub fn boolean(v: bool) -> Expr {
    Expr::Bool(v)
}

pub fn text(s: &str) -> Expr {
    Expr::Text(s.to_string())
}

pub fn var(name: &str) -> Expr {
    Expr::Var(name.to_string())
}

pub fn un(op: UnOp, operand: Expr) -> Expr {
    Expr::Unary { op, operand: Box::new(operand) }
}

pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
}

pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinOp::Add, lhs, rhs)
}

pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinOp::Sub, lhs, rhs)
}

pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinOp::Mul, lhs, rhs)
}

pub fn div(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinOp::Div, lhs, rhs)
}

pub fn rem(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinOp::Rem, lhs, rhs)
}

pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call { name: name.to_string(), args }
}

pub fn new(strukt: &str, args: Vec<Expr>) -> Expr {
    Expr::New { strukt: strukt.to_string(), args }
}

pub fn get(object: Expr, field: &str) -> Expr {
    Expr::Field { object: Box::new(object), field: field.to_string() }
}

// ── statement builders ───────────────────────────────────────────────

pub fn let_(name: &str, value: Expr) -> Stmt {
    Stmt::Let { name: name.to_string(), ty: None, value }
}

pub fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assign { name: name.to_string(), value }
}

pub fn set_field(object: Expr, field: &str, value: Expr) -> Stmt {
    Stmt::SetField { object, field: field.to_string(), value }
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(Some(value))
}
