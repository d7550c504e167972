//! Calling-convention mapping for declared signatures.
//!
//! Every signature in a compilation — declared functions, generated struct
//! symbols, runtime imports, and each call site — is built here, so caller
//! and callee can never disagree on argument slots. Integers, booleans, and
//! references travel in the integer argument class (a bool consumes an
//! integer-class slot exactly like an int); doubles travel in the floating
//! class. Arguments beyond a class's register budget spill to the stack in
//! declared order; the per-slot assignment is the target ABI's, driven by the
//! ordered parameter list produced here.

use cranelift_codegen::ir::{types, AbiParam, Signature};
use cranelift_module::Module;

use crate::decl::Ty;

/// Register class a value travels in at the native boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgClass {
    Int,
    Float,
}

pub fn class_of(ty: &Ty) -> ArgClass {
    match ty {
        Ty::Float => ArgClass::Float,
        Ty::Int | Ty::Bool | Ty::Text | Ty::Struct(_) => ArgClass::Int,
    }
}

/// Machine-level value type for a declared type.
pub fn value_type(ty: &Ty) -> types::Type {
    match ty {
        Ty::Int => types::I64,
        Ty::Bool => types::I8,
        Ty::Float => types::F64,
        Ty::Text => types::I64,      // pointer
        Ty::Struct(_) => types::I64, // pointer
    }
}

/// Build the native signature for an ordered parameter list and optional
/// return type.
pub fn signature(module: &dyn Module, params: &[Ty], ret: Option<&Ty>) -> Signature {
    let mut sig = module.make_signature();
    for ty in params {
        sig.params.push(AbiParam::new(value_type(ty)));
    }
    if let Some(ty) = ret {
        sig.returns.push(AbiParam::new(value_type(ty)));
    }
    sig
}
