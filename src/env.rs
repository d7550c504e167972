//! Module-wide lookup tables built before any lowering starts.
//!
//! `ModuleEnv` holds the planned layout of every struct and the signature of
//! every callable symbol the compilation will produce: declared functions
//! plus the generated families each struct contributes (constructor,
//! per-field accessor/mutator, stringifier, destructor). Call sites are
//! checked against this table during lowering.

use std::collections::{HashMap, HashSet};

use crate::decl::{Program, Ty};
use crate::diagnostics::CompileError;
use crate::layout::{self, StructLayout};

/// Signature of one callable symbol.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<Ty>,
    pub ret: Option<Ty>,
}

pub struct ModuleEnv {
    pub layouts: HashMap<String, StructLayout>,
    /// Struct names in declaration order, for deterministic emission.
    pub struct_order: Vec<String>,
    /// Every symbol the module defines, declared and generated alike.
    pub fns: HashMap<String, FnSig>,
}

pub fn constructor_name(strukt: &str) -> String {
    format!("{strukt}_new")
}

pub fn getter_name(strukt: &str, field: &str) -> String {
    format!("{strukt}_get_{field}")
}

pub fn setter_name(strukt: &str, field: &str) -> String {
    format!("{strukt}_set_{field}")
}

pub fn to_string_name(strukt: &str) -> String {
    format!("{strukt}_to_string")
}

pub fn drop_name(strukt: &str) -> String {
    format!("{strukt}_drop")
}

impl ModuleEnv {
    pub fn build(program: &Program) -> Result<Self, CompileError> {
        let mut struct_names: HashSet<String> = HashSet::new();
        for st in &program.structs {
            if !struct_names.insert(st.name.clone()) {
                return Err(CompileError::invalid_layout(
                    &st.name,
                    "struct declared more than once",
                ));
            }
        }

        let mut layouts = HashMap::new();
        let mut struct_order = Vec::with_capacity(program.structs.len());
        for st in &program.structs {
            layouts.insert(st.name.clone(), layout::plan(st, &struct_names)?);
            struct_order.push(st.name.clone());
        }

        let mut fns: HashMap<String, FnSig> = HashMap::new();
        let mut record = |name: String, sig: FnSig| -> Result<(), CompileError> {
            if fns.insert(name.clone(), sig).is_some() {
                return Err(CompileError::codegen(format!(
                    "symbol '{name}' defined more than once"
                )));
            }
            Ok(())
        };

        for st in &program.structs {
            let this = Ty::Struct(st.name.clone());
            let field_tys: Vec<Ty> = st.fields.iter().map(|f| f.ty.clone()).collect();
            record(
                constructor_name(&st.name),
                FnSig { params: field_tys, ret: Some(this.clone()) },
            )?;
            for field in &st.fields {
                record(
                    getter_name(&st.name, &field.name),
                    FnSig { params: vec![this.clone()], ret: Some(field.ty.clone()) },
                )?;
                record(
                    setter_name(&st.name, &field.name),
                    FnSig { params: vec![this.clone(), field.ty.clone()], ret: None },
                )?;
            }
            record(
                to_string_name(&st.name),
                FnSig { params: vec![this.clone()], ret: Some(Ty::Text) },
            )?;
            record(drop_name(&st.name), FnSig { params: vec![this], ret: None })?;
        }

        for func in &program.functions {
            record(
                func.name.clone(),
                FnSig {
                    params: func.params.iter().map(|p| p.ty.clone()).collect(),
                    ret: func.return_ty.clone(),
                },
            )?;
        }

        Ok(ModuleEnv { layouts, struct_order, fns })
    }

    pub fn layout(&self, strukt: &str) -> Result<&StructLayout, CompileError> {
        self.layouts
            .get(strukt)
            .ok_or_else(|| CompileError::codegen(format!("unknown struct '{strukt}'")))
    }
}
