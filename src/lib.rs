//! Ceres: a native code generation backend for a small struct language.
//!
//! The front-end hands over resolved declarations (`decl::Program`); the
//! backend plans struct layouts, lowers function bodies and the generated
//! per-struct symbol families to Cranelift IR, and either finalizes them in
//! process (JIT, every symbol invocable through a function pointer) or emits
//! a relocatable object for an external link step.

pub mod abi;
pub mod codegen;
pub mod config;
pub mod decl;
pub mod diagnostics;
pub mod env;
pub mod layout;
pub mod runtime;

use std::collections::HashMap;

use cranelift_jit::JITModule;
use cranelift_module::FuncId;

use config::BuildConfig;
use decl::Program;
use diagnostics::CompileError;
use env::ModuleEnv;

/// Compile declarations for the host machine and finalize them in process.
pub fn compile(program: &Program) -> Result<CompiledProgram, CompileError> {
    let env = ModuleEnv::build(program)?;
    let (module, func_ids) = codegen::codegen_jit(program, &env)?;
    Ok(CompiledProgram { module: Some(module), func_ids })
}

/// Compile declarations to relocatable object bytes. The `__ceres_*`
/// runtime symbols stay imports; this crate exports them with C linkage for
/// embedders that link against it.
pub fn emit_object(program: &Program, config: &BuildConfig) -> Result<Vec<u8>, CompileError> {
    let env = ModuleEnv::build(program)?;
    codegen::codegen_object(program, &env, config)
}

/// Run the full generation pipeline for validation only.
pub fn check(program: &Program) -> Result<(), CompileError> {
    emit_object(program, &BuildConfig::default()).map(|_| ())
}

/// A finalized compilation holding executable memory for every generated
/// symbol.
pub struct CompiledProgram {
    module: Option<JITModule>,
    func_ids: HashMap<String, FuncId>,
}

impl CompiledProgram {
    /// Pointer to a finalized symbol, or None for an unknown name.
    ///
    /// The pointer stays valid until `self` is dropped; transmute it to the
    /// matching `extern "C" fn` type to invoke it.
    pub fn symbol(&self, name: &str) -> Option<*const u8> {
        let module = self.module.as_ref()?;
        self.func_ids
            .get(name)
            .map(|id| module.get_finalized_function(*id))
    }

    /// Names of every symbol this compilation defined.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.func_ids.keys().map(String::as_str)
    }
}

impl Drop for CompiledProgram {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // SAFETY: every pointer handed out by `symbol` is documented to
            // die with `self`; nothing outlives this call.
            unsafe { module.free_memory() };
        }
    }
}
