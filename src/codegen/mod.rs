pub mod lower;
pub mod runtime;
mod structgen;

use std::collections::HashMap;

use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};
use cranelift_object::{ObjectBuilder, ObjectModule};

use crate::abi;
use crate::config::BuildConfig;
use crate::decl::Program;
use crate::diagnostics::CompileError;
use crate::env::ModuleEnv;
use runtime::RuntimeRegistry;

/// Declare and define every symbol of a compilation in the given module:
/// generated struct families first (struct declaration order), then the
/// declared function bodies. Returns the symbol table.
pub fn compile_into_module(
    module: &mut dyn Module,
    program: &Program,
    env: &ModuleEnv,
) -> Result<HashMap<String, FuncId>, CompileError> {
    let rt = RuntimeRegistry::new(module)?;
    let mut func_ids = HashMap::new();

    // Pass 1: declare all symbols so bodies can reference each other.
    for strukt in &env.struct_order {
        for symbol in structgen::struct_symbols(env, strukt) {
            declare_symbol(module, env, &mut func_ids, &symbol)?;
        }
    }
    for func in &program.functions {
        declare_symbol(module, env, &mut func_ids, &func.name)?;
    }

    // Pass 2: define struct families.
    for strukt in &env.struct_order {
        structgen::define_struct_symbols(module, env, &func_ids, &rt, strukt)?;
    }

    // Pass 2b: define declared function bodies.
    for func in &program.functions {
        let sig = &env.fns[&func.name];
        let mut fn_ctx = Context::new();
        fn_ctx.func.signature = abi::signature(module, &sig.params, sig.ret.as_ref());

        let mut builder_ctx = FunctionBuilderContext::new();
        {
            let builder = FunctionBuilder::new(&mut fn_ctx.func, &mut builder_ctx);
            lower::lower_function(func, builder, env, module, &func_ids)?;
        }

        module
            .define_function(func_ids[&func.name], &mut fn_ctx)
            .map_err(|e| CompileError::codegen(format!("define function error: {e}")))?;
    }

    Ok(func_ids)
}

fn declare_symbol(
    module: &mut dyn Module,
    env: &ModuleEnv,
    func_ids: &mut HashMap<String, FuncId>,
    name: &str,
) -> Result<(), CompileError> {
    let sig = env
        .fns
        .get(name)
        .ok_or_else(|| CompileError::codegen(format!("missing signature for '{name}'")))?;
    let sig = abi::signature(module, &sig.params, sig.ret.as_ref());
    let func_id = module
        .declare_function(name, Linkage::Export, &sig)
        .map_err(|e| CompileError::codegen(format!("declare function error: {e}")))?;
    func_ids.insert(name.to_string(), func_id);
    Ok(())
}

/// JIT path: compile for the host and finalize, leaving every symbol
/// invocable in process. Runtime support functions are resolved against
/// `crate::runtime`.
pub fn codegen_jit(
    program: &Program,
    env: &ModuleEnv,
) -> Result<(JITModule, HashMap<String, FuncId>), CompileError> {
    let mut flag_builder = settings::builder();
    flag_builder.set("use_colocated_libcalls", "false").unwrap();
    flag_builder.set("is_pic", "false").unwrap();
    let isa_builder = cranelift_native::builder()
        .map_err(|e| CompileError::codegen(format!("host machine is not supported: {e}")))?;
    let isa = isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| CompileError::codegen(format!("ISA error: {e}")))?;

    let mut jit_builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
    crate::runtime::register_jit_symbols(&mut jit_builder);

    let mut module = JITModule::new(jit_builder);
    let func_ids = compile_into_module(&mut module, program, env)?;
    module
        .finalize_definitions()
        .map_err(|e| CompileError::codegen(format!("finalize error: {e}")))?;
    Ok((module, func_ids))
}

/// Object path: emit relocatable object bytes. Runtime support functions
/// stay imports for the embedder to link.
pub fn codegen_object(
    program: &Program,
    env: &ModuleEnv,
    config: &BuildConfig,
) -> Result<Vec<u8>, CompileError> {
    let mut flag_builder = settings::builder();
    flag_builder.set("is_pic", "true").unwrap();
    flag_builder
        .set("opt_level", &config.opt_level)
        .map_err(|e| {
            CompileError::codegen(format!("bad opt_level '{}': {e}", config.opt_level))
        })?;
    flag_builder
        .set("enable_verifier", if config.verify { "true" } else { "false" })
        .unwrap();

    let isa_builder = match &config.target {
        Some(triple) => cranelift_codegen::isa::lookup_by_name(triple)
            .map_err(|e| CompileError::codegen(format!("unsupported target: {e}")))?,
        None => cranelift_native::builder()
            .map_err(|e| CompileError::codegen(format!("host machine is not supported: {e}")))?,
    };
    let isa = isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| CompileError::codegen(format!("ISA error: {e}")))?;

    let obj_builder = ObjectBuilder::new(
        isa,
        "ceres_module",
        cranelift_module::default_libcall_names(),
    )
    .map_err(|e| CompileError::codegen(format!("object builder error: {e}")))?;

    let mut module = ObjectModule::new(obj_builder);
    compile_into_module(&mut module, program, env)?;

    let object = module.finish();
    object
        .emit()
        .map_err(|e| CompileError::codegen(format!("emit error: {e}")))
}
