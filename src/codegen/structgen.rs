//! Synthesized per-struct callables.
//!
//! Every struct contributes five symbol families: a constructor, one
//! accessor and one mutator per field, a stringifier, and a destructor.
//! Constructors hand ownership of the fresh instance to the caller;
//! destructors release exactly that allocation and never follow reference
//! fields.

use std::collections::HashMap;

use cranelift_codegen::ir::immediates::Offset32;
use cranelift_codegen::ir::{types, InstBuilder, MemFlags, Value};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_module::{FuncId, Module};

use crate::abi;
use crate::decl::Ty;
use crate::diagnostics::CompileError;
use crate::env::{self, ModuleEnv};
use crate::layout::StructLayout;

use super::lower::{call_runtime, call_runtime_void, data_cstr};
use super::runtime::RuntimeRegistry;

/// Symbol names one struct contributes, in emission order.
pub(super) fn struct_symbols(env: &ModuleEnv, strukt: &str) -> Vec<String> {
    let layout = &env.layouts[strukt];
    let mut symbols = vec![env::constructor_name(strukt)];
    for field in &layout.fields {
        symbols.push(env::getter_name(strukt, &field.name));
        symbols.push(env::setter_name(strukt, &field.name));
    }
    symbols.push(env::to_string_name(strukt));
    symbols.push(env::drop_name(strukt));
    symbols
}

pub(super) fn define_struct_symbols(
    module: &mut dyn Module,
    env: &ModuleEnv,
    func_ids: &HashMap<String, FuncId>,
    runtime: &RuntimeRegistry,
    strukt: &str,
) -> Result<(), CompileError> {
    let layout = env.layout(strukt)?.clone();

    define_constructor(module, env, func_ids, runtime, strukt, &layout)?;
    for field in &layout.fields {
        define_getter(module, env, func_ids, strukt, &layout, &field.name)?;
        define_setter(module, env, func_ids, strukt, &layout, &field.name)?;
    }
    define_to_string(module, env, func_ids, runtime, strukt, &layout)?;
    define_drop(module, env, func_ids, runtime, strukt)?;
    Ok(())
}

/// Start building the body of one generated symbol. Returns the entry
/// block's parameter values.
fn begin<'a>(
    module: &dyn Module,
    env: &ModuleEnv,
    ctx: &'a mut Context,
    builder_ctx: &'a mut FunctionBuilderContext,
    symbol: &str,
) -> Result<(FunctionBuilder<'a>, Vec<Value>), CompileError> {
    let sig = env
        .fns
        .get(symbol)
        .ok_or_else(|| CompileError::codegen(format!("missing signature for '{symbol}'")))?;
    ctx.func.signature = abi::signature(module, &sig.params, sig.ret.as_ref());

    let mut builder = FunctionBuilder::new(&mut ctx.func, builder_ctx);
    let entry_block = builder.create_block();
    builder.append_block_params_for_function_params(entry_block);
    builder.switch_to_block(entry_block);
    builder.seal_block(entry_block);
    let params = builder.block_params(entry_block).to_vec();
    Ok((builder, params))
}

fn finish(
    module: &mut dyn Module,
    func_ids: &HashMap<String, FuncId>,
    ctx: &mut Context,
    symbol: &str,
) -> Result<(), CompileError> {
    module
        .define_function(func_ids[symbol], ctx)
        .map_err(|e| CompileError::codegen(format!("define '{symbol}' error: {e}")))
}

/// `{Name}_new`: allocate the planned size and initialize every field from
/// the positional arguments, in field order. One allocation; the caller
/// owns the result.
fn define_constructor(
    module: &mut dyn Module,
    env: &ModuleEnv,
    func_ids: &HashMap<String, FuncId>,
    runtime: &RuntimeRegistry,
    strukt: &str,
    layout: &StructLayout,
) -> Result<(), CompileError> {
    let symbol = env::constructor_name(strukt);
    let mut ctx = Context::new();
    let mut builder_ctx = FunctionBuilderContext::new();
    {
        let (mut builder, params) = begin(module, env, &mut ctx, &mut builder_ctx, &symbol)?;
        let size_val = builder.ins().iconst(types::I64, layout.size as i64);
        let ptr = call_runtime(module, &mut builder, runtime, "__ceres_alloc", &[size_val]);
        for (idx, field) in layout.fields.iter().enumerate() {
            builder.ins().store(
                MemFlags::new(),
                params[idx],
                ptr,
                Offset32::new(field.offset as i32),
            );
        }
        builder.ins().return_(&[ptr]);
        builder.finalize();
    }
    finish(module, func_ids, &mut ctx, &symbol)
}

/// `{Name}_get_{field}`: read the value at the field's offset. For a
/// reference field this is the reference itself, not the referenced
/// instance's contents.
fn define_getter(
    module: &mut dyn Module,
    env: &ModuleEnv,
    func_ids: &HashMap<String, FuncId>,
    strukt: &str,
    layout: &StructLayout,
    field: &str,
) -> Result<(), CompileError> {
    let symbol = env::getter_name(strukt, field);
    let slot = layout
        .field(field)
        .ok_or_else(|| CompileError::codegen(format!("missing field layout for '{symbol}'")))?;
    let mut ctx = Context::new();
    let mut builder_ctx = FunctionBuilderContext::new();
    {
        let (mut builder, params) = begin(module, env, &mut ctx, &mut builder_ctx, &symbol)?;
        let val = builder.ins().load(
            abi::value_type(&slot.ty),
            MemFlags::new(),
            params[0],
            Offset32::new(slot.offset as i32),
        );
        builder.ins().return_(&[val]);
        builder.finalize();
    }
    finish(module, func_ids, &mut ctx, &symbol)
}

/// `{Name}_set_{field}`: write the value at the field's offset. Field state
/// changes; instance identity never does.
fn define_setter(
    module: &mut dyn Module,
    env: &ModuleEnv,
    func_ids: &HashMap<String, FuncId>,
    strukt: &str,
    layout: &StructLayout,
    field: &str,
) -> Result<(), CompileError> {
    let symbol = env::setter_name(strukt, field);
    let slot = layout
        .field(field)
        .ok_or_else(|| CompileError::codegen(format!("missing field layout for '{symbol}'")))?;
    let mut ctx = Context::new();
    let mut builder_ctx = FunctionBuilderContext::new();
    {
        let (mut builder, params) = begin(module, env, &mut ctx, &mut builder_ctx, &symbol)?;
        builder.ins().store(
            MemFlags::new(),
            params[1],
            params[0],
            Offset32::new(slot.offset as i32),
        );
        builder.ins().return_(&[]);
        builder.finalize();
    }
    finish(module, func_ids, &mut ctx, &symbol)
}

/// `{Name}_to_string`: render `Name(field1, field2, ...)` in declaration
/// order. Reference fields delegate to the referenced struct's own
/// stringifier; the temporary rendering is released right after it is
/// appended. The final buffer is owned by the caller.
fn define_to_string(
    module: &mut dyn Module,
    env: &ModuleEnv,
    func_ids: &HashMap<String, FuncId>,
    runtime: &RuntimeRegistry,
    strukt: &str,
    layout: &StructLayout,
) -> Result<(), CompileError> {
    let symbol = env::to_string_name(strukt);
    let mut ctx = Context::new();
    let mut builder_ctx = FunctionBuilderContext::new();
    {
        let (mut builder, params) = begin(module, env, &mut ctx, &mut builder_ctx, &symbol)?;
        let this = params[0];
        let sb = call_runtime(module, &mut builder, runtime, "__ceres_sb_new", &[]);
        push_literal(module, &mut builder, runtime, sb, &format!("{strukt}("))?;

        for (idx, field) in layout.fields.iter().enumerate() {
            if idx > 0 {
                push_literal(module, &mut builder, runtime, sb, ", ")?;
            }
            let val = builder.ins().load(
                abi::value_type(&field.ty),
                MemFlags::new(),
                this,
                Offset32::new(field.offset as i32),
            );
            match &field.ty {
                Ty::Int => {
                    call_runtime_void(module, &mut builder, runtime, "__ceres_sb_push_int", &[sb, val]);
                }
                Ty::Float => {
                    call_runtime_void(module, &mut builder, runtime, "__ceres_sb_push_float", &[sb, val]);
                }
                Ty::Bool => {
                    call_runtime_void(module, &mut builder, runtime, "__ceres_sb_push_bool", &[sb, val]);
                }
                Ty::Text => {
                    call_runtime_void(module, &mut builder, runtime, "__ceres_sb_push_cstr", &[sb, val]);
                }
                Ty::Struct(inner) => {
                    let callee = func_ids
                        .get(&env::to_string_name(inner))
                        .copied()
                        .ok_or_else(|| {
                            CompileError::codegen(format!(
                                "no stringifier declared for struct '{inner}'"
                            ))
                        })?;
                    let func_ref = module.declare_func_in_func(callee, builder.func);
                    let call = builder.ins().call(func_ref, &[val]);
                    let rendered = builder.inst_results(call)[0];
                    call_runtime_void(
                        module,
                        &mut builder,
                        runtime,
                        "__ceres_sb_push_cstr",
                        &[sb, rendered],
                    );
                    call_runtime_void(module, &mut builder, runtime, "__ceres_free", &[rendered]);
                }
            }
        }

        push_literal(module, &mut builder, runtime, sb, ")")?;
        let out = call_runtime(module, &mut builder, runtime, "__ceres_sb_finish", &[sb]);
        builder.ins().return_(&[out]);
        builder.finalize();
    }
    finish(module, func_ids, &mut ctx, &symbol)
}

/// `{Name}_drop`: release exactly the instance's own allocation. Reference
/// fields stay owned by whoever constructed them.
fn define_drop(
    module: &mut dyn Module,
    env: &ModuleEnv,
    func_ids: &HashMap<String, FuncId>,
    runtime: &RuntimeRegistry,
    strukt: &str,
) -> Result<(), CompileError> {
    let symbol = env::drop_name(strukt);
    let mut ctx = Context::new();
    let mut builder_ctx = FunctionBuilderContext::new();
    {
        let (mut builder, params) = begin(module, env, &mut ctx, &mut builder_ctx, &symbol)?;
        call_runtime_void(module, &mut builder, runtime, "__ceres_free", &[params[0]]);
        builder.ins().return_(&[]);
        builder.finalize();
    }
    finish(module, func_ids, &mut ctx, &symbol)
}

fn push_literal(
    module: &mut dyn Module,
    builder: &mut FunctionBuilder,
    runtime: &RuntimeRegistry,
    sb: Value,
    text: &str,
) -> Result<(), CompileError> {
    let ptr = data_cstr(module, builder, text)?;
    let len = builder.ins().iconst(types::I64, text.len() as i64);
    call_runtime_void(module, builder, runtime, "__ceres_sb_push_bytes", &[sb, ptr, len]);
    Ok(())
}
