use std::collections::HashMap;

use cranelift_codegen::ir::immediates::Offset32;
use cranelift_codegen::ir::{types, InstBuilder, MemFlags, Value};
use cranelift_frontend::{FunctionBuilder, Variable};
use cranelift_module::{DataDescription, FuncId, Module};

use crate::abi;
use crate::decl::{BinOp, Expr, FnDecl, Stmt, Ty, UnOp};
use crate::diagnostics::CompileError;
use crate::env::{self, ModuleEnv};

use super::runtime::RuntimeRegistry;

struct LowerContext<'a> {
    builder: FunctionBuilder<'a>,
    module: &'a mut dyn Module,
    env: &'a ModuleEnv,
    func_ids: &'a HashMap<String, FuncId>,
    // Per-function mutable state
    variables: HashMap<String, Variable>,
    var_types: HashMap<String, Ty>,
    next_var: u32,
    fn_name: String,
    return_ty: Option<Ty>,
}

/// Lower one declared function body into the builder's function.
/// All call sites are checked against the module signature table here;
/// the generated callable itself has a fixed signature and no checks.
pub fn lower_function(
    func: &FnDecl,
    mut builder: FunctionBuilder<'_>,
    env: &ModuleEnv,
    module: &mut dyn Module,
    func_ids: &HashMap<String, FuncId>,
) -> Result<(), CompileError> {
    let entry_block = builder.create_block();
    builder.append_block_params_for_function_params(entry_block);
    builder.switch_to_block(entry_block);
    builder.seal_block(entry_block);

    let mut ctx = LowerContext {
        builder,
        module,
        env,
        func_ids,
        variables: HashMap::new(),
        var_types: HashMap::new(),
        next_var: 0,
        fn_name: func.name.clone(),
        return_ty: func.return_ty.clone(),
    };

    // Bind parameters as variables
    for (idx, param) in func.params.iter().enumerate() {
        let ty = abi::value_type(&param.ty);
        let var = Variable::from_u32(ctx.next_var);
        ctx.next_var += 1;
        ctx.builder.declare_var(var, ty);
        let val = ctx.builder.block_params(entry_block)[idx];
        ctx.builder.def_var(var, val);
        ctx.variables.insert(param.name.clone(), var);
        ctx.var_types.insert(param.name.clone(), param.ty.clone());
    }

    let mut terminated = false;
    for stmt in &func.body {
        if terminated {
            break;
        }
        ctx.lower_stmt(stmt, &mut terminated)?;
    }
    if !terminated {
        match &ctx.return_ty {
            None => {
                ctx.builder.ins().return_(&[]);
            }
            Some(ty) => {
                return Err(CompileError::type_mismatch(
                    format!("declares return type {ty} but can finish without returning"),
                    &func.name,
                ));
            }
        }
    }

    ctx.builder.finalize();
    Ok(())
}

impl<'a> LowerContext<'a> {
    fn lower_stmt(&mut self, stmt: &Stmt, terminated: &mut bool) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let { name, ty, value } => {
                let value_ty = self.expr_ty(value)?;
                if let Some(annot) = ty
                    && *annot != value_ty
                {
                    return Err(CompileError::type_mismatch(
                        format!("let '{name}' declared as {annot} but initialized with {value_ty}"),
                        &self.fn_name,
                    ));
                }
                let val = self.lower_expr(value)?;
                let var = Variable::from_u32(self.next_var);
                self.next_var += 1;
                self.builder.declare_var(var, abi::value_type(&value_ty));
                self.builder.def_var(var, val);
                self.variables.insert(name.clone(), var);
                self.var_types.insert(name.clone(), value_ty);
                Ok(())
            }
            Stmt::Assign { name, value } => {
                let declared = self.var_types.get(name).cloned().ok_or_else(|| {
                    CompileError::codegen(format!(
                        "undefined variable '{name}' in '{}'",
                        self.fn_name
                    ))
                })?;
                let value_ty = self.expr_ty(value)?;
                if declared != value_ty {
                    return Err(CompileError::type_mismatch(
                        format!("assigning {value_ty} to variable '{name}' of type {declared}"),
                        &self.fn_name,
                    ));
                }
                let val = self.lower_expr(value)?;
                let var = self.variables[name];
                self.builder.def_var(var, val);
                Ok(())
            }
            Stmt::SetField { object, field, value } => {
                let obj_ty = self.expr_ty(object)?;
                let Ty::Struct(strukt) = &obj_ty else {
                    return Err(CompileError::type_mismatch(
                        format!("field assignment on non-struct value of type {obj_ty}"),
                        &self.fn_name,
                    ));
                };
                let (offset, field_ty) = self.field_slot(strukt, field)?;
                let value_ty = self.expr_ty(value)?;
                if value_ty != field_ty {
                    return Err(CompileError::type_mismatch(
                        format!(
                            "assigning {value_ty} to field '{field}' of type {field_ty} on '{strukt}'"
                        ),
                        &self.fn_name,
                    ));
                }
                let ptr = self.lower_expr(object)?;
                let val = self.lower_expr(value)?;
                self.builder
                    .ins()
                    .store(MemFlags::new(), val, ptr, Offset32::new(offset as i32));
                Ok(())
            }
            Stmt::Return(expr) => {
                match (expr, self.return_ty.clone()) {
                    (None, None) => {
                        self.builder.ins().return_(&[]);
                    }
                    (None, Some(ty)) => {
                        return Err(CompileError::type_mismatch(
                            format!("return without a value in a function returning {ty}"),
                            &self.fn_name,
                        ));
                    }
                    (Some(_), None) => {
                        return Err(CompileError::type_mismatch(
                            "return with a value in a function returning nothing".to_string(),
                            &self.fn_name,
                        ));
                    }
                    (Some(e), Some(ty)) => {
                        let found = self.expr_ty(e)?;
                        if found != ty {
                            return Err(CompileError::type_mismatch(
                                format!("returning {found} from a function returning {ty}"),
                                &self.fn_name,
                            ));
                        }
                        let val = self.lower_expr(e)?;
                        self.builder.ins().return_(&[val]);
                    }
                }
                *terminated = true;
                Ok(())
            }
            Stmt::Expr(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<Value, CompileError> {
        match expr {
            Expr::Int(v) => Ok(self.builder.ins().iconst(types::I64, *v)),
            // Literal constants are embedded in the generated code, never
            // computed at call time.
            Expr::Float(v) => Ok(self.builder.ins().f64const(*v)),
            Expr::Bool(b) => Ok(self.builder.ins().iconst(types::I8, i64::from(*b))),
            Expr::Text(s) => data_cstr(self.module, &mut self.builder, s),
            Expr::Var(name) => {
                let var = self.variables.get(name).copied().ok_or_else(|| {
                    CompileError::codegen(format!(
                        "undefined variable '{name}' in '{}'",
                        self.fn_name
                    ))
                })?;
                Ok(self.builder.use_var(var))
            }
            Expr::Unary { op, operand } => {
                let result_ty = self.expr_ty(expr)?;
                let val = self.lower_expr(operand)?;
                Ok(match (op, &result_ty) {
                    (UnOp::Neg, Ty::Float) => self.builder.ins().fneg(val),
                    (UnOp::Neg, _) => self.builder.ins().ineg(val),
                    (UnOp::Not, _) => {
                        let one = self.builder.ins().iconst(types::I8, 1);
                        self.builder.ins().bxor(val, one)
                    }
                })
            }
            Expr::Binary { op, lhs, rhs } => self.lower_binop(*op, lhs, rhs),
            Expr::Call { name, args } => self.lower_call(name, args),
            Expr::New { strukt, args } => {
                if !self.env.layouts.contains_key(strukt) {
                    return Err(CompileError::codegen(format!(
                        "unknown struct '{strukt}' in '{}'",
                        self.fn_name
                    )));
                }
                self.lower_call(&env::constructor_name(strukt), args)
            }
            Expr::Field { object, field } => {
                let obj_ty = self.expr_ty(object)?;
                let Ty::Struct(strukt) = &obj_ty else {
                    return Err(CompileError::type_mismatch(
                        format!("field access on non-struct value of type {obj_ty}"),
                        &self.fn_name,
                    ));
                };
                let (offset, field_ty) = self.field_slot(strukt, field)?;
                let ptr = self.lower_expr(object)?;
                Ok(self.builder.ins().load(
                    abi::value_type(&field_ty),
                    MemFlags::new(),
                    ptr,
                    Offset32::new(offset as i32),
                ))
            }
        }
    }

    /// Operands evaluate left to right; intermediate results feed the next
    /// step through ordinary SSA values, including across call boundaries.
    fn lower_binop(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Value, CompileError> {
        let lhs_ty = self.expr_ty(lhs)?;
        let rhs_ty = self.expr_ty(rhs)?;
        if lhs_ty != rhs_ty {
            return Err(CompileError::type_mismatch(
                format!("operands of '{op}' disagree: {lhs_ty} vs {rhs_ty}"),
                &self.fn_name,
            ));
        }
        let is_float = match lhs_ty {
            Ty::Int => false,
            Ty::Float => true,
            other => {
                return Err(CompileError::unsupported(
                    format!("operator '{op}' on {other} operands"),
                    &self.fn_name,
                ));
            }
        };

        let l = self.lower_expr(lhs)?;
        let r = self.lower_expr(rhs)?;

        let result = match op {
            BinOp::Add if is_float => self.builder.ins().fadd(l, r),
            BinOp::Add => self.builder.ins().iadd(l, r),
            BinOp::Sub if is_float => self.builder.ins().fsub(l, r),
            BinOp::Sub => self.builder.ins().isub(l, r),
            BinOp::Mul if is_float => self.builder.ins().fmul(l, r),
            BinOp::Mul => self.builder.ins().imul(l, r),
            BinOp::Div if is_float => self.builder.ins().fdiv(l, r),
            // Truncating division; remainder sign follows the dividend.
            BinOp::Div => self.builder.ins().sdiv(l, r),
            BinOp::Rem if is_float => {
                return Err(CompileError::unsupported(
                    "operator '%' on float operands".to_string(),
                    &self.fn_name,
                ));
            }
            BinOp::Rem => self.builder.ins().srem(l, r),
        };
        Ok(result)
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) -> Result<Value, CompileError> {
        let sig = self.env.fns.get(name).cloned().ok_or_else(|| {
            CompileError::codegen(format!("undefined function '{name}' in '{}'", self.fn_name))
        })?;
        if sig.params.len() != args.len() {
            return Err(CompileError::ArityMismatch {
                callee: name.to_string(),
                expected: sig.params.len(),
                found: args.len(),
                function: self.fn_name.clone(),
            });
        }

        let mut arg_values = Vec::with_capacity(args.len());
        for (arg, expected) in args.iter().zip(&sig.params) {
            let found = self.expr_ty(arg)?;
            if found != *expected {
                return Err(CompileError::type_mismatch(
                    format!("argument to '{name}' has type {found}, expected {expected}"),
                    &self.fn_name,
                ));
            }
            arg_values.push(self.lower_expr(arg)?);
        }

        let func_id = self.func_ids.get(name).copied().ok_or_else(|| {
            CompileError::codegen(format!("no declared symbol for '{name}'"))
        })?;
        let func_ref = self.module.declare_func_in_func(func_id, self.builder.func);
        let call = self.builder.ins().call(func_ref, &arg_values);
        let results = self.builder.inst_results(call);
        if results.is_empty() {
            Ok(self.builder.ins().iconst(types::I64, 0))
        } else {
            Ok(results[0])
        }
    }

    /// Infer an expression's type, rejecting combinations the backend does
    /// not lower. Pure; emits nothing.
    fn expr_ty(&self, expr: &Expr) -> Result<Ty, CompileError> {
        match expr {
            Expr::Int(_) => Ok(Ty::Int),
            Expr::Float(_) => Ok(Ty::Float),
            Expr::Bool(_) => Ok(Ty::Bool),
            Expr::Text(_) => Ok(Ty::Text),
            Expr::Var(name) => self.var_types.get(name).cloned().ok_or_else(|| {
                CompileError::codegen(format!("undefined variable '{name}' in '{}'", self.fn_name))
            }),
            Expr::Unary { op, operand } => {
                let ty = self.expr_ty(operand)?;
                match (op, &ty) {
                    (UnOp::Neg, Ty::Int | Ty::Float) => Ok(ty),
                    (UnOp::Not, Ty::Bool) => Ok(Ty::Bool),
                    _ => Err(CompileError::unsupported(
                        format!("operator '{op}' on {ty}"),
                        &self.fn_name,
                    )),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs_ty = self.expr_ty(lhs)?;
                let rhs_ty = self.expr_ty(rhs)?;
                if lhs_ty != rhs_ty {
                    return Err(CompileError::type_mismatch(
                        format!("operands of '{op}' disagree: {lhs_ty} vs {rhs_ty}"),
                        &self.fn_name,
                    ));
                }
                match (&lhs_ty, op) {
                    (Ty::Int, _) => Ok(Ty::Int),
                    (Ty::Float, BinOp::Rem) => Err(CompileError::unsupported(
                        "operator '%' on float operands".to_string(),
                        &self.fn_name,
                    )),
                    (Ty::Float, _) => Ok(Ty::Float),
                    _ => Err(CompileError::unsupported(
                        format!("operator '{op}' on {lhs_ty} operands"),
                        &self.fn_name,
                    )),
                }
            }
            Expr::Call { name, .. } => {
                let sig = self.env.fns.get(name).ok_or_else(|| {
                    CompileError::codegen(format!(
                        "undefined function '{name}' in '{}'",
                        self.fn_name
                    ))
                })?;
                sig.ret.clone().ok_or_else(|| {
                    CompileError::type_mismatch(
                        format!("call to '{name}' yields no value"),
                        &self.fn_name,
                    )
                })
            }
            Expr::New { strukt, .. } => {
                if !self.env.layouts.contains_key(strukt) {
                    return Err(CompileError::codegen(format!(
                        "unknown struct '{strukt}' in '{}'",
                        self.fn_name
                    )));
                }
                Ok(Ty::Struct(strukt.clone()))
            }
            Expr::Field { object, field } => {
                let obj_ty = self.expr_ty(object)?;
                let Ty::Struct(strukt) = &obj_ty else {
                    return Err(CompileError::type_mismatch(
                        format!("field access on non-struct value of type {obj_ty}"),
                        &self.fn_name,
                    ));
                };
                Ok(self.field_slot(strukt, field)?.1)
            }
        }
    }

    fn field_slot(&self, strukt: &str, field: &str) -> Result<(u32, Ty), CompileError> {
        let layout = self.env.layout(strukt)?;
        let slot = layout.field(field).ok_or_else(|| {
            CompileError::type_mismatch(
                format!("no field '{field}' on struct '{strukt}'"),
                &self.fn_name,
            )
        })?;
        Ok((slot.offset, slot.ty.clone()))
    }
}

/// Call a runtime function that returns a value.
pub(super) fn call_runtime(
    module: &mut dyn Module,
    builder: &mut FunctionBuilder,
    runtime: &RuntimeRegistry,
    name: &str,
    args: &[Value],
) -> Value {
    let func_ref = module.declare_func_in_func(runtime.get(name), builder.func);
    let call = builder.ins().call(func_ref, args);
    let results = builder.inst_results(call);
    debug_assert!(!results.is_empty(), "call_runtime used on void function {name}");
    results[0]
}

/// Call a runtime function that returns void.
pub(super) fn call_runtime_void(
    module: &mut dyn Module,
    builder: &mut FunctionBuilder,
    runtime: &RuntimeRegistry,
    name: &str,
    args: &[Value],
) {
    let func_ref = module.declare_func_in_func(runtime.get(name), builder.func);
    builder.ins().call(func_ref, args);
}

/// Create a NUL-terminated string in the data section and return its pointer.
pub(super) fn data_cstr(
    module: &mut dyn Module,
    builder: &mut FunctionBuilder,
    s: &str,
) -> Result<Value, CompileError> {
    let mut data_desc = DataDescription::new();
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0); // null terminator
    data_desc.define(bytes.into_boxed_slice());

    let data_id = module
        .declare_anonymous_data(false, false)
        .map_err(|e| CompileError::codegen(format!("declare data error: {e}")))?;
    module
        .define_data(data_id, &data_desc)
        .map_err(|e| CompileError::codegen(format!("define data error: {e}")))?;

    let gv = module.declare_data_in_func(data_id, builder.func);
    Ok(builder.ins().global_value(types::I64, gv))
}
