use std::collections::HashMap;

use cranelift_codegen::ir::{types, AbiParam};
use cranelift_module::{FuncId, Linkage, Module};

use crate::diagnostics::CompileError;

/// Registry of runtime support functions declared in the module.
/// Each entry specifies raw machine types for parameters and returns,
/// preserving exact C ABI compatibility with `crate::runtime`.
pub struct RuntimeRegistry {
    ids: HashMap<&'static str, FuncId>,
}

impl RuntimeRegistry {
    pub fn new(module: &mut dyn Module) -> Result<Self, CompileError> {
        let mut reg = RuntimeRegistry { ids: HashMap::new() };

        // Memory
        reg.declare(module, "__ceres_alloc", &[types::I64], &[types::I64])?;
        reg.declare(module, "__ceres_free", &[types::I64], &[])?;

        // Text assembly for generated stringifiers
        reg.declare(module, "__ceres_sb_new", &[], &[types::I64])?;
        reg.declare(module, "__ceres_sb_push_bytes", &[types::I64, types::I64, types::I64], &[])?;
        reg.declare(module, "__ceres_sb_push_int", &[types::I64, types::I64], &[])?;
        reg.declare(module, "__ceres_sb_push_float", &[types::I64, types::F64], &[])?;
        reg.declare(module, "__ceres_sb_push_bool", &[types::I64, types::I8], &[])?;
        reg.declare(module, "__ceres_sb_push_cstr", &[types::I64, types::I64], &[])?;
        reg.declare(module, "__ceres_sb_finish", &[types::I64], &[types::I64])?;

        Ok(reg)
    }

    /// Look up a runtime function by its full symbol name.
    pub fn get(&self, name: &str) -> FuncId {
        self.ids[name]
    }

    fn declare(
        &mut self,
        module: &mut dyn Module,
        name: &'static str,
        params: &[types::Type],
        returns: &[types::Type],
    ) -> Result<(), CompileError> {
        let mut sig = module.make_signature();
        for &p in params {
            sig.params.push(AbiParam::new(p));
        }
        for &r in returns {
            sig.returns.push(AbiParam::new(r));
        }
        let id = module
            .declare_function(name, Linkage::Import, &sig)
            .map_err(|e| CompileError::codegen(format!("declare {name} error: {e}")))?;
        self.ids.insert(name, id);
        Ok(())
    }
}
