//! Struct layout planning.
//!
//! Fields are laid out in declaration order with no reordering: each field's
//! offset is rounded up to its own alignment, total size is rounded up to the
//! struct alignment (the max of its field alignments). Instance layout is the
//! only persisted format and stays stable for the lifetime of a struct
//! definition.

use std::collections::HashSet;

use crate::decl::{StructDef, Ty};
use crate::diagnostics::CompileError;

/// Size and alignment of a single value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayout {
    pub size: u32,
    pub align: u32,
}

/// One planned field: declared name and type plus its byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    pub name: String,
    pub ty: Ty,
    pub offset: u32,
}

/// Planned layout of a whole struct.
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub size: u32,
    pub align: u32,
    pub fields: Vec<FieldLayout>,
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Size/alignment of a value type. References (text, struct) are pointers.
pub fn type_layout(ty: &Ty) -> TypeLayout {
    match ty {
        Ty::Int | Ty::Float => TypeLayout { size: 8, align: 8 },
        Ty::Bool => TypeLayout { size: 1, align: 1 },
        Ty::Text | Ty::Struct(_) => TypeLayout { size: 8, align: 8 },
    }
}

/// Plan one struct's layout. `structs` is the set of all declared struct
/// names, used to validate reference fields. An empty struct is legal
/// (size 0, align 1).
pub fn plan(def: &StructDef, structs: &HashSet<String>) -> Result<StructLayout, CompileError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut fields = Vec::with_capacity(def.fields.len());
    let mut offset = 0u32;
    let mut align = 1u32;

    for field in &def.fields {
        if !seen.insert(&field.name) {
            return Err(CompileError::invalid_layout(
                &def.name,
                format!("duplicate field '{}'", field.name),
            ));
        }
        if let Ty::Struct(target) = &field.ty
            && !structs.contains(target)
        {
            return Err(CompileError::invalid_layout(
                &def.name,
                format!("field '{}' references unknown struct '{target}'", field.name),
            ));
        }
        let tl = type_layout(&field.ty);
        offset = align_to(offset, tl.align);
        fields.push(FieldLayout {
            name: field.name.clone(),
            ty: field.ty.clone(),
            offset,
        });
        offset = offset.saturating_add(tl.size);
        align = align.max(tl.align);
    }

    Ok(StructLayout {
        size: align_to(offset, align),
        align,
        fields,
    })
}

/// Align a byte offset up to the next alignment boundary.
pub fn align_to(value: u32, align: u32) -> u32 {
    if align == 0 {
        return value;
    }
    let rem = value % align;
    if rem == 0 { value } else { value + (align - rem) }
}
