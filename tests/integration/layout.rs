mod common;

use std::collections::HashSet;

use ceres::decl::{Program, Ty};
use ceres::env::{self, ModuleEnv};
use ceres::layout;
use common::*;

#[test]
fn declaration_order_is_layout_order() {
    let def = struct_def(
        "Record",
        &[("a", Ty::Int), ("b", Ty::Text), ("c", Ty::Float), ("d", Ty::Int)],
    );
    let planned = layout::plan(&def, &HashSet::new()).unwrap();
    let offsets: Vec<u32> = planned.fields.iter().map(|f| f.offset).collect();
    assert_eq!(offsets, vec![0, 8, 16, 24]);
    assert_eq!(planned.size, 32);
    assert_eq!(planned.align, 8);
}

#[test]
fn bools_pack_at_byte_granularity_with_padding_before_wider_fields() {
    let def = struct_def(
        "MultiPrimFields",
        &[("aBool", Ty::Bool), ("aInt", Ty::Int), ("aFloat", Ty::Float)],
    );
    let planned = layout::plan(&def, &HashSet::new()).unwrap();
    assert_eq!(planned.field("aBool").unwrap().offset, 0);
    assert_eq!(planned.field("aInt").unwrap().offset, 8);
    assert_eq!(planned.field("aFloat").unwrap().offset, 16);
    assert_eq!(planned.size, 24);
}

#[test]
fn adjacent_bools_share_no_padding() {
    let def = struct_def("Flags", &[("a", Ty::Bool), ("b", Ty::Bool), ("c", Ty::Bool)]);
    let planned = layout::plan(&def, &HashSet::new()).unwrap();
    let offsets: Vec<u32> = planned.fields.iter().map(|f| f.offset).collect();
    assert_eq!(offsets, vec![0, 1, 2]);
    assert_eq!(planned.size, 3);
    assert_eq!(planned.align, 1);
}

#[test]
fn reference_fields_are_pointer_sized() {
    let mut known = HashSet::new();
    known.insert("Other".to_string());
    let def = struct_def(
        "Holder",
        &[("other", Ty::Struct("Other".to_string())), ("label", Ty::Text)],
    );
    let planned = layout::plan(&def, &known).unwrap();
    assert_eq!(planned.field("other").unwrap().offset, 0);
    assert_eq!(planned.field("label").unwrap().offset, 8);
    assert_eq!(planned.size, 16);
}

#[test]
fn empty_struct_has_zero_size() {
    let planned = layout::plan(&struct_def("Empty", &[]), &HashSet::new()).unwrap();
    assert_eq!(planned.size, 0);
    assert_eq!(planned.align, 1);
}

#[test]
fn env_records_generated_symbol_signatures() {
    let program = Program {
        structs: vec![struct_def("Point", &[("x", Ty::Int), ("y", Ty::Float)])],
        functions: vec![],
    };
    let env = ModuleEnv::build(&program).unwrap();

    let ctor = &env.fns[&env::constructor_name("Point")];
    assert_eq!(ctor.params, vec![Ty::Int, Ty::Float]);
    assert_eq!(ctor.ret, Some(Ty::Struct("Point".to_string())));

    let getter = &env.fns[&env::getter_name("Point", "y")];
    assert_eq!(getter.params, vec![Ty::Struct("Point".to_string())]);
    assert_eq!(getter.ret, Some(Ty::Float));

    let setter = &env.fns[&env::setter_name("Point", "x")];
    assert_eq!(setter.params, vec![Ty::Struct("Point".to_string()), Ty::Int]);
    assert_eq!(setter.ret, None);

    let to_string = &env.fns[&env::to_string_name("Point")];
    assert_eq!(to_string.ret, Some(Ty::Text));

    let drop_sig = &env.fns[&env::drop_name("Point")];
    assert_eq!(drop_sig.params, vec![Ty::Struct("Point".to_string())]);
    assert_eq!(drop_sig.ret, None);
}

#[test]
fn declared_function_colliding_with_a_generated_symbol_is_rejected() {
    let program = Program {
        structs: vec![struct_def("Point", &[("x", Ty::Int)])],
        functions: vec![fn_decl("Point_get_x", vec![], Some(Ty::Int), vec![ret(int(0))])],
    };
    assert!(ModuleEnv::build(&program).is_err());
}
