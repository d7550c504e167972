//! In-process runtime the generated code calls into.
//!
//! Allocation carries a size header so `__ceres_free` can release any
//! runtime-owned pointer: instances, stringifier results, and nothing else.
//! The text-builder functions back the generated `_to_string` bodies. All
//! entry points use the C ABI and are exported for linking embedders; the
//! JIT path registers them by name instead.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ffi::{c_char, CStr};
use std::fmt::Write as _;

use cranelift_jit::JITBuilder;

/// Bytes reserved in front of every allocation for the total size.
const HEADER: usize = 8;

/// Zeroed allocation of `size` bytes, 8-aligned. Aborts on overflow or OOM;
/// generated code has no error path to hand this to.
#[unsafe(no_mangle)]
pub extern "C" fn __ceres_alloc(size: i64) -> *mut u8 {
    let Some(total) = (size as usize).checked_add(HEADER) else {
        std::process::abort();
    };
    let Ok(layout) = Layout::from_size_align(total, HEADER) else {
        std::process::abort();
    };
    unsafe {
        let base = alloc_zeroed(layout);
        if base.is_null() {
            handle_alloc_error(layout);
        }
        (base as *mut u64).write(total as u64);
        base.add(HEADER)
    }
}

/// Release one `__ceres_alloc` allocation. NULL is a no-op. Never recurses
/// into anything the region points at.
#[unsafe(no_mangle)]
pub extern "C" fn __ceres_free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let base = ptr.sub(HEADER);
        let total = (base as *const u64).read() as usize;
        dealloc(base, Layout::from_size_align_unchecked(total, HEADER));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn __ceres_sb_new() -> *mut String {
    Box::into_raw(Box::new(String::new()))
}

#[unsafe(no_mangle)]
pub extern "C" fn __ceres_sb_push_bytes(sb: *mut String, ptr: *const u8, len: i64) {
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len as usize) };
    unsafe { &mut *sb }.push_str(&String::from_utf8_lossy(bytes));
}

#[unsafe(no_mangle)]
pub extern "C" fn __ceres_sb_push_int(sb: *mut String, value: i64) {
    let _ = write!(unsafe { &mut *sb }, "{value}");
}

/// Shortest round-trip decimal, with a trailing `.0` for integral finite
/// values (`42.0` renders as "42.0", not "42").
#[unsafe(no_mangle)]
pub extern "C" fn __ceres_sb_push_float(sb: *mut String, value: f64) {
    let _ = write!(unsafe { &mut *sb }, "{value:?}");
}

#[unsafe(no_mangle)]
pub extern "C" fn __ceres_sb_push_bool(sb: *mut String, value: i8) {
    unsafe { &mut *sb }.push_str(if value != 0 { "true" } else { "false" });
}

#[unsafe(no_mangle)]
pub extern "C" fn __ceres_sb_push_cstr(sb: *mut String, s: *const c_char) {
    let text = unsafe { CStr::from_ptr(s) }.to_string_lossy();
    unsafe { &mut *sb }.push_str(&text);
}

/// Consume the builder and return its contents as a NUL-terminated buffer
/// owned by the caller, released with `__ceres_free`.
#[unsafe(no_mangle)]
pub extern "C" fn __ceres_sb_finish(sb: *mut String) -> *mut c_char {
    let text = *unsafe { Box::from_raw(sb) };
    let out = __ceres_alloc(text.len() as i64 + 1);
    unsafe {
        std::ptr::copy_nonoverlapping(text.as_ptr(), out, text.len());
        out.add(text.len()).write(0);
    }
    out as *mut c_char
}

/// Register every runtime symbol with a JIT builder.
pub fn register_jit_symbols(builder: &mut JITBuilder) {
    builder.symbol("__ceres_alloc", __ceres_alloc as *const u8);
    builder.symbol("__ceres_free", __ceres_free as *const u8);
    builder.symbol("__ceres_sb_new", __ceres_sb_new as *const u8);
    builder.symbol("__ceres_sb_push_bytes", __ceres_sb_push_bytes as *const u8);
    builder.symbol("__ceres_sb_push_int", __ceres_sb_push_int as *const u8);
    builder.symbol("__ceres_sb_push_float", __ceres_sb_push_float as *const u8);
    builder.symbol("__ceres_sb_push_bool", __ceres_sb_push_bool as *const u8);
    builder.symbol("__ceres_sb_push_cstr", __ceres_sb_push_cstr as *const u8);
    builder.symbol("__ceres_sb_finish", __ceres_sb_finish as *const u8);
}
