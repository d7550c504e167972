use std::path::PathBuf;
use thiserror::Error;

/// Generation-time failures. Every variant names the offending declaration;
/// generated code itself has no fallible contract at call time.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid layout in struct '{strukt}': {msg}")]
    InvalidLayout { strukt: String, msg: String },

    #[error("arity mismatch calling '{callee}' in '{function}': expected {expected} argument(s), found {found}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
        function: String,
    },

    #[error("type mismatch in '{function}': {msg}")]
    TypeMismatch { msg: String, function: String },

    #[error("unsupported operation in '{function}': {msg}")]
    UnsupportedOperation { msg: String, function: String },

    #[error("codegen error: {msg}")]
    Codegen { msg: String },

    #[error("config error: {msg}")]
    Config { msg: String, path: PathBuf },
}

impl CompileError {
    pub fn invalid_layout(strukt: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidLayout { strukt: strukt.into(), msg: msg.into() }
    }

    pub fn type_mismatch(msg: impl Into<String>, function: impl Into<String>) -> Self {
        Self::TypeMismatch { msg: msg.into(), function: function.into() }
    }

    pub fn unsupported(msg: impl Into<String>, function: impl Into<String>) -> Self {
        Self::UnsupportedOperation { msg: msg.into(), function: function.into() }
    }

    pub fn codegen(msg: impl Into<String>) -> Self {
        Self::Codegen { msg: msg.into() }
    }

    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }
}
