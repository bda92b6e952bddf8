//! # Blueprint Code Generation
//!
//! Lua code generation for blueprint graphs.

pub mod format;
mod lua_codegen;

pub use lua_codegen::*;
