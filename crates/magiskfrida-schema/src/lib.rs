//! Shared types for the MagiskFrida module builder.
//!
//! Everything here is plain data: the target [`Platform`], the upstream
//! [`Release`] and the generated [`ModuleProp`]. IO lives in
//! `magiskfrida-core`.

pub mod module_prop;
pub mod platform;
pub mod release;

// Re-exports
pub use module_prop::{ModuleInfo, ModuleProp};
pub use platform::*;
pub use release::*;
