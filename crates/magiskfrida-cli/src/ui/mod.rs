//! Terminal output.
//!
//! Commands print through [`Output`], which is also the [`Reporter`] handed to
//! the build pipeline. Colors and icons live in [`theme`].
//!
//! [`Reporter`]: magiskfrida_core::Reporter

pub mod output;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
