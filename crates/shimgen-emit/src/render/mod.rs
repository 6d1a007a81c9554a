//! Text rendering of [`crate::ir::ModuleIr`].
//!
//! Rendering is a pure function of the records; all decisions were made by
//! the emitters.

pub mod native;
pub mod safe;

pub(crate) const GENERATED_NOTICE: &str = "//\n// This file is auto-generated, please don't edit!\n//\n";
