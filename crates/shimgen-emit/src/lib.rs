//! Shim and safe-wrapper emission for shimgen.
//!
//! A module run reads a [`shimgen_core::GenerationContext`], emits
//! structured records for every declaration ([`ir`]), and renders them into
//! the native and Rust artifact files ([`render`], [`artifacts`]).
//! Declarations that cannot be mapped are skipped and recorded in the
//! [`report`], never turned into errors.

pub mod aggregate;
pub mod artifacts;
pub mod constants;
pub mod emitter;
pub mod error;
pub mod function;
pub mod ir;
pub mod pipeline;
pub mod render;
pub mod report;

pub use artifacts::ModuleArtifacts;
pub use constants::ConstantBinding;
pub use emitter::Emitter;
pub use error::{EmitError, Result};
pub use ir::{EmitMode, Emission, FunctionIr, Item, ModuleIr, ReturnRecord};
pub use pipeline::{generate_module, ModuleOutput};
pub use report::{GenerationReport, SkippedEntry};
