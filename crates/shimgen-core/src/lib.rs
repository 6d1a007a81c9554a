//! Declaration model and type classification for shimgen.
//!
//! This crate turns the JSON declaration files produced by a native header
//! parser into a typed, per-module registry:
//!
//! - [`declaration`]: the raw file format and modifier parsing
//! - [`names`]: dotted-name resolution against known namespaces
//! - [`model`]: typed classes, functions, arguments, and constants
//! - [`config`]: library-specific tables and their TOML form
//! - [`classify`]: type categories and cross-boundary spellings
//! - [`context`]: the registry the emitter reads from

pub mod classify;
pub mod config;
pub mod context;
pub mod declaration;
pub mod error;
pub mod model;
pub mod names;

pub use classify::{classify, map_type, Category, InstanceKind, TemplateInstance, TypeLookup, TypeMapping};
pub use config::{GeneratorConfig, PrimitiveType, ValueStruct};
pub use context::{Exclusion, GenerationContext};
pub use declaration::{DeclarationFile, DeclarationKind, ModifierSet, RawArgument, RawDeclaration};
pub use error::{CoreError, Result};
pub use model::{Argument, Class, ClassKind, Constant, Direction, Function, Property};
pub use names::EntityName;
