//! # trellis-config
//!
//! Declarative machine definitions for trellis.
//!
//! This crate provides:
//! - A serde document model shared by JSON and YAML encodings
//! - A loader compiling documents into validated definitions, with
//!   symbolic guard/action/hook registries
//! - A constrained natural-language parser producing the same documents
//! - Reverse extraction of documents from live machines

pub mod document;
pub mod error;
pub mod loader;
pub mod parser;
pub mod registry;

pub use document::{EventDoc, HookDoc, MachineDocument, StateDoc, TransitionDoc};
pub use error::ConfigError;
pub use loader::Loader;
pub use parser::{DefinitionParser, DEFAULT_EVENT};
pub use registry::{ActionFactory, GuardFactory, HookFactory, Props, Registry};
