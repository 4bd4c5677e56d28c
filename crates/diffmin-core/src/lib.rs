//! Structural diff and patch engine for Java syntax trees.
//!
//! Two versions of a source file are parsed into typed trees, diffed into a
//! raw edit script, and the script is resolved into patches that rebuild the
//! newer version out of the older tree in place:
//!
//! ```text
//! parser ─▶ diff ─▶ mapping ─▶ patch::generate ─▶ patch::apply ─▶ printer
//! ```
//!
//! [`pipeline::patch_and_render`] runs the whole chain.

pub mod config;
pub mod diff;
pub mod logging;
pub mod mapping;
pub mod parser;
pub mod path;
pub mod patch;
pub mod pipeline;
pub mod printer;
pub mod role;
pub mod tree;

pub use config::Settings;
pub use mapping::Mapping;
pub use path::StructuralPath;
pub use patch::{Patch, PatchSet};
pub use pipeline::{patch_and_build, patch_and_render, PipelineError};
pub use role::Role;
pub use tree::{NodeId, NodeRef, Tree};
