//! The whole diff-and-patch run: parse both files, diff, resolve, generate,
//! apply, render.

use std::path::Path;

use crate::config::Settings;
use crate::diff::diff;
use crate::mapping::{Mapping, MappingError};
use crate::parser::{build_tree, ParseError};
use crate::patch::{apply, generate, PatchError};
use crate::printer::pretty_print;
use crate::tree::{Tree, TreeError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Patch the tree of `prev` into the shape of `new` and return it.
pub fn patch_and_build(prev: &Path, new: &Path, settings: &Settings) -> Result<Tree, PipelineError> {
    let mut src = build_tree(prev)?;
    let dst = build_tree(new)?;

    let diff = diff(&src, &dst, &settings.matching);
    let mapping = Mapping::resolve(&diff.correspondence, &src, &dst)?;
    let patches = generate(&diff.operations, &mapping, &src, &dst)?;
    apply(&mut src, &patches)?;
    Ok(src)
}

/// [`patch_and_build`], rendered back to source text.
pub fn patch_and_render(prev: &Path, new: &Path, settings: &Settings) -> Result<String, PipelineError> {
    let tree = patch_and_build(prev, new, settings)?;
    Ok(pretty_print(&tree, &settings.printer)?)
}
