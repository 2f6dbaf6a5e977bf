//! Structural issues found during compilation
//!
//! Compilation is fail-soft: a problem abandons the offending subtree, gets
//! recorded with the node's tree path, and sibling subtrees carry on. The
//! caller receives every issue beside the generated text.

use sdfgen_scene::ShapeKind;
use thiserror::Error;

/// A structural problem in the compiled tree.
///
/// Paths are child-index trails from the root, `root/2/0` style, enough to
/// locate the node in the authored tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileIssue {
    /// An operation reached by traversal has no entry in the slot list.
    #[error("operation node at {path} is missing from the slot list")]
    MissingSlot { path: String },

    /// A shape kind with no closed-form distance expression.
    #[error("shape node at {path} has no distance expression ({kind:?})")]
    UnsupportedShape { path: String, kind: ShapeKind },
}

impl CompileIssue {
    /// Tree path of the offending node.
    pub fn path(&self) -> &str {
        match self {
            CompileIssue::MissingSlot { path } | CompileIssue::UnsupportedShape { path, .. } => {
                path
            }
        }
    }
}
