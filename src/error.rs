use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::grammar::Rule;
use crate::machine::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

/// Where in the script a parse failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "syntax error at {line}:{column} in {rule:?}: {message}\n  | {source_line}\n  | {}",
    caret(.column)
)]
pub struct SyntaxError {
    /// The rule that was being matched when the input stopped conforming.
    pub rule: Rule,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column (in characters).
    pub column: usize,
    /// The offending source line, without its newline.
    pub source_line: String,
    pub message: String,
}

/// A `^` under the 1-based `column`.
fn caret(column: &usize) -> String {
    format!("{:>width$}", "^", width = *column)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read script {}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("expected a {expected:?} pair at line {line}, found {found:?}")]
    UnexpectedRule {
        expected: Rule,
        found: Rule,
        line: usize,
    },

    #[error("node {0} is registered twice")]
    DuplicateNode(NodeId),

    #[error("node {from} transitions to unregistered node {to}")]
    DanglingTransition { from: NodeId, to: NodeId },

    #[error("branch {from} loops back to branch {to} without asking anything")]
    BranchCycle { from: NodeId, to: NodeId },

    #[error("entry node {0} is not registered")]
    MissingEntry(NodeId),

    #[error("script contains no nodes")]
    EmptyScript,

    #[error("input closed while node {0} was waiting for an answer")]
    InputClosed(NodeId),

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An answer that matched none of a question's options. Never fatal: the
/// interpreter re-prompts instead of surfacing it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{answer}' does not match any option of node {node}")]
pub struct InputMismatch {
    pub node: NodeId,
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_syntax_error_points_at_column() {
        let err = SyntaxError {
            rule: Rule::TerminatingId,
            line: 1,
            column: 5,
            source_line: "end x".into(),
            message: "expected an `end <id>` header".into(),
        };
        assert_eq!(
            err.to_string(),
            "syntax error at 1:5 in TerminatingId: expected an `end <id>` header\n  | end x\n  |     ^"
        );
        assert_eq!(Error::from(err.clone()).to_string(), err.to_string());
    }
}
