//! # winnow_sm
//!
//! A state machine for branching, text-defined user prompts. A script file
//! is parsed into nodes, the nodes are registered by id, and the machine
//! walks them from the first block until it reaches an `end` node.
//!
//! ## Script format
//!
//! Blocks are separated by blank lines. Every block starts with a header
//! naming its kind and id.
//!
//! A question prompts until one of its answers matches, stores the answer
//! under the variable and jumps to the answer's target. Answers can be typed
//! out or picked by their menu number; `*` accepts any non-empty input.
//! Lines starting with `?` replace the prompt after a rejected answer. An
//! optional closing `! -> <id>` line gives up once the prompt and every retry
//! were rejected; without it the last prompt repeats.
//!
//! ```text
//! question 0
//! $NAME
//! What is your name?
//! ? Please tell me your name
//! - * -> 1
//! ! -> 3
//! ```
//!
//! A branch moves on without input. With two targets it takes the first when
//! its variable is set and non-empty, the second otherwise. The text line is
//! optional. Branches that lead back to themselves through other branches
//! only are rejected at load.
//!
//! ```text
//! branch 1
//! 2 3
//! $NAME
//! The bridgekeeper looks at you.
//! ```
//!
//! An end node shows its message and stops the run.
//!
//! ```text
//! end 2
//! You may pass, $NAME.
//! ```
//!
//! Text can refer to variables as `$NAME` (upper case) or `{name}`. A
//! variable with lower-case letters can only be written in braces.
//! Placeholders for variables that were never set are printed as written.
//!
//! ```
//! use winnow_sm::Nodes;
//!
//! let mut nodes = Nodes::from_script("question 0\n$NAME\nName?\n- * -> 1\n\nend 1\nHi, {NAME}.\n")?;
//! let mut output = Vec::new();
//! let outcome = nodes.run_with("Robin\n".as_bytes(), &mut output)?;
//! assert_eq!(outcome.message, "Hi, Robin.");
//! # Ok::<(), winnow_sm::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod grammar;
pub mod machine;
pub mod script;

pub use config::{Config, Mode, DEFAULT_INPUT_FILE};
pub use error::{Error, InputMismatch, Result, SyntaxError};
pub use grammar::{NodesParser, Pair, Pairs, Rule};
pub use machine::{AnswerOption, Env, Node, NodeId, NodeKind, NodeType, Nodes, Outcome};
