use serde::Serialize;

/// Unique node identifier, taken from the block header.
pub type NodeId = usize;

/// Answer text that accepts any non-empty input.
pub const WILDCARD_ANSWER: &str = "*";

/// One accepted answer of a question and where it leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOption {
    pub answer: String,
    pub target: NodeId,
}

impl AnswerOption {
    pub fn new(answer: impl Into<String>, target: NodeId) -> Self {
        Self {
            answer: answer.into(),
            target,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.answer == WILDCARD_ANSWER
    }
}

/// Tag of a [`NodeKind`], for callers that only care about the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeType {
    Branching,
    Question,
    Terminating,
}

/// Each possible node variant, carrying only the transitions it can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Moves on without input. With two targets, the node's variable
    /// decides: set and non-empty takes `primary`, otherwise `secondary`.
    Branching {
        primary: NodeId,
        secondary: Option<NodeId>,
        text: Option<String>,
    },
    /// Prompts until an answer matches one of `answers`.
    Question {
        prompt: String,
        /// Shown instead of `prompt` after each rejected answer; the last
        /// one repeats once they run out.
        retries: Vec<String>,
        answers: Vec<AnswerOption>,
        /// Where to go once the prompt and every retry were rejected.
        /// Without it the question keeps asking.
        on_exhausted: Option<NodeId>,
    },
    /// Shows `message` and ends the run.
    Terminating { message: String },
}

/// A single node in the script graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Variable this node writes (questions) or tests (branches).
    pub variable: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind, id: NodeId, variable: Option<String>) -> Self {
        Self { id, kind, variable }
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Branching { .. } => NodeType::Branching,
            NodeKind::Question { .. } => NodeType::Question,
            NodeKind::Terminating { .. } => NodeType::Terminating,
        }
    }

    /// Primary branch target, or the first answer's target.
    pub fn transition_one(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Branching { primary, .. } => Some(*primary),
            NodeKind::Question { answers, .. } => answers.first().map(|a| a.target),
            NodeKind::Terminating { .. } => None,
        }
    }

    /// Secondary branch target, or the second answer's target.
    pub fn transition_two(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Branching { secondary, .. } => *secondary,
            NodeKind::Question { answers, .. } => answers.get(1).map(|a| a.target),
            NodeKind::Terminating { .. } => None,
        }
    }

    /// Every node id this node can transition to, in source order.
    pub fn transitions(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Branching {
                primary, secondary, ..
            } => std::iter::once(*primary).chain(*secondary).collect(),
            NodeKind::Question {
                answers,
                on_exhausted,
                ..
            } => answers
                .iter()
                .map(|a| a.target)
                .chain(*on_exhausted)
                .collect(),
            NodeKind::Terminating { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_question_transitions_follow_answer_order() {
        let node = Node::new(
            NodeKind::Question {
                prompt: "Ready?".into(),
                retries: vec![],
                answers: vec![
                    AnswerOption::new("yes", 4),
                    AnswerOption::new("no", 2),
                    AnswerOption::new("*", 9),
                ],
                on_exhausted: Some(7),
            },
            1,
            Some("READY".into()),
        );
        assert_eq!(node.node_type(), NodeType::Question);
        assert_eq!(node.transition_one(), Some(4));
        assert_eq!(node.transition_two(), Some(2));
        assert_eq!(node.transitions(), vec![4, 2, 9, 7]);
    }

    #[test]
    fn test_terminating_has_no_transitions() {
        let node = Node::new(
            NodeKind::Terminating {
                message: "Bye".into(),
            },
            3,
            None,
        );
        assert_eq!(node.transition_one(), None);
        assert_eq!(node.transition_two(), None);
        assert!(node.transitions().is_empty());
    }

    #[test]
    fn test_structural_equality() {
        let a = Node::new(
            NodeKind::Branching {
                primary: 1,
                secondary: None,
                text: None,
            },
            0,
            None,
        );
        let mut b = a.clone();
        assert_eq!(a, b);
        b.variable = Some("X".into());
        assert_ne!(a, b);
    }
}
