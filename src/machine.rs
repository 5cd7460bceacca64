//! The node registry and the interpreter loop that walks it.

pub mod env;
pub mod node;

pub use env::Env;
pub use node::{AnswerOption, Node, NodeId, NodeKind, NodeType, WILDCARD_ANSWER};

use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, InputMismatch, Result};
use crate::grammar::{
    parse_answer_line, parse_give_up_line, parse_int_line, parse_node_id, parse_retry_line,
    parse_string_line, parse_variable_line, trim_whitespace, NodesParser, Pair, Pairs, Rule,
};
use crate::script::read_script;

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The terminating node that was reached.
    pub terminal: NodeId,
    /// Transitions taken on the way.
    pub steps: usize,
    /// The terminating message, templates resolved.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Containing structure for all nodes plus the state of one run.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Nodes {
    /// Node about to execute.
    current_node: NodeId,
    /// Where a run starts; the first registered node unless overridden.
    entry: Option<NodeId>,
    /// User-defined mapping of names to values.
    env: Env,
    /// Rejected answers at the current node. Reset on every transition.
    #[serde(skip)]
    internal_state: usize,
    #[serde(skip)]
    steps: usize,
    nodes: BTreeMap<NodeId, Node>,
}

impl Nodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load, parse and validate the script named by `config`.
    pub fn load(config: &Config) -> Result<Self> {
        info!("Loading script: {}", config.input.display());
        let source = read_script(&config.input)?;
        let mut nodes = Self::from_script(&source)?;
        if let Some(entry) = config.entry {
            nodes.enter(entry)?;
        }
        Ok(nodes)
    }

    /// Parse `source`, register every block and check the graph is closed.
    pub fn from_script(source: &str) -> Result<Self> {
        let mut nodes = Self::new();
        nodes.read_and_register(NodesParser::parse(source)?)?;
        nodes.validate()?;
        info!(
            "Loaded {} nodes, entry node {}",
            nodes.len(),
            nodes.current_node
        );
        Ok(nodes)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn current_node(&self) -> NodeId {
        self.current_node
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    /// Make `id` the entry node and move there.
    pub fn enter(&mut self, id: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&id) {
            return Err(Error::MissingEntry(id));
        }
        self.entry = Some(id);
        self.current_node = id;
        self.internal_state = 0;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    fn register(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }
        debug!(
            "Registered {:?} node {} (transitions={:?})",
            node.node_type(),
            node.id,
            node.transitions()
        );
        if self.entry.is_none() {
            self.entry = Some(node.id);
            self.current_node = node.id;
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Add a question node. `options` keep their source order. Once the
    /// prompt and every retry were rejected, `on_exhausted` is taken if set.
    pub fn register_question_node(
        &mut self,
        id: NodeId,
        options: Vec<AnswerOption>,
        variable_name: &str,
        prompt: &str,
        retries: Vec<String>,
        on_exhausted: Option<NodeId>,
    ) -> Result<()> {
        warn_braced_only(id, variable_name);
        self.register(Node::new(
            NodeKind::Question {
                prompt: prompt.into(),
                retries,
                answers: options,
                on_exhausted,
            },
            id,
            Some(variable_name.into()),
        ))
    }

    /// Add a branching node with one target, or two chosen by `variable_name`.
    pub fn register_branching_node(
        &mut self,
        id: NodeId,
        target: NodeId,
        secondary: Option<NodeId>,
        variable_name: Option<&str>,
        text: Option<&str>,
    ) -> Result<()> {
        if let Some(variable_name) = variable_name {
            warn_braced_only(id, variable_name);
        }
        self.register(Node::new(
            NodeKind::Branching {
                primary: target,
                secondary,
                text: text.map(Into::into),
            },
            id,
            variable_name.map(Into::into),
        ))
    }

    pub fn register_terminating_node(&mut self, id: NodeId, message: &str) -> Result<()> {
        self.register(Node::new(
            NodeKind::Terminating {
                message: message.into(),
            },
            id,
            None,
        ))
    }

    /// Register whatever `parsed` holds: the whole script, a node wrapper,
    /// or a single block.
    pub fn read_and_register(&mut self, parsed: Pair<'_>) -> Result<()> {
        let line = parsed.line();
        match parsed.as_rule() {
            Rule::Nodes | Rule::Node => {
                for child in parsed.into_inner() {
                    self.read_and_register(child)?;
                }
                Ok(())
            }
            Rule::Question => {
                let mut inner = parsed.into_inner();
                let id = header_id(&mut inner, Rule::QuestionId, line)?;
                let variable =
                    parse_variable_line(&next_child(&mut inner, Rule::VariableLine, line)?)?;
                let prompt =
                    parse_string_line(&next_child(&mut inner, Rule::StringLine, line)?)?;
                let mut retries = Vec::new();
                let mut options = Vec::new();
                let mut on_exhausted = None;
                for child in inner {
                    match child.as_rule() {
                        Rule::RetryLine => retries.push(parse_retry_line(&child)?),
                        Rule::GiveUpLine => on_exhausted = Some(parse_give_up_line(&child)?),
                        _ => {
                            let (answer, target) = parse_answer_line(&child)?;
                            options.push(AnswerOption::new(answer, target));
                        }
                    }
                }
                self.register_question_node(
                    id,
                    options,
                    &variable,
                    &prompt,
                    retries,
                    on_exhausted,
                )
            }
            Rule::Branching => {
                let mut inner = parsed.into_inner();
                let id = header_id(&mut inner, Rule::BranchingId, line)?;
                let targets = next_child(&mut inner, Rule::IntLine, line)?;
                let (target, secondary) = match parse_int_line(&targets)?.as_slice() {
                    [one] => (*one, None),
                    [one, two] => (*one, Some(*two)),
                    _ => {
                        return Err(Error::UnexpectedRule {
                            expected: Rule::IntLine,
                            found: Rule::IntLine,
                            line: targets.line(),
                        })
                    }
                };
                let mut variable = None;
                let mut text = None;
                for child in inner {
                    match child.as_rule() {
                        Rule::VariableLine => variable = Some(parse_variable_line(&child)?),
                        _ => text = Some(parse_string_line(&child)?),
                    }
                }
                self.register_branching_node(
                    id,
                    target,
                    secondary,
                    variable.as_deref(),
                    text.as_deref(),
                )
            }
            Rule::Terminating => {
                let mut inner = parsed.into_inner();
                let id = header_id(&mut inner, Rule::TerminatingId, line)?;
                let message =
                    parse_string_line(&next_child(&mut inner, Rule::StringLine, line)?)?;
                self.register_terminating_node(id, &message)
            }
            found @ (Rule::BranchingId
            | Rule::QuestionId
            | Rule::TerminatingId
            | Rule::IntLine
            | Rule::StringLine
            | Rule::VariableLine
            | Rule::RetryLine
            | Rule::AnswerLine
            | Rule::GiveUpLine) => Err(Error::UnexpectedRule {
                expected: Rule::Node,
                found,
                line,
            }),
        }
    }

    /// Every transition must land on a registered node, and branches alone
    /// must never form a loop: a run would spin through them without input.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::EmptyScript);
        }
        for node in self.nodes.values() {
            if let Some(to) = node
                .transitions()
                .into_iter()
                .find(|to| !self.nodes.contains_key(to))
            {
                return Err(Error::DanglingTransition { from: node.id, to });
            }
        }
        let mut marks = HashMap::new();
        for &id in self.nodes.keys() {
            if !marks.contains_key(&id) {
                self.walk_branches(id, &mut marks)?;
            }
        }
        Ok(())
    }

    /// Depth-first walk over branch-only successors of `id`.
    fn walk_branches(&self, id: NodeId, marks: &mut HashMap<NodeId, Visit>) -> Result<()> {
        let Some(node) = self.nodes.get(&id) else {
            return Ok(());
        };
        if node.node_type() != NodeType::Branching {
            return Ok(());
        }
        marks.insert(id, Visit::OnPath);
        for to in node.transitions() {
            match marks.get(&to) {
                Some(Visit::OnPath) => return Err(Error::BranchCycle { from: id, to }),
                Some(Visit::Done) => {}
                None => self.walk_branches(to, marks)?,
            }
        }
        marks.insert(id, Visit::Done);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Move to `next_id`, which must be registered.
    pub fn state_transition(&mut self, next_id: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&next_id) {
            return Err(Error::DanglingTransition {
                from: self.current_node,
                to: next_id,
            });
        }
        info!("Transition: {} -> {}", self.current_node, next_id);
        self.current_node = next_id;
        self.internal_state = 0;
        self.steps += 1;
        Ok(())
    }

    /// Execute the machine on stdin/stdout.
    pub fn run(&mut self) -> Result<Outcome> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock())
    }

    /// Execute the machine until a terminating node, reading answers from
    /// `input` and writing prompts and messages to `output`.
    pub fn run_with<R, W>(&mut self, mut input: R, mut output: W) -> Result<Outcome>
    where
        R: BufRead,
        W: Write,
    {
        info!("Run started at node {}", self.current_node);

        loop {
            let node = self
                .nodes
                .get(&self.current_node)
                .cloned()
                .ok_or(Error::MissingEntry(self.current_node))?;

            match &node.kind {
                NodeKind::Terminating { message } => {
                    let message = self.env.resolve_template(message);
                    writeln!(output, "{message}")?;
                    output.flush()?;
                    info!("Run finished at node {} after {} steps", node.id, self.steps);
                    return Ok(Outcome {
                        terminal: node.id,
                        steps: self.steps,
                        message,
                    });
                }
                NodeKind::Branching {
                    primary,
                    secondary,
                    text,
                } => {
                    if let Some(text) = text {
                        writeln!(output, "{}", self.env.resolve_template(text))?;
                    }
                    let next = self.choose_branch(&node, *primary, *secondary);
                    self.state_transition(next)?;
                }
                NodeKind::Question {
                    prompt,
                    retries,
                    answers,
                    on_exhausted,
                } => {
                    let shown = match self.internal_state {
                        0 => prompt,
                        n => retries.get(n - 1).or(retries.last()).unwrap_or(prompt),
                    };
                    write!(output, "{}", self.render_question(shown, answers))?;
                    output.flush()?;

                    let mut line = String::new();
                    if input.read_line(&mut line)? == 0 {
                        return Err(Error::InputClosed(node.id));
                    }
                    let line = trim_whitespace(&line);
                    let answer = line.trim();
                    debug!("Node {} received {answer:?}", node.id);

                    match match_answer(node.id, answers, answer) {
                        Ok(option) => {
                            if let Some(variable) = &node.variable {
                                let value = if option.is_wildcard() {
                                    answer
                                } else {
                                    option.answer.as_str()
                                };
                                self.env.set_variable(variable, value);
                            }
                            self.state_transition(option.target)?;
                        }
                        Err(mismatch) => {
                            warn!("{mismatch}");
                            self.internal_state += 1;
                            if let Some(give_up) = on_exhausted {
                                if self.internal_state > retries.len() {
                                    info!(
                                        "Node {} gave up after {} attempts",
                                        node.id, self.internal_state
                                    );
                                    self.state_transition(*give_up)?;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// With two targets, a set and non-empty variable picks the primary one.
    fn choose_branch(&self, node: &Node, primary: NodeId, secondary: Option<NodeId>) -> NodeId {
        let Some(secondary) = secondary else {
            return primary;
        };
        match &node.variable {
            Some(variable) if !self.env.is_truthy(variable) => {
                debug!("Node {}: {variable} is unset, taking {secondary}", node.id);
                secondary
            }
            _ => primary,
        }
    }

    fn render_question(&self, prompt: &str, answers: &[AnswerOption]) -> String {
        let mut s = self.env.resolve_template(prompt);
        s.push('\n');
        for (i, option) in menu(answers).enumerate() {
            s.push_str(&format!("  {}. {}\n", i + 1, option.answer));
        }
        s.push_str("> ");
        s
    }
}

/// Branch nodes seen while checking for loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    OnPath,
    Done,
}

/// `$NAME` placeholders only take upper-case names.
fn warn_braced_only(id: NodeId, variable_name: &str) {
    if !Env::dollar_form_resolves(variable_name) {
        warn!("Node {id}: variable {variable_name} can only be written as {{{variable_name}}}");
    }
}

/// Answers listed in the menu; the wildcard is never shown.
fn menu(answers: &[AnswerOption]) -> impl Iterator<Item = &AnswerOption> {
    answers.iter().filter(|option| !option.is_wildcard())
}

/// Literal text first, then the menu number, then the wildcard.
fn match_answer<'a>(
    node: NodeId,
    answers: &'a [AnswerOption],
    answer: &str,
) -> std::result::Result<&'a AnswerOption, InputMismatch> {
    let literal = || menu(answers).find(|option| option.answer == answer);
    let numbered = || {
        answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| menu(answers).nth(i))
    };
    let wildcard = || {
        answers
            .iter()
            .find(|option| option.is_wildcard() && !answer.is_empty())
    };

    literal()
        .or_else(numbered)
        .or_else(wildcard)
        .ok_or_else(|| InputMismatch {
            node,
            answer: answer.to_owned(),
        })
}

fn header_id(inner: &mut Pairs<'_>, header: Rule, line: usize) -> Result<NodeId> {
    parse_node_id(&next_child(inner, header, line)?, header)
}

fn next_child<'i>(inner: &mut Pairs<'i>, expected: Rule, line: usize) -> Result<Pair<'i>> {
    inner.next().ok_or(Error::UnexpectedRule {
        expected,
        found: Rule::Node,
        line,
    })
}
