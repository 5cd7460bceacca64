//! Script grammar, built from winnow combinators.
//!
//! ```text
//! nodes          = blank* (node (blank+ | EOF))* EOF
//! node           = question | branching | terminating
//! question       = question_id variable_line string_line retry_line* answer_line+ give_up_line?
//! branching      = branching_id int_line variable_line? string_line?
//! terminating    = terminating_id string_line
//!
//! question_id    = "question" SP int NL
//! branching_id   = "branch" SP int NL
//! terminating_id = "end" SP int NL
//! int_line       = int (SP int)* NL
//! string_line    = !WS (!NL ANY)* NL
//! variable_line  = "$" ident NL
//! retry_line     = "?" SP string_line
//! answer_line    = "-" SP answer " -> " int NL
//! give_up_line   = "!" SP? "->" SP? int NL
//! ```
//!
//! `NL` also matches end of file, so the last line needs no terminator.
//! Once a block header has matched, the rest of the block is committed:
//! a malformed body is reported at the offending line instead of being
//! retried as a different block kind.

mod extract;
mod pair;

pub use extract::{
    parse_answer_line, parse_give_up_line, parse_int_line, parse_node_id, parse_retry_line,
    parse_string_line, parse_variable_line, trim_whitespace,
};
pub use pair::{Pair, Pairs, Rule};

use log::debug;
use winnow::ascii::{dec_uint, line_ending, space0, space1};
use winnow::combinator::{
    alt, cut_err, eof, fail, opt, preceded, repeat, repeat_till, terminated,
};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::stream::LocatingSlice;
use winnow::token::{none_of, one_of, take_till, take_until, take_while};
use winnow::ModalResult;

use crate::error::SyntaxError;
use crate::machine::NodeId;
use pair::LineIndex;

type Input<'i> = LocatingSlice<&'i str>;
type PResult<O> = ModalResult<O, ContextError<Rule>>;

/// Entry point of the grammar.
pub struct NodesParser;

impl NodesParser {
    /// Parse a whole script into its root [`Rule::Nodes`] pair.
    pub fn parse(source: &str) -> Result<Pair<'_>, SyntaxError> {
        let index = LineIndex::new(source);
        let mut root = nodes
            .parse(LocatingSlice::new(source))
            .map_err(|e| {
                let rule = e.inner().context().next().copied().unwrap_or(Rule::Nodes);
                let (line, column) = index.line_col(e.offset());
                SyntaxError {
                    rule,
                    line,
                    column,
                    source_line: index.line_text(line).to_owned(),
                    message: format!("expected {}", rule.expected()),
                }
            })?;
        root.locate(&index);
        debug!("Parsed {} node blocks", root.inner().len());
        Ok(root)
    }
}

// ---------------------------------------------------------------------------
// Pair construction
// ---------------------------------------------------------------------------

/// Wrap `inner` so its match becomes a [`Pair`] tagged with `rule`.
fn pair<'i, P>(rule: Rule, mut inner: P) -> impl FnMut(&mut Input<'i>) -> PResult<Pair<'i>>
where
    P: Parser<Input<'i>, Vec<Pair<'i>>, ErrMode<ContextError<Rule>>>,
{
    move |input: &mut Input<'i>| {
        let ((children, text), span) = inner
            .by_ref()
            .with_taken()
            .with_span()
            .context(rule)
            .parse_next(input)?;
        Ok(Pair {
            rule,
            text,
            span,
            line: 0,
            column: 0,
            inner: children,
        })
    }
}

fn leaf<'i, O>(_: O) -> Vec<Pair<'i>> {
    Vec::new()
}

// ---------------------------------------------------------------------------
// Lexical rules
// ---------------------------------------------------------------------------

fn line_end(input: &mut Input<'_>) -> PResult<()> {
    alt((line_ending.void(), eof.void())).parse_next(input)
}

fn blank_line(input: &mut Input<'_>) -> PResult<()> {
    (space0, line_ending).void().parse_next(input)
}

fn node_id(input: &mut Input<'_>) -> PResult<NodeId> {
    dec_uint.parse_next(input)
}

fn ident<'i>(input: &mut Input<'i>) -> PResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn int_line<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::IntLine,
        (
            node_id,
            repeat::<_, _, (), _, _>(0.., preceded(space1, node_id)),
            space0,
            line_end,
        )
            .map(leaf),
    )
    .parse_next(input)
}

fn string_line<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::StringLine,
        (
            none_of([' ', '\t', '\r', '\n']),
            take_till(0.., ['\r', '\n']),
            line_end,
        )
            .map(leaf),
    )
    .parse_next(input)
}

fn variable_line<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(Rule::VariableLine, ("$", ident, space0, line_end).map(leaf)).parse_next(input)
}

fn retry_line<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::RetryLine,
        ("?", space1, cut_err(string_line)).map(|(_, _, prompt)| vec![prompt]),
    )
    .parse_next(input)
}

fn answer_line<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::AnswerLine,
        (
            "-",
            space1,
            cut_err((
                take_until(1.., " -> ")
                    .verify(|answer: &str| !answer.contains(['\r', '\n'])),
                " -> ",
                space0,
                node_id,
                space0,
                line_end,
            )),
        )
            .map(leaf),
    )
    .parse_next(input)
}

fn give_up_line<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::GiveUpLine,
        (
            "!",
            space0,
            cut_err(("->", space0, node_id, space0, line_end)),
        )
            .map(leaf),
    )
    .parse_next(input)
}

// ---------------------------------------------------------------------------
// Structural rules
// ---------------------------------------------------------------------------

fn header<'i>(
    rule: Rule,
    keyword: &'static str,
) -> impl FnMut(&mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        rule,
        (keyword, space1, cut_err((node_id, space0, line_end))).map(leaf),
    )
}

fn question<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::Question,
        (
            header(Rule::QuestionId, "question"),
            cut_err((
                variable_line,
                string_line,
                repeat(0.., retry_line),
                repeat(1.., answer_line),
                opt(give_up_line),
            )),
        )
            .map(
                |(id, (variable, prompt, retries, answers, give_up)): (
                    Pair<'i>,
                    (
                        Pair<'i>,
                        Pair<'i>,
                        Vec<Pair<'i>>,
                        Vec<Pair<'i>>,
                        Option<Pair<'i>>,
                    ),
                )| {
                    let mut children = vec![id, variable, prompt];
                    children.extend(retries);
                    children.extend(answers);
                    children.extend(give_up);
                    children
                },
            ),
    )
    .parse_next(input)
}

fn branching<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::Branching,
        (
            header(Rule::BranchingId, "branch"),
            cut_err(
                int_line
                    .verify(|targets: &Pair<'i>| {
                        targets.as_str().split_whitespace().count() <= 2
                    })
                    .context(Rule::IntLine),
            ),
            opt(variable_line),
            opt(string_line),
        )
            .map(|(id, targets, variable, text)| {
                let mut children = vec![id, targets];
                children.extend(variable);
                children.extend(text);
                children
            }),
    )
    .parse_next(input)
}

fn terminating<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::Terminating,
        (header(Rule::TerminatingId, "end"), cut_err(string_line))
            .map(|(id, message)| vec![id, message]),
    )
    .parse_next(input)
}

fn node<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::Node,
        alt((question, branching, terminating, fail.context(Rule::Node)))
            .map(|block| vec![block]),
    )
    .parse_next(input)
}

fn separator(input: &mut Input<'_>) -> PResult<()> {
    alt((
        repeat::<_, _, (), _, _>(1.., blank_line),
        (space0, eof).void(),
    ))
    .context(Rule::Nodes)
    .parse_next(input)
}

fn nodes<'i>(input: &mut Input<'i>) -> PResult<Pair<'i>> {
    pair(
        Rule::Nodes,
        preceded(
            repeat::<_, _, (), _, _>(0.., blank_line),
            repeat_till(0.., terminated(node, separator), (space0, eof)),
        )
        .map(|(blocks, _): (Vec<Pair<'i>>, _)| blocks),
    )
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const QUEST: &str = "\
question 0
$NAME
What is your name?
? Please tell me your name
- * -> 1

branch 1
2 3
$NAME
Welcome, $NAME.

end 2
Go on, {NAME}.

end 3
Nobody home.
";

    fn rules(pairs: &[Pair<'_>]) -> Vec<Rule> {
        pairs.iter().map(Pair::as_rule).collect()
    }

    #[test]
    fn test_parse_blocks_in_order() {
        let root = NodesParser::parse(QUEST).unwrap();
        assert_eq!(root.as_rule(), Rule::Nodes);
        let blocks: Vec<Rule> = root
            .inner()
            .iter()
            .map(|node| node.inner()[0].as_rule())
            .collect();
        assert_eq!(
            blocks,
            vec![
                Rule::Question,
                Rule::Branching,
                Rule::Terminating,
                Rule::Terminating
            ]
        );
    }

    #[test]
    fn test_question_children() {
        let root = NodesParser::parse(QUEST).unwrap();
        let question = &root.inner()[0].inner()[0];
        assert_eq!(
            rules(question.inner()),
            vec![
                Rule::QuestionId,
                Rule::VariableLine,
                Rule::StringLine,
                Rule::RetryLine,
                Rule::AnswerLine
            ]
        );
        assert_eq!(question.inner()[2].as_str(), "What is your name?\n");
        assert_eq!(question.inner()[3].line(), 4);
    }

    #[test]
    fn test_give_up_line_closes_a_question() {
        let source = "question 0\n$X\nWhat?\n- a -> 1\n! -> 2\n\nend 1\nA\n\nend 2\nB\n";
        let root = NodesParser::parse(source).unwrap();
        let question = &root.inner()[0].inner()[0];
        assert_eq!(
            rules(question.inner()),
            vec![
                Rule::QuestionId,
                Rule::VariableLine,
                Rule::StringLine,
                Rule::AnswerLine,
                Rule::GiveUpLine
            ]
        );
        assert_eq!(question.inner()[4].line(), 5);
    }

    #[test]
    fn test_give_up_line_without_target_is_rejected() {
        let err =
            NodesParser::parse("question 0\n$X\nWhat?\n- a -> 1\n! -> nowhere\n").unwrap_err();
        assert_eq!(err.rule, Rule::GiveUpLine);
        assert_eq!((err.line, err.column), (5, 6));
    }

    #[test]
    fn test_branching_children() {
        let root = NodesParser::parse(QUEST).unwrap();
        let branch = &root.inner()[1].inner()[0];
        assert_eq!(branch.line(), 7);
        assert_eq!(
            rules(branch.inner()),
            vec![
                Rule::BranchingId,
                Rule::IntLine,
                Rule::VariableLine,
                Rule::StringLine
            ]
        );
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let root = NodesParser::parse("end 0\r\nBye").unwrap();
        let end = &root.inner()[0].inner()[0];
        assert_eq!(end.inner()[0].as_str(), "end 0\r\n");
        assert_eq!(end.inner()[1].as_str(), "Bye");
    }

    #[test]
    fn test_leading_and_trailing_blank_lines() {
        let root = NodesParser::parse("\n\n  \nend 4\nBye\n\n\n").unwrap();
        assert_eq!(root.inner().len(), 1);
    }

    #[test]
    fn test_empty_script_has_no_nodes() {
        let root = NodesParser::parse("").unwrap();
        assert!(root.inner().is_empty());
    }

    #[test]
    fn test_question_without_answers_is_rejected() {
        let err = NodesParser::parse("question 0\n$X\nWhat?\n\nend 1\nBye\n").unwrap_err();
        assert_eq!(err.rule, Rule::AnswerLine);
        assert_eq!(err.line, 4);
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_question_without_variable_is_rejected() {
        let err = NodesParser::parse("question 0\nWhat?\n- a -> 1\n").unwrap_err();
        assert_eq!(err.rule, Rule::VariableLine);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_three_branch_targets_are_rejected() {
        let err = NodesParser::parse("branch 0\n1 2 3\n").unwrap_err();
        assert_eq!(err.rule, Rule::IntLine);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unknown_header_is_rejected() {
        let err = NodesParser::parse("end 0\nBye\n\nfinish 1\nBye\n").unwrap_err();
        assert_eq!(err.rule, Rule::Node);
        assert_eq!(err.line, 4);
        assert_eq!(err.source_line, "finish 1");
    }

    #[test]
    fn test_header_without_id_is_rejected() {
        let err = NodesParser::parse("end x\nBye\n").unwrap_err();
        assert_eq!(err.rule, Rule::TerminatingId);
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn test_blocks_need_a_separator() {
        let err = NodesParser::parse("end 0\nBye\nextra words\n").unwrap_err();
        assert_eq!(err.rule, Rule::Nodes);
        assert_eq!(err.line, 3);
    }
}
