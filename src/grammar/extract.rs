//! Pull typed payloads out of matched pairs.

use crate::error::{Error, Result, SyntaxError};
use crate::machine::NodeId;

use super::{Pair, Rule};

/// Trim either \n or \r\n from the end of a string.
pub fn trim_whitespace(s: &str) -> String {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
        .to_owned()
}

fn expect_rule(pair: &Pair<'_>, expected: Rule) -> Result<()> {
    if pair.as_rule() == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedRule {
            expected,
            found: pair.as_rule(),
            line: pair.line(),
        })
    }
}

fn invalid_id(pair: &Pair<'_>, raw: &str) -> Error {
    Error::Syntax(SyntaxError {
        rule: pair.as_rule(),
        line: pair.line(),
        column: pair.column(),
        source_line: trim_whitespace(pair.as_str().lines().next().unwrap_or_default()),
        message: format!("'{raw}' is not a valid node id"),
    })
}

fn parse_id(pair: &Pair<'_>, raw: &str) -> Result<NodeId> {
    raw.parse::<NodeId>().map_err(|_| invalid_id(pair, raw))
}

pub fn parse_string_line(pair: &Pair<'_>) -> Result<String> {
    expect_rule(pair, Rule::StringLine)?;
    Ok(trim_whitespace(pair.as_str()))
}

/// Every id on an `int_line`, in order.
pub fn parse_int_line(pair: &Pair<'_>) -> Result<Vec<NodeId>> {
    expect_rule(pair, Rule::IntLine)?;
    pair.as_str()
        .split_whitespace()
        .map(|raw| parse_id(pair, raw))
        .collect()
}

/// The id carried by a block header such as `question 3`.
pub fn parse_node_id(pair: &Pair<'_>, header: Rule) -> Result<NodeId> {
    expect_rule(pair, header)?;
    let raw = pair.as_str().split_whitespace().nth(1).unwrap_or_default();
    parse_id(pair, raw)
}

/// Variable name from a `$NAME` line, without the sigil.
pub fn parse_variable_line(pair: &Pair<'_>) -> Result<String> {
    expect_rule(pair, Rule::VariableLine)?;
    Ok(pair.as_str().trim_end().trim_start_matches('$').to_owned())
}

pub fn parse_retry_line(pair: &Pair<'_>) -> Result<String> {
    expect_rule(pair, Rule::RetryLine)?;
    match pair.inner() {
        [prompt] => parse_string_line(prompt),
        _ => Err(Error::UnexpectedRule {
            expected: Rule::StringLine,
            found: Rule::RetryLine,
            line: pair.line(),
        }),
    }
}

/// `(answer, target)` from a `- answer -> target` line.
pub fn parse_answer_line(pair: &Pair<'_>) -> Result<(String, NodeId)> {
    expect_rule(pair, Rule::AnswerLine)?;
    let body = trim_whitespace(pair.as_str());
    let body = body.strip_prefix('-').unwrap_or(&body).trim_start();
    let (answer, target) = body
        .split_once(" -> ")
        .ok_or_else(|| invalid_id(pair, body))?;
    Ok((answer.to_owned(), parse_id(pair, target.trim())?))
}

/// Target of a `! -> target` line.
pub fn parse_give_up_line(pair: &Pair<'_>) -> Result<NodeId> {
    expect_rule(pair, Rule::GiveUpLine)?;
    let body = trim_whitespace(pair.as_str());
    let target = body.trim_start_matches('!').trim_start().trim_start_matches("->");
    parse_id(pair, target.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::NodesParser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(trim_whitespace("abc\n"), "abc");
        assert_eq!(trim_whitespace("abc\r\n"), "abc");
        assert_eq!(trim_whitespace("abc"), "abc");
        assert_eq!(trim_whitespace("a b\n\n"), "a b\n");
    }

    #[test]
    fn test_extract_question_payloads() {
        let source = "question 12\n$COLOR  \nFavourite colour?\n? Come on, a colour\n- Blue -> 3\n- I mean yellow ->   40\n";
        let root = NodesParser::parse(source).unwrap();
        let question = &root.inner()[0].inner()[0];
        let children = question.inner();

        assert_eq!(parse_node_id(&children[0], Rule::QuestionId).unwrap(), 12);
        assert_eq!(parse_variable_line(&children[1]).unwrap(), "COLOR");
        assert_eq!(parse_string_line(&children[2]).unwrap(), "Favourite colour?");
        assert_eq!(parse_retry_line(&children[3]).unwrap(), "Come on, a colour");
        assert_eq!(
            parse_answer_line(&children[4]).unwrap(),
            ("Blue".to_owned(), 3)
        );
        assert_eq!(
            parse_answer_line(&children[5]).unwrap(),
            ("I mean yellow".to_owned(), 40)
        );
    }

    #[test]
    fn test_extract_give_up_target() {
        let root = NodesParser::parse("question 0\n$X\nWhat?\n- a -> 1\n!->  8 \n").unwrap();
        let question = &root.inner()[0].inner()[0];
        assert_eq!(parse_give_up_line(&question.inner()[4]).unwrap(), 8);
        assert!(parse_give_up_line(&question.inner()[3]).is_err());
    }

    #[test]
    fn test_extract_int_line() {
        let root = NodesParser::parse("branch 1\n7   9\n").unwrap();
        let branch = &root.inner()[0].inner()[0];
        assert_eq!(parse_int_line(&branch.inner()[1]).unwrap(), vec![7, 9]);
    }

    #[test]
    fn test_wrong_rule_is_an_error() {
        let root = NodesParser::parse("end 0\nBye\n").unwrap();
        let end = &root.inner()[0].inner()[0];
        let err = parse_int_line(&end.inner()[1]).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedRule {
                expected: Rule::IntLine,
                found: Rule::StringLine,
                line: 2
            }
        ));
        assert!(parse_node_id(&end.inner()[0], Rule::QuestionId).is_err());
    }
}
