use std::ops::Range;

/// Every rule the script grammar can match. Dispatch on this is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Nodes,
    Node,
    Branching,
    BranchingId,
    Question,
    QuestionId,
    Terminating,
    TerminatingId,
    IntLine,
    StringLine,
    VariableLine,
    RetryLine,
    AnswerLine,
    GiveUpLine,
}

impl Rule {
    /// What the parser was looking for when this rule failed to match.
    pub fn expected(self) -> &'static str {
        match self {
            Rule::Nodes => "a blank line or end of file after a block",
            Rule::Node => "a `question <id>`, `branch <id>` or `end <id>` header",
            Rule::Branching => "a branch block",
            Rule::BranchingId => "a `branch <id>` header",
            Rule::Question => "a question block",
            Rule::QuestionId => "a `question <id>` header",
            Rule::Terminating => "an end block",
            Rule::TerminatingId => "an `end <id>` header",
            Rule::IntLine => "a line with one or two node ids",
            Rule::StringLine => "a non-empty text line",
            Rule::VariableLine => "a `$NAME` variable line",
            Rule::RetryLine => "a `? <prompt>` retry line",
            Rule::AnswerLine => "an answer line `- <answer> -> <id>`",
            Rule::GiveUpLine => "a give-up line `! -> <id>`",
        }
    }
}

/// A matched rule: its text, where it starts, and the rules matched inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair<'i> {
    pub(crate) rule: Rule,
    pub(crate) text: &'i str,
    pub(crate) span: Range<usize>,
    pub(crate) line: usize,
    pub(crate) column: usize,
    pub(crate) inner: Vec<Pair<'i>>,
}

impl<'i> Pair<'i> {
    pub fn as_rule(&self) -> Rule {
        self.rule
    }

    /// The exact matched source text, including any line terminator.
    pub fn as_str(&self) -> &'i str {
        self.text
    }

    /// Byte range within the script.
    pub fn as_span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// 1-based line of the first matched character.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn inner(&self) -> &[Pair<'i>] {
        &self.inner
    }

    pub fn into_inner(self) -> Pairs<'i> {
        Pairs {
            iter: self.inner.into_iter(),
        }
    }

    pub(crate) fn locate(&mut self, index: &LineIndex) {
        let (line, column) = index.line_col(self.span.start);
        self.line = line;
        self.column = column;
        for child in &mut self.inner {
            child.locate(index);
        }
    }
}

/// Iterator over the children of a [`Pair`], in source order.
#[derive(Debug)]
pub struct Pairs<'i> {
    iter: std::vec::IntoIter<Pair<'i>>,
}

impl<'i> Iterator for Pairs<'i> {
    type Item = Pair<'i>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl ExactSizeIterator for Pairs<'_> {}

/// Maps byte offsets to line/column positions.
pub(crate) struct LineIndex<'s> {
    source: &'s str,
    starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    pub(crate) fn new(source: &'s str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, starts }
    }

    pub(crate) fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let start = self.starts[line];
        let column = self.source[start..offset].chars().count() + 1;
        (line + 1, column)
    }

    /// Text of the 1-based `line` without its terminator.
    pub(crate) fn line_text(&self, line: usize) -> &'s str {
        let start = self.starts[line - 1];
        let end = self
            .starts
            .get(line)
            .copied()
            .unwrap_or(self.source.len());
        self.source[start..end].trim_end_matches(['\r', '\n'])
    }
}
