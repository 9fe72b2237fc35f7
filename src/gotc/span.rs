// Copyright (c) 2025 knix
// All rights reserved.

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SpanId(u32);
impl SpanId {
    pub const NONE: SpanId = SpanId(0);

    pub fn is_none(&self) -> bool {
        *self == SpanId::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub file_id: u32,
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub const NONE: Span = Span { file_id: 0, line: 0, col: 0 };
}

/// Source positions handed over by the parser. Index 0 is the unknown position.
#[derive(Debug, Clone)]
pub struct Spans {
    spans: Vec<Span>,
    files: Vec<String>,
}

impl Default for Spans {
    fn default() -> Self {
        Spans::new()
    }
}

impl Spans {
    pub fn new() -> Spans {
        Spans { spans: vec![Span::NONE], files: vec!["<unknown>".to_string()] }
    }

    pub fn add_file(&mut self, name: impl Into<String>) -> u32 {
        let id = self.files.len();
        self.files.push(name.into());
        id as u32
    }

    pub fn add(&mut self, span: Span) -> SpanId {
        let id = self.spans.len();
        self.spans.push(span);
        SpanId(id as u32)
    }

    pub fn get(&self, id: SpanId) -> Span {
        self.spans[id.0 as usize]
    }

    pub fn file_name(&self, span: Span) -> &str {
        self.files.get(span.file_id as usize).map(|s| s.as_str()).unwrap_or("<unknown>")
    }

    pub fn location(&self, id: SpanId) -> Location<'_> {
        let span = self.get(id);
        Location { file: self.file_name(span), span }
    }
}

pub struct Location<'a> {
    file: &'a str,
    span: Span,
}

impl Display for Location<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.span.col == 0 {
            write!(f, "{}:{}", self.file, self.span.line)
        } else {
            write!(f, "{}:{}:{}", self.file, self.span.line, self.span.col)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn location_display() {
        let mut spans = Spans::new();
        let file = spans.add_file("a.go");
        let s1 = spans.add(Span { file_id: file, line: 3, col: 0 });
        let s2 = spans.add(Span { file_id: file, line: 4, col: 9 });
        assert_eq!(spans.location(s1).to_string(), "a.go:3");
        assert_eq!(spans.location(s2).to_string(), "a.go:4:9");
        assert_eq!(spans.location(SpanId::NONE).to_string(), "<unknown>:0");
    }
}
