//! Recursive-descent parser for the query syntax.

use crate::error::{IndexError, IndexResult};
use crate::query::{Clause, Occur, Query};

/// Characters that end a bare word unless escaped.
const SPECIAL: [char; 5] = ['(', ')', ':', '^', '"'];

/// Maximum nesting of parenthesized groups.
const MAX_DEPTH: usize = 64;

/// Parses query text.
///
/// # Errors
///
/// Returns [`IndexError::Query`] for malformed syntax: unbalanced
/// parentheses, a field without a value, an unterminated phrase, a dangling
/// operator or escape, or an invalid boost.
pub fn parse(input: &str) -> IndexResult<Query> {
    let mut parser = Parser {
        input,
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(IndexError::query(input, "empty query"));
    }
    let query = parser.parse_query(None)?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error("unbalanced ')'"));
    }
    Ok(query)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    None,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

struct Word {
    text: String,
    prefix: bool,
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn parse_query(&mut self, field: Option<&str>) -> IndexResult<Query> {
        let mut clauses: Vec<Clause> = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() || self.peek() == Some(')') {
                break;
            }

            let conjunction = self.conjunction();
            if conjunction != Conjunction::None {
                if clauses.is_empty() {
                    return Err(self.error("operator without a left operand"));
                }
                self.skip_whitespace();
                if self.at_end() || self.peek() == Some(')') {
                    return Err(self.error("operator without a right operand"));
                }
            }

            let modifier = self.modifier();
            if modifier != Modifier::None {
                self.skip_whitespace();
            }

            let mut query = self.parse_primary(field)?;
            if let Some(boost) = self.parse_boost()? {
                query = Query::Boost {
                    query: Box::new(query),
                    boost,
                };
            }

            if conjunction == Conjunction::And {
                if let Some(last) = clauses.last_mut() {
                    if last.occur != Occur::MustNot {
                        last.occur = Occur::Must;
                    }
                }
            }
            let occur = match modifier {
                Modifier::Prohibited => Occur::MustNot,
                Modifier::Required => Occur::Must,
                Modifier::None if conjunction == Conjunction::And => Occur::Must,
                Modifier::None => Occur::Should,
            };
            clauses.push(Clause { occur, query });
        }

        match clauses.len() {
            0 => Err(self.error("expected a query")),
            1 if clauses[0].occur == Occur::Should => Ok(clauses.remove(0).query),
            _ => Ok(Query::Boolean(clauses)),
        }
    }

    fn parse_primary(&mut self, field: Option<&str>) -> IndexResult<Query> {
        match self.peek() {
            Some('(') => self.parse_group(field),
            Some('"') => {
                let text = self.phrase()?;
                Ok(Query::Phrase {
                    field: field.map(str::to_string),
                    text,
                })
            }
            _ => {
                let word = self.word()?;
                if self.peek() == Some(':') {
                    self.pos += 1;
                    let mut name = word.text;
                    if word.prefix {
                        name.push('*');
                    }
                    return self.parse_field_value(&name);
                }
                Ok(value_query(field, word))
            }
        }
    }

    fn parse_field_value(&mut self, name: &str) -> IndexResult<Query> {
        let field = (name != "*").then_some(name);
        match self.peek() {
            None => Err(self.error(&format!("missing value for field {name}"))),
            Some(c) if c.is_whitespace() => {
                Err(self.error(&format!("missing value for field {name}")))
            }
            Some('(') => self.parse_group(field),
            Some('"') => {
                let text = self.phrase()?;
                Ok(Query::Phrase {
                    field: field.map(str::to_string),
                    text,
                })
            }
            Some(_) => {
                let word = self.word()?;
                Ok(value_query(field, word))
            }
        }
    }

    fn parse_group(&mut self, field: Option<&str>) -> IndexResult<Query> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("groups nested too deeply"));
        }
        self.pos += 1;
        let query = self.parse_query(field)?;
        self.skip_whitespace();
        if self.peek() != Some(')') {
            return Err(self.error("missing ')'"));
        }
        self.pos += 1;
        self.depth -= 1;
        Ok(query)
    }

    fn parse_boost(&mut self) -> IndexResult<Option<f32>> {
        if self.peek() != Some('^') {
            return Ok(None);
        }
        self.pos += 1;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        match digits.parse::<f32>() {
            Ok(boost) if boost.is_finite() => Ok(Some(boost)),
            _ => Err(self.error("invalid boost")),
        }
    }

    fn conjunction(&mut self) -> Conjunction {
        if self.eat_symbol("&&") || self.eat_keyword("AND") {
            Conjunction::And
        } else if self.eat_symbol("||") || self.eat_keyword("OR") {
            Conjunction::Or
        } else {
            Conjunction::None
        }
    }

    fn modifier(&mut self) -> Modifier {
        match self.peek() {
            Some('+') => {
                self.pos += 1;
                Modifier::Required
            }
            Some('-' | '!') => {
                self.pos += 1;
                Modifier::Prohibited
            }
            _ if self.eat_keyword("NOT") => Modifier::Prohibited,
            _ => Modifier::None,
        }
    }

    fn phrase(&mut self) -> IndexResult<String> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.next() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated phrase"));
                }
                Some('"') => return Ok(text),
                Some('\\') => match self.next() {
                    Some(c) => text.push(c),
                    None => return Err(self.error("dangling escape")),
                },
                Some(c) => text.push(c),
            }
        }
    }

    fn word(&mut self) -> IndexResult<Word> {
        let mut text = String::new();
        let mut prefix = false;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || SPECIAL.contains(&c) {
                break;
            }
            self.pos += 1;
            if prefix {
                text.push('*');
                prefix = false;
            }
            match c {
                '\\' => match self.next() {
                    Some(escaped) => text.push(escaped),
                    None => return Err(self.error("dangling escape")),
                },
                '*' => prefix = true,
                _ => text.push(c),
            }
        }
        if text.is_empty() && !prefix {
            let message = match self.peek() {
                Some(c) => format!("unexpected '{c}'"),
                None => "unexpected end of query".to_string(),
            };
            return Err(self.error(&message));
        }
        Ok(Word { text, prefix })
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        let len = symbol.chars().count();
        if self.chars.len() < self.pos + len {
            return false;
        }
        let matches = self.chars[self.pos..self.pos + len]
            .iter()
            .copied()
            .eq(symbol.chars());
        if matches {
            self.pos += len;
        }
        matches
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let len = keyword.chars().count();
        let boundary = self.chars.get(self.pos + len).copied();
        let separated = match boundary {
            None => true,
            Some(c) => c.is_whitespace() || c == '(' || c == '"',
        };
        separated && self.eat_symbol(keyword)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, reason: &str) -> IndexError {
        IndexError::query(self.input, format!("{reason} at position {}", self.pos))
    }
}

fn value_query(field: Option<&str>, word: Word) -> Query {
    let field = field.filter(|f| *f != "*").map(str::to_string);
    match (word.prefix, word.text.is_empty()) {
        (true, true) if field.is_none() => Query::MatchAll,
        (true, _) => Query::Prefix {
            field,
            prefix: word.text,
        },
        (false, _) => Query::Term {
            field,
            value: word.text,
        },
    }
}
