//! GraphQL-over-HTTP envelopes and document classification.

#[cfg(test)]
#[path = "graphql_test.rs"]
mod graphql_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A GraphQL operation as posted to the endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(rename = "operationName", default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub variables: Value,
}

impl GraphqlRequest {
    /// Build a request; the operation name is taken from the document when it
    /// declares one.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let operation_name = operation_name(&query);
        Self { query, operation_name, variables: Value::Null }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        OperationKind::of(&self.query)
    }
}

/// A GraphQL response body. `data` may be present alongside `errors`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlResponse {
    #[must_use]
    pub fn from_data(data: Value) -> Self {
        Self { data: Some(data), errors: Vec::new() }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// One entry of a response's `errors` array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "errorType", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: u32,
}

/// Root operation type of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// Classify a document by its first operation definition.
    ///
    /// Fragment definitions are skipped; the `{ ... }` shorthand and documents
    /// with no recognizable keyword are queries.
    #[must_use]
    pub fn of(document: &str) -> Self {
        first_operation(document).map_or(Self::Query, |(kind, _)| kind)
    }
}

/// Name of the first operation definition, if it has one.
#[must_use]
pub fn operation_name(document: &str) -> Option<String> {
    first_operation(document).and_then(|(_, name)| name)
}

fn first_operation(document: &str) -> Option<(OperationKind, Option<String>)> {
    let mut tokens = Tokens::new(document);
    while let Some(token) = tokens.next_top_level() {
        let kind = match token {
            Token::Word(word) if word == "query" => OperationKind::Query,
            Token::Word(word) if word == "mutation" => OperationKind::Mutation,
            Token::Word(word) if word == "subscription" => OperationKind::Subscription,
            Token::Word(word) if word == "fragment" => {
                while let Some(token) = tokens.next_top_level() {
                    if matches!(token, Token::Open) {
                        break;
                    }
                }
                continue;
            }
            Token::Open => return Some((OperationKind::Query, None)),
            Token::Word(_) => continue,
        };
        let name = match tokens.next_top_level() {
            Some(Token::Word(name)) => Some(name),
            _ => None,
        };
        return Some((kind, name));
    }
    None
}

enum Token {
    Word(String),
    Open,
}

/// Minimal scanner that yields only depth-0 names and the first `{` of each
/// top-level selection set, skipping comments, strings and nested content.
struct Tokens<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Tokens<'a> {
    fn new(document: &'a str) -> Self {
        Self { chars: document.chars().peekable() }
    }

    fn next_top_level(&mut self) -> Option<Token> {
        while let Some(c) = self.chars.next() {
            match c {
                '#' => self.skip_comment(),
                '"' => self.skip_string(),
                '{' => {
                    self.skip_block();
                    return Some(Token::Open);
                }
                '(' => self.skip_until(')'),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut word = String::from(c);
                    while let Some(&next) = self.chars.peek() {
                        if next.is_ascii_alphanumeric() || next == '_' {
                            word.push(next);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    return Some(Token::Word(word));
                }
                _ => {}
            }
        }
        None
    }

    fn skip_comment(&mut self) {
        for c in self.chars.by_ref() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_string(&mut self) {
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => {
                    self.chars.next();
                }
                '"' => break,
                _ => {}
            }
        }
    }

    fn skip_until(&mut self, end: char) {
        while let Some(c) = self.chars.next() {
            match c {
                '"' => self.skip_string(),
                c if c == end => break,
                _ => {}
            }
        }
    }

    fn skip_block(&mut self) {
        let mut depth = 1_usize;
        while let Some(c) = self.chars.next() {
            match c {
                '#' => self.skip_comment(),
                '"' => self.skip_string(),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
    }
}
