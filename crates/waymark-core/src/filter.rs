//! Filter query engine.
//!
//! Compiles a compact textual query into a predicate tree over [`Summary`]
//! values:
//!
//! - `tier:must` - case-insensitive field comparison
//! - `tag:scope:*` - tag match with `*` wildcards over the whole tag
//! - `description:*` - field present / non-empty (the only form for
//!   `description` and `tags`; a value never matches)
//! - `-tag:obsolete` or `NOT tag:obsolete` - negation
//! - `type:behavior AND tier:must` - conjunction (`AND` may be omitted)
//!
//! There is no `OR`, no parentheses and no precedence. Terms are collected
//! into a flat conjunction.
//!
//! ## Unknown Keys
//!
//! A key outside `id`, `type`, `tier`, `tag`, `tags` and `description`
//! parses successfully but never matches, and a warning is logged. Use
//! [`FilterParser::strict`] to reject such keys at parse time instead.

use crate::error::{GuidanceError, Result};
use crate::types::Summary;
use regex::Regex;
use std::fmt;
use tracing::{debug, warn};

/// Summary field addressed by a term key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Type,
    Tier,
    Tag,
    /// `tags` only supports the existence form
    Tags,
    Description,
    Unknown,
}

impl Field {
    fn from_key(key: &str) -> Self {
        match key {
            "id" => Field::Id,
            "type" => Field::Type,
            "tier" => Field::Tier,
            "tag" => Field::Tag,
            "tags" => Field::Tags,
            "description" => Field::Description,
            _ => Field::Unknown,
        }
    }
}

/// A `*` wildcard pattern compiled to an anchored, case-insensitive regex.
#[derive(Debug, Clone)]
struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    fn new(pattern: &str) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&format!("(?i)^{}$", body)).map_err(|e| {
            GuidanceError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(WildcardPattern {
            source: pattern.to_string(),
            regex,
        })
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// An atomic `[-]key:value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct TermNode {
    /// Lower-cased key
    pub key: String,

    /// Value as written; `*` means "field present"
    pub value: String,

    /// True if the term was written with a leading `-`
    pub negated: bool,

    /// True if the key is `tag`
    pub is_tag_key: bool,

    field: Field,
    wildcard: Option<WildcardPattern>,
}

impl TermNode {
    /// Build a term, compiling a wildcard matcher for `tag` values that
    /// contain `*`.
    pub fn new(key: impl Into<String>, value: impl Into<String>, negated: bool) -> Result<Self> {
        let key = key.into().to_lowercase();
        let value = value.into();
        let field = Field::from_key(&key);

        let wildcard = if field == Field::Tag && value != "*" && value.contains('*') {
            Some(WildcardPattern::new(&value)?)
        } else {
            None
        };

        Ok(TermNode {
            is_tag_key: field == Field::Tag,
            key,
            value,
            negated,
            field,
            wildcard,
        })
    }

    /// Returns true if the key is one the engine can evaluate
    pub fn is_recognized(&self) -> bool {
        self.field != Field::Unknown
    }

    /// Returns true if this is an existence check (`key:*`)
    pub fn is_existence_check(&self) -> bool {
        self.value == "*"
    }

    /// Returns true if the key supports comparison against a value.
    /// `tags` and `description` only support the existence form.
    pub fn supports_value(&self) -> bool {
        matches!(self.field, Field::Id | Field::Type | Field::Tier | Field::Tag)
    }

    /// Evaluate the term against a summary.
    pub fn matches(&self, summary: &Summary) -> bool {
        let matched = if self.is_existence_check() {
            match self.field {
                Field::Id => !summary.id.is_empty(),
                Field::Type => !summary.kind.as_str().is_empty(),
                Field::Tier => summary.tier.is_some(),
                Field::Tag | Field::Tags => !summary.tags.is_empty(),
                Field::Description => !summary.description.is_empty(),
                Field::Unknown => {
                    debug!(key = %self.key, "Unrecognized key in existence check");
                    false
                }
            }
        } else {
            match self.field {
                Field::Id => eq_fold(&summary.id, &self.value),
                Field::Type => eq_fold(summary.kind.as_str(), &self.value),
                Field::Tier => summary
                    .tier
                    .map_or(false, |tier| eq_fold(tier.as_str(), &self.value)),
                Field::Tag => summary.tags.iter().any(|tag| self.matches_tag(tag)),
                Field::Tags | Field::Description | Field::Unknown => {
                    debug!(key = %self.key, "Unrecognized key in value check");
                    false
                }
            }
        };

        matched != self.negated
    }

    fn matches_tag(&self, tag: &str) -> bool {
        match &self.wildcard {
            Some(pattern) => pattern.is_match(tag),
            None => eq_fold(tag, &self.value),
        }
    }
}

impl fmt::Display for TermNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.negated { "-" } else { "" };
        write!(f, "{}{}:{}", prefix, self.key, self.value)
    }
}

/// A node in the filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// Atomic comparison or existence check
    Term(TermNode),

    /// Conjunction; short-circuits, and is true when empty
    And(Vec<FilterNode>),

    /// Negation of a single node
    Not(Box<FilterNode>),
}

impl FilterNode {
    /// Evaluate this node against a summary.
    pub fn matches(&self, summary: &Summary) -> bool {
        match self {
            FilterNode::Term(term) => term.matches(summary),
            FilterNode::And(children) => children.iter().all(|child| child.matches(summary)),
            FilterNode::Not(child) => !child.matches(summary),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Term(term) => write!(f, "{}", term),
            FilterNode::And(children) => {
                let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(" AND "))
            }
            FilterNode::Not(child) => write!(f, "NOT {}", child),
        }
    }
}

/// Evaluate an optional filter; `None` matches everything.
pub fn evaluate(node: Option<&FilterNode>, summary: &Summary) -> bool {
    node.map_or(true, |n| n.matches(summary))
}

/// Ids of the summaries accepted by `filter`, in input order.
pub fn select_ids(summaries: &[Summary], filter: Option<&FilterNode>) -> Vec<String> {
    summaries
        .iter()
        .filter(|s| evaluate(filter, s))
        .map(|s| s.id.clone())
        .collect()
}

/// Parse a query with the default (lenient) parser.
///
/// Returns `Ok(None)` for an empty or whitespace-only query.
pub fn parse_filter(query: &str) -> Result<Option<FilterNode>> {
    FilterParser::new().parse(query)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// A term or `NOT` must come next
    ExpectTerm,
    /// `AND`, `NOT`, a term (implicit AND) or end of input
    ExpectOperator,
}

/// Filter query parser.
#[derive(Debug, Clone, Default)]
pub struct FilterParser {
    strict: bool,
}

impl FilterParser {
    /// Create a lenient parser: unknown keys parse and never match.
    pub fn new() -> Self {
        FilterParser { strict: false }
    }

    /// Create a strict parser: unknown keys are a parse error.
    pub fn strict() -> Self {
        FilterParser { strict: true }
    }

    /// Parse a query string into a filter tree.
    pub fn parse(&self, query: &str) -> Result<Option<FilterNode>> {
        let tokens: Vec<&str> = query.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut nodes = Vec::new();
        let mut state = ParserState::ExpectTerm;
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i];
            let is_and = token.eq_ignore_ascii_case("AND");
            let is_not = token.eq_ignore_ascii_case("NOT");

            match state {
                ParserState::ExpectTerm if is_and => {
                    return Err(GuidanceError::syntax(token, i, "a term or NOT"));
                }
                ParserState::ExpectOperator if is_and => {
                    if i + 1 == tokens.len() {
                        return Err(GuidanceError::syntax(token, i, "a term after 'AND'"));
                    }
                    state = ParserState::ExpectTerm;
                    i += 1;
                }
                _ if is_not => {
                    let Some(&term_token) = tokens.get(i + 1) else {
                        return Err(GuidanceError::syntax(token, i, "a term after 'NOT'"));
                    };
                    let term = self.parse_term(term_token, i + 1)?;
                    if term.negated {
                        return Err(GuidanceError::syntax(
                            term_token,
                            i + 1,
                            "a term without '-' after 'NOT'",
                        ));
                    }
                    nodes.push(FilterNode::Not(Box::new(FilterNode::Term(term))));
                    state = ParserState::ExpectOperator;
                    i += 2;
                }
                ParserState::ExpectTerm => {
                    let term = self.parse_term(token, i)?;
                    nodes.push(FilterNode::Term(term));
                    state = ParserState::ExpectOperator;
                    i += 1;
                }
                ParserState::ExpectOperator => {
                    let term = self.parse_term(token, i).map_err(|err| match err {
                        GuidanceError::FilterSyntax { .. } => {
                            GuidanceError::syntax(token, i, "'AND', 'NOT', or a key:value term")
                        }
                        other => other,
                    })?;
                    nodes.push(FilterNode::Term(term));
                    i += 1;
                }
            }
        }

        let node = match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(FilterNode::And(nodes)),
        };

        if let Some(ref n) = node {
            debug!(query = %query, parsed = %n, "Parsed filter query");
        }

        Ok(node)
    }

    fn parse_term(&self, token: &str, position: usize) -> Result<TermNode> {
        let (negated, body) = match token.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        let (key, value) = match body.split_once(':') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => (key, value),
            _ => {
                return Err(GuidanceError::syntax(
                    token,
                    position,
                    "a term of the form key:value or key:*",
                ))
            }
        };

        let term = TermNode::new(key, value, negated)?;

        if !term.is_recognized() {
            if self.strict {
                return Err(GuidanceError::UnknownFilterKey { key: term.key });
            }
            warn!(key = %term.key, "Unrecognized filter key; term will never match");
        } else if !term.is_existence_check() && !term.supports_value() {
            warn!(key = %term.key, "Key only supports the existence form; term will never match");
        }

        Ok(term)
    }
}

/// Case-insensitive string equality.
fn eq_fold(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}
