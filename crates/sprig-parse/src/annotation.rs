use std::collections::BTreeMap;

use sprig_core::Span;
use tree_sitter::Node;

use crate::{node_span, node_text};

/// A best-effort parsed Java annotation occurrence.
///
/// ## Argument semantics
/// - A single positional argument is stored under `value`.
/// - String and char literals have their quotes stripped; escapes are kept verbatim.
/// - Everything else (class literals, constants, array initialisers) is stored as
///   written, whitespace-trimmed. Use [`array_elements`] to split `{...}` values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAnnotation {
    /// The annotation name as written, without `@` (may be qualified).
    pub name: String,
    pub args: BTreeMap<String, String>,
    pub span: Span,
}

/// Collect all annotations directly under a `modifiers` node.
pub fn collect_annotations(modifiers: Node<'_>, source: &str) -> Vec<ParsedAnnotation> {
    let mut cursor = modifiers.walk();
    let annotations = modifiers
        .named_children(&mut cursor)
        .filter(|child| child.kind().ends_with("annotation"))
        .filter_map(|child| parse_annotation_text(node_text(source, child), node_span(child)))
        .collect();
    annotations
}

/// Parse an annotation from its source text.
///
/// Returns `None` when the text does not start with `@`.
pub fn parse_annotation_text(text: &str, span: Span) -> Option<ParsedAnnotation> {
    let rest = text.trim().strip_prefix('@')?;

    let (name, args_text) = match rest.find('(') {
        Some(open) => (rest[..open].trim(), Some(paren_contents(&rest[open + 1..]))),
        None => (rest.trim(), None),
    };
    // `@ interface` style noise or an empty name is not an annotation use.
    if name.is_empty() || name == "interface" {
        return None;
    }
    let name: String = name.split_whitespace().collect();

    let mut args = BTreeMap::new();
    for segment in args_text.map(split_top_level).unwrap_or_default() {
        if segment.is_empty() {
            continue;
        }
        match split_named_arg(segment) {
            Some((key, value)) => {
                args.insert(key.to_string(), unquote(value));
            }
            None => {
                args.insert("value".to_string(), unquote(segment));
            }
        }
    }

    Some(ParsedAnnotation { name, args, span })
}

/// Split an array initialiser argument (`{"a", "b"}`) into its unquoted elements.
///
/// Non-array values yield a single element, so callers can treat `@X("a")` and
/// `@X({"a"})` alike.
pub fn array_elements(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
    {
        Some(inner) => split_top_level(inner)
            .into_iter()
            .filter(|element| !element.is_empty())
            .map(unquote)
            .collect(),
        None => vec![unquote(trimmed)],
    }
}

/// Tracks nesting and literal state while walking annotation argument text.
#[derive(Default)]
struct Nesting {
    depth: u32,
    quote: Option<char>,
    escaped: bool,
}

impl Nesting {
    /// Feed one character; returns `true` when it sits at the top level outside
    /// any literal.
    fn step(&mut self, ch: char) -> bool {
        if let Some(quote) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == quote {
                self.quote = None;
            }
            return false;
        }

        match ch {
            '"' | '\'' => {
                self.quote = Some(ch);
                false
            }
            '(' | '{' | '[' => {
                self.depth += 1;
                false
            }
            ')' | '}' | ']' => {
                self.depth = self.depth.saturating_sub(1);
                false
            }
            _ => self.depth == 0,
        }
    }
}

/// Text up to the parenthesis closing an already-consumed `(`.
///
/// Unbalanced input takes the rest of the text.
fn paren_contents(input: &str) -> &str {
    let mut nesting = Nesting::default();
    for (idx, ch) in input.char_indices() {
        if ch == ')' && nesting.depth == 0 && nesting.quote.is_none() {
            return input[..idx].trim();
        }
        nesting.step(ch);
    }
    input.trim()
}

fn split_top_level(input: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut nesting = Nesting::default();
    let mut last = 0;
    for (idx, ch) in input.char_indices() {
        if nesting.step(ch) && ch == ',' {
            out.push(input[last..idx].trim());
            last = idx + 1;
        }
    }
    out.push(input[last..].trim());
    out
}

fn split_named_arg(segment: &str) -> Option<(&str, &str)> {
    let mut nesting = Nesting::default();
    let bytes = segment.as_bytes();
    for (idx, ch) in segment.char_indices() {
        if !nesting.step(ch) || ch != '=' {
            continue;
        }
        // Skip `==`, `!=`, `<=`, `>=` inside constant expressions.
        let prev = idx.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(idx + 1).copied();
        if matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || next == Some(b'=') {
            continue;
        }
        let key = segment[..idx].trim();
        if is_ident(key) {
            return Some((key, segment[idx + 1..].trim()));
        }
        return None;
    }
    None
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
}

fn unquote(input: &str) -> String {
    let input = input.trim();
    for quote in ['"', '\''] {
        if input.len() >= 2 && input.starts_with(quote) && input.ends_with(quote) {
            return input[1..input.len() - 1].to_string();
        }
    }
    input.to_string()
}
