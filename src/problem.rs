//! C7: problem/grammar file parser. Splits a problem file into its grammar
//! section and its example table on the `%%` separator line, in the
//! teacher's own two-part-problem-file style (`parser/mod.rs` splitting a
//! SyGuS file into a synth-fun block and a constraint block) — here using the
//! grammar surface syntax of `grammar.rs` instead of s-expressions.

use thiserror::Error;

use crate::grammar::{Grammar, GrammarError};
use crate::value::Value;

#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("grammar section: {0}")]
    Grammar(#[from] GrammarError),
    #[error("missing '%%' separator between grammar and examples")]
    MissingSeparator,
    #[error("malformed example line: {0:?}")]
    MalformedExample(String),
    #[error("malformed literal {0:?} in example line: {1:?}")]
    MalformedLiteral(String, String),
}

#[derive(Debug, Clone)]
pub struct Example {
    pub input: Option<Value>,
    pub output: Value,
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub grammar: Grammar,
    pub examples: Vec<Example>,
}

pub fn parse(text: &str) -> Result<Problem, ProblemError> {
    let (grammar_src, examples_src) = text
        .split_once("\n%%\n")
        .or_else(|| text.split_once("\n%%"))
        .ok_or(ProblemError::MissingSeparator)?;

    let grammar = Grammar::parse(grammar_src)?;

    let mut examples = Vec::new();
    for line in examples_src.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (lhs, rhs) = line
            .split_once("=>")
            .ok_or_else(|| ProblemError::MalformedExample(line.to_string()))?;
        let lhs = lhs.trim();
        let rhs = rhs.trim();
        let output = parse_literal(rhs).ok_or_else(|| ProblemError::MalformedLiteral(rhs.to_string(), line.to_string()))?;
        let input = if lhs == "_" {
            None
        } else {
            Some(parse_literal(lhs).ok_or_else(|| ProblemError::MalformedLiteral(lhs.to_string(), line.to_string()))?)
        };
        examples.push(Example { input, output });
    }

    Ok(Problem { grammar, examples })
}

/// Parses one literal: an int, a float, a quoted string, `True`/`False`, or a
/// bracketed list of literals (recursively). Not the full expression grammar
/// of `interp::parser` — a problem file's example table only ever holds
/// ground values, never expressions.
fn parse_literal(s: &str) -> Option<Value> {
    let s = s.trim();
    if s == "True" {
        return Some(Value::Bool(true));
    }
    if s == "False" {
        return Some(Value::Bool(false));
    }
    if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        if inner.trim().is_empty() {
            return Some(Value::List(Vec::new().into()));
        }
        let mut items = Vec::new();
        for part in split_top_level(inner) {
            items.push(parse_literal(&part)?);
        }
        return Some(Value::List(items.into()));
    }
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        return Some(Value::Str(s[1..s.len() - 1].into()));
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Int(i));
    }
    if let Ok(f) = s.parse::<f64>() {
        return Some(Value::Float(f.into()));
    }
    None
}

/// Splits a comma-separated literal list at depth 0, respecting nested
/// brackets and quoted strings.
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_str: Option<char> = None;
    let mut current = String::new();
    for c in s.chars() {
        match in_str {
            Some(q) => {
                current.push(c);
                if c == q {
                    in_str = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    in_str = Some(c);
                    current.push(c);
                }
                '[' => {
                    depth += 1;
                    current.push(c);
                }
                ']' => {
                    depth -= 1;
                    current.push(c);
                }
                ',' if depth == 0 => {
                    parts.push(current.trim().to_string());
                    current = String::new();
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s1_problem_file() {
        let p = parse("PROGRAM ::= NUM\nNUM ::= 1 | NUM \\s+\\s NUM\n%%\n0 => 2\n").unwrap();
        assert_eq!(p.grammar.start(), "PROGRAM");
        assert_eq!(p.examples.len(), 1);
        assert_eq!(p.examples[0].input, Some(Value::Int(0)));
        assert_eq!(p.examples[0].output, Value::Int(2));
    }

    #[test]
    fn underscore_input_means_no_input() {
        let p = parse("PROGRAM ::= NUM\nNUM ::= 1\n%%\n_ => 1\n").unwrap();
        assert_eq!(p.examples[0].input, None);
    }

    #[test]
    fn parses_list_and_string_and_bool_literals() {
        assert_eq!(parse_literal("[1, 2, 3]"), Some(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)].into())));
        assert_eq!(parse_literal("\"hi\""), Some(Value::Str("hi".into())));
        assert_eq!(parse_literal("True"), Some(Value::Bool(true)));
    }

    #[test]
    fn missing_separator_is_an_error() {
        assert!(matches!(parse("PROGRAM ::= 1\n"), Err(ProblemError::MissingSeparator)));
    }

    #[test]
    fn malformed_example_line_is_an_error() {
        assert!(matches!(
            parse("PROGRAM ::= 1\n%%\nnot an example\n"),
            Err(ProblemError::MalformedExample(_))
        ));
    }
}
