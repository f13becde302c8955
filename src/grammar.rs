//! C1: grammar model — rules, non-terminals, ground-expression seeding.
//!
//! The surface syntax and validation rules mirror `original_source/syntax.py`
//! (`parse_internal` / `parse`) byte-for-byte: auto-spaced punctuation,
//! escape substitution, and the same five grammar-invariant checks.

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use std::fmt;
use thiserror::Error;

lazy_static::lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"^[_A-Z0-9]+$|^[^A-Z]+$").unwrap();
    static ref NONTERMINAL_REGEX: Regex = Regex::new(r"^[_A-Z0-9]*[A-Z]+[_A-Z0-9]*$").unwrap();
}

/// Punctuation that is auto-spaced before whitespace tokenization.
pub const SEPARATION_TOKENS: &[&str] = &[
    "(", ")", ",", "[", "]", "=", "->", ".", "*", "+", "-", "/", "%", ":",
];

const ESCAPES: &[(&str, &str)] = &[
    ("\\s", " "),
    ("\\a", "->"),
    ("\\p", "|"),
    ("\\t", "\t"),
    ("\\n", "\n"),
    ("True", "(1==1)"),
    ("False", "(1==0)"),
];

fn replace_escapes(s: &str) -> String {
    let mut out = s.to_string();
    for (k, v) in ESCAPES {
        out = out.replace(k, v);
    }
    out
}

fn pad_separators(s: &str) -> String {
    let mut out = s.to_string();
    for sep in SEPARATION_TOKENS {
        out = out.replace(sep, &format!(" {} ", sep));
    }
    out
}

/// A fully terminal token sequence; the ordered RHS of some complete derivation.
/// Its flattened concatenation (no separators) is the candidate string.
pub type Fragment = Vec<String>;

pub fn candidate_string(fragment: &[String]) -> String {
    fragment.concat()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub lhs: String,
    pub rhs: Vec<String>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.lhs, self.rhs.join(" "))
    }
}

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("{token} is incorrectly named in rule {rule}. This is an error.")]
    BadToken { token: String, rule: String },
    #[error("{lhs} is incorrectly named in rule {rule}. This is an error.")]
    BadNonTerminal { lhs: String, rule: String },
    #[error("PROGRAM is not defined. This is an error.")]
    MissingProgram,
    #[error("PROGRAM has more than one rule. This is an error.")]
    DuplicateProgram,
    #[error("PROGRAM is defined in right-hand side of rule. This is an error.")]
    ProgramOnRhs,
    #[error("There is no rule for {0}. This is an error.")]
    UndefinedNonTerminal(String),
    #[error("malformed rule line: {0:?}")]
    MalformedLine(String),
}

/// Splits on line breaks and `sep`, pads punctuation, applies escapes, but does
/// not run the grammar-invariant checks — shared by both the grammar parser
/// and the term-rewriting rule parser (with `sep = "->"`).
fn parse_internal(text: &str, sep: &str) -> Result<(Vec<Rule>, IndexSet<String>), GrammarError> {
    let mut rules = Vec::new();
    for line in text.split('\n') {
        if line.trim().is_empty() {
            continue;
        }
        if line.trim().starts_with('#') {
            continue;
        }
        let before_comment = line.split('#').next().unwrap_or("");
        let mut parts = before_comment.splitn(2, sep);
        let lhs_raw = parts
            .next()
            .ok_or_else(|| GrammarError::MalformedLine(line.to_string()))?;
        let rhs_raw = parts
            .next()
            .ok_or_else(|| GrammarError::MalformedLine(line.to_string()))?;
        let lhs = pad_separators(lhs_raw).trim().to_string();
        let rhs = pad_separators(rhs_raw);
        for clause in rhs.split('|') {
            let tokens: Vec<String> = clause.split_whitespace().map(replace_escapes).collect();
            rules.push(Rule {
                lhs: lhs.clone(),
                rhs: tokens,
            });
        }
    }

    let mut nonterminals = IndexSet::new();
    for rule in &rules {
        for token in &rule.rhs {
            if NONTERMINAL_REGEX.is_match(token) {
                nonterminals.insert(token.clone());
            }
        }
        if NONTERMINAL_REGEX.is_match(&rule.lhs) {
            nonterminals.insert(rule.lhs.clone());
        }
    }
    Ok((rules, nonterminals))
}

#[derive(Debug, Clone)]
pub struct Grammar {
    pub rules: Vec<Rule>,
    pub nonterminals: IndexSet<String>,
}

impl Grammar {
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        let (rules, nonterminals) = parse_internal(text, "::=")?;

        for rule in &rules {
            for token in &rule.rhs {
                if !TOKEN_REGEX.is_match(token) {
                    return Err(GrammarError::BadToken {
                        token: token.clone(),
                        rule: rule.to_string(),
                    });
                }
            }
            if !NONTERMINAL_REGEX.is_match(&rule.lhs) {
                return Err(GrammarError::BadNonTerminal {
                    lhs: rule.lhs.clone(),
                    rule: rule.to_string(),
                });
            }
        }
        if !rules.iter().any(|r| r.lhs == "PROGRAM") {
            return Err(GrammarError::MissingProgram);
        }
        if rules.iter().filter(|r| r.lhs == "PROGRAM").count() > 1 {
            return Err(GrammarError::DuplicateProgram);
        }
        if rules.iter().any(|r| r.rhs.iter().any(|t| t == "PROGRAM")) {
            return Err(GrammarError::ProgramOnRhs);
        }
        for nt in &nonterminals {
            if !rules.iter().any(|r| &r.lhs == nt) {
                return Err(GrammarError::UndefinedNonTerminal(nt.clone()));
            }
        }

        Ok(Grammar { rules, nonterminals })
    }

    pub fn rules_for<'a>(&'a self, lhs: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.lhs == lhs)
    }

    pub fn is_nonterminal(&self, token: &str) -> bool {
        self.nonterminals.contains(token)
    }

    pub fn start(&self) -> &str {
        "PROGRAM"
    }
}

/// A compiled term-rewriting rule: a regex pattern over candidate strings and
/// its substitution template (`$1`-style captures are whatever `regex`
/// supports in `Regex::replace`).
pub struct RewriteRule {
    pub pattern: Regex,
    pub template: String,
}

pub fn parse_term_rewriting_rules(text: &str) -> Result<Vec<RewriteRule>, GrammarError> {
    let (rules, _) = parse_internal(text, "->")?;
    let mut out = Vec::with_capacity(rules.len());
    for rule in rules {
        let pattern_text: String = rule.lhs.split_whitespace().map(replace_escapes).collect();
        let pattern = Regex::new(&pattern_text).map_err(|_| GrammarError::MalformedLine(pattern_text.clone()))?;
        let template = rule.rhs.concat();
        out.push(RewriteRule { pattern, template });
    }
    Ok(out)
}

/// Stratum-0 seeding: fragments reachable without ever expanding a rule whose
/// RHS mixes a non-terminal with anything else, computed for every
/// non-terminal in lockstep to a joint fixed point (unit-production chains may
/// cross non-terminals in either direction across rounds of the fixed point).
pub fn ground_expressions_all(grammar: &Grammar) -> IndexMap<String, IndexSet<Fragment>> {
    let mut pool: IndexMap<String, IndexSet<Fragment>> = grammar
        .nonterminals
        .iter()
        .cloned()
        .map(|nt| (nt, IndexSet::new()))
        .collect();

    loop {
        let mut changed = false;
        for rule in &grammar.rules {
            let has_nonterminal = rule.rhs.iter().any(|t| grammar.is_nonterminal(t));
            if !has_nonterminal {
                let frag = rule.rhs.clone();
                if pool.entry(rule.lhs.clone()).or_default().insert(frag) {
                    changed = true;
                }
            } else if rule.rhs.len() == 1 && grammar.is_nonterminal(&rule.rhs[0]) {
                let target = rule.rhs[0].clone();
                let existing: Vec<Fragment> = pool.get(&target).cloned().unwrap_or_default().into_iter().collect();
                let entry = pool.entry(rule.lhs.clone()).or_default();
                for frag in existing {
                    if entry.insert(frag) {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    pool
}

pub fn ground_expressions_for(grammar: &Grammar, start: &str) -> IndexSet<Fragment> {
    ground_expressions_all(grammar).remove(start).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s1_grammar() {
        let g = Grammar::parse("PROGRAM ::= NUM\nNUM ::= 1 | NUM \\s+\\s NUM").unwrap();
        assert!(g.nonterminals.contains("PROGRAM"));
        assert!(g.nonterminals.contains("NUM"));
        assert_eq!(g.rules_for("NUM").count(), 2);
    }

    #[test]
    fn rejects_missing_program() {
        let err = Grammar::parse("NUM ::= 1").unwrap_err();
        assert!(matches!(err, GrammarError::MissingProgram));
    }

    #[test]
    fn rejects_duplicate_program() {
        let err = Grammar::parse("PROGRAM ::= 1\nPROGRAM ::= 2").unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateProgram));
    }

    #[test]
    fn rejects_program_on_rhs() {
        let err = Grammar::parse("PROGRAM ::= NUM\nNUM ::= PROGRAM").unwrap_err();
        assert!(matches!(err, GrammarError::ProgramOnRhs));
    }

    #[test]
    fn rejects_undefined_nonterminal() {
        let err = Grammar::parse("PROGRAM ::= NUM").unwrap_err();
        assert!(matches!(err, GrammarError::UndefinedNonTerminal(_)));
    }

    #[test]
    fn escapes_substitute_booleans_and_whitespace() {
        let g = Grammar::parse("PROGRAM ::= True \\s False").unwrap();
        let rule = g.rules_for("PROGRAM").next().unwrap();
        assert_eq!(rule.rhs, vec!["(1==1)".to_string(), " ".to_string(), "(1==0)".to_string()]);
    }

    #[test]
    fn ground_expressions_follow_unit_productions() {
        let g = Grammar::parse("PROGRAM ::= A\nA ::= B\nB ::= 1").unwrap();
        let ground = ground_expressions_for(&g, "PROGRAM");
        assert!(ground.contains(&vec!["1".to_string()]));
    }

    #[test]
    fn term_rewriting_rule_roundtrip() {
        let rules = parse_term_rewriting_rules("1 + 1 -> 2").unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].pattern.is_match("1+1"));
        assert_eq!(rules[0].template, "2");
    }
}
