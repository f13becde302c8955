//! `synthesize`: the single-threaded cooperative driver (`spec.md` §5). Walks
//! the enumerator's candidate stream one stratum at a time, checking a
//! wall-clock deadline between yields, and re-verifies every example against
//! the first candidate that matches before returning it — mirroring the
//! teacher's own suspension-point-driven solve loop (`forward/executor.rs`)
//! without its async task tree.

use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::cache::Evaluator;
use crate::enumerator::Enumerator;
use crate::grammar::{Grammar, RewriteRule};
use crate::oracle::Oracle;
use crate::problem::Example;
use crate::value::Value;
use crate::{crit, info};

/// Bottom-up synthesis entry point. Returns the first grammar-derivable
/// candidate string that reproduces every example's output, or `None` if the
/// grammar saturates (or `timeout_s`/`depth_limit` is hit) first.
///
/// Per `spec.md` §3 `Lifecycle`, every call gets a fresh `Evaluator` and
/// `Oracle` — nothing persists across calls.
pub fn synthesize(
    grammar: &Grammar,
    examples: &[Example],
    timeout_s: u64,
    prove: bool,
    d: i64,
    depth_limit: Option<u32>,
    trs: Vec<RewriteRule>,
) -> Option<String> {
    let evaluator = Rc::new(Evaluator::new(4096));
    let inputs: Vec<Value> = examples
        .iter()
        .map(|e| e.input.clone().unwrap_or(Value::Int(0)))
        .collect();
    let oracle = Oracle::new(evaluator.clone(), inputs.clone(), prove);
    let mut enumerator = Enumerator::new(grammar, oracle, trs, d, depth_limit);

    // spec.md §8 boundary behavior: `timeout ≤ 0` means run without a deadline.
    let deadline = (timeout_s > 0).then(|| Instant::now() + Duration::from_secs(timeout_s));
    let mut checked = 0usize;

    loop {
        if deadline.is_some_and(|dl| Instant::now() >= dl) {
            crit!("synthesize: timed out after checking {} candidate(s)", checked);
            return None;
        }
        let Some(candidate) = enumerator.next() else {
            info!("synthesize: grammar saturated after checking {} candidate(s)", checked);
            return None;
        };
        checked += 1;
        if satisfies_all(&evaluator, &candidate, examples) {
            info!("synthesize: found {} after checking {} candidate(s)", candidate, checked);
            return Some(candidate);
        }
    }
}

fn satisfies_all(evaluator: &Evaluator, candidate: &str, examples: &[Example]) -> bool {
    if examples.is_empty() {
        return true;
    }
    examples.iter().all(|ex| {
        let outcome = evaluator.eval_cached(candidate, ex.input.as_ref());
        matches!(outcome.value(), Some(v) if v == &ex.output)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use crate::problem;

    #[test]
    fn synthesizes_s1_doubling_program() {
        let p = problem::parse("PROGRAM ::= NUM\nNUM ::= 1 | NUM \\s+\\s NUM\n%%\n0 => 2\n").unwrap();
        let result = synthesize(&p.grammar, &p.examples, 5, false, 0, Some(3), Vec::new());
        assert!(result.is_some());
        let found = result.unwrap();
        assert_eq!(found.replace(' ', ""), "1+1");
    }

    #[test]
    fn no_examples_returns_first_ground_candidate() {
        let g = Grammar::parse("PROGRAM ::= NUM\nNUM ::= 1 | 2").unwrap();
        let result = synthesize(&g, &[], 5, false, 0, Some(0), Vec::new());
        assert_eq!(result, Some("1".to_string()));
    }

    #[test]
    fn unsatisfiable_within_depth_limit_returns_none() {
        let g = Grammar::parse("PROGRAM ::= NUM\nNUM ::= 1").unwrap();
        let p = problem::parse("PROGRAM ::= NUM\nNUM ::= 1\n%%\n_ => 2\n").unwrap();
        let result = synthesize(&g, &p.examples, 2, false, 0, Some(2), Vec::new());
        assert_eq!(result, None);
    }

    #[test]
    fn zero_timeout_runs_without_a_deadline() {
        let p = problem::parse("PROGRAM ::= NUM\nNUM ::= 1 | NUM \\s+\\s NUM\n%%\n0 => 2\n").unwrap();
        let result = synthesize(&p.grammar, &p.examples, 0, false, 0, Some(3), Vec::new());
        assert!(result.is_some());
    }
}
