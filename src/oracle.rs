//! C3: equivalence oracle. Implements the five-step decision procedure of
//! `spec.md` §4.3 exactly in order, plus the rewash routine that activates
//! full OE checking at stratum `h = D`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::cache::{Evaluator, ProbeOutcome};
use crate::interp::parser::parse as parse_expr;
use crate::value::{Outcome, Value};
use crate::{debg, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Redundant,
}

pub struct Oracle {
    evaluator: Rc<Evaluator>,
    inputs: Vec<Value>,
    /// Downgraded to `false` for the rest of the run on any solver failure
    /// (spec §7, "Solver errors").
    prove: Cell<bool>,
    /// "Add on first sight" (spec §9 open question 1): every fragment whose
    /// constant-analysis probe succeeds is registered here, whether or not it
    /// turned out to be redundant.
    seen_constants: RefCell<Vec<Value>>,
}

impl Oracle {
    pub fn new(evaluator: Rc<Evaluator>, inputs: Vec<Value>, prove: bool) -> Self {
        Self {
            evaluator,
            inputs,
            prove: Cell::new(prove),
            seen_constants: RefCell::new(Vec::new()),
        }
    }

    pub fn prove_enabled(&self) -> bool {
        self.prove.get()
    }

    /// Runs the full five-step procedure unconditionally. Callers below the
    /// OE threshold `D` should use `decide_with_threshold` instead.
    pub fn decide(&self, candidate: &str, kept: &[String]) -> Decision {
        // Step 1: callable check.
        let probe = self.evaluator.eval_probe(candidate, None);
        if let ProbeOutcome::Ok(v) = &probe {
            if v.is_callable() {
                debg!("oracle: {} is callable, keeping unconditionally", candidate);
                return Decision::Keep;
            }
        }

        // Step 2: literal duplication.
        if kept.iter().any(|k| k == candidate) {
            debg!("oracle: {} is a literal duplicate", candidate);
            return Decision::Redundant;
        }

        // Step 3: constant analysis (only when `candidate` never mentions `input`).
        if !candidate.contains("input") {
            match probe {
                ProbeOutcome::Ok(v) => {
                    let mut seen = self.seen_constants.borrow_mut();
                    if seen.iter().any(|c| c == &v) {
                        return Decision::Redundant;
                    }
                    seen.push(v);
                    return Decision::Keep;
                }
                ProbeOutcome::NameError => {
                    // Free variable under an unclosed lambda binder: the
                    // constant path is inapplicable, fall through to step 4.
                }
                ProbeOutcome::Fail => {
                    // Any other evaluation failure likewise can't be
                    // classified as a constant; fall through.
                }
            }
        }

        // Step 4: observational equivalence.
        let vector = self.evaluator.eval_vector(candidate, &self.inputs);
        for k in kept {
            let kvector = self.evaluator.eval_vector(k, &self.inputs);
            if vectors_equivalent(&vector, &kvector) {
                self.evaluator.alias_vector(candidate, kvector.clone());
                debg!("oracle: {} is observationally equivalent to {}", candidate, k);
                return Decision::Redundant;
            }
        }

        // Step 5: symbolic equivalence (opt-in).
        if self.prove.get() {
            if let Ok(e1) = parse_expr(candidate) {
                for k in kept {
                    let Ok(e2) = parse_expr(k) else { continue };
                    match crate::smt::equivalent(&e1, &e2) {
                        Ok(true) => {
                            debg!("oracle: {} proved equivalent to {} via SMT", candidate, k);
                            return Decision::Redundant;
                        }
                        Ok(false) => {}
                        Err(_) => {
                            warn!("oracle: SMT translation failed, downgrading prove for the rest of the run");
                            self.prove.set(false);
                            break;
                        }
                    }
                }
            }
        }

        Decision::Keep
    }

    /// Spec §4.3 `Threshold`: below `D`, skip straight to step 2 (literal
    /// duplication only — "all non-duplicate fragments kept"); at or above
    /// `D`, run the full procedure.
    pub fn decide_with_threshold(&self, candidate: &str, kept: &[String], height: u32, d: i64) -> Decision {
        if oe_active(height, d) {
            self.decide(candidate, kept)
        } else if kept.iter().any(|k| k == candidate) {
            Decision::Redundant
        } else {
            Decision::Keep
        }
    }
}

pub fn oe_active(height: u32, d: i64) -> bool {
    d >= 0 && (height as i64) >= d
}

/// Pointwise vector equality with the `NoResult ≠ anything, including itself`
/// rule (spec §3, `Evaluation vector`).
pub fn vectors_equivalent(a: &[Outcome], b: &[Outcome]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| {
        if x.is_no_result() || y.is_no_result() {
            false
        } else {
            x == y
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle_with(inputs: Vec<Value>) -> Oracle {
        Oracle::new(Rc::new(Evaluator::new(256)), inputs, false)
    }

    #[test]
    fn literal_duplicate_is_redundant() {
        let o = oracle_with(vec![Value::Int(0)]);
        assert_eq!(o.decide("1 + 1", &["1 + 1".to_string()]), Decision::Redundant);
    }

    #[test]
    fn observationally_equivalent_fragment_is_redundant() {
        let o = oracle_with(vec![Value::Int(3)]);
        assert_eq!(o.decide("1 + 1", &["2".to_string()]), Decision::Redundant);
    }

    #[test]
    fn distinct_fragments_are_kept() {
        let o = oracle_with(vec![Value::Int(0), Value::Int(1)]);
        assert_eq!(o.decide("input", &["input < 1".to_string()]), Decision::Keep);
    }

    #[test]
    fn callable_fragments_are_always_kept() {
        let o = oracle_with(vec![Value::Int(0)]);
        assert_eq!(
            o.decide("lambda x: x", &["lambda y: y".to_string()]),
            Decision::Keep
        );
    }

    #[test]
    fn constants_dedup_add_on_first_sight() {
        let o = oracle_with(vec![Value::Int(0)]);
        assert_eq!(o.decide("1 + 1", &[]), Decision::Keep);
        assert_eq!(o.decide("2", &["1 + 1".to_string()]), Decision::Redundant);
    }

    #[test]
    fn no_result_is_never_equivalent_to_itself() {
        let fail = Outcome::NoResult;
        assert!(!vectors_equivalent(&[fail.clone()], &[Outcome::NoResult]));
    }

    #[test]
    fn below_threshold_only_literal_duplicates_are_pruned() {
        let o = oracle_with(vec![Value::Int(3)]);
        // "2" is OE-equivalent to "1 + 1" but not a literal duplicate, so
        // below the threshold it must be kept.
        assert_eq!(o.decide_with_threshold("1 + 1", &["2".to_string()], 0, 5), Decision::Keep);
        assert_eq!(o.decide_with_threshold("1 + 1", &["2".to_string()], 5, 5), Decision::Redundant);
    }
}
