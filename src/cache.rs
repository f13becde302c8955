//! C2: evaluator + caches. `eval_cached(program_string, input) -> Value |
//! NoResult`, backed by a function cache (compiled AST) and a program-result
//! cache (evaluation vector over the current example inputs), the latter
//! supporting cache-entry aliasing when the oracle merges an observationally
//! equivalent fragment into an already-kept one.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interp::ast::Expr;
use crate::interp::eval::Interp;
use crate::interp::parser::parse as parse_expr;
use crate::value::{Outcome, Value};

pub struct Evaluator {
    interp: Interp,
    compiled: RefCell<HashMap<String, Option<Rc<Expr>>>>,
    vectors: RefCell<HashMap<String, Rc<Vec<Outcome>>>>,
}

impl Evaluator {
    pub fn new(max_call_depth: usize) -> Self {
        Self {
            interp: Interp::new(max_call_depth),
            compiled: RefCell::new(HashMap::new()),
            vectors: RefCell::new(HashMap::new()),
        }
    }

    /// Clears both caches. Called once at the top of every `synthesize` run
    /// (spec §3, `Lifecycle`): nothing persists across calls.
    pub fn reset(&self) {
        self.compiled.borrow_mut().clear();
        self.vectors.borrow_mut().clear();
    }

    fn compiled_ast(&self, program: &str) -> Option<Rc<Expr>> {
        if let Some(cached) = self.compiled.borrow().get(program) {
            return cached.clone();
        }
        let compiled = parse_expr(program).ok().map(Rc::new);
        self.compiled.borrow_mut().insert(program.to_string(), compiled.clone());
        compiled
    }

    /// `eval_cached(program_string, input) -> Value | NoResult`. Any parse or
    /// evaluation failure collapses to `Outcome::NoResult`.
    pub fn eval_cached(&self, program: &str, input: Option<&Value>) -> Outcome {
        match self.compiled_ast(program) {
            Some(ast) => match self.interp.eval(&ast, input) {
                Ok(v) => Outcome::Ok(v),
                Err(_) => Outcome::NoResult,
            },
            None => Outcome::NoResult,
        }
    }

    /// Like `eval_cached`, but surfaces whether the failure was specifically
    /// a free-variable name error — the equivalence oracle's constant-analysis
    /// step (spec §4.3 step 3) needs to distinguish that case from any other
    /// evaluation failure.
    pub fn eval_probe(&self, program: &str, input: Option<&Value>) -> ProbeOutcome {
        let Some(ast) = self.compiled_ast(program) else {
            return ProbeOutcome::Fail;
        };
        match self.interp.eval(&ast, input) {
            Ok(v) => ProbeOutcome::Ok(v),
            Err(e) if e.is_name_error() => ProbeOutcome::NameError,
            Err(_) => ProbeOutcome::Fail,
        }
    }

    /// Program-result cache, populated lazily on first OE query for `program`
    /// (spec §4.2).
    pub fn eval_vector(&self, program: &str, inputs: &[Value]) -> Rc<Vec<Outcome>> {
        if let Some(v) = self.vectors.borrow().get(program) {
            return v.clone();
        }
        let vector: Rc<Vec<Outcome>> = Rc::new(inputs.iter().map(|x| self.eval_cached(program, Some(x))).collect());
        self.vectors.borrow_mut().insert(program.to_string(), vector.clone());
        vector
    }

    /// Aliases `program`'s cache entry to an already-computed vector, e.g.
    /// when the oracle finds it observationally equivalent to a kept fragment
    /// (spec §4.2, "aliased").
    pub fn alias_vector(&self, program: &str, vector: Rc<Vec<Outcome>>) {
        self.vectors.borrow_mut().insert(program.to_string(), vector);
    }

    pub fn has_cached_vector(&self, program: &str) -> bool {
        self.vectors.borrow().contains_key(program)
    }
}

pub enum ProbeOutcome {
    Ok(Value),
    NameError,
    Fail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_compiled_program_and_vector() {
        let ev = Evaluator::new(256);
        let inputs = vec![Value::Int(0), Value::Int(1)];
        let v1 = ev.eval_vector("input < 1", &inputs);
        assert!(ev.has_cached_vector("input < 1"));
        let v2 = ev.eval_vector("input < 1", &inputs);
        assert!(Rc::ptr_eq(&v1, &v2));
    }

    #[test]
    fn reset_clears_caches() {
        let ev = Evaluator::new(256);
        ev.eval_vector("1 + 1", &[]);
        assert!(ev.has_cached_vector("1 + 1"));
        ev.reset();
        assert!(!ev.has_cached_vector("1 + 1"));
    }

    #[test]
    fn name_error_distinguished_from_other_failures() {
        let ev = Evaluator::new(256);
        assert!(matches!(ev.eval_probe("input", None), ProbeOutcome::NameError));
        assert!(matches!(ev.eval_probe("1 / 0", None), ProbeOutcome::Fail));
    }
}
