//! C4: the enumerator. Bottom-up expansion by height, short-circuiting over
//! unit productions, and threshold-driven OE/rewash — all exposed as a plain
//! `Iterator<Item = String>` over `PROGRAM` candidates, matching the
//! single-threaded cooperative generator model of `spec.md` §5 (the teacher's
//! own round-based size-stratified loop in `forward/executor.rs::run()`,
//! reimplemented without its async task machinery).

use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::cache::Evaluator;
use crate::grammar::{candidate_string, ground_expressions_all, Fragment, Grammar, RewriteRule};
use crate::oracle::{Decision, Oracle};
use crate::{debg, info};

/// Insertion-ordered `(fragment, TRS-canonicalized candidate string)` pairs
/// for one non-terminal: `instances[N]` and `instances_joined[N]` in lockstep.
#[derive(Default, Clone)]
struct NtPool(IndexMap<Fragment, String>);

impl NtPool {
    fn contains_fragment(&self, f: &Fragment) -> bool {
        self.0.contains_key(f)
    }

    fn joined_strings(&self) -> impl Iterator<Item = &String> {
        self.0.values()
    }

    fn insert(&mut self, f: Fragment, s: String) -> bool {
        if self.0.contains_key(&f) {
            false
        } else {
            self.0.insert(f, s);
            true
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&Fragment, &String)> {
        self.0.iter()
    }
}

use crate::rewrite::apply as apply_trs;

pub struct Enumerator<'g> {
    grammar: &'g Grammar,
    oracle: Oracle,
    trs: Vec<RewriteRule>,
    d: i64,
    depth_limit: Option<u32>,
    instances: IndexMap<String, NtPool>,
    height: u32,
    pending: VecDeque<String>,
    exhausted: bool,
}

impl<'g> Enumerator<'g> {
    pub fn new(
        grammar: &'g Grammar,
        oracle: Oracle,
        trs: Vec<RewriteRule>,
        d: i64,
        depth_limit: Option<u32>,
    ) -> Self {
        let mut instances: IndexMap<String, NtPool> = grammar
            .nonterminals
            .iter()
            .cloned()
            .map(|nt| (nt, NtPool::default()))
            .collect();

        let ground = ground_expressions_all(grammar);
        let mut pending = VecDeque::new();
        for nt in &grammar.nonterminals {
            let Some(fragments) = ground.get(nt) else { continue };
            let pool = instances.entry(nt.clone()).or_default();
            for frag in fragments {
                let joined = apply_trs(&candidate_string(frag), &trs);
                if pool.insert(frag.clone(), joined.clone()) && nt == grammar.start() {
                    pending.push_back(joined);
                }
            }
        }

        info!("enumerator: seeded {} ground fragment(s) across {} non-terminal(s)", ground.values().map(|s| s.len()).sum::<usize>(), instances.len());

        Self {
            grammar,
            oracle,
            trs,
            d,
            depth_limit,
            instances,
            height: 0,
            pending,
            exhausted: false,
        }
    }

    fn expand_rule(&self, rule: &crate::grammar::Rule) -> Vec<Fragment> {
        let mut options: Vec<Vec<Fragment>> = Vec::with_capacity(rule.rhs.len());
        for tok in &rule.rhs {
            if self.grammar.is_nonterminal(tok) {
                let opts: Vec<Fragment> = self
                    .instances
                    .get(tok)
                    .map(|p| p.0.keys().cloned().collect())
                    .unwrap_or_default();
                options.push(opts);
            } else {
                options.push(vec![vec![tok.clone()]]);
            }
        }

        let mut results: Vec<Fragment> = vec![Vec::new()];
        for opt in options {
            if opt.is_empty() {
                return Vec::new();
            }
            let mut next = Vec::with_capacity(results.len() * opt.len());
            for existing in &results {
                for choice in &opt {
                    let mut combined = existing.clone();
                    combined.extend(choice.iter().cloned());
                    next.push(combined);
                }
            }
            results = next;
        }
        results
    }

    fn rewash(&mut self) {
        info!("enumerator: rewashing instance pool at height {}", self.height);
        let nts: Vec<String> = self.instances.keys().cloned().collect();
        for nt in nts {
            let old = self.instances.get(&nt).cloned().unwrap_or_default();
            let mut fresh = NtPool::default();
            for (frag, joined) in old.iter() {
                let kept: Vec<String> = fresh.joined_strings().cloned().collect();
                if self.oracle.decide(joined, &kept) == Decision::Keep {
                    fresh.insert(frag.clone(), joined.clone());
                }
            }
            self.instances.insert(nt, fresh);
        }
    }

    /// Drives exactly one round (height `self.height + 1`), pushing any
    /// `PROGRAM` emissions into `self.pending`. Returns `true` if any
    /// non-terminal gained a new fragment (grammar not yet saturated).
    fn run_round(&mut self) -> bool {
        self.height += 1;
        if self.height as i64 == self.d {
            self.rewash();
        }

        let mut new_values: IndexMap<String, NtPool> = IndexMap::new();

        for rule in &self.grammar.rules {
            let raw_candidates = self.expand_rule(rule);
            for frag in raw_candidates {
                if self
                    .instances
                    .get(&rule.lhs)
                    .map_or(false, |p| p.contains_fragment(&frag))
                {
                    continue;
                }
                let joined = apply_trs(&candidate_string(&frag), &self.trs);

                let mut kept: Vec<String> = self
                    .instances
                    .get(&rule.lhs)
                    .map(|p| p.joined_strings().cloned().collect())
                    .unwrap_or_default();
                if let Some(p) = new_values.get(&rule.lhs) {
                    kept.extend(p.joined_strings().cloned());
                }

                let decision = self.oracle.decide_with_threshold(&joined, &kept, self.height, self.d);
                if decision == Decision::Keep {
                    let pool = new_values.entry(rule.lhs.clone()).or_default();
                    if pool.insert(frag, joined.clone()) && rule.lhs == self.grammar.start() {
                        self.pending.push_back(joined);
                    }
                }
            }
        }

        let extra = self.short_circuit(&new_values);

        let mut any_new = false;
        for (nt, pool) in new_values {
            any_new |= !pool.0.is_empty();
            let dest = self.instances.entry(nt).or_default();
            for (frag, joined) in pool.0 {
                dest.insert(frag, joined);
            }
        }
        for (nt, pool) in extra {
            any_new |= !pool.0.is_empty();
            let dest = self.instances.entry(nt).or_default();
            for (frag, joined) in pool.0 {
                dest.insert(frag, joined);
            }
        }

        debg!("enumerator: height {} produced new fragments: {}", self.height, any_new);
        any_new
    }

    /// Spec §4.4 step 6: fold new values along unit-production chains so a
    /// trivial non-terminal rename doesn't cost a whole extra height. Only
    /// valid when the unit rule's LHS has no sibling production (spec §9,
    /// "Short-circuit correctness").
    fn short_circuit(&mut self, new_values: &IndexMap<String, NtPool>) -> IndexMap<String, NtPool> {
        let mut extra: IndexMap<String, NtPool> = IndexMap::new();
        loop {
            let mut changed = false;
            for rule in &self.grammar.rules {
                if rule.rhs.len() != 1 || !self.grammar.is_nonterminal(&rule.rhs[0]) {
                    continue;
                }
                if self.grammar.rules_for(&rule.lhs).count() != 1 {
                    continue;
                }
                let target = &rule.rhs[0];
                let mut additions: Vec<(Fragment, String)> = Vec::new();
                if let Some(p) = new_values.get(target) {
                    additions.extend(p.0.iter().map(|(f, s)| (f.clone(), s.clone())));
                }
                if let Some(p) = extra.get(target) {
                    additions.extend(p.0.iter().map(|(f, s)| (f.clone(), s.clone())));
                }
                if additions.is_empty() {
                    continue;
                }
                let dest = extra.entry(rule.lhs.clone()).or_default();
                for (frag, joined) in additions {
                    if self.instances.get(&rule.lhs).map_or(false, |p| p.contains_fragment(&frag)) {
                        continue;
                    }
                    if dest.insert(frag, joined.clone()) {
                        changed = true;
                        if rule.lhs == self.grammar.start() {
                            self.pending.push_back(joined);
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        extra
    }
}

impl<'g> Iterator for Enumerator<'g> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(s) = self.pending.pop_front() {
                return Some(s);
            }
            if self.exhausted {
                return None;
            }
            if let Some(limit) = self.depth_limit {
                if self.height >= limit {
                    self.exhausted = true;
                    return None;
                }
            }
            if !self.run_round() {
                self.exhausted = true;
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn make_enumerator(grammar: &Grammar, d: i64, depth_limit: Option<u32>) -> Enumerator<'_> {
        let evaluator = Rc::new(Evaluator::new(256));
        let oracle = Oracle::new(evaluator, vec![Value::Int(0)], false);
        Enumerator::new(grammar, oracle, Vec::new(), d, depth_limit)
    }

    #[test]
    fn depth_limit_zero_only_yields_ground_expressions() {
        let g = Grammar::parse("PROGRAM ::= NUM\nNUM ::= 1 | NUM \\s+\\s NUM").unwrap();
        let e = make_enumerator(&g, -1, Some(0));
        let all: Vec<String> = e.collect();
        assert_eq!(all, vec!["1".to_string()]);
    }

    #[test]
    fn enumerates_in_height_order_for_s1() {
        let g = Grammar::parse("PROGRAM ::= NUM\nNUM ::= 1 | NUM \\s+\\s NUM").unwrap();
        let e = make_enumerator(&g, -1, Some(1));
        let all: Vec<String> = e.collect();
        assert!(all.contains(&"1".to_string()));
        assert!(all.iter().any(|s| s.replace(' ', "") == "1+1"));
    }

    #[test]
    fn short_circuit_propagates_unit_productions_same_round() {
        let g = Grammar::parse("PROGRAM ::= A\nA ::= B\nB ::= 1 | B \\+ B").unwrap();
        let e = make_enumerator(&g, -1, Some(1));
        let all: Vec<String> = e.collect();
        // B's height-1 fragment ("1+1") should reach PROGRAM in the same
        // round via the unit-production short-circuit, not a second round.
        assert!(all.iter().any(|s| s.replace(' ', "") == "1+1"));
    }
}
