//! Symbolic equivalence (C3 step 5, opt-in via `prove`). Translates the
//! integer/boolean fragment of the value algebra to SMT-LIB via the `z3`
//! crate — the same solver the original `synthesizer.py` drives through
//! `z3-solver` — and asks whether two candidates agree on every integer
//! input. Any term outside that fragment is a translation failure, which the
//! oracle treats exactly like a solver failure (downgrade `prove`, fall back
//! to OE).

use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, SatResult, Solver};

use crate::interp::ast::{BinOp, Expr, UnOp};

#[derive(Debug)]
pub struct Unsupported;

enum Sym<'ctx> {
    I(Int<'ctx>),
    B(Bool<'ctx>),
}

fn translate<'ctx>(ctx: &'ctx Context, expr: &Expr, input: &Int<'ctx>) -> Result<Sym<'ctx>, Unsupported> {
    match expr {
        Expr::Int(i) => Ok(Sym::I(Int::from_i64(ctx, *i))),
        Expr::Bool(b) => Ok(Sym::B(Bool::from_bool(ctx, *b))),
        Expr::Var(name) if &**name == "input" => Ok(Sym::I(input.clone())),
        Expr::Unary(UnOp::Neg, e) => Ok(Sym::I(-as_int(ctx, e, input)?)),
        Expr::Unary(UnOp::Not, e) => Ok(Sym::B(as_bool(ctx, e, input)?.not())),
        Expr::Unary(UnOp::BitNot, _) => Err(Unsupported),
        Expr::Binary(op, l, r) => translate_binary(ctx, *op, l, r, input),
        Expr::If { cond, then, els } => {
            let c = as_bool(ctx, cond, input)?;
            match (translate(ctx, then, input)?, translate(ctx, els, input)?) {
                (Sym::I(t), Sym::I(e)) => Ok(Sym::I(c.ite(&t, &e))),
                (Sym::B(t), Sym::B(e)) => Ok(Sym::B(c.ite(&t, &e))),
                _ => Err(Unsupported),
            }
        }
        _ => Err(Unsupported),
    }
}

fn as_int<'ctx>(ctx: &'ctx Context, e: &Expr, input: &Int<'ctx>) -> Result<Int<'ctx>, Unsupported> {
    match translate(ctx, e, input)? {
        Sym::I(i) => Ok(i),
        Sym::B(_) => Err(Unsupported),
    }
}

fn as_bool<'ctx>(ctx: &'ctx Context, e: &Expr, input: &Int<'ctx>) -> Result<Bool<'ctx>, Unsupported> {
    match translate(ctx, e, input)? {
        Sym::B(b) => Ok(b),
        Sym::I(_) => Err(Unsupported),
    }
}

fn translate_binary<'ctx>(
    ctx: &'ctx Context,
    op: BinOp,
    l: &Expr,
    r: &Expr,
    input: &Int<'ctx>,
) -> Result<Sym<'ctx>, Unsupported> {
    use BinOp::*;
    match op {
        Add | Sub | Mul | Div | Mod => {
            let (a, b) = (as_int(ctx, l, input)?, as_int(ctx, r, input)?);
            Ok(Sym::I(match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                Div => a.div(&b),
                Mod => a.modulo(&b),
                _ => unreachable!(),
            }))
        }
        Lt | Le | Gt | Ge => {
            let (a, b) = (as_int(ctx, l, input)?, as_int(ctx, r, input)?);
            Ok(Sym::B(match op {
                Lt => a.lt(&b),
                Le => a.le(&b),
                Gt => a.gt(&b),
                Ge => a.ge(&b),
                _ => unreachable!(),
            }))
        }
        Eq | Ne => {
            let (a, b) = (translate(ctx, l, input)?, translate(ctx, r, input)?);
            let eq = match (a, b) {
                (Sym::I(a), Sym::I(b)) => a._eq(&b),
                (Sym::B(a), Sym::B(b)) => a._eq(&b),
                _ => return Err(Unsupported),
            };
            Ok(Sym::B(if op == Eq { eq } else { eq.not() }))
        }
        And | Or => {
            let (a, b) = (as_bool(ctx, l, input)?, as_bool(ctx, r, input)?);
            Ok(Sym::B(if op == And { Bool::and(ctx, &[&a, &b]) } else { Bool::or(ctx, &[&a, &b]) }))
        }
        BitAnd => Err(Unsupported),
    }
}

/// `∀ input. eval(c1, input) = eval(c2, input)` over integer inputs. `Ok(true)`
/// means proved equivalent; `Ok(false)` means proved distinct (or the solver
/// gave up, in which case the oracle still treats it as "not proved" and
/// falls back to OE without downgrading `prove`); `Err` is a genuine
/// translation/solver failure that should downgrade `prove` for the run.
pub fn equivalent(e1: &Expr, e2: &Expr) -> Result<bool, Unsupported> {
    let cfg = Config::new();
    let ctx = Context::new(&cfg);
    let input = Int::new_const(&ctx, "input");
    let s1 = translate(&ctx, e1, &input)?;
    let s2 = translate(&ctx, e2, &input)?;
    let distinct = match (s1, s2) {
        (Sym::I(a), Sym::I(b)) => a._eq(&b).not(),
        (Sym::B(a), Sym::B(b)) => a._eq(&b).not(),
        _ => return Err(Unsupported),
    };
    let solver = Solver::new(&ctx);
    solver.assert(&distinct);
    Ok(solver.check() == SatResult::Unsat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::parser::parse;

    #[test]
    fn proves_arithmetic_identity() {
        let a = parse("input + input").unwrap();
        let b = parse("2 * input").unwrap();
        assert!(equivalent(&a, &b).unwrap());
    }

    #[test]
    fn disproves_distinct_programs() {
        let a = parse("input + 1").unwrap();
        let b = parse("input + 2").unwrap();
        assert!(!equivalent(&a, &b).unwrap());
    }

    #[test]
    fn rejects_unsupported_terms() {
        let a = parse("~input").unwrap();
        let b = parse("input").unwrap();
        assert!(equivalent(&a, &b).is_err());
    }
}
