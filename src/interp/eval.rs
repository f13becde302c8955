//! Tree-walking evaluator: `Expr` + an optional `input` value in, `Value` or
//! an `EvalError` out. `EvalError::NameError` is distinguished from the other
//! variants because the equivalence oracle's constant-analysis step (spec
//! §4.3 step 3) falls through to OE specifically on a free-variable error,
//! not on any failure.

use std::cmp::Ordering;
use std::rc::Rc;

use thiserror::Error;

use super::ast::{BinOp, Expr, ListItem, UnOp};
use crate::utils::F64;
use crate::value::{Builtin, Closure, Env, Value};

#[derive(Debug, Error, Clone)]
pub enum EvalError {
    #[error("name '{0}' is not defined")]
    NameError(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("index out of range: {0}")]
    IndexError(String),
    #[error("wrong number of arguments: {0}")]
    Arity(String),
    #[error("value is not callable: {0}")]
    NotCallable(String),
    #[error("division by zero")]
    DivByZero,
    #[error("integer overflow: {0}")]
    Overflow(String),
    #[error("recursion depth exceeded")]
    DepthExceeded,
}

impl EvalError {
    pub fn is_name_error(&self) -> bool {
        matches!(self, EvalError::NameError(_))
    }
}

const ALL_BUILTINS: &[Builtin] = &[
    Builtin::Z,
    Builtin::Car,
    Builtin::Cdr,
    Builtin::Null,
    Builtin::Cons,
    Builtin::IfThenElse,
    Builtin::FoldL,
    Builtin::FoldR,
    Builtin::Concat,
    Builtin::Sorted,
    Builtin::Len,
    Builtin::List,
    Builtin::Filter,
    Builtin::Map,
    Builtin::Reversed,
    Builtin::Any,
    Builtin::All,
];

/// Environment with the standard library bound, plus `input` if supplied.
/// `eval(c, ⊥)` in the spec (the "no input" probe used by the oracle's
/// callable/constant checks) is `input = None`: any reference to `input`
/// inside `c` then surfaces as a name error, exactly like an unbound
/// lambda-bound variable.
pub fn base_env(input: Option<&Value>) -> Env {
    let mut env = Env::default();
    for b in ALL_BUILTINS {
        env = env.push(Rc::from(b.name()), Value::Native(*b));
    }
    if let Some(v) = input {
        env = env.push(Rc::from("input"), v.clone());
    }
    env
}

pub struct Interp {
    max_depth: usize,
}

impl Interp {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn eval(&self, expr: &Expr, input: Option<&Value>) -> Result<Value, EvalError> {
        let env = base_env(input);
        self.eval_expr(expr, &env, 0)
    }

    fn eval_expr(&self, expr: &Expr, env: &Env, depth: usize) -> Result<Value, EvalError> {
        if depth > self.max_depth {
            return Err(EvalError::DepthExceeded);
        }
        match expr {
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(F64::new(*f))),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Var(name) => env
                .lookup(name)
                .ok_or_else(|| EvalError::NameError(name.to_string())),
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ListItem::Elem(e) => out.push(self.eval_expr(e, env, depth)?),
                        ListItem::Spread(e) => match self.eval_expr(e, env, depth)? {
                            Value::List(l) => out.extend(l.iter().cloned()),
                            other => {
                                return Err(EvalError::TypeError(format!(
                                    "cannot spread a {}",
                                    other.type_name()
                                )))
                            }
                        },
                    }
                }
                Ok(Value::List(out.into()))
            }
            Expr::Unary(op, inner) => {
                let v = self.eval_expr(inner, env, depth)?;
                eval_unary(*op, v)
            }
            Expr::Binary(BinOp::And, l, r) => {
                let lv = self.eval_expr(l, env, depth)?;
                if !lv.truthy() {
                    Ok(lv)
                } else {
                    self.eval_expr(r, env, depth)
                }
            }
            Expr::Binary(BinOp::Or, l, r) => {
                let lv = self.eval_expr(l, env, depth)?;
                if lv.truthy() {
                    Ok(lv)
                } else {
                    self.eval_expr(r, env, depth)
                }
            }
            Expr::Binary(op, l, r) => {
                let lv = self.eval_expr(l, env, depth)?;
                let rv = self.eval_expr(r, env, depth)?;
                eval_binary(*op, lv, rv)
            }
            Expr::Index(base, idx) => {
                let b = self.eval_expr(base, env, depth)?;
                let i = self.eval_expr(idx, env, depth)?;
                eval_index(b, i)
            }
            Expr::Slice(base, lo, hi) => {
                let b = self.eval_expr(base, env, depth)?;
                let lo = lo.as_ref().map(|e| self.eval_expr(e, env, depth)).transpose()?;
                let hi = hi.as_ref().map(|e| self.eval_expr(e, env, depth)).transpose()?;
                eval_slice(b, lo, hi)
            }
            Expr::If { cond, then, els } => {
                if self.eval_expr(cond, env, depth)?.truthy() {
                    self.eval_expr(then, env, depth)
                } else {
                    self.eval_expr(els, env, depth)
                }
            }
            Expr::Lambda { params, body } => Ok(Value::Closure(Rc::new(Closure {
                params: params.clone(),
                body: Rc::new((**body).clone()),
                env: env.clone(),
            }))),
            Expr::Call { func, args } => {
                let f = self.eval_expr(func, env, depth)?;
                let mut vals = Vec::with_capacity(args.len());
                for a in args {
                    vals.push(self.eval_expr(a, env, depth)?);
                }
                self.apply(&f, vals, depth + 1)
            }
            Expr::Comprehension { expr, var, iter, cond } => {
                let iterable = self.eval_expr(iter, env, depth)?;
                let Value::List(items) = iterable else {
                    return Err(EvalError::TypeError("comprehension source is not a list".into()));
                };
                let mut out = Vec::new();
                for item in items.iter() {
                    let child = env.push(var.clone(), item.clone());
                    if let Some(cond) = cond {
                        if !self.eval_expr(cond, &child, depth)?.truthy() {
                            continue;
                        }
                    }
                    out.push(self.eval_expr(expr, &child, depth)?);
                }
                Ok(Value::List(out.into()))
            }
        }
    }

    pub fn apply(&self, callee: &Value, args: Vec<Value>, depth: usize) -> Result<Value, EvalError> {
        if depth > self.max_depth {
            return Err(EvalError::DepthExceeded);
        }
        match callee {
            Value::Closure(c) => {
                if args.len() != c.params.len() {
                    return Err(EvalError::Arity(format!(
                        "expected {} arguments, got {}",
                        c.params.len(),
                        args.len()
                    )));
                }
                let mut env = c.env.clone();
                for (p, a) in c.params.iter().zip(args) {
                    env = env.push(p.clone(), a);
                }
                self.eval_expr(&c.body, &env, depth)
            }
            Value::Native(b) => self.apply_builtin(*b, args, depth),
            Value::Fix(g) => {
                // z(g)(args) = g(z(g))(args), re-derived on every call — the
                // eager analogue of the source's deferred `rec(rec)` self-application.
                let forced = self.apply(g, vec![Value::Fix(g.clone())], depth)?;
                self.apply(&forced, args, depth)
            }
            other => Err(EvalError::NotCallable(format!("{:?}", other))),
        }
    }

    fn apply_builtin(&self, b: Builtin, mut args: Vec<Value>, depth: usize) -> Result<Value, EvalError> {
        use Builtin::*;
        match b {
            Z => {
                expect_arity(b, &args, 1)?;
                Ok(Value::Fix(Rc::new(args.remove(0))))
            }
            Car => {
                expect_arity(b, &args, 1)?;
                as_list(&args[0])?
                    .first()
                    .cloned()
                    .ok_or_else(|| EvalError::IndexError("car of empty list".into()))
            }
            Cdr => {
                expect_arity(b, &args, 1)?;
                let l = as_list(&args[0])?;
                Ok(Value::List(l[1.min(l.len())..].into()))
            }
            Null => {
                expect_arity(b, &args, 1)?;
                Ok(Value::Bool(matches!(&args[0], Value::List(l) if l.is_empty())))
            }
            Cons => {
                expect_arity(b, &args, 2)?;
                let tail = as_list(&args[1])?;
                let mut out = Vec::with_capacity(tail.len() + 1);
                out.push(args[0].clone());
                out.extend(tail.iter().cloned());
                Ok(Value::List(out.into()))
            }
            IfThenElse => {
                expect_arity(b, &args, 3)?;
                Ok(if args[0].truthy() { args[1].clone() } else { args[2].clone() })
            }
            FoldL => {
                expect_arity(b, &args, 3)?;
                let (acc_fn, init, list) = (args[0].clone(), args[1].clone(), as_list(&args[2])?);
                let mut res = init;
                for elem in list.iter() {
                    res = self.apply(&acc_fn, vec![res, elem.clone()], depth + 1)?;
                }
                Ok(res)
            }
            FoldR => {
                expect_arity(b, &args, 3)?;
                let (acc_fn, init, list) = (args[0].clone(), args[1].clone(), as_list(&args[2])?);
                let mut res = init;
                for elem in list.iter().rev() {
                    res = self.apply(&acc_fn, vec![elem.clone(), res], depth + 1)?;
                }
                Ok(res)
            }
            Concat => {
                expect_arity(b, &args, 2)?;
                let (a, bl) = (as_list(&args[0])?, as_list(&args[1])?);
                let mut out = Vec::with_capacity(a.len() + bl.len());
                out.extend(a.iter().cloned());
                out.extend(bl.iter().cloned());
                Ok(Value::List(out.into()))
            }
            Sorted => {
                expect_arity(b, &args, 1)?;
                let mut items: Vec<Value> = as_list(&args[0])?.to_vec();
                let mut err = None;
                items.sort_by(|a, b| match compare_values(a, b) {
                    Some(o) => o,
                    None => {
                        err = Some(EvalError::TypeError(format!(
                            "cannot order {} and {}",
                            a.type_name(),
                            b.type_name()
                        )));
                        Ordering::Equal
                    }
                });
                if let Some(e) = err {
                    return Err(e);
                }
                Ok(Value::List(items.into()))
            }
            Len => {
                expect_arity(b, &args, 1)?;
                match &args[0] {
                    Value::List(l) => Ok(Value::Int(l.len() as i64)),
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    other => Err(EvalError::TypeError(format!("{} has no len()", other.type_name()))),
                }
            }
            List => {
                expect_arity(b, &args, 1)?;
                match &args[0] {
                    Value::List(_) => Ok(args[0].clone()),
                    other => Err(EvalError::TypeError(format!("cannot listify {}", other.type_name()))),
                }
            }
            Filter => {
                expect_arity(b, &args, 2)?;
                let (pred, list) = (args[0].clone(), as_list(&args[1])?);
                let mut out = Vec::new();
                for elem in list.iter() {
                    if self.apply(&pred, vec![elem.clone()], depth + 1)?.truthy() {
                        out.push(elem.clone());
                    }
                }
                Ok(Value::List(out.into()))
            }
            Map => {
                expect_arity(b, &args, 2)?;
                let (f, list) = (args[0].clone(), as_list(&args[1])?);
                let mut out = Vec::with_capacity(list.len());
                for elem in list.iter() {
                    out.push(self.apply(&f, vec![elem.clone()], depth + 1)?);
                }
                Ok(Value::List(out.into()))
            }
            Reversed => {
                expect_arity(b, &args, 1)?;
                let mut items: Vec<Value> = as_list(&args[0])?.to_vec();
                items.reverse();
                Ok(Value::List(items.into()))
            }
            Any => {
                expect_arity(b, &args, 1)?;
                Ok(Value::Bool(as_list(&args[0])?.iter().any(|v| v.truthy())))
            }
            All => {
                expect_arity(b, &args, 1)?;
                Ok(Value::Bool(as_list(&args[0])?.iter().all(|v| v.truthy())))
            }
        }
    }
}

fn expect_arity(b: Builtin, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() != n {
        Err(EvalError::Arity(format!(
            "{} expects {} argument(s), got {}",
            b.name(),
            n,
            args.len()
        )))
    } else {
        Ok(())
    }
}

fn as_list(v: &Value) -> Result<Rc<[Value]>, EvalError> {
    match v {
        Value::List(l) => Ok(l.clone()),
        other => Err(EvalError::TypeError(format!("expected a list, got {}", other.type_name()))),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(f.0),
        _ => None,
    }
}

fn eval_unary(op: UnOp, v: Value) -> Result<Value, EvalError> {
    match (op, v) {
        (UnOp::Not, v) => Ok(Value::Bool(!v.truthy())),
        (UnOp::Neg, Value::Int(i)) => Ok(Value::Int(-i)),
        (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(F64::new(-f.0))),
        (UnOp::BitNot, Value::Int(i)) => Ok(Value::Int(!i)),
        (op, other) => Err(EvalError::TypeError(format!("cannot apply {:?} to {}", op, other.type_name()))),
    }
}

fn eval_binary(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => match (&l, &r) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{a}{b}")))),
            (Value::List(a), Value::List(b)) => {
                let mut out = Vec::with_capacity(a.len() + b.len());
                out.extend(a.iter().cloned());
                out.extend(b.iter().cloned());
                Ok(Value::List(out.into()))
            }
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::Overflow(format!("{a} + {b}"))),
            _ => numeric_binop(l, r, |a, b| a + b),
        },
        BinOp::Sub => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::Overflow(format!("{a} - {b}"))),
            _ => numeric_binop(l, r, |a, b| a - b),
        },
        BinOp::Mul => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::Overflow(format!("{a} * {b}"))),
            _ => numeric_binop(l, r, |a, b| a * b),
        },
        BinOp::Div => {
            let (a, b) = (num_operand(&l)?, num_operand(&r)?);
            if b == 0.0 {
                return Err(EvalError::DivByZero);
            }
            Ok(Value::Float(F64::new(a / b)))
        }
        BinOp::Mod => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(EvalError::DivByZero)
                } else {
                    Ok(Value::Int(a.rem_euclid(*b)))
                }
            }
            _ => numeric_binop(l, r, |a, b| a % b),
        },
        BinOp::BitAnd => match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a & b)),
            (l, r) => Err(EvalError::TypeError(format!("cannot & {} and {}", l.type_name(), r.type_name()))),
        },
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ord = compare_values(&l, &r).ok_or_else(|| {
                EvalError::TypeError(format!("cannot order {} and {}", l.type_name(), r.type_name()))
            })?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ord == Ordering::Less,
                BinOp::Le => ord != Ordering::Greater,
                BinOp::Gt => ord == Ordering::Greater,
                BinOp::Ge => ord != Ordering::Less,
                _ => unreachable!(),
            }))
        }
        BinOp::Eq => Ok(Value::Bool(l == r)),
        BinOp::Ne => Ok(Value::Bool(l != r)),
        BinOp::And | BinOp::Or => unreachable!("short-circuited in eval_expr"),
    }
}

fn num_operand(v: &Value) -> Result<f64, EvalError> {
    as_f64(v).ok_or_else(|| EvalError::TypeError(format!("expected a number, got {}", v.type_name())))
}

fn numeric_binop(l: Value, r: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    let (a, b) = (num_operand(&l)?, num_operand(&r)?);
    Ok(Value::Float(F64::new(f(a, b))))
}

fn compare_values(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => {
            let (a, b) = (as_f64(l)?, as_f64(r)?);
            a.partial_cmp(&b)
        }
    }
}

fn eval_index(base: Value, idx: Value) -> Result<Value, EvalError> {
    let i = match idx {
        Value::Int(i) => i,
        other => return Err(EvalError::TypeError(format!("index must be an int, got {}", other.type_name()))),
    };
    match base {
        Value::List(l) => {
            let len = l.len() as i64;
            let i = if i < 0 { i + len } else { i };
            if i < 0 || i >= len {
                Err(EvalError::IndexError(format!("list index {} out of range", i)))
            } else {
                Ok(l[i as usize].clone())
            }
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let i = if i < 0 { i + len } else { i };
            if i < 0 || i >= len {
                Err(EvalError::IndexError(format!("string index {} out of range", i)))
            } else {
                Ok(Value::Str(Rc::from(chars[i as usize].to_string().as_str())))
            }
        }
        other => Err(EvalError::TypeError(format!("cannot index {}", other.type_name()))),
    }
}

fn resolve_slice_bound(v: Option<Value>, len: i64, default: i64) -> Result<i64, EvalError> {
    let raw = match v {
        None => return Ok(default.clamp(0, len)),
        Some(Value::Int(i)) => i,
        Some(other) => return Err(EvalError::TypeError(format!("slice bound must be an int, got {}", other.type_name()))),
    };
    let i = if raw < 0 { raw + len } else { raw };
    Ok(i.clamp(0, len))
}

fn eval_slice(base: Value, lo: Option<Value>, hi: Option<Value>) -> Result<Value, EvalError> {
    match base {
        Value::List(l) => {
            let len = l.len() as i64;
            let lo = resolve_slice_bound(lo, len, 0)?;
            let hi = resolve_slice_bound(hi, len, len)?;
            if lo >= hi {
                Ok(Value::List(Rc::from(&[][..])))
            } else {
                Ok(Value::List(l[lo as usize..hi as usize].into()))
            }
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let lo = resolve_slice_bound(lo, len, 0)?;
            let hi = resolve_slice_bound(hi, len, len)?;
            if lo >= hi {
                Ok(Value::Str(Rc::from("")))
            } else {
                let s: String = chars[lo as usize..hi as usize].iter().collect();
                Ok(Value::Str(Rc::from(s.as_str())))
            }
        }
        other => Err(EvalError::TypeError(format!("cannot slice {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::parser::parse;

    fn run(src: &str, input: Option<Value>) -> Result<Value, EvalError> {
        let expr = parse(src).unwrap();
        Interp::new(512).eval(&expr, input.as_ref())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("1 + 1", None).unwrap(), Value::Int(2));
        assert_eq!(run("input * input + 1", Some(Value::Int(3))).unwrap(), Value::Int(10));
    }

    #[test]
    fn integer_overflow_is_an_eval_error_not_a_panic() {
        let src = format!("{} + 1", i64::MAX);
        assert!(matches!(run(&src, None), Err(EvalError::Overflow(_))));
    }

    #[test]
    fn comparisons() {
        assert_eq!(run("input < 1", Some(Value::Int(0))).unwrap(), Value::Bool(true));
        assert_eq!(run("input < 1", Some(Value::Int(1))).unwrap(), Value::Bool(false));
    }

    #[test]
    fn list_literal_and_sorted() {
        let v = run("sorted([3, 1, 2])", None).unwrap();
        assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)].into()));
    }

    #[test]
    fn name_error_on_unbound_input() {
        let err = run("input + 1", None).unwrap_err();
        assert!(err.is_name_error());
    }

    #[test]
    fn factorial_via_z_combinator() {
        let src = "(z(lambda rec: lambda x: 1 if x == 0 else x * rec(x - 1)))(input)";
        assert_eq!(run(src, Some(Value::Int(5))).unwrap(), Value::Int(120));
        assert_eq!(run(src, Some(Value::Int(0))).unwrap(), Value::Int(1));
    }

    #[test]
    fn bitwise_ops() {
        assert_eq!(run("~input & (input + 1)", Some(Value::Int(83))).unwrap(), Value::Int(4));
    }

    #[test]
    fn comprehension_and_any_all() {
        let v = run("any(x < 0 for x in input)", Some(Value::List(vec![Value::Int(1), Value::Int(-1)].into())));
        assert_eq!(v.unwrap(), Value::Bool(true));
    }
}
