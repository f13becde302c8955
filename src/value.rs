//! The value algebra referenced by Design Notes option (a): integers, floats,
//! booleans, strings, finite lists, and closures, with structural equality
//! strong enough to back observational-equivalence comparison.

use std::rc::Rc;

use crate::interp::ast::Expr;
use crate::utils::F64;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(F64),
    Bool(bool),
    Str(Rc<str>),
    List(Rc<[Value]>),
    Closure(Rc<Closure>),
    Native(Builtin),
    /// `z(g)`: a deferred fixed point. Only materialized (by re-deriving
    /// `g(Fix(g))`) when actually applied — see `interp::eval::Interp::apply`.
    Fix(Rc<Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a == b,
            // Closures compare by identity only: structural comparison of
            // function values is the undecidable case the oracle's callable
            // check exists to avoid.
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Fix(a), Value::Fix(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Native(_) | Value::Fix(_))
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(f) => f.0 != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Closure(_) | Value::Native(_) | Value::Fix(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Closure(_) | Value::Native(_) | Value::Fix(_) => "function",
        }
    }
}

#[derive(Debug)]
pub struct Closure {
    pub params: Vec<Rc<str>>,
    pub body: Rc<Expr>,
    pub env: Env,
}

/// Names bound in the evaluation environment that the evaluator implements
/// natively rather than by interpreting an AST body (`z`, `car`, `cdr`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Z,
    Car,
    Cdr,
    Null,
    Cons,
    IfThenElse,
    FoldL,
    FoldR,
    Concat,
    Sorted,
    Len,
    List,
    Filter,
    Map,
    Reversed,
    Any,
    All,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Z => "z",
            Builtin::Car => "car",
            Builtin::Cdr => "cdr",
            Builtin::Null => "null",
            Builtin::Cons => "cons",
            Builtin::IfThenElse => "if_then_else",
            Builtin::FoldL => "foldl",
            Builtin::FoldR => "foldr",
            Builtin::Concat => "concat",
            Builtin::Sorted => "sorted",
            Builtin::Len => "len",
            Builtin::List => "list",
            Builtin::Filter => "filter",
            Builtin::Map => "map",
            Builtin::Reversed => "reversed",
            Builtin::Any => "any",
            Builtin::All => "all",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        use Builtin::*;
        Some(match name {
            "z" => Z,
            "car" => Car,
            "cdr" => Cdr,
            "null" => Null,
            "cons" => Cons,
            "if_then_else" => IfThenElse,
            "foldl" => FoldL,
            "foldr" => FoldR,
            "concat" => Concat,
            "sorted" => Sorted,
            "len" => Len,
            "list" => List,
            "filter" => Filter,
            "map" => Map,
            "reversed" => Reversed,
            "any" => Any,
            "all" => All,
            _ => return None,
        })
    }
}

/// A persistent, singly-linked binding environment: cheap to clone (an `Rc`
/// bump) so closures can capture it by value the way the source captures
/// Python lexical scope.
#[derive(Debug, Clone, Default)]
pub struct Env(pub Option<Rc<EnvNode>>);

#[derive(Debug)]
pub struct EnvNode {
    pub name: Rc<str>,
    pub value: Value,
    pub parent: Env,
}

impl Env {
    pub fn push(&self, name: Rc<str>, value: Value) -> Env {
        Env(Some(Rc::new(EnvNode {
            name,
            value,
            parent: self.clone(),
        })))
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut cur = &self.0;
        while let Some(node) = cur {
            if &*node.name == name {
                return Some(node.value.clone());
            }
            cur = &node.parent.0;
        }
        None
    }
}

/// The reserved sentinel representing evaluation failure (spec §3,
/// `Evaluation vector`). Deliberately *not* treated as self-equal at the
/// oracle layer — see `crate::oracle` for how vectors containing it are
/// special-cased so that `NoResult != NoResult` holds where it matters.
#[derive(Debug, Clone)]
pub enum Outcome {
    Ok(Value),
    NoResult,
}

impl Outcome {
    pub fn is_no_result(&self) -> bool {
        matches!(self, Outcome::NoResult)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Ok(v) => Some(v),
            Outcome::NoResult => None,
        }
    }
}

/// Structural equality lifted to `Outcome`. Two `Ok` values compare
/// structurally; anything touching `NoResult` compares unequal, including a
/// `NoResult` against itself.
impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Outcome::Ok(a), Outcome::Ok(b)) => a == b,
            _ => false,
        }
    }
}
