// SPDX-License-Identifier: PMPL-1.0-or-later

//! First-order terms and clauses
//!
//! Terms are immutable values. Variable bindings never live inside a term;
//! they are kept by the engine's binding store so backtracking only has to
//! unwind the trail.

use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Integer or floating point constant
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Arithmetic equality: `3` and `3.0` are equal here but do not unify
    pub fn numeric_eq(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }

    pub fn numeric_cmp(self, other: Number) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Number::Int(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            Number::Float(f) => {
                1u8.hash(state);
                f.to_bits().hash(state);
            }
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// A logic variable. Scope 0 is the variable as written in a clause or goal;
/// the engine renames clause variables into fresh scopes on every use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Var {
    pub name: String,
    pub scope: u32,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: 0,
        }
    }

    pub fn in_scope(&self, scope: u32) -> Self {
        Self {
            name: self.name.clone(),
            scope,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "_{}_{}", self.name.trim_start_matches('_'), self.scope)
        }
    }
}

/// A logic term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    /// Named constant (identifiers and quoted strings alike)
    Atom(String),
    Number(Number),
    Var(Var),
    /// Compound term: functor(args...)
    Compound(String, Vec<Term>),
}

impl Term {
    pub fn atom(s: &str) -> Self {
        Term::Atom(s.to_string())
    }

    pub fn int(i: i64) -> Self {
        Term::Number(Number::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Term::Number(Number::Float(f))
    }

    pub fn var(name: &str) -> Self {
        Term::Var(Var::new(name))
    }

    pub fn compound(name: &str, args: Vec<Term>) -> Self {
        Term::Compound(name.to_string(), args)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// Atoms and compounds can be called as goals or used as clause heads
    pub fn is_callable(&self) -> bool {
        matches!(self, Term::Atom(_) | Term::Compound(..))
    }

    /// Name and arity of a callable term
    pub fn signature(&self) -> Option<Signature> {
        match self {
            Term::Atom(name) => Some(Signature::new(name, 0)),
            Term::Compound(name, args) => Some(Signature::new(name, args.len())),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Term] {
        match self {
            Term::Compound(_, args) => args,
            _ => &[],
        }
    }

    /// Variables in first-occurrence order, without duplicates
    pub fn variables(&self) -> Vec<Var> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<Var>) {
        match self {
            Term::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Term::Compound(_, args) => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
            _ => {}
        }
    }

    /// Copy of the term with every variable moved into `scope`
    pub fn rename(&self, scope: u32) -> Term {
        match self {
            Term::Var(v) => Term::Var(v.in_scope(scope)),
            Term::Compound(name, args) => Term::Compound(
                name.clone(),
                args.iter().map(|arg| arg.rename(scope)).collect(),
            ),
            other => other.clone(),
        }
    }

    /// Right-nested conjunction of goals; `true` when empty
    pub fn conjunction(mut goals: Vec<Term>) -> Term {
        match goals.pop() {
            None => Term::atom("true"),
            Some(last) => goals
                .into_iter()
                .rev()
                .fold(last, |acc, goal| Term::compound(",", vec![goal, acc])),
        }
    }

    /// Right-nested disjunction of goals; `fail` when empty
    pub fn disjunction(mut goals: Vec<Term>) -> Term {
        match goals.pop() {
            None => Term::atom("fail"),
            Some(last) => goals
                .into_iter()
                .rev()
                .fold(last, |acc, goal| Term::compound(";", vec![goal, acc])),
        }
    }
}

const INFIX: &[&str] = &["==", "!=", "<", "<=", ">", ">="];

fn is_plain_atom(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

fn write_atom(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_plain_atom(name) {
        return write!(f, "{}", name);
    }
    f.write_str("'")?;
    for c in name.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(name) => write_atom(f, name),
            Term::Number(n) => write!(f, "{}", n),
            Term::Var(v) => write!(f, "{}", v),
            Term::Compound(name, args) if args.len() == 2 && INFIX.contains(&name.as_str()) => {
                write!(f, "{} {} {}", args[0], name, args[1])
            }
            Term::Compound(name, args) if args.len() == 2 && name == "," => {
                write!(f, "({}, {})", args[0], args[1])
            }
            Term::Compound(name, args) if args.len() == 2 && name == ";" => {
                write!(f, "({} ; {})", args[0], args[1])
            }
            Term::Compound(name, args) => {
                write_atom(f, name)?;
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Predicate indicator, `name/arity`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Signature {
    pub name: String,
    pub arity: usize,
}

impl Signature {
    pub fn new(name: &str, arity: usize) -> Self {
        Self {
            name: name.to_string(),
            arity,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A Horn clause: `head :- body`. An empty body makes it a fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Clause {
    pub head: Term,
    pub body: Vec<Term>,
}

impl Clause {
    pub fn fact(head: Term) -> Self {
        Self::rule(head, Vec::new())
    }

    pub fn rule(head: Term, body: Vec<Term>) -> Self {
        debug_assert!(head.is_callable(), "clause head must be callable: {}", head);
        Self { head, body }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    pub fn signature(&self) -> Option<Signature> {
        self.head.signature()
    }

    /// Copy of the clause with every variable moved into `scope`
    pub fn rename(&self, scope: u32) -> Clause {
        Clause {
            head: self.head.rename(scope),
            body: self.body.iter().map(|goal| goal.rename(scope)).collect(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            f.write_str(" :- ")?;
            for (i, goal) in self.body.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", goal)?;
            }
        }
        f.write_str(".")
    }
}
