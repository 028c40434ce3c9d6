// SPDX-License-Identifier: PMPL-1.0-or-later

//! Parse tree for vis scripts
//!
//! Every construct keeps the span it was parsed from. `Display` renders the
//! canonical source form without spans, so two statements that print the
//! same are the same statement.

use crate::diagnostics::Span;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Labels(LabelDecl),
    Rule(RuleDecl),
    Query(QueryDecl),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Labels(decl) => decl.span,
            Item::Rule(decl) => decl.span,
            Item::Query(decl) => decl.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Node,
    Edge,
}

impl LabelKind {
    /// Structural predicate that enumerates elements of this kind
    pub fn element_predicate(self) -> &'static str {
        match self {
            LabelKind::Node => "node",
            LabelKind::Edge => "edge",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelDecl {
    pub kind: LabelKind,
    pub labels: Vec<Label>,
    pub span: Span,
}

/// `value` or `value as alias`
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub value: String,
    pub alias: Option<String>,
    pub span: Span,
}

impl Label {
    /// Name of the generated predicate
    pub fn predicate_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.value)
    }
}

/// `antecedent -> consequence.` or a bare fact `consequence.`
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDecl {
    pub antecedent: Option<Formula>,
    pub consequence: Vec<Predicate>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryDecl {
    pub name: String,
    pub name_span: Span,
    pub body: Formula,
    pub span: Span,
}

impl QueryDecl {
    /// Answer variables: every named variable occurring outside a negation,
    /// in first-occurrence order
    pub fn head_variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.body.visible_variables(&mut out);
        let mut seen = std::collections::HashSet::new();
        out.retain(|v| seen.insert(*v));
        out
    }
}

/// Disjunction of conjunctions
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub disjuncts: Vec<Conjunction>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conjunction {
    pub literals: Vec<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Positive(Predicate),
    Negated(Box<Formula>, Span),
    Compare(Comparison),
    Group(Box<Formula>),
}

impl Literal {
    /// Every named variable occurrence, in order
    pub fn variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Literal::Positive(p) => out.extend(p.variables()),
            Literal::Negated(f, _) | Literal::Group(f) => f.variables(out),
            Literal::Compare(c) => out.extend(c.left.var_name().into_iter().chain(c.right.var_name())),
        }
    }
}

impl Formula {
    /// Disjunctive normal form: each alternative is a flat conjunction of
    /// positive, negated and comparison literals, in source order.
    /// Parenthesized disjunctions multiply out left to right.
    pub fn alternatives(&self) -> Vec<Vec<&Literal>> {
        let mut out = Vec::new();
        for conjunction in &self.disjuncts {
            out.extend(conjunction.alternatives());
        }
        out
    }

    /// Number of alternatives `alternatives()` would produce
    pub fn alternative_count(&self) -> usize {
        self.disjuncts
            .iter()
            .map(Conjunction::alternative_count)
            .fold(0usize, usize::saturating_add)
    }

    /// Every named variable occurrence, negations included
    pub fn variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        for literal in self.disjuncts.iter().flat_map(|c| &c.literals) {
            literal.variables(out);
        }
    }

    fn visible_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        for literal in self.disjuncts.iter().flat_map(|c| &c.literals) {
            match literal {
                Literal::Negated(..) => {}
                Literal::Group(f) => f.visible_variables(out),
                other => other.variables(out),
            }
        }
    }
}

impl Conjunction {
    fn alternatives(&self) -> Vec<Vec<&Literal>> {
        let mut partial: Vec<Vec<&Literal>> = vec![Vec::new()];
        for literal in &self.literals {
            match literal {
                Literal::Group(formula) => {
                    let branches = formula.alternatives();
                    partial = partial
                        .iter()
                        .flat_map(|prefix| {
                            branches.iter().map(move |branch| {
                                let mut alt = prefix.clone();
                                alt.extend(branch.iter().copied());
                                alt
                            })
                        })
                        .collect();
                }
                other => {
                    for alt in &mut partial {
                        alt.push(other);
                    }
                }
            }
        }
        partial
    }

    fn alternative_count(&self) -> usize {
        self.literals
            .iter()
            .map(|literal| match literal {
                Literal::Group(formula) => formula.alternative_count(),
                _ => 1,
            })
            .fold(1usize, usize::saturating_mul)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub name: String,
    pub args: Vec<Arg>,
    pub span: Span,
}

impl Predicate {
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(Arg::var_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub kind: ArgKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgKind {
    Var(String),
    Wildcard,
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
}

impl Arg {
    pub fn var_name(&self) -> Option<&str> {
        match &self.kind {
            ArgKind::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self.kind, ArgKind::Int(_) | ArgKind::Float(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.kind, ArgKind::Ident(_) | ArgKind::Str(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            _ => return None,
        })
    }

    /// Ordering comparisons only make sense between numbers
    pub fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub op: CompareOp,
    pub left: Arg,
    pub right: Arg,
    pub span: Span,
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Labels(decl) => {
                write!(f, "{} labels: ", decl.kind.element_predicate())?;
                join(f, &decl.labels, ", ")?;
                f.write_str(".")
            }
            Item::Rule(decl) => {
                if let Some(antecedent) = &decl.antecedent {
                    write!(f, "{} -> ", antecedent)?;
                }
                join(f, &decl.consequence, ", ")?;
                f.write_str(".")
            }
            Item::Query(decl) => write!(f, "query {}: {}.", decl.name, decl.body),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value)?;
        if let Some(alias) = &self.alias {
            write!(f, " as {}", alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        join(f, &self.disjuncts, "; ")
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        join(f, &self.literals, ", ")
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Positive(p) => write!(f, "{}", p),
            Literal::Negated(inner, _) => write!(f, "not ({})", inner),
            Literal::Compare(c) => write!(f, "{} {} {}", c.left, c.op.symbol(), c.right),
            Literal::Group(inner) => write!(f, "({})", inner),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            join(f, &self.args, ", ")?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ArgKind::Var(name) | ArgKind::Ident(name) => f.write_str(name),
            ArgKind::Wildcard => f.write_str("_"),
            ArgKind::Str(s) => write!(f, "{:?}", s),
            ArgKind::Int(i) => write!(f, "{}", i),
            ArgKind::Float(x) => write!(f, "{:?}", x),
        }
    }
}
