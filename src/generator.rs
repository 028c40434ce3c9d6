// SPDX-License-Identifier: PMPL-1.0-or-later

//! Lowering of checked scripts into clauses
//!
//! Output order follows the script: statement by statement, and within a rule
//! consequence by consequence, then alternative by alternative. The engine
//! tries clauses of one predicate in the order they are emitted, so this
//! order is part of the program's meaning.

use crate::diagnostics::{Diagnostic, Diagnostics, Phase, Span};
use crate::logic::term::{Clause, Term};
use crate::syntax::ast::{
    Arg, ArgKind, Formula, Item, LabelDecl, Literal, Predicate, QueryDecl, RuleDecl, Script,
};
use std::collections::HashSet;
use tracing::debug;

/// Clauses plus the warnings raised while producing them
#[derive(Debug, Clone, Default)]
pub struct Generated {
    pub clauses: Vec<Clause>,
    pub warnings: Diagnostics,
}

pub fn generate(script: &Script, expansion_warning: usize) -> Generated {
    let mut generator = Generator {
        out: Generated::default(),
        expansion_warning,
    };
    for item in &script.items {
        match item {
            Item::Labels(decl) => generator.labels(decl),
            Item::Rule(decl) => generator.rule(decl),
            Item::Query(decl) => generator.query(decl),
        }
    }
    debug!(clauses = generator.out.clauses.len(), "generated");
    generator.out
}

/// Lower a standalone goal, e.g. one typed on the command line.
/// Alternatives are joined with `;`.
pub fn lower_goal(formula: &Formula) -> Term {
    let mut names = Vec::new();
    formula.variables(&mut names);
    let mut fresh = Fresh::avoiding(names);
    lower_formula(formula, &mut fresh)
}

struct Generator {
    out: Generated,
    expansion_warning: usize,
}

impl Generator {
    fn emit(&mut self, clause: Clause) {
        self.out.clauses.push(clause);
    }

    /// `wolf(X) :- node(X), attribute(X, label, wolf).`
    fn labels(&mut self, decl: &LabelDecl) {
        let element = decl.kind.element_predicate();
        for label in &decl.labels {
            let x = Term::var("X");
            self.emit(Clause::rule(
                Term::compound(label.predicate_name(), vec![x.clone()]),
                vec![
                    Term::compound(element, vec![x.clone()]),
                    Term::compound(
                        "attribute",
                        vec![x, Term::atom("label"), Term::atom(&label.value)],
                    ),
                ],
            ));
        }
    }

    fn rule(&mut self, decl: &RuleDecl) {
        let Some(antecedent) = &decl.antecedent else {
            for head in &decl.consequence {
                let mut fresh = Fresh::avoiding(head.variables());
                self.emit(Clause::fact(lower_predicate(head, &mut fresh)));
            }
            return;
        };

        self.warn_expansion(antecedent, decl.span);
        let alternatives = antecedent.alternatives();
        for head in &decl.consequence {
            for alternative in &alternatives {
                let mut fresh = Fresh::avoiding(head.variables().chain(names_in(alternative)));
                let head = lower_predicate(head, &mut fresh);
                let body = alternative
                    .iter()
                    .map(|literal| lower_literal(literal, &mut fresh))
                    .collect();
                self.emit(Clause::rule(head, body));
            }
        }
    }

    /// `query(hubs, 2). hubs(X, D) :- ...`
    fn query(&mut self, decl: &QueryDecl) {
        let vars: Vec<Term> = decl.head_variables().into_iter().map(Term::var).collect();
        self.emit(Clause::fact(Term::compound(
            "query",
            vec![Term::atom(&decl.name), Term::int(vars.len() as i64)],
        )));

        self.warn_expansion(&decl.body, decl.span);
        for alternative in decl.body.alternatives() {
            let mut fresh = Fresh::avoiding(names_in(&alternative));
            let body = alternative
                .iter()
                .map(|literal| lower_literal(literal, &mut fresh))
                .collect();
            self.emit(Clause::rule(callable(&decl.name, vars.clone()), body));
        }
    }

    fn warn_expansion(&mut self, formula: &Formula, span: Span) {
        let count = formula.alternative_count();
        if count > self.expansion_warning {
            self.out.warnings.push(
                Diagnostic::warning(
                    Phase::Generate,
                    "W101",
                    format!(
                        "statement expands into {} alternatives (threshold {})",
                        count, self.expansion_warning
                    ),
                )
                .with_span(span),
            );
        }
    }
}

/// Supplies a distinct variable for every wildcard in one clause, skipping
/// names the clause already uses
struct Fresh {
    next: usize,
    taken: HashSet<String>,
}

impl Fresh {
    fn avoiding<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            next: 0,
            taken: names.into_iter().map(str::to_string).collect(),
        }
    }

    fn var(&mut self) -> Term {
        loop {
            self.next += 1;
            let name = format!("_G{}", self.next);
            if !self.taken.contains(&name) {
                return Term::var(&name);
            }
        }
    }
}

fn names_in<'a>(alternative: &[&'a Literal]) -> Vec<&'a str> {
    let mut names = Vec::new();
    for literal in alternative {
        literal.variables(&mut names);
    }
    names
}

fn callable(name: &str, args: Vec<Term>) -> Term {
    if args.is_empty() {
        Term::atom(name)
    } else {
        Term::compound(name, args)
    }
}

fn lower_predicate(predicate: &Predicate, fresh: &mut Fresh) -> Term {
    let args = predicate.args.iter().map(|a| lower_arg(a, fresh)).collect();
    callable(&predicate.name, args)
}

fn lower_arg(arg: &Arg, fresh: &mut Fresh) -> Term {
    match &arg.kind {
        ArgKind::Var(name) => Term::var(name),
        ArgKind::Wildcard => fresh.var(),
        ArgKind::Ident(name) | ArgKind::Str(name) => Term::atom(name),
        ArgKind::Int(i) => Term::int(*i),
        ArgKind::Float(f) => Term::float(*f),
    }
}

fn lower_literal(literal: &Literal, fresh: &mut Fresh) -> Term {
    match literal {
        Literal::Positive(p) => lower_predicate(p, fresh),
        Literal::Negated(inner, _) => Term::compound("not", vec![lower_formula(inner, fresh)]),
        Literal::Compare(c) => Term::compound(
            c.op.symbol(),
            vec![lower_arg(&c.left, fresh), lower_arg(&c.right, fresh)],
        ),
        Literal::Group(inner) => lower_formula(inner, fresh),
    }
}

fn lower_formula(formula: &Formula, fresh: &mut Fresh) -> Term {
    Term::disjunction(
        formula
            .disjuncts
            .iter()
            .map(|conjunction| {
                Term::conjunction(
                    conjunction
                        .literals
                        .iter()
                        .map(|literal| lower_literal(literal, fresh))
                        .collect(),
                )
            })
            .collect(),
    )
}
