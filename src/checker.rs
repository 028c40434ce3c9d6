// SPDX-License-Identifier: PMPL-1.0-or-later

//! Semantic checker
//!
//! Validates a parsed script against a predicate catalog. The whole script is
//! always visited: every error and warning is collected in one pass and the
//! caller decides what to do with them.
//!
//! | code | condition |
//! |------|-----------|
//! | E001 | predicate is neither built in nor defined by the script |
//! | E002 | arity differs from the built-in or first definition |
//! | E003 | consequence variable not bound by the antecedent |
//! | E004 | duplicate label predicate or query name |
//! | E005 | definition clashes with a built-in or reserved name |
//! | E006 | literal of the wrong type where the type is known |
//! | E007 | wildcard in a consequence |
//! | E008 | variable in a negation or comparison not bound beforehand |
//! | E009 | label value is not a predicate name and has no alias |
//! | W001 | singleton variable |
//! | W002 | label never referenced |
//! | W003 | duplicate statement |
//! | W004 | query variable unbound in some alternative |

use crate::diagnostics::{Diagnostic, Diagnostics, Phase, Span};
use crate::library::{BuiltinKind, Catalog};
use crate::syntax::ast::{
    Arg, ArgKind, Comparison, Formula, Item, LabelDecl, Literal, Predicate, QueryDecl, RuleDecl,
    Script,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::debug;

static PREDICATE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z][A-Za-z0-9_]*$").ok());

fn is_predicate_name(text: &str) -> bool {
    PREDICATE_NAME.as_ref().is_some_and(|re| re.is_match(text))
}

/// Errors and warnings from one check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckResult {
    pub errors: Diagnostics,
    pub warnings: Diagnostics,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Label,
    Rule,
    Query,
}

#[derive(Debug, Clone)]
struct Definition {
    arity: usize,
    origin: Origin,
    span: Span,
}

pub fn check(script: &Script, catalog: &Catalog) -> CheckResult {
    let mut checker = Checker::new(catalog);
    checker.collect_definitions(script);
    checker.check_items(script);
    checker.check_unused_labels(script);
    debug!(
        errors = checker.result.errors.len(),
        warnings = checker.result.warnings.len(),
        "check finished"
    );
    checker.result
}

struct Checker<'a> {
    catalog: &'a Catalog,
    defined: HashMap<String, Definition>,
    referenced: HashSet<String>,
    result: CheckResult,
}

impl<'a> Checker<'a> {
    fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            defined: HashMap::new(),
            referenced: HashSet::new(),
            result: CheckResult::default(),
        }
    }

    fn error(&mut self, code: &'static str, span: Span, message: String) {
        self.result
            .errors
            .push(Diagnostic::error(Phase::Check, code, message).with_span(span));
    }

    fn warning(&mut self, code: &'static str, span: Span, message: String) {
        self.result
            .warnings
            .push(Diagnostic::warning(Phase::Check, code, message).with_span(span));
    }

    // Pass 1: names introduced by labels, rule heads and queries

    fn collect_definitions(&mut self, script: &Script) {
        for item in &script.items {
            match item {
                Item::Labels(decl) => self.define_labels(decl),
                Item::Query(decl) => {
                    let arity = decl.head_variables().len();
                    self.define(&decl.name, arity, Origin::Query, decl.name_span);
                }
                Item::Rule(decl) => {
                    for head in &decl.consequence {
                        self.define(&head.name, head.arity(), Origin::Rule, head.span);
                    }
                }
            }
        }
    }

    fn define_labels(&mut self, decl: &LabelDecl) {
        for label in &decl.labels {
            if label.alias.is_none() && !is_predicate_name(&label.value) {
                self.error(
                    "E009",
                    label.span,
                    format!(
                        "label \"{}\" is not a valid predicate name; add `as <name>`",
                        label.value
                    ),
                );
                continue;
            }
            self.define(label.predicate_name(), 1, Origin::Label, label.span);
        }
    }

    fn define(&mut self, name: &str, arity: usize, origin: Origin, span: Span) {
        if self.catalog.contains_name(name) {
            let what = match self.catalog.kind(name, arity) {
                Some(BuiltinKind::Reserved) => "reserved",
                _ => "built-in",
            };
            self.error(
                "E005",
                span,
                format!("`{}` is a {} predicate and cannot be defined", name, what),
            );
            return;
        }

        let Some(previous) = self.defined.get(name).cloned() else {
            self.defined.insert(
                name.to_string(),
                Definition {
                    arity,
                    origin,
                    span,
                },
            );
            return;
        };

        let top_level = |o: Origin| matches!(o, Origin::Label | Origin::Query);
        if top_level(origin) && top_level(previous.origin) {
            self.error(
                "E004",
                span,
                format!("`{}` is already declared at {}", name, previous.span),
            );
        } else if previous.arity != arity {
            self.error(
                "E002",
                span,
                format!(
                    "`{}` has arity {} here but was defined with arity {} at {}",
                    name, arity, previous.arity, previous.span
                ),
            );
        } else if origin == Origin::Query || previous.origin == Origin::Query {
            self.error(
                "E004",
                span,
                format!("`{}` is already declared at {}", name, previous.span),
            );
        }
    }

    // Pass 2: references, types and variable safety

    fn check_items(&mut self, script: &Script) {
        let mut seen: HashMap<String, Span> = HashMap::new();
        for item in &script.items {
            let text = item.to_string();
            if let Some(first) = seen.get(&text) {
                let first = *first;
                self.warning(
                    "W003",
                    item.span(),
                    format!("statement repeats the one at {}", first),
                );
            } else {
                seen.insert(text, item.span());
            }

            match item {
                Item::Labels(_) => {}
                Item::Rule(decl) => self.check_rule(decl),
                Item::Query(decl) => self.check_query(decl),
            }
        }
    }

    fn check_rule(&mut self, decl: &RuleDecl) {
        for head in &decl.consequence {
            for arg in &head.args {
                if arg.kind == ArgKind::Wildcard {
                    self.error(
                        "E007",
                        arg.span,
                        format!("wildcard in consequence `{}`", head),
                    );
                }
            }
        }

        let head_vars: Vec<&str> = decl.consequence.iter().flat_map(|p| p.variables()).collect();

        let Some(antecedent) = &decl.antecedent else {
            let mut reported = HashSet::new();
            for head in &decl.consequence {
                for arg in &head.args {
                    if let Some(var) = arg.var_name() {
                        if reported.insert(var) {
                            self.error(
                                "E003",
                                arg.span,
                                format!("variable `{}` in a fact is never bound", var),
                            );
                        }
                    }
                }
            }
            self.check_singletons(&head_vars, decl.span);
            return;
        };

        self.check_formula(antecedent);

        let mut unbound_reported = HashSet::new();
        let mut unsafe_reported = HashSet::new();
        for alternative in antecedent.alternatives() {
            let bound = self.check_alternative(&alternative, &head_vars, &mut unsafe_reported);
            for head in &decl.consequence {
                for arg in &head.args {
                    let Some(var) = arg.var_name() else { continue };
                    if !bound.contains(var) && unbound_reported.insert(var) {
                        self.error(
                            "E003",
                            arg.span,
                            format!(
                                "variable `{}` in `{}` is not bound by the antecedent",
                                var, head
                            ),
                        );
                    }
                }
            }
        }

        let mut occurrences = head_vars.clone();
        antecedent.variables(&mut occurrences);
        self.check_singletons(&occurrences, decl.span);
    }

    fn check_query(&mut self, decl: &QueryDecl) {
        self.check_formula(&decl.body);

        let head_vars = decl.head_variables();
        let mut unsafe_reported = HashSet::new();
        let mut partial_reported = HashSet::new();
        for alternative in decl.body.alternatives() {
            let bound = self.check_alternative(&alternative, &[], &mut unsafe_reported);
            for var in &head_vars {
                if !bound.contains(var) && partial_reported.insert(*var) {
                    self.warning(
                        "W004",
                        decl.name_span,
                        format!(
                            "variable `{}` of query `{}` is unbound in some alternatives",
                            var, decl.name
                        ),
                    );
                }
            }
        }
    }

    /// Walks one conjunction left to right. Returns the variables bound by
    /// its positive literals.
    fn check_alternative<'t>(
        &mut self,
        alternative: &[&'t Literal],
        outside: &[&'t str],
        reported: &mut HashSet<(String, usize)>,
    ) -> HashSet<&'t str> {
        let mut bound: HashSet<&'t str> = HashSet::new();
        for (i, literal) in alternative.iter().enumerate() {
            match *literal {
                Literal::Positive(p) => bound.extend(p.variables()),
                Literal::Compare(c) => {
                    let mut vars = Vec::new();
                    literal.variables(&mut vars);
                    for var in vars {
                        if !bound.contains(var) && reported.insert((var.to_string(), c.span.start)) {
                            self.error(
                                "E008",
                                c.span,
                                format!("variable `{}` is compared before it is bound", var),
                            );
                        }
                    }
                }
                Literal::Negated(_, span) => {
                    let mut inner = Vec::new();
                    literal.variables(&mut inner);
                    let mut elsewhere: Vec<&str> = outside.to_vec();
                    for (j, other) in alternative.iter().enumerate() {
                        if j != i {
                            other.variables(&mut elsewhere);
                        }
                    }
                    for var in inner {
                        if elsewhere.contains(&var)
                            && !bound.contains(var)
                            && reported.insert((var.to_string(), span.start))
                        {
                            self.error(
                                "E008",
                                *span,
                                format!("variable `{}` is negated before it is bound", var),
                            );
                        }
                    }
                }
                Literal::Group(_) => {}
            }
        }
        bound
    }

    fn check_formula(&mut self, formula: &Formula) {
        for literal in formula.disjuncts.iter().flat_map(|c| &c.literals) {
            match literal {
                Literal::Positive(p) => self.check_reference(p),
                Literal::Negated(inner, _) | Literal::Group(inner) => self.check_formula(inner),
                Literal::Compare(c) => self.check_comparison(c),
            }
        }
    }

    fn check_comparison(&mut self, comparison: &Comparison) {
        if !comparison.op.is_ordering() {
            return;
        }
        for side in [&comparison.left, &comparison.right] {
            if side.is_symbol() {
                self.error(
                    "E006",
                    side.span,
                    format!(
                        "`{}` needs numbers but `{}` is a symbol",
                        comparison.op.symbol(),
                        side
                    ),
                );
            }
        }
    }

    fn check_reference(&mut self, predicate: &Predicate) {
        let name = predicate.name.as_str();
        let arity = predicate.arity();
        self.referenced.insert(name.to_string());

        if self.catalog.contains_name(name) {
            match self.catalog.kind(name, arity) {
                Some(kind) => self.check_builtin_types(predicate, kind),
                None => {
                    let arities: Vec<String> = self
                        .catalog
                        .arities(name)
                        .iter()
                        .map(|a| a.to_string())
                        .collect();
                    self.error(
                        "E002",
                        predicate.span,
                        format!(
                            "`{}` takes {} argument(s), found {}",
                            name,
                            arities.join(" or "),
                            arity
                        ),
                    );
                }
            }
            return;
        }

        match self.defined.get(name) {
            Some(def) if def.arity != arity => {
                let message = format!(
                    "`{}` takes {} argument(s), found {}",
                    name, def.arity, arity
                );
                self.error("E002", predicate.span, message);
            }
            Some(_) => {}
            None => self.error(
                "E001",
                predicate.span,
                format!("undefined predicate `{}/{}`", name, arity),
            ),
        }
    }

    fn check_builtin_types(&mut self, predicate: &Predicate, kind: BuiltinKind) {
        let expect_symbol = |checker: &mut Self, arg: &Arg, role: &str| {
            if arg.is_number() {
                checker.error(
                    "E006",
                    arg.span,
                    format!("{} in `{}` must be a symbol, found {}", role, predicate, arg),
                );
            }
        };

        match kind {
            BuiltinKind::Structural => {
                for arg in &predicate.args {
                    expect_symbol(self, arg, "element id");
                }
            }
            BuiltinKind::Attribute => {
                if let [id, name, _] = predicate.args.as_slice() {
                    expect_symbol(self, id, "element id");
                    expect_symbol(self, name, "attribute name");
                }
            }
            BuiltinKind::Numeric => {
                if let [key, value] = predicate.args.as_slice() {
                    expect_symbol(self, key, "element id");
                    if value.is_symbol() {
                        self.error(
                            "E006",
                            value.span,
                            format!(
                                "metric value in `{}` must be a number, found {}",
                                predicate, value
                            ),
                        );
                    }
                }
            }
            BuiltinKind::Boolean => {
                if let Some(key) = predicate.args.first() {
                    expect_symbol(self, key, "element id");
                }
            }
            BuiltinKind::Reserved => {}
        }
    }

    fn check_singletons(&mut self, occurrences: &[&str], span: Span) {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for var in occurrences {
            match counts.iter_mut().find(|(name, _)| name == var) {
                Some((_, n)) => *n += 1,
                None => counts.push((*var, 1)),
            }
        }
        for (var, n) in counts {
            if n == 1 && !var.starts_with('_') {
                self.warning(
                    "W001",
                    span,
                    format!("variable `{}` occurs only once; use `_` if intended", var),
                );
            }
        }
    }

    fn check_unused_labels(&mut self, script: &Script) {
        for item in &script.items {
            let Item::Labels(decl) = item else { continue };
            for label in &decl.labels {
                let name = label.predicate_name();
                if !self.referenced.contains(name) {
                    self.warning(
                        "W002",
                        label.span,
                        format!("label predicate `{}` is never used", name),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::standard;
    use crate::syntax::parse;

    fn run(source: &str) -> CheckResult {
        let mut catalog = standard::declarations().catalog();
        catalog.reserve("query", 2);
        catalog.reserve("not", 1);
        check(&parse(source).unwrap(), &catalog)
    }

    fn codes(diagnostics: &Diagnostics) -> Vec<&'static str> {
        diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_clean_script() {
        let result = run(
            "node labels: wolf, goat as prey.\n\
             wolf(X) -> color(X, red).\n\
             prey(X), degree(X, D), D > 2 -> width(X, D).\n\
             query red: color(X, red).",
        );
        assert!(result.is_ok(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_undefined_predicate_and_arity() {
        let result = run("node(X), color(X) -> big(X).\nbig(X, Y), degree(X) -> huge(X, Y).");
        assert_eq!(codes(&result.errors), vec!["E001", "E002", "E002"]);
    }

    #[test]
    fn test_unbound_consequence_variable() {
        let result = run("node(X) -> link(X, Y).\nnode(X); edge(X) -> el(X).\nnode(X); edge(Y) -> bad(X).");
        assert_eq!(codes(&result.errors), vec!["E003", "E003"]);
    }

    #[test]
    fn test_fact_with_variable() {
        let result = run("color(X, red).");
        assert_eq!(codes(&result.errors), vec!["E003"]);
        assert_eq!(codes(&result.warnings), vec!["W001"]);
    }

    #[test]
    fn test_duplicate_names() {
        let result = run(
            "node labels: wolf.\nedge labels: wolf.\nquery q: node(X).\nquery q: edge(X).\nq(a, b).",
        );
        assert_eq!(codes(&result.errors), vec!["E004", "E004", "E002"]);
    }

    #[test]
    fn test_builtin_clash() {
        let result = run("node labels: degree.\nnode(X) -> edge(X).\nquery(a, b).");
        assert_eq!(codes(&result.errors), vec!["E005", "E005", "E005"]);
    }

    #[test]
    fn test_literal_types() {
        let result = run(
            "node(X), degree(X, high) -> a(X).\n\
             node(X), attribute(X, 3, V) -> b(X, V).\n\
             node(X), X < big -> c(X).\n\
             node(7) -> d(x).",
        );
        assert_eq!(codes(&result.errors), vec!["E006", "E006", "E006", "E006"]);
    }

    #[test]
    fn test_wildcard_in_consequence() {
        let result = run("node(X) -> color(X, _).");
        assert_eq!(codes(&result.errors), vec!["E007"]);
    }

    #[test]
    fn test_negation_and_comparison_safety() {
        let result = run(
            "not is_leaf(X), node(X) -> a(X).\n\
             node(X), not edge(X, _) -> b(X).\n\
             node(X), not edge(X, Y) -> c(X).\n\
             D > 2, node(X), degree(X, D) -> d(X).",
        );
        assert_eq!(codes(&result.errors), vec!["E008", "E008"]);
        assert_eq!(result.errors.iter().next().unwrap().span.unwrap().line, 1);
    }

    #[test]
    fn test_label_without_alias() {
        let result = run("node labels: \"big cat\", \"small cat\" as kitten.\nkitten(X) -> small(X).");
        assert_eq!(codes(&result.errors), vec!["E009"]);
    }

    #[test]
    fn test_warnings() {
        let result = run(
            "node labels: wolf, sheep.\n\
             node(X), edge(X, Y) -> hub(X).\n\
             wolf(X) -> color(X, red).\n\
             wolf(X) -> color(X, red).\n\
             query q: node(X); edge(Y).",
        );
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(codes(&result.warnings), vec!["W001", "W003", "W004", "W004", "W002"]);
    }

    #[test]
    fn test_collects_everything() {
        let result = run("a(X) -> b(X).\nc(Y) -> d(Z).\nnode(X) -> e(X, _).");
        assert_eq!(result.errors.len(), 4);
    }
}
