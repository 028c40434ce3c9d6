// SPDX-License-Identifier: PMPL-1.0-or-later

//! pest-driven parser producing the script tree

use super::ast::{
    Arg, ArgKind, CompareOp, Comparison, Conjunction, Formula, Item, Label, LabelDecl, LabelKind,
    Literal, Predicate, QueryDecl, RuleDecl, Script,
};
use crate::diagnostics::{Diagnostic, Diagnostics, Phase, Span};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use tracing::debug;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct ScriptParser;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{message}")]
    Syntax { message: String, span: Span },

    #[error("malformed {0}")]
    Missing(&'static str),

    #[error("integer literal `{text}` out of range")]
    IntRange { text: String, span: Span },
}

impl ParseError {
    fn into_diagnostic(self) -> Diagnostic {
        let span = match &self {
            ParseError::Syntax { span, .. } | ParseError::IntRange { span, .. } => Some(*span),
            ParseError::Missing(_) => None,
        };
        let diagnostic = Diagnostic::error(Phase::Syntax, "S001", self.to_string());
        match span {
            Some(span) => diagnostic.with_span(span),
            None => diagnostic,
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        let (start, end) = match err.location {
            pest::error::InputLocation::Pos(p) => (p, p),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        ParseError::Syntax {
            message: err.variant.message().to_string(),
            span: Span::new(start, end, line, column),
        }
    }
}

struct ParserContext {
    /// Malformed statements skipped by recovery
    caught: Diagnostics,
}

impl ParserContext {
    fn new() -> Self {
        Self {
            caught: Diagnostics::new(),
        }
    }

    fn span(&self, pair: &Pair<Rule>) -> Span {
        span_of(pair)
    }

    fn report_invalid_syntax(&mut self, pair: &Pair<Rule>) {
        let content = pair.as_str().trim();
        let message = if content.chars().count() > 50 {
            let head: String = content.chars().take(47).collect();
            format!("unexpected syntax: `{}...`", head)
        } else {
            format!("unexpected syntax: `{}`", content)
        };
        self.caught.push(
            Diagnostic::error(Phase::Syntax, "S002", message).with_span(self.span(pair)),
        );
    }
}

fn span_of(pair: &Pair<Rule>) -> Span {
    let pest_span = pair.as_span();
    let (line, column) = pest_span.start_pos().line_col();
    Span::new(pest_span.start(), pest_span.end(), line, column)
}

/// Parse a whole script. Every malformed statement contributes one
/// diagnostic; the tree is only returned when there are none.
pub fn parse(source: &str) -> Result<Script, Diagnostics> {
    let pairs = ScriptParser::parse(Rule::script, source)
        .map_err(|err| Diagnostics::from(vec![ParseError::from(err).into_diagnostic()]))?;
    let mut ctx = ParserContext::new();
    let script = parse_script(&mut ctx, pairs)
        .map_err(|err| Diagnostics::from(vec![err.into_diagnostic()]))?;
    if !ctx.caught.is_empty() {
        debug!(errors = ctx.caught.len(), "syntax recovery");
        return Err(ctx.caught);
    }
    Ok(script)
}

/// Parse a standalone goal formula (trailing dot optional)
pub fn parse_goal(source: &str) -> Result<Formula, Diagnostics> {
    let to_diagnostics = |err: ParseError| Diagnostics::from(vec![err.into_diagnostic()]);
    let mut pairs = ScriptParser::parse(Rule::goal, source)
        .map_err(|err| to_diagnostics(ParseError::from(err)))?;
    let goal = pairs.next().ok_or(ParseError::Missing("goal")).map_err(to_diagnostics)?;
    let ctx = ParserContext::new();
    let formula = goal
        .into_inner()
        .find(|p| p.as_rule() == Rule::formula)
        .ok_or(ParseError::Missing("goal"))
        .map_err(to_diagnostics)?;
    parse_formula(&ctx, formula).map_err(to_diagnostics)
}

fn parse_script(ctx: &mut ParserContext, mut pairs: Pairs<Rule>) -> Result<Script, ParseError> {
    let script_pair = pairs.next().ok_or(ParseError::Missing("script"))?;
    let mut items = Vec::new();

    for inner in script_pair.into_inner() {
        let item = match inner.as_rule() {
            Rule::label_decl => parse_label_decl(ctx, inner).map(Item::Labels),
            Rule::query_decl => parse_query(ctx, inner).map(Item::Query),
            Rule::rule_decl => parse_rule(ctx, inner).map(Item::Rule),
            Rule::CATCH_ALL => {
                ctx.report_invalid_syntax(&inner);
                continue;
            }
            _ => continue,
        };
        // a statement that matched the grammar but not its value rules
        match item {
            Ok(item) => items.push(item),
            Err(err) => ctx.caught.push(err.into_diagnostic()),
        }
    }

    Ok(Script { items })
}

fn parse_label_decl(ctx: &ParserContext, pair: Pair<Rule>) -> Result<LabelDecl, ParseError> {
    let span = ctx.span(&pair);
    let mut kind = None;
    let mut labels = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::label_kind => {
                kind = Some(if inner.as_str().starts_with("edge") {
                    LabelKind::Edge
                } else {
                    LabelKind::Node
                });
            }
            Rule::label => labels.push(parse_label(ctx, inner)?),
            _ => {}
        }
    }

    Ok(LabelDecl {
        kind: kind.ok_or(ParseError::Missing("label kind"))?,
        labels,
        span,
    })
}

fn parse_label(ctx: &ParserContext, pair: Pair<Rule>) -> Result<Label, ParseError> {
    let span = ctx.span(&pair);
    let mut value = None;
    let mut alias = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident if value.is_none() => value = Some(inner.as_str().to_string()),
            Rule::string => value = Some(parse_string(inner)),
            Rule::ident => alias = Some(inner.as_str().to_string()),
            _ => {}
        }
    }

    Ok(Label {
        value: value.ok_or(ParseError::Missing("label value"))?,
        alias,
        span,
    })
}

fn parse_query(ctx: &ParserContext, pair: Pair<Rule>) -> Result<QueryDecl, ParseError> {
    let span = ctx.span(&pair);
    let mut name = None;
    let mut body = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some((inner.as_str().to_string(), ctx.span(&inner))),
            Rule::formula => body = Some(parse_formula(ctx, inner)?),
            _ => {}
        }
    }

    let (name, name_span) = name.ok_or(ParseError::Missing("query name"))?;
    Ok(QueryDecl {
        name,
        name_span,
        body: body.ok_or(ParseError::Missing("query body"))?,
        span,
    })
}

fn parse_rule(ctx: &ParserContext, pair: Pair<Rule>) -> Result<RuleDecl, ParseError> {
    let span = ctx.span(&pair);
    let mut antecedent = None;
    let mut consequence = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::formula => antecedent = Some(parse_formula(ctx, inner)?),
            Rule::consequence => {
                for p in inner.into_inner() {
                    consequence.push(parse_predicate(ctx, p)?);
                }
            }
            _ => {}
        }
    }

    if consequence.is_empty() {
        return Err(ParseError::Missing("consequence"));
    }
    Ok(RuleDecl {
        antecedent,
        consequence,
        span,
    })
}

fn parse_formula(ctx: &ParserContext, pair: Pair<Rule>) -> Result<Formula, ParseError> {
    let span = ctx.span(&pair);
    let mut disjuncts = Vec::new();
    for conjunction in pair.into_inner() {
        let mut literals = Vec::new();
        for literal in conjunction.into_inner() {
            literals.push(parse_literal(ctx, literal)?);
        }
        disjuncts.push(Conjunction { literals });
    }
    Ok(Formula { disjuncts, span })
}

fn parse_literal(ctx: &ParserContext, pair: Pair<Rule>) -> Result<Literal, ParseError> {
    let span = ctx.span(&pair);
    match pair.as_rule() {
        Rule::predicate => Ok(Literal::Positive(parse_predicate(ctx, pair)?)),
        Rule::group => Ok(Literal::Group(Box::new(parse_group(ctx, pair)?))),
        Rule::negation => {
            let inner = pair
                .into_inner()
                .find(|p| matches!(p.as_rule(), Rule::group | Rule::predicate))
                .ok_or(ParseError::Missing("negated formula"))?;
            let formula = match inner.as_rule() {
                Rule::group => parse_group(ctx, inner)?,
                _ => {
                    let predicate_span = ctx.span(&inner);
                    Formula {
                        disjuncts: vec![Conjunction {
                            literals: vec![Literal::Positive(parse_predicate(ctx, inner)?)],
                        }],
                        span: predicate_span,
                    }
                }
            };
            Ok(Literal::Negated(Box::new(formula), span))
        }
        Rule::comparison => {
            let mut inner = pair.into_inner();
            let left = parse_arg(ctx, inner.next().ok_or(ParseError::Missing("comparison"))?)?;
            let op_pair = inner.next().ok_or(ParseError::Missing("comparison operator"))?;
            let op = CompareOp::from_symbol(op_pair.as_str())
                .ok_or(ParseError::Missing("comparison operator"))?;
            let right = parse_arg(ctx, inner.next().ok_or(ParseError::Missing("comparison"))?)?;
            Ok(Literal::Compare(Comparison {
                op,
                left,
                right,
                span,
            }))
        }
        _ => Err(ParseError::Syntax {
            message: format!("unexpected {:?}", pair.as_rule()),
            span,
        }),
    }
}

fn parse_group(ctx: &ParserContext, pair: Pair<Rule>) -> Result<Formula, ParseError> {
    let formula = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Missing("parenthesized formula"))?;
    parse_formula(ctx, formula)
}

fn parse_predicate(ctx: &ParserContext, pair: Pair<Rule>) -> Result<Predicate, ParseError> {
    let span = ctx.span(&pair);
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or(ParseError::Missing("predicate name"))?
        .as_str()
        .to_string();
    let args = inner.map(|p| parse_arg(ctx, p)).collect::<Result<Vec<_>, _>>()?;
    Ok(Predicate { name, args, span })
}

fn parse_arg(ctx: &ParserContext, pair: Pair<Rule>) -> Result<Arg, ParseError> {
    let span = ctx.span(&pair);
    let text = pair.as_str();
    let kind = match pair.as_rule() {
        Rule::variable => ArgKind::Var(text.to_string()),
        Rule::wildcard => ArgKind::Wildcard,
        Rule::ident => ArgKind::Ident(text.to_string()),
        Rule::string => ArgKind::Str(parse_string(pair)),
        Rule::integer => ArgKind::Int(text.parse().map_err(|_| ParseError::IntRange {
            text: text.to_string(),
            span,
        })?),
        Rule::float => ArgKind::Float(text.parse().map_err(|_| ParseError::Syntax {
            message: format!("invalid number `{}`", text),
            span,
        })?),
        other => {
            return Err(ParseError::Syntax {
                message: format!("unexpected {:?}", other),
                span,
            })
        }
    };
    Ok(Arg { kind, span })
}

fn parse_string(pair: Pair<Rule>) -> String {
    let raw = pair
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_rules_and_queries() {
        let script = parse(
            r#"
            % food chain
            node labels: wolf, goat as prey, "big cat" as cat.
            wolf(X) -> color(X, red), shape(X, box).
            title(graph, "Food chain").
            query hubs: node(X), degree(X, D), D > 3.
            "#,
        )
        .unwrap();
        assert_eq!(script.items.len(), 4);

        let Item::Labels(labels) = &script.items[0] else {
            panic!("expected label declaration");
        };
        assert_eq!(labels.kind, LabelKind::Node);
        assert_eq!(labels.labels[1].predicate_name(), "prey");
        assert_eq!(labels.labels[2].value, "big cat");

        let Item::Rule(rule) = &script.items[1] else {
            panic!("expected rule");
        };
        assert!(rule.antecedent.is_some());
        assert_eq!(rule.consequence.len(), 2);
        assert_eq!(rule.span.line, 4);

        let Item::Rule(fact) = &script.items[2] else {
            panic!("expected fact");
        };
        assert!(fact.antecedent.is_none());
        assert_eq!(fact.consequence[0].args[1].kind, ArgKind::Str("Food chain".into()));

        let Item::Query(query) = &script.items[3] else {
            panic!("expected query");
        };
        assert_eq!(query.name, "hubs");
        assert_eq!(query.body.to_string(), "node(X), degree(X, D), D > 3");
    }

    #[test]
    fn test_negation_groups_and_terms() {
        let script = parse("node(X), not (wolf(X); is_leaf(X)), W == -2.5, _ != \"a\\\"b\" -> width(X, 2).")
            .unwrap();
        let Item::Rule(rule) = &script.items[0] else {
            panic!("expected rule");
        };
        let antecedent = rule.antecedent.as_ref().unwrap();
        let literals = &antecedent.disjuncts[0].literals;
        assert_eq!(literals.len(), 4);
        assert!(matches!(literals[1], Literal::Negated(..)));
        let Literal::Compare(cmp) = &literals[2] else {
            panic!("expected comparison");
        };
        assert_eq!(cmp.right.kind, ArgKind::Float(-2.5));
        let Literal::Compare(cmp) = &literals[3] else {
            panic!("expected comparison");
        };
        assert_eq!(cmp.left.kind, ArgKind::Wildcard);
        assert_eq!(cmp.right.kind, ArgKind::Str("a\"b".into()));
    }

    #[test]
    fn test_keywords_do_not_swallow_predicates() {
        let script = parse("node(X), edge(X, Y) -> nodes(X). query(a, 1). notable(x).").unwrap();
        assert_eq!(script.items.len(), 3);
        assert!(script.items.iter().all(|i| matches!(i, Item::Rule(_))));
    }

    #[test]
    fn test_recovery_reports_every_bad_statement() {
        let errors = parse(
            "wolf(X) -> color(X, red).\n\
             this is not valid.\n\
             color(X red).\n\
             prey(X) -> shape(X, box).",
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        let lines: Vec<usize> = errors.iter().filter_map(|d| d.span).map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert!(errors.iter().all(|d| d.phase == Phase::Syntax && d.is_error()));
    }

    #[test]
    fn test_integer_overflow_does_not_stop_recovery() {
        let errors = parse(
            "node labels wolf.\n\
             size(a, 99999999999999999999).\n\
             query : node(X).\n\
             big(a, 99999999999999999999).\n",
        )
        .unwrap_err();
        let found: Vec<(&str, usize)> = errors
            .iter()
            .map(|d| (d.code, d.span.map(|s| s.line).unwrap_or(0)))
            .collect();
        assert_eq!(found, vec![("S002", 1), ("S001", 2), ("S002", 3), ("S001", 4)]);
    }

    #[test]
    fn test_recovery_skips_dots_in_strings_and_floats() {
        let errors = parse("title(graph \"v1.0\").\nwidth(a 2.5).\nok(a).").unwrap_err();
        assert_eq!(errors.len(), 2);
        let lines: Vec<usize> = errors.iter().filter_map(|d| d.span).map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn test_missing_final_dot_is_reported() {
        let errors = parse("a(x).\nb(y)").unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_comments() {
        let script = parse("/* block\n comment */ a(x). // trailing\n% line\nb(y).").unwrap();
        assert_eq!(script.items.len(), 2);
    }

    #[test]
    fn test_dnf_alternatives() {
        let script = parse("(a(X); b(X)), (c(X); d(X)); e(X) -> f(X).").unwrap();
        let Item::Rule(rule) = &script.items[0] else {
            panic!("expected rule");
        };
        let antecedent = rule.antecedent.as_ref().unwrap();
        let alts: Vec<String> = antecedent
            .alternatives()
            .iter()
            .map(|alt| alt.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", "))
            .collect();
        assert_eq!(
            alts,
            vec!["a(X), c(X)", "a(X), d(X)", "b(X), c(X)", "b(X), d(X)", "e(X)"]
        );
        assert_eq!(antecedent.alternative_count(), 5);
    }

    #[test]
    fn test_parse_goal() {
        let goal = parse_goal("node(X), degree(X, D)").unwrap();
        assert_eq!(goal.disjuncts[0].literals.len(), 2);
        assert!(parse_goal("node(X) ->").is_err());
    }
}
