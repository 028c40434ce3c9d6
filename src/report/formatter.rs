// SPDX-License-Identifier: PMPL-1.0-or-later

//! Terminal rendering of diagnostics and answers

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::library::Predicate;
use crate::report::output::QueryAnswers;
use colored::*;

pub struct ReportFormatter {
    source_name: String,
}

impl ReportFormatter {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
        }
    }

    /// One line per diagnostic, `file:line:col: error[E001]: message`
    pub fn diagnostic_line(&self, diagnostic: &Diagnostic) -> String {
        let tag = format!("{}[{}]", diagnostic.severity.tag(), diagnostic.code);
        let tag = match diagnostic.severity {
            Severity::Error => tag.red().bold(),
            Severity::Warning => tag.yellow().bold(),
        };
        let location = match diagnostic.span {
            Some(span) => format!("{}:{}", self.source_name, span),
            None => self.source_name.clone(),
        };
        format!("{}: {}: {}", location.bold(), tag, diagnostic.message)
    }

    pub fn print_diagnostics(&self, diagnostics: &Diagnostics) {
        for diagnostic in diagnostics {
            eprintln!("{}", self.diagnostic_line(diagnostic));
        }
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();
        if errors > 0 {
            eprintln!(
                "{}",
                format!("{} error(s), {} warning(s)", errors, warnings).red()
            );
        } else if warnings > 0 {
            eprintln!("{}", format!("{} warning(s)", warnings).yellow());
        }
    }

    pub fn print_answers(&self, answers: &[QueryAnswers]) {
        for answer in answers {
            println!("{}", answer.query.bold().cyan());
            if answer.solutions.is_empty() {
                println!("  {}", "false".dimmed());
            }
            for solution in &answer.solutions {
                println!("  {}", solution);
            }
            if answer.truncated {
                println!("  {}", "(search depth limit reached)".yellow());
            }
        }
    }

    pub fn print_predicates(&self, predicates: &[&Predicate]) {
        println!("{}", "GRAPH PREDICATES".bold().yellow());
        for predicate in predicates {
            println!(
                "  {:<22} {:<10} {}",
                predicate.signature.to_string().bold(),
                format!("{:?}", predicate.kind).to_lowercase(),
                predicate.scope.to_string().dimmed()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Phase, Span};

    #[test]
    fn test_diagnostic_line() {
        colored::control::set_override(false);
        let formatter = ReportFormatter::new("food.vis");
        let d = Diagnostic::error(Phase::Check, "E001", "undefined predicate `x/1`")
            .with_span(Span::new(10, 14, 2, 5));
        assert_eq!(
            formatter.diagnostic_line(&d),
            "food.vis:2:5: error[E001]: undefined predicate `x/1`"
        );
        let w = Diagnostic::warning(Phase::Generate, "W101", "big");
        assert_eq!(formatter.diagnostic_line(&w), "food.vis: warning[W101]: big");
    }
}
