// SPDX-License-Identifier: PMPL-1.0-or-later

//! Compilation pipeline: parse, check, generate
//!
//! `compile` produces either a clause program or a failure tagged with the
//! phase that stopped it, never both. Diagnostics travel with the returned
//! value; a `Compiler` keeps no state between calls.

use crate::checker;
use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::generator;
use crate::library::{standard, Catalog};
use crate::logic::term::{Clause, Number, Signature, Term};
use crate::syntax;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Engine control constructs scripts may not define
const ENGINE_RESERVED: &[(&str, usize)] = &[
    ("query", 2),
    ("not", 1),
    ("true", 0),
    ("fail", 0),
    ("false", 0),
];

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error("syntax errors: {}", .0.error_count())]
    Syntax(Diagnostics),

    #[error("check failed with {} error(s)", .0.error_count())]
    Check(Diagnostics),
}

impl CompileError {
    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            CompileError::Syntax(d) | CompileError::Check(d) => d,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics().errors()
    }

    /// Empty for syntax failures: checking never ran
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics().warnings()
    }
}

/// A compiled script
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub clauses: Vec<Clause>,
    pub warnings: Diagnostics,
}

impl Program {
    pub fn warnings(&self) -> &Diagnostics {
        &self.warnings
    }

    /// Names and arities of the script's queries, in declaration order
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.clauses
            .iter()
            .filter(|c| c.is_fact())
            .filter_map(|c| match &c.head {
                Term::Compound(name, args) if name == "query" => match args.as_slice() {
                    [Term::Atom(query), Term::Number(Number::Int(n))] => {
                        Some((query.clone(), usize::try_from(*n).ok()?))
                    }
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }

    /// Goal that enumerates a query's answers, e.g. `hubs(X, D)`
    pub fn query_goal(&self, name: &str) -> Option<Term> {
        let (_, arity) = self.queries().into_iter().find(|(q, _)| q == name)?;
        let signature = Signature::new(name, arity);
        self.clauses
            .iter()
            .find(|c| c.signature().as_ref() == Some(&signature))
            .map(|c| c.head.clone())
    }

    /// blake3 digest of the rendered clause text
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for clause in &self.clauses {
            hasher.update(clause.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize().as_bytes())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for clause in &self.clauses {
            writeln!(f, "{}", clause)?;
        }
        Ok(())
    }
}

pub struct Compiler {
    catalog: Catalog,
    config: CompilerConfig,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// Compiler for scripts run against the standard graph library
    pub fn new() -> Self {
        Self::with_catalog(standard::declarations().catalog(), CompilerConfig::default())
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self::with_catalog(standard::declarations().catalog(), config)
    }

    pub fn with_catalog(mut catalog: Catalog, config: CompilerConfig) -> Self {
        for (name, arity) in ENGINE_RESERVED {
            catalog.reserve(name, *arity);
        }
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn compile(&self, source: &str) -> Result<Program, CompileError> {
        let script = syntax::parse(source).map_err(|errors| {
            debug!(errors = errors.len(), "syntax failure");
            CompileError::Syntax(errors)
        })?;

        let checked = checker::check(&script, &self.catalog);
        if !checked.is_ok() {
            let mut diagnostics = checked.errors;
            diagnostics.extend(checked.warnings);
            return Err(CompileError::Check(diagnostics));
        }

        let generated = generator::generate(&script, self.config.expansion_warning);
        let mut warnings = checked.warnings;
        warnings.extend(generated.warnings);
        debug!(
            clauses = generated.clauses.len(),
            warnings = warnings.len(),
            "compiled"
        );
        Ok(Program {
            clauses: generated.clauses,
            warnings,
        })
    }
}
