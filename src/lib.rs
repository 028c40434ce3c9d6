// SPDX-License-Identifier: PMPL-1.0-or-later

//! Vislog: graph styling scripts compiled to logic programs.
//!
//! A vis script declares labels, styling rules and named queries over an
//! attributed graph. The crate compiles scripts into Horn clauses and
//! evaluates them against a live graph through a library of foreign
//! predicates.
//!
//! PIPELINE:
//! 1. **Syntax**: a pest grammar turns script text into a typed tree,
//!    recovering at statement boundaries so every malformed statement is
//!    reported.
//! 2. **Checker**: names, arities, literal types and variable safety,
//!    collected in one pass.
//! 3. **Generator**: ordered lowering to clauses.
//! 4. **Library + Engine**: graph-backed predicates and lazy SLD
//!    resolution over the generated clauses.

pub mod checker;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod generator;
pub mod graph;
pub mod library;
pub mod logic;
pub mod report;
pub mod syntax;

pub use compiler::{CompileError, Compiler, Program};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use graph::Graph;
pub use library::Library;
pub use logic::{Engine, Solution, Term};
