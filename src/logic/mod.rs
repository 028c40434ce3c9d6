// SPDX-License-Identifier: PMPL-1.0-or-later

//! Logic terms and the resolution engine that evaluates compiled programs

pub mod bindings;
pub mod engine;
pub mod term;

pub use bindings::Bindings;
pub use engine::{Engine, Solution, Solutions};
pub use term::{Clause, Number, Signature, Term, Var};
