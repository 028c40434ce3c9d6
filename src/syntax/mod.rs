// SPDX-License-Identifier: PMPL-1.0-or-later

//! Vis script front end: grammar, parse tree and parser

pub mod ast;
pub mod parser;

pub use ast::Script;
pub use parser::{parse, parse_goal};
