// SPDX-License-Identifier: PMPL-1.0-or-later

//! Serialization of compiled programs and query answers

use crate::compiler::Program;
use crate::logic::engine::Solution;
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Format named by a file extension or format name
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" | "txt" | "pl" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }

    pub fn program(&self, program: &Program) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(program.to_string()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(program)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(program)?),
        }
    }

    pub fn answers(&self, answers: &[QueryAnswers]) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(answers_as_text(answers)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(answers)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(answers)?),
        }
    }
}

/// Solutions of one named query or goal
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswers {
    pub query: String,
    pub solutions: Vec<Solution>,
    /// Set when the search was cut short by the depth limit
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

fn answers_as_text(answers: &[QueryAnswers]) -> String {
    let mut lines = Vec::new();
    for answer in answers {
        lines.push(format!("{}:", answer.query));
        if answer.solutions.is_empty() {
            lines.push("  false".to_string());
        }
        for solution in &answer.solutions {
            lines.push(format!("  {}", solution));
        }
    }
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    #[test]
    fn test_parse_format_names() {
        assert_eq!(OutputFormat::parse("YML"), Some(OutputFormat::Yaml));
        assert_eq!(OutputFormat::parse("pl"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("xml"), None);
    }

    #[test]
    fn test_program_serialization() {
        let program = Compiler::new().compile("node(X) -> big(X).").unwrap();
        assert_eq!(OutputFormat::Text.program(&program).unwrap(), "big(X) :- node(X).\n");

        let json: serde_json::Value =
            serde_json::from_str(&OutputFormat::Json.program(&program).unwrap()).unwrap();
        assert_eq!(json["clauses"][0]["head"]["compound"][0], "big");
        assert!(json["warnings"].as_array().unwrap().is_empty());

        let yaml = OutputFormat::Yaml.program(&program).unwrap();
        assert!(yaml.contains("clauses:"));
    }

    #[test]
    fn test_empty_answers_print_false() {
        let answers = vec![QueryAnswers {
            query: "none".into(),
            solutions: Vec::new(),
            truncated: false,
        }];
        assert_eq!(OutputFormat::Text.answers(&answers).unwrap(), "none:\n  false\n");
        let json = OutputFormat::Json.answers(&answers).unwrap();
        assert!(!json.contains("truncated"));
    }
}
