// SPDX-License-Identifier: PMPL-1.0-or-later

//! vislog: compile vis scripts into logic programs and query graphs with them

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vislog::compiler::{Compiler, Program};
use vislog::config::Config;
use vislog::generator::lower_goal;
use vislog::graph::load_graph;
use vislog::library::Library;
use vislog::logic::Engine;
use vislog::report::{emit, OutputFormat, QueryAnswers, ReportFormatter};
use vislog::syntax::parse_goal;

#[derive(Parser)]
#[command(name = "vislog")]
#[command(version)]
#[command(about = "Compile vis scripts to logic programs and query attributed graphs")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and check a script, reporting every diagnostic
    Check {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },

    /// Compile a script and print the generated clauses
    Compile {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a script and answer its queries against a graph
    Run {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Graph document (JSON or YAML)
        #[arg(short, long)]
        graph: PathBuf,

        /// Queries to run (default: every query in the script)
        #[arg(short, long, value_delimiter = ',')]
        query: Vec<String>,

        /// Ad-hoc goal, e.g. "node(X), degree(X, D)"
        #[arg(long, conflicts_with = "query")]
        goal: Option<String>,

        /// Maximum solutions per query
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the graph predicates scripts can use
    Predicates,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.no_color {
        config.output.color = false;
    }
    if !config.output.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Check { script } => {
            let program = compile_script(&config, &script)?;
            println!(
                "{}: ok ({} clauses, {} warnings)",
                script.display(),
                program.clauses.len(),
                program.warnings.len()
            );
        }

        Commands::Compile {
            script,
            format,
            output,
        } => {
            let program = compile_script(&config, &script)?;
            info!(fingerprint = %program.fingerprint(), "program ready");
            // `-o out.json` picks JSON unless a format was asked for
            let format = match (format, output.as_deref().and_then(|p| p.extension())) {
                (OutputFormat::Text, Some(ext)) => {
                    OutputFormat::parse(&ext.to_string_lossy()).unwrap_or(format)
                }
                _ => format,
            };
            emit(&format.program(&program)?, output.as_deref())?;
        }

        Commands::Run {
            script,
            graph,
            query,
            goal,
            limit,
            format,
        } => {
            if limit.is_some() {
                config.engine.max_solutions = limit;
            }
            let program = compile_script(&config, &script)?;
            let graph = load_graph(&graph)?;
            let mut engine = Engine::with_config(Library::standard(graph), config.engine.clone());
            engine.load_theory(program.clauses.iter().cloned());

            let answers = run_goals(&engine, &program, &query, goal.as_deref())?;
            match format {
                OutputFormat::Text => ReportFormatter::new(script.display().to_string())
                    .print_answers(&answers),
                other => emit(&other.answers(&answers)?, None)?,
            }
        }

        Commands::Predicates => {
            let library = Library::standard(Default::default());
            ReportFormatter::new("").print_predicates(&library.predicates());
        }
    }

    Ok(())
}

/// Read and compile a script, printing its diagnostics
fn compile_script(config: &Config, path: &Path) -> Result<Program> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let formatter = ReportFormatter::new(path.display().to_string());
    let compiler = Compiler::with_config(config.compiler.clone());
    match compiler.compile(&source) {
        Ok(program) => {
            formatter.print_diagnostics(program.warnings());
            Ok(program)
        }
        Err(err) => {
            formatter.print_diagnostics(err.diagnostics());
            bail!("{}: {}", path.display(), err)
        }
    }
}

fn run_goals(
    engine: &Engine,
    program: &Program,
    selected: &[String],
    goal: Option<&str>,
) -> Result<Vec<QueryAnswers>> {
    let mut goals = Vec::new();
    if let Some(text) = goal {
        let formula = parse_goal(text).map_err(|errors| {
            ReportFormatter::new("goal").print_diagnostics(&errors);
            anyhow::anyhow!("invalid goal `{}`", text)
        })?;
        goals.push((text.to_string(), lower_goal(&formula)));
    } else {
        let names: Vec<String> = if selected.is_empty() {
            program.queries().into_iter().map(|(name, _)| name).collect()
        } else {
            selected.to_vec()
        };
        for name in names {
            let Some(goal) = program.query_goal(&name) else {
                bail!("script has no query named `{}`", name);
            };
            goals.push((name, goal));
        }
    }

    let mut answers = Vec::new();
    for (query, goal) in goals {
        let mut solutions = engine.solve(goal);
        let found: Vec<_> = solutions.by_ref().collect();
        answers.push(QueryAnswers {
            query,
            solutions: found,
            truncated: solutions.depth_exceeded(),
        });
    }
    Ok(answers)
}
