// SPDX-License-Identifier: PMPL-1.0-or-later

//! End-to-end tests: script text to answers over a graph document

use std::fs;
use std::path::{Path, PathBuf};
use vislog::compiler::{CompileError, Compiler};
use vislog::diagnostics::Phase;
use vislog::graph::load_graph;
use vislog::library::Library;
use vislog::logic::Engine;

fn demo(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn food_chain_engine() -> (Engine, vislog::Program) {
    let source = fs::read_to_string(demo("food_chain.vis")).expect("demo script should exist");
    let program = Compiler::new()
        .compile(&source)
        .expect("demo script should compile");
    let graph = load_graph(&demo("food_chain.json")).expect("demo graph should load");
    let mut engine = Engine::new(Library::standard(graph));
    engine.load_theory(program.clauses.iter().cloned());
    (engine, program)
}

fn answers(engine: &Engine, program: &vislog::Program, query: &str) -> Vec<String> {
    let goal = program
        .query_goal(query)
        .unwrap_or_else(|| panic!("query {} should exist", query));
    engine.solve(goal).map(|s| s.to_string()).collect()
}

#[test]
fn test_demo_compiles_cleanly() {
    let (_, program) = food_chain_engine();
    assert!(
        program.warnings().is_empty(),
        "unexpected warnings: {:?}",
        program.warnings()
    );
    let queries: Vec<String> = program.queries().into_iter().map(|(n, _)| n).collect();
    assert_eq!(queries, vec!["predators", "colors", "hubs", "dashed"]);
}

#[test]
fn test_demo_queries() {
    let (engine, program) = food_chain_engine();

    assert_eq!(
        answers(&engine, &program, "predators"),
        vec!["D = 1, X = wolf1", "D = 1, X = goat1", "D = 1, X = lion"]
    );
    assert_eq!(
        answers(&engine, &program, "colors"),
        vec![
            "C = red, X = wolf1",
            "C = red, X = lion",
            "C = yellow, X = goat1",
            "C = green, X = cabbage",
        ]
    );
    assert_eq!(answers(&engine, &program, "hubs"), vec!["D = 3, X = goat1"]);
    assert_eq!(answers(&engine, &program, "dashed"), vec!["E = e2"]);
}

#[test]
fn test_graph_attributes_flow_into_rules() {
    let (engine, _) = food_chain_engine();
    let goal = vislog::Term::compound(
        "caption",
        vec![vislog::Term::var("G"), vislog::Term::var("T")],
    );
    let found: Vec<String> = engine.solve(goal).map(|s| s.to_string()).collect();
    assert_eq!(found, vec!["G = food_chain, T = 'Food chain'"]);
}

#[test]
fn test_compile_is_deterministic() {
    let source = fs::read_to_string(demo("food_chain.vis")).expect("demo script should exist");
    let compiler = Compiler::new();
    let first = compiler.compile(&source).expect("first compile should succeed");
    let second = compiler.compile(&source).expect("second compile should succeed");

    assert_eq!(first.clauses, second.clauses);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.fingerprint(), second.fingerprint());

    let heads = |p: &vislog::Program| -> Vec<String> {
        p.clauses
            .iter()
            .filter_map(|c| c.signature())
            .map(|s| s.to_string())
            .collect()
    };
    assert_eq!(heads(&first), heads(&second));
}

#[test]
fn test_syntax_failure_reports_every_statement() {
    let err = Compiler::new()
        .compile("node labels wolf.\nwolf(X) -> color(X, red).\nquery : node(X).\n")
        .expect_err("malformed script should fail");
    let CompileError::Syntax(diagnostics) = &err else {
        panic!("expected a syntax failure, got {:?}", err);
    };
    assert_eq!(diagnostics.error_count(), 2);
    assert_eq!(err.warnings().count(), 0);
    assert!(diagnostics.iter().all(|d| d.phase == Phase::Syntax));
}

#[test]
fn test_check_failure_reports_full_checker_output() {
    let err = Compiler::new()
        .compile(
            "node labels: wolf, unused.\n\
             wolf(X) -> color(X, Y).\n\
             node(X), shade(X) -> dark(X).\n\
             node(X), degree(X, many) -> busy(X).",
        )
        .expect_err("script with checker errors should fail");
    assert!(matches!(err, CompileError::Check(_)));

    let errors: Vec<&str> = err.errors().map(|d| d.code).collect();
    assert_eq!(errors, vec!["E003", "E001", "E006"]);
    let warnings: Vec<&str> = err.warnings().map(|d| d.code).collect();
    assert_eq!(warnings, vec!["W001", "W002"]);
    assert!(err.errors().all(|d| d.phase == Phase::Check && d.span.is_some()));
}

#[test]
fn test_yaml_graph_document() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("ring.yaml");
    fs::write(
        &path,
        "id: ring\n\
         directed: false\n\
         nodes:\n  - id: a\n  - id: b\n  - id: c\n\
         edges:\n  - {source: a, target: b}\n  - {source: b, target: c}\n  - {source: c, target: a}\n",
    )
    .expect("graph file should be written");

    let program = Compiler::new()
        .compile("query ring: graph(G), is_connected(G), node_count(G, N).")
        .expect("query should compile");
    let mut engine = Engine::new(Library::standard(
        load_graph(&path).expect("yaml graph should load"),
    ));
    engine.load_theory(program.clauses.iter().cloned());
    assert_eq!(answers(&engine, &program, "ring"), vec!["G = ring, N = 3"]);
}

#[test]
fn test_wildcards_stay_apart_from_underscore_variables() {
    let program = Compiler::new()
        .compile("edge(_G1, _, E), node(_G1) -> plain(E).")
        .expect("rule should compile");
    let mut graph = vislog::Graph::new("g", true);
    graph.add_node("a").expect("node should be added");
    graph.add_node("b").expect("node should be added");
    graph.add_edge("ab", "a", "b").expect("edge should be added");
    let mut engine = Engine::new(Library::standard(graph));
    engine.load_theory(program.clauses.iter().cloned());

    let goal = vislog::Term::compound("plain", vec![vislog::Term::var("E")]);
    let found: Vec<String> = engine.solve(goal).map(|s| s.to_string()).collect();
    assert_eq!(found, vec!["E = ab"]);
}
