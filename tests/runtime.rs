//! End-to-end coverage driving a small directory of `.mustache` files
//! through `Registry` and `Template::render`, in-process. Exercises the
//! same "load a template directory, resolve a name, render against data"
//! path the CLI in `src/main.rs` drives, but without shelling out.

use std::fs;
use std::path::Path;

use stache::error::Line;
use stache::scope::{Scope, Value};
use stache::Registry;

fn load(dir: &str) -> Registry {
    let mut registry = Registry::new();
    collect(Path::new(dir), Path::new(dir), &mut registry);
    registry
}

fn collect(base: &Path, dir: &Path, registry: &mut Registry) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(base, &path, registry);
            continue;
        }
        let relative = path.strip_prefix(base).unwrap().with_extension("");
        let name = relative.to_string_lossy().to_string();
        let source = fs::read_to_string(&path).unwrap();
        registry.insert(&name, &path.to_string_lossy(), &source).unwrap();
    }
}

#[test]
fn renders_partial_and_section_over_a_list() {
    let registry = load("tests/fixtures/templates");
    let line = Line::new("test", 0);
    let template = registry.resolve("index", &line).unwrap();

    let mut alpha = Scope::new();
    alpha.set("name", Value::from("Alpha"));
    let mut beta = Scope::new();
    beta.set("name", Value::from("Beta"));

    let mut scope = Scope::new();
    scope.set("title", Value::from("Items"));
    scope.set("items", Value::List(vec![alpha, beta]));

    let output = template.render(scope).unwrap();
    assert!(output.contains("<h1>Items</h1>"));
    assert!(output.contains("- Alpha"));
    assert!(output.contains("- Beta"));
    assert!(!output.contains("No items"));
}

#[test]
fn inverted_section_runs_when_list_is_empty() {
    let registry = load("tests/fixtures/templates");
    let line = Line::new("test", 0);
    let template = registry.resolve("index", &line).unwrap();

    let mut scope = Scope::new();
    scope.set("title", Value::from("Items"));
    scope.set("items", Value::List(Vec::new()));

    let output = template.render(scope).unwrap();
    assert!(output.contains("No items"));
    assert!(!output.contains("- "));
}

#[test]
fn extend_rewrites_the_parents_named_region() {
    let registry = load("tests/fixtures/templates");
    let line = Line::new("test", 0);
    let template = registry.resolve("page", &line).unwrap();

    let mut scope = Scope::new();
    scope.set("name", Value::from("World"));

    let output = template.render(scope).unwrap();
    assert_eq!("<html><body>Hello World</body></html>", output);
}

#[test]
fn extend_falls_back_to_the_parents_default_region() {
    let registry = load("tests/fixtures/templates");
    let line = Line::new("test", 0);
    let template = registry.resolve("layout", &line).unwrap();

    let output = template.render(Scope::new()).unwrap();
    assert_eq!("<html><body>default</body></html>", output);
}
