use std::rc::Rc;

use code::Code;
use path::Path;
use scope::{Scope, Value};

/// The template handle interface the code nodes call back into for all
/// semantic queries. `Template` (src/template.rs) implements this; the
/// concrete lookup/iterable/inverted rules live here as free functions so
/// both the trait default methods and construction-time code (the
/// factory) can share them without requiring a `Template` to exist yet.
pub trait TemplateHandle {
    fn compiled(&self) -> &[Code];

    fn lookup(&self, scope: &Scope, path: &Path) -> Value {
        scope.lookup(path)
    }

    /// `{{#name}}...{{/name}}` — loop sub-scopes.
    fn iterable(&self, scope: &Rc<Scope>, path: &Path) -> Vec<Scope> {
        iterable(scope, path)
    }

    /// `{{?name}}...{{/name}}` — truthy-once sub-scope.
    fn if_iterable(&self, scope: &Rc<Scope>, path: &Path) -> Vec<Scope> {
        if_iterable(scope, path)
    }

    /// `{{^name}}...{{/name}}` — falsy/empty-once sub-scope.
    fn inverted(&self, scope: &Rc<Scope>, path: &Path) -> Vec<Scope> {
        inverted(scope, path)
    }
}

/// Loop sub-scopes for a `{{#name}}` section. Mirrors the teacher's Ruby
/// runtime `section()` switch: arrays iterate each element, a single
/// object/map runs the body once against it, booleans/nil/missing skip or
/// run once against the enclosing scope unchanged.
pub fn iterable(scope: &Rc<Scope>, path: &Path) -> Vec<Scope> {
    match scope.lookup(path) {
        Value::List(items) => items
            .into_iter()
            .map(|item| item.rebase(scope.clone()))
            .collect(),
        Value::Map(item) => vec![item.rebase(scope.clone())],
        Value::Null => Vec::new(),
        Value::Bool(false) => Vec::new(),
        value => {
            if value.truthy() {
                vec![Scope::chained(scope.clone())]
            } else {
                Vec::new()
            }
        }
    }
}

/// Exactly one pass through the body if the section's value is truthy;
/// unlike `iterable`, a list is never looped element-by-element — only
/// whether it's truthy matters.
pub fn if_iterable(scope: &Rc<Scope>, path: &Path) -> Vec<Scope> {
    let value = scope.lookup(path);
    if !value.truthy() {
        return Vec::new();
    }
    match value {
        Value::Map(item) => vec![item.rebase(scope.clone())],
        Value::List(mut items) if !items.is_empty() => {
            vec![items.remove(0).rebase(scope.clone())]
        }
        _ => vec![Scope::chained(scope.clone())],
    }
}

/// Exactly one pass through the body if the section's value is falsy,
/// null, or an empty list.
pub fn inverted(scope: &Rc<Scope>, path: &Path) -> Vec<Scope> {
    let value = scope.lookup(path);
    if value.truthy() {
        Vec::new()
    } else {
        vec![Scope::chained(scope.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterable_loops_list_elements() {
        let mut a = Scope::new();
        a.set("v", Value::from("a"));
        let mut b = Scope::new();
        b.set("v", Value::from("b"));

        let mut root = Scope::new();
        root.set("xs", Value::List(vec![a, b]));
        let root = Rc::new(root);

        let scopes = iterable(&root, &Path::split("xs"));
        assert_eq!(2, scopes.len());
        assert_eq!(Value::from("a").to_string(), scopes[0].lookup(&Path::split("v")).to_string());
    }

    #[test]
    fn iterable_skips_false_and_null() {
        let mut root = Scope::new();
        root.set("x", Value::Bool(false));
        let root = Rc::new(root);
        assert!(iterable(&root, &Path::split("x")).is_empty());
        assert!(iterable(&root, &Path::split("missing")).is_empty());
    }

    #[test]
    fn if_iterable_runs_once_for_nonempty_list() {
        let mut root = Scope::new();
        root.set("xs", Value::List(vec![Scope::new(), Scope::new()]));
        let root = Rc::new(root);
        assert_eq!(1, if_iterable(&root, &Path::split("xs")).len());
    }

    #[test]
    fn inverted_runs_once_for_empty_list() {
        let mut root = Scope::new();
        root.set("xs", Value::List(Vec::new()));
        let root = Rc::new(root);
        assert_eq!(1, inverted(&root, &Path::split("xs")).len());
    }

    #[test]
    fn inverted_skips_truthy() {
        let mut root = Scope::new();
        root.set("xs", Value::Bool(true));
        let root = Rc::new(root);
        assert!(inverted(&root, &Path::split("xs")).is_empty());
    }
}
