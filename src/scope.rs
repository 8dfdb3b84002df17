use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use path::Path;

/// A value a [`Scope`] may hold: leaf data, a nested scope, an ordered
/// sequence of scopes, or a callable used by function sections.
#[derive(Clone)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Map(Scope),
    List(Vec<Scope>),
    Callable(Rc<dyn Fn(&str) -> String>),
    Null,
}

impl Value {
    /// Truthiness used by Iterable/IfIterable/InvertedIterable to decide
    /// whether a section's body runs at all. Mirrors the teacher's Ruby
    /// runtime switch over `rb_type`: arrays are truthy when non-empty,
    /// nil/false are falsy, everything else is truthy.
    pub fn truthy(&self) -> bool {
        match *self {
            Value::Null => false,
            Value::Bool(b) => b,
            Value::List(ref items) => !items.is_empty(),
            _ => true,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Str(ref s) => write!(f, "Str({:?})", s),
            Value::Num(n) => write!(f, "Num({})", n),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Map(ref s) => write!(f, "Map({:?})", s),
            Value::List(ref l) => write!(f, "List({:?})", l),
            Value::Callable(_) => write!(f, "Callable(..)"),
            Value::Null => write!(f, "Null"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Str(ref s) => write!(f, "{}", s),
            Value::Num(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Map(_) | Value::List(_) | Value::Callable(_) => Ok(()),
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(String::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A recursively nested key/value mapping that also acts as a stack of
/// parent scopes. Child scopes shadow parents during lookup; a scope is
/// mutated only while being built up (during `unexecute`, or by a caller
/// assembling data before rendering) and never during forward `execute`.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    values: HashMap<String, Value>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    /// Builds a child scope chained to `parent` for shadowed lookup.
    pub fn chained(parent: Rc<Scope>) -> Self {
        Scope {
            values: HashMap::new(),
            parent: Some(parent),
        }
    }

    pub fn set<K: Into<String>>(&mut self, key: K, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get_local(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Walks this scope, then its parent chain, for a single key (the
    /// first segment of a dotted name).
    pub fn resolve(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(key) {
            return Some(value);
        }
        match self.parent {
            Some(ref parent) => parent.resolve(key),
            None => None,
        }
    }

    /// Full dotted-name lookup: `a` resolves against the scope chain, then
    /// `b` against the resolved value treated as a scope, and so on.
    /// Missing intermediate levels yield `Null`.
    pub fn lookup(&self, path: &Path) -> Value {
        if path.is_implicit() {
            return Value::Map(self.clone());
        }
        let mut keys = path.keys.iter();
        let head = match keys.next() {
            Some(key) => key,
            None => return Value::Null,
        };
        let mut current = match self.resolve(head) {
            Some(value) => value.clone(),
            None => return Value::Null,
        };
        for key in keys {
            current = match current {
                Value::Map(ref scope) => scope.get_local(key).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            };
        }
        current
    }

    /// Moves `other`'s local bindings into this scope, overwriting any
    /// existing keys. Used by InvertedIterable's unexecute to merge a
    /// recovered sub-scope directly into the enclosing one.
    pub fn merge(&mut self, other: Scope) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }

    /// Re-parents this scope onto `parent`, keeping its own local values.
    /// Used to chain a section's sub-scope onto the enclosing scope so
    /// lookups inside the section body fall through to it.
    pub fn rebase(self, parent: Rc<Scope>) -> Scope {
        Scope {
            values: self.values,
            parent: Some(parent),
        }
    }

    /// Dotted-name store: `a.b.c = v` walks/creates nested scopes at `a`
    /// and `a.b`, then sets `c = v` at the deepest level.
    pub fn store(&mut self, path: &Path, value: Value) {
        let (last, heads) = match path.keys.split_last() {
            Some(split) => split,
            None => return,
        };
        let mut target = self;
        for key in heads {
            let entry = target
                .values
                .entry(key.clone())
                .or_insert_with(|| Value::Map(Scope::new()));
            if !matches!(*entry, Value::Map(_)) {
                *entry = Value::Map(Scope::new());
            }
            target = match *entry {
                Value::Map(ref mut scope) => scope,
                _ => unreachable!(),
            };
        }
        target.set(last.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_local() {
        let mut scope = Scope::new();
        scope.set("name", Value::from("world"));
        match scope.lookup(&Path::split("name")) {
            Value::Str(ref s) => assert_eq!("world", s),
            _ => panic!("expected Str"),
        }
    }

    #[test]
    fn lookup_dotted() {
        let mut inner = Scope::new();
        inner.set("b", Value::from("z"));
        let mut outer = Scope::new();
        outer.set("a", Value::Map(inner));
        match outer.lookup(&Path::split("a.b")) {
            Value::Str(ref s) => assert_eq!("z", s),
            _ => panic!("expected Str"),
        }
    }

    #[test]
    fn lookup_missing_intermediate_yields_null() {
        let scope = Scope::new();
        match scope.lookup(&Path::split("a.b.c")) {
            Value::Null => (),
            _ => panic!("expected Null"),
        }
    }

    #[test]
    fn lookup_chains_to_parent() {
        let mut parent = Scope::new();
        parent.set("title", Value::from("hello"));
        let child = Scope::chained(Rc::new(parent));
        match child.lookup(&Path::split("title")) {
            Value::Str(ref s) => assert_eq!("hello", s),
            _ => panic!("expected Str from parent"),
        }
    }

    #[test]
    fn store_creates_nested_scopes() {
        let mut scope = Scope::new();
        scope.store(&Path::split("a.b.c"), Value::from("z"));
        match scope.lookup(&Path::split("a.b.c")) {
            Value::Str(ref s) => assert_eq!("z", s),
            _ => panic!("expected Str"),
        }
    }

    #[test]
    fn truthy_empty_list_is_falsy() {
        assert!(!Value::List(Vec::new()).truthy());
        assert!(Value::List(vec![Scope::new()]).truthy());
    }
}
