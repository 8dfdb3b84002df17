use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use error::{Line, ParseError};
use parse::{self, Node};
use template::Template;

/// Name -> compiled `Template` map used to resolve `{{>name}}` and
/// `{{<name}}` references at construction time. Source text is parsed
/// eagerly on `insert`; compilation of a given entry is deferred to its
/// first `resolve` and memoized, so a partial referenced from several
/// templates is only compiled once.
pub struct Registry {
    sources: HashMap<String, (String, Vec<Node>)>,
    compiled: RefCell<HashMap<String, Rc<Template>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            sources: HashMap::new(),
            compiled: RefCell::new(HashMap::new()),
        }
    }

    /// Parses and registers a template's source under `name`. `file` is
    /// the diagnostic label (a real path, for the CLI) used to stamp every
    /// line this template's nodes produce.
    pub fn insert(&mut self, name: &str, file: &str, source: &str) -> Result<(), ParseError> {
        let nodes = parse::parse(file, source)?;
        self.sources.insert(name.to_string(), (file.to_string(), nodes));
        Ok(())
    }

    /// Resolves `name` to its compiled template, compiling it on first use.
    /// `at` is the referencing `Partial`/`Extend` tag's line, used only to
    /// report `UnknownPartial` should the name be absent.
    pub fn resolve(&self, name: &str, at: &Line) -> Result<Rc<Template>, ParseError> {
        if let Some(template) = self.compiled.borrow().get(name) {
            return Ok(template.clone());
        }
        let (file, nodes) = self
            .sources
            .get(name)
            .ok_or_else(|| ParseError::UnknownPartial(name.to_string(), at.clone()))?;
        let template = Rc::new(Template::compile(name, file, nodes, self)?);
        self.compiled.borrow_mut().insert(name.to_string(), template.clone());
        Ok(template)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}
