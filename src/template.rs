use std::rc::Rc;

use code::Code;
use compile;
use error::{Line, ParseError, RenderError};
use handle::TemplateHandle;
use parse::{self, Node};
use registry::Registry;
use scope::Scope;
use span::run_sequence;
use writer::FutureWriter;

/// A compiled template: a name (for diagnostics and as the key other
/// templates resolve it under) plus its code array. `Template` is the
/// concrete `TemplateHandle` every `Code::execute`/`unexecute` call is
/// ultimately driven through.
#[derive(Clone)]
pub struct Template {
    pub name: String,
    codes: Rc<Vec<Code>>,
}

impl Template {
    /// Compiles `nodes` (already parsed from `file`) into a `Template`,
    /// resolving any `Partial`/`Extend` references against `registry` and
    /// appending the closing `Eof` sentinel every top-level code array
    /// ends with.
    pub fn compile(name: &str, file: &str, nodes: &[Node], registry: &Registry) -> Result<Template, ParseError> {
        let mut codes = compile::compile(file, nodes, registry)?;
        codes.push(Code::Eof(Line::new(file, 0)));
        Ok(Template {
            name: name.to_string(),
            codes: Rc::new(codes),
        })
    }

    /// Parses and compiles a single, partial-free template directly,
    /// without a registry. Convenient for tests and for callers who only
    /// ever render one template with no `{{>}}`/`{{<}}` references.
    pub fn parse(file: &str, source: &str) -> Result<Template, ParseError> {
        let registry = Registry::new();
        let nodes = parse::parse(file, source)?;
        Template::compile(file, file, &nodes, &registry)
    }

    pub fn compiled_rc(&self) -> Rc<Vec<Code>> {
        self.codes.clone()
    }

    /// Renders this template against `scope`, returning the concatenated
    /// output.
    pub fn render(&self, scope: Scope) -> Result<String, RenderError> {
        let handle: Rc<dyn TemplateHandle> = Rc::new(self.clone());
        let scope = Rc::new(scope);
        let mut writer = FutureWriter::new();
        for code in self.codes.iter() {
            code.execute(&mut writer, &scope, &handle)?;
        }
        writer.flush()
    }

    /// Reproduces the template's source form, ignoring all data.
    pub fn render_identity(&self) -> String {
        let mut writer = FutureWriter::new();
        for code in self.codes.iter() {
            code.identity(&mut writer);
        }
        writer.flush().unwrap_or_default()
    }

    /// Recovers a `Scope` from rendered `text`, or `None` if `text`
    /// doesn't match this template's shape all the way to its end.
    pub fn unexecute(&self, text: &str) -> Option<Scope> {
        let handle: Rc<dyn TemplateHandle> = Rc::new(self.clone());
        let (scope, pos) = run_sequence(&self.codes, Scope::new(), text, 0, &[], &handle)?;
        if pos == text.len() {
            Some(scope)
        } else {
            None
        }
    }
}

impl TemplateHandle for Template {
    fn compiled(&self) -> &[Code] {
        &self.codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope::Value;

    #[test]
    fn renders_plain_value() {
        let template = Template::parse("t", "Hello {{name}}!").unwrap();
        let mut scope = Scope::new();
        scope.set("name", Value::from("world"));
        assert_eq!("Hello world!", template.render(scope).unwrap());
    }

    #[test]
    fn escapes_html_by_default() {
        let template = Template::parse("t", "{{html}}").unwrap();
        let mut scope = Scope::new();
        scope.set("html", Value::from("<b>"));
        assert_eq!("&lt;b&gt;", template.render(scope).unwrap());
    }

    #[test]
    fn triple_brace_skips_escaping() {
        let template = Template::parse("t", "{{{html}}}").unwrap();
        let mut scope = Scope::new();
        scope.set("html", Value::from("<b>"));
        assert_eq!("<b>", template.render(scope).unwrap());
    }

    #[test]
    fn identity_round_trips_a_simple_template() {
        let source = "Hi {{name}}, {{#xs}}x{{/xs}}{{^xs}}none{{/xs}}";
        let template = Template::parse("t", source).unwrap();
        assert_eq!(source, template.render_identity());
    }

    #[test]
    fn unexecute_recovers_a_bare_value() {
        let template = Template::parse("t", "{{a.b}}").unwrap();
        let scope = template.unexecute("z").unwrap();
        match scope.lookup(&::path::Path::split("a.b")) {
            Value::Str(ref s) => assert_eq!("z", s),
            other => panic!("expected Str, got {:?}", other),
        }
    }

    #[test]
    fn unexecute_recovers_an_iterable_value() {
        let template = Template::parse("t", "{{#xs}}X{{/xs}}").unwrap();
        let scope = template.unexecute("XXX").unwrap();
        match scope.lookup(&::path::Path::split("xs")) {
            Value::List(ref items) => assert_eq!(3, items.len()),
            other => panic!("expected List, got {:?}", other),
        }
    }
}
