use std::rc::Rc;

use futures::future::FutureExt;

use encode;
use error::{Line, RenderError};
use handle::TemplateHandle;
use path::Path;
use scope::{Scope, Value};
use span::{extract, run_sequence};
use template::Template;
use writer::FutureWriter;

/// A literal text run emitted between tags.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteCode {
    pub text: String,
    pub line: Line,
}

/// `{{name}}` / `{{{name}}}`.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueCode {
    pub path: Path,
    pub encoded: bool,
    pub line: Line,
}

/// Shared shape for every section-like opcode: Iterable, IfIterable,
/// InvertedIterable, Function, Name. The child array is shared and
/// stable after construction, modeled as `Rc<Vec<Code>>`.
#[derive(Clone)]
pub struct SectionCode {
    pub path: Path,
    pub children: Rc<Vec<Code>>,
    pub line: Line,
}

/// `{{>name}}`. The referent is resolved and retained at construction
/// time; resolution failure is a construction-time error.
#[derive(Clone)]
pub struct PartialCode {
    pub name: String,
    pub template: Rc<Template>,
    pub line: Line,
}

/// `{{<name}}...{{/name}}`. `codes` is a per-Extend copy of the parent's
/// compiled array with matching `Name` nodes replaced by local
/// overrides; `overrides` keeps the original `{{$name}}` children as
/// written in this template, used only by `identity`.
#[derive(Clone)]
pub struct ExtendCode {
    pub name: String,
    pub codes: Rc<Vec<Code>>,
    pub overrides: Rc<Vec<Code>>,
    pub line: Line,
}

/// The closed set of compiled template opcodes.
#[derive(Clone)]
pub enum Code {
    Write(WriteCode),
    Value(ValueCode),
    Iterable(SectionCode),
    IfIterable(SectionCode),
    InvertedIterable(SectionCode),
    Function(SectionCode),
    Partial(PartialCode),
    Extend(ExtendCode),
    Name(SectionCode),
    Eof(Line),
}

impl Code {
    pub fn line(&self) -> &Line {
        match *self {
            Code::Write(ref c) => &c.line,
            Code::Value(ref c) => &c.line,
            Code::Iterable(ref c) => &c.line,
            Code::IfIterable(ref c) => &c.line,
            Code::InvertedIterable(ref c) => &c.line,
            Code::Function(ref c) => &c.line,
            Code::Partial(ref c) => &c.line,
            Code::Extend(ref c) => &c.line,
            Code::Name(ref c) => &c.line,
            Code::Eof(ref line) => line,
        }
    }

    /// Evaluates this node against `scope`, appending output to `writer`.
    pub fn execute(
        &self,
        writer: &mut FutureWriter,
        scope: &Rc<Scope>,
        handle: &Rc<dyn TemplateHandle>,
    ) -> Result<(), RenderError> {
        match *self {
            Code::Write(ref code) => {
                writer.write(code.text.clone());
                Ok(())
            }
            Code::Value(ref code) => {
                let value = handle.lookup(scope, &code.path);
                let text = value.to_string();
                if code.encoded {
                    writer.write(encode::escape(&text));
                } else {
                    writer.write(text);
                }
                Ok(())
            }
            Code::Iterable(ref code) => {
                for sub in handle.iterable(scope, &code.path) {
                    enqueue_section(writer, sub, code.children.clone(), handle);
                }
                Ok(())
            }
            Code::IfIterable(ref code) => {
                for sub in handle.if_iterable(scope, &code.path) {
                    enqueue_section(writer, sub, code.children.clone(), handle);
                }
                Ok(())
            }
            Code::InvertedIterable(ref code) => {
                for sub in handle.inverted(scope, &code.path) {
                    enqueue_section(writer, sub, code.children.clone(), handle);
                }
                Ok(())
            }
            Code::Name(ref code) => {
                enqueue_section(writer, scope.as_ref().clone(), code.children.clone(), handle);
                Ok(())
            }
            Code::Function(ref code) => match handle.lookup(scope, &code.path) {
                Value::Callable(function) => {
                    let mut body_writer = FutureWriter::new();
                    for child in code.children.iter() {
                        child.execute(&mut body_writer, scope, handle)?;
                    }
                    let body = body_writer.flush()?;
                    writer.write(function(&body));
                    Ok(())
                }
                Value::Null => {
                    for child in code.children.iter() {
                        child.execute(writer, scope, handle)?;
                    }
                    Ok(())
                }
                _ => Err(RenderError::NotAFunction(
                    code.path.to_string(),
                    code.line.clone(),
                )),
            },
            Code::Partial(ref code) => {
                let referent: Rc<dyn TemplateHandle> = code.template.clone();
                let codes = code.template.compiled_rc();
                let scope = scope.clone();
                writer.enqueue(
                    async move {
                        let mut child = FutureWriter::new();
                        for code in codes.iter() {
                            code.execute(&mut child, &scope, &referent)?;
                        }
                        Ok(child)
                    }
                    .boxed_local(),
                );
                Ok(())
            }
            Code::Extend(ref code) => {
                for child in code.codes.iter() {
                    child.execute(writer, scope, handle)?;
                }
                Ok(())
            }
            Code::Eof(_) => Ok(()),
        }
    }

    /// Consumes `text` from `pos`, returning the updated scope and
    /// position on a match, or `None` on a non-match. `None` is an
    /// ordinary signal here, never an error.
    pub fn unexecute(
        &self,
        scope: Scope,
        text: &str,
        pos: usize,
        next: &[Code],
        handle: &Rc<dyn TemplateHandle>,
    ) -> Option<(Scope, usize)> {
        match *self {
            Code::Write(ref code) => {
                let len = code.text.len();
                if pos + len <= text.len() && &text[pos..pos + len] == code.text {
                    Some((scope, pos + len))
                } else {
                    None
                }
            }
            Code::Value(ref code) => {
                let (extracted, new_pos) = extract(text, pos, &scope, next, handle)?;
                let value = if code.encoded {
                    encode::unescape(&extracted)
                } else {
                    extracted
                };
                let mut scope = scope;
                scope.store(&code.path, Value::Str(value));
                Some((scope, new_pos))
            }
            Code::Iterable(ref code) => {
                let mut results = Vec::new();
                let mut cur_pos = pos;
                loop {
                    match run_sequence(&code.children, Scope::new(), text, cur_pos, next, handle) {
                        Some((sub, new_pos)) if new_pos > cur_pos => {
                            results.push(sub);
                            cur_pos = new_pos;
                        }
                        _ => break,
                    }
                }
                let mut scope = scope;
                scope.store(&code.path, Value::List(results));
                Some((scope, cur_pos))
            }
            Code::IfIterable(ref code) => {
                let (sub, new_pos) = run_sequence(&code.children, Scope::new(), text, pos, next, handle)?;
                let mut scope = scope;
                scope.store(&code.path, Value::Map(sub));
                Some((scope, new_pos))
            }
            Code::InvertedIterable(ref code) => {
                let (sub, new_pos) = run_sequence(&code.children, Scope::new(), text, pos, next, handle)?;
                let mut scope = scope;
                scope.merge(sub);
                scope.store(&code.path, Value::Bool(false));
                Some((scope, new_pos))
            }
            Code::Function(ref code) => {
                let (extracted, new_pos) = extract(text, pos, &scope, next, handle)?;
                let scope_rc = Rc::new(scope.clone());
                let mut body_writer = FutureWriter::new();
                for child in code.children.iter() {
                    if child.execute(&mut body_writer, &scope_rc, handle).is_err() {
                        return None;
                    }
                }
                let body = body_writer.flush().ok()?;
                let mut scope = scope;
                scope.store(
                    &code.path,
                    Value::Callable(single_mapping_callable(body, extracted)),
                );
                Some((scope, new_pos))
            }
            Code::Partial(ref code) => {
                let (span_text, new_pos) = extract(text, pos, &scope, next, handle)?;
                let referent: Rc<dyn TemplateHandle> = code.template.clone();
                let codes = code.template.compiled_rc();
                let (sub, _) = run_sequence(&codes, Scope::new(), &span_text, 0, &[], &referent)?;
                let mut scope = scope;
                scope.store(&Path::split(&code.name), Value::Map(sub));
                Some((scope, new_pos))
            }
            Code::Extend(ref code) => run_sequence(&code.codes, scope, text, pos, next, handle),
            Code::Name(ref code) => run_sequence(&code.children, scope, text, pos, next, handle),
            // Only matches once pos has actually reached the end of text. A
            // version that matched unconditionally at any pos would make
            // extract() stop probing on its very first attempt whenever Eof
            // is the next code, extracting an empty span for any trailing
            // Value (e.g. the bare template "{{a.b}}").
            Code::Eof(_) => {
                if pos == text.len() {
                    Some((scope, pos))
                } else {
                    None
                }
            }
        }
    }

    /// Emits the node's original template source form, ignoring `scope`
    /// entirely.
    pub fn identity(&self, writer: &mut FutureWriter) {
        match *self {
            Code::Write(ref code) => writer.write(code.text.clone()),
            Code::Value(ref code) => {
                if code.encoded {
                    writer.write(format!("{{{{{}}}}}", code.path));
                } else {
                    writer.write(format!("{{{{{{{}}}}}}}", code.path));
                }
            }
            Code::Iterable(ref code) => identity_section(writer, "#", &code.path, &code.children),
            Code::IfIterable(ref code) => identity_section(writer, "?", &code.path, &code.children),
            Code::InvertedIterable(ref code) => {
                identity_section(writer, "^", &code.path, &code.children)
            }
            Code::Function(ref code) => identity_section(writer, "_", &code.path, &code.children),
            Code::Name(ref code) => identity_section(writer, "$", &code.path, &code.children),
            Code::Partial(ref code) => writer.write(format!("{{{{>{}}}}}", code.name)),
            Code::Extend(ref code) => {
                writer.write(format!("{{{{<{}}}}}", code.name));
                for child in code.overrides.iter() {
                    child.identity(writer);
                }
                writer.write(format!("{{{{/{}}}}}", code.name));
            }
            Code::Eof(_) => (),
        }
    }
}

fn identity_section(writer: &mut FutureWriter, sigil: &str, path: &Path, children: &[Code]) {
    writer.write(format!("{{{{{}{}}}}}", sigil, path));
    for child in children {
        child.identity(writer);
    }
    writer.write(format!("{{{{/{}}}}}", path));
}

/// Pushes a fresh child writer for a section and enqueues the deferred
/// render of its body against `sub`.
fn enqueue_section(
    writer: &mut FutureWriter,
    sub: Scope,
    children: Rc<Vec<Code>>,
    handle: &Rc<dyn TemplateHandle>,
) {
    let sub = Rc::new(sub);
    let handle = handle.clone();
    writer.enqueue(
        async move {
            let mut child = FutureWriter::new();
            for code in children.iter() {
                code.execute(&mut child, &sub, &handle)?;
            }
            Ok(child)
        }
        .boxed_local(),
    );
}

/// Best-effort heuristic for Function's inverse: synthesizes a callable
/// that reproduces `extracted` only when invoked with exactly the `body`
/// text observed during the reverse pass.
fn single_mapping_callable(body: String, extracted: String) -> Rc<dyn Fn(&str) -> String> {
    Rc::new(move |input: &str| {
        if input == body {
            extracted.clone()
        } else {
            String::new()
        }
    })
}
