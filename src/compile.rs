use std::collections::HashMap;
use std::rc::Rc;

use code::{Code, ExtendCode, PartialCode, SectionCode, ValueCode, WriteCode};
use error::{Line, ParseError};
use parse::Node;
use path::Path;
use registry::Registry;

/// Turns one template's parsed nodes into its compiled code array.
/// `Partial` and `Extend` references are resolved against `registry` right
/// here, eagerly — an unresolvable name is a construction-time
/// `UnknownPartial`, never deferred to render time.
pub fn compile(file: &str, nodes: &[Node], registry: &Registry) -> Result<Vec<Code>, ParseError> {
    let mut codes = Vec::with_capacity(nodes.len());
    for node in nodes {
        compile_node(file, node, registry, &mut codes)?;
    }
    Ok(codes)
}

fn compile_node(
    file: &str,
    node: &Node,
    registry: &Registry,
    out: &mut Vec<Code>,
) -> Result<(), ParseError> {
    match *node {
        // The compiled code set has no Comment opcode: comments are
        // annotations for template authors, never part of the compiled
        // model, so they vanish here rather than round-tripping through
        // identity().
        Node::Comment(..) => Ok(()),
        Node::Content(ref text, ref line) => {
            out.push(Code::Write(WriteCode {
                text: text.clone(),
                line: line.clone(),
            }));
            Ok(())
        }
        Node::Variable(ref path, ref line) => {
            out.push(Code::Value(ValueCode {
                path: path.clone(),
                encoded: true,
                line: line.clone(),
            }));
            Ok(())
        }
        Node::Unescaped(ref path, ref line) => {
            out.push(Code::Value(ValueCode {
                path: path.clone(),
                encoded: false,
                line: line.clone(),
            }));
            Ok(())
        }
        Node::Partial(ref name, ref line) => {
            let template = registry.resolve(name, line)?;
            out.push(Code::Partial(PartialCode {
                name: name.clone(),
                template,
                line: line.clone(),
            }));
            Ok(())
        }
        Node::Section(ref path, ref children, ref line) => {
            out.push(Code::Iterable(section(file, path, children, line, registry)?));
            Ok(())
        }
        Node::IfSection(ref path, ref children, ref line) => {
            out.push(Code::IfIterable(section(file, path, children, line, registry)?));
            Ok(())
        }
        Node::Inverted(ref path, ref children, ref line) => {
            out.push(Code::InvertedIterable(section(
                file, path, children, line, registry,
            )?));
            Ok(())
        }
        Node::Function(ref path, ref children, ref line) => {
            out.push(Code::Function(section(file, path, children, line, registry)?));
            Ok(())
        }
        Node::NamedBlock(ref path, ref children, ref line) => {
            out.push(Code::Name(section(file, path, children, line, registry)?));
            Ok(())
        }
        Node::Extend(ref name, ref children, ref line) => {
            out.push(compile_extend(file, name, children, line, registry)?);
            Ok(())
        }
    }
}

fn section(
    file: &str,
    path: &Path,
    children: &[Node],
    line: &Line,
    registry: &Registry,
) -> Result<SectionCode, ParseError> {
    Ok(SectionCode {
        path: path.clone(),
        children: Rc::new(compile(file, children, registry)?),
        line: line.clone(),
    })
}

fn compile_extend(
    file: &str,
    name: &str,
    children: &[Node],
    line: &Line,
    registry: &Registry,
) -> Result<Code, ParseError> {
    let parent = registry.resolve(name, line)?;

    for child in children {
        match *child {
            Node::NamedBlock(..) => (),
            Node::Content(ref text, _) if text.trim().is_empty() => (),
            ref other => return Err(ParseError::IllegalCodeInExtend(node_line(other).clone())),
        }
    }

    let mut overrides = HashMap::new();
    for child in children {
        if let Node::NamedBlock(ref path, ref body, _) = *child {
            overrides.insert(path.to_string(), Rc::new(compile(file, body, registry)?));
        }
    }

    let rewritten = rewrite_with_overrides(parent.compiled(), &overrides);

    if cfg!(debug_assertions) {
        let mut unused = Vec::new();
        for child in children {
            if let Node::NamedBlock(ref path, _, ref override_line) = *child {
                if !name_appears(parent.compiled(), &path.to_string()) {
                    unused.push((path.to_string(), override_line.clone()));
                }
            }
        }
        if !unused.is_empty() {
            return Err(ParseError::UnusedOverride(unused));
        }
    }

    let overrides_in_order = compile(file, children, registry)?;

    Ok(Code::Extend(ExtendCode {
        name: name.to_string(),
        codes: Rc::new(rewritten),
        overrides: Rc::new(overrides_in_order),
        line: line.clone(),
    }))
}

fn node_line(node: &Node) -> &Line {
    match *node {
        Node::Content(_, ref line)
        | Node::Comment(_, ref line)
        | Node::Variable(_, ref line)
        | Node::Unescaped(_, ref line)
        | Node::Partial(_, ref line)
        | Node::Section(_, _, ref line)
        | Node::IfSection(_, _, ref line)
        | Node::Inverted(_, _, ref line)
        | Node::Function(_, _, ref line)
        | Node::NamedBlock(_, _, ref line)
        | Node::Extend(_, _, ref line) => line,
    }
}

/// Recursively copies `parent`'s compiled array, replacing any `Name` node
/// whose path matches an override key with that override's children, at
/// any nesting depth. Codes with no overridable descendants are shared
/// via `Rc::clone` rather than deep-copied.
fn rewrite_with_overrides(codes: &[Code], overrides: &HashMap<String, Rc<Vec<Code>>>) -> Vec<Code> {
    codes.iter().map(|code| rewrite_code(code, overrides)).collect()
}

fn rewrite_code(code: &Code, overrides: &HashMap<String, Rc<Vec<Code>>>) -> Code {
    match *code {
        Code::Name(ref section) => {
            if let Some(replacement) = overrides.get(&section.path.to_string()) {
                Code::Name(SectionCode {
                    path: section.path.clone(),
                    children: replacement.clone(),
                    line: section.line.clone(),
                })
            } else {
                Code::Name(SectionCode {
                    path: section.path.clone(),
                    children: Rc::new(rewrite_with_overrides(&section.children, overrides)),
                    line: section.line.clone(),
                })
            }
        }
        Code::Iterable(ref section) => Code::Iterable(rewrite_section(section, overrides)),
        Code::IfIterable(ref section) => Code::IfIterable(rewrite_section(section, overrides)),
        Code::InvertedIterable(ref section) => Code::InvertedIterable(rewrite_section(section, overrides)),
        Code::Function(ref section) => Code::Function(rewrite_section(section, overrides)),
        Code::Extend(ref extend) => Code::Extend(ExtendCode {
            name: extend.name.clone(),
            codes: Rc::new(rewrite_with_overrides(&extend.codes, overrides)),
            overrides: extend.overrides.clone(),
            line: extend.line.clone(),
        }),
        ref other => other.clone(),
    }
}

fn rewrite_section(section: &SectionCode, overrides: &HashMap<String, Rc<Vec<Code>>>) -> SectionCode {
    SectionCode {
        path: section.path.clone(),
        children: Rc::new(rewrite_with_overrides(&section.children, overrides)),
        line: section.line.clone(),
    }
}

/// Whether a `Name` node with the given dotted path exists anywhere in
/// `codes`, used by the debug-mode override-exhaustiveness check.
fn name_appears(codes: &[Code], name: &str) -> bool {
    codes.iter().any(|code| match *code {
        Code::Name(ref section) => {
            section.path.to_string() == name || name_appears(&section.children, name)
        }
        Code::Iterable(ref section)
        | Code::IfIterable(ref section)
        | Code::InvertedIterable(ref section)
        | Code::Function(ref section) => name_appears(&section.children, name),
        Code::Extend(ref extend) => name_appears(&extend.codes, name),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::Registry;

    #[test]
    fn compiles_write_and_value() {
        let registry = Registry::new();
        let codes = compile("t", &::parse::parse("t", "Hi {{name}}").unwrap(), &registry).unwrap();
        assert_eq!(2, codes.len());
        match codes[0] {
            Code::Write(ref w) => assert_eq!("Hi ", w.text),
            _ => panic!("expected Write"),
        }
        match codes[1] {
            Code::Value(ref v) => assert!(v.encoded),
            _ => panic!("expected Value"),
        }
    }

    #[test]
    fn drops_comments() {
        let registry = Registry::new();
        let codes = compile("t", &::parse::parse("t", "{{! nope }}x").unwrap(), &registry).unwrap();
        assert_eq!(1, codes.len());
    }

    #[test]
    fn unknown_partial_is_construction_time_error() {
        let registry = Registry::new();
        let err = compile("t", &::parse::parse("t", "{{>missing}}").unwrap(), &registry).unwrap_err();
        assert!(matches!(err, ParseError::UnknownPartial(..)));
    }

    #[test]
    fn extend_rewrites_named_block_and_rejects_other_children() {
        let mut registry = Registry::new();
        registry
            .insert("layout", "layout.mustache", "<b>{{$title}}Default{{/title}}</b>")
            .unwrap();

        let codes = compile(
            "t",
            &::parse::parse("t", "{{<layout}}{{$title}}Hi{{/title}}{{/layout}}").unwrap(),
            &registry,
        )
        .unwrap();
        match codes[0] {
            Code::Extend(ref extend) => assert_eq!("layout", extend.name),
            _ => panic!("expected Extend"),
        }

        let err = compile(
            "t",
            &::parse::parse("t", "{{<layout}}{{bad}}{{/layout}}").unwrap(),
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::IllegalCodeInExtend(..)));
    }

    #[test]
    fn extend_reports_every_unused_override_not_just_the_first() {
        let mut registry = Registry::new();
        registry
            .insert("layout", "layout.mustache", "<b>{{$title}}Default{{/title}}</b>")
            .unwrap();

        let err = compile(
            "t",
            &::parse::parse(
                "t",
                "{{<layout}}{{$nope}}a{{/nope}}{{$also_nope}}b{{/also_nope}}{{/layout}}",
            )
            .unwrap(),
            &registry,
        )
        .unwrap_err();

        match err {
            ParseError::UnusedOverride(ref unused) => {
                let names: Vec<&str> = unused.iter().map(|(name, _)| name.as_str()).collect();
                assert_eq!(vec!["nope", "also_nope"], names);
            }
            other => panic!("expected UnusedOverride, got {:?}", other),
        }
    }
}
