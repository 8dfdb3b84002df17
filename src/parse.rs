use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

use error::{Line, ParseError};
use path::Path;

#[derive(PestParser)]
#[grammar = "stache.pest"]
struct MustacheParser;

/// The uncompiled parse tree produced by the grammar: one node per
/// template construct, each carrying the source line it started on.
/// `compile.rs` turns these into [`crate::code::Code`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Content(String, Line),
    Comment(String, Line),
    Variable(Path, Line),
    Unescaped(Path, Line),
    Partial(String, Line),
    Section(Path, Vec<Node>, Line),
    IfSection(Path, Vec<Node>, Line),
    Inverted(Path, Vec<Node>, Line),
    Function(Path, Vec<Node>, Line),
    NamedBlock(Path, Vec<Node>, Line),
    Extend(String, Vec<Node>, Line),
}

/// Parses a template's source text into a flat node list. `file` is used
/// only to stamp diagnostics; it need not be a real path.
pub fn parse(file: &str, source: &str) -> Result<Vec<Node>, ParseError> {
    let mut pairs = MustacheParser::parse(Rule::program, source)
        .map_err(|err| ParseError::Syntax(file.to_string(), err.to_string()))?;
    let program = pairs.next().expect("program rule always produces one pair");
    let block = program
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::block)
        .expect("program always contains a block");
    build_block(file, block)
}

fn line_at(file: &str, pair: &Pair<Rule>) -> Line {
    let (line, _) = pair.as_span().start_pos().line_col();
    Line::new(file, line)
}

fn build_block(file: &str, block: Pair<Rule>) -> Result<Vec<Node>, ParseError> {
    let mut nodes = Vec::new();
    for statement in block.into_inner() {
        if statement.as_rule() != Rule::statement {
            continue;
        }
        let matched = statement
            .into_inner()
            .next()
            .expect("statement always wraps exactly one alternative");
        nodes.push(build_statement(file, matched)?);
    }
    Ok(nodes)
}

/// Pulls the open tag's name, the nested block, and the close tag's name
/// out of a `sopen ~ block ~ close_tag`-shaped pair, failing with
/// [`ParseError::InvalidSection`] when the names disagree.
fn open_block_close(file: &str, pair: Pair<Rule>) -> Result<(String, Vec<Node>), ParseError> {
    let mut inner = pair.into_inner();
    let open = inner.next().expect("section rule always has an open tag");
    let open_name = open
        .into_inner()
        .next()
        .expect("open tag always names a path or partial id")
        .as_str()
        .to_string();
    let block = inner.next().expect("section rule always has a block");
    let close = inner.next().expect("section rule always has a close tag");
    let close_name = close
        .into_inner()
        .next()
        .expect("close tag always names something")
        .as_str()
        .to_string();
    if open_name != close_name {
        return Err(ParseError::InvalidSection(
            Path::split(&open_name),
            Path::split(&close_name),
        ));
    }
    Ok((open_name, build_block(file, block)?))
}

fn build_statement(file: &str, pair: Pair<Rule>) -> Result<Node, ParseError> {
    let rule = pair.as_rule();
    let line = line_at(file, &pair);
    match rule {
        Rule::content => Ok(Node::Content(pair.as_str().to_string(), line)),
        Rule::comment => {
            let text = pair
                .into_inner()
                .next()
                .map(|ctext| ctext.as_str().to_string())
                .unwrap_or_default();
            Ok(Node::Comment(text, line))
        }
        Rule::variable => {
            let path = Path::split(
                pair.into_inner()
                    .next()
                    .expect("variable always names a path")
                    .as_str(),
            );
            Ok(Node::Variable(path, line))
        }
        Rule::unescaped_triple | Rule::unescaped_amp => {
            let path = Path::split(
                pair.into_inner()
                    .next()
                    .expect("unescaped tag always names a path")
                    .as_str(),
            );
            Ok(Node::Unescaped(path, line))
        }
        Rule::partial => {
            let name = pair
                .into_inner()
                .next()
                .expect("partial always names an id")
                .as_str()
                .to_string();
            Ok(Node::Partial(name, line))
        }
        Rule::section | Rule::ifsection | Rule::inverted | Rule::function | Rule::namedblock => {
            let (name, children) = open_block_close(file, pair)?;
            let path = Path::split(&name);
            Ok(match rule {
                Rule::section => Node::Section(path, children, line),
                Rule::ifsection => Node::IfSection(path, children, line),
                Rule::inverted => Node::Inverted(path, children, line),
                Rule::function => Node::Function(path, children, line),
                Rule::namedblock => Node::NamedBlock(path, children, line),
                _ => unreachable!(),
            })
        }
        Rule::extend => {
            let (name, children) = open_block_close(file, pair)?;
            Ok(Node::Extend(name, children, line))
        }
        other => unreachable!("unexpected rule in statement position: {:?}", other),
    }
}
