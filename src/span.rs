use std::rc::Rc;

use code::Code;
use handle::TemplateHandle;
use scope::Scope;

/// Probes `next[0]` forward, one character at a time, until it matches,
/// then returns the text this node consumed and the committed position.
/// The probe position is local to this call; it never touches the
/// caller's real `pos`, and the trial scope used for each probe attempt
/// is thrown away (only whether it matched is observed).
pub fn extract(
    text: &str,
    pos: usize,
    scope: &Scope,
    next: &[Code],
    handle: &Rc<dyn TemplateHandle>,
) -> Option<(String, usize)> {
    if next.is_empty() {
        return None;
    }
    let mut probe = pos;
    loop {
        if probe > text.len() {
            return None;
        }
        let last_pos = probe;
        let trial = scope.clone();
        if next[0]
            .unexecute(trial, text, probe, &next[1..], handle)
            .is_some()
        {
            return Some((text[pos..last_pos].to_string(), last_pos));
        }
        probe += text[probe..].chars().next().map(char::len_utf8).unwrap_or(1);
    }
}

/// Builds the lookahead list a child sees during reverse matching: its own
/// siblings from `start` onward, followed by whatever followed the
/// enclosing section. Returns an owned `Vec` per call so no mutable buffer
/// is shared across recursive invocations.
pub fn truncate(siblings: &[Code], start: usize, next: &[Code]) -> Vec<Code> {
    let mut combined = Vec::with_capacity(siblings.len().saturating_sub(start) + next.len());
    combined.extend_from_slice(&siblings[start..]);
    combined.extend_from_slice(next);
    combined
}

/// Runs `children` in sequence against `text` starting at `pos`, threading
/// the accumulating scope and position through each. Used by Name,
/// Extend, and one iteration of Iterable/IfIterable/InvertedIterable.
pub fn run_sequence(
    children: &[Code],
    mut scope: Scope,
    text: &str,
    mut pos: usize,
    outer_next: &[Code],
    handle: &Rc<dyn TemplateHandle>,
) -> Option<(Scope, usize)> {
    for (index, code) in children.iter().enumerate() {
        let lookahead = truncate(children, index + 1, outer_next);
        match code.unexecute(scope, text, pos, &lookahead, handle) {
            Some((next_scope, next_pos)) => {
                scope = next_scope;
                pos = next_pos;
            }
            None => return None,
        }
    }
    Some((scope, pos))
}
