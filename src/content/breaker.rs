//! Finds logical break points in accumulated markdown content so long posts
//! can be split without cutting a paragraph, code fence, heading, or tool
//! marker in half (§4.5).

/// A kind of position where splitting preserves readability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointKind {
    Paragraph,
    CodeBlockEnd,
    Heading,
    ToolMarker,
}

/// A candidate split position: `index` is the byte offset *after* which the
/// first post ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub index: usize,
    pub kind: BreakpointKind,
}

const TOOL_MARKER_PREFIX: &str = "🔧 ";

/// Scan `text` for every recognized breakpoint, in order of appearance.
pub fn find_breakpoints(text: &str) -> Vec<Breakpoint> {
    let mut breakpoints = Vec::new();
    let mut in_fence = false;

    for (line_start, line) in line_starts(text) {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            if !in_fence {
                let end = line_start + line.len();
                breakpoints.push(Breakpoint {
                    index: end,
                    kind: BreakpointKind::CodeBlockEnd,
                });
            }
            continue;
        }
        if in_fence {
            continue;
        }
        if trimmed.is_empty() {
            breakpoints.push(Breakpoint {
                index: line_start,
                kind: BreakpointKind::Paragraph,
            });
        } else if trimmed.starts_with('#') {
            breakpoints.push(Breakpoint {
                index: line_start,
                kind: BreakpointKind::Heading,
            });
        } else if trimmed.starts_with(TOOL_MARKER_PREFIX) {
            breakpoints.push(Breakpoint {
                index: line_start,
                kind: BreakpointKind::ToolMarker,
            });
        }
    }

    breakpoints
}

fn line_starts(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line.trim_end_matches('\n'))
    })
}

/// Whether byte offset `index` falls inside an open (unterminated) code
/// fence, scanning from the start of `text`.
pub fn is_inside_code_fence(text: &str, index: usize) -> bool {
    let mut in_fence = false;
    for (line_start, line) in line_starts(text) {
        if line_start >= index {
            break;
        }
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
    }
    in_fence
}

/// The last breakpoint at or before `limit`, preferring (in order) the
/// latest code-block end, then the latest paragraph/heading/tool-marker —
/// but if `limit` itself falls inside an open fence, prefer a break
/// immediately before that fence's opening line instead (§4.5: "If inside
/// an open code fence, prefer a break immediately before the opening fence").
pub fn last_breakpoint_before(text: &str, limit: usize) -> Option<Breakpoint> {
    if is_inside_code_fence(text, limit) {
        return last_fence_open_before(text, limit);
    }
    find_breakpoints(text)
        .into_iter()
        .filter(|bp| bp.index <= limit)
        .next_back()
}

fn last_fence_open_before(text: &str, limit: usize) -> Option<Breakpoint> {
    let mut last_open: Option<usize> = None;
    let mut in_fence = false;
    for (line_start, line) in line_starts(text) {
        if line_start >= limit {
            break;
        }
        if line.trim_start().starts_with("```") {
            if !in_fence {
                last_open = Some(line_start);
            }
            in_fence = !in_fence;
        }
    }
    last_open.map(|index| Breakpoint {
        index,
        kind: BreakpointKind::CodeBlockEnd,
    })
}

/// Heuristic used by streaming consumers to decide whether the accumulated
/// text already contains enough structure to flush early rather than
/// waiting for more tokens — true once at least one non-fence-internal
/// breakpoint exists.
pub fn good_enough_to_flush_early(text: &str) -> bool {
    find_breakpoints(text)
        .iter()
        .any(|bp| !is_inside_code_fence(text, bp.index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_paragraph_breaks() {
        let text = "first\n\nsecond";
        let bps = find_breakpoints(text);
        assert!(bps.iter().any(|b| b.kind == BreakpointKind::Paragraph));
    }

    #[test]
    fn finds_code_block_end() {
        let text = "before\n```rust\ncode\n```\nafter";
        let bps = find_breakpoints(text);
        assert!(bps.iter().any(|b| b.kind == BreakpointKind::CodeBlockEnd));
    }

    #[test]
    fn detects_inside_open_fence() {
        let text = "before\n```rust\nlet x = 1;";
        assert!(is_inside_code_fence(text, text.len()));
        let closed = "before\n```rust\ncode\n```\nafter";
        assert!(!is_inside_code_fence(closed, closed.len()));
    }

    #[test]
    fn prefers_break_before_open_fence() {
        let text = "para one\n\n```rust\nlet x = 1;\nlet y = 2;";
        let bp = last_breakpoint_before(text, text.len()).expect("a breakpoint exists");
        assert!(!is_inside_code_fence(text, bp.index));
    }

    #[test]
    fn heading_is_a_breakpoint() {
        let text = "intro\n## Section\nbody";
        let bps = find_breakpoints(text);
        assert!(bps.iter().any(|b| b.kind == BreakpointKind::Heading));
    }
}
