//! Literal- and comment-aware placeholder scanning.

#[derive(Clone, Copy)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
}

/// SQL text with string literals and comments blanked out, plus the byte offset of
/// every `?` placeholder outside them.
///
/// Blanking keeps byte offsets stable, so offsets into `masked` are offsets into the
/// original text. Double-quoted identifiers are kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ScannedSql {
    pub masked: String,
    pub placeholders: Vec<usize>,
}

pub(super) fn scan(sql: &str) -> ScannedSql {
    let bytes = sql.as_bytes();
    let mut masked = Vec::with_capacity(bytes.len());
    let mut placeholders = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        let mut keep = true;
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    keep = false;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    masked.extend_from_slice(b"  ");
                    idx += 2;
                    continue;
                }
                b'?' => placeholders.push(idx),
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        masked.extend_from_slice(b"  ");
                        idx += 2;
                        continue;
                    }
                    state = State::Normal;
                } else {
                    keep = false;
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        masked.extend_from_slice(b"\"\"");
                        idx += 2;
                        continue;
                    }
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                } else {
                    keep = false;
                }
            }
            State::BlockComment(depth) => {
                keep = false;
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    masked.extend_from_slice(b"  ");
                    idx += 2;
                    continue;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    masked.extend_from_slice(b"  ");
                    idx += 2;
                    continue;
                }
            }
        }

        // Multi-byte characters are blanked byte by byte, which keeps the output ASCII
        // wherever it differs from the input.
        masked.push(if keep { b } else { b' ' });
        idx += 1;
    }

    ScannedSql {
        masked: String::from_utf8(masked)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()),
        placeholders,
    }
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}
