const MAX_OUTPUT_LENGTH: usize = 4_000;
const MAX_EXCERPT_LENGTH: usize = 160;

/// Largest index <= `idx` that falls on a char boundary.
fn floor_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest index >= `idx` that falls on a char boundary.
fn ceil_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Keep the head and tail of long captured output.
pub fn truncate_output(output: &str) -> String {
    if output.len() <= MAX_OUTPUT_LENGTH {
        output.to_string()
    } else {
        let half = MAX_OUTPUT_LENGTH / 2;
        let start = &output[..floor_boundary(output, half)];
        let end = &output[ceil_boundary(output, output.len() - half)..];
        format!("{}\n\n... [truncated {} chars] ...\n\n{}", start, output.len() - MAX_OUTPUT_LENGTH, end)
    }
}

/// Single-line preview for console output.
pub fn excerpt(output: &str) -> String {
    let flat = output.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.len() <= MAX_EXCERPT_LENGTH {
        flat
    } else {
        format!("{}...", &flat[..floor_boundary(&flat, MAX_EXCERPT_LENGTH)])
    }
}
