use std::borrow::Cow;

/// Bound a unified diff to `max_lines` lines before it goes into a prompt.
///
/// Lines are split on `\n` only, so the kept lines stay byte-identical
/// (a trailing `\r` survives). When the diff is longer than `max_lines`,
/// the first `max_lines` lines are kept and one marker line is appended
/// with the original and shown line counts. Shorter input is returned as is.
pub fn truncate(diff: &str, max_lines: usize) -> Cow<'_, str> {
    let total = diff.split('\n').count();
    if total <= max_lines {
        return Cow::Borrowed(diff);
    }

    let mut kept: Vec<&str> = diff.split('\n').take(max_lines).collect();
    let marker = truncation_marker(total, max_lines);
    kept.push(&marker);
    Cow::Owned(kept.join("\n"))
}

fn truncation_marker(total: usize, shown: usize) -> String {
    format!("... (showing first {shown} of {total} lines)")
}
