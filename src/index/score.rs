/// Positional subsequence score of `query` against a root-relative path.
///
/// An empty query matches everything with the same score. Otherwise each query
/// char must be found, case-insensitively, strictly after the previous match.
/// The weight starts at 1 and grows by the distance advanced for every match,
/// so earlier and tighter matches score higher. Returns 0 when any char is
/// missing.
pub fn score(query: &[char], relative: &str) -> f64 {
    if query.is_empty() {
        return 1.0;
    }

    let mut weight = 1usize;
    let mut remaining = relative.chars();
    for &wanted in query {
        let Some(advanced) = remaining.position(|c| chars_eq_ignore_case(c, wanted)) else {
            return 0.0;
        };
        weight += advanced + 1;
    }
    1.0 / weight as f64
}

fn chars_eq_ignore_case(left: char, right: char) -> bool {
    left == right || left.to_lowercase().eq(right.to_lowercase())
}
