//! Numbered source windows around a line of interest

/// Lines shown on each side of the centre line
pub const WINDOW: usize = 10;

/// Index range `[start, end)` of the window around `center`, clamped to `len`
pub fn window_bounds(len: usize, center: usize) -> (usize, usize) {
    let start = center.saturating_sub(WINDOW);
    let end = (center + WINDOW + 1).min(len);
    (start.min(end), end)
}

/// Render the window as `N: text` lines with 1-based numbers
pub fn format_snippet(lines: &[String], center: usize) -> String {
    let (start, end) = window_bounds(lines.len(), center);
    (start..end)
        .map(|idx| format!("{}: {}", idx + 1, lines[idx]))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The raw lines of the window, without numbering
pub fn window_lines(lines: &[String], center: usize) -> Vec<String> {
    let (start, end) = window_bounds(lines.len(), center);
    lines[start..end].to_vec()
}
