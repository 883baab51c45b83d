//! Log line prefix composition.

/// Marker for the request initiation event.
pub const INI_MARKER: &str = "[INI]";
/// Marker for the response completion event.
pub const END_MARKER: &str = "[END]";
/// Marker for the 404 event emitted when the response finishes.
pub const NOT_FOUND_MARKER: &str = "[NOT_FOUND]";

/// Join the non-empty `parts` with one space and append two trailing spaces.
///
/// Returns an empty string when every part is empty.
pub fn compose(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    if joined.is_empty() {
        joined
    } else {
        joined + "  "
    }
}

/// Hundreds bucket of a status code: 404 → 400, 201 → 200.
pub fn status_category(status: u16) -> u16 {
    status / 100 * 100
}
