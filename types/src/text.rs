//! Small pure text helpers.

/// Canonical form used when comparing free-text answers.
///
/// Trims, lowercases, and removes `.`, `!`, `?` and `,`.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '.' | '!' | '?' | ','))
        .collect()
}

/// Exact match after normalization against any accepted answer.
#[must_use]
pub fn matches_exactly(candidate: &str, accepted: &[String]) -> bool {
    let clean = normalize_answer(candidate);
    !clean.is_empty() && accepted.iter().any(|word| normalize_answer(word) == clean)
}

/// Substring containment after normalization against any accepted answer.
///
/// Model replies tend to wrap the answer in a sentence, so containment is used
/// instead of equality.
#[must_use]
pub fn contains_accepted(candidate: &str, accepted: &[String]) -> bool {
    let clean = normalize_answer(candidate);
    accepted.iter().any(|word| {
        let word = normalize_answer(word);
        !word.is_empty() && clean.contains(&word)
    })
}

/// Truncate a string to a maximum length, adding `...` if needed.
///
/// - Trims surrounding whitespace before truncating.
/// - Uses `char` count (not bytes) to avoid splitting Unicode scalar values.
/// - Enforces a minimum `max` of 3 so the ellipsis fits.
#[must_use]
pub fn truncate_with_ellipsis(raw: &str, max: usize) -> String {
    let max = max.max(3);
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(max - 3).collect();
    format!("{head}...")
}
