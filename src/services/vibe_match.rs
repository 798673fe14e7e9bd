use std::collections::HashSet;

use crate::constants::vibe::{DEFAULT_MATCH, MAX_MATCH, MIN_MATCH};

/// Percentage of a location's moods the user already enjoyed on completed visits.
///
/// Falls back to [`DEFAULT_MATCH`] when either side has no moods, and clamps
/// the result to `MIN_MATCH..=MAX_MATCH`.
#[must_use]
pub fn score(location_moods: &HashSet<i32>, visited_moods: &HashSet<i32>) -> i32 {
    if location_moods.is_empty() || visited_moods.is_empty() {
        return DEFAULT_MATCH;
    }

    let common = location_moods.intersection(visited_moods).count();
    let pct = common * 100 / location_moods.len();
    i32::try_from(pct)
        .unwrap_or(MAX_MATCH)
        .clamp(MIN_MATCH, MAX_MATCH)
}
