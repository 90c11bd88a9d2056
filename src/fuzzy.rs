//! Fuzzy subsequence matching for quick-open and command palettes.
//!
//! A query matches a target when its characters appear in the target in
//! order, ignoring case. Matching is greedy: each query character takes the
//! first unused target position. The score rewards contiguous runs, word
//! starts and camelCase humps, and favors matches near the front.
//!
//! ```
//! use markview::fuzzy::{fuzzy_match, rank};
//!
//! let result = fuzzy_match("gtl", "Go To Line").unwrap();
//! assert_eq!(result.matched_indices, vec![0, 3, 6]);
//!
//! let ranked = rank("set", ["Reset View", "Settings", "Go To Line"]);
//! assert_eq!(ranked[0].item, "Settings");
//! assert_eq!(ranked.len(), 2);
//! ```

const CONTIGUOUS_BONUS: i64 = 5;
const WORD_START_BONUS: i64 = 10;
const CAMEL_CASE_BONUS: i64 = 8;
const POSITION_BONUS_MAX: i64 = 5;

/// Score and matched positions for one (query, target) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FuzzyMatchResult {
    pub score: i64,
    /// Character positions in the target consumed by the query, increasing
    pub matched_indices: Vec<usize>,
}

/// A candidate that matched, from [`rank`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<T> {
    pub item: T,
    /// Position of the item in the input sequence
    pub index: usize,
    pub result: FuzzyMatchResult,
}

const fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '_' | '-' | '/' | '.')
}

fn fold(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Match `query` against `target` as a case-insensitive subsequence.
///
/// Returns `None` when some query character cannot be found in order. An
/// empty query matches everything with score 0.
pub fn fuzzy_match(query: &str, target: &str) -> Option<FuzzyMatchResult> {
    let target: Vec<char> = target.chars().collect();
    let mut result = FuzzyMatchResult::default();
    let mut cursor = 0;

    for q in query.chars().map(fold) {
        let found = target[cursor..].iter().position(|&t| fold(t) == q)?;
        let pos = cursor + found;
        result.score += score_at(&target, pos, result.matched_indices.last().copied());
        result.matched_indices.push(pos);
        cursor = pos + 1;
    }
    Some(result)
}

fn score_at(target: &[char], pos: usize, previous: Option<usize>) -> i64 {
    let mut score = 0;
    if previous.is_some_and(|prev| prev + 1 == pos) {
        score += CONTIGUOUS_BONUS;
    }
    let before = pos.checked_sub(1).map(|i| target[i]);
    match before {
        None => score += WORD_START_BONUS,
        Some(b) if is_separator(b) => score += WORD_START_BONUS,
        Some(b) if b.is_lowercase() && target[pos].is_uppercase() => score += CAMEL_CASE_BONUS,
        Some(_) => {}
    }
    let position_bonus = i64::try_from(pos / 10).map_or(0, |tens| POSITION_BONUS_MAX - tens);
    score + position_bonus.max(0)
}

/// Match `query` against every candidate and sort the hits best first.
///
/// Ties on score go to the shorter target, then the lexically smaller one,
/// then the earlier input position, so the order never depends on sort
/// stability.
pub fn rank<T: AsRef<str>>(query: &str, candidates: impl IntoIterator<Item = T>) -> Vec<Ranked<T>> {
    let mut hits: Vec<Ranked<T>> = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let result = fuzzy_match(query, item.as_ref())?;
            Some(Ranked {
                item,
                index,
                result,
            })
        })
        .collect();
    hits.sort_unstable_by(|a, b| {
        b.result
            .score
            .cmp(&a.result.score)
            .then_with(|| {
                let a_len = a.item.as_ref().chars().count();
                a_len.cmp(&b.item.as_ref().chars().count())
            })
            .then_with(|| a.item.as_ref().cmp(b.item.as_ref()))
            .then_with(|| a.index.cmp(&b.index))
    });
    tracing::trace!(query, hits = hits.len(), "ranked fuzzy candidates");
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_query_matches_with_zero_score() {
        let result = fuzzy_match("", "anything").unwrap();
        assert_eq!(result.score, 0);
        assert!(result.matched_indices.is_empty());
        assert!(fuzzy_match("", "").is_some());
    }

    #[test]
    fn test_missing_character_is_none() {
        assert!(fuzzy_match("xyz", "Go To Line").is_none());
        assert!(fuzzy_match("a", "").is_none());
    }

    #[test]
    fn test_order_matters() {
        assert!(fuzzy_match("ba", "ab").is_none());
        assert!(fuzzy_match("ab", "ab").is_some());
    }

    #[test]
    fn test_case_is_ignored() {
        let result = fuzzy_match("GTL", "go to line").unwrap();
        assert_eq!(result.matched_indices, vec![0, 3, 6]);
    }

    #[test]
    fn test_word_starts_are_matched_when_greedy_allows() {
        let result = fuzzy_match("gtl", "Go To Line").unwrap();
        assert_eq!(result.matched_indices, vec![0, 3, 6]);
        // three word starts at positions < 10
        assert_eq!(result.score, 3 * (WORD_START_BONUS + POSITION_BONUS_MAX));
    }

    #[test]
    fn test_greedy_takes_first_available_position() {
        let result = fuzzy_match("gto", "Go To Line").unwrap();
        assert_eq!(result.matched_indices, vec![0, 3, 4]);
        // G: start, T: after space, o: contiguous with T
        assert_eq!(result.score, 15 + 15 + 10);
    }

    #[test]
    fn test_camel_case_bonus() {
        let camel = fuzzy_match("b", "fooBar").unwrap();
        let flat = fuzzy_match("b", "foobar").unwrap();
        assert_eq!(camel.score - flat.score, CAMEL_CASE_BONUS);
    }

    #[test]
    fn test_separator_bonus_replaces_camel_bonus() {
        let result = fuzzy_match("b", "foo_Bar").unwrap();
        assert_eq!(result.score, WORD_START_BONUS + POSITION_BONUS_MAX);
    }

    #[test]
    fn test_position_bonus_fades() {
        let near = fuzzy_match("z", "aaz").unwrap();
        let far = fuzzy_match("z", &format!("{}z", "a".repeat(45))).unwrap();
        assert_eq!(near.score, 5);
        assert_eq!(far.score, 1);
        let very_far = fuzzy_match("z", &format!("{}z", "a".repeat(80))).unwrap();
        assert_eq!(very_far.score, 0);
    }

    #[test]
    fn test_rank_orders_by_score() {
        let ranked = rank("gtl", ["settings", "Go To Line", "go_to_label"]);
        let items: Vec<&str> = ranked.iter().map(|r| r.item).collect();
        assert_eq!(items[0], "Go To Line");
        assert!(!items.contains(&"settings"));
    }

    #[test]
    fn test_rank_tiebreak_is_deterministic() {
        let ranked = rank("ab", ["abd", "abc", "ab", "abc"]);
        let order: Vec<(&str, usize)> = ranked.iter().map(|r| (r.item, r.index)).collect();
        assert_eq!(order, vec![("ab", 2), ("abc", 1), ("abc", 3), ("abd", 0)]);
    }

    #[test]
    fn test_rank_keeps_owned_items() {
        let candidates = vec![String::from("alpha"), String::from("beta")];
        let ranked = rank("bt", candidates);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item, "beta");
        assert_eq!(ranked[0].index, 1);
    }

    proptest! {
        #[test]
        fn prop_indices_strictly_increase(query in "[a-c]{0,4}", target in "[a-cA-C _]{0,24}") {
            if let Some(result) = fuzzy_match(&query, &target) {
                prop_assert_eq!(result.matched_indices.len(), query.chars().count());
                for pair in result.matched_indices.windows(2) {
                    prop_assert!(pair[0] < pair[1]);
                }
                prop_assert!(result.score >= 0);
            }
        }

        #[test]
        fn prop_subsequence_of_target_always_matches(target in "[a-z]{1,20}", mask in any::<u32>()) {
            let query: String = target
                .chars()
                .enumerate()
                .filter(|(i, _)| mask & (1 << (i % 32)) != 0)
                .map(|(_, c)| c)
                .collect();
            prop_assert!(fuzzy_match(&query, &target).is_some());
        }
    }
}
