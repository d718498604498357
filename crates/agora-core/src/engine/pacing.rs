use std::time::Duration;

/// Per-word emission delay: the total stream should approximate `budget`,
/// but never run so fast the message appears instantaneous nor so slow it
/// outlasts the inter-turn gap.
pub fn word_delay(word_count: usize, budget: Duration, min: Duration, max: Duration) -> Duration {
    let count = word_count.max(1) as u32;
    (budget / count).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MIN: Duration = Duration::from_millis(60);
    const MAX: Duration = Duration::from_millis(500);
    const BUDGET: Duration = Duration::from_secs(18);

    #[rstest]
    #[case(1, MAX)] // one word: clamped to the slow bound
    #[case(36, BUDGET / 36)] // mid-size message: fits the budget exactly
    #[case(1000, MIN)] // huge message: clamped to the fast bound
    fn delay_is_clamped_to_rate_range(#[case] words: usize, #[case] expected: Duration) {
        assert_eq!(word_delay(words, BUDGET, MIN, MAX), expected);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(80)]
    #[case(100_000)]
    fn delay_always_within_bounds(#[case] words: usize) {
        let delay = word_delay(words, BUDGET, MIN, MAX);
        assert!(delay >= MIN && delay <= MAX);
    }

    #[test]
    fn total_emission_approximates_budget_for_typical_messages() {
        let words = 60;
        let delay = word_delay(words, BUDGET, MIN, MAX);
        let total = delay * words as u32;
        assert!(total >= Duration::from_secs(17) && total <= Duration::from_secs(19));
    }
}
