use std::time::Duration;

/// Fixed palette for human participants, assigned round-robin at join time.
pub const USER_COLORS: [&str; 12] = [
    "#ff9800", "#e91e63", "#9c27b0", "#03a9f4", "#4caf50", "#ff5722", "#00bcd4", "#cddc39",
    "#f44336", "#3f51b5", "#8bc34a", "#795548",
];

/// Tunables for one session. Defaults match the production deployment;
/// tests shrink the durations to milliseconds.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Total uptime budget for the session.
    pub max_uptime: Duration,
    /// Remaining-time threshold below which no new turn may begin.
    pub shutdown_margin: Duration,
    /// Gap between scheduled AI auto-turns.
    pub ai_gap: Duration,
    /// Delay before the first auto-turn after session start.
    pub first_turn_delay: Duration,
    /// Delay before the next auto-turn after a topic rotation.
    pub post_topic_delay: Duration,
    /// How far a human interjection pushes back the next auto-turn.
    pub human_cooldown: Duration,
    /// Settle window bounds: the engine sleeps a uniform duration in
    /// [settle_min, settle_max] before answering a human burst.
    pub settle_min: Duration,
    pub settle_max: Duration,
    /// Bounded poll on the inbound queue, so shutdown deadlines are
    /// checked promptly even with no traffic.
    pub poll_interval: Duration,
    /// Backoff after both content sources fail for a turn.
    pub content_backoff: Duration,
    /// Per-topic turn budget is drawn uniformly from this inclusive range.
    pub min_per_topic: u32,
    pub max_per_topic: u32,
    /// Trailing conversation-log window handed to the content source.
    pub history_window: usize,
    /// Entries kept when the log is truncated at topic rotation.
    pub history_carryover: usize,
    /// Trailing message window served in state snapshots.
    pub snapshot_messages: usize,
    /// Bounded inbox capacity per bus listener.
    pub bus_capacity: usize,
    /// Bounded capacity of the inbound human-message queue.
    pub inbound_capacity: usize,
    /// Target total emission duration for one streamed utterance.
    pub stream_budget: Duration,
    /// Per-word pacing clamp.
    pub min_word_delay: Duration,
    pub max_word_delay: Duration,
    /// Hard word-count cap enforced on content-source output.
    pub max_words: usize,
    /// Display-name length cap for joining humans.
    pub name_limit: usize,
    /// Length cap for human message text.
    pub text_limit: usize,
    /// Seed for the session RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_uptime: Duration::from_secs(21_300),
            shutdown_margin: Duration::from_secs(60),
            ai_gap: Duration::from_secs(25),
            first_turn_delay: Duration::from_secs(6),
            post_topic_delay: Duration::from_secs(5),
            human_cooldown: Duration::from_secs(15),
            settle_min: Duration::from_secs(3),
            settle_max: Duration::from_secs(6),
            poll_interval: Duration::from_millis(500),
            content_backoff: Duration::from_secs(3),
            min_per_topic: 20,
            max_per_topic: 30,
            history_window: 16,
            history_carryover: 6,
            snapshot_messages: 120,
            bus_capacity: 400,
            inbound_capacity: 64,
            stream_budget: Duration::from_secs(18),
            min_word_delay: Duration::from_millis(60),
            max_word_delay: Duration::from_millis(500),
            max_words: 80,
            name_limit: 20,
            text_limit: 500,
            seed: None,
        }
    }
}

/// Content-source connection settings.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    pub base_url: String,
    pub api_key: String,
    pub primary_model: String,
    pub backup_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ContentConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1";
    pub const DEFAULT_PRIMARY_MODEL: &'static str = "llama-3.1-8b-instant";
    pub const DEFAULT_BACKUP_MODEL: &'static str = "meta-llama/llama-4-scout-17b-16e-instruct";

    pub fn new(api_key: String) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key,
            primary_model: Self::DEFAULT_PRIMARY_MODEL.to_string(),
            backup_model: Self::DEFAULT_BACKUP_MODEL.to_string(),
            temperature: 0.85,
            max_tokens: 150,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_turn_budget_range_is_ordered() {
        let config = SessionConfig::default();
        assert!(config.min_per_topic <= config.max_per_topic);
        assert!(config.settle_min <= config.settle_max);
        assert!(config.min_word_delay <= config.max_word_delay);
    }

    #[test]
    fn palette_colors_are_distinct() {
        let mut colors: Vec<_> = USER_COLORS.to_vec();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), USER_COLORS.len());
    }
}
