use std::collections::VecDeque;

use crate::api::{ChatMessage, ChatRole};

/// Bounded trailing window of utterances, rendered per persona: a persona
/// sees its own turns as `assistant` and the opponent's as `user`, so each
/// side keeps a coherent first-person view of the debate.
#[derive(Debug)]
pub struct ConversationLog {
    entries: VecDeque<Utterance>,
    window: usize,
}

#[derive(Debug, Clone)]
pub struct Utterance {
    pub speaker: usize,
    pub text: String,
}

impl ConversationLog {
    pub fn new(window: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            window,
        }
    }

    pub fn push(&mut self, speaker: usize, text: String) {
        self.entries.push_back(Utterance { speaker, text });
        while self.entries.len() > self.window {
            self.entries.pop_front();
        }
    }

    /// Keep only the last `n` entries; called at topic rotation so the new
    /// subject starts with continuity but without the full prior context.
    pub fn truncate_to(&mut self, n: usize) {
        while self.entries.len() > n {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn view_for(&self, persona: usize) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|u| {
                let role = if u.speaker == persona {
                    ChatRole::Assistant
                } else {
                    ChatRole::User
                };
                ChatMessage::new(role, u.text.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_tags_own_turns_as_assistant() {
        let mut log = ConversationLog::new(16);
        log.push(0, "from a".to_string());
        log.push(1, "from b".to_string());

        let for_a = log.view_for(0);
        assert_eq!(for_a[0].role, ChatRole::Assistant);
        assert_eq!(for_a[1].role, ChatRole::User);

        let for_b = log.view_for(1);
        assert_eq!(for_b[0].role, ChatRole::User);
        assert_eq!(for_b[1].role, ChatRole::Assistant);
    }

    #[test]
    fn window_bounds_growth() {
        let mut log = ConversationLog::new(4);
        for i in 0..10 {
            log.push(i % 2, format!("u{i}"));
        }
        assert_eq!(log.len(), 4);
        assert_eq!(log.view_for(0)[0].content, "u6");
    }

    #[test]
    fn truncate_keeps_most_recent() {
        let mut log = ConversationLog::new(16);
        for i in 0..8 {
            log.push(i % 2, format!("u{i}"));
        }
        log.truncate_to(2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.view_for(0)[0].content, "u6");
        assert_eq!(log.view_for(0)[1].content, "u7");
    }
}
