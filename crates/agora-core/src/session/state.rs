use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Persona;

/// Wall-clock display form carried on every message, matching the wire
/// protocol (`HH:MM` UTC).
pub fn clock_time(now: DateTime<Utc>) -> String {
    now.format("%H:%M").to_string()
}

pub fn now_hm() -> String {
    clock_time(Utc::now())
}

pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Session uptime budget. Created once at process start; the engine checks
/// `time_left` at loop-iteration boundaries only.
#[derive(Debug)]
pub struct SessionClock {
    boot: Instant,
    boot_unix: f64,
    max_uptime: Duration,
}

impl SessionClock {
    pub fn new(max_uptime: Duration) -> Self {
        Self {
            boot: Instant::now(),
            boot_unix: unix_now(),
            max_uptime,
        }
    }

    pub fn time_left(&self) -> Duration {
        self.max_uptime.saturating_sub(self.boot.elapsed())
    }

    pub fn boot_unix(&self) -> f64 {
        self.boot_unix
    }

    pub fn max_uptime(&self) -> Duration {
        self.max_uptime
    }
}

/// A joined human. Never removed for the lifetime of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanParticipant {
    pub id: String,
    pub name: String,
    pub color: String,
    pub joined: f64,
}

/// One entry of the globally ordered, append-only conversation record.
/// `seq` is assigned at append and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "topic")]
    Topic {
        seq: u64,
        number: u32,
        text: String,
        time: String,
    },
    #[serde(rename = "message")]
    Ai {
        seq: u64,
        topic_num: u32,
        speaker: String,
        avatar: String,
        color: String,
        role: String,
        text: String,
        time: String,
    },
    #[serde(rename = "user")]
    Human {
        seq: u64,
        topic_num: u32,
        user_id: String,
        user_name: String,
        color: String,
        text: String,
        time: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        msg_id: Option<String>,
    },
    #[serde(rename = "system")]
    System {
        seq: u64,
        topic_num: u32,
        text: String,
        time: String,
    },
}

impl Message {
    pub fn topic(number: u32, text: String) -> Self {
        Self::Topic {
            seq: 0,
            number,
            text,
            time: now_hm(),
        }
    }

    pub fn ai(topic_num: u32, persona: &Persona, text: String) -> Self {
        Self::Ai {
            seq: 0,
            topic_num,
            speaker: persona.name.clone(),
            avatar: persona.avatar.clone(),
            color: persona.color.clone(),
            role: persona.role.clone(),
            text,
            time: now_hm(),
        }
    }

    pub fn human(
        topic_num: u32,
        user: &HumanParticipant,
        text: String,
        msg_id: Option<String>,
    ) -> Self {
        Self::Human {
            seq: 0,
            topic_num,
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            color: user.color.clone(),
            text,
            time: now_hm(),
            msg_id,
        }
    }

    pub fn system(topic_num: u32, text: String) -> Self {
        Self::System {
            seq: 0,
            topic_num,
            text,
            time: now_hm(),
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            Self::Topic { seq, .. }
            | Self::Ai { seq, .. }
            | Self::Human { seq, .. }
            | Self::System { seq, .. } => *seq,
        }
    }

    fn seq_mut(&mut self) -> &mut u64 {
        match self {
            Self::Topic { seq, .. }
            | Self::Ai { seq, .. }
            | Self::Human { seq, .. }
            | Self::System { seq, .. } => seq,
        }
    }

    /// Speaker-prefixed line for prompt context; `None` for non-utterances.
    pub fn context_line(&self) -> Option<String> {
        match self {
            Self::Ai { speaker, text, .. } => Some(format!("{speaker}: {text}")),
            Self::Human {
                user_name, text, ..
            } => Some(format!("{user_name}: {text}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MessageCounts {
    pub ai: usize,
    pub human: usize,
    pub topics: u32,
    pub users: usize,
}

#[derive(Debug)]
struct SessionState {
    char_a: Persona,
    char_b: Persona,
    topic: Option<String>,
    topic_num: u32,
    messages: Vec<Message>,
    users: Vec<HumanParticipant>,
    typing: Option<String>,
    next_seq: u64,
}

/// Point-in-time copy of session state served to new or reconnecting
/// observers and to the `/state` endpoint. Mid-stream words are bus-only
/// and never visible here.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub char_a: Persona,
    pub char_b: Persona,
    pub topic: Option<String>,
    pub topic_num: u32,
    pub messages: Vec<Message>,
    pub typing: Option<String>,
    pub boot: f64,
    pub max_up: u64,
    pub timeleft: u64,
    pub users: Vec<HumanParticipant>,
    pub viewers: usize,
}

/// Shared view of one session's state. The engine task performs all
/// turn-derived mutation; the ingress boundary performs roster inserts and
/// human/system appends; everyone else reads snapshots. Writes are short
/// and never held across awaits.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<SessionState>>,
}

impl SharedState {
    pub fn new(char_a: Persona, char_b: Persona) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState {
                char_a,
                char_b,
                topic: None,
                topic_num: 0,
                messages: Vec::new(),
                users: Vec::new(),
                typing: None,
                next_seq: 0,
            })),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message, assigning its sequence number. Returns the stored
    /// message as appended.
    pub fn append(&self, mut message: Message) -> Message {
        let mut state = self.write();
        *message.seq_mut() = state.next_seq;
        state.next_seq += 1;
        state.messages.push(message.clone());
        message
    }

    pub fn set_topic(&self, text: String, number: u32) {
        let mut state = self.write();
        state.topic = Some(text);
        state.topic_num = number;
    }

    pub fn topic(&self) -> Option<String> {
        self.read().topic.clone()
    }

    pub fn topic_num(&self) -> u32 {
        self.read().topic_num
    }

    pub fn set_typing(&self, speaker: Option<String>) {
        self.write().typing = speaker;
    }

    pub fn add_user(&self, user: HumanParticipant) {
        self.write().users.push(user);
    }

    pub fn user_by_id(&self, id: &str) -> Option<HumanParticipant> {
        self.read().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn users(&self) -> Vec<HumanParticipant> {
        self.read().users.clone()
    }

    pub fn user_count(&self) -> usize {
        self.read().users.len()
    }

    /// Last `keep` speaker-prefixed lines among the trailing `scan`
    /// messages, oldest first.
    pub fn recent_context(&self, scan: usize, keep: usize) -> Vec<String> {
        let state = self.read();
        let mut lines: Vec<String> = state
            .messages
            .iter()
            .rev()
            .take(scan)
            .filter_map(Message::context_line)
            .collect();
        lines.reverse();
        let start = lines.len().saturating_sub(keep);
        lines.split_off(start)
    }

    /// Most recent AI utterance by the named speaker.
    pub fn last_text_by(&self, speaker: &str) -> Option<String> {
        let state = self.read();
        state.messages.iter().rev().find_map(|m| match m {
            Message::Ai { speaker: s, text, .. } if s == speaker => Some(text.clone()),
            _ => None,
        })
    }

    /// Most recent human utterance within the trailing `scan` messages.
    pub fn recent_human(&self, scan: usize) -> Option<(String, String)> {
        let state = self.read();
        state.messages.iter().rev().take(scan).find_map(|m| match m {
            Message::Human {
                user_name, text, ..
            } => Some((user_name.clone(), text.clone())),
            _ => None,
        })
    }

    pub fn counts(&self) -> MessageCounts {
        let state = self.read();
        let ai = state
            .messages
            .iter()
            .filter(|m| matches!(m, Message::Ai { .. }))
            .count();
        let human = state
            .messages
            .iter()
            .filter(|m| matches!(m, Message::Human { .. }))
            .count();
        MessageCounts {
            ai,
            human,
            topics: state.topic_num,
            users: state.users.len(),
        }
    }

    pub fn personas(&self) -> (Persona, Persona) {
        let state = self.read();
        (state.char_a.clone(), state.char_b.clone())
    }

    pub fn snapshot(&self, clock: &SessionClock, viewers: usize, tail: usize) -> StateSnapshot {
        let state = self.read();
        let start = state.messages.len().saturating_sub(tail);
        StateSnapshot {
            char_a: state.char_a.clone(),
            char_b: state.char_b.clone(),
            topic: state.topic.clone(),
            topic_num: state.topic_num,
            messages: state.messages[start..].to_vec(),
            typing: state.typing.clone(),
            boot: clock.boot_unix(),
            max_up: clock.max_uptime().as_secs(),
            timeleft: clock.time_left().as_secs(),
            users: state.users.clone(),
            viewers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(name: &str) -> Persona {
        Persona {
            id: name.to_lowercase(),
            name: name.to_string(),
            avatar: "⭐".to_string(),
            color: "#fff".to_string(),
            role: "The Test".to_string(),
            personality: "p".to_string(),
            style: "s".to_string(),
        }
    }

    fn shared() -> SharedState {
        SharedState::new(persona("Nova"), persona("Axiom"))
    }

    #[test]
    fn append_assigns_strictly_increasing_seq() {
        let state = shared();
        let first = state.append(Message::system(0, "one".to_string()));
        let second = state.append(Message::system(0, "two".to_string()));
        assert_eq!(first.seq(), 0);
        assert_eq!(second.seq(), 1);
    }

    #[test]
    fn snapshot_serves_trailing_window_only() {
        let state = shared();
        for i in 0..10 {
            state.append(Message::system(0, format!("m{i}")));
        }
        let clock = SessionClock::new(Duration::from_secs(100));
        let snapshot = state.snapshot(&clock, 3, 4);
        assert_eq!(snapshot.messages.len(), 4);
        assert_eq!(snapshot.messages[0].seq(), 6);
        assert_eq!(snapshot.viewers, 3);
    }

    #[test]
    fn recent_context_keeps_latest_lines_in_order() {
        let state = shared();
        let (nova, _) = state.personas();
        state.append(Message::ai(1, &nova, "first point".to_string()));
        state.append(Message::topic(2, "a topic".to_string()));
        state.append(Message::ai(2, &nova, "second point".to_string()));

        let lines = state.recent_context(8, 5);
        assert_eq!(
            lines,
            vec![
                "Nova: first point".to_string(),
                "Nova: second point".to_string()
            ]
        );
    }

    #[test]
    fn last_text_by_skips_other_speakers() {
        let state = shared();
        let (nova, axiom) = state.personas();
        state.append(Message::ai(1, &nova, "nova early".to_string()));
        state.append(Message::ai(1, &axiom, "axiom reply".to_string()));
        state.append(Message::ai(1, &nova, "nova late".to_string()));

        assert_eq!(state.last_text_by("Axiom"), Some("axiom reply".to_string()));
        assert_eq!(state.last_text_by("Nova"), Some("nova late".to_string()));
        assert_eq!(state.last_text_by("Ghost"), None);
    }

    #[test]
    fn ai_message_serializes_with_wire_tag() {
        let state = shared();
        let (nova, _) = state.personas();
        let msg = state.append(Message::ai(1, &nova, "hello".to_string()));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["speaker"], "Nova");
        assert_eq!(json["topic_num"], 1);
    }

    #[test]
    fn clock_counts_down_from_budget() {
        let clock = SessionClock::new(Duration::from_secs(3600));
        let left = clock.time_left();
        assert!(left <= Duration::from_secs(3600));
        assert!(left > Duration::from_secs(3590));
    }
}
