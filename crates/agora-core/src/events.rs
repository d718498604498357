use serde::Serialize;

use crate::catalog::Persona;
use crate::session::state::{HumanParticipant, Message};

/// One wire-ready event: name + payload serialized once at publish time.
/// Shared between all listener inboxes behind an `Arc`.
#[derive(Debug, Clone)]
pub struct EventFrame {
    pub event: &'static str,
    pub data: String,
}

impl EventFrame {
    pub fn new(event: &'static str, payload: &impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            event,
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitPayload {
    pub char_a: Persona,
    pub char_b: Persona,
    pub topic: String,
    pub topic_num: u32,
    pub boot: f64,
    pub max_up: u64,
}

/// Speaker identity for `typing` frames: enough to render a bubble with no
/// further lookups.
#[derive(Debug, Clone, Serialize)]
pub struct SpeakerRef {
    pub name: String,
    pub avatar: String,
    pub color: String,
    pub role: String,
}

impl SpeakerRef {
    pub fn from_persona(persona: &Persona) -> Self {
        Self {
            name: persona.name.clone(),
            avatar: persona.avatar.clone(),
            color: persona.color.clone(),
            role: persona.role.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MsgStartPayload {
    pub speaker: String,
    pub avatar: String,
    pub color: String,
    pub role: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WordToken {
    pub w: String,
    pub i: usize,
    pub of: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MsgDonePayload {
    pub speaker: String,
    pub text: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresencePayload {
    pub users: Vec<HumanParticipant>,
    pub viewers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitingPayload {
    pub name: String,
    pub avatar: String,
    pub color: String,
    pub gap: u64,
    pub timeleft: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShutdownSummary {
    pub total_msgs: usize,
    pub user_msgs: usize,
    pub total_topics: u32,
    pub users: usize,
}

/// Idle keep-alive payload, built per connection by the transport rather
/// than published on the bus.
#[derive(Debug, Clone, Serialize)]
pub struct PingPayload {
    pub tl: u64,
    pub v: usize,
}

/// Everything the engine and ingress publish to viewers.
#[derive(Debug, Clone)]
pub enum AgoraEvent {
    Init(InitPayload),
    NewTopic(Message),
    Typing(SpeakerRef),
    MsgStart(MsgStartPayload),
    Word(WordToken),
    MsgDone(MsgDonePayload),
    UserMsg(Message),
    SystemNotice(Message),
    Presence(PresencePayload),
    Waiting(WaitingPayload),
    Shutdown(ShutdownSummary),
}

impl AgoraEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::NewTopic(_) => "newtopic",
            Self::Typing(_) => "typing",
            Self::MsgStart(_) => "msgstart",
            Self::Word(_) => "word",
            Self::MsgDone(_) => "msgdone",
            Self::UserMsg(_) => "usermsg",
            Self::SystemNotice(_) => "system",
            Self::Presence(_) => "presence",
            Self::Waiting(_) => "waiting",
            Self::Shutdown(_) => "shutdown",
        }
    }

    pub fn to_frame(&self) -> serde_json::Result<EventFrame> {
        match self {
            Self::Init(p) => EventFrame::new(self.name(), p),
            Self::NewTopic(p) | Self::UserMsg(p) | Self::SystemNotice(p) => {
                EventFrame::new(self.name(), p)
            }
            Self::Typing(p) => EventFrame::new(self.name(), p),
            Self::MsgStart(p) => EventFrame::new(self.name(), p),
            Self::Word(p) => EventFrame::new(self.name(), p),
            Self::MsgDone(p) => EventFrame::new(self.name(), p),
            Self::Presence(p) => EventFrame::new(self.name(), p),
            Self::Waiting(p) => EventFrame::new(self.name(), p),
            Self::Shutdown(p) => EventFrame::new(self.name(), p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_frames_use_compact_field_names() {
        let frame = AgoraEvent::Word(WordToken {
            w: "hello".to_string(),
            i: 0,
            of: 3,
        })
        .to_frame()
        .unwrap();
        assert_eq!(frame.event, "word");
        assert_eq!(frame.data, r#"{"w":"hello","i":0,"of":3}"#);
    }

    #[test]
    fn event_names_match_wire_protocol() {
        let typing = AgoraEvent::Typing(SpeakerRef {
            name: "Nova".to_string(),
            avatar: "🌅".to_string(),
            color: "#4a9eff".to_string(),
            role: "The Optimist".to_string(),
        });
        assert_eq!(typing.name(), "typing");
    }
}
