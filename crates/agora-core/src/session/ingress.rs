use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::{EventBus, EventListener};
use crate::config::{SessionConfig, USER_COLORS};
use crate::error::ValidationError;
use crate::events::{AgoraEvent, PingPayload, PresencePayload};
use crate::session::state::{
    HumanParticipant, Message, SessionClock, SharedState, StateSnapshot, now_hm, unix_now,
};

/// A human message queued for engine attention. Carries everything the
/// responder prompt needs so the engine never re-reads the roster.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub user_id: String,
    pub user_name: String,
    pub color: String,
    pub text: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct JoinedParticipant {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// The boundary surface handed to transport tasks: join/send ingress,
/// bus subscription, and state snapshots. Cheap to clone; every operation
/// is safe under concurrent access independent of engine progress.
#[derive(Clone)]
pub struct SessionHandle {
    state: SharedState,
    bus: EventBus,
    clock: Arc<SessionClock>,
    config: Arc<SessionConfig>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    color_index: Arc<AtomicUsize>,
}

impl SessionHandle {
    pub(crate) fn new(
        state: SharedState,
        bus: EventBus,
        clock: Arc<SessionClock>,
        config: Arc<SessionConfig>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            state,
            bus,
            clock,
            config,
            inbound_tx,
            color_index: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Register a human participant. Validates and caps the display name,
    /// assigns an id and the next palette color, and announces the join.
    pub fn join(&self, name: &str) -> Result<JoinedParticipant, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::NameRequired);
        }
        let name: String = trimmed.chars().take(self.config.name_limit).collect();

        let id = Uuid::new_v4().as_simple().to_string()[..8].to_string();
        let color_slot = self.color_index.fetch_add(1, Ordering::Relaxed);
        let color = USER_COLORS[color_slot % USER_COLORS.len()].to_string();

        let user = HumanParticipant {
            id: id.clone(),
            name: name.clone(),
            color: color.clone(),
            joined: unix_now(),
        };
        self.state.add_user(user);

        let notice = self.state.append(Message::system(
            self.state.topic_num(),
            format!("👋 {name} joined the debate"),
        ));
        self.bus.publish(&AgoraEvent::SystemNotice(notice));
        self.bus.publish(&AgoraEvent::Presence(PresencePayload {
            users: self.state.users(),
            viewers: self.bus.viewers(),
        }));

        info!(%id, %name, "participant joined");
        Ok(JoinedParticipant { id, name, color })
    }

    /// Accept a human message: validate, record, broadcast, and queue for
    /// the engine. The engine may coalesce bursts, but every accepted
    /// message enters the conversation record here.
    pub fn send(
        &self,
        participant_id: &str,
        text: &str,
        msg_id: Option<String>,
    ) -> Result<(), ValidationError> {
        let user = self
            .state
            .user_by_id(participant_id)
            .ok_or(ValidationError::NotJoined)?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        let text: String = trimmed.chars().take(self.config.text_limit).collect();

        let message = self.state.append(Message::human(
            self.state.topic_num(),
            &user,
            text.clone(),
            msg_id,
        ));
        self.bus.publish(&AgoraEvent::UserMsg(message));

        let inbound = InboundMessage {
            user_id: user.id,
            user_name: user.name.clone(),
            color: user.color,
            text,
            time: now_hm(),
        };
        match self.inbound_tx.try_send(inbound) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(user = %user.name, "inbound queue full, message recorded but not queued");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("engine gone, message recorded only");
            }
        }
        Ok(())
    }

    pub fn subscribe(&self) -> EventListener {
        self.bus.subscribe()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot(
            &self.clock,
            self.bus.viewers(),
            self.config.snapshot_messages,
        )
    }

    pub fn time_left(&self) -> Duration {
        self.clock.time_left()
    }

    pub fn viewers(&self) -> usize {
        self.bus.viewers()
    }

    pub fn ping(&self) -> PingPayload {
        PingPayload {
            tl: self.clock.time_left().as_secs(),
            v: self.bus.viewers(),
        }
    }
}
