pub mod ingress;
pub mod state;

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::ContentClient;
use crate::bus::EventBus;
use crate::catalog::{PersonaCatalog, TopicCatalog};
use crate::config::SessionConfig;
use crate::engine::Engine;
use crate::engine::history::ConversationLog;
use crate::topics::TopicRotator;

pub use ingress::{InboundMessage, JoinedParticipant, SessionHandle};
pub use state::{HumanParticipant, Message, SessionClock, SharedState, StateSnapshot};

/// One wired-up session: the engine plus the boundary handle that
/// transports clone. Built once at process start; `spawn` moves the engine
/// onto its own task.
pub struct SessionRuntime {
    handle: SessionHandle,
    engine: Engine,
}

impl SessionRuntime {
    pub fn build(
        config: SessionConfig,
        personas: &PersonaCatalog,
        topics: TopicCatalog,
        content: ContentClient,
    ) -> Self {
        let config = Arc::new(config);
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (char_a, char_b) = personas.sample_pair(&mut rng);

        let clock = Arc::new(SessionClock::new(config.max_uptime));
        let state = SharedState::new(char_a.clone(), char_b.clone());
        let bus = EventBus::new(config.bus_capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);

        let handle = SessionHandle::new(
            state.clone(),
            bus.clone(),
            Arc::clone(&clock),
            Arc::clone(&config),
            inbound_tx,
        );

        let log = ConversationLog::new(config.history_window);
        let engine = Engine {
            config,
            clock,
            state,
            bus,
            inbound: inbound_rx,
            content,
            rotator: TopicRotator::new(topics.into_topics()),
            rng,
            personas: [char_a, char_b],
            log,
            turn: 0,
            on_topic: 0,
            per_topic: 0,
            last_speaker: None,
            next_auto: Instant::now(),
        };

        Self { handle, engine }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Start the engine loop on its own task. The returned handle resolves
    /// once the session has emitted its shutdown summary.
    pub fn spawn(self, cancel: CancellationToken) -> (SessionHandle, JoinHandle<()>) {
        let handle = self.handle;
        let join = tokio::spawn(self.engine.run(cancel));
        (handle, join)
    }
}
