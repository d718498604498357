pub mod history;
pub mod pacing;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ContentClient;
use crate::bus::EventBus;
use crate::catalog::Persona;
use crate::config::SessionConfig;
use crate::events::{
    AgoraEvent, InitPayload, MsgDonePayload, MsgStartPayload, ShutdownSummary, SpeakerRef,
    WaitingPayload, WordToken,
};
use crate::session::ingress::InboundMessage;
use crate::session::state::{Message, SessionClock, SharedState, now_hm};
use crate::topics::TopicRotator;
use history::ConversationLog;

/// The single active turn scheduler for one session. Sole consumer of the
/// inbound queue, sole author of turn-derived state mutation and engine
/// events. Runs until the uptime budget or cancellation is reached, checked
/// only between iterations — an in-progress stream is never cut mid-word.
pub struct Engine {
    pub(crate) config: Arc<SessionConfig>,
    pub(crate) clock: Arc<SessionClock>,
    pub(crate) state: SharedState,
    pub(crate) bus: EventBus,
    pub(crate) inbound: mpsc::Receiver<InboundMessage>,
    pub(crate) content: ContentClient,
    pub(crate) rotator: TopicRotator,
    pub(crate) rng: StdRng,
    pub(crate) personas: [Persona; 2],
    pub(crate) log: ConversationLog,
    pub(crate) turn: u64,
    pub(crate) on_topic: u32,
    pub(crate) per_topic: u32,
    pub(crate) last_speaker: Option<usize>,
    pub(crate) next_auto: Instant,
}

impl Engine {
    pub async fn run(mut self, cancel: CancellationToken) {
        self.start();

        loop {
            if cancel.is_cancelled() {
                info!("engine cancelled");
                break;
            }
            if self.clock.time_left() <= self.config.shutdown_margin {
                break;
            }

            if self.on_topic >= self.per_topic {
                self.rotate_topic();
                continue;
            }

            match tokio::time::timeout(self.config.poll_interval, self.inbound.recv()).await {
                Ok(Some(message)) => {
                    self.respond_to_human(message).await;
                    continue;
                }
                Ok(None) => {
                    // All ingress handles dropped; auto turns continue.
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(_) => {}
            }

            if Instant::now() >= self.next_auto {
                self.auto_turn().await;
            }
        }

        self.finish();
    }

    fn start(&mut self) {
        self.per_topic = self.draw_topic_budget();
        let topic = self.rotator.pick(&mut self.rng);
        self.state.set_topic(topic.clone(), 1);

        info!(
            char_a = %self.personas[0].name,
            char_b = %self.personas[1].name,
            topic = %topic,
            budget = self.per_topic,
            "session engine started"
        );

        self.bus.publish(&AgoraEvent::Init(InitPayload {
            char_a: self.personas[0].clone(),
            char_b: self.personas[1].clone(),
            topic: topic.clone(),
            topic_num: 1,
            boot: self.clock.boot_unix(),
            max_up: self.clock.max_uptime().as_secs(),
        }));

        let message = self.state.append(Message::topic(1, topic));
        self.bus.publish(&AgoraEvent::NewTopic(message));

        self.next_auto = Instant::now() + self.config.first_turn_delay;
    }

    /// SELECT_TOPIC: rotate the subject, reset the turn counter, redraw the
    /// budget, and shrink the conversation log to a short carryover window.
    fn rotate_topic(&mut self) {
        let topic = self.rotator.pick(&mut self.rng);
        let number = self.state.topic_num() + 1;
        self.state.set_topic(topic.clone(), number);
        self.on_topic = 0;
        self.per_topic = self.draw_topic_budget();
        self.log.truncate_to(self.config.history_carryover);

        info!(topic = %topic, number, budget = self.per_topic, "topic rotated");

        let message = self.state.append(Message::topic(number, topic));
        self.bus.publish(&AgoraEvent::NewTopic(message));

        self.next_auto = Instant::now() + self.config.post_topic_delay;
    }

    /// RESPOND_TO_HUMAN: absorb the burst, answer only the most recent
    /// message, and hold the next auto turn back so the reply isn't buried.
    async fn respond_to_human(&mut self, first: InboundMessage) {
        tokio::time::sleep(self.settle_delay()).await;

        let mut latest = first;
        while let Ok(message) = self.inbound.try_recv() {
            latest = message;
        }

        // Never the persona that spoke last, when that is known.
        let responder = match self.last_speaker {
            Some(previous) => 1 - previous,
            None => usize::from(self.rng.gen_bool(0.5)),
        };

        let cur = self.personas[responder].clone();
        let other = self.personas[1 - responder].clone();
        let topic = self.state.topic().unwrap_or_default();
        let context = self.state.recent_context(8, 5).join("\n");

        let system = prompt::reply_system(&cur, &other, &topic);
        let instruction = prompt::human_reply_instruction(&topic, &context, &latest.user_name);

        debug!(responder = %cur.name, to = %latest.user_name, "responding to human");
        self.begin_typing(&cur);

        let history = self.log.view_for(responder);
        match self.content.generate(&system, &history, &instruction).await {
            Ok(text) => {
                self.stream_utterance(responder, text).await;
                self.on_topic += 1;
            }
            Err(error) => {
                warn!(%error, "content source failed for human response, turn skipped");
                self.state.set_typing(None);
            }
        }

        self.next_auto = Instant::now() + self.config.human_cooldown;
    }

    /// AUTO_TURN: deterministic alternation by turn index; the opening
    /// instruction for a fresh topic, a random rhetorical directive after.
    async fn auto_turn(&mut self) {
        let speaker = (self.turn % 2) as usize;
        let cur = self.personas[speaker].clone();
        let other = self.personas[1 - speaker].clone();
        let topic = self.state.topic().unwrap_or_default();
        let humans_present = self.state.user_count() > 0;

        let system = prompt::debate_system(&cur, &other, &topic, humans_present, self.on_topic + 1);
        let instruction = if self.on_topic == 0 {
            prompt::opening_instruction(&topic)
        } else {
            let last = self.state.last_text_by(&other.name).unwrap_or_default();
            let pick = self.rng.gen_range(0..prompt::DIRECTIVE_COUNT);
            let mut instruction = prompt::directive_instruction(&topic, &other.name, &last, pick);
            if let Some((user_name, text)) = self.state.recent_human(6) {
                if self.rng.gen_bool(0.3) {
                    instruction.push_str(&prompt::human_reference_note(&user_name, &text));
                }
            }
            instruction
        };

        self.begin_typing(&cur);

        let history = self.log.view_for(speaker);
        let gap = match self.content.generate(&system, &history, &instruction).await {
            Ok(text) => {
                self.stream_utterance(speaker, text).await;
                self.on_topic += 1;
                self.turn += 1;
                self.config.ai_gap
            }
            Err(error) => {
                warn!(%error, speaker = %cur.name, "content source failed, retrying turn after backoff");
                self.state.set_typing(None);
                self.config.content_backoff
            }
        };

        let next = &self.personas[(self.turn % 2) as usize];
        self.bus.publish(&AgoraEvent::Waiting(WaitingPayload {
            name: next.name.clone(),
            avatar: next.avatar.clone(),
            color: next.color.clone(),
            gap: gap.as_secs(),
            timeleft: self.clock.time_left().as_secs(),
        }));
        self.next_auto = Instant::now() + gap;
    }

    /// STREAM: word-by-word emission at a pace fit to the display budget.
    /// The message is appended to state only after the final word, so
    /// snapshots never show a half-streamed utterance.
    async fn stream_utterance(&mut self, speaker: usize, text: String) {
        let cur = &self.personas[speaker];
        let words: Vec<&str> = text.split_whitespace().collect();
        let total = words.len();
        let delay = pacing::word_delay(
            total,
            self.config.stream_budget,
            self.config.min_word_delay,
            self.config.max_word_delay,
        );

        self.bus.publish(&AgoraEvent::MsgStart(MsgStartPayload {
            speaker: cur.name.clone(),
            avatar: cur.avatar.clone(),
            color: cur.color.clone(),
            role: cur.role.clone(),
            time: now_hm(),
        }));

        for (i, word) in words.iter().enumerate() {
            self.bus.publish(&AgoraEvent::Word(WordToken {
                w: (*word).to_string(),
                i,
                of: total,
            }));
            tokio::time::sleep(delay).await;
        }

        let message = self
            .state
            .append(Message::ai(self.state.topic_num(), cur, text.clone()));
        self.state.set_typing(None);
        self.log.push(speaker, text.clone());
        self.last_speaker = Some(speaker);

        self.bus.publish(&AgoraEvent::MsgDone(MsgDonePayload {
            speaker: cur.name.clone(),
            text,
            time: now_hm(),
        }));

        debug!(speaker = %cur.name, words = total, seq = message.seq(), "utterance streamed");
    }

    /// SHUTDOWN: final summary, then the loop exits.
    fn finish(&mut self) {
        let counts = self.state.counts();
        self.bus.publish(&AgoraEvent::Shutdown(ShutdownSummary {
            total_msgs: counts.ai,
            user_msgs: counts.human,
            total_topics: counts.topics,
            users: counts.users,
        }));
        info!(
            ai_messages = counts.ai,
            user_messages = counts.human,
            topics = counts.topics,
            participants = counts.users,
            "session complete"
        );
    }

    fn begin_typing(&self, cur: &Persona) {
        self.state.set_typing(Some(cur.name.clone()));
        self.bus
            .publish(&AgoraEvent::Typing(SpeakerRef::from_persona(cur)));
    }

    fn draw_topic_budget(&mut self) -> u32 {
        self.rng
            .gen_range(self.config.min_per_topic..=self.config.max_per_topic)
    }

    fn settle_delay(&mut self) -> Duration {
        let span = self
            .config
            .settle_max
            .saturating_sub(self.config.settle_min)
            .as_millis() as u64;
        let extra = if span == 0 {
            0
        } else {
            self.rng.gen_range(0..=span)
        };
        self.config.settle_min + Duration::from_millis(extra)
    }
}
