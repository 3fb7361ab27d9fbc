//! The chat widget: conversation log plus the listening/speaking flags.
//!
//! All network work is spawned onto the tokio runtime and reports back as a
//! [`WidgetEvent`] on the channel handed to [`ChatWidget::new`]. The owner
//! drains that channel (together with push events) into
//! [`ChatWidget::handle`], so every mutation happens on one task, in order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::api::Backend;
use crate::config::Config;
use crate::events::{PushEvent, WidgetEvent};
use crate::reveal::Reveal;
use crate::state::{Author, ConversationEntry, InteractionState};

pub const WELCOME_MESSAGE: &str = "Greetings Neo, welcome to the Matrix. I am your digital assistant. How may I guide you through the code streams today?";
pub const AVATAR_GREETING: &str = "Matrix AI interface activated. How may I assist you, Neo?";
/// Shown when the service answers a chat request with a non-success status
pub const REQUEST_FAILED_TEXT: &str = "Error processing request";
/// Shown when a chat request never got a usable answer
pub const CONNECTION_ERROR_TEXT: &str = "Connection error";

const STATUS_RESPONDING: &str = "Matrix AI is responding...";
const STATUS_READY: &str = "Ready to assist you, Neo";
const STATUS_LISTENING: &str = "Listening for your command...";
const STATUS_PROCESSING: &str = "Processing your request...";

/// Timing knobs for the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSettings {
    pub reply_settle: Duration,
    pub reveal_interval: Duration,
    pub welcome_reveal_interval: Duration,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self::from(&Config::new())
    }
}

impl From<&Config> for WidgetSettings {
    fn from(config: &Config) -> Self {
        Self {
            reply_settle: config.reply_settle(),
            reveal_interval: config.reveal_interval(),
            welcome_reveal_interval: config.welcome_reveal_interval(),
        }
    }
}

/// A log entry together with its reveal progress.
#[derive(Debug, Clone)]
pub struct DisplayEntry {
    pub entry: ConversationEntry,
    pub reveal: Reveal,
}

pub struct ChatWidget<B: Backend> {
    backend: Arc<B>,
    events: UnboundedSender<WidgetEvent>,
    settings: WidgetSettings,
    log: Vec<DisplayEntry>,
    state: InteractionState,
    agent_status: &'static str,
    welcome: Reveal,
}

impl<B: Backend> ChatWidget<B> {
    pub fn new(backend: Arc<B>, events: UnboundedSender<WidgetEvent>, settings: WidgetSettings) -> Self {
        Self {
            backend,
            events,
            settings,
            log: Vec::new(),
            state: InteractionState::default(),
            agent_status: STATUS_READY,
            welcome: Reveal::new(WELCOME_MESSAGE, settings.welcome_reveal_interval),
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.log.iter().map(|d| &d.entry)
    }

    pub fn display_entries(&self) -> &[DisplayEntry] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Human-readable agent status, without the `Agent:` prefix.
    pub fn agent_status(&self) -> &str {
        self.agent_status
    }

    pub fn welcome(&self) -> &Reveal {
        &self.welcome
    }

    /// Send a message to the assistant.
    ///
    /// Whitespace-only input is ignored and `false` is returned. Otherwise the
    /// user entry is in the log before this returns, and the request runs in
    /// the background. The reply itself comes back as a
    /// [`PushEvent::NewMessage`].
    pub fn send_message(&mut self, text: &str) -> bool {
        let message = text.trim();
        if message.is_empty() {
            return false;
        }

        self.append(ConversationEntry::user(message));
        self.set_speaking(true);

        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            let result = backend.chat(&message).await;
            let _ = tx.send(WidgetEvent::ChatCompleted(result));
        });
        true
    }

    /// Start listening if idle, stop if listening. The flag only changes once
    /// the service confirms; failures are logged and otherwise invisible.
    pub fn toggle_voice(&mut self) {
        let start = !self.state.listening;
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = if start {
                backend.voice_start().await
            } else {
                backend.voice_stop().await
            };
            let _ = tx.send(WidgetEvent::VoiceToggled { start, result });
        });
    }

    /// Greet the user when the avatar is activated while nothing is going on.
    pub fn activate_avatar(&mut self) -> bool {
        if !self.state.is_idle() {
            return false;
        }
        self.append(ConversationEntry::assistant(AVATAR_GREETING));
        true
    }

    /// Fetch the service status for the diagnostic log.
    pub fn check_status(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = backend.status().await;
            let _ = tx.send(WidgetEvent::StatusChecked(result));
        });
    }

    /// Reconcile with the server's view of the voice pipeline. Always wins
    /// over whatever was set locally.
    pub fn on_push_status(&mut self, status: &str) {
        match status {
            "listening" => {
                self.set_speaking(false);
                self.set_listening(true);
                self.agent_status = STATUS_LISTENING;
            }
            "processing" => {
                self.set_listening(false);
                self.set_speaking(true);
            }
            _ => {
                self.set_listening(false);
                self.set_speaking(false);
            }
        }
    }

    pub fn on_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Connected => info!("connected to Matrix AI server"),
            PushEvent::NewMessage { assistant_response } => {
                self.append(ConversationEntry::assistant(assistant_response));
            }
            PushEvent::VoiceStatus { status } => self.on_push_status(&status),
            PushEvent::Status(status) => info!(%status, "server status"),
            PushEvent::Disconnected => warn!("push channel disconnected"),
        }
    }

    pub fn handle(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Push(push) => self.on_push(push),
            WidgetEvent::ChatCompleted(Ok(reply)) if reply.is_success() => {
                // Leave room for the pushed reply before dropping the flag.
                let tx = self.events.clone();
                let delay = self.settings.reply_settle;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(WidgetEvent::ReplySettled);
                });
            }
            WidgetEvent::ChatCompleted(Ok(reply)) => {
                warn!(status = %reply.status, "chat request rejected");
                self.append(ConversationEntry::assistant(REQUEST_FAILED_TEXT));
                self.set_speaking(false);
            }
            WidgetEvent::ChatCompleted(Err(e)) => {
                warn!(error = %e, "error sending message");
                self.append(ConversationEntry::assistant(CONNECTION_ERROR_TEXT));
                self.set_speaking(false);
            }
            WidgetEvent::ReplySettled => self.set_speaking(false),
            WidgetEvent::VoiceToggled { start, result: Ok(()) } => {
                self.set_listening(start);
                self.agent_status = if start { STATUS_LISTENING } else { STATUS_PROCESSING };
            }
            WidgetEvent::VoiceToggled { start, result: Err(e) } => {
                let action = if start { "starting" } else { "stopping" };
                warn!(error = %e, "error {} voice", action);
            }
            WidgetEvent::StatusChecked(Ok(status)) => info!(%status, "system status"),
            WidgetEvent::StatusChecked(Err(e)) => warn!(error = %e, "error checking status"),
        }
    }

    fn append(&mut self, entry: ConversationEntry) {
        let reveal = match entry.author {
            Author::User => Reveal::instant(entry.text.clone()),
            Author::Assistant => Reveal::new(entry.text.clone(), self.settings.reveal_interval),
        };
        debug!(author = ?entry.author, chars = entry.text.chars().count(), "log entry");
        self.log.push(DisplayEntry { entry, reveal });
    }

    fn set_listening(&mut self, listening: bool) {
        self.state.listening = listening;
    }

    fn set_speaking(&mut self, speaking: bool) {
        self.state.speaking = speaking;
        self.agent_status = if speaking { STATUS_RESPONDING } else { STATUS_READY };
    }
}
