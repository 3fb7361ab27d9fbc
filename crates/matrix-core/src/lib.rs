pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod push;
pub mod rain;
pub mod reveal;
pub mod schedule;
pub mod socketio;
pub mod state;

// Re-export main types for convenience
pub use api::{Backend, ChatReply, MatrixClient};
pub use chat::{ChatWidget, DisplayEntry, WidgetSettings};
pub use config::{Config, RainConfig};
pub use error::{ApiError, CodecError, PushError};
pub use events::{PushEvent, WidgetEvent};
pub use rain::{RainAnimator, RainCanvas, RainCell, RainSurface, SurfaceSize};
pub use reveal::Reveal;
pub use schedule::ScheduledTask;
pub use state::{Author, ConversationEntry, InteractionState};
