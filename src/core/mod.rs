pub mod audio;
pub mod outcome;
pub mod prompt;
pub mod realtime;
pub mod session;
pub mod tools;
pub mod vad;

// Re-export commonly used types for convenience
pub use audio::{AudioBuffer, AudioInput, AudioOutput, WavFileInput, WavRecorderOutput};

pub use realtime::{
    GeminiLive, RealtimeConfig, RealtimeError, RealtimeResult, RealtimeTransport, TransportEvent,
};

pub use session::{
    SessionComponents, SessionConfig, SessionController, SessionEvent, SessionHandle, SessionState,
};

pub use tools::{Catalog, SharedConversation, ToolDispatcher, WebhookClient, tool_declarations};

pub use outcome::{CallLogStore, CallOutcome, JsonLinesStore, MemoryStore, OrderStore};
