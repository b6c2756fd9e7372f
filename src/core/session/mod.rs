//! Realtime session control: lifecycle, barge-in, playback scheduling, the
//! silence watchdog and tool-call mediation.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_voice::core::session::{SessionComponents, SessionConfig, SessionController};
//!
//! let (controller, mut events) = SessionController::new(SessionConfig::default(), realtime, components);
//! let handle = controller.handle();
//! let session = controller.spawn();
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! let outcome = session.await??;
//! ```

pub mod config;
pub mod controller;
pub mod events;
pub mod handle;
pub mod playback;
pub mod state;
pub mod watchdog;

pub use config::{
    DEFAULT_ACTIVITY_THRESHOLD, DEFAULT_CLOSE_GRACE, DEFAULT_TOOL_DRAIN_TIMEOUT, SessionConfig,
};
pub use controller::{SessionComponents, SessionController, confirm_request_text};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use playback::{PlaybackScheduler, TurnTicket};
pub use state::SessionState;
pub use watchdog::{DEFAULT_SILENCE_TIMEOUT, DEFAULT_WATCHDOG_INTERVAL, SilenceWatchdog, nudge_text};
