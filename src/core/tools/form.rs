//! Live conversation state shared between the tool dispatcher, the session
//! and UI consumers.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::args::lenient_string;
use crate::core::outcome::BookingStatus;

/// The contact form mirrored on the customer's screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    /// Product name or subject of the inquiry
    pub subject: String,
    /// Notes, address or message content
    pub notes: String,
}

impl ContactForm {
    /// Enough details for the customer to confirm the request manually.
    pub fn is_confirmable(&self) -> bool {
        self.name.trim().chars().count() > 2 && self.phone.trim().chars().count() > 5
    }
}

/// Partial form update from `update_order_ui`.
///
/// Accepts both the form's own field names and the names used in the tool
/// declaration (`serviceName`, `comments`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormPatch {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub subject: Option<String>,
    #[serde(rename = "serviceName", deserialize_with = "lenient_string")]
    pub service_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub notes: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub comments: Option<String>,
}

impl FormPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge provided fields into `form`; absent fields keep their value.
    pub fn apply(self, form: &mut ContactForm) {
        if let Some(name) = self.name {
            form.name = name;
        }
        if let Some(phone) = self.phone {
            form.phone = phone;
        }
        if let Some(email) = self.email {
            form.email = email;
        }
        if let Some(subject) = self.subject.or(self.service_name) {
            form.subject = subject;
        }
        if let Some(notes) = self.notes.or(self.comments) {
            form.notes = notes;
        }
    }
}

/// Form contents plus booking status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub form: ContactForm,
    pub booking_status: BookingStatus,
}

/// Shared live container for [`ConversationState`].
///
/// Readers always see the latest committed state; writers get a single
/// read-modify-write under one lock.
#[derive(Debug, Clone, Default)]
pub struct SharedConversation {
    inner: Arc<RwLock<ConversationState>>,
}

impl SharedConversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.inner.read().clone()
    }

    pub fn form(&self) -> ContactForm {
        self.inner.read().form.clone()
    }

    pub fn booking_status(&self) -> BookingStatus {
        self.inner.read().booking_status
    }

    /// Atomically mutate the state and return what the closure returns.
    pub fn update<R>(&self, f: impl FnOnce(&mut ConversationState) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Clear form and booking status for a new call.
    pub fn reset(&self) {
        *self.inner.write() = ConversationState::default();
    }
}
