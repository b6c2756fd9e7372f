//! Tool-call handling for the storefront agent.
//!
//! # Tools
//!
//! | Tool | Effect |
//! |------|--------|
//! | `check_stock` (`check_product_stock`) | catalog lookup, no side effects |
//! | `update_order_ui` | merges fields into the live form |
//! | `submit_report` | merges the report, posts the webhook, creates orders for transactional types |
//! | `close_call` | asks the session to close after its grace delay |
//!
//! Unknown tools answer `{"status":"unknown_tool"}`.

pub mod args;
pub mod catalog;
pub mod dispatcher;
pub mod form;
pub mod schema;
pub mod webhook;

use serde_json::{Value, json};
use thiserror::Error;

pub use args::{CanonicalReport, ReportArgs, ReportType};
pub use catalog::{Catalog, CatalogError, Category, CompanyInfo, Product, StockStatus};
pub use dispatcher::{ReportSummary, ToolContext, ToolDispatcher, ToolNotice};
pub use form::{ContactForm, ConversationState, FormPatch, SharedConversation};
pub use schema::tool_declarations;
pub use webhook::{DEFAULT_WEBHOOK_TIMEOUT, WebhookClient};

/// Tool handler errors. Each one still produces a response to the model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Tool handler failed: {0}")]
    Internal(String),
}

impl ToolError {
    pub(crate) fn invalid(tool: ToolName, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.as_str().to_string(),
            message: message.into(),
        }
    }

    /// Result object sent back to the model in place of a handler result.
    pub fn to_response(&self) -> Value {
        json!({ "status": "error", "message": self.to_string() })
    }
}

/// Tools the dispatcher knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CheckStock,
    UpdateOrderUi,
    SubmitReport,
    CloseCall,
}

impl ToolName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "check_stock" | "check_product_stock" => Some(Self::CheckStock),
            "update_order_ui" => Some(Self::UpdateOrderUi),
            "submit_report" => Some(Self::SubmitReport),
            "close_call" => Some(Self::CloseCall),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckStock => "check_stock",
            Self::UpdateOrderUi => "update_order_ui",
            Self::SubmitReport => "submit_report",
            Self::CloseCall => "close_call",
        }
    }

    pub fn all() -> &'static [ToolName] {
        &[
            Self::CheckStock,
            Self::UpdateOrderUi,
            Self::SubmitReport,
            Self::CloseCall,
        ]
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
