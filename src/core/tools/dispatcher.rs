//! Tool-call dispatch.
//!
//! One [`ToolDispatcher`] serves every invocation of a session. Handlers read
//! and write the conversation through [`ToolContext`], which always points at
//! the live container, and report UI-visible effects as [`ToolNotice`]s.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::args::{CanonicalReport, ReportArgs, ReportType};
use super::catalog::Catalog;
use super::form::{ContactForm, FormPatch, SharedConversation};
use super::webhook::WebhookClient;
use super::{ToolError, ToolName};
use crate::core::outcome::{BookingStatus, Order, OrderStatus, OrderStore, unix_millis};

/// Default language recorded on orders.
pub const DEFAULT_LANGUAGE: &str = "mk";

// =============================================================================
// Notices
// =============================================================================

/// Summary shown to the customer once a transactional report is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub order_id: String,
    pub report_type: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub product_name: String,
    pub date: String,
    pub time: String,
}

/// Side effects a handler asks the session to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolNotice {
    /// The visible form changed
    FormUpdated(ContactForm),
    /// A transactional report created an order
    ReportConfirmed(ReportSummary),
    /// The agent asked to end the call
    CloseRequested,
}

/// Per-session handle passed to every handler.
#[derive(Debug, Clone)]
pub struct ToolContext {
    conversation: SharedConversation,
    notices: mpsc::UnboundedSender<ToolNotice>,
    language: String,
}

impl ToolContext {
    pub fn new(conversation: SharedConversation, notices: mpsc::UnboundedSender<ToolNotice>) -> Self {
        Self {
            conversation,
            notices,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn conversation(&self) -> &SharedConversation {
        &self.conversation
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn notify(&self, notice: ToolNotice) {
        if self.notices.send(notice).is_err() {
            debug!("Session gone, tool notice dropped");
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes tool invocations to their handlers.
#[derive(Clone)]
pub struct ToolDispatcher {
    catalog: Arc<Catalog>,
    webhook: Option<WebhookClient>,
    orders: Arc<dyn OrderStore>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("products", &self.catalog.products.len())
            .field("webhook", &self.webhook.as_ref().map(WebhookClient::url))
            .finish()
    }
}

impl ToolDispatcher {
    pub fn new(catalog: Arc<Catalog>, orders: Arc<dyn OrderStore>) -> Self {
        Self {
            catalog,
            webhook: None,
            orders,
        }
    }

    pub fn with_webhook(mut self, webhook: WebhookClient) -> Self {
        self.webhook = Some(webhook);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one invocation and produce its result object.
    pub async fn handle(&self, name: &str, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let Some(tool) = ToolName::parse(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return Ok(json!({ "status": "unknown_tool" }));
        };

        debug!(tool = %tool, "Dispatching tool call");

        match tool {
            ToolName::CheckStock => self.check_stock(&args),
            ToolName::UpdateOrderUi => self.update_order_ui(args, ctx),
            ToolName::SubmitReport => self.submit_report(args, ctx).await,
            ToolName::CloseCall => {
                ctx.notify(ToolNotice::CloseRequested);
                Ok(json!({ "status": "closing" }))
            }
        }
    }

    fn check_stock(&self, args: &Value) -> Result<Value, ToolError> {
        let query = args
            .get("query")
            .and_then(|q| match q {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::invalid(ToolName::CheckStock, "missing `query`"))?;

        let result = self.catalog.check_stock(&query);
        info!(query = %query, found = %result["found"], "Stock lookup");
        Ok(result)
    }

    fn update_order_ui(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        if !args.is_object() {
            return Err(ToolError::invalid(ToolName::UpdateOrderUi, "expected an object"));
        }
        let patch: FormPatch = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid(ToolName::UpdateOrderUi, e.to_string()))?;

        let form = ctx.conversation.update(|state| {
            patch.apply(&mut state.form);
            state.form.clone()
        });

        ctx.notify(ToolNotice::FormUpdated(form));
        Ok(json!({ "status": "form_updated" }))
    }

    async fn submit_report(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        if !args.is_object() {
            return Err(ToolError::invalid(ToolName::SubmitReport, "expected an object"));
        }
        let parsed: ReportArgs = serde_json::from_value(args.clone())
            .map_err(|e| ToolError::invalid(ToolName::SubmitReport, e.to_string()))?;

        let report_type = parsed.report_type();
        if report_type == ReportType::GetProductStock {
            return Ok(self.catalog.check_stock(&parsed.stock_query()));
        }

        // Merge against the live form and commit in one write.
        let report = ctx.conversation.update(|state| {
            let report = CanonicalReport::merge(&parsed, &state.form);
            state.form = report.to_form();
            if report.report_type.is_transactional() {
                state.booking_status = BookingStatus::Confirmed;
            }
            report
        });

        info!(
            report_type = %report.report_type,
            customer = %report.customer_name,
            product = %report.product_name,
            "Report submitted"
        );
        ctx.notify(ToolNotice::FormUpdated(report.to_form()));

        match &self.webhook {
            Some(webhook) => {
                webhook.spawn_delivery(args, report.report_type.to_string());
            }
            None => warn!(report_type = %report.report_type, "No webhook configured, report not delivered"),
        }

        if report.report_type.is_transactional() {
            let order = build_order(&report, ctx.language());
            if let Err(e) = self.orders.save_order(&order).await {
                warn!(order_id = %order.id, error = %e, "Failed to save order");
            }
            ctx.notify(ToolNotice::ReportConfirmed(ReportSummary {
                order_id: order.id,
                report_type: report.report_type.to_string(),
                customer_name: order.customer_name,
                customer_phone: order.customer_phone,
                product_name: order.product_name,
                date: order.date,
                time: order.time,
            }));
        }

        Ok(json!({ "status": "ok" }))
    }
}

fn build_order(report: &CanonicalReport, language: &str) -> Order {
    let now = OffsetDateTime::now_utc();
    let today = now
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default();
    let clock = now
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default();

    Order {
        id: Uuid::new_v4().to_string(),
        customer_name: non_empty_or(&report.customer_name, "Unknown"),
        customer_phone: non_empty_or(&report.customer_phone, "---"),
        product_id: report
            .product_sku
            .clone()
            .unwrap_or_else(|| report.report_type.to_string()),
        product_name: report.product_name.clone(),
        date: report.callback_date.clone().unwrap_or(today),
        time: report.callback_time.clone().unwrap_or(clock),
        status: OrderStatus::Confirmed,
        notes: report.notes.clone(),
        language: language.to_string(),
        created_at: unix_millis(),
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
