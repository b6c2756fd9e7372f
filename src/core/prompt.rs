//! System instruction for the storefront agent.

use time::Date;
use time::macros::format_description;

use crate::core::tools::{Catalog, ReportType};

/// Default persona name.
pub const DEFAULT_AGENT_NAME: &str = "Ema";

/// Inputs to the system instruction.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub agent_name: &'a str,
    pub catalog: &'a Catalog,
    pub today: Date,
}

impl<'a> PromptContext<'a> {
    pub fn new(agent_name: &'a str, catalog: &'a Catalog, today: Date) -> Self {
        Self {
            agent_name,
            catalog,
            today,
        }
    }

    /// Assemble the instruction. The catalog is embedded as pretty JSON so
    /// the agent answers strictly from it.
    pub fn build(&self) -> Result<String, serde_json::Error> {
        let knowledge = serde_json::to_string_pretty(self.catalog)?;
        let company = if self.catalog.company.name.is_empty() {
            "the store"
        } else {
            self.catalog.company.name.as_str()
        };
        let currency = self.catalog.company.currency.as_deref().unwrap_or("MKD");
        let iso_date = self
            .today
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_default();
        let report_types = ReportType::declared()
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!(
            "ROLE & IDENTITY
You are {agent}, the conversational voice agent for {company}.
You are an expert in 3D printing technologies, materials and technical support.

LANGUAGE PROTOCOL
Speak Macedonian by default. Switch to English or Albanian only if the user speaks them or asks to switch.

KNOWLEDGE BASE
Answer strictly from the following JSON. Do not invent products or policies.

{knowledge}

OPERATIONAL DETAILS
- Today is {weekday}, {iso_date}.
- Prices are in {currency}.
- Use `check_stock` before quoting availability or price.

FORM RULES
1. The user sees a contact form on screen.
2. Collect name, phone, email, the product or subject, and notes. Name and phone are mandatory.
3. Call `update_order_ui` incrementally as you learn each field.
4. Ask the user to confirm what is on screen.
5. Only after an explicit confirmation, call `submit_report`.

REPORTS
Send a report with `submit_report` whenever a product is discussed, stock is requested, a waitlist or special request is made, and once at the end of the call (CALL_SUMMARY).
Allowed report_type values:
{report_types}

ENDING THE CALL
After the CALL_SUMMARY report, or when the user has no more questions, say goodbye and call `close_call`.
",
            agent = self.agent_name,
            weekday = self.today.weekday(),
        ))
    }
}
