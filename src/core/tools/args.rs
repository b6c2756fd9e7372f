//! Argument normalization for tool invocations.
//!
//! The remote model is inconsistent about argument shapes: contact details
//! arrive nested (`contact.name`) or flat (`customer_name`), numbers arrive as
//! numbers or strings, and optional fields may be missing or null. Everything
//! is normalized here, once, into [`CanonicalReport`].

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::form::ContactForm;

/// Accept strings, numbers and booleans as text; treat anything else as absent.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Deserialize a nested object, treating malformed values as absent.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

/// Nested value, then flat values in order, then the live value.
fn pick<'a>(nested: Option<&'a str>, flat: &[Option<&'a str>], live: &'a str) -> String {
    let mut candidates = vec![nested];
    candidates.extend_from_slice(flat);
    candidates.push(Some(live));
    first_present(candidates).unwrap_or_default().to_string()
}

/// First non-blank value.
fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
}

// =============================================================================
// Report Types
// =============================================================================

/// `submit_report.report_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportType {
    ProductInquiry,
    StockCheck,
    WaitlistRequest,
    WaitlistAdd,
    SpecialRequest,
    CallSummary,
    GetProductStock,
    Other(String),
}

impl ReportType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "PRODUCT_INQUIRY" => Self::ProductInquiry,
            "STOCK_CHECK" => Self::StockCheck,
            "WAITLIST_REQUEST" => Self::WaitlistRequest,
            "WAITLIST_ADD" => Self::WaitlistAdd,
            "SPECIAL_REQUEST" => Self::SpecialRequest,
            "CALL_SUMMARY" => Self::CallSummary,
            "GET_PRODUCT_STOCK" => Self::GetProductStock,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ProductInquiry => "PRODUCT_INQUIRY",
            Self::StockCheck => "STOCK_CHECK",
            Self::WaitlistRequest => "WAITLIST_REQUEST",
            Self::WaitlistAdd => "WAITLIST_ADD",
            Self::SpecialRequest => "SPECIAL_REQUEST",
            Self::CallSummary => "CALL_SUMMARY",
            Self::GetProductStock => "GET_PRODUCT_STOCK",
            Self::Other(raw) => raw,
        }
    }

    /// Reports that create an order and confirm the booking.
    pub fn is_transactional(&self) -> bool {
        matches!(
            self,
            Self::WaitlistAdd | Self::WaitlistRequest | Self::SpecialRequest
        )
    }

    /// Values advertised in the tool declaration.
    pub fn declared() -> &'static [&'static str] {
        &[
            "PRODUCT_INQUIRY",
            "STOCK_CHECK",
            "WAITLIST_REQUEST",
            "WAITLIST_ADD",
            "SPECIAL_REQUEST",
            "CALL_SUMMARY",
        ]
    }
}

impl Serialize for ReportType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Raw Arguments
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactArgs {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductArgs {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sku: Option<String>,
}

/// `submit_report` arguments as sent by the model. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportArgs {
    #[serde(deserialize_with = "lenient_string")]
    pub report_type: Option<String>,
    #[serde(deserialize_with = "lenient_object")]
    pub contact: Option<ContactArgs>,
    #[serde(deserialize_with = "lenient_object")]
    pub product: Option<ProductArgs>,
    #[serde(deserialize_with = "lenient_string")]
    pub customer_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub customer_phone: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub customer_email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub product_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub product_sku: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub notes: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub query: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub callback_date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub callback_time: Option<String>,
}

impl ReportArgs {
    pub fn report_type(&self) -> ReportType {
        ReportType::parse(self.report_type.as_deref().unwrap_or_default())
    }

    /// Search text for a `GET_PRODUCT_STOCK` report.
    pub fn stock_query(&self) -> String {
        let nested = self.product.as_ref();
        first_present([
            nested.and_then(|p| p.name.as_deref()),
            self.product_name.as_deref(),
            self.query.as_deref(),
            nested.and_then(|p| p.sku.as_deref()),
            self.product_sku.as_deref(),
        ])
        .unwrap_or_default()
        .to_string()
    }
}

// =============================================================================
// Canonical Report
// =============================================================================

/// A report with every field resolved.
///
/// Per field: nested value, then flat value, then the live form. The subject
/// falls back to the report type; notes default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalReport {
    pub report_type: ReportType,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub notes: String,
    pub callback_date: Option<String>,
    pub callback_time: Option<String>,
}

impl CanonicalReport {
    pub fn merge(args: &ReportArgs, form: &ContactForm) -> Self {
        let contact = args.contact.as_ref();
        let product = args.product.as_ref();
        let report_type = args.report_type();

        let customer_name = pick(
            contact.and_then(|c| c.name.as_deref()),
            &[args.customer_name.as_deref()],
            &form.name,
        );
        let customer_phone = pick(
            contact.and_then(|c| c.phone.as_deref()),
            &[args.phone.as_deref(), args.customer_phone.as_deref()],
            &form.phone,
        );
        let customer_email = pick(
            contact.and_then(|c| c.email.as_deref()),
            &[args.email.as_deref(), args.customer_email.as_deref()],
            &form.email,
        );
        let product_name = pick(
            product.and_then(|p| p.name.as_deref()),
            &[args.product_name.as_deref(), Some(form.subject.as_str())],
            report_type.as_str(),
        );
        let product_sku = first_present([
            product.and_then(|p| p.sku.as_deref()),
            args.product_sku.as_deref(),
        ])
        .map(str::to_string);

        Self {
            customer_name,
            customer_phone,
            customer_email,
            product_name,
            product_sku,
            notes: args.notes.clone().unwrap_or_default(),
            callback_date: first_present([args.callback_date.as_deref()]).map(str::to_string),
            callback_time: first_present([args.callback_time.as_deref()]).map(str::to_string),
            report_type,
        }
    }

    /// The form as it should look after this report.
    pub fn to_form(&self) -> ContactForm {
        ContactForm {
            name: self.customer_name.clone(),
            phone: self.customer_phone.clone(),
            email: self.customer_email.clone(),
            subject: self.product_name.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ReportArgs {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_report_type_parse() {
        assert_eq!(ReportType::parse("WAITLIST_ADD"), ReportType::WaitlistAdd);
        assert_eq!(ReportType::parse(" special_request "), ReportType::SpecialRequest);
        assert_eq!(
            ReportType::parse("ORDER_CREATE"),
            ReportType::Other("ORDER_CREATE".into())
        );
        assert!(ReportType::WaitlistRequest.is_transactional());
        assert!(!ReportType::CallSummary.is_transactional());
        assert!(!ReportType::Other("X".into()).is_transactional());
    }

    #[test]
    fn test_nested_contact_wins() {
        let report = CanonicalReport::merge(
            &args(json!({
                "report_type": "WAITLIST_ADD",
                "contact": { "name": "Ivan", "phone": "070123456" },
                "customer_name": "Someone Else",
                "product": { "sku": "AC-M5S", "name": "Anycubic Photon Mono M5S" }
            })),
            &ContactForm::default(),
        );
        assert_eq!(report.customer_name, "Ivan");
        assert_eq!(report.customer_phone, "070123456");
        assert_eq!(report.product_name, "Anycubic Photon Mono M5S");
        assert_eq!(report.product_sku.as_deref(), Some("AC-M5S"));
        assert_eq!(report.notes, "");
    }

    #[test]
    fn test_flat_then_live_form() {
        let form = ContactForm {
            name: "Marko".into(),
            phone: "+38970999888".into(),
            email: "marko@example.com".into(),
            ..Default::default()
        };
        let report = CanonicalReport::merge(
            &args(json!({
                "report_type": "SPECIAL_REQUEST",
                "customer_name": "",
                "email": "m@3dhub.mk",
                "phone": 38970111222u64,
                "notes": "Bulk pricing request"
            })),
            &form,
        );
        assert_eq!(report.customer_name, "Marko");
        assert_eq!(report.customer_phone, "38970111222");
        assert_eq!(report.customer_email, "m@3dhub.mk");
        assert_eq!(report.product_name, "SPECIAL_REQUEST");
        assert_eq!(report.notes, "Bulk pricing request");
    }

    #[test]
    fn test_subject_falls_back_to_live_form_before_type() {
        let form = ContactForm {
            subject: "Bambu PETG HF 1kg".into(),
            ..Default::default()
        };
        let report = CanonicalReport::merge(&args(json!({ "report_type": "CALL_SUMMARY" })), &form);
        assert_eq!(report.product_name, "Bambu PETG HF 1kg");
    }

    #[test]
    fn test_malformed_nested_objects_ignored() {
        let parsed = args(json!({ "contact": "Ivan", "product": ["x"], "report_type": 5 }));
        assert!(parsed.contact.is_none());
        assert!(parsed.product.is_none());
        assert_eq!(parsed.report_type(), ReportType::Other("5".into()));
    }

    #[test]
    fn test_stock_query_sources() {
        assert_eq!(
            args(json!({ "product": { "name": "P1S" }, "query": "other" })).stock_query(),
            "P1S"
        );
        assert_eq!(args(json!({ "query": "resin" })).stock_query(), "resin");
        assert_eq!(args(json!({})).stock_query(), "");
    }

    #[test]
    fn test_to_form() {
        let report = CanonicalReport::merge(
            &args(json!({ "customer_name": "Ana", "product_name": "Bambu Lab A1 Mini Combo" })),
            &ContactForm::default(),
        );
        let form = report.to_form();
        assert_eq!(form.name, "Ana");
        assert_eq!(form.subject, "Bambu Lab A1 Mini Combo");
    }
}
