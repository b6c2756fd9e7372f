//! Tool declarations advertised to the realtime model at setup.

use serde_json::{Value, json};

use super::ToolName;
use super::args::ReportType;
use crate::core::realtime::ToolDefinition;

fn string_field(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

fn check_stock() -> ToolDefinition {
    ToolDefinition::function(
        ToolName::CheckStock.as_str(),
        "Check the stock status and price of a product in the inventory.",
        json!({
            "type": "OBJECT",
            "properties": {
                "query": string_field("Name, brand or SKU of the product to check"),
            },
            "required": ["query"],
        }),
    )
}

fn update_order_ui() -> ToolDefinition {
    ToolDefinition::function(
        ToolName::UpdateOrderUi.as_str(),
        "Update the fields on the visible customer form whenever the user provides a name, \
         contact details or the product they are asking about. Call it incrementally.",
        json!({
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "phone": { "type": "STRING" },
                "email": { "type": "STRING" },
                "serviceName": string_field("Product name or subject of inquiry"),
                "comments": string_field("Notes, address or message content"),
            },
        }),
    )
}

fn submit_report() -> ToolDefinition {
    let contact = json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "phone": { "type": "STRING" },
            "email": { "type": "STRING" },
        },
    });
    let product = json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "sku": { "type": "STRING" },
        },
    });

    ToolDefinition::function(
        ToolName::SubmitReport.as_str(),
        "Submit a structured report to the backend. Contact details may be sent nested under \
         `contact` or as flat fields.",
        json!({
            "type": "OBJECT",
            "properties": {
                "report_type": {
                    "type": "STRING",
                    "enum": ReportType::declared(),
                },
                "contact": contact,
                "product": product,
                "customer_name": { "type": "STRING" },
                "phone": { "type": "STRING" },
                "email": { "type": "STRING" },
                "product_name": { "type": "STRING" },
                "product_sku": { "type": "STRING" },
                "notes": { "type": "STRING" },
                "callback_date": string_field("Preferred callback date, YYYY-MM-DD"),
                "callback_time": string_field("Preferred callback time, HH:MM"),
            },
            "required": ["report_type"],
        }),
    )
}

fn close_call() -> ToolDefinition {
    ToolDefinition::function(
        ToolName::CloseCall.as_str(),
        "End the call. Use only when the user has no more questions or after sending \
         CALL_SUMMARY.",
        json!({ "type": "OBJECT", "properties": {} }),
    )
}

/// Every tool the dispatcher answers, in declaration order.
pub fn tool_declarations() -> Vec<ToolDefinition> {
    vec![check_stock(), update_order_ui(), submit_report(), close_call()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_tool_names() {
        let names: Vec<String> = tool_declarations()
            .into_iter()
            .map(|t| t.function.name)
            .collect();
        assert_eq!(
            names,
            vec!["check_stock", "update_order_ui", "submit_report", "close_call"]
        );
    }

    #[test]
    fn test_submit_report_enum_matches_report_types() {
        let declaration = submit_report();
        let params = declaration.function.parameters.unwrap();
        let values = params["properties"]["report_type"]["enum"].as_array().unwrap();

        assert!(values.iter().any(|v| v == "WAITLIST_ADD"));
        assert!(values.iter().any(|v| v == "CALL_SUMMARY"));
        for value in values {
            let parsed = ReportType::parse(value.as_str().unwrap());
            assert!(!matches!(parsed, ReportType::Other(_)));
        }
    }

    #[test]
    fn test_declarations_are_functions() {
        for tool in tool_declarations() {
            assert_eq!(tool.tool_type, "function");
            assert!(tool.function.description.is_some());
        }
    }
}
