//! JSON parsing helpers for AI backend responses
//!
//! Models often wrap the JSON payload in prose or code fences, so the
//! object between the first `{` and the last `}` is what gets parsed.

use serde_json::Value;

use crate::error::{Error, Result};

use super::types::{ExpenseClassification, InsightReply};

/// Parse `{"amount": number, "category": string}` out of a model reply
///
/// `amount` may be missing, null, or a numeric string.
pub fn parse_expense_classification(response: &str) -> Result<ExpenseClassification> {
    let value: Value = extract_json(response)?;

    let category = value
        .get("category")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            Error::InvalidData(format!(
                "No category in AI response | Raw: {}",
                truncate(response)
            ))
        })?
        .to_string();

    let amount = match value.get("amount") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(ExpenseClassification { amount, category })
}

/// Parse `{"reply": string}` out of an insight endpoint response
pub fn parse_insight_reply(response: &str) -> Result<String> {
    let reply: InsightReply = serde_json::from_value(extract_json(response)?)
        .map_err(|e| Error::InvalidData(format!("Invalid insight JSON from AI: {}", e)))?;
    let text = reply.reply.trim();
    if text.is_empty() {
        return Err(Error::InvalidData("Empty insight reply".into()));
    }
    Ok(text.to_string())
}

fn extract_json(response: &str) -> Result<Value> {
    let response = response.trim();
    match (response.find('{'), response.rfind('}')) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::InvalidData(format!(
                    "Invalid JSON from AI: {} | Raw: {}",
                    e,
                    truncate(json_str)
                ))
            })
        }
        _ => Err(Error::InvalidData(format!(
            "No JSON found in AI response | Raw: {}",
            truncate(response)
        ))),
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let c = parse_expense_classification(r#"{"amount": 450, "category": "Food"}"#).unwrap();
        assert_eq!(c.category, "Food");
        assert_eq!(c.amount, Some(450.0));
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let raw = "Sure! Here you go:\n```json\n{\"amount\": \"1,200.50\", \"category\": \" shopping \"}\n```";
        let c = parse_expense_classification(raw).unwrap();
        assert_eq!(c.category, "shopping");
        assert_eq!(c.amount, Some(1200.5));
    }

    #[test]
    fn test_parse_missing_amount() {
        let c = parse_expense_classification(r#"{"category": "Bills"}"#).unwrap();
        assert_eq!(c.amount, None);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_expense_classification("Food"),
            Err(Error::InvalidData(_))
        ));
        assert!(parse_expense_classification("{not json}").is_err());
        assert!(parse_expense_classification(r#"{"amount": 5}"#).is_err());
    }

    #[test]
    fn test_parse_insight_reply() {
        assert_eq!(
            parse_insight_reply(r#"{"reply": " Cut food delivery. "}"#).unwrap(),
            "Cut food delivery."
        );
        assert!(parse_insight_reply(r#"{"reply": ""}"#).is_err());
        assert!(parse_insight_reply("<html>502</html>").is_err());
    }

    #[test]
    fn test_amount_decimal() {
        let c = ExpenseClassification {
            amount: Some(99.999),
            category: "Food".into(),
        };
        assert_eq!(c.amount_decimal(), Some(rust_decimal::Decimal::from(100)));

        let negative = ExpenseClassification {
            amount: Some(-5.0),
            category: "Food".into(),
        };
        assert_eq!(negative.amount_decimal(), None);
    }
}
