//! Response interpretation: prefer the declared structure, fall back to text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification label assigned to a user message by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventCode {
    SearchDelivery,
    SearchDriver,
    InsertDelivery,
    GeneralResponse,
    /// Anything else the model came up with. Routed like `general_response`.
    Other(String),
}

impl EventCode {
    pub const KNOWN: [EventCode; 4] = [
        EventCode::SearchDelivery,
        EventCode::SearchDriver,
        EventCode::InsertDelivery,
        EventCode::GeneralResponse,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventCode::SearchDelivery => "search_delivery",
            EventCode::SearchDriver => "search_driver",
            EventCode::InsertDelivery => "insert_delivery",
            EventCode::GeneralResponse => "general_response",
            EventCode::Other(s) => s,
        }
    }
}

impl From<String> for EventCode {
    fn from(s: String) -> Self {
        match s.trim() {
            "search_delivery" => EventCode::SearchDelivery,
            "search_driver" => EventCode::SearchDriver,
            "insert_delivery" => EventCode::InsertDelivery,
            "general_response" => EventCode::GeneralResponse,
            _ => EventCode::Other(s),
        }
    }
}

impl From<EventCode> for String {
    fn from(c: EventCode) -> Self {
        c.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub code: EventCode,
    /// Free-form identifier echoed by the model (string, number or null).
    #[serde(default)]
    pub correlation: Option<Value>,
}

impl Event {
    /// The correlation as a numeric record id, if it is one.
    ///
    /// Accepts JSON numbers and digit strings (an optional leading `#` is
    /// tolerated); everything else yields `None`.
    pub fn correlation_id(&self) -> Option<u64> {
        match self.correlation.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredReply {
    pub event: Event,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Structured(StructuredReply),
    /// The completion was not a valid structured reply; show it as-is.
    PlainText(String),
}

/// Parse a concatenated completion.
///
/// Only a JSON object matching [`StructuredReply`] counts as structured.
/// Anything else, including valid JSON of another shape, comes back
/// unchanged as [`Interpretation::PlainText`].
pub fn interpret(text: &str) -> Interpretation {
    match serde_json::from_str::<StructuredReply>(text) {
        Ok(reply) => Interpretation::Structured(reply),
        Err(e) => {
            tracing::debug!(error = %e, "completion is not a structured reply; using plain text");
            Interpretation::PlainText(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_structured_reply() {
        let raw = r#"{"event":{"code":"search_delivery","correlation":"42"},"message":"Vou verificar."}"#;
        let Interpretation::Structured(r) = interpret(raw) else {
            panic!("expected structured reply");
        };
        assert_eq!(r.event.code, EventCode::SearchDelivery);
        assert_eq!(r.event.correlation_id(), Some(42));
        assert_eq!(r.message, "Vou verificar.");
    }

    #[test]
    fn test_interpret_plain_text_is_returned_unchanged() {
        let raw = "  Olá! Como posso ajudar?\n";
        assert_eq!(interpret(raw), Interpretation::PlainText(raw.to_string()));
    }

    #[test]
    fn test_interpret_json_of_wrong_shape_is_plain_text() {
        let raw = r#"{"answer":"oi"}"#;
        assert_eq!(interpret(raw), Interpretation::PlainText(raw.to_string()));
        let raw = "[1,2,3]";
        assert_eq!(interpret(raw), Interpretation::PlainText(raw.to_string()));
    }

    #[test]
    fn test_unknown_code_is_kept_as_other() {
        let raw = r#"{"event":{"code":"cancel_delivery"},"message":"Entendido."}"#;
        let Interpretation::Structured(r) = interpret(raw) else {
            panic!("expected structured reply");
        };
        assert_eq!(r.event.code, EventCode::Other("cancel_delivery".to_string()));
        assert_eq!(r.event.correlation, None);
    }

    #[test]
    fn test_correlation_id_variants() {
        let ev = |c: Value| Event {
            code: EventCode::SearchDriver,
            correlation: Some(c),
        };
        assert_eq!(ev(json!(7)).correlation_id(), Some(7));
        assert_eq!(ev(json!(" #15 ")).correlation_id(), Some(15));
        assert_eq!(ev(json!("abc")).correlation_id(), None);
        assert_eq!(ev(json!(-3)).correlation_id(), None);
        assert_eq!(ev(Value::Null).correlation_id(), None);
    }
}
