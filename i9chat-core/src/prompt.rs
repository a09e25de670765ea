//! Request payloads for the completion API.
//!
//! A turn is classified by sending the raw utterance together with a fixed
//! policy text and a declared response shape:
//!   { "event": { "code": ..., "correlation": ... }, "message": ... }

use serde::Serialize;
use serde_json::{json, Value};

use crate::interpret::EventCode;

/// Everything the completion transport needs for one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system_instruction: String,
    /// JSON response shape; `None` asks for free text.
    pub response_schema: Option<Value>,
    pub user_text: String,
}

impl CompletionRequest {
    pub fn expects_json(&self) -> bool {
        self.response_schema.is_some()
    }
}

pub fn system_instruction() -> String {
    format!(
        "Você é o assistente virtual de atendimento da i9 Delivery, uma empresa de entregas.\n\
Responda sempre em português, de forma cordial e objetiva.\n\
Classifique cada mensagem do cliente e responda SOMENTE com um objeto JSON no formato:\n\
{{\"event\": {{\"code\": \"<código>\", \"correlation\": \"<identificador ou null>\"}}, \"message\": \"<resposta ao cliente>\"}}\n\
Códigos possíveis:\n\
- \"{search_delivery}\": o cliente quer consultar uma entrega. Coloque o número da entrega em correlation. \
Se o número não foi informado, use correlation null e pergunte o número em message.\n\
- \"{search_driver}\": o cliente quer informações de um entregador. Coloque o número do entregador em correlation. \
Se não foi informado, use correlation null e pergunte em message.\n\
- \"{insert_delivery}\": o cliente quer solicitar uma nova entrega. Use correlation null.\n\
- \"{general_response}\": qualquer outro assunto. Responda normalmente em message.\n\
Nunca invente dados de entregas ou entregadores.",
        search_delivery = EventCode::SearchDelivery.as_str(),
        search_driver = EventCode::SearchDriver.as_str(),
        insert_delivery = EventCode::InsertDelivery.as_str(),
        general_response = EventCode::GeneralResponse.as_str(),
    )
}

/// Declared output shape, in the OpenAPI subset the Gemini API accepts.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "event": {
                "type": "OBJECT",
                "properties": {
                    "code": {
                        "type": "STRING",
                        "enum": EventCode::KNOWN.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
                    },
                    "correlation": { "type": "STRING", "nullable": true },
                },
                "required": ["code"],
            },
            "message": { "type": "STRING" },
        },
        "required": ["event", "message"],
    })
}

/// Classification request for one user utterance.
pub fn build_request(user_text: &str) -> CompletionRequest {
    CompletionRequest {
        system_instruction: system_instruction(),
        response_schema: Some(response_schema()),
        user_text: user_text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_keeps_raw_text_and_declares_schema() {
        let r = build_request("  cadê minha entrega 42?  ");
        assert_eq!(r.user_text, "  cadê minha entrega 42?  ");
        assert!(r.expects_json());
        assert!(r.system_instruction.contains("search_delivery"));
        assert!(r.system_instruction.contains("general_response"));
    }

    #[test]
    fn test_schema_lists_all_event_codes() {
        let s = response_schema();
        let codes = s["properties"]["event"]["properties"]["code"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(codes.len(), 4);
        assert_eq!(s["required"], json!(["event", "message"]));
    }
}
