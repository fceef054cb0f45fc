//! Chat Completions wire format: request bodies and streamed chunk decoding.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::warn;

use crate::error::ProviderError;
use crate::provider::ProviderChunk;
use crate::{ChatMessage, Role, TokenUsage, ToolCall, ToolDefinition};

pub(crate) fn to_openai_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn to_openai_message(message: &ChatMessage) -> Value {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::Tool => "tool",
    };
    let mut msg = json!({ "role": role, "content": message.content });
    if !message.tool_calls.is_empty() {
        let calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect();
        msg["tool_calls"] = json!(calls);
        if message.content.is_empty() {
            msg["content"] = Value::Null;
        }
    }
    if let Some(id) = &message.tool_call_id {
        msg["tool_call_id"] = json!(id);
    }
    msg
}

/// Build a streaming Chat Completions request body.
pub(crate) fn build_request_body(
    model: &str,
    temperature: f64,
    max_tokens: Option<u64>,
    messages: &[ChatMessage],
    tools: &[ToolDefinition],
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages.iter().map(to_openai_message).collect::<Vec<_>>(),
        "temperature": temperature,
        "stream": true,
        "stream_options": { "include_usage": true },
    });
    if let Some(max_tokens) = max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if !tools.is_empty() {
        body["tools"] = json!(tools.iter().map(to_openai_tool).collect::<Vec<_>>());
    }
    body
}

#[derive(Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates streamed `data:` payloads into provider chunks.
///
/// Tool-call fragments arrive spread over many deltas, keyed by index; they
/// are released together when the choice finishes.
#[derive(Default)]
pub(crate) struct ChunkDecoder {
    pending: BTreeMap<u64, PendingCall>,
}

impl ChunkDecoder {
    pub(crate) fn decode(&mut self, data: &str) -> Vec<Result<ProviderChunk, ProviderError>> {
        if data.trim() == "[DONE]" {
            return self.flush().map(Ok).into_iter().collect();
        }
        let json: Value = match serde_json::from_str(data) {
            Ok(json) => json,
            Err(e) => return vec![Err(ProviderError::Parse(e.to_string()))],
        };
        if let Some(message) = json["error"]["message"].as_str() {
            return vec![Err(ProviderError::Api(message.to_string()))];
        }

        let mut out = Vec::new();
        let choice = &json["choices"][0];
        let delta = &choice["delta"];
        if let Some(text) = delta["content"].as_str() {
            if !text.is_empty() {
                out.push(Ok(ProviderChunk::Content(text.to_string())));
            }
        }
        if let Some(calls) = delta["tool_calls"].as_array() {
            for call in calls {
                let index = call["index"].as_u64().unwrap_or(0);
                let pending = self.pending.entry(index).or_default();
                if let Some(id) = call["id"].as_str() {
                    pending.id = id.to_string();
                }
                if let Some(name) = call["function"]["name"].as_str() {
                    pending.name.push_str(name);
                }
                if let Some(args) = call["function"]["arguments"].as_str() {
                    pending.arguments.push_str(args);
                }
            }
        }
        if choice["finish_reason"].is_string() {
            if let Some(chunk) = self.flush() {
                out.push(Ok(chunk));
            }
        }
        if json["usage"].is_object() {
            out.push(Ok(ProviderChunk::Usage(TokenUsage {
                input_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
                output_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0),
            })));
        }
        out
    }

    fn flush(&mut self) -> Option<ProviderChunk> {
        if self.pending.is_empty() {
            return None;
        }
        let calls = std::mem::take(&mut self.pending)
            .into_values()
            .map(|pending| {
                let arguments = if pending.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&pending.arguments).unwrap_or_else(|e| {
                        warn!(tool = %pending.name, error = %e, "unparseable tool arguments");
                        Value::Null
                    })
                };
                ToolCall {
                    id: pending.id,
                    name: pending.name,
                    arguments,
                }
            })
            .collect();
        Some(ProviderChunk::ToolCalls(calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(results: Vec<Result<ProviderChunk, ProviderError>>) -> Vec<ProviderChunk> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn request_body_shape() {
        let tools = vec![ToolDefinition {
            name: "generateUUID".into(),
            description: "Make a UUID".into(),
            parameters: json!({ "type": "object" }),
        }];
        let body = build_request_body(
            "gpt-4o",
            0.5,
            Some(256),
            &[ChatMessage::system("Be brief."), ChatMessage::user("hi")],
            &tools,
        );
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["tools"][0]["function"]["name"], "generateUUID");
    }

    #[test]
    fn unlimited_tokens_omit_max_tokens() {
        let body = build_request_body("gpt-4", 0.5, None, &[ChatMessage::user("hi")], &[]);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn tool_history_messages() {
        let calls = vec![ToolCall {
            id: "call_1".into(),
            name: "weather".into(),
            arguments: json!({ "city": "Oslo" }),
        }];
        let body = build_request_body(
            "gpt-4",
            0.5,
            None,
            &[
                ChatMessage::tool_calls("", calls),
                ChatMessage::tool_result("call_1", "sunny"),
            ],
            &[],
        );
        let assistant = &body["messages"][0];
        assert_eq!(assistant["content"], Value::Null);
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], "{\"city\":\"Oslo\"}");
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["tool_call_id"], "call_1");
    }

    #[test]
    fn decodes_content_and_usage() {
        let mut decoder = ChunkDecoder::default();
        let chunks = ok(decoder.decode(r#"{"choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#));
        assert_eq!(chunks, vec![ProviderChunk::Content("Hi".into())]);

        let chunks = ok(decoder.decode(
            r#"{"choices":[],"usage":{"prompt_tokens":9,"completion_tokens":4,"total_tokens":13}}"#,
        ));
        assert_eq!(
            chunks,
            vec![ProviderChunk::Usage(TokenUsage {
                input_tokens: 9,
                output_tokens: 4
            })]
        );
        assert!(decoder.decode("[DONE]").is_empty());
    }

    #[test]
    fn assembles_fragmented_tool_calls() {
        let mut decoder = ChunkDecoder::default();
        let fragments = [
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"weather","arguments":""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\":"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"Oslo\"}"}}]}}]}"#,
        ];
        for fragment in fragments {
            assert!(decoder.decode(fragment).is_empty());
        }
        let chunks = ok(decoder.decode(r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#));
        assert_eq!(
            chunks,
            vec![ProviderChunk::ToolCalls(vec![ToolCall {
                id: "call_a".into(),
                name: "weather".into(),
                arguments: json!({ "city": "Oslo" }),
            }])]
        );
    }

    #[test]
    fn done_flushes_unfinished_calls() {
        let mut decoder = ChunkDecoder::default();
        decoder.decode(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c","function":{"name":"now"}}]}}]}"#,
        );
        let chunks = ok(decoder.decode("[DONE]"));
        let ProviderChunk::ToolCalls(calls) = &chunks[0] else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].arguments, json!({}));
    }

    #[test]
    fn reports_malformed_and_error_payloads() {
        let mut decoder = ChunkDecoder::default();
        assert!(matches!(
            decoder.decode("{not json").pop(),
            Some(Err(ProviderError::Parse(_)))
        ));
        assert_eq!(
            decoder.decode(r#"{"error":{"message":"quota exceeded"}}"#).pop(),
            Some(Err(ProviderError::Api("quota exceeded".into())))
        );
    }
}
