use serde_json::{Map, Value};

use crate::types::{
    AssistantMessage, ContentBlock, Message, ResultMessage, SystemMessage, ToolResultContent,
    UserMessage,
};

/// Translate one raw stream-json value into a [`Message`].
///
/// Only the `type` discriminator is trusted. Values with a missing or unknown
/// `type`, or without the nested content their type requires, yield `None`
/// and are dropped by the caller.
pub fn parse_message(raw: &Value) -> Option<Message> {
    let obj = raw.as_object()?;
    match obj.get("type")?.as_str()? {
        "user" => parse_user(obj).map(Message::User),
        "assistant" => parse_assistant(obj).map(Message::Assistant),
        "system" => Some(Message::System(SystemMessage {
            subtype: string_field(obj, "subtype"),
            data: obj.clone(),
        })),
        "result" => Some(Message::Result(parse_result(obj))),
        _ => None,
    }
}

fn parse_user(obj: &Map<String, Value>) -> Option<UserMessage> {
    let content = obj.get("message")?.get("content")?;
    let content = match content {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Some(UserMessage { content })
}

fn parse_assistant(obj: &Map<String, Value>) -> Option<AssistantMessage> {
    let blocks = obj.get("message")?.get("content")?.as_array()?;
    Some(AssistantMessage {
        content: blocks.iter().filter_map(parse_content_block).collect(),
    })
}

/// Unknown or malformed blocks are dropped rather than failing the message.
fn parse_content_block(raw: &Value) -> Option<ContentBlock> {
    let block = raw.as_object()?;
    match block.get("type")?.as_str()? {
        "text" => Some(ContentBlock::Text {
            text: string_field(block, "text")?,
        }),
        "tool_use" => Some(ContentBlock::ToolUse {
            id: string_field(block, "id")?,
            name: string_field(block, "name")?,
            input: block
                .get("input")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }),
        "tool_result" => Some(ContentBlock::ToolResult {
            tool_use_id: string_field(block, "tool_use_id")?,
            content: block.get("content").and_then(tool_result_content),
            is_error: block.get("is_error").and_then(Value::as_bool),
        }),
        _ => None,
    }
}

fn tool_result_content(raw: &Value) -> Option<ToolResultContent> {
    match raw {
        Value::String(text) => Some(ToolResultContent::Text(text.clone())),
        Value::Array(items) => Some(ToolResultContent::Blocks(
            items.iter().filter_map(Value::as_object).cloned().collect(),
        )),
        _ => None,
    }
}

fn parse_result(obj: &Map<String, Value>) -> ResultMessage {
    ResultMessage {
        subtype: string_field(obj, "subtype"),
        duration_ms: obj.get("duration_ms").and_then(Value::as_u64),
        duration_api_ms: obj.get("duration_api_ms").and_then(Value::as_u64),
        is_error: obj.get("is_error").and_then(Value::as_bool),
        num_turns: obj
            .get("num_turns")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
        session_id: string_field(obj, "session_id"),
        total_cost_usd: obj.get("total_cost_usd").and_then(Value::as_f64),
        usage: obj.get("usage").and_then(Value::as_object).cloned(),
        result: string_field(obj, "result"),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_owned)
}
