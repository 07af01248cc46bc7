use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Outer Message enum ───────────────────────────────────────────────────

/// A typed message read from `claude --output-format stream-json`.
///
/// Only produced by [`crate::parse::parse_message`]; the wire payload is never
/// deserialized into this type directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    User(UserMessage),
    Assistant(AssistantMessage),
    System(SystemMessage),
    Result(ResultMessage),
}

impl Message {
    /// The wire discriminator this message was translated from.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::User(_) => "user",
            Message::Assistant(_) => "assistant",
            Message::System(_) => "system",
            Message::Result(_) => "result",
        }
    }

    /// Session identifier, when the message carries one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Message::Result(r) => r.session_id.as_deref(),
            Message::System(s) => s.data.get("session_id").and_then(Value::as_str),
            Message::User(_) | Message::Assistant(_) => None,
        }
    }

    /// Returns `Some(&ResultMessage)` if this is the terminal result message.
    pub fn as_result(&self) -> Option<&ResultMessage> {
        if let Message::Result(r) = self {
            Some(r)
        } else {
            None
        }
    }
}

// ─── User / assistant ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMessage {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantMessage {
    pub content: Vec<ContentBlock>,
}

impl AssistantMessage {
    /// Concatenated text of every `text` block, in order.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Content blocks within an assistant message.
///
/// `ToolResult::tool_use_id` refers back to a `ToolUse::id`; pairing them up
/// is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        /// Tool inputs are schema-polymorphic (varies per tool), so a map of
        /// raw values is correct here.
        input: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<ToolResultContent>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<Map<String, Value>>),
}

// ─── System / result ──────────────────────────────────────────────────────

/// `type = "system"`. `data` is the whole raw object, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemMessage {
    pub subtype: Option<String>,
    pub data: Map<String, Value>,
}

/// `type = "result"` — the terminal message of a query.
///
/// Fields missing from the wire stay `None`; nothing is defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultMessage {
    pub subtype: Option<String>,
    pub duration_ms: Option<u64>,
    pub duration_api_ms: Option<u64>,
    pub is_error: Option<bool>,
    pub num_turns: Option<u32>,
    pub session_id: Option<String>,
    pub total_cost_usd: Option<f64>,
    pub usage: Option<Map<String, Value>>,
    pub result: Option<String>,
}

impl ResultMessage {
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// The final result text, if the CLI reported one.
    pub fn result_text(&self) -> Option<&str> {
        self.result.as_deref()
    }
}

// ─── QueryOptions ─────────────────────────────────────────────────────────

/// Options for a single query.
///
/// Every field is optional and independent; combinations are validated by
/// the CLI, not here. Deserializable so callers can keep options in a JSON
/// file; missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Tool names that are auto-approved (`--allowedTools`)
    pub allowed_tools: Vec<String>,
    /// Tool names that are explicitly disallowed (`--disallowedTools`)
    pub disallowed_tools: Vec<String>,
    /// Override system prompt
    pub system_prompt: Option<String>,
    /// Text to append to the default system prompt
    pub append_system_prompt: Option<String>,
    /// Maximum number of agentic turns
    pub max_turns: Option<u32>,
    /// Claude model name
    pub model: Option<String>,
    /// Permission mode for tool execution
    pub permission_mode: Option<PermissionMode>,
    /// Continue the most recent conversation (`--continue`)
    pub continue_conversation: bool,
    /// Session ID to resume
    pub resume: Option<String>,
    /// Working directory for the subprocess (default: current dir)
    pub cwd: Option<PathBuf>,
    /// Thinking-token budget. The CLI has no flag for it, so it is carried
    /// but not placed on the command line.
    pub max_thinking_tokens: Option<u32>,
    /// MCP servers to register for this session, keyed by name
    pub mcp_servers: BTreeMap<String, McpServerConfig>,
    /// MCP tool that answers permission prompts (`--permission-prompt-tool`)
    pub permission_prompt_tool_name: Option<String>,
    /// Explicit path to the `claude` binary; skips discovery
    pub path_to_executable: Option<PathBuf>,
}

/// Permission mode — controls how tool executions are authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Standard: prompts for dangerous operations
    Default,
    /// Auto-accept file edit operations
    AcceptEdits,
    /// Bypass all permission checks
    BypassPermissions,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

/// An MCP server the CLI should launch, serialized verbatim under
/// `mcpServers.<name>` in `--mcp-config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Command line used to start the server (`["node", "server.js"]`)
    pub transport: Vec<String>,
    /// Extra environment for the server process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}
