use std::path::Path;

use serde_json::{Map, Value};

use crate::types::{McpServerConfig, QueryOptions};

// ─── Command builder ──────────────────────────────────────────────────────

/// Build the full argument vector for one query, binary path first.
///
/// Flags are appended in a fixed order so the same options always produce a
/// byte-identical command line. Empty strings, empty lists, an empty MCP map
/// and `max_turns == 0` count as unset. The prompt always comes last, after
/// `--print`.
pub fn build_command(cli_path: &Path, prompt: &str, opts: &QueryOptions) -> Vec<String> {
    let mut cmd = vec![
        cli_path.to_string_lossy().into_owned(),
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--verbose".to_string(),
    ];

    if let Some(sp) = non_empty(&opts.system_prompt) {
        push_flag(&mut cmd, "--system-prompt", sp);
    }

    if let Some(append) = non_empty(&opts.append_system_prompt) {
        push_flag(&mut cmd, "--append-system-prompt", append);
    }

    if !opts.allowed_tools.is_empty() {
        push_flag(&mut cmd, "--allowedTools", join_tools(&opts.allowed_tools));
    }

    if let Some(max_turns) = opts.max_turns.filter(|n| *n > 0) {
        push_flag(&mut cmd, "--max-turns", max_turns.to_string());
    }

    if !opts.disallowed_tools.is_empty() {
        push_flag(&mut cmd, "--disallowedTools", join_tools(&opts.disallowed_tools));
    }

    if let Some(model) = non_empty(&opts.model) {
        push_flag(&mut cmd, "--model", model);
    }

    if let Some(tool) = non_empty(&opts.permission_prompt_tool_name) {
        push_flag(&mut cmd, "--permission-prompt-tool", tool);
    }

    if let Some(mode) = opts.permission_mode {
        push_flag(&mut cmd, "--permission-mode", mode.as_str());
    }

    if opts.continue_conversation {
        cmd.push("--continue".to_string());
    }

    if let Some(resume) = non_empty(&opts.resume) {
        push_flag(&mut cmd, "--resume", resume);
    }

    if !opts.mcp_servers.is_empty() {
        push_flag(&mut cmd, "--mcp-config", mcp_config_json(&opts.mcp_servers));
    }

    push_flag(&mut cmd, "--print", prompt);
    cmd
}

fn push_flag(cmd: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    cmd.push(flag.to_string());
    cmd.push(value.into());
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Comma-join tool names, keeping the first occurrence of duplicates.
fn join_tools(tools: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::with_capacity(tools.len());
    for tool in tools {
        if !seen.contains(&tool.as_str()) {
            seen.push(tool);
        }
    }
    seen.join(",")
}

/// Serialise MCP servers into the JSON string expected by
/// `claude --mcp-config '...'`.
///
/// Format: `{"mcpServers":{"<name>":{"transport":[...],"env":{...}}}}`
fn mcp_config_json<'a>(
    servers: impl IntoIterator<Item = (&'a String, &'a McpServerConfig)>,
) -> String {
    let mut mcp_servers = Map::new();

    for (name, srv) in servers {
        let mut cfg = Map::new();
        cfg.insert(
            "transport".into(),
            Value::Array(srv.transport.iter().cloned().map(Value::String).collect()),
        );

        if let Some(env) = &srv.env {
            let env: Map<String, Value> = env
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            cfg.insert("env".into(), Value::Object(env));
        }

        mcp_servers.insert(name.clone(), Value::Object(cfg));
    }

    serde_json::json!({ "mcpServers": mcp_servers }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PermissionMode;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    const CLI: &str = "/usr/bin/claude";

    fn build(opts: &QueryOptions) -> Vec<String> {
        build_command(Path::new(CLI), "Hello", opts)
    }

    fn value_after<'a>(cmd: &'a [String], flag: &str) -> Option<&'a str> {
        let idx = cmd.iter().position(|a| a == flag)?;
        cmd.get(idx + 1).map(String::as_str)
    }

    fn full_options() -> QueryOptions {
        let mut mcp_servers = BTreeMap::new();
        mcp_servers.insert(
            "s1".to_string(),
            McpServerConfig {
                transport: vec!["node".into(), "x.js".into()],
                env: Some(BTreeMap::from([("K".to_string(), "v".to_string())])),
            },
        );
        QueryOptions {
            allowed_tools: vec!["Read".into(), "Write".into()],
            disallowed_tools: vec!["Bash".into()],
            system_prompt: Some("Be helpful".into()),
            append_system_prompt: Some("Be brief".into()),
            max_turns: Some(5),
            model: Some("claude-3-5-sonnet".into()),
            permission_mode: Some(PermissionMode::AcceptEdits),
            continue_conversation: true,
            resume: Some("session-123".into()),
            cwd: None,
            max_thinking_tokens: Some(8000),
            mcp_servers,
            permission_prompt_tool_name: Some("mcp__perm__ask".into()),
            path_to_executable: None,
        }
    }

    /// Read recognised flags back into options.
    fn decode(cmd: &[String]) -> QueryOptions {
        let mut opts = QueryOptions::default();
        let mut args = cmd.iter().skip(4);
        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--continue" => opts.continue_conversation = true,
                "--print" => {
                    args.next();
                }
                other => {
                    let value = args.next().cloned().unwrap();
                    match other {
                        "--system-prompt" => opts.system_prompt = Some(value),
                        "--append-system-prompt" => opts.append_system_prompt = Some(value),
                        "--allowedTools" => {
                            opts.allowed_tools = value.split(',').map(String::from).collect()
                        }
                        "--disallowedTools" => {
                            opts.disallowed_tools = value.split(',').map(String::from).collect()
                        }
                        "--max-turns" => opts.max_turns = Some(value.parse().unwrap()),
                        "--model" => opts.model = Some(value),
                        "--permission-prompt-tool" => {
                            opts.permission_prompt_tool_name = Some(value)
                        }
                        "--permission-mode" => {
                            opts.permission_mode =
                                Some(serde_json::from_value(json!(value)).unwrap())
                        }
                        "--resume" => opts.resume = Some(value),
                        "--mcp-config" => {
                            let parsed: serde_json::Value = serde_json::from_str(&value).unwrap();
                            opts.mcp_servers =
                                serde_json::from_value(parsed["mcpServers"].clone()).unwrap();
                        }
                        unknown => panic!("unexpected flag {unknown}"),
                    }
                }
            }
        }
        opts
    }

    #[test]
    fn prefix_and_prompt_are_fixed() {
        for opts in [QueryOptions::default(), full_options()] {
            let cmd = build(&opts);
            assert_eq!(
                &cmd[..4],
                &[CLI, "--output-format", "stream-json", "--verbose"]
            );
            assert_eq!(&cmd[cmd.len() - 2..], &["--print", "Hello"]);
        }
    }

    #[test]
    fn default_options_produce_minimal_command() {
        let cmd = build(&QueryOptions::default());
        assert_eq!(
            cmd,
            vec![CLI, "--output-format", "stream-json", "--verbose", "--print", "Hello"]
        );
    }

    #[test]
    fn allowed_tools_are_comma_joined() {
        let opts = QueryOptions {
            allowed_tools: vec!["Read".into(), "Write".into()],
            ..Default::default()
        };
        assert_eq!(value_after(&build(&opts), "--allowedTools"), Some("Read,Write"));
    }

    #[test]
    fn duplicate_tools_keep_first_occurrence() {
        let opts = QueryOptions {
            disallowed_tools: vec!["Bash".into(), "Edit".into(), "Bash".into()],
            ..Default::default()
        };
        assert_eq!(value_after(&build(&opts), "--disallowedTools"), Some("Bash,Edit"));
    }

    #[test]
    fn continue_without_resume() {
        let opts = QueryOptions {
            continue_conversation: true,
            ..Default::default()
        };
        let cmd = build(&opts);
        assert!(cmd.iter().any(|a| a == "--continue"));
        assert!(!cmd.iter().any(|a| a == "--resume"));
    }

    #[test]
    fn mcp_servers_wrapped_under_mcp_servers_key() {
        let cmd = build(&full_options());
        let raw = value_after(&cmd, "--mcp-config").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed,
            json!({"mcpServers": {"s1": {"transport": ["node", "x.js"], "env": {"K": "v"}}}})
        );
    }

    #[test]
    fn mcp_server_without_env_omits_env_key() {
        let mut opts = QueryOptions::default();
        opts.mcp_servers.insert(
            "plain".into(),
            McpServerConfig {
                transport: vec!["srv".into()],
                env: None,
            },
        );
        let cmd = build(&opts);
        assert_eq!(
            value_after(&cmd, "--mcp-config"),
            Some(r#"{"mcpServers":{"plain":{"transport":["srv"]}}}"#)
        );
    }

    #[test]
    fn flags_follow_fixed_order() {
        let cmd = build(&full_options());
        let flags: Vec<&str> = cmd
            .iter()
            .map(String::as_str)
            .filter(|a| a.starts_with("--"))
            .collect();
        assert_eq!(
            flags,
            vec![
                "--output-format",
                "--verbose",
                "--system-prompt",
                "--append-system-prompt",
                "--allowedTools",
                "--max-turns",
                "--disallowedTools",
                "--model",
                "--permission-prompt-tool",
                "--permission-mode",
                "--continue",
                "--resume",
                "--mcp-config",
                "--print",
            ]
        );
    }

    #[test]
    fn same_options_same_command_line() {
        assert_eq!(build(&full_options()), build(&full_options()));
    }

    #[test]
    fn empty_values_are_skipped() {
        let opts = QueryOptions {
            system_prompt: Some(String::new()),
            model: Some(String::new()),
            max_turns: Some(0),
            resume: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(build(&opts).len(), 6);
    }

    #[test]
    fn max_thinking_tokens_has_no_flag() {
        let opts = QueryOptions {
            max_thinking_tokens: Some(4096),
            ..Default::default()
        };
        assert!(!build(&opts).iter().any(|a| a == "4096"));
    }

    #[test]
    fn decoding_flags_reproduces_options() {
        let mut original = full_options();
        let decoded = decode(&build(&original));
        // Fields without a flag do not survive the trip.
        original.max_thinking_tokens = None;
        original.cwd = None;
        assert_eq!(decoded, original);
    }

    #[test]
    fn binary_path_is_first_argument() {
        let path = PathBuf::from("/opt/tools/claude");
        let cmd = build_command(&path, "x", &QueryOptions::default());
        assert_eq!(cmd[0], "/opt/tools/claude");
    }
}
