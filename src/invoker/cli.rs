//! Subprocess implementation of [`AgentInvoker`]
//!
//! Builds the agent CLI command line and environment, spawns the process,
//! and consumes its output in either of two modes: batch (one JSON
//! document on stdout) or streaming (one JSON object per line). The
//! streaming path drains stderr on a separate task for the lifetime of the
//! run; without that, a chatty subprocess fills the OS pipe buffer while
//! we block on stdout and both sides deadlock.

use crate::error::{ClawError, Result};
use crate::invoker::{AgentInvoker, BatchOutcome, EventSink, InvokeRequest};
use crate::parse::{extract_error_detail, parse_event};
use crate::types::{ConversationRef, StreamEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Environment variable marking a nested agent session
///
/// Removed before spawning: this process may itself be driven by an agent
/// CLI, and the child would otherwise refuse to start.
const NESTED_SESSION_MARKER: &str = "CLAUDECODE";

/// Auth credential variables, in precedence order
const OAUTH_TOKEN_VAR: &str = "CLAUDE_CODE_OAUTH_TOKEN";
const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Configuration for the subprocess invoker
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Agent executable name or path
    pub program: String,

    /// Turn budget passed as `--max-turns`
    pub max_turns: u32,

    /// Permission mode passed as `--permission-mode`
    pub permission_mode: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            max_turns: 25,
            permission_mode: "bypassPermissions".to_string(),
        }
    }
}

impl CliConfig {
    /// Override the agent executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Override the turn budget
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Override the permission mode
    pub fn with_permission_mode(mut self, mode: impl Into<String>) -> Self {
        self.permission_mode = mode.into();
        self
    }
}

/// Output format requested from the agent CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Json,
    StreamJson,
}

impl OutputMode {
    fn flag(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::StreamJson => "stream-json",
        }
    }
}

/// Subprocess-backed agent invoker
#[derive(Debug, Clone, Default)]
pub struct CliInvoker {
    config: CliConfig,
}

impl CliInvoker {
    /// Create an invoker with the given configuration
    pub fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Access the configuration
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Command-line arguments for one invocation
    fn args(&self, request: &InvokeRequest, mode: OutputMode) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            request.prompt.clone(),
            "--output-format".to_string(),
            mode.flag().to_string(),
            "--max-turns".to_string(),
            self.config.max_turns.to_string(),
            "--permission-mode".to_string(),
            self.config.permission_mode.clone(),
        ];

        if let Some(path) = &request.tool_config {
            args.push("--mcp-config".to_string());
            args.push(path.display().to_string());
        }

        // Exactly one of these: resume the external session, or create it
        // under the derived id.
        if request.resuming {
            args.push("--resume".to_string());
        } else {
            args.push("--session-id".to_string());
        }
        args.push(request.session_uuid.to_string());

        args
    }

    fn command(&self, request: &InvokeRequest, mode: OutputMode) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(self.args(request, mode))
            .env_clear()
            .envs(build_env(std::env::vars(), request.conversation.as_ref()))
            .stdin(Stdio::null());
        command
    }

    fn spawn_error(&self, err: std::io::Error) -> ClawError {
        if err.kind() == std::io::ErrorKind::NotFound {
            ClawError::MissingBinary(self.config.program.clone())
        } else {
            ClawError::Io(err)
        }
    }
}

#[async_trait]
impl AgentInvoker for CliInvoker {
    async fn invoke_batch(&self, request: &InvokeRequest) -> Result<BatchOutcome> {
        tracing::info!(
            session = %request.session_uuid,
            resuming = request.resuming,
            "Spawning agent subprocess"
        );

        let output = self
            .command(request, OutputMode::Json)
            .output()
            .await
            .map_err(|err| self.spawn_error(err))?;

        if output.status.success() {
            return Ok(BatchOutcome::Completed {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = extract_error_detail(&stderr, &stdout);
        tracing::error!(
            session = %request.session_uuid,
            status = %output.status,
            "Agent subprocess failed"
        );
        Ok(BatchOutcome::Failed {
            message: failure_message(&output.status, &detail),
        })
    }

    async fn invoke_streaming(
        &self,
        request: &InvokeRequest,
        on_event: EventSink<'_>,
    ) -> Result<bool> {
        tracing::info!(
            session = %request.session_uuid,
            resuming = request.resuming,
            "Spawning agent streaming subprocess"
        );

        let mut child = self
            .command(request, OutputMode::StreamJson)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.spawn_error(err))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClawError::Subprocess("stdout pipe not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClawError::Subprocess("stderr pipe not captured".to_string()))?;

        // Drain stderr for the lifetime of the run. The join handle is the
        // explicit join point: awaited after stdout closes, before the
        // exit status.
        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            let _ = stderr.read_to_end(&mut buffer).await;
            String::from_utf8_lossy(&buffer).into_owned()
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut result_seen = false;
        let mut result_success = false;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = parse_event(&line) {
                        if let StreamEvent::Result { subtype, .. } = &event {
                            result_seen = true;
                            result_success = subtype == "success";
                        }
                        on_event(event);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "Agent stdout read failed");
                    break;
                }
            }
        }

        let stderr_text = stderr_task.await.unwrap_or_default();
        let status = child.wait().await?;

        if !status.success() {
            let detail = extract_error_detail(&stderr_text, "");
            let message = failure_message(&status, &detail);
            tracing::error!(session = %request.session_uuid, %message, "Agent streaming subprocess failed");
            on_event(StreamEvent::Error { message });
        }

        // The terminal result event decides success when present;
        // otherwise fall back to the exit status, for agents that omit
        // the event.
        Ok(if result_seen {
            result_success
        } else {
            status.success()
        })
    }
}

/// Build the subprocess environment from a base snapshot
///
/// Inherits everything (the CLI needs PATH, HOME, credentials), removes
/// the nested-session marker, and injects the conversation identifiers.
fn build_env(
    base: impl IntoIterator<Item = (String, String)>,
    conversation: Option<&ConversationRef>,
) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = base.into_iter().collect();
    env.remove(NESTED_SESSION_MARKER);

    if !env.contains_key(OAUTH_TOKEN_VAR) && !env.contains_key(API_KEY_VAR) {
        tracing::warn!("No {OAUTH_TOKEN_VAR} or {API_KEY_VAR} in environment");
    }

    if let Some(conversation) = conversation {
        env.insert("CONVERSATION_ID".to_string(), conversation.id.clone());
        if let Some(page_id) = &conversation.page_id {
            env.insert("AI_PAGE_ID".to_string(), page_id.clone());
        }
    }

    env
}

/// Failure description from an exit status and extracted detail
fn failure_message(status: &ExitStatus, detail: &str) -> String {
    match status.code() {
        Some(code) => format!("Agent exited with code {code}:\n{detail}"),
        None => format!("Agent terminated by {}:\n{detail}", signal_label(status)),
    }
}

#[cfg(unix)]
fn signal_label(status: &ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    status
        .signal()
        .map(|signal| format!("signal {signal}"))
        .unwrap_or_else(|| "unknown signal".to_string())
}

#[cfg(not(unix))]
fn signal_label(_status: &ExitStatus) -> String {
    "unknown signal".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn request(resuming: bool, tool_config: Option<PathBuf>) -> InvokeRequest {
        InvokeRequest {
            prompt: "do the thing".to_string(),
            session_uuid: Uuid::nil(),
            resuming,
            conversation: None,
            tool_config,
        }
    }

    fn base_env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fresh_invocation_uses_session_id_flag() {
        let invoker = CliInvoker::default();
        let args = invoker.args(&request(false, None), OutputMode::Json);

        assert_eq!(args[0..2], ["-p", "do the thing"]);
        assert!(args.contains(&"--output-format".to_string()));
        assert!(args.contains(&"json".to_string()));
        assert!(args.contains(&"--max-turns".to_string()));
        assert!(args.contains(&"25".to_string()));
        assert!(args.contains(&"--permission-mode".to_string()));
        assert!(args.contains(&"bypassPermissions".to_string()));
        assert!(args.contains(&"--session-id".to_string()));
        assert!(!args.contains(&"--resume".to_string()));
        assert!(!args.contains(&"--mcp-config".to_string()));
        assert_eq!(args.last().unwrap(), &Uuid::nil().to_string());
    }

    #[test]
    fn test_resume_invocation_uses_resume_flag() {
        let invoker = CliInvoker::default();
        let args = invoker.args(&request(true, None), OutputMode::StreamJson);

        assert!(args.contains(&"stream-json".to_string()));
        assert!(args.contains(&"--resume".to_string()));
        assert!(!args.contains(&"--session-id".to_string()));
    }

    #[test]
    fn test_tool_config_path_is_passed_when_resolved() {
        let invoker = CliInvoker::new(CliConfig::default().with_max_turns(5));
        let args = invoker.args(
            &request(false, Some(PathBuf::from("/workspace/.mcp.json"))),
            OutputMode::Json,
        );

        let at = args.iter().position(|a| a == "--mcp-config").unwrap();
        assert_eq!(args[at + 1], "/workspace/.mcp.json");
        assert!(args.contains(&"5".to_string()));
    }

    #[test]
    fn test_env_removes_nested_session_marker() {
        let env = build_env(
            base_env(&[("CLAUDECODE", "1"), ("PATH", "/usr/bin"), ("ANTHROPIC_API_KEY", "k")]),
            None,
        );
        assert!(!env.contains_key("CLAUDECODE"));
        assert_eq!(env.get("PATH").map(String::as_str), Some("/usr/bin"));
        assert_eq!(env.get("ANTHROPIC_API_KEY").map(String::as_str), Some("k"));
    }

    #[test]
    fn test_env_injects_conversation_identifiers() {
        let conversation = ConversationRef::new("conv-7").with_page("page-3");
        let env = build_env(base_env(&[("CLAUDE_CODE_OAUTH_TOKEN", "t")]), Some(&conversation));
        assert_eq!(env.get("CONVERSATION_ID").map(String::as_str), Some("conv-7"));
        assert_eq!(env.get("AI_PAGE_ID").map(String::as_str), Some("page-3"));

        let env = build_env(base_env(&[]), Some(&ConversationRef::new("conv-8")));
        assert_eq!(env.get("CONVERSATION_ID").map(String::as_str), Some("conv-8"));
        assert!(!env.contains_key("AI_PAGE_ID"));
    }

    #[test]
    fn test_failure_message_carries_exit_code() {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            let status = ExitStatus::from_raw(0x100); // exit code 1
            let message = failure_message(&status, "boom");
            assert!(message.contains("code 1"), "message: {message}");
            assert!(message.contains("boom"));

            let signalled = ExitStatus::from_raw(9); // SIGKILL
            let message = failure_message(&signalled, "(no output)");
            assert!(message.contains("signal 9"), "message: {message}");
        }
    }
}
