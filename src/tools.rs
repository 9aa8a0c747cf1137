//! Tool-access configuration seam
//!
//! The subprocess receives a tool configuration file path limiting which
//! tool servers it may load. The path is produced per conversation by a
//! classification step outside this crate; the engine consumes it as an
//! opaque path, and `None` means "use default/all tools" (the flag is
//! omitted from the command line).

use crate::types::ConversationRef;
use std::path::PathBuf;

/// Produces the tool configuration path for one execution
pub trait ToolConfigResolver: Send + Sync {
    /// Resolve the tool config path for the conversation, or `None` for
    /// default/all tools
    fn tool_config(&self, conversation: Option<&ConversationRef>) -> Option<PathBuf>;
}

/// Fixed resolver: the same path (or none) for every conversation
#[derive(Debug, Clone, Default)]
pub struct FixedToolConfig {
    path: Option<PathBuf>,
}

impl FixedToolConfig {
    /// Never pass a tool config (default/all tools)
    pub fn none() -> Self {
        Self { path: None }
    }

    /// Always pass the given config path
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }
}

impl ToolConfigResolver for FixedToolConfig {
    fn tool_config(&self, _conversation: Option<&ConversationRef>) -> Option<PathBuf> {
        self.path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_resolver() {
        assert_eq!(FixedToolConfig::none().tool_config(None), None);
        assert_eq!(
            FixedToolConfig::path("/tmp/.mcp.json").tool_config(Some(&ConversationRef::new("c"))),
            Some(PathBuf::from("/tmp/.mcp.json"))
        );
    }
}
