use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallErrorKind {
    MalformedDirective,
    UnknownTool,
    UnknownArgument,
    RegistryEmpty,
    FabricationBlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallError {
    pub kind: ToolCallErrorKind,
    pub message: String,
}

impl ToolCallError {
    pub fn new(kind: ToolCallErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ToolCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ToolCallError {}

pub fn malformed_directive(message: impl Into<String>) -> ToolCallError {
    ToolCallError::new(ToolCallErrorKind::MalformedDirective, message)
}

pub fn unknown_tool(message: impl Into<String>) -> ToolCallError {
    ToolCallError::new(ToolCallErrorKind::UnknownTool, message)
}

pub fn unknown_argument(message: impl Into<String>) -> ToolCallError {
    ToolCallError::new(ToolCallErrorKind::UnknownArgument, message)
}

pub fn registry_empty(message: impl Into<String>) -> ToolCallError {
    ToolCallError::new(ToolCallErrorKind::RegistryEmpty, message)
}

pub fn fabrication_blocked(message: impl Into<String>) -> ToolCallError {
    ToolCallError::new(ToolCallErrorKind::FabricationBlocked, message)
}
