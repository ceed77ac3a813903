use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    Unreachable,
    Timeout,
    Protocol,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ModelError {}

pub fn unreachable(message: impl Into<String>) -> ModelError {
    ModelError::new(ModelErrorKind::Unreachable, message)
}

pub fn timeout(message: impl Into<String>) -> ModelError {
    ModelError::new(ModelErrorKind::Timeout, message)
}

pub fn protocol_violation(message: impl Into<String>) -> ModelError {
    ModelError::new(ModelErrorKind::Protocol, message)
}

pub fn internal_error(message: impl Into<String>) -> ModelError {
    ModelError::new(ModelErrorKind::Internal, message)
}
