use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusErrorKind {
    MissingReference,
    InvalidTemplate,
    FabricationLiteral,
    UnregisteredLiteral,
    EmptyRiskBucket,
    Invariant,
    Parse,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusError {
    pub kind: CorpusErrorKind,
    pub message: String,
}

impl CorpusError {
    pub fn new(kind: CorpusErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for CorpusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CorpusError {}

pub fn missing_reference(message: impl Into<String>) -> CorpusError {
    CorpusError::new(CorpusErrorKind::MissingReference, message)
}

pub fn invalid_template(message: impl Into<String>) -> CorpusError {
    CorpusError::new(CorpusErrorKind::InvalidTemplate, message)
}

pub fn fabrication_literal(message: impl Into<String>) -> CorpusError {
    CorpusError::new(CorpusErrorKind::FabricationLiteral, message)
}

pub fn unregistered_literal(message: impl Into<String>) -> CorpusError {
    CorpusError::new(CorpusErrorKind::UnregisteredLiteral, message)
}

pub fn empty_risk_bucket(message: impl Into<String>) -> CorpusError {
    CorpusError::new(CorpusErrorKind::EmptyRiskBucket, message)
}

pub fn invariant(message: impl Into<String>) -> CorpusError {
    CorpusError::new(CorpusErrorKind::Invariant, message)
}

pub fn parse_error(message: impl Into<String>) -> CorpusError {
    CorpusError::new(CorpusErrorKind::Parse, message)
}

pub fn io_error(message: impl Into<String>) -> CorpusError {
    CorpusError::new(CorpusErrorKind::Io, message)
}
