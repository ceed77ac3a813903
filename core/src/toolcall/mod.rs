pub mod error;
pub mod executor;
pub mod parser;
pub mod types;

pub use error::{ToolCallError, ToolCallErrorKind};
pub use executor::{ResolutionOutcome, ResolveContext, Substitution, ToolExecutor};
pub use parser::parse;
pub use types::{
    ParsedDirective, ParsedOutput, Segment, TOOL_CHECK_HALLUCINATION, TOOL_GET_CRISIS_RESOURCES,
    TOOL_LOG_INCIDENT, ToolDirective,
};
