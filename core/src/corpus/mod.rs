pub mod compose;
pub mod error;
pub mod ingest;
pub mod jsonl;
pub mod normalize;
pub mod types;
pub mod validate;

pub use compose::{ComposeReport, compose};
pub use error::{CorpusError, CorpusErrorKind};
pub use ingest::{ExternalRecord, ingest_external};
pub use jsonl::{read_jsonl, write_jsonl};
pub use normalize::{
    NormalizeChanges, NormalizeStats, canonical_instruction, extract_risk_level,
    extract_user_message, normalize_corpus, normalize_example,
};
pub use types::{
    ExampleMetadata, InstructionTemplate, OutputRecord, PromptRecord, TrainingExample,
};
pub use validate::{CoverageReport, validate_corpus};
