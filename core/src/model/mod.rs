pub mod error;
pub mod openai_compatible;
pub mod ports;
pub mod scripted;

pub use error::{ModelError, ModelErrorKind};
pub use openai_compatible::OpenAiCompatibleModel;
pub use ports::{ModelPort, ModelReply, ModelRequest};
pub use scripted::ScriptedModel;
