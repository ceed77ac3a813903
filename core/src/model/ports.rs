use async_trait::async_trait;

use crate::model::error::ModelError;
use crate::triage::pre_scan::HistoryTurn;

/// One model invocation. The orchestrator owns the timeout; adapters should
/// not retry on their own.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub user_text: String,
    pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Clone)]
pub struct ModelReply {
    pub text: String,
}

/// The only suspension point in the per-turn pipeline.
#[async_trait]
pub trait ModelPort: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, ModelError>;
}
