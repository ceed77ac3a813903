use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::error::{ModelError, unreachable};
use crate::model::ports::{ModelPort, ModelReply, ModelRequest};

enum ScriptedStep {
    Reply(String),
    Fail(ModelError),
    Stall(Duration),
}

/// Deterministic stand-in for the external model. Steps play back in order;
/// an exhausted script reports the model as unreachable, which exercises the
/// rule-tier fallback.
#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<ScriptedStep>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.steps
            .lock()
            .expect("script lock poisoned")
            .push_back(ScriptedStep::Reply(text.into()));
    }

    pub fn push_failure(&self, error: ModelError) {
        self.steps
            .lock()
            .expect("script lock poisoned")
            .push_back(ScriptedStep::Fail(error));
    }

    /// Sleeps long enough to trip the orchestrator's timeout.
    pub fn push_stall(&self, duration: Duration) {
        self.steps
            .lock()
            .expect("script lock poisoned")
            .push_back(ScriptedStep::Stall(duration));
    }

    /// Steps not yet consumed. A short-circuited turn leaves the script
    /// untouched, which is how tests prove the model was never called.
    pub fn remaining(&self) -> usize {
        self.steps.lock().expect("script lock poisoned").len()
    }
}

#[async_trait]
impl ModelPort for ScriptedModel {
    async fn complete(&self, _request: ModelRequest) -> Result<ModelReply, ModelError> {
        let step = self
            .steps
            .lock()
            .expect("script lock poisoned")
            .pop_front();
        match step {
            Some(ScriptedStep::Reply(text)) => Ok(ModelReply { text }),
            Some(ScriptedStep::Fail(error)) => Err(error),
            Some(ScriptedStep::Stall(duration)) => {
                tokio::time::sleep(duration).await;
                Err(unreachable("scripted stall elapsed"))
            }
            None => Err(unreachable("scripted model has no steps left")),
        }
    }
}
