use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::registry::error::RegistryError;
use crate::registry::store::ResourceRegistry;
use crate::registry::types::{Resource, VerificationEvent, VerificationOutcome};

/// The actual reachability check lives outside this crate (a human dialing,
/// a call-out harness). The scheduler only needs an outcome back.
#[async_trait]
pub trait VerifierPort: Send + Sync {
    async fn verify(&self, resource: &Resource) -> Result<VerificationOutcome, RegistryError>;
}

/// Walks resources past their `next_verification_due`, runs the verifier and
/// records the outcome. At most one outstanding check per resource: a
/// resource id is never handed to the verifier twice in one sweep, and
/// degraded rows get their 24h recheck through `record_verification`.
pub struct VerificationScheduler {
    registry: Arc<ResourceRegistry>,
    verifier: Arc<dyn VerifierPort>,
    verifier_id: String,
}

impl VerificationScheduler {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        verifier: Arc<dyn VerifierPort>,
        verifier_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            verifier,
            verifier_id: verifier_id.into(),
        }
    }

    /// One sweep over everything that is due. Returns the events recorded.
    pub async fn run_due_checks(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<VerificationEvent>, RegistryError> {
        let snapshot = self.registry.snapshot();
        let due: Vec<Resource> = snapshot
            .due_for_verification(today)
            .into_iter()
            .cloned()
            .collect();

        let mut in_flight = BTreeSet::new();
        let mut recorded = Vec::new();

        for resource in due {
            if !in_flight.insert(resource.resource_id.clone()) {
                continue;
            }

            let outcome = self.verifier.verify(&resource).await?;
            let event = VerificationEvent {
                resource_id: resource.resource_id.clone(),
                attempt_at: now,
                verifier_id: self.verifier_id.clone(),
                method: resource.verification_method.clone(),
                outcome,
                notes: String::new(),
            };

            if self.registry.record_verification(event.clone())? {
                tracing::info!(
                    target: "registry.verification",
                    resource_id = %event.resource_id,
                    outcome = ?event.outcome,
                    "verification_recorded"
                );
                recorded.push(event);
            }
        }

        Ok(recorded)
    }
}
