use std::sync::{Arc, RwLock};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::registry::error::{
    RegistryError, corrupt, fabrication_conflict, internal_error, invalid_record,
    stale_verification,
};
use crate::registry::types::{
    DEGRADED_RECHECK_DAYS, FabricationCheck, KnownFabrication, Resource, ResourceStatus,
    ServiceTier, VERIFICATION_WINDOW_DAYS, VerificationEvent, VerificationOutcome,
    normalize_contact_value,
};
use crate::types::{ChannelKind, Region, SituationType, TopicTag};

/// Persisted registry contents: the three tables of the on-disk layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryState {
    pub resources: Vec<Resource>,
    pub fabrications: Vec<KnownFabrication>,
    pub verification_log: Vec<VerificationEvent>,
}

/// An immutable, consistent view of the registry. Readers hold an `Arc` to a
/// snapshot and never observe torn state; writers build a new snapshot and
/// swap it in.
#[derive(Debug)]
pub struct RegistrySnapshot {
    pub generation: u64,
    pub state: RegistryState,
}

impl RegistrySnapshot {
    /// Ordered lookup: emergency services before hotlines before specialist
    /// services; within a tier, most recently verified first, then by name.
    /// An empty result is legal and must be handled by the caller.
    pub fn lookup(
        &self,
        region: Region,
        situation: SituationType,
        topic: Option<TopicTag>,
    ) -> Vec<Resource> {
        let mut matches: Vec<&Resource> = self
            .state
            .resources
            .iter()
            .filter(|r| r.region == region && r.status == ResourceStatus::Active)
            .filter(|r| match situation {
                // Support-tier queries route around emergency services.
                SituationType::Support => r.tier != ServiceTier::Emergency,
                SituationType::Emergency | SituationType::Crisis => true,
            })
            .filter(|r| match topic {
                Some(tag) => r.tier == ServiceTier::Emergency || r.topics.contains(&tag),
                None => true,
            })
            .collect();

        matches.sort_by(|lhs, rhs| {
            lhs.tier
                .rank()
                .cmp(&rhs.tier.rank())
                .then_with(|| rhs.verified_on.cmp(&lhs.verified_on))
                .then_with(|| lhs.service_name.cmp(&rhs.service_name))
        });

        matches.into_iter().cloned().collect()
    }

    /// Membership test against the fabrication list. When the caller knows
    /// the region, a verified alternative is suggested alongside the verdict.
    pub fn is_fabrication(
        &self,
        value: &str,
        kind: ChannelKind,
        region: Option<Region>,
    ) -> FabricationCheck {
        let normalized = normalize_contact_value(kind, value);
        let hit = self.state.fabrications.iter().find(|f| {
            f.kind == kind && normalize_contact_value(f.kind, &f.value) == normalized
        });

        match hit {
            Some(entry) => FabricationCheck {
                is_fabrication: true,
                details: if entry.notes.is_empty() {
                    format!("'{}' is a known fabricated {}", value, kind)
                } else {
                    entry.notes.clone()
                },
                suggested_alternative: region.and_then(|r| {
                    self.lookup(r, SituationType::Crisis, None).into_iter().next()
                }),
            },
            None => FabricationCheck {
                is_fabrication: false,
                details: match self.locate_value(value, kind, region) {
                    Some(resource) => {
                        format!("verified {} resource: {}", resource.region, resource.service_name)
                    }
                    None => "not in the verified registry".to_string(),
                },
                suggested_alternative: None,
            },
        }
    }

    /// Find the non-retired resource carrying this contact value. The
    /// asserted region's bank wins when the same number exists in several
    /// regions (988 serves both the US and CA). Phone and text channels
    /// share a number space.
    pub fn locate_value(
        &self,
        value: &str,
        kind: ChannelKind,
        region: Option<Region>,
    ) -> Option<&Resource> {
        let normalized = normalize_contact_value(kind, value);
        let carries = |r: &&Resource| {
            r.channels.iter().any(|c| {
                let kinds_compatible = match (kind, c.kind) {
                    (ChannelKind::Phone, ChannelKind::Phone | ChannelKind::Text)
                    | (ChannelKind::Text, ChannelKind::Phone | ChannelKind::Text) => true,
                    (lhs, rhs) => lhs == rhs,
                };
                kinds_compatible && normalize_contact_value(c.kind, &c.value) == normalized
            })
        };

        if let Some(region) = region {
            let in_region = self
                .state
                .resources
                .iter()
                .filter(|r| r.status != ResourceStatus::Retired && r.region == region)
                .find(carries);
            if in_region.is_some() {
                return in_region;
            }
        }
        self.state
            .resources
            .iter()
            .filter(|r| r.status != ResourceStatus::Retired)
            .find(carries)
    }

    pub fn resource(&self, resource_id: &str) -> Option<&Resource> {
        self.state
            .resources
            .iter()
            .find(|r| r.resource_id == resource_id)
    }

    pub fn due_for_verification(&self, today: NaiveDate) -> Vec<&Resource> {
        self.state
            .resources
            .iter()
            .filter(|r| r.status != ResourceStatus::Retired && r.next_verification_due <= today)
            .collect()
    }
}

/// Process-wide registry with copy-on-swap snapshots: read-shared,
/// single-writer. A corrupt state refuses to serve rather than guess.
#[derive(Debug)]
pub struct ResourceRegistry {
    inner: RwLock<Arc<RegistrySnapshot>>,
}

impl ResourceRegistry {
    pub fn new(mut state: RegistryState, today: NaiveDate) -> Result<Self, RegistryError> {
        validate_state(&state, today)?;
        degrade_fabrication_conflicts(&mut state);
        Ok(Self {
            inner: RwLock::new(Arc::new(RegistrySnapshot {
                generation: 1,
                state,
            })),
        })
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .clone()
    }

    /// Replace the whole state, e.g. after a periodic reload from disk.
    pub fn reload(&self, mut state: RegistryState, today: NaiveDate) -> Result<(), RegistryError> {
        validate_state(&state, today)?;
        degrade_fabrication_conflicts(&mut state);
        self.commit(state);
        Ok(())
    }

    /// Insert or replace a resource. Refuses channel values present in the
    /// fabrication list and verification dates older than the window.
    pub fn upsert_resource(&self, record: Resource, today: NaiveDate) -> Result<(), RegistryError> {
        record.validate(today)?;

        let stale_cutoff = today
            .checked_sub_days(Days::new(VERIFICATION_WINDOW_DAYS))
            .ok_or_else(|| internal_error("verification window underflow"))?;
        if record.verified_on < stale_cutoff {
            return Err(stale_verification(format!(
                "resource '{}' was verified on {}, outside the {}-day window",
                record.resource_id, record.verified_on, VERIFICATION_WINDOW_DAYS
            )));
        }

        let snapshot = self.snapshot();
        for channel in &record.channels {
            let check = snapshot.is_fabrication(&channel.value, channel.kind, None);
            if check.is_fabrication {
                return Err(fabrication_conflict(format!(
                    "channel value '{}' on resource '{}' is on the fabrication list",
                    channel.value, record.resource_id
                )));
            }
        }
        if let Some(existing) = snapshot.state.resources.iter().find(|r| {
            r.resource_id != record.resource_id
                && r.region == record.region
                && r.service_name == record.service_name
        }) {
            return Err(invalid_record(format!(
                "(region, service_name) ({}, '{}') already taken by '{}'",
                record.region, record.service_name, existing.resource_id
            )));
        }

        let mut state = snapshot.state.clone();
        match state
            .resources
            .iter_mut()
            .find(|r| r.resource_id == record.resource_id)
        {
            Some(slot) => *slot = record,
            None => state.resources.push(record),
        }
        self.commit(state);
        Ok(())
    }

    /// Append a verification event and roll its outcome into the target
    /// resource. Idempotent by `(resource_id, attempt_timestamp)`: replaying
    /// an already-recorded event returns `Ok(false)` without a second append.
    pub fn record_verification(&self, event: VerificationEvent) -> Result<bool, RegistryError> {
        let snapshot = self.snapshot();
        if snapshot
            .state
            .verification_log
            .iter()
            .any(|e| e.resource_id == event.resource_id && e.attempt_at == event.attempt_at)
        {
            return Ok(false);
        }

        let mut state = snapshot.state.clone();
        let attempt_date = event.attempt_at.date_naive();
        {
            let resource = state
                .resources
                .iter_mut()
                .find(|r| r.resource_id == event.resource_id)
                .ok_or_else(|| {
                    invalid_record(format!(
                        "verification targets unknown resource '{}'",
                        event.resource_id
                    ))
                })?;

            match event.outcome {
                VerificationOutcome::Ok => {
                    resource.verified_on = attempt_date;
                    resource.next_verification_due = attempt_date
                        .checked_add_days(Days::new(VERIFICATION_WINDOW_DAYS))
                        .ok_or_else(|| internal_error("verification due date overflow"))?;
                    if resource.status == ResourceStatus::Degraded {
                        resource.status = ResourceStatus::Active;
                    }
                }
                VerificationOutcome::Unreachable
                | VerificationOutcome::WrongDestination
                | VerificationOutcome::ServiceChanged => {
                    resource.status = ResourceStatus::Degraded;
                    resource.next_verification_due = attempt_date
                        .checked_add_days(Days::new(DEGRADED_RECHECK_DAYS))
                        .ok_or_else(|| internal_error("recheck date overflow"))?;
                }
            }
        }
        state.verification_log.push(event);
        self.commit(state);
        Ok(true)
    }

    /// Add an anti-entry. If the value currently appears on a resource, the
    /// fabrication list wins: the row is forced to `degraded` pending
    /// operator review.
    pub fn insert_fabrication(&self, entry: KnownFabrication) -> Result<(), RegistryError> {
        let snapshot = self.snapshot();
        let mut state = snapshot.state.clone();
        let normalized = normalize_contact_value(entry.kind, &entry.value);

        match state.fabrications.iter_mut().find(|f| {
            f.kind == entry.kind && normalize_contact_value(f.kind, &f.value) == normalized
        }) {
            Some(existing) => existing.last_observed = entry.last_observed,
            None => state.fabrications.push(entry),
        }
        degrade_fabrication_conflicts(&mut state);
        self.commit(state);
        Ok(())
    }

    /// Explicit operator action. The row stays present so historic crisis
    /// events can still resolve it by id.
    pub fn retire_resource(&self, resource_id: &str) -> Result<(), RegistryError> {
        let snapshot = self.snapshot();
        let mut state = snapshot.state.clone();
        let resource = state
            .resources
            .iter_mut()
            .find(|r| r.resource_id == resource_id)
            .ok_or_else(|| invalid_record(format!("unknown resource '{}'", resource_id)))?;
        resource.status = ResourceStatus::Retired;
        self.commit(state);
        Ok(())
    }

    pub fn mark_degraded(&self, resource_id: &str) -> Result<(), RegistryError> {
        let snapshot = self.snapshot();
        let mut state = snapshot.state.clone();
        let resource = state
            .resources
            .iter_mut()
            .find(|r| r.resource_id == resource_id)
            .ok_or_else(|| invalid_record(format!("unknown resource '{}'", resource_id)))?;
        if resource.status == ResourceStatus::Active {
            resource.status = ResourceStatus::Degraded;
        }
        self.commit(state);
        Ok(())
    }

    fn commit(&self, state: RegistryState) {
        let mut guard = self.inner.write().expect("registry lock poisoned");
        let generation = guard.generation + 1;
        *guard = Arc::new(RegistrySnapshot { generation, state });
    }
}

fn validate_state(state: &RegistryState, today: NaiveDate) -> Result<(), RegistryError> {
    for resource in &state.resources {
        resource
            .validate(today)
            .map_err(|err| corrupt(format!("registry state rejected: {}", err)))?;
    }
    for (index, resource) in state.resources.iter().enumerate() {
        if state.resources[..index].iter().any(|other| {
            other.region == resource.region && other.service_name == resource.service_name
        }) {
            return Err(corrupt(format!(
                "duplicate (region, service_name) ({}, '{}')",
                resource.region, resource.service_name
            )));
        }
        if state.resources[..index]
            .iter()
            .any(|other| other.resource_id == resource.resource_id)
        {
            return Err(corrupt(format!(
                "duplicate resource_id '{}'",
                resource.resource_id
            )));
        }
    }
    Ok(())
}

/// Enforces the fabrication-wins rule: an active row carrying a blocklisted
/// value is forced to `degraded`.
fn degrade_fabrication_conflicts(state: &mut RegistryState) {
    let blocked: Vec<(ChannelKind, String)> = state
        .fabrications
        .iter()
        .map(|f| (f.kind, normalize_contact_value(f.kind, &f.value)))
        .collect();

    for resource in &mut state.resources {
        if resource.status != ResourceStatus::Active {
            continue;
        }
        let conflicted = resource.channels.iter().any(|c| {
            let normalized = normalize_contact_value(c.kind, &c.value);
            blocked
                .iter()
                .any(|(kind, value)| *kind == c.kind && *value == normalized)
        });
        if conflicted {
            resource.status = ResourceStatus::Degraded;
        }
    }
}
