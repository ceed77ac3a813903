use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::error::{RegistryError, invalid_record};
use crate::types::{ChannelKind, Region, TopicTag};

/// Re-verification window. A resource whose `verified_on` is older than this
/// blocks writes and is flagged stale on reads.
pub const VERIFICATION_WINDOW_DAYS: u64 = 30;

/// Delay before a degraded resource is re-checked.
pub const DEGRADED_RECHECK_DAYS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    Emergency,
    Hotline,
    Specialist,
}

impl ServiceTier {
    /// Lookup ordering rank: emergency services before hotlines before
    /// specialist services.
    pub fn rank(&self) -> u8 {
        match self {
            ServiceTier::Emergency => 0,
            ServiceTier::Hotline => 1,
            ServiceTier::Specialist => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Active,
    Degraded,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactChannel {
    pub kind: ChannelKind,
    pub value: String,
}

impl ContactChannel {
    pub fn phone(value: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Phone,
            value: value.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Text,
            value: value.into(),
        }
    }

    pub fn website(value: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Website,
            value: value.into(),
        }
    }
}

/// A verified service entry. `(region, service_name)` is unique across the
/// registry; `retired` rows stay present so historic crisis events resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: String,
    pub region: Region,
    pub service_name: String,
    pub tier: ServiceTier,
    pub channels: Vec<ContactChannel>,
    pub hours: String,
    pub languages: Vec<String>,
    pub description: String,
    pub topics: Vec<TopicTag>,
    pub verified_on: NaiveDate,
    pub verified_by: String,
    pub verification_method: String,
    pub next_verification_due: NaiveDate,
    pub status: ResourceStatus,
}

impl Resource {
    pub fn primary_channel(&self) -> Option<&ContactChannel> {
        self.channels.first()
    }

    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.next_verification_due < today
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), RegistryError> {
        if self.resource_id.trim().is_empty() {
            return Err(invalid_record("resource_id cannot be empty"));
        }
        if self.service_name.trim().is_empty() {
            return Err(invalid_record(format!(
                "resource '{}' has empty service_name",
                self.resource_id
            )));
        }
        if self.status == ResourceStatus::Active && self.channels.is_empty() {
            return Err(invalid_record(format!(
                "active resource '{}' must have at least one contact channel",
                self.resource_id
            )));
        }
        if self.verified_on > today {
            return Err(invalid_record(format!(
                "resource '{}' has verified_on in the future",
                self.resource_id
            )));
        }
        let expected_due = self
            .verified_on
            .checked_add_days(Days::new(VERIFICATION_WINDOW_DAYS))
            .ok_or_else(|| invalid_record("verification due date overflow"))?;
        if self.status == ResourceStatus::Active && self.next_verification_due > expected_due {
            return Err(invalid_record(format!(
                "resource '{}' has next_verification_due beyond the verification window",
                self.resource_id
            )));
        }
        Ok(())
    }
}

/// An anti-entry: a literal known to be fabricated or defunct. A value listed
/// here must never appear on an active resource channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownFabrication {
    pub value: String,
    pub kind: ChannelKind,
    pub first_observed: NaiveDate,
    pub last_observed: NaiveDate,
    #[serde(default)]
    pub origin_model: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Ok,
    Unreachable,
    WrongDestination,
    ServiceChanged,
}

/// Append-only log entry created by the re-verification job. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEvent {
    pub resource_id: String,
    pub attempt_at: DateTime<Utc>,
    pub verifier_id: String,
    pub method: String,
    pub outcome: VerificationOutcome,
    #[serde(default)]
    pub notes: String,
}

/// Result of a fabrication membership test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricationCheck {
    pub is_fabrication: bool,
    pub details: String,
    #[serde(default)]
    pub suggested_alternative: Option<Resource>,
}

/// Canonical form for contact-value comparison. Phone numbers lose
/// separators, country prefixes, and leading zeros; websites and emails are
/// lowercased with trailing slashes trimmed.
pub fn normalize_contact_value(kind: ChannelKind, value: &str) -> String {
    match kind {
        ChannelKind::Phone | ChannelKind::Text => normalize_phone(value),
        ChannelKind::Website => value
            .trim()
            .trim_end_matches('/')
            .to_ascii_lowercase()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("www.")
            .to_string(),
        ChannelKind::Email => value.trim().to_ascii_lowercase(),
    }
}

fn normalize_phone(value: &str) -> String {
    let mut digits: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    for prefix in ["+64", "+61", "+1", "+44", "+353", "+"] {
        if let Some(rest) = digits.strip_prefix(prefix) {
            digits = rest.to_string();
            break;
        }
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        digits
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::types::ChannelKind;

    use super::normalize_contact_value;

    #[test]
    fn phone_normalization_strips_separators_and_prefixes() {
        let normalized = |v: &str| normalize_contact_value(ChannelKind::Phone, v);
        assert_eq!(normalized("0800 543 354"), "800543354");
        assert_eq!(normalized("0800-543-354"), "800543354");
        assert_eq!(normalized("+64 800 543 354"), "800543354");
        assert_eq!(normalized("1-800-273-8255"), "18002738255");
    }

    #[test]
    fn website_normalization_drops_scheme_and_trailing_slash() {
        let normalized = |v: &str| normalize_contact_value(ChannelKind::Website, v);
        assert_eq!(
            normalized("https://www.befrienders.org/"),
            "befrienders.org"
        );
        assert_eq!(normalized("HTTP://FindAHelpline.com"), "findahelpline.com");
    }
}
