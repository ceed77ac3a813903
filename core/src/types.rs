use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Region codes the registry is scoped by. `Global` is the fallback for
/// sessions with no stated region and carries only region-agnostic routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Nz,
    Au,
    Us,
    Uk,
    Ca,
    Ie,
    Global,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Region::Nz,
        Region::Au,
        Region::Us,
        Region::Uk,
        Region::Ca,
        Region::Ie,
        Region::Global,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Nz => "NZ",
            Region::Au => "AU",
            Region::Us => "US",
            Region::Uk => "UK",
            Region::Ca => "CA",
            Region::Ie => "IE",
            Region::Global => "GLOBAL",
        }
    }

    /// Unknown region codes fall back to `Global` rather than failing the
    /// turn; the global bank never returns region-specific literals.
    pub fn parse_or_global(value: &str) -> Region {
        Region::from_str(value).unwrap_or(Region::Global)
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NZ" => Ok(Region::Nz),
            "AU" => Ok(Region::Au),
            "US" => Ok(Region::Us),
            "UK" => Ok(Region::Uk),
            "CA" => Ok(Region::Ca),
            "IE" => Ok(Region::Ie),
            "GLOBAL" => Ok(Region::Global),
            _ => Err(UnknownRegion),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownRegion;

impl fmt::Display for UnknownRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown region code")
    }
}

impl std::error::Error for UnknownRegion {}

/// Discrete severity assigned to a turn. Only `Low` may produce a response
/// with no tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
        }
    }

    /// 3 for `Critical` down to 0 for `Low`.
    pub fn severity_rank(&self) -> u8 {
        match self {
            RiskLevel::Critical => 3,
            RiskLevel::High => 2,
            RiskLevel::Medium => 1,
            RiskLevel::Low => 0,
        }
    }

    /// The registry routing tier this risk level maps to. `Low` maps to no
    /// tier at all: low-risk turns must not carry tool calls.
    pub fn situation(&self) -> Option<SituationType> {
        match self {
            RiskLevel::Critical => Some(SituationType::Emergency),
            RiskLevel::High => Some(SituationType::Crisis),
            RiskLevel::Medium => Some(SituationType::Support),
            RiskLevel::Low => None,
        }
    }

    pub fn demoted(&self) -> RiskLevel {
        match self {
            RiskLevel::Critical => RiskLevel::High,
            RiskLevel::High => RiskLevel::Medium,
            RiskLevel::Medium | RiskLevel::Low => RiskLevel::Low,
        }
    }
}

impl PartialOrd for RiskLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RiskLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.severity_rank().cmp(&other.severity_rank())
    }
}

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(RiskLevel::Critical),
            "HIGH" => Ok(RiskLevel::High),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "LOW" => Ok(RiskLevel::Low),
            _ => Err(UnknownRiskLevel),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownRiskLevel;

impl fmt::Display for UnknownRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown risk level")
    }
}

impl std::error::Error for UnknownRiskLevel {}

/// Routing tier used to query the resource registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SituationType {
    Emergency,
    Crisis,
    Support,
}

impl SituationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SituationType::Emergency => "emergency",
            SituationType::Crisis => "crisis",
            SituationType::Support => "support",
        }
    }
}

impl FromStr for SituationType {
    type Err = UnknownSituation;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "emergency" => Ok(SituationType::Emergency),
            "crisis" => Ok(SituationType::Crisis),
            "support" => Ok(SituationType::Support),
            _ => Err(UnknownSituation),
        }
    }
}

impl fmt::Display for SituationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownSituation;

impl fmt::Display for UnknownSituation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown situation type")
    }
}

impl std::error::Error for UnknownSituation {}

/// Topical sub-tag refining a situation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicTag {
    MentalHealth,
    DomesticViolence,
    SelfHarm,
    Substance,
    YouthAcademic,
    FamilyViolence,
    General,
}

impl TopicTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicTag::MentalHealth => "mental_health",
            TopicTag::DomesticViolence => "domestic_violence",
            TopicTag::SelfHarm => "self_harm",
            TopicTag::Substance => "substance",
            TopicTag::YouthAcademic => "youth_academic",
            TopicTag::FamilyViolence => "family_violence",
            TopicTag::General => "general",
        }
    }
}

impl FromStr for TopicTag {
    type Err = UnknownTopic;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mental_health" => Ok(TopicTag::MentalHealth),
            "domestic_violence" => Ok(TopicTag::DomesticViolence),
            "self_harm" => Ok(TopicTag::SelfHarm),
            "substance" => Ok(TopicTag::Substance),
            "youth_academic" => Ok(TopicTag::YouthAcademic),
            "family_violence" => Ok(TopicTag::FamilyViolence),
            "general" => Ok(TopicTag::General),
            _ => Err(UnknownTopic),
        }
    }
}

impl fmt::Display for TopicTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownTopic;

impl fmt::Display for UnknownTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown topic tag")
    }
}

impl std::error::Error for UnknownTopic {}

/// Contact channel kinds a resource can be reached through. Also the value
/// space of the `type` argument of `check_hallucination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Phone,
    Text,
    Website,
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Phone => "phone",
            ChannelKind::Text => "text",
            ChannelKind::Website => "website",
            ChannelKind::Email => "email",
        }
    }
}

impl FromStr for ChannelKind {
    type Err = UnknownChannelKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "phone" => Ok(ChannelKind::Phone),
            "text" => Ok(ChannelKind::Text),
            "website" | "url" => Ok(ChannelKind::Website),
            "email" => Ok(ChannelKind::Email),
            _ => Err(UnknownChannelKind),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownChannelKind;

impl fmt::Display for UnknownChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown channel kind")
    }
}

impl std::error::Error for UnknownChannelKind {}
