use chrono::{Days, NaiveDate};

use crate::registry::store::RegistryState;
use crate::registry::types::{
    ContactChannel, KnownFabrication, Resource, ResourceStatus, ServiceTier,
    VERIFICATION_WINDOW_DAYS,
};
use crate::types::{ChannelKind, Region, TopicTag};

/// Literal emergency number per region, used as the last-resort substitution
/// when a lookup comes back empty. `Global` has no dialable literal; callers
/// fall back to routing guidance text instead.
pub fn emergency_number(region: Region) -> Option<&'static str> {
    match region {
        Region::Nz => Some("111"),
        Region::Au => Some("000"),
        Region::Us => Some("911"),
        Region::Uk => Some("999"),
        Region::Ca => Some("911"),
        Region::Ie => Some("999"),
        Region::Global => None,
    }
}

/// Region-agnostic guidance used when no literal may be emitted.
pub const GLOBAL_EMERGENCY_GUIDANCE: &str =
    "If you are in immediate danger, contact the emergency services for your country right now.";

/// Built-in verified registry contents. `today` anchors the verification
/// dates so the seed is never born stale.
pub fn seed_state(today: NaiveDate) -> RegistryState {
    let verified_on = today;
    let due = verified_on
        .checked_add_days(Days::new(VERIFICATION_WINDOW_DAYS))
        .unwrap_or(verified_on);

    let entry = |id: &str,
                 region: Region,
                 name: &str,
                 tier: ServiceTier,
                 channels: Vec<ContactChannel>,
                 hours: &str,
                 languages: Vec<&str>,
                 description: &str,
                 topics: Vec<TopicTag>| Resource {
        resource_id: id.to_string(),
        region,
        service_name: name.to_string(),
        tier,
        channels,
        hours: hours.to_string(),
        languages: languages.into_iter().map(str::to_string).collect(),
        description: description.to_string(),
        topics,
        verified_on,
        verified_by: "seed".to_string(),
        verification_method: "manual_call".to_string(),
        next_verification_due: due,
        status: ResourceStatus::Active,
    };

    let resources = vec![
        // New Zealand
        entry(
            "nz/emergency",
            Region::Nz,
            "Emergency Services",
            ServiceTier::Emergency,
            vec![ContactChannel::phone("111")],
            "24/7",
            vec!["English"],
            "Police, Fire, Ambulance",
            vec![TopicTag::General],
        ),
        entry(
            "nz/need-to-talk",
            Region::Nz,
            "Need to Talk?",
            ServiceTier::Hotline,
            vec![ContactChannel::phone("1737"), ContactChannel::text("1737")],
            "24/7",
            vec!["English", "Te Reo Maori"],
            "National mental health crisis line, call or text",
            vec![TopicTag::MentalHealth, TopicTag::SelfHarm],
        ),
        entry(
            "nz/lifeline",
            Region::Nz,
            "Lifeline Aotearoa",
            ServiceTier::Hotline,
            vec![ContactChannel::phone("0800 543 354")],
            "24/7",
            vec!["English"],
            "Counselling and crisis support",
            vec![TopicTag::MentalHealth, TopicTag::General],
        ),
        entry(
            "nz/shine",
            Region::Nz,
            "Shine Domestic Abuse Helpline",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("0508 744 633")],
            "9am-11pm daily",
            vec!["English"],
            "Domestic violence support and safety planning",
            vec![TopicTag::DomesticViolence, TopicTag::FamilyViolence],
        ),
        entry(
            "nz/womens-refuge",
            Region::Nz,
            "Women's Refuge",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("0800 733 843")],
            "24/7",
            vec!["English"],
            "Safe house and crisis support for women",
            vec![TopicTag::DomesticViolence, TopicTag::FamilyViolence],
        ),
        entry(
            "nz/youthline",
            Region::Nz,
            "Youthline",
            ServiceTier::Specialist,
            vec![
                ContactChannel::phone("0800 376 633"),
                ContactChannel::text("234"),
            ],
            "24/7",
            vec!["English"],
            "Youth support and counselling",
            vec![TopicTag::YouthAcademic],
        ),
        entry(
            "nz/alcohol-drug",
            Region::Nz,
            "Alcohol Drug Helpline",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("0800 787 797")],
            "24/7",
            vec!["English", "Te Reo Maori"],
            "Support for substance use",
            vec![TopicTag::Substance],
        ),
        entry(
            "nz/oranga-tamariki",
            Region::Nz,
            "Oranga Tamariki",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("0508 326 459")],
            "24/7",
            vec!["English", "Te Reo Maori"],
            "Child protection services",
            vec![TopicTag::FamilyViolence, TopicTag::YouthAcademic],
        ),
        // Australia
        entry(
            "au/emergency",
            Region::Au,
            "Emergency Services",
            ServiceTier::Emergency,
            vec![ContactChannel::phone("000")],
            "24/7",
            vec!["English"],
            "Police, Fire, Ambulance",
            vec![TopicTag::General],
        ),
        entry(
            "au/lifeline",
            Region::Au,
            "Lifeline Australia",
            ServiceTier::Hotline,
            vec![
                ContactChannel::phone("13 11 14"),
                ContactChannel::text("0477 13 11 14"),
            ],
            "24/7",
            vec!["English"],
            "Crisis support and suicide prevention",
            vec![TopicTag::MentalHealth, TopicTag::SelfHarm],
        ),
        entry(
            "au/beyond-blue",
            Region::Au,
            "Beyond Blue",
            ServiceTier::Specialist,
            vec![
                ContactChannel::phone("1300 22 4636"),
                ContactChannel::website("https://www.beyondblue.org.au"),
            ],
            "24/7",
            vec!["English"],
            "Anxiety and depression support",
            vec![TopicTag::MentalHealth],
        ),
        entry(
            "au/1800respect",
            Region::Au,
            "1800RESPECT",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1800 737 732")],
            "24/7",
            vec!["English"],
            "Domestic and family violence support",
            vec![TopicTag::DomesticViolence, TopicTag::FamilyViolence],
        ),
        entry(
            "au/kids-helpline",
            Region::Au,
            "Kids Helpline",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1800 55 1800")],
            "24/7",
            vec!["English"],
            "Support for young people aged 5-25",
            vec![TopicTag::YouthAcademic],
        ),
        entry(
            "au/suicide-callback",
            Region::Au,
            "Suicide Call Back Service",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1300 659 467")],
            "24/7",
            vec!["English"],
            "Professional suicide prevention counselling",
            vec![TopicTag::SelfHarm, TopicTag::MentalHealth],
        ),
        // United States
        entry(
            "us/emergency",
            Region::Us,
            "Emergency Services",
            ServiceTier::Emergency,
            vec![ContactChannel::phone("911")],
            "24/7",
            vec!["English", "Spanish"],
            "Police, Fire, EMS",
            vec![TopicTag::General],
        ),
        entry(
            "us/988-lifeline",
            Region::Us,
            "988 Suicide & Crisis Lifeline",
            ServiceTier::Hotline,
            vec![ContactChannel::phone("988"), ContactChannel::text("988")],
            "24/7",
            vec!["English", "Spanish"],
            "National suicide prevention, call or text",
            vec![TopicTag::MentalHealth, TopicTag::SelfHarm],
        ),
        entry(
            "us/crisis-text-line",
            Region::Us,
            "Crisis Text Line",
            ServiceTier::Hotline,
            vec![ContactChannel::text("741741")],
            "24/7",
            vec!["English", "Spanish"],
            "Text HOME to reach a crisis counselor",
            vec![TopicTag::MentalHealth],
        ),
        entry(
            "us/dv-hotline",
            Region::Us,
            "National Domestic Violence Hotline",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1-800-799-7233")],
            "24/7",
            vec!["English", "Spanish"],
            "Domestic violence support",
            vec![TopicTag::DomesticViolence, TopicTag::FamilyViolence],
        ),
        entry(
            "us/samhsa",
            Region::Us,
            "SAMHSA National Helpline",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1-800-662-4357")],
            "24/7",
            vec!["English", "Spanish"],
            "Substance use and mental health referrals",
            vec![TopicTag::Substance],
        ),
        entry(
            "us/trevor-project",
            Region::Us,
            "The Trevor Project",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1-866-488-7386")],
            "24/7",
            vec!["English"],
            "LGBTQ+ youth crisis support",
            vec![TopicTag::YouthAcademic],
        ),
        // United Kingdom
        entry(
            "uk/emergency",
            Region::Uk,
            "Emergency Services",
            ServiceTier::Emergency,
            vec![ContactChannel::phone("999")],
            "24/7",
            vec!["English"],
            "Police, Fire, Ambulance",
            vec![TopicTag::General],
        ),
        entry(
            "uk/samaritans",
            Region::Uk,
            "Samaritans",
            ServiceTier::Hotline,
            vec![ContactChannel::phone("116 123")],
            "24/7",
            vec!["English"],
            "Emotional support for anyone in distress",
            vec![TopicTag::MentalHealth, TopicTag::SelfHarm],
        ),
        entry(
            "uk/shout",
            Region::Uk,
            "Shout",
            ServiceTier::Hotline,
            vec![ContactChannel::text("85258")],
            "24/7",
            vec!["English"],
            "Text SHOUT to reach a trained volunteer",
            vec![TopicTag::MentalHealth],
        ),
        entry(
            "uk/papyrus",
            Region::Uk,
            "PAPYRUS HOPELINE247",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("0800 068 4141")],
            "24/7",
            vec!["English"],
            "Suicide prevention for under-35s",
            vec![TopicTag::YouthAcademic, TopicTag::SelfHarm],
        ),
        entry(
            "uk/refuge",
            Region::Uk,
            "National Domestic Abuse Helpline",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("0808 200 0247")],
            "24/7",
            vec!["English"],
            "Run by Refuge for women and children",
            vec![TopicTag::DomesticViolence, TopicTag::FamilyViolence],
        ),
        // Canada
        entry(
            "ca/emergency",
            Region::Ca,
            "Emergency Services",
            ServiceTier::Emergency,
            vec![ContactChannel::phone("911")],
            "24/7",
            vec!["English", "French"],
            "Police, Fire, EMS",
            vec![TopicTag::General],
        ),
        entry(
            "ca/988-helpline",
            Region::Ca,
            "988 Suicide Crisis Helpline",
            ServiceTier::Hotline,
            vec![ContactChannel::phone("988"), ContactChannel::text("988")],
            "24/7",
            vec!["English", "French"],
            "National suicide prevention",
            vec![TopicTag::MentalHealth, TopicTag::SelfHarm],
        ),
        entry(
            "ca/kids-help-phone",
            Region::Ca,
            "Kids Help Phone",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1-800-668-6868")],
            "24/7",
            vec!["English", "French"],
            "Youth crisis support",
            vec![TopicTag::YouthAcademic],
        ),
        // Ireland
        entry(
            "ie/emergency",
            Region::Ie,
            "Emergency Services",
            ServiceTier::Emergency,
            vec![ContactChannel::phone("999")],
            "24/7",
            vec!["English"],
            "Gardai, Fire, Ambulance",
            vec![TopicTag::General],
        ),
        entry(
            "ie/samaritans",
            Region::Ie,
            "Samaritans Ireland",
            ServiceTier::Hotline,
            vec![ContactChannel::phone("116 123")],
            "24/7",
            vec!["English"],
            "Emotional support for anyone in distress",
            vec![TopicTag::MentalHealth],
        ),
        entry(
            "ie/pieta",
            Region::Ie,
            "Pieta House",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1800 247 247")],
            "24/7",
            vec!["English"],
            "Suicide and self-harm crisis support",
            vec![TopicTag::SelfHarm, TopicTag::MentalHealth],
        ),
        entry(
            "ie/womens-aid",
            Region::Ie,
            "Women's Aid Ireland",
            ServiceTier::Specialist,
            vec![ContactChannel::phone("1800 341 900")],
            "24/7",
            vec!["English"],
            "Domestic violence support",
            vec![TopicTag::DomesticViolence, TopicTag::FamilyViolence],
        ),
        // Global: directory services only, never region-specific literals.
        entry(
            "global/find-a-helpline",
            Region::Global,
            "Find a Helpline",
            ServiceTier::Hotline,
            vec![ContactChannel::website("https://findahelpline.com")],
            "24/7",
            vec!["English"],
            "Directory of verified helplines by country",
            vec![TopicTag::General, TopicTag::MentalHealth],
        ),
        entry(
            "global/befrienders",
            Region::Global,
            "Befrienders Worldwide",
            ServiceTier::Hotline,
            vec![ContactChannel::website("https://www.befrienders.org")],
            "24/7",
            vec!["English"],
            "Worldwide network of emotional support centres",
            vec![TopicTag::General, TopicTag::MentalHealth],
        ),
    ];

    let fabrication = |value: &str, kind: ChannelKind, origin: Option<&str>, notes: &str| {
        KnownFabrication {
            value: value.to_string(),
            kind,
            first_observed: verified_on,
            last_observed: verified_on,
            origin_model: origin.map(str::to_string),
            notes: notes.to_string(),
        }
    };

    let fabrications = vec![
        fabrication(
            "0800 543 800",
            ChannelKind::Phone,
            None,
            "Does not exist; repeatedly produced as an NZ mental health line",
        ),
        fabrication(
            "0800 111 757",
            ChannelKind::Phone,
            None,
            "Defunct depression helpline number still emitted by models",
        ),
        fabrication(
            "1-800-273-8255",
            ChannelKind::Phone,
            None,
            "Former US lifeline number, replaced by 988",
        ),
        fabrication(
            "0800 543 801",
            ChannelKind::Phone,
            None,
            "Near-miss variant of a fabricated NZ line",
        ),
    ];

    RegistryState {
        resources,
        fabrications,
        verification_log: Vec::new(),
    }
}
