use crate::types::{Region, TopicTag};

/// How a matched pattern contributes to scoring. `ImmediateDanger` alone
/// elevates to CRITICAL; two `Hopelessness` signals (or one plus a
/// `Persistence` marker) make HIGH; `NegativeAffect` alone makes MEDIUM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    ImmediateDanger,
    Hopelessness,
    Persistence,
    NegativeAffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Humor,
    Hyperbole,
    MediaReference,
}

#[derive(Debug, Clone)]
pub struct PatternDef {
    pub id: &'static str,
    pub class: SignalClass,
    pub topic: TopicTag,
    pub phrases: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct FilterDef {
    pub id: &'static str,
    pub kind: FilterKind,
    pub phrases: Vec<&'static str>,
}

/// Region-parameterized vocabulary bank. A region switch replaces the
/// vocabulary, never the scoring logic.
#[derive(Debug, Clone)]
pub struct PatternBank {
    pub region: Region,
    pub patterns: Vec<PatternDef>,
    pub filters: Vec<FilterDef>,
}

impl PatternBank {
    pub fn for_region(region: Region) -> Self {
        let mut patterns = base_patterns();
        let mut filters = base_filters();
        extend_for_region(region, &mut patterns, &mut filters);
        Self {
            region,
            patterns,
            filters,
        }
    }
}

fn base_patterns() -> Vec<PatternDef> {
    let def = |id, class, topic, phrases: &[&'static str]| PatternDef {
        id,
        class,
        topic,
        phrases: phrases.to_vec(),
    };

    vec![
        def(
            "suicide/direct",
            SignalClass::ImmediateDanger,
            TopicTag::SelfHarm,
            &[
                "kill myself",
                "end my life",
                "take my own life",
                "want to die",
                "going to end it",
                "commit suicide",
            ],
        ),
        def(
            "suicide/plan_means",
            SignalClass::ImmediateDanger,
            TopicTag::SelfHarm,
            &[
                "i have the pills",
                "got the pills",
                "i have a rope",
                "bought a gun",
                "i have a plan",
                "wrote my note",
                "standing on the bridge",
            ],
        ),
        def(
            "suicide/timeline",
            SignalClass::ImmediateDanger,
            TopicTag::SelfHarm,
            &[
                "do it tonight",
                "end it tonight",
                "this is my last",
                "about to end it",
                "won't see tomorrow",
            ],
        ),
        def(
            "suicide/passive",
            SignalClass::Hopelessness,
            TopicTag::MentalHealth,
            &[
                "wish i was dead",
                "wish i were dead",
                "don't want to be here",
                "don't want to wake up",
                "no reason to live",
                "want it all to stop",
            ],
        ),
        def(
            "suicide/burden",
            SignalClass::Hopelessness,
            TopicTag::MentalHealth,
            &[
                "burden to everyone",
                "better off without me",
                "everyone would be happier without me",
            ],
        ),
        def(
            "suicide/reunion",
            SignalClass::Hopelessness,
            TopicTag::MentalHealth,
            &[
                "be with her again soon",
                "be with him again soon",
                "join them in heaven",
                "see my mum again soon",
                "see my dad again soon",
            ],
        ),
        def(
            "self_harm/ongoing",
            SignalClass::Hopelessness,
            TopicTag::SelfHarm,
            &[
                "cutting myself",
                "cut myself again",
                "hurting myself",
                "burned myself",
            ],
        ),
        def(
            "self_harm/loss_of_control",
            SignalClass::ImmediateDanger,
            TopicTag::SelfHarm,
            &["can't stop cutting", "cutting deeper", "can't stop hurting myself"],
        ),
        def(
            "dv/direct",
            SignalClass::ImmediateDanger,
            TopicTag::DomesticViolence,
            &[
                "he hit me",
                "she hit me",
                "he hits me",
                "she hits me",
                "threatened to kill me",
                "he strangled me",
                "afraid to go home",
            ],
        ),
        def(
            "dv/self_blame",
            SignalClass::Hopelessness,
            TopicTag::DomesticViolence,
            &[
                "it's my fault he gets angry",
                "i made him angry",
                "i deserve it when",
                "if i was better he wouldn't",
            ],
        ),
        def(
            "dv/coercive_control",
            SignalClass::Hopelessness,
            TopicTag::DomesticViolence,
            &[
                "won't let me leave",
                "won't let me see my friends",
                "checks my phone",
                "controls where i go",
            ],
        ),
        def(
            "dv/financial",
            SignalClass::Hopelessness,
            TopicTag::DomesticViolence,
            &[
                "took my bank card",
                "controls all the money",
                "no access to my own money",
            ],
        ),
        def(
            "psychosis/violence",
            SignalClass::ImmediateDanger,
            TopicTag::MentalHealth,
            &[
                "voices telling me to hurt",
                "voices are telling me to",
                "the voices want me to",
                "commanded me to kill",
            ],
        ),
        def(
            "substance/overdose",
            SignalClass::ImmediateDanger,
            TopicTag::Substance,
            &[
                "took too many pills",
                "took the whole bottle",
                "overdosed",
                "can't feel my arms after taking",
            ],
        ),
        def(
            "substance/relapse",
            SignalClass::Hopelessness,
            TopicTag::Substance,
            &["relapsed", "using again", "drinking again and can't stop"],
        ),
        def(
            "eating/restriction",
            SignalClass::Hopelessness,
            TopicTag::MentalHealth,
            &[
                "haven't eaten in days",
                "starving myself",
                "purging again",
                "can't make myself eat",
            ],
        ),
        def(
            "youth/exam_failure",
            SignalClass::NegativeAffect,
            TopicTag::YouthAcademic,
            &["failed my exams", "failed ncea", "failing school", "failed the year"],
        ),
        def(
            "youth/bullying",
            SignalClass::Hopelessness,
            TopicTag::YouthAcademic,
            &[
                "everyone at school hates me",
                "being bullied",
                "they bully me every day",
            ],
        ),
        def(
            "youth/rejection",
            SignalClass::Hopelessness,
            TopicTag::YouthAcademic,
            &[
                "parents kicked me out",
                "came out and they hate me",
                "family disowned me",
            ],
        ),
        def(
            "affect/persistence",
            SignalClass::Persistence,
            TopicTag::MentalHealth,
            &[
                "every day",
                "every single day",
                "for months",
                "for weeks",
                "never stops",
                "all the time",
            ],
        ),
        def(
            "affect/negative",
            SignalClass::NegativeAffect,
            TopicTag::MentalHealth,
            &[
                "hopeless",
                "worthless",
                "so empty",
                "can't cope",
                "overwhelmed",
                "feel trapped",
                "completely numb",
                "so alone",
                "can't keep going",
            ],
        ),
    ]
}

fn base_filters() -> Vec<FilterDef> {
    let def = |id, kind, phrases: &[&'static str]| FilterDef {
        id,
        kind,
        phrases: phrases.to_vec(),
    };

    vec![
        def(
            "filter/humor",
            FilterKind::Humor,
            &["lol", "lmao", "haha", "jk", "just kidding", "\u{1F602}"],
        ),
        def(
            "filter/hyperbole",
            FilterKind::Hyperbole,
            &[
                "is killing me",
                "dying to see",
                "dying to go",
                "to die for",
                "dying of laughter",
                "killed it",
            ],
        ),
        def(
            "filter/media",
            FilterKind::MediaReference,
            &[
                "in the movie",
                "in the film",
                "in this song",
                "the character",
                "in the book",
                "that episode",
            ],
        ),
    ]
}

/// Additional vocabulary per region: idiom sets and indigenous-language
/// phrases layered on top of the shared bank.
fn extend_for_region(region: Region, patterns: &mut [PatternDef], filters: &mut [FilterDef]) {
    let add = |patterns: &mut [PatternDef], id: &str, extra: &[&'static str]| {
        if let Some(def) = patterns.iter_mut().find(|p| p.id == id) {
            def.phrases.extend_from_slice(extra);
        }
    };
    let add_filter = |filters: &mut [FilterDef], id: &str, extra: &[&'static str]| {
        if let Some(def) = filters.iter_mut().find(|f| f.id == id) {
            def.phrases.extend_from_slice(extra);
        }
    };

    match region {
        Region::Nz => {
            add(
                patterns,
                "affect/negative",
                &["kei te pouri ahau", "kua pau taku hau", "absolutely gutted", "munted"],
            );
            add(patterns, "suicide/passive", &["kua ngaro taku wairua"]);
            add_filter(filters, "filter/hyperbole", &["packing a sad", "hard case"]);
        }
        Region::Au => {
            add(patterns, "affect/negative", &["absolutely cooked", "gutted"]);
            add_filter(filters, "filter/hyperbole", &["she'll be right", "flat out"]);
        }
        Region::Uk | Region::Ie => {
            add(patterns, "affect/negative", &["knackered and done", "gutted"]);
        }
        Region::Us | Region::Ca | Region::Global => {}
    }
}
