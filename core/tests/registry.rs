use chrono::{Days, NaiveDate, TimeZone, Utc};

use sentinel::registry::{
    ContactChannel, KnownFabrication, RegistryPersistence, Resource, ResourceStatus,
    ResourceRegistry, ServiceTier, VerificationEvent, VerificationOutcome, seed_state,
};
use sentinel::registry::error::RegistryErrorKind;
use sentinel::types::{ChannelKind, Region, SituationType, TopicTag};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 1).expect("date must be valid")
}

fn registry() -> ResourceRegistry {
    ResourceRegistry::new(seed_state(today()), today()).expect("seed registry must build")
}

fn resource(id: &str, region: Region, name: &str, number: &str) -> Resource {
    let verified_on = today();
    Resource {
        resource_id: id.to_string(),
        region,
        service_name: name.to_string(),
        tier: ServiceTier::Hotline,
        channels: vec![ContactChannel::phone(number)],
        hours: "24/7".to_string(),
        languages: vec!["English".to_string()],
        description: String::new(),
        topics: vec![TopicTag::MentalHealth],
        verified_on,
        verified_by: "test".to_string(),
        verification_method: "manual_call".to_string(),
        next_verification_due: verified_on
            .checked_add_days(Days::new(30))
            .expect("due date must fit"),
        status: ResourceStatus::Active,
    }
}

#[test]
fn given_nz_emergency_lookup_then_emergency_tier_leads_the_ordering() {
    let snapshot = registry().snapshot();
    let resources = snapshot.lookup(Region::Nz, SituationType::Emergency, None);
    assert!(!resources.is_empty());
    assert_eq!(resources[0].tier, ServiceTier::Emergency);
    assert_eq!(resources[0].service_name, "Emergency Services");
}

#[test]
fn given_support_lookup_then_emergency_services_are_routed_around() {
    let snapshot = registry().snapshot();
    let resources = snapshot.lookup(Region::Nz, SituationType::Support, None);
    assert!(!resources.is_empty());
    assert!(resources.iter().all(|r| r.tier != ServiceTier::Emergency));
}

#[test]
fn given_unknown_region_bank_then_empty_lookup_is_a_legal_result() {
    let state = sentinel::registry::RegistryState {
        resources: vec![resource("nz/only", Region::Nz, "Only Line", "0800 111 222")],
        fabrications: Vec::new(),
        verification_log: Vec::new(),
    };
    let registry = ResourceRegistry::new(state, today()).expect("registry must build");
    let resources = registry
        .snapshot()
        .lookup(Region::Au, SituationType::Crisis, None);
    assert!(resources.is_empty());
}

#[test]
fn given_blocklisted_channel_value_when_upserting_then_fabrication_conflict() {
    let registry = registry();
    let err = registry
        .upsert_resource(
            resource("nz/fake", Region::Nz, "Fake Line", "0800 543 800"),
            today(),
        )
        .expect_err("upsert must be refused");
    assert_eq!(err.kind, RegistryErrorKind::FabricationConflict);
}

#[test]
fn given_verification_older_than_window_when_upserting_then_stale_verification() {
    let registry = registry();
    let mut stale = resource("nz/stale", Region::Nz, "Stale Line", "0800 999 888");
    stale.verified_on = today().checked_sub_days(Days::new(45)).expect("date must fit");
    stale.next_verification_due = stale
        .verified_on
        .checked_add_days(Days::new(30))
        .expect("date must fit");
    let err = registry
        .upsert_resource(stale, today())
        .expect_err("upsert must be refused");
    assert_eq!(err.kind, RegistryErrorKind::StaleVerification);
}

#[test]
fn given_duplicate_region_and_name_when_upserting_then_refused() {
    let registry = registry();
    let err = registry
        .upsert_resource(
            resource("nz/other-id", Region::Nz, "Lifeline Aotearoa", "0800 222 333"),
            today(),
        )
        .expect_err("duplicate (region, service_name) must be refused");
    assert_eq!(err.kind, RegistryErrorKind::InvalidRecord);
}

#[test]
fn given_ok_verification_then_dates_roll_forward_and_replay_is_a_noop() {
    let registry = registry();
    let attempt_at = Utc.with_ymd_and_hms(2026, 7, 2, 9, 30, 0).unwrap();
    let event = VerificationEvent {
        resource_id: "nz/need-to-talk".to_string(),
        attempt_at,
        verifier_id: "verifier-1".to_string(),
        method: "manual_call".to_string(),
        outcome: VerificationOutcome::Ok,
        notes: String::new(),
    };

    assert!(registry.record_verification(event.clone()).expect("first record must append"));
    assert!(
        !registry.record_verification(event).expect("replay must be accepted"),
        "idempotent replay must not append twice"
    );

    let snapshot = registry.snapshot();
    let resource = snapshot.resource("nz/need-to-talk").expect("resource must exist");
    assert_eq!(resource.verified_on, attempt_at.date_naive());
    assert_eq!(
        resource.next_verification_due,
        attempt_at.date_naive().checked_add_days(Days::new(30)).unwrap()
    );
    assert_eq!(snapshot.state.verification_log.len(), 1);
}

#[test]
fn given_unreachable_outcome_then_resource_degrades_with_next_day_recheck() {
    let registry = registry();
    let attempt_at = Utc.with_ymd_and_hms(2026, 7, 2, 9, 30, 0).unwrap();
    registry
        .record_verification(VerificationEvent {
            resource_id: "nz/lifeline".to_string(),
            attempt_at,
            verifier_id: "verifier-1".to_string(),
            method: "manual_call".to_string(),
            outcome: VerificationOutcome::Unreachable,
            notes: String::new(),
        })
        .expect("record must append");

    let snapshot = registry.snapshot();
    let resource = snapshot.resource("nz/lifeline").expect("resource must exist");
    assert_eq!(resource.status, ResourceStatus::Degraded);
    assert_eq!(
        resource.next_verification_due,
        attempt_at.date_naive().checked_add_days(Days::new(1)).unwrap()
    );
    assert!(
        !snapshot
            .lookup(Region::Nz, SituationType::Crisis, None)
            .iter()
            .any(|r| r.resource_id == "nz/lifeline"),
        "degraded resources must not be served"
    );
}

#[test]
fn given_fabrication_matching_active_channel_then_fabrication_wins_and_row_degrades() {
    let registry = registry();
    registry
        .insert_fabrication(KnownFabrication {
            value: "0800 543 354".to_string(),
            kind: ChannelKind::Phone,
            first_observed: today(),
            last_observed: today(),
            origin_model: None,
            notes: "flagged for operator review".to_string(),
        })
        .expect("fabrication insert must succeed");

    let snapshot = registry.snapshot();
    let check = snapshot.is_fabrication("0800 543 354", ChannelKind::Phone, Some(Region::Nz));
    assert!(check.is_fabrication);
    assert_eq!(
        snapshot.resource("nz/lifeline").expect("row must stay present").status,
        ResourceStatus::Degraded
    );
}

#[test]
fn given_retired_resource_then_row_stays_resolvable_but_unlisted() {
    let registry = registry();
    registry
        .retire_resource("nz/youthline")
        .expect("retire must succeed");

    let snapshot = registry.snapshot();
    assert_eq!(
        snapshot.resource("nz/youthline").expect("row must remain").status,
        ResourceStatus::Retired
    );
    assert!(
        !snapshot
            .lookup(Region::Nz, SituationType::Crisis, Some(TopicTag::YouthAcademic))
            .iter()
            .any(|r| r.resource_id == "nz/youthline")
    );
}

#[test]
fn given_fabrication_check_with_known_region_then_alternative_is_suggested() {
    let snapshot = registry().snapshot();
    let check = snapshot.is_fabrication("0800 543 800", ChannelKind::Phone, Some(Region::Nz));
    assert!(check.is_fabrication);
    let alternative = check
        .suggested_alternative
        .expect("a verified alternative must be suggested");
    assert_eq!(alternative.region, Region::Nz);
}

#[test]
fn given_saved_state_when_reloaded_then_contents_round_trip() {
    let dir = std::env::temp_dir().join(format!(
        "sentinel-registry-test-{}",
        uuid::Uuid::now_v7()
    ));
    let path = dir.join("registry.json");
    let persistence = RegistryPersistence::new(path.clone());

    let state = seed_state(today());
    persistence.save(&state).expect("save must succeed");
    let reloaded = persistence
        .load()
        .expect("load must succeed")
        .expect("state must exist");
    assert_eq!(state, reloaded);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_dir(&dir);
}

#[test]
fn given_snapshot_in_hand_then_writer_swaps_do_not_tear_it() {
    let registry = registry();
    let before = registry.snapshot();
    let generation = before.generation;

    registry
        .retire_resource("nz/alcohol-drug")
        .expect("retire must succeed");

    assert_eq!(before.generation, generation);
    assert_eq!(
        before
            .resource("nz/alcohol-drug")
            .expect("old snapshot must keep the row")
            .status,
        ResourceStatus::Active
    );
    assert!(registry.snapshot().generation > generation);
}

#[test]
fn given_corrupt_state_then_registry_refuses_to_serve() {
    let mut state = seed_state(today());
    let clone = state.resources[0].clone();
    state.resources.push(clone);
    let err = ResourceRegistry::new(state, today()).expect_err("corrupt state must be refused");
    assert_eq!(err.kind, RegistryErrorKind::Corrupt);
}
