/// Tests for the `#[derive(Trackable)]` macro: generated metadata,
/// generated accessors, and how the pieces feed the registry.
/// Run with: cargo test --test derive_trackable_tests

use chrono::{TimeZone, Utc};
use rustentitytrack::{
    EntityKey, EntityRef, FieldKind, Trackable, TrackableRegistry, TrackedValue,
};
use uuid::Uuid;

#[derive(Trackable)]
#[trackable(name = "Account")]
struct AccountRow {
    #[tracked(key)]
    id: Option<i64>,
    #[tracked]
    owner: String,
    #[tracked(ordered)]
    balance: f64,
    #[tracked]
    active: bool,
    #[tracked]
    opened_at: chrono::DateTime<Utc>,
    #[tracked(reference)]
    branch: Option<EntityRef>,
    #[tracked(references)]
    cards: Option<Vec<EntityRef>>,
    #[tracked(values)]
    tags: Vec<String>,
    // Untagged: invisible to tracking.
    cached_score: u32,
}

fn account() -> AccountRow {
    AccountRow {
        id: Some(5),
        owner: "alice".to_string(),
        balance: 12.5,
        active: true,
        opened_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        branch: None,
        cards: None,
        tags: vec!["retail".to_string()],
        cached_score: 99,
    }
}

#[test]
fn test_generated_descriptor_order_and_kinds() {
    let meta = AccountRow::trackable_type();
    assert_eq!(meta.name(), "Account");

    let kinds: Vec<(&str, FieldKind)> = meta
        .fields()
        .iter()
        .map(|f| (f.name(), f.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("owner", FieldKind::Scalar),
            ("balance", FieldKind::Ordered),
            ("active", FieldKind::Scalar),
            ("opened_at", FieldKind::Scalar),
            ("branch", FieldKind::Reference),
            ("cards", FieldKind::ReferenceCollection),
            ("tags", FieldKind::ValueCollection),
        ]
    );
}

#[test]
fn test_generated_accessors() {
    let row = account();
    assert_eq!(row.entity_type(), "Account");
    assert_eq!(row.entity_key(), Some(EntityKey::Int(5)));

    assert_eq!(
        row.field_value("owner").unwrap(),
        TrackedValue::scalar("alice")
    );
    assert_eq!(
        row.field_value("balance").unwrap(),
        TrackedValue::ordered(12.5f64)
    );
    assert_eq!(row.field_value("branch").unwrap(), TrackedValue::Absent);
    assert_eq!(row.field_value("cards").unwrap(), TrackedValue::Absent);
    assert!(matches!(
        row.field_value("tags").unwrap(),
        TrackedValue::Values(tags) if tags.len() == 1
    ));

    // The untagged field is not reachable through the trait.
    assert!(row.field_value("cached_score").is_err());
    assert!(row.field_value("nope").is_err());
}

#[test]
fn test_generated_reference_accessors_when_present() {
    let mut row = account();
    row.branch = Some(EntityRef::new("Branch", 3i64));
    row.cards = Some(vec![EntityRef::new("Card", 30i64)]);

    assert_eq!(
        row.field_value("branch").unwrap(),
        TrackedValue::Reference(EntityRef::new("Branch", 3i64))
    );
    assert_eq!(
        row.field_value("cards").unwrap(),
        TrackedValue::References(vec![EntityRef::new("Card", 30i64)])
    );
}

#[test]
fn test_transient_key_is_none() {
    let mut row = account();
    row.id = None;
    assert_eq!(row.entity_key(), None);
}

#[test]
fn test_descriptor_registers_cleanly() {
    let registry = TrackableRegistry::new()
        .with_type(AccountRow::trackable_type())
        .unwrap()
        .validated()
        .unwrap();
    assert!(registry.is_tracked("Account"));
    assert_eq!(
        registry.field_kind("Account", "cards").unwrap(),
        FieldKind::ReferenceCollection
    );
}

#[derive(Trackable)]
struct Device {
    #[tracked(key)]
    serial: Uuid,
    #[tracked]
    label: Option<String>,
}

#[test]
fn test_uuid_key_and_optional_scalar() {
    let serial = Uuid::new_v4();
    let device = Device {
        serial,
        label: None,
    };
    assert_eq!(device.entity_type(), "Device");
    assert_eq!(device.entity_key(), Some(EntityKey::Uuid(serial)));
    assert_eq!(device.field_value("label").unwrap(), TrackedValue::Absent);
}
