use elemcraft_core::{canonicalize, CanonicalPair, Element, PairRecord, PlacedElement};
use serde_json::json;

#[test]
fn element_serializes_with_discovered_flag() {
    let mut steam = Element::new("💨", "steam");
    steam.discovered = true;

    let value = serde_json::to_value(&steam).unwrap();
    assert_eq!(
        value,
        json!({ "emoji": "💨", "text": "steam", "discovered": true })
    );
}

#[test]
fn element_without_discovered_flag_deserializes_as_known() {
    let element: Element = serde_json::from_str(r#"{"emoji":"🔥","text":"fire"}"#).unwrap();
    assert_eq!(element, Element::new("🔥", "fire"));
    assert!(!element.discovered);
}

#[test]
fn placed_element_id_serializes_as_plain_uuid() {
    let placed = PlacedElement::new(&Element::new("💧", "water"), 12.5, 40.0);

    let value = serde_json::to_value(&placed).unwrap();
    assert_eq!(value["id"], json!(placed.id.as_uuid().to_string()));
    assert_eq!(value["x"], json!(12.5));
    assert_eq!(value["is_loading"], json!(false));

    let back: PlacedElement = serde_json::from_value(value).unwrap();
    assert_eq!(back, placed);
}

#[test]
fn canonical_pair_is_order_and_case_independent() {
    let a: CanonicalPair = canonicalize("Water", "fire");
    let b = canonicalize(" fire", "WATER ");
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "(fire, water)");
    assert!(canonicalize("fire", "Fire").is_self_pair());
}

#[test]
fn pair_record_uses_canonical_words() {
    let record = PairRecord::new(canonicalize("wind", "earth"), "🌪️", "Dust Storm").unwrap();
    assert_eq!(record.word1, "earth");
    assert_eq!(record.word2, "wind");
    assert_eq!(record.text, "dust storm");
    assert!(record.element(true).discovered);
}
