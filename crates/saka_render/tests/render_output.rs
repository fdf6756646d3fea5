#[path = "../../saka_core/tests/common/mod.rs"]
mod common;

use saka_core::core_api::{Engine, Session};
use saka_core::memcard::SaveEntry;
use saka_core::text::Lookup;
use saka_render::{
    FieldSelection, JsonStyle, render_club_sheet, render_fields_json, render_fields_text,
    render_json_full, render_json_selected, render_layout_text,
};

fn sample_session() -> Session {
    let entry = SaveEntry {
        name: common::SLOT_A.to_string(),
        modified: None,
        main_bytes: common::sample_container(),
        head_bytes: common::sample_head(2004, b"RUST FC"),
        icon_bytes: common::sample_icon(),
    };
    Engine::new(common::test_keys(), Lookup::new())
        .open_entry(entry)
        .expect("fixture should open")
}

fn keys(value: &serde_json::Value) -> Vec<&str> {
    value
        .as_object()
        .expect("json should be an object")
        .keys()
        .map(String::as_str)
        .collect()
}

#[test]
fn full_json_uses_canonical_top_level_order() {
    let session = sample_session();
    let value = render_json_full(&session, JsonStyle::CanonicalV1).expect("render");
    assert_eq!(
        keys(&value),
        vec!["slot", "club", "head", "town", "players", "layout"]
    );
    assert_eq!(
        keys(&value["club"]),
        vec![
            "date",
            "day",
            "funds",
            "club_name",
            "manager_name",
            "difficulty",
            "seed",
        ]
    );
    assert_eq!(value["club"]["funds"], common::CLUB_FUNDS);
    assert_eq!(value["club"]["date"], "2004-04-00");
    assert_eq!(value["head"]["verified"], true);
    assert_eq!(value["players"].as_array().map(Vec::len), Some(25));
    assert_eq!(value["players"][0]["name"], "TANAKA");
    assert_eq!(value["players"][0]["abilities"][0][0], 50);
    assert_eq!(value["layout"].as_array().map(Vec::len), Some(8));
}

#[test]
fn selected_json_keeps_only_requested_sections() {
    let session = sample_session();
    let fields = FieldSelection {
        town: true,
        club: true,
        ..FieldSelection::default()
    };
    assert!(fields.is_any_selected());
    let value = render_json_selected(&session, &fields, JsonStyle::CanonicalV1).expect("render");
    assert_eq!(keys(&value), vec!["slot", "club", "town"]);
    assert_eq!(value["town"]["population"], 250_000);
}

#[test]
fn club_sheet_contains_expected_sections() {
    let session = sample_session();
    let rendered = render_club_sheet(&session).expect("render");
    assert!(rendered.starts_with('\n'));
    assert!(rendered.contains("SAKATSUKU 04"));
    assert!(rendered.contains("Club: RUST FC"));
    assert!(rendered.contains("Funds: 123,456"));
    assert!(rendered.contains(" ::: Town :::"));
    assert!(rendered.contains("population: 250000"));
    assert!(rendered.contains("TANAKA"));
    assert!(rendered.lines().all(|line| line == line.trim_end()));
}

#[test]
fn field_dumps_follow_decode_order() {
    let session = sample_session();
    let fields = session.fields("club.");
    let value = render_fields_json(&fields);
    let names = keys(&value);
    assert_eq!(names[..4], ["club.year", "club.month", "club.date", "club.day"]);
    assert_eq!(value["club.club_name"], "RUST FC");

    let text = render_fields_text(&fields);
    assert!(text.contains("club.funds = 123456\n"));
    assert!(text.contains("club.club_name = \"RUST FC\"\n"));

    let layout = render_layout_text(session.layout());
    assert!(layout.starts_with("section"));
    assert!(layout.contains("club"));
    assert!(layout.contains("0x93e5"));
}
