use std::fmt::Write as _;

use saka_core::core_api::{
    ClubView, CoreError, FieldSnapshot, FieldValue, HeadView, PlayerView, Session, SlotSummary,
    TownView,
};
use saka_core::schema::SectionSpan;
use serde_json::{Map as JsonMap, Value as JsonValue};

const SHEET_WIDTH: usize = 76;
const TABLE_NAME_WIDTH: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelection {
    pub club: bool,
    pub head: bool,
    pub town: bool,
    pub players: bool,
    pub layout: bool,
}

impl FieldSelection {
    pub fn is_any_selected(&self) -> bool {
        self.club || self.head || self.town || self.players || self.layout
    }
}

pub fn render_json_full(session: &Session, style: JsonStyle) -> Result<JsonValue, CoreError> {
    let all = FieldSelection {
        club: true,
        head: true,
        town: true,
        players: true,
        layout: true,
    };
    render_json_selected(session, &all, style)
}

pub fn render_json_selected(
    session: &Session,
    fields: &FieldSelection,
    style: JsonStyle,
) -> Result<JsonValue, CoreError> {
    match style {
        JsonStyle::CanonicalV1 => Ok(JsonValue::Object(selected_json(fields, session)?)),
    }
}

fn selected_json(
    fields: &FieldSelection,
    session: &Session,
) -> Result<JsonMap<String, JsonValue>, CoreError> {
    let mut out = JsonMap::new();
    out.insert(
        "slot".to_string(),
        JsonValue::String(session.name().to_string()),
    );
    if fields.club {
        out.insert("club".to_string(), club_to_json(&session.club()?));
    }
    if fields.head {
        out.insert(
            "head".to_string(),
            match session.head() {
                Some(head) => head_to_json(&head),
                None => JsonValue::Null,
            },
        );
    }
    if fields.town {
        out.insert("town".to_string(), town_to_json(&session.town()?));
    }
    if fields.players {
        out.insert(
            "players".to_string(),
            JsonValue::Array(session.players()?.iter().map(player_to_json).collect()),
        );
    }
    if fields.layout {
        out.insert("layout".to_string(), render_layout_json(session.layout()));
    }
    Ok(out)
}

fn club_to_json(club: &ClubView) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert(
        "date".to_string(),
        JsonValue::String(format_game_date(
            club.date.year,
            club.date.month,
            club.date.date,
        )),
    );
    m.insert("day".to_string(), JsonValue::from(club.date.day));
    m.insert("funds".to_string(), JsonValue::from(club.funds));
    m.insert(
        "club_name".to_string(),
        JsonValue::String(club.club_name.clone()),
    );
    m.insert(
        "manager_name".to_string(),
        JsonValue::String(club.manager_name.clone()),
    );
    m.insert("difficulty".to_string(), JsonValue::from(club.difficulty));
    m.insert("seed".to_string(), JsonValue::from(club.seed));
    JsonValue::Object(m)
}

fn head_to_json(head: &HeadView) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert(
        "date".to_string(),
        JsonValue::String(format_game_date(
            head.year as i64,
            head.month as i64,
            head.date as i64,
        )),
    );
    m.insert(
        "club_name".to_string(),
        JsonValue::String(head.club_name.clone()),
    );
    m.insert("verified".to_string(), JsonValue::Bool(head.verified));
    JsonValue::Object(m)
}

fn town_to_json(town: &TownView) -> JsonValue {
    let mut m = JsonMap::new();
    for (key, value) in town_rows(town) {
        m.insert(key.to_string(), JsonValue::from(value));
    }
    JsonValue::Object(m)
}

fn town_rows(town: &TownView) -> [(&'static str, i64); 10] {
    [
        ("living", town.living),
        ("economy", town.economy),
        ("sports", town.sports),
        ("env", town.env),
        ("population", town.population),
        ("price", town.price),
        ("traffic_level", town.traffic_level),
        ("soccer_pop", town.soccer_pop),
        ("soccer_level", town.soccer_level),
        ("town_type", town.town_type),
    ]
}

fn player_to_json(p: &PlayerView) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(p.index));
    m.insert("id".to_string(), JsonValue::from(p.id));
    m.insert("name".to_string(), JsonValue::String(p.name.clone()));
    m.insert("age".to_string(), JsonValue::from(p.age));
    m.insert("pos".to_string(), JsonValue::from(p.pos));
    m.insert("number".to_string(), JsonValue::from(p.number));
    m.insert("born".to_string(), JsonValue::from(p.born));
    m.insert("style".to_string(), JsonValue::from(p.style));
    m.insert(
        "learned_styles".to_string(),
        JsonValue::String(format!("{:#018x}", p.learned_styles)),
    );
    m.insert(
        "abilities".to_string(),
        JsonValue::Array(
            p.abilities
                .iter()
                .map(|a| JsonValue::from(vec![a.current, a.current_max, a.max]))
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

pub fn render_layout_json(spans: &[SectionSpan]) -> JsonValue {
    JsonValue::Array(
        spans
            .iter()
            .map(|s| {
                let mut m = JsonMap::new();
                m.insert("name".to_string(), JsonValue::String(s.name.to_string()));
                m.insert("start_bit".to_string(), JsonValue::from(s.start_bit));
                m.insert("end_bit".to_string(), JsonValue::from(s.end_bit));
                m.insert(
                    "unpacked_start".to_string(),
                    JsonValue::from(s.unpacked_start),
                );
                m.insert("unpacked_end".to_string(), JsonValue::from(s.unpacked_end));
                m.insert(
                    "canary_bit".to_string(),
                    match s.canary_bit {
                        Some(bit) => JsonValue::from(bit),
                        None => JsonValue::Null,
                    },
                );
                JsonValue::Object(m)
            })
            .collect(),
    )
}

pub fn render_fields_json(fields: &[FieldSnapshot]) -> JsonValue {
    let mut m = JsonMap::new();
    for field in fields {
        m.insert(field.path.clone(), field_value_to_json(&field.value));
    }
    JsonValue::Object(m)
}

fn field_value_to_json(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Int(v) => JsonValue::from(*v),
        FieldValue::Text(s) => JsonValue::String(s.clone()),
    }
}

pub fn render_slots_json(slots: &[SlotSummary]) -> JsonValue {
    JsonValue::Array(
        slots
            .iter()
            .map(|s| {
                let mut m = JsonMap::new();
                m.insert("name".to_string(), JsonValue::String(s.name.clone()));
                m.insert(
                    "club_name".to_string(),
                    s.club_name.clone().map_or(JsonValue::Null, JsonValue::String),
                );
                m.insert(
                    "year".to_string(),
                    s.year.map_or(JsonValue::Null, JsonValue::from),
                );
                m.insert(
                    "month".to_string(),
                    s.month.map_or(JsonValue::Null, JsonValue::from),
                );
                m.insert("head_verified".to_string(), JsonValue::Bool(s.head_verified));
                m.insert("main_len".to_string(), JsonValue::from(s.main_len));
                m.insert(
                    "modified".to_string(),
                    s.modified
                        .map_or(JsonValue::Null, |t| JsonValue::String(t.to_string())),
                );
                JsonValue::Object(m)
            })
            .collect(),
    )
}

// ---- Text --------------------------------------------------------------

pub fn render_slots_text(slots: &[SlotSummary]) -> String {
    let mut out = String::new();
    if slots.is_empty() {
        writeln!(&mut out, "no Sakatsuku 04 saves on this card")
            .expect("writing to String cannot fail");
        return out;
    }
    for s in slots {
        let date = match (s.year, s.month) {
            (Some(year), Some(month)) => format!("{year}/{month:02}"),
            _ => "----/--".to_string(),
        };
        let mark = if s.head_verified { "" } else { " (head unverified)" };
        let modified = s
            .modified
            .map_or_else(|| "-".repeat(19), |t| t.to_string());
        writeln!(
            &mut out,
            "{}  {}  {}  {}{}",
            s.name,
            date,
            modified,
            s.club_name.as_deref().unwrap_or("?"),
            mark
        )
        .expect("writing to String cannot fail");
    }
    out
}

pub fn render_fields_text(fields: &[FieldSnapshot]) -> String {
    let mut out = String::new();
    for field in fields {
        let value = match &field.value {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Text(s) => format!("{s:?}"),
        };
        writeln!(&mut out, "{} = {}", field.path, value).expect("writing to String cannot fail");
    }
    out
}

pub fn render_layout_text(spans: &[SectionSpan]) -> String {
    let mut out = String::new();
    writeln!(
        &mut out,
        "{:<12} {:>10} {:>10} {:>9} {:>9} {:>10}",
        "section", "start_bit", "end_bit", "unp_start", "unp_end", "canary"
    )
    .expect("writing to String cannot fail");
    for s in spans {
        let canary = s
            .canary_bit
            .map_or_else(|| "-".to_string(), |bit| format!("{bit:#x}"));
        writeln!(
            &mut out,
            "{:<12} {:>#10x} {:>#10x} {:>#9x} {:>#9x} {:>10}",
            s.name, s.start_bit, s.end_bit, s.unpacked_start, s.unpacked_end, canary
        )
        .expect("writing to String cannot fail");
    }
    out
}

/// Plain-text club record: date, club details, town and the first-team
/// squad.
pub fn render_club_sheet(session: &Session) -> Result<String, CoreError> {
    let club = session.club()?;
    let town = session.town()?;
    let players = session.players()?;

    let mut out = String::new();
    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(&mut out, "{}", centered_no_trailing("SAKATSUKU 04", SHEET_WIDTH))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "{}", centered_no_trailing("CLUB RECORD", SHEET_WIDTH))
        .expect("writing to String cannot fail");
    let date = format_game_date(club.date.year, club.date.month, club.date.date);
    writeln!(&mut out, "{}", centered_no_trailing(&date, SHEET_WIDTH))
        .expect("writing to String cannot fail");
    writeln!(&mut out).expect("writing to String cannot fail");

    let club_line = format!("  Club: {:<24}Manager: {}", club.club_name, club.manager_name);
    writeln!(&mut out, "{}", club_line.trim_end()).expect("writing to String cannot fail");
    writeln!(
        &mut out,
        " Funds: {:<24}Difficulty: {}",
        format_number_with_commas(club.funds),
        club.difficulty
    )
    .expect("writing to String cannot fail");
    writeln!(&mut out).expect("writing to String cannot fail");

    writeln!(&mut out, " ::: Town :::").expect("writing to String cannot fail");
    for pair in town_rows(&town).chunks(2) {
        let mut line = String::new();
        for (label, value) in pair {
            write!(line, "  {label:>14}: {value:<18}").expect("writing to String cannot fail");
        }
        writeln!(&mut out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }
    writeln!(&mut out).expect("writing to String cannot fail");

    writeln!(&mut out, " ::: Squad :::").expect("writing to String cannot fail");
    writeln!(
        &mut out,
        "  {:>2}  {:<w$} {:>3} {:>3} {:>3} {:>5}",
        "#",
        "Name",
        "Age",
        "Pos",
        "No.",
        "Style",
        w = TABLE_NAME_WIDTH
    )
    .expect("writing to String cannot fail");
    for p in players.iter().filter(|p| p.id != 0) {
        writeln!(
            &mut out,
            "  {:>2}  {:<w$} {:>3} {:>3} {:>3} {:>5}",
            p.index,
            p.name,
            p.age,
            p.pos,
            p.number,
            p.style,
            w = TABLE_NAME_WIDTH
        )
        .expect("writing to String cannot fail");
    }
    writeln!(&mut out).expect("writing to String cannot fail");
    Ok(out)
}

fn format_game_date(year: i64, month: i64, date: i64) -> String {
    format!("{year:04}-{month:02}-{date:02}")
}

fn format_number_with_commas(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn centered_no_trailing(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    format!("{}{}", " ".repeat(left), text)
}
