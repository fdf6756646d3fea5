use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotSummary {
    pub name: String,
    pub main_len: usize,
    pub club_name: Option<String>,
    pub year: Option<u16>,
    pub month: Option<u8>,
    pub head_verified: bool,
    pub modified: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameDate {
    pub year: i64,
    pub month: i64,
    pub date: i64,
    pub day: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClubView {
    pub date: GameDate,
    pub funds: i64,
    pub manager_name: String,
    pub club_name: String,
    pub difficulty: i64,
    pub seed: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbilityView {
    pub index: usize,
    pub current: i64,
    pub current_max: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerView {
    pub index: usize,
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub pos: i64,
    pub number: i64,
    pub born: i64,
    pub rank: i64,
    pub height: i64,
    pub foot: i64,
    pub style: i64,
    pub salary: i64,
    pub abroad_times: i64,
    pub grow_type_phy: i64,
    pub grow_type_tec: i64,
    pub grow_type_sys: i64,
    pub learned_styles: u64,
    pub abilities: Vec<AbilityView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TownView {
    pub living: i64,
    pub economy: i64,
    pub sports: i64,
    pub env: i64,
    pub population: i64,
    pub price: i64,
    pub traffic_level: i64,
    pub soccer_pop: i64,
    pub soccer_level: i64,
    pub town_type: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtherPlayerView {
    pub id: i64,
    pub age: i64,
    pub ability_graph: i64,
    pub number: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtherTeamView {
    pub index: usize,
    pub id: i64,
    pub friendly: i64,
    pub players: Vec<OtherPlayerView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadView {
    pub year: u64,
    pub month: u64,
    pub date: u64,
    pub day: u64,
    pub club_name: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSnapshot {
    pub path: String,
    pub bit_offset: u64,
    pub bit_length: u64,
    pub value: FieldValue,
}
