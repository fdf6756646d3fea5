use std::collections::BTreeSet;

use tracing::debug;

use crate::container::{ContainerLayout, SaveContainer};
use crate::field::{DecodedBuffer, Field};
use crate::head::{self, HeadRecord};
use crate::keys::KeyMaterial;
use crate::memcard::{CardImage, SaveEntry};
use crate::schema::{self, ABILITY_COUNT, EntityModel, FieldId, PLAYER_COUNT, SectionSpan, TEAM_COUNT};
use crate::text::Lookup;

use super::error::{CoreError, CoreErrorCode};
use super::types::{
    AbilityView, ClubView, FieldSnapshot, FieldValue, GameDate, HeadView, OtherPlayerView,
    OtherTeamView, PlayerView, SlotSummary, TownView,
};

const CLUB_YEAR: &str = "club.year";
const OTHER_TEAM_PLAYERS: usize = 0x19;
const STYLE_BITS: i64 = 64;

#[derive(Debug, Clone)]
pub struct Engine {
    keys: KeyMaterial,
    lookup: Lookup,
    layout: ContainerLayout,
}

#[derive(Debug)]
pub struct Session {
    name: String,
    keys: KeyMaterial,
    lookup: Lookup,
    container: SaveContainer,
    buffer: DecodedBuffer,
    model: EntityModel,
    dirty: BTreeSet<FieldId>,
    head: Option<HeadRecord>,
    head_verified: bool,
}

impl Engine {
    pub fn new(keys: KeyMaterial, lookup: Lookup) -> Self {
        Self {
            keys,
            lookup,
            layout: ContainerLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: ContainerLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &ContainerLayout {
        &self.layout
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    pub fn list_slots(&self, image: &CardImage) -> Result<Vec<SlotSummary>, CoreError> {
        let entries = image.read_save_entries()?;
        Ok(entries.iter().map(|entry| self.summarize(entry)).collect())
    }

    pub fn open_slot(&self, image: &CardImage, name: &str) -> Result<Session, CoreError> {
        let entry = image.read_save_entry(name)?;
        self.open_entry(entry)
    }

    /// Verifies, decrypts and decodes one save. Nothing is editable unless
    /// every format check passed.
    pub fn open_entry(&self, entry: SaveEntry) -> Result<Session, CoreError> {
        let container = SaveContainer::parse(self.layout, &entry.main_bytes)?;
        container.verify(&self.keys.checksum)?;
        let buffer = container.decrypt(&self.keys.cipher)?;
        let model = schema::decode(&buffer)?;

        let head = HeadRecord::parse(&entry.head_bytes).ok();
        let head_verified = head
            .as_ref()
            .is_some_and(|h| h.verify(&self.keys.checksum).is_ok());
        if !head_verified {
            debug!(slot = %entry.name, "head record did not verify; head edits disabled");
        }

        Ok(Session {
            name: entry.name,
            keys: self.keys.clone(),
            lookup: self.lookup.clone(),
            container,
            buffer,
            model,
            dirty: BTreeSet::new(),
            head,
            head_verified,
        })
    }

    fn summarize(&self, entry: &SaveEntry) -> SlotSummary {
        let head = HeadRecord::parse(&entry.head_bytes).ok();
        SlotSummary {
            name: entry.name.clone(),
            main_len: entry.main_bytes.len(),
            club_name: head
                .as_ref()
                .map(|h| self.lookup.decode(h.raw(head::CLUB_NAME))),
            year: head.as_ref().map(|h| h.int(head::YEAR) as u16),
            month: head.as_ref().map(|h| h.int(head::MONTH) as u8),
            head_verified: head
                .as_ref()
                .is_some_and(|h| h.verify(&self.keys.checksum).is_ok()),
            modified: entry.modified,
        }
    }
}

impl Session {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &EntityModel {
        &self.model
    }

    pub fn layout(&self) -> &[SectionSpan] {
        self.model.sections()
    }

    pub fn buffer(&self) -> &DecodedBuffer {
        &self.buffer
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty() || self.head.as_ref().is_some_and(HeadRecord::is_dirty)
    }

    pub fn dirty_paths(&self) -> Vec<&str> {
        self.dirty.iter().map(|&id| self.model.path(id)).collect()
    }

    // ---- Read views ---------------------------------------------------

    pub fn int(&self, path: &str) -> Result<i64, CoreError> {
        Ok(self.model.int(path)?)
    }

    pub fn text(&self, path: &str) -> Result<String, CoreError> {
        Ok(self.lookup.decode(self.model.bytes(path)?))
    }

    pub fn club(&self) -> Result<ClubView, CoreError> {
        Ok(ClubView {
            date: GameDate {
                year: self.int("club.year")?,
                month: self.int("club.month")?,
                date: self.int("club.date")?,
                day: self.int("club.day")?,
            },
            funds: self.int("club.funds")?,
            manager_name: self.text("club.manager_name")?,
            club_name: self.text("club.club_name")?,
            difficulty: self.int("club.difficulty")?,
            seed: self.int("club.seed")?,
        })
    }

    pub fn player(&self, index: usize) -> Result<PlayerView, CoreError> {
        check_index("player", index, PLAYER_COUNT)?;
        let p = |name: &str| format!("team.players[{index}].{name}");
        let mut abilities = Vec::with_capacity(ABILITY_COUNT);
        for a in 0..ABILITY_COUNT {
            let at = |name: &str| p(&format!("abilities[{a}].{name}"));
            abilities.push(AbilityView {
                index: a,
                current: self.int(&at("current"))?,
                current_max: self.int(&at("current_max"))?,
                max: self.int(&at("max"))?,
            });
        }
        Ok(PlayerView {
            index,
            id: self.int(&p("id"))?,
            name: self.text(&p("name"))?,
            age: self.int(&p("age"))?,
            pos: self.int(&p("pos"))?,
            number: self.int(&p("number"))?,
            born: self.int(&p("born"))?,
            rank: self.int(&p("rank"))?,
            height: self.int(&p("height"))?,
            foot: self.int(&p("foot"))?,
            style: self.int(&p("style"))?,
            salary: self.int(&p("salary"))?,
            abroad_times: self.int(&p("abroad_times"))?,
            grow_type_phy: self.int(&p("grow_type_phy"))?,
            grow_type_tec: self.int(&p("grow_type_tec"))?,
            grow_type_sys: self.int(&p("grow_type_sys"))?,
            learned_styles: self.learned_styles(index)?,
            abilities,
        })
    }

    pub fn players(&self) -> Result<Vec<PlayerView>, CoreError> {
        (0..PLAYER_COUNT).map(|i| self.player(i)).collect()
    }

    pub fn town(&self) -> Result<TownView, CoreError> {
        let t = |name: &str| self.int(&format!("town.{name}"));
        Ok(TownView {
            living: t("living")?,
            economy: t("economy")?,
            sports: t("sports")?,
            env: t("env")?,
            population: t("population")?,
            price: t("price")?,
            traffic_level: t("traffic_level")?,
            soccer_pop: t("soccer_pop")?,
            soccer_level: t("soccer_level")?,
            town_type: t("town_type")?,
        })
    }

    pub fn other_team(&self, index: usize) -> Result<OtherTeamView, CoreError> {
        check_index("team", index, TEAM_COUNT)?;
        let t = |name: &str| format!("other_teams.teams[{index}].{name}");
        let mut players = Vec::with_capacity(OTHER_TEAM_PLAYERS);
        for j in 0..OTHER_TEAM_PLAYERS {
            let at = |name: &str| t(&format!("players[{j}].{name}"));
            players.push(OtherPlayerView {
                id: self.int(&at("id"))?,
                age: self.int(&at("age"))?,
                ability_graph: self.int(&at("ability_graph"))?,
                number: self.int(&at("number"))?,
            });
        }
        Ok(OtherTeamView {
            index,
            id: self.int(&t("id"))?,
            friendly: self.int(&t("friendly"))?,
            players,
        })
    }

    pub fn head(&self) -> Option<HeadView> {
        let head = self.head.as_ref()?;
        Some(HeadView {
            year: head.int(head::YEAR),
            month: head.int(head::MONTH),
            date: head.int(head::DATE),
            day: head.int(head::DAY),
            club_name: self.lookup.decode(head.raw(head::CLUB_NAME)),
            verified: self.head_verified,
        })
    }

    /// Every named field under `prefix`, in decode order.
    pub fn fields(&self, prefix: &str) -> Vec<FieldSnapshot> {
        self.model
            .with_prefix(prefix)
            .map(|(path, field)| FieldSnapshot {
                path: path.to_string(),
                bit_offset: field.bit_offset(),
                bit_length: field.bit_length(),
                value: match field {
                    Field::Int { .. } => FieldValue::Int(field.int().unwrap_or_default()),
                    Field::Str { bytes, .. } => FieldValue::Text(self.lookup.decode(bytes)),
                },
            })
            .collect()
    }

    // ---- Edits ----------------------------------------------------------

    /// Range-checks and stages an integer edit. Club year edits are mirrored
    /// into the head record and are refused while it is unverified.
    pub fn set_int(&mut self, path: &str, value: i64) -> Result<(), CoreError> {
        let id = self.model.id(path)?;
        if path == CLUB_YEAR {
            self.verified_head_mut()?;
        }
        self.model.field_mut(id).set_int(value)?;
        self.dirty.insert(id);
        if path == CLUB_YEAR {
            self.verified_head_mut()?.set_int(head::YEAR, value)?;
        }
        Ok(())
    }

    /// Encodes `text` with the session lookup and stages it, zero-padded to
    /// the field's fixed length.
    pub fn set_str(&mut self, path: &str, text: &str) -> Result<(), CoreError> {
        let id = self.model.id(path)?;
        let len = self.model.field(id).bytes().map(<[u8]>::len).ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::ValueOutOfRange,
                format!("{path} is an integer field"),
            )
        })?;
        let bytes = self.lookup.encode(text, len)?;
        self.model.field_mut(id).set_bytes(&bytes)?;
        self.dirty.insert(id);
        Ok(())
    }

    pub fn set_head_int(&mut self, name: &str, value: i64) -> Result<(), CoreError> {
        let field = head::int_field(name).ok_or_else(|| {
            CoreError::new(CoreErrorCode::NotFound, format!("head field {name:?}"))
        })?;
        self.verified_head_mut()?.set_int(field, value)?;
        Ok(())
    }

    pub fn set_player_position(&mut self, player: usize, pos: i64) -> Result<(), CoreError> {
        check_index("player", player, PLAYER_COUNT)?;
        self.set_int(&format!("team.players[{player}].pos"), pos)?;
        self.set_int(&format!("team.players[{player}].pos2"), pos)
    }

    pub fn set_player_born(&mut self, player: usize, born: i64) -> Result<(), CoreError> {
        check_index("player", player, PLAYER_COUNT)?;
        self.set_int(&format!("team.players[{player}].born"), born)?;
        self.set_int(&format!("team.players[{player}].born2"), born)
    }

    /// Equips a play style and marks it learned.
    pub fn set_player_style(&mut self, player: usize, style: i64) -> Result<(), CoreError> {
        check_index("player", player, PLAYER_COUNT)?;
        self.set_int(&format!("team.players[{player}].style"), style)?;
        self.set_int(&format!("team.players[{player}].style_equip"), style)?;
        self.learn_style(player, style)
    }

    /// Sets bit `style` across the two low learned-style words.
    pub fn learn_style(&mut self, player: usize, style: i64) -> Result<(), CoreError> {
        check_index("player", player, PLAYER_COUNT)?;
        if !(0..STYLE_BITS).contains(&style) {
            return Err(CoreError::new(
                CoreErrorCode::ValueOutOfRange,
                format!("style {style} is outside 0..{STYLE_BITS}"),
            ));
        }
        let learned = self.learned_styles(player)? | (1u64 << style);
        self.set_int(
            &format!("team.players[{player}].style_learned1"),
            (learned & 0xFFFF_FFFF) as i64,
        )?;
        self.set_int(
            &format!("team.players[{player}].style_learned2"),
            (learned >> 32) as i64,
        )
    }

    // ---- Write-back -----------------------------------------------------

    /// Patches every staged field into the plaintext, re-enciphers and
    /// returns the rebuilt container.
    pub fn to_main_bytes(&mut self) -> Result<Vec<u8>, CoreError> {
        for &id in &self.dirty {
            self.buffer.patch(self.model.field(id))?;
        }
        self.container
            .reseal(&self.buffer, &self.keys.cipher, &self.keys.checksum)?;
        Ok(self.container.to_bytes())
    }

    /// The rebuilt head record, only when a head field changed.
    pub fn to_head_bytes(&self) -> Option<Vec<u8>> {
        self.head
            .as_ref()
            .filter(|h| h.is_dirty())
            .map(|h| h.to_bytes(&self.keys.checksum))
    }

    pub fn write_to_image(&mut self, image: &CardImage) -> Result<(), CoreError> {
        let main = self.to_main_bytes()?;
        let head = self.to_head_bytes();
        image.write_save_entry(&self.name, &main, head.as_deref())?;
        Ok(())
    }

    // ---- Helpers --------------------------------------------------------

    fn learned_styles(&self, player: usize) -> Result<u64, CoreError> {
        let low = self.int(&format!("team.players[{player}].style_learned1"))? as u64;
        let high = self.int(&format!("team.players[{player}].style_learned2"))? as u64;
        Ok((high << 32) | low)
    }

    fn verified_head_mut(&mut self) -> Result<&mut HeadRecord, CoreError> {
        match self.head.as_mut() {
            Some(head) if self.head_verified => Ok(head),
            _ => Err(CoreError::new(
                CoreErrorCode::UnsupportedOperation,
                format!("head record of {:?} is missing or failed verification", self.name),
            )),
        }
    }
}

fn check_index(what: &str, index: usize, count: usize) -> Result<(), CoreError> {
    if index >= count {
        return Err(CoreError::new(
            CoreErrorCode::ValueOutOfRange,
            format!("{what} index {index} is outside 0..{count}"),
        ));
    }
    Ok(())
}
