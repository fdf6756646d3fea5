//! Schema walker: drives the bit reader section by section over a decrypted
//! save and collects the named fields into an [`EntityModel`].

mod club;
mod league;
mod other_teams;
mod records;
mod team;
mod town;

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::bits::BitReader;
use crate::error::{Error, Result};
use crate::field::{DecodedBuffer, Field, Width};

pub use other_teams::TEAM_COUNT;
pub use team::{ABILITY_COUNT, PLAYER_COUNT, SCOUT_ABILITY_COUNT, SCOUT_CANDIDATE_COUNT, SCOUT_COUNT};

pub(crate) const U1: Width = Width::u(1);
pub(crate) const U2: Width = Width::u(2);
pub(crate) const U3: Width = Width::u(3);
pub(crate) const U4: Width = Width::u(4);
pub(crate) const U5: Width = Width::u(5);
pub(crate) const U6: Width = Width::u(6);
pub(crate) const U7: Width = Width::u(7);
pub(crate) const U8: Width = Width::u(8);
pub(crate) const U9: Width = Width::u(9);
pub(crate) const U10: Width = Width::u(10);
pub(crate) const U11: Width = Width::u(11);
pub(crate) const U14: Width = Width::u(14);
pub(crate) const U16: Width = Width::u(16);
pub(crate) const U21: Width = Width::u(21);
pub(crate) const U32: Width = Width::u(32);
pub(crate) const S3: Width = Width::s(3);
pub(crate) const S4: Width = Width::s(4);
pub(crate) const S5: Width = Width::s(5);
pub(crate) const S6: Width = Width::s(6);
pub(crate) const S7: Width = Width::s(7);
pub(crate) const S8: Width = Width::s(8);
pub(crate) const S16: Width = Width::s(16);

/// Length of a tail canary: its 4-byte pattern repeated four times.
pub const CANARY_LEN: usize = 16;

/// One top-level block of the save, in decode order.
pub struct Section {
    pub name: &'static str,
    /// Size of the section in the unpacked image.
    pub size: usize,
    read: fn(&mut Walker<'_>) -> Result<()>,
}

pub const SECTIONS: &[Section] = &[
    Section {
        name: "club",
        size: 0x13B4,
        read: club::read,
    },
    Section {
        name: "team",
        size: 0x276EC,
        read: team::read,
    },
    Section {
        name: "other_teams",
        size: 0x89C0,
        read: other_teams::read,
    },
    Section {
        name: "league",
        size: 0x340,
        read: league::read,
    },
    Section {
        name: "town",
        size: 0x17C,
        read: town::read,
    },
    Section {
        name: "record",
        size: 0x2E310,
        read: records::read_record,
    },
    Section {
        name: "schedule",
        size: 0xA14,
        read: records::read_schedule,
    },
    Section {
        name: "options",
        size: 0x38,
        read: records::read_options,
    },
];

/// Where a section lives in the packed payload and in the unpacked image.
/// Bit positions are relative to the start of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSpan {
    pub name: &'static str,
    pub start_bit: u64,
    pub end_bit: u64,
    pub unpacked_start: usize,
    pub unpacked_end: usize,
    pub canary_bit: Option<u64>,
}

/// Stable handle to a decoded field inside an [`EntityModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(usize);

/// Every named field of one decoded save, in decode order, plus the
/// section layout and the unpacked image built along the way.
#[derive(Debug, Clone)]
pub struct EntityModel {
    fields: Vec<Field>,
    paths: Vec<String>,
    index: HashMap<String, usize>,
    sections: Vec<SectionSpan>,
    unpacked: Vec<u8>,
}

impl EntityModel {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id(&self, path: &str) -> Result<FieldId> {
        self.index
            .get(path)
            .copied()
            .map(FieldId)
            .ok_or_else(|| Error::NotFound(format!("field {path:?}")))
    }

    pub fn get(&self, path: &str) -> Option<&Field> {
        self.index.get(path).map(|&i| &self.fields[i])
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.fields[id.0]
    }

    pub fn path(&self, id: FieldId) -> &str {
        &self.paths[id.0]
    }

    /// Integer value at `path`; `NotFound` for unknown paths and string fields.
    pub fn int(&self, path: &str) -> Result<i64> {
        self.get(path)
            .and_then(Field::int)
            .ok_or_else(|| Error::NotFound(format!("integer field {path:?}")))
    }

    pub fn bytes(&self, path: &str) -> Result<&[u8]> {
        self.get(path)
            .and_then(Field::bytes)
            .ok_or_else(|| Error::NotFound(format!("string field {path:?}")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.paths.iter().map(String::as_str).zip(self.fields.iter())
    }

    /// Fields whose path starts with `prefix`, in decode order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a Field)> {
        self.iter().filter(move |(path, _)| path.starts_with(prefix))
    }

    pub fn sections(&self) -> &[SectionSpan] {
        &self.sections
    }

    /// Byte-aligned image of every section as the game holds it in memory.
    pub fn unpacked(&self) -> &[u8] {
        &self.unpacked
    }
}

/// Cursor state shared by the section readers.
pub(crate) struct Walker<'a> {
    reader: BitReader<'a>,
    path: Vec<String>,
    hidden: usize,
    section_end: usize,
    canary_bit: Option<u64>,
    fields: Vec<Field>,
    paths: Vec<String>,
    index: HashMap<String, usize>,
}

impl<'a> Walker<'a> {
    fn new(reader: BitReader<'a>) -> Self {
        Self {
            reader,
            path: Vec::new(),
            hidden: 0,
            section_end: 0,
            canary_bit: None,
            fields: Vec::new(),
            paths: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn group(&mut self, widths: &[Width], total: usize) -> Result<Vec<Field>> {
        self.reader.unpack(widths, total)
    }

    /// Reads a group and binds the listed members by position.
    pub(crate) fn group_named(
        &mut self,
        widths: &[Width],
        total: usize,
        names: &[(usize, &str)],
    ) -> Result<()> {
        let fields = self.group(widths, total)?;
        for &(at, name) in names {
            self.bind(name, &fields[at]);
        }
        Ok(())
    }

    /// Reads a group and binds every member as `name[i]`.
    pub(crate) fn group_indexed(&mut self, widths: &[Width], total: usize, name: &str) -> Result<()> {
        let fields = self.group(widths, total)?;
        for (i, field) in fields.iter().enumerate() {
            self.bind(&format!("{name}[{i}]"), field);
        }
        Ok(())
    }

    pub(crate) fn int(&mut self, width: Width, total: usize) -> Result<Field> {
        let mut fields = self.reader.unpack(&[width], total)?;
        fields
            .pop()
            .ok_or_else(|| Error::format("empty single-value read"))
    }

    pub(crate) fn int_named(&mut self, width: Width, total: usize, name: &str) -> Result<()> {
        let field = self.int(width, total)?;
        self.bind(name, &field);
        Ok(())
    }

    pub(crate) fn string(&mut self, len: usize) -> Result<Field> {
        self.reader.unpack_str(len)
    }

    pub(crate) fn string_named(&mut self, len: usize, name: &str) -> Result<()> {
        let field = self.string(len)?;
        self.bind(name, &field);
        Ok(())
    }

    pub(crate) fn align(&mut self, total: usize) {
        self.reader.align(total);
    }

    /// Jumps to `bit` (payload-relative) and pads the unpacked image to the
    /// end of the current section.
    pub(crate) fn skip_to(&mut self, bit: u64) -> Result<()> {
        let total = self
            .section_end
            .checked_sub(self.reader.unpacked_len())
            .ok_or_else(|| {
                Error::format(format!(
                    "unpacked image overran its section end {:#x}",
                    self.section_end
                ))
            })?;
        self.reader.skip(bit, total);
        Ok(())
    }

    /// Closes the section with its tail canary. The packed cursor must sit at
    /// `end_bit` and the unpacked image must end exactly one canary short of
    /// the section size.
    pub(crate) fn canary(&mut self, pattern: [u8; 4], end_bit: u64) -> Result<()> {
        let at = self.reader.position();
        if at != end_bit {
            return Err(Error::format(format!(
                "tail canary {pattern:02X?} expected at bit {end_bit:#x}, cursor at {at:#x}"
            )));
        }
        self.reader.padding(&pattern.repeat(4), self.section_end)?;
        self.canary_bit = Some(at);
        Ok(())
    }

    /// Runs `f` with `segment` appended to the current field path.
    pub(crate) fn scope<T>(
        &mut self,
        segment: impl Into<String>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.path.push(segment.into());
        let out = f(self);
        self.path.pop();
        out
    }

    /// Runs `f` without binding any of the fields it reads.
    pub(crate) fn hidden<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.hidden += 1;
        let out = f(self);
        self.hidden -= 1;
        out
    }

    fn bind(&mut self, name: &str, field: &Field) {
        if self.hidden > 0 {
            return;
        }
        let mut path = self.path.join(".");
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(name);
        self.index.insert(path.clone(), self.fields.len());
        self.paths.push(path);
        self.fields.push(field.clone());
    }

    fn run(&mut self, section: &Section) -> Result<SectionSpan> {
        let start_bit = self.reader.position();
        let unpacked_start = self.reader.unpacked_len();
        self.section_end = unpacked_start + section.size;
        self.canary_bit = None;

        self.scope(section.name, |w| (section.read)(w))?;

        let unpacked_end = self.reader.unpacked_len();
        if unpacked_end != self.section_end {
            return Err(Error::format(format!(
                "section {} unpacked to {:#x} bytes, expected {:#x}",
                section.name,
                unpacked_end - unpacked_start,
                section.size
            )));
        }
        let span = SectionSpan {
            name: section.name,
            start_bit,
            end_bit: self.reader.position(),
            unpacked_start,
            unpacked_end,
            canary_bit: self.canary_bit,
        };
        debug!(
            section = span.name,
            start_bit = span.start_bit,
            end_bit = span.end_bit,
            "decoded section"
        );
        Ok(span)
    }
}

/// Decodes every section of the payload into an [`EntityModel`]. Canary or
/// accounting failures abort the decode.
pub fn decode(buffer: &DecodedBuffer) -> Result<EntityModel> {
    let reader = BitReader::with_origin(buffer.as_bytes(), buffer.origin_bit());
    let mut walker = Walker::new(reader);
    let mut sections = Vec::with_capacity(SECTIONS.len());
    for section in SECTIONS {
        sections.push(walker.run(section)?);
    }
    Ok(EntityModel {
        fields: walker.fields,
        paths: walker.paths,
        index: walker.index,
        sections,
        unpacked: walker.reader.into_unpacked(),
    })
}

/// Packed bytes the schema consumes after the payload start.
pub fn payload_len() -> usize {
    // options: one 32-bit word and thirteen flags after the schedule skip
    (records::SCHEDULE_END_BIT as usize + 32 + 13).div_ceil(8)
}

/// Decodes an all-zero payload to report where every section lands.
pub fn layout() -> Result<EntityModel> {
    let buffer = DecodedBuffer::new(vec![0u8; crate::field::DATA_START_BIAS + payload_len()])?;
    decode(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_payload_lands_every_section_on_its_boundaries() {
        let model = layout().expect("schema walks a zero payload");
        let spans = model.sections();
        assert_eq!(spans.len(), SECTIONS.len());

        let mut unpacked = 0;
        for (span, section) in spans.iter().zip(SECTIONS) {
            assert_eq!(span.unpacked_start, unpacked, "{}", span.name);
            unpacked += section.size;
            assert_eq!(span.unpacked_end, unpacked, "{}", span.name);
        }
        assert_eq!(model.unpacked().len(), 0x60678);

        let canaries: Vec<_> = spans.iter().filter_map(|s| s.canary_bit).collect();
        assert_eq!(canaries, [0x93E5, 0xC1B5C, 0x1045A2, 0x105750, 0x105B8D]);
        assert_eq!(spans[5].end_bit, 0x20D8F6);
        assert_eq!(spans[7].end_bit, 0x2110F8 + 45);
    }

    #[test]
    fn unpacked_image_carries_canaries() {
        let model = layout().expect("layout");
        let club_end = SECTIONS[0].size;
        assert_eq!(
            &model.unpacked()[club_end - CANARY_LEN..club_end],
            &[0xEC, 0x76, 0x13, 0x89].repeat(4)[..]
        );
    }

    #[test]
    fn named_paths_are_indexed() {
        let model = layout().expect("layout");
        for path in [
            "club.year",
            "club.funds",
            "club.manager_name",
            "club.difficulty",
            "team.players[0].id",
            "team.players[24].abilities[63].max",
            "team.players[3].style_learned2",
            "team.scouts[2].abilities[20]",
            "team.scout_candidates[9].age",
            "other_teams.teams[264].friendly",
            "other_teams.teams[0].players[24].number",
            "town.town_type",
        ] {
            assert!(model.get(path).is_some(), "{path}");
        }
        assert!(model.get("team.players[25].id").is_none());
        assert!(matches!(model.id("club.nothing"), Err(Error::NotFound(_))));
        assert_eq!(model.with_prefix("team.players[0].abilities[").count(), 64 * 3);
    }

    #[test]
    fn club_date_is_first_in_payload() {
        let model = layout().expect("layout");
        let origin = (crate::field::DATA_START_BIAS * 8) as u64;
        assert_eq!(model.get("club.year").map(Field::bit_offset), Some(origin));
        assert_eq!(model.get("club.month").map(Field::bit_offset), Some(origin + 14));
        assert_eq!(model.get("club.funds").map(Field::bit_offset), Some(origin + 26));
    }
}
