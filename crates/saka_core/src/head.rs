//! `head.dat`: the plain record the card browser shows next to the save icon.
//! Byte-aligned little-endian fields behind its own checksum.

use serde::Serialize;

use crate::checksum::ChecksumEngine;
use crate::error::{Error, Result};

const CHECKSUM_LEN: usize = 8;
pub const CLUB_NAME_LEN: usize = 0x15;
pub const MIN_LEN: usize = 24 + 2 * CLUB_NAME_LEN;

/// One plain field: byte offset and width inside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeadField {
    pub offset: usize,
    pub len: usize,
}

impl HeadField {
    const fn at(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }
}

pub const U1: HeadField = HeadField::at(8, 4);
pub const U2: HeadField = HeadField::at(12, 4);
pub const YEAR: HeadField = HeadField::at(16, 2);
pub const MONTH: HeadField = HeadField::at(18, 1);
pub const DATE: HeadField = HeadField::at(19, 1);
pub const DAY: HeadField = HeadField::at(20, 1);
pub const CLUB_NAME: HeadField = HeadField::at(24, CLUB_NAME_LEN);
pub const CLUB_NAME1: HeadField = HeadField::at(24 + CLUB_NAME_LEN, CLUB_NAME_LEN);

pub const INT_FIELDS: &[(&str, HeadField)] = &[
    ("u1", U1),
    ("u2", U2),
    ("year", YEAR),
    ("month", MONTH),
    ("date", DATE),
    ("day", DAY),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadRecord {
    bytes: Vec<u8>,
    dirty: bool,
}

impl HeadRecord {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_LEN {
            return Err(Error::Truncated {
                what: "head record (bytes)",
                need: MIN_LEN as u64,
                have: bytes.len() as u64,
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
            dirty: false,
        })
    }

    pub fn stored_checksum(&self) -> u64 {
        let mut word = [0u8; CHECKSUM_LEN];
        word.copy_from_slice(&self.bytes[..CHECKSUM_LEN]);
        u64::from_le_bytes(word)
    }

    pub fn verify(&self, checksum: &ChecksumEngine) -> Result<()> {
        checksum.check(
            &self.bytes[CHECKSUM_LEN..],
            self.stored_checksum(),
            "head record",
        )
    }

    pub fn int(&self, field: HeadField) -> u64 {
        let mut word = [0u8; 8];
        word[..field.len].copy_from_slice(&self.bytes[field.offset..field.offset + field.len]);
        u64::from_le_bytes(word)
    }

    pub fn set_int(&mut self, field: HeadField, value: i64) -> Result<()> {
        let max = (1u128 << (field.len * 8)) - 1;
        if value < 0 || value as u128 > max {
            return Err(Error::range(format!(
                "{value} does not fit {}-byte head field",
                field.len
            )));
        }
        let raw = (value as u64).to_le_bytes();
        self.bytes[field.offset..field.offset + field.len].copy_from_slice(&raw[..field.len]);
        self.dirty = true;
        Ok(())
    }

    pub fn raw(&self, field: HeadField) -> &[u8] {
        &self.bytes[field.offset..field.offset + field.len]
    }

    /// Replaces a string field, zero-padding to its fixed length.
    pub fn set_raw(&mut self, field: HeadField, value: &[u8]) -> Result<()> {
        if value.len() > field.len {
            return Err(Error::range(format!(
                "{} bytes do not fit {}-byte head field",
                value.len(),
                field.len
            )));
        }
        let slot = &mut self.bytes[field.offset..field.offset + field.len];
        slot.fill(0);
        slot[..value.len()].copy_from_slice(value);
        self.dirty = true;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Regenerates the checksum over the current contents.
    pub fn to_bytes(&self, checksum: &ChecksumEngine) -> Vec<u8> {
        let mut out = self.bytes.clone();
        let value = checksum.compute(&out[CHECKSUM_LEN..]);
        out[..CHECKSUM_LEN].copy_from_slice(&value.to_le_bytes());
        out
    }
}

pub fn int_field(name: &str) -> Option<HeadField> {
    INT_FIELDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, field)| field)
}
