use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::superblock::{le_u16, le_u32};
use crate::error::{Error, Result};

pub const DIR_ENTRY_LEN: usize = 512;
const NAME_OFFSET: usize = 0x40;
const NAME_LEN: usize = 32;

pub const MODE_READ: u16 = 0x0001;
pub const MODE_WRITE: u16 = 0x0002;
pub const MODE_EXECUTE: u16 = 0x0004;
pub const MODE_PROTECTED: u16 = 0x0008;
pub const MODE_FILE: u16 = 0x0010;
pub const MODE_DIR: u16 = 0x0020;
pub const MODE_HIDDEN: u16 = 0x2000;
pub const MODE_EXISTS: u16 = 0x8000;

/// Eight-byte timestamp as stored on the card (JST wall clock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Tod {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl Tod {
    fn parse(raw: &[u8]) -> Self {
        Self {
            second: raw[1],
            minute: raw[2],
            hour: raw[3],
            day: raw[4],
            month: raw[5],
            year: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let year = self.year.to_le_bytes();
        [
            0,
            self.second,
            self.minute,
            self.hour,
            self.day,
            self.month,
            year[0],
            year[1],
        ]
    }

    /// `None` when the stored fields do not form a calendar date.
    pub fn to_datetime(self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }
}

/// One 512-byte directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub mode: u16,
    /// Byte length for files, entry count for directories.
    pub length: u32,
    pub created: Tod,
    pub cluster: u32,
    pub dir_entry: u32,
    pub modified: Tod,
    pub attributes: u32,
}

impl DirEntry {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < DIR_ENTRY_LEN {
            return Err(Error::Truncated {
                what: "directory entry (bytes)",
                need: DIR_ENTRY_LEN as u64,
                have: raw.len() as u64,
            });
        }
        let name_raw = &raw[NAME_OFFSET..NAME_OFFSET + NAME_LEN];
        let end = name_raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        Ok(Self {
            name: String::from_utf8_lossy(&name_raw[..end]).into_owned(),
            mode: le_u16(raw, 0),
            length: le_u32(raw, 4),
            created: Tod::parse(&raw[8..16]),
            cluster: le_u32(raw, 0x10),
            dir_entry: le_u32(raw, 0x14),
            modified: Tod::parse(&raw[0x18..0x20]),
            attributes: le_u32(raw, 0x20),
        })
    }

    pub fn to_bytes(&self) -> Result<[u8; DIR_ENTRY_LEN]> {
        let name = self.name.as_bytes();
        if name.len() > NAME_LEN {
            return Err(Error::range(format!(
                "entry name {:?} exceeds {NAME_LEN} bytes",
                self.name
            )));
        }
        let mut raw = [0u8; DIR_ENTRY_LEN];
        raw[0..2].copy_from_slice(&self.mode.to_le_bytes());
        raw[4..8].copy_from_slice(&self.length.to_le_bytes());
        raw[8..16].copy_from_slice(&self.created.to_bytes());
        raw[0x10..0x14].copy_from_slice(&self.cluster.to_le_bytes());
        raw[0x14..0x18].copy_from_slice(&self.dir_entry.to_le_bytes());
        raw[0x18..0x20].copy_from_slice(&self.modified.to_bytes());
        raw[0x20..0x24].copy_from_slice(&self.attributes.to_le_bytes());
        raw[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);
        Ok(raw)
    }

    pub fn exists(&self) -> bool {
        self.mode & MODE_EXISTS != 0
    }

    pub fn is_file(&self) -> bool {
        self.mode & MODE_FILE != 0
    }

    pub fn is_dir(&self) -> bool {
        self.mode & MODE_DIR != 0
    }

    pub fn modified_at(&self) -> Option<NaiveDateTime> {
        self.modified.to_datetime()
    }
}
