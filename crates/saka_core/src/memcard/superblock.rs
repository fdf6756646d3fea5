use serde::Serialize;

use crate::error::{Error, Result};

pub const MAGIC: &[u8; 28] = b"Sony PS2 Memory Card Format ";
pub const SUPERBLOCK_LEN: usize = 340;

const IFC_LIST_OFFSET: usize = 0x50;
const BAD_BLOCK_LIST_OFFSET: usize = 0xD0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Superblock {
    pub version: String,
    pub page_len: u16,
    pub pages_per_cluster: u16,
    pub pages_per_block: u16,
    pub clusters_per_card: u32,
    pub alloc_offset: u32,
    pub alloc_end: u32,
    pub rootdir_cluster: u32,
    pub backup_block1: u32,
    pub backup_block2: u32,
    pub ifc_list: [u32; 32],
    pub bad_block_list: [u32; 32],
    pub card_type: u8,
    pub card_flags: u8,
}

impl Superblock {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < SUPERBLOCK_LEN {
            return Err(Error::Truncated {
                what: "superblock (bytes)",
                need: SUPERBLOCK_LEN as u64,
                have: raw.len() as u64,
            });
        }
        if &raw[..MAGIC.len()] != MAGIC {
            return Err(Error::format("missing PS2 memory card magic"));
        }

        let version = String::from_utf8_lossy(&raw[0x1C..0x28])
            .trim_end_matches('\0')
            .to_string();
        let sb = Self {
            version,
            page_len: le_u16(raw, 0x28),
            pages_per_cluster: le_u16(raw, 0x2A),
            pages_per_block: le_u16(raw, 0x2C),
            clusters_per_card: le_u32(raw, 0x30),
            alloc_offset: le_u32(raw, 0x34),
            alloc_end: le_u32(raw, 0x38),
            rootdir_cluster: le_u32(raw, 0x3C),
            backup_block1: le_u32(raw, 0x40),
            backup_block2: le_u32(raw, 0x44),
            ifc_list: le_u32_array(raw, IFC_LIST_OFFSET),
            bad_block_list: le_u32_array(raw, BAD_BLOCK_LIST_OFFSET),
            card_type: raw[0x150],
            card_flags: raw[0x151],
        };
        sb.validate()?;
        Ok(sb)
    }

    fn validate(&self) -> Result<()> {
        if self.page_len == 0 || self.page_len as usize % super::ecc::CHUNK_LEN != 0 {
            return Err(Error::format(format!(
                "page length {} is not a positive multiple of {}",
                self.page_len,
                super::ecc::CHUNK_LEN
            )));
        }
        if self.pages_per_cluster == 0 {
            return Err(Error::format("superblock declares zero pages per cluster"));
        }
        if self.clusters_per_card == 0 {
            return Err(Error::format("superblock declares zero clusters"));
        }
        Ok(())
    }

    pub fn cluster_len(&self) -> usize {
        self.page_len as usize * self.pages_per_cluster as usize
    }

    /// Bytes of spare area after each page on an image that carries ECC.
    pub fn spare_len(&self) -> usize {
        (self.page_len as usize / super::ecc::CHUNK_LEN) * 4
    }
}

pub(crate) fn le_u16(raw: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([raw[at], raw[at + 1]])
}

pub(crate) fn le_u32(raw: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

fn le_u32_array(raw: &[u8], at: usize) -> [u32; 32] {
    let mut out = [0u32; 32];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = le_u32(raw, at + i * 4);
    }
    out
}
