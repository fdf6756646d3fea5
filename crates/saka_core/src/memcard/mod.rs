pub mod dirent;
pub mod ecc;
mod image;
pub mod superblock;

use std::io::{Read, Seek, SeekFrom, Write};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
pub use dirent::{DIR_ENTRY_LEN, DirEntry, Tod};
pub use image::CardImage;
pub use superblock::{SUPERBLOCK_LEN, Superblock};

/// FAT values with this bit set are in use; the bit is stripped on lookup.
pub const ALLOCATED_BIT: u32 = 0x8000_0000;
pub const CHAIN_END: u32 = 0x7FFF_FFFF;

pub const SAVE_PREFIX: &str = "BISLPM-65530Saka_G";
pub const HEAD_FILE: &str = "head.dat";
pub const ICON_FILE: &str = "icon.sys";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub page_len: usize,
    pub spare_len: usize,
    pub pages_per_cluster: usize,
    pub cluster_len: usize,
    pub fat_per_cluster: usize,
    pub clusters_per_card: u32,
    pub alloc_offset: u32,
}

impl Geometry {
    /// Derives the geometry from the superblock and the image length; the
    /// length tells whether pages carry a spare (ECC) area.
    pub fn detect(sb: &Superblock, image_len: u64) -> Result<Self> {
        let page_len = sb.page_len as usize;
        let pages = sb.clusters_per_card as u64 * sb.pages_per_cluster as u64;
        let with_spare = pages * (page_len + sb.spare_len()) as u64;
        let raw = pages * page_len as u64;
        let spare_len = if image_len == with_spare {
            sb.spare_len()
        } else if image_len == raw {
            0
        } else if image_len > with_spare {
            warn!(
                image_len,
                expected = with_spare,
                "memory card image has trailing bytes beyond its geometry"
            );
            sb.spare_len()
        } else {
            return Err(Error::format(format!(
                "image length {image_len} matches neither {with_spare} (with ECC) nor {raw} (raw)"
            )));
        };
        let cluster_len = sb.cluster_len();
        Ok(Self {
            page_len,
            spare_len,
            pages_per_cluster: sb.pages_per_cluster as usize,
            cluster_len,
            fat_per_cluster: cluster_len / 4,
            clusters_per_card: sb.clusters_per_card,
            alloc_offset: sb.alloc_offset,
        })
    }

    pub fn raw_page_len(&self) -> usize {
        self.page_len + self.spare_len
    }

    pub fn entries_per_cluster(&self) -> usize {
        self.cluster_len / DIR_ENTRY_LEN
    }
}

/// Ordered clusters of one file, relative to the allocatable area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterChain(pub Vec<u32>);

impl ClusterChain {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clusters(&self) -> &[u32] {
        &self.0
    }
}

/// The three files backing one save slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEntry {
    pub name: String,
    /// Last write time of the main file, when the card stores a valid date.
    pub modified: Option<NaiveDateTime>,
    pub main_bytes: Vec<u8>,
    pub head_bytes: Vec<u8>,
    pub icon_bytes: Vec<u8>,
}

/// A PS2 memory card filesystem over any seekable image.
pub struct MemoryCard<F> {
    file: F,
    superblock: Superblock,
    geometry: Geometry,
    root: DirEntry,
}

impl<F: Read + Seek> MemoryCard<F> {
    pub fn open(mut file: F) -> Result<Self> {
        let image_len = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;
        let mut raw = vec![0u8; SUPERBLOCK_LEN.min(image_len as usize)];
        file.read_exact(&mut raw)?;
        let superblock = Superblock::parse(&raw)?;
        let geometry = Geometry::detect(&superblock, image_len)?;
        debug!(?geometry, "opened memory card");

        let placeholder = DirEntry {
            name: String::new(),
            mode: 0,
            length: 0,
            created: Tod::default(),
            cluster: 0,
            dir_entry: 0,
            modified: Tod::default(),
            attributes: 0,
        };
        let mut card = Self {
            file,
            superblock,
            geometry,
            root: placeholder,
        };
        let rootdir = card.superblock.rootdir_cluster;
        let root = card
            .read_entry_cluster(rootdir)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::format("root directory cluster holds no entries"))?;
        if !root.is_dir() {
            return Err(Error::format("root directory entry is not a directory"));
        }
        card.root = root;
        Ok(card)
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn root(&self) -> &DirEntry {
        &self.root
    }

    pub fn into_inner(self) -> F {
        self.file
    }

    pub fn read_page(&mut self, n: u64) -> Result<Vec<u8>> {
        let offset = n * self.geometry.raw_page_len() as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut page = vec![0u8; self.geometry.page_len];
        self.file.read_exact(&mut page).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::Truncated {
                what: "memory card page (bytes)",
                need: offset + self.geometry.page_len as u64,
                have: offset,
            },
            _ => Error::Io(e),
        })?;
        Ok(page)
    }

    /// Page data of absolute cluster `n`, spare areas excluded.
    pub fn read_cluster(&mut self, n: u32) -> Result<Vec<u8>> {
        let first = n as u64 * self.geometry.pages_per_cluster as u64;
        let mut out = Vec::with_capacity(self.geometry.cluster_len);
        for i in 0..self.geometry.pages_per_cluster as u64 {
            out.extend_from_slice(&self.read_page(first + i)?);
        }
        Ok(out)
    }

    /// FAT entry for relative cluster `n`, via the indirect FAT cluster list.
    pub fn get_fat_value(&mut self, n: u32) -> Result<u32> {
        let per = self.geometry.fat_per_cluster;
        let fat_index = n as usize / per;
        let indirect_index = fat_index / per;
        let Some(&indirect_cluster) = self.superblock.ifc_list.get(indirect_index) else {
            return Err(Error::format(format!(
                "cluster {n} lies beyond the indirect FAT list"
            )));
        };
        let indirect = self.read_cluster(indirect_cluster)?;
        let fat_cluster = word_at(&indirect, fat_index % per);
        let fat = self.read_cluster(fat_cluster)?;
        let value = word_at(&fat, n as usize % per);
        Ok(if value & ALLOCATED_BIT != 0 {
            value ^ ALLOCATED_BIT
        } else {
            value
        })
    }

    pub fn cluster_chain(&mut self, start: u32) -> Result<ClusterChain> {
        let mut chain = Vec::new();
        let mut cluster = start;
        while cluster != CHAIN_END {
            if chain.len() as u32 >= self.geometry.clusters_per_card {
                return Err(Error::format(format!(
                    "cluster chain from {start} does not terminate"
                )));
            }
            chain.push(cluster);
            cluster = self.get_fat_value(cluster)?;
        }
        Ok(ClusterChain(chain))
    }

    fn read_entry_cluster(&mut self, n: u32) -> Result<Vec<DirEntry>> {
        let data = self.read_cluster(n + self.geometry.alloc_offset)?;
        data.chunks_exact(DIR_ENTRY_LEN).map(DirEntry::parse).collect()
    }

    /// Children of a directory, without the `.`/`..` entries.
    pub fn find_sub_entries(&mut self, parent: &DirEntry) -> Result<Vec<DirEntry>> {
        let chain = self.cluster_chain(parent.cluster)?;
        let wanted = parent.length as usize;
        let mut entries = Vec::with_capacity(wanted);
        for &cluster in chain.clusters() {
            if entries.len() >= wanted {
                break;
            }
            for entry in self.read_entry_cluster(cluster)? {
                if entries.len() < wanted {
                    entries.push(entry);
                }
            }
        }
        Ok(entries
            .into_iter()
            .filter(|e| e.name != "." && e.name != "..")
            .collect())
    }

    /// Live entries of the root directory.
    pub fn list_root_dir(&mut self) -> Result<Vec<DirEntry>> {
        let root = self.root.clone();
        Ok(self
            .find_sub_entries(&root)?
            .into_iter()
            .filter(DirEntry::exists)
            .collect())
    }

    /// Children of the root directory named `name`.
    pub fn lookup_entry_by_name(&mut self, name: &str) -> Result<Vec<DirEntry>> {
        let dir = self
            .list_root_dir()?
            .into_iter()
            .find(|e| e.name == name && e.is_dir())
            .ok_or_else(|| Error::NotFound(format!("directory {name:?} on memory card")))?;
        self.find_sub_entries(&dir)
    }

    pub fn read_data_cluster(&mut self, entry: &DirEntry) -> Result<Vec<u8>> {
        let chain = self.cluster_chain(entry.cluster)?;
        let length = entry.length as usize;
        let mut out = Vec::with_capacity(length);
        for &cluster in chain.clusters() {
            if out.len() >= length {
                break;
            }
            let data = self.read_cluster(cluster + self.geometry.alloc_offset)?;
            let take = (length - out.len()).min(self.geometry.cluster_len);
            out.extend_from_slice(&data[..take]);
        }
        if out.len() != length {
            return Err(Error::format(format!(
                "{:?} declares {length} bytes but its chain holds {}",
                entry.name,
                out.len()
            )));
        }
        debug!(name = %entry.name, length, clusters = chain.len(), "read file");
        Ok(out)
    }

    pub fn read_save_entry(&mut self, name: &str) -> Result<SaveEntry> {
        let files = self.lookup_entry_by_name(name)?;
        let modified = files
            .iter()
            .find(|e| e.is_file() && e.name == name)
            .and_then(DirEntry::modified_at);
        let mut read_named = |file_name: &str| -> Result<Vec<u8>> {
            let entry = files
                .iter()
                .find(|e| e.is_file() && e.name == file_name)
                .ok_or_else(|| Error::NotFound(format!("{file_name:?} in {name:?}")))?;
            self.read_data_cluster(entry)
        };
        Ok(SaveEntry {
            name: name.to_string(),
            modified,
            main_bytes: read_named(name)?,
            head_bytes: read_named(HEAD_FILE)?,
            icon_bytes: read_named(ICON_FILE)?,
        })
    }

    /// Names of every save directory for the game.
    pub fn save_names(&mut self) -> Result<Vec<String>> {
        Ok(self
            .list_root_dir()?
            .into_iter()
            .filter(|e| e.is_dir() && e.name.starts_with(SAVE_PREFIX))
            .map(|e| e.name)
            .collect())
    }

    pub fn read_save_entries(&mut self) -> Result<Vec<SaveEntry>> {
        let names = self.save_names()?;
        names
            .iter()
            .map(|name| self.read_save_entry(name))
            .collect()
    }
}

impl<F: Read + Write + Seek> MemoryCard<F> {
    /// Overlays `data` on the start of page `n` and rewrites its ECC.
    pub fn write_page(&mut self, n: u64, data: &[u8]) -> Result<()> {
        let mut page = self.read_page(n)?;
        let len = data.len().min(page.len());
        page[..len].copy_from_slice(&data[..len]);

        let offset = n * self.geometry.raw_page_len() as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&page)?;
        if self.geometry.spare_len != 0 {
            let spare = ecc::page_ecc(&page, self.geometry.spare_len);
            self.file.write_all(&spare)?;
        }
        Ok(())
    }

    pub fn write_cluster(&mut self, n: u32, data: &[u8]) -> Result<()> {
        let first = n as u64 * self.geometry.pages_per_cluster as u64;
        let page_len = self.geometry.page_len;
        for i in 0..self.geometry.pages_per_cluster {
            let start = (i * page_len).min(data.len());
            self.write_page(first + i as u64, &data[start..])?;
        }
        Ok(())
    }

    /// Rewrites a file in place along its existing chain. The payload must be
    /// exactly the file's current length.
    pub fn write_data_cluster(&mut self, entry: &DirEntry, data: &[u8]) -> Result<()> {
        let length = entry.length as usize;
        if data.len() != length {
            return Err(Error::range(format!(
                "{:?} holds {length} bytes, refusing to write {}",
                entry.name,
                data.len()
            )));
        }
        let chain = self.cluster_chain(entry.cluster)?;
        let capacity = chain.len() * self.geometry.cluster_len;
        if capacity < length {
            return Err(Error::format(format!(
                "{:?} chain holds {capacity} bytes, file needs {length}",
                entry.name
            )));
        }
        let mut written = 0;
        for &cluster in chain.clusters() {
            if written >= length {
                break;
            }
            let take = (length - written).min(self.geometry.cluster_len);
            self.write_cluster(
                cluster + self.geometry.alloc_offset,
                &data[written..written + take],
            )?;
            written += take;
        }
        debug!(name = %entry.name, length, clusters = chain.len(), "wrote file");
        Ok(())
    }

    /// Replaces a save's main file and, when given, its head record.
    pub fn write_save_entry(&mut self, name: &str, main: &[u8], head: Option<&[u8]>) -> Result<()> {
        let files = self.lookup_entry_by_name(name)?;
        let find = |file_name: &str| {
            files
                .iter()
                .find(|e| e.is_file() && e.name == file_name)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("{file_name:?} in {name:?}")))
        };
        let main_entry = find(name)?;
        let head_entry = match head {
            Some(bytes) if !bytes.is_empty() => Some((find(HEAD_FILE)?, bytes)),
            _ => None,
        };
        self.write_data_cluster(&main_entry, main)?;
        if let Some((entry, bytes)) = head_entry {
            self.write_data_cluster(&entry, bytes)?;
        }
        self.file.flush()?;
        Ok(())
    }
}

fn word_at(cluster: &[u8], index: usize) -> u32 {
    let at = index * 4;
    u32::from_le_bytes([
        cluster[at],
        cluster[at + 1],
        cluster[at + 2],
        cluster[at + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_follows_image_length() {
        let mut raw = vec![0u8; SUPERBLOCK_LEN];
        raw[..28].copy_from_slice(superblock::MAGIC);
        raw[0x28..0x2A].copy_from_slice(&512u16.to_le_bytes());
        raw[0x2A..0x2C].copy_from_slice(&2u16.to_le_bytes());
        raw[0x30..0x34].copy_from_slice(&64u32.to_le_bytes());
        let sb = Superblock::parse(&raw).expect("superblock");

        let ecc = Geometry::detect(&sb, 64 * 2 * 528).expect("ecc image");
        assert_eq!(ecc.spare_len, 16);
        assert_eq!(ecc.raw_page_len(), 528);
        assert_eq!(ecc.fat_per_cluster, 256);
        assert_eq!(ecc.entries_per_cluster(), 2);

        let plain = Geometry::detect(&sb, 64 * 2 * 512).expect("raw image");
        assert_eq!(plain.spare_len, 0);

        assert!(Geometry::detect(&sb, 1000).is_err());
    }
}
