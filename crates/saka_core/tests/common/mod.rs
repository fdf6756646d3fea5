//! Synthetic memory card and save fixtures built from deterministic key
//! material, so tests never need a real card dump.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use saka_core::checksum::ChecksumEngine;
use saka_core::cipher::{BlockCipher, P_ARRAY, SBOX_WORDS};
use saka_core::container::{self, ContainerLayout};
use saka_core::field::DecodedBuffer;
use saka_core::head;
use saka_core::keys::{KeyMaterial, SBOX_FILE};
use saka_core::memcard::dirent::{MODE_DIR, MODE_EXISTS, MODE_FILE, MODE_READ, MODE_WRITE};
use saka_core::memcard::{
    ALLOCATED_BIT, CHAIN_END, DIR_ENTRY_LEN, DirEntry, HEAD_FILE, ICON_FILE, SAVE_PREFIX, Tod,
    ecc, superblock,
};
use saka_core::schema;

pub const PAGE_LEN: usize = 512;
pub const PAGES_PER_CLUSTER: usize = 2;
pub const CLUSTER_LEN: usize = PAGE_LEN * PAGES_PER_CLUSTER;
pub const SPARE_LEN: usize = 16;
pub const RAW_PAGE_LEN: usize = PAGE_LEN + SPARE_LEN;
const IFC_CLUSTER: u32 = 8;
const FAT_CLUSTER: u32 = 9;
const FAT_PER_CLUSTER: usize = CLUSTER_LEN / 4;
const ALLOC_OFFSET: u32 = 16;

pub const SLOT_A: &str = "BISLPM-65530Saka_G01";
pub const SLOT_B: &str = "BISLPM-65530Saka_G02";
pub const OTHER_GAME: &str = "BESLES-50000OTHER";
pub const HEAD_LEN: usize = 0x80;
pub const ICON_LEN: usize = 964;

pub const CLUB_FUNDS: i64 = 123_456;
pub const CLUB_YEAR: i64 = 2004;
pub const FIRST_PLAYER_ID: i64 = 0x1234;

pub fn test_sboxes() -> Vec<u32> {
    let mut state = 0x2545_F491u32;
    (0..SBOX_WORDS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        })
        .collect()
}

pub fn test_keys() -> KeyMaterial {
    let cipher = BlockCipher::new(P_ARRAY, &test_sboxes()).expect("test S-boxes");
    KeyMaterial::new(cipher, ChecksumEngine::default())
}

/// Writes the test S-boxes as `s_boxes.bin` under `dir`.
pub fn write_resources(dir: &Path) {
    let bytes: Vec<u8> = test_sboxes()
        .into_iter()
        .flat_map(u32::to_le_bytes)
        .collect();
    fs::write(dir.join(SBOX_FILE), bytes).expect("write S-box resource");
}

/// A plaintext whose schema decodes cleanly, with a few recognisable values.
pub fn sample_plaintext() -> DecodedBuffer {
    let layout = ContainerLayout::SAKATSUKU04;
    let mut buffer = DecodedBuffer::new(vec![0u8; layout.cipher_len]).expect("plaintext");
    let model = schema::decode(&buffer).expect("zero payload decodes");

    let ints = [
        ("club.funds", CLUB_FUNDS),
        ("club.year", CLUB_YEAR),
        ("club.month", 4),
        ("club.difficulty", 1),
        ("team.players[0].id", FIRST_PLAYER_ID),
        ("team.players[0].age", 21),
        ("team.players[0].abilities[0].current", 50),
        ("team.players[0].abilities[0].max", 90),
        ("team.players[0].style_learned1", 0b101),
        ("town.population", 250_000),
        ("other_teams.teams[3].friendly", 7),
    ];
    for (path, value) in ints {
        let mut field = model.get(path).expect(path).clone();
        field.set_int(value).expect(path);
        buffer.patch(&field).expect(path);
    }
    let strings: [(&str, &[u8]); 2] = [
        ("club.club_name", b"RUST FC"),
        ("team.players[0].name", b"TANAKA"),
    ];
    for (path, value) in strings {
        let mut field = model.get(path).expect(path).clone();
        field.set_bytes(value).expect(path);
        buffer.patch(&field).expect(path);
    }
    buffer
}

pub fn sample_container() -> Vec<u8> {
    let keys = test_keys();
    container::seal(
        ContainerLayout::SAKATSUKU04,
        &sample_plaintext(),
        &keys.cipher,
        &keys.checksum,
    )
    .expect("seal sample")
    .to_bytes()
}

pub fn sample_head(year: u16, club_name: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; HEAD_LEN];
    bytes[head::YEAR.offset..head::YEAR.offset + 2].copy_from_slice(&year.to_le_bytes());
    bytes[head::MONTH.offset] = 4;
    bytes[head::DATE.offset] = 1;
    let name = head::CLUB_NAME.offset;
    bytes[name..name + club_name.len()].copy_from_slice(club_name);
    let value = ChecksumEngine::default().compute(&bytes[8..]);
    bytes[..8].copy_from_slice(&value.to_le_bytes());
    bytes
}

pub fn sample_icon() -> Vec<u8> {
    (0..ICON_LEN).map(|i| (i % 251) as u8).collect()
}

/// One file or directory to lay out on the card.
pub enum Node {
    File { name: String, data: Vec<u8> },
    Dir { name: String, children: Vec<Node> },
}

pub fn save_dir(name: &str, main: Vec<u8>, head: Vec<u8>) -> Node {
    Node::Dir {
        name: name.to_string(),
        children: vec![
            Node::File {
                name: name.to_string(),
                data: main,
            },
            Node::File {
                name: HEAD_FILE.to_string(),
                data: head,
            },
            Node::File {
                name: ICON_FILE.to_string(),
                data: sample_icon(),
            },
        ],
    }
}

/// Formats an ECC-carrying card image holding `nodes` under the root.
pub fn build_card(nodes: Vec<Node>) -> Vec<u8> {
    let mut card = CardBuilder::default();
    let root = Node::Dir {
        name: ".".to_string(),
        children: nodes,
    };
    card.place_dir(&root, 0);
    card.finish()
}

/// A card holding one valid save slot, one save of another game and a
/// second slot whose container is truncated.
pub fn sample_card() -> Vec<u8> {
    let mut short = sample_container();
    short.truncate(short.len() - CLUSTER_LEN);
    build_card(vec![
        save_dir(SLOT_A, sample_container(), sample_head(CLUB_YEAR as u16, b"RUST FC")),
        Node::Dir {
            name: OTHER_GAME.to_string(),
            children: vec![Node::File {
                name: "data.bin".to_string(),
                data: vec![0xAA; 100],
            }],
        },
        save_dir(SLOT_B, short, sample_head(2003, b"SHORT")),
    ])
}

pub fn write_card(dir: &Path, bytes: &[u8]) -> PathBuf {
    let path = dir.join("card.ps2");
    fs::write(&path, bytes).expect("write card image");
    path
}

/// Reads back the spare area of absolute page `page`.
pub fn spare_of(image: &[u8], page: usize) -> &[u8] {
    let at = page * RAW_PAGE_LEN + PAGE_LEN;
    &image[at..at + SPARE_LEN]
}

pub fn page_of(image: &[u8], page: usize) -> &[u8] {
    let at = page * RAW_PAGE_LEN;
    &image[at..at + PAGE_LEN]
}

pub fn expected_spare(page: &[u8]) -> Vec<u8> {
    ecc::page_ecc(page, SPARE_LEN)
}

#[derive(Default)]
struct CardBuilder {
    clusters: Vec<Vec<u8>>,
    fat: Vec<u32>,
}

impl CardBuilder {
    fn alloc(&mut self, data: &[u8]) -> u32 {
        let count = data.len().div_ceil(CLUSTER_LEN).max(1);
        let first = self.clusters.len() as u32;
        for i in 0..count {
            let start = (i * CLUSTER_LEN).min(data.len());
            let end = ((i + 1) * CLUSTER_LEN).min(data.len());
            let mut cluster = data[start..end].to_vec();
            cluster.resize(CLUSTER_LEN, 0);
            self.clusters.push(cluster);
            let next = if i + 1 == count {
                CHAIN_END
            } else {
                first + i as u32 + 1
            };
            self.fat.push(next | ALLOCATED_BIT);
        }
        first
    }

    /// Reserves the directory's clusters first so its `.` entry can point at
    /// itself, then places children and fills in the entries.
    fn place_dir(&mut self, dir: &Node, parent_cluster: u32) -> u32 {
        let Node::Dir { children, .. } = dir else {
            panic!("place_dir needs a directory");
        };
        let count = children.len() + 2;
        let first = self.alloc(&vec![0u8; count * DIR_ENTRY_LEN]);
        let mut entries = vec![
            entry(".", MODE_DIR, count as u32, first),
            entry("..", MODE_DIR, 0, parent_cluster),
        ];
        for child in children {
            match child {
                Node::File { name, data } => {
                    let cluster = self.alloc(data);
                    entries.push(entry(name, MODE_FILE, data.len() as u32, cluster));
                }
                Node::Dir {
                    name,
                    children: grandchildren,
                } => {
                    let cluster = self.place_dir(child, first);
                    entries.push(entry(
                        name,
                        MODE_DIR,
                        grandchildren.len() as u32 + 2,
                        cluster,
                    ));
                }
            }
        }
        let raw: Vec<u8> = entries
            .iter()
            .flat_map(|e| e.to_bytes().expect("entry name fits"))
            .collect();
        for (i, chunk) in raw.chunks(CLUSTER_LEN).enumerate() {
            self.clusters[first as usize + i][..chunk.len()].copy_from_slice(chunk);
        }
        first
    }

    fn finish(self) -> Vec<u8> {
        let fat_clusters = self.fat.len().div_ceil(FAT_PER_CLUSTER);
        assert!(
            FAT_CLUSTER as usize + fat_clusters <= ALLOC_OFFSET as usize,
            "fixture FAT overflows its reserved clusters"
        );
        let clusters_per_card = ALLOC_OFFSET as usize + self.clusters.len();
        let mut abs = vec![vec![0u8; CLUSTER_LEN]; clusters_per_card];

        abs[0][..superblock::SUPERBLOCK_LEN].copy_from_slice(&superblock_bytes(
            clusters_per_card as u32,
            self.clusters.len() as u32,
        ));
        for i in 0..fat_clusters {
            let at = i * 4;
            abs[IFC_CLUSTER as usize][at..at + 4]
                .copy_from_slice(&(FAT_CLUSTER + i as u32).to_le_bytes());
        }
        let mut fat = self.fat;
        fat.resize(fat_clusters * FAT_PER_CLUSTER, CHAIN_END);
        for (i, chunk) in fat.chunks(FAT_PER_CLUSTER).enumerate() {
            let cluster = &mut abs[FAT_CLUSTER as usize + i];
            for (j, value) in chunk.iter().enumerate() {
                cluster[j * 4..j * 4 + 4].copy_from_slice(&value.to_le_bytes());
            }
        }
        for (i, data) in self.clusters.into_iter().enumerate() {
            abs[ALLOC_OFFSET as usize + i] = data;
        }

        let mut image = Vec::with_capacity(clusters_per_card * PAGES_PER_CLUSTER * RAW_PAGE_LEN);
        for cluster in &abs {
            for page in cluster.chunks(PAGE_LEN) {
                image.extend_from_slice(page);
                image.extend_from_slice(&ecc::page_ecc(page, SPARE_LEN));
            }
        }
        image
    }
}

fn entry(name: &str, kind: u16, length: u32, cluster: u32) -> DirEntry {
    let stamp = Tod {
        second: 0,
        minute: 30,
        hour: 12,
        day: 1,
        month: 4,
        year: 2004,
    };
    DirEntry {
        name: name.to_string(),
        mode: kind | MODE_EXISTS | MODE_READ | MODE_WRITE,
        length,
        created: stamp,
        cluster,
        dir_entry: 0,
        modified: stamp,
        attributes: 0,
    }
}

fn superblock_bytes(clusters_per_card: u32, alloc_clusters: u32) -> Vec<u8> {
    let mut raw = vec![0u8; superblock::SUPERBLOCK_LEN];
    raw[..28].copy_from_slice(superblock::MAGIC);
    raw[0x1C..0x22].copy_from_slice(b"1.2.0.");
    raw[0x28..0x2A].copy_from_slice(&(PAGE_LEN as u16).to_le_bytes());
    raw[0x2A..0x2C].copy_from_slice(&(PAGES_PER_CLUSTER as u16).to_le_bytes());
    raw[0x2C..0x2E].copy_from_slice(&16u16.to_le_bytes());
    raw[0x30..0x34].copy_from_slice(&clusters_per_card.to_le_bytes());
    raw[0x34..0x38].copy_from_slice(&ALLOC_OFFSET.to_le_bytes());
    raw[0x38..0x3C].copy_from_slice(&alloc_clusters.to_le_bytes());
    raw[0x3C..0x40].copy_from_slice(&0u32.to_le_bytes());
    raw[0x50..0x54].copy_from_slice(&IFC_CLUSTER.to_le_bytes());
    raw[0x150] = 2;
    raw[0x151] = 0x52;
    raw
}

pub fn is_save_name(name: &str) -> bool {
    name.starts_with(SAVE_PREFIX)
}
