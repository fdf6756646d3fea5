use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::checksum::ChecksumEngine;
use crate::cipher::BlockCipher;
use crate::error::{Error, Result};
use crate::text::Lookup;

pub const SBOX_FILE: &str = "s_boxes.bin";
pub const CRC_TABLE_FILE: &str = "crc_table.bin";
pub const CHARSET_FILE: &str = "jp.csv";

/// Cipher and checksum state, built once and shared by every session.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub cipher: BlockCipher,
    pub checksum: ChecksumEngine,
}

impl KeyMaterial {
    pub fn new(cipher: BlockCipher, checksum: ChecksumEngine) -> Self {
        Self { cipher, checksum }
    }

    /// Loads `s_boxes.bin` (required) and `crc_table.bin` (optional) from a
    /// resource directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let sboxes = read_required(&dir.join(SBOX_FILE))?;
        let cipher = BlockCipher::from_sbox_bytes(&sboxes)?;
        let checksum = match read_optional(&dir.join(CRC_TABLE_FILE))? {
            Some(table) => ChecksumEngine::from_table_bytes(&table)?,
            None => ChecksumEngine::default(),
        };
        debug!(dir = %dir.display(), "loaded key material");
        Ok(Self { cipher, checksum })
    }
}

/// Loads `jp.csv` from a resource directory when present, else the built-in
/// single-byte table.
pub fn load_lookup(dir: &Path) -> Result<Lookup> {
    match read_optional(&dir.join(CHARSET_FILE))? {
        Some(raw) => Lookup::from_csv(&String::from_utf8_lossy(&raw)),
        None => Ok(Lookup::new()),
    }
}

fn read_required(path: &Path) -> Result<Vec<u8>> {
    read_optional(path)?.ok_or_else(|| Error::NotFound(format!("{}", path.display())))
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::SBOX_WORDS;

    #[test]
    fn sboxes_are_required_and_crc_table_is_not() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            KeyMaterial::load(dir.path()),
            Err(Error::NotFound(_))
        ));

        let sboxes: Vec<u8> = (0..SBOX_WORDS as u32)
            .flat_map(|i| i.wrapping_mul(0x9E37_79B9).to_le_bytes())
            .collect();
        fs::write(dir.path().join(SBOX_FILE), &sboxes).expect("write sboxes");
        let keys = KeyMaterial::load(dir.path()).expect("defaults for crc table");
        assert_eq!(
            keys.checksum.crc16(b"123456789"),
            ChecksumEngine::default().crc16(b"123456789")
        );

        fs::write(dir.path().join(CRC_TABLE_FILE), [0u8; 7]).expect("write table");
        assert!(matches!(
            KeyMaterial::load(dir.path()),
            Err(Error::FormatMismatch(_))
        ));
    }

    #[test]
    fn charset_is_optional() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_lookup(dir.path()).expect("empty lookup").is_empty());
        fs::write(dir.path().join(CHARSET_FILE), "889F,亜\n").expect("write csv");
        let lookup = load_lookup(dir.path()).expect("lookup");
        assert_eq!(lookup.decode(&[0x88, 0x9F]), "亜");
    }
}
