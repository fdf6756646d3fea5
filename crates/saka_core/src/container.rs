use serde::Serialize;
use tracing::debug;

use crate::checksum::ChecksumEngine;
use crate::cipher::{BLOCK_LEN, BlockCipher};
use crate::error::{Error, Result};
use crate::field::DecodedBuffer;

pub const HEADER_LEN: usize = 4;
pub const CHECKSUM_LEN: usize = 8;

/// Fixed geometry of a save blob:
/// `header(u32 LE) | half A | checksum(u64 LE) | half B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContainerLayout {
    pub file_size: usize,
    pub half_len: usize,
    /// Leading bytes of `A ++ B` that are enciphered; the rest is stored
    /// as-is.
    pub cipher_len: usize,
}

impl ContainerLayout {
    pub const SAKATSUKU04: Self = Self {
        file_size: 523_276,
        half_len: 261_632,
        cipher_len: 0x5EA10,
    };

    pub fn new(half_len: usize, cipher_len: usize) -> Result<Self> {
        let layout = Self {
            file_size: HEADER_LEN + 2 * half_len + CHECKSUM_LEN,
            half_len,
            cipher_len,
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn payload_len(&self) -> usize {
        2 * self.half_len
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_size != HEADER_LEN + self.payload_len() + CHECKSUM_LEN {
            return Err(Error::format(format!(
                "container size {} does not match two {}-byte halves",
                self.file_size, self.half_len
            )));
        }
        if self.cipher_len > self.payload_len() || self.cipher_len % BLOCK_LEN != 0 {
            return Err(Error::format(format!(
                "cipher region {:#x} must be whole blocks within the {:#x}-byte payload",
                self.cipher_len,
                self.payload_len()
            )));
        }
        Ok(())
    }
}

impl Default for ContainerLayout {
    fn default() -> Self {
        Self::SAKATSUKU04
    }
}

/// A parsed save blob. `payload` is the two ciphertext halves joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveContainer {
    layout: ContainerLayout,
    checksum: u64,
    payload: Vec<u8>,
}

impl SaveContainer {
    pub fn parse(layout: ContainerLayout, bytes: &[u8]) -> Result<Self> {
        layout.validate()?;
        if bytes.len() < layout.file_size {
            return Err(Error::Truncated {
                what: "save container (bytes)",
                need: layout.file_size as u64,
                have: bytes.len() as u64,
            });
        }
        if bytes.len() != layout.file_size {
            return Err(Error::format(format!(
                "save container is {} bytes, expected {}",
                bytes.len(),
                layout.file_size
            )));
        }

        let (header, rest) = bytes.split_at(HEADER_LEN);
        let (half_a, rest) = rest.split_at(layout.half_len);
        let (checksum, half_b) = rest.split_at(CHECKSUM_LEN);

        let declared = le_u32(header) as usize;
        if declared != layout.payload_len() {
            return Err(Error::format(format!(
                "container header declares {declared} payload bytes, halves hold {}",
                layout.payload_len()
            )));
        }

        let mut payload = Vec::with_capacity(layout.payload_len());
        payload.extend_from_slice(half_a);
        payload.extend_from_slice(half_b);
        Ok(Self {
            layout,
            checksum: le_u64(checksum),
            payload,
        })
    }

    pub fn layout(&self) -> &ContainerLayout {
        &self.layout
    }

    pub fn stored_checksum(&self) -> u64 {
        self.checksum
    }

    /// Ciphertext of both halves, in stream order.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn verify(&self, checksum: &ChecksumEngine) -> Result<()> {
        checksum.check(&self.payload, self.checksum, "save container")
    }

    pub fn decrypt(&self, cipher: &BlockCipher) -> Result<DecodedBuffer> {
        let plain = cipher.decrypt(&self.payload[..self.layout.cipher_len])?;
        let buffer = DecodedBuffer::new(plain)?;
        debug!(
            data_start = buffer.data_start(),
            len = buffer.len(),
            "decrypted save container"
        );
        Ok(buffer)
    }

    /// Re-enciphers `buffer` over the cipher region and regenerates the
    /// stored checksum from the new ciphertext.
    pub fn reseal(
        &mut self,
        buffer: &DecodedBuffer,
        cipher: &BlockCipher,
        checksum: &ChecksumEngine,
    ) -> Result<()> {
        if buffer.len() != self.layout.cipher_len {
            return Err(Error::format(format!(
                "plaintext is {} bytes, cipher region is {}",
                buffer.len(),
                self.layout.cipher_len
            )));
        }
        let encrypted = cipher.encrypt(buffer.as_bytes())?;
        self.payload[..self.layout.cipher_len].copy_from_slice(&encrypted);
        self.checksum = checksum.compute(&self.payload);
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let half = self.layout.half_len;
        let mut out = Vec::with_capacity(self.layout.file_size);
        out.extend_from_slice(&(self.layout.payload_len() as u32).to_le_bytes());
        out.extend_from_slice(&self.payload[..half]);
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.extend_from_slice(&self.payload[half..]);
        out
    }
}

/// Builds a sealed container around `plain`. The tail of the payload past the
/// cipher region is zero.
pub fn seal(
    layout: ContainerLayout,
    plain: &DecodedBuffer,
    cipher: &BlockCipher,
    checksum: &ChecksumEngine,
) -> Result<SaveContainer> {
    layout.validate()?;
    let mut container = SaveContainer {
        layout,
        checksum: 0,
        payload: vec![0u8; layout.payload_len()],
    };
    container.reseal(plain, cipher, checksum)?;
    Ok(container)
}

fn le_u32(raw: &[u8]) -> u32 {
    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}

fn le_u64(raw: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&raw[..8]);
    u64::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{P_ARRAY, SBOX_WORDS};

    fn cipher() -> BlockCipher {
        let mut state = 0x2545_F491u32;
        let sboxes: Vec<u32> = (0..SBOX_WORDS)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state
            })
            .collect();
        BlockCipher::new(P_ARRAY, &sboxes).expect("test key material")
    }

    fn small_layout() -> ContainerLayout {
        ContainerLayout::new(64, 96).expect("valid layout")
    }

    fn plaintext() -> DecodedBuffer {
        let mut bytes: Vec<u8> = (0..96u32).map(|i| (i * 7) as u8).collect();
        bytes[..4].copy_from_slice(&4u32.to_le_bytes());
        DecodedBuffer::new(bytes).expect("plaintext")
    }

    #[test]
    fn production_layout_is_consistent() {
        let layout = ContainerLayout::SAKATSUKU04;
        layout.validate().expect("valid");
        assert_eq!(layout.payload_len(), 523_264);
        assert!(ContainerLayout::new(64, 100).is_err());
        assert!(ContainerLayout::new(64, 136).is_err());
    }

    #[test]
    fn sealed_container_parses_verifies_and_rebuilds_exactly() {
        let checksum = ChecksumEngine::default();
        let cipher = cipher();
        let plain = plaintext();
        let bytes = seal(small_layout(), &plain, &cipher, &checksum)
            .expect("seal")
            .to_bytes();
        assert_eq!(bytes.len(), small_layout().file_size);
        assert_eq!(&bytes[..4], &128u32.to_le_bytes());

        let container = SaveContainer::parse(small_layout(), &bytes).expect("parse");
        container.verify(&checksum).expect("checksum holds");
        let decoded = container.decrypt(&cipher).expect("decrypt");
        assert_eq!(decoded, plain);
        assert_eq!(decoded.data_start(), 20);

        let mut again = container.clone();
        again.reseal(&decoded, &cipher, &checksum).expect("reseal");
        assert_eq!(again.to_bytes(), bytes);
    }

    #[test]
    fn tampering_is_a_format_mismatch() {
        let checksum = ChecksumEngine::default();
        let mut bytes = seal(small_layout(), &plaintext(), &cipher(), &checksum)
            .expect("seal")
            .to_bytes();

        let mut flipped = bytes.clone();
        flipped[HEADER_LEN + 3] ^= 0x10;
        let container = SaveContainer::parse(small_layout(), &flipped).expect("parse");
        assert!(matches!(
            container.verify(&checksum),
            Err(Error::FormatMismatch(_))
        ));

        bytes[0] = 0x7F;
        assert!(matches!(
            SaveContainer::parse(small_layout(), &bytes),
            Err(Error::FormatMismatch(_))
        ));
        assert!(matches!(
            SaveContainer::parse(small_layout(), &bytes[..10]),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn checksum_sits_between_the_halves() {
        let checksum = ChecksumEngine::default();
        let container = seal(small_layout(), &plaintext(), &cipher(), &checksum).expect("seal");
        let bytes = container.to_bytes();
        let at = HEADER_LEN + 64;
        assert_eq!(
            &bytes[at..at + CHECKSUM_LEN],
            &container.stored_checksum().to_le_bytes()
        );
        assert_eq!(&bytes[at + CHECKSUM_LEN..], &container.payload()[64..]);
    }
}
