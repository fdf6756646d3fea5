use crate::error::{Error, Result};

pub const BLOCK_LEN: usize = 8;
pub const SBOX_WORDS: usize = 1024;

/// Subkeys baked into the game executable.
pub const P_ARRAY: [u32; 18] = [
    0xAB1855E8, 0x0CE052EF, 0x98B5AB8F, 0x2EC0C36C, 0xD3537C2E, 0x2F168A1C, 0x5DEBDEC9,
    0x04A53619, 0x303E0930, 0x16ED9B46, 0xA14123EF, 0x4498D8F1, 0x2015D9DC, 0x9161CE4D,
    0x99B660E6, 0x4E9809D2, 0x02C5D502, 0xF0E7A655,
];

/// The save cipher: a Blowfish-shaped Feistel network with fixed subkeys and
/// S-boxes. Its round function mixes add and xor differently from textbook
/// Blowfish and must stay that way to match the game.
#[derive(Clone)]
pub struct BlockCipher {
    p: [u32; 18],
    s: Box<[u32; SBOX_WORDS]>,
}

impl std::fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCipher").finish_non_exhaustive()
    }
}

impl BlockCipher {
    pub fn new(p: [u32; 18], s: &[u32]) -> Result<Self> {
        let s: Box<[u32; SBOX_WORDS]> = s.to_vec().into_boxed_slice().try_into().map_err(
            |s: Box<[u32]>| {
                Error::format(format!(
                    "S-box table has {} words, expected {SBOX_WORDS}",
                    s.len()
                ))
            },
        )?;
        Ok(Self { p, s })
    }

    /// Builds the game cipher from the 4096-byte S-box dump
    /// (1024 little-endian words).
    pub fn from_sbox_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SBOX_WORDS * 4 {
            return Err(Error::format(format!(
                "S-box file is {} bytes, expected {}",
                bytes.len(),
                SBOX_WORDS * 4
            )));
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(P_ARRAY, &words)
    }

    fn f(&self, x: u32) -> u32 {
        let b0 = (x & 0xFF) as usize;
        let b1 = ((x >> 8) & 0xFF) as usize;
        let b2 = ((x >> 16) & 0xFF) as usize;
        let b3 = (x >> 24) as usize;
        self.s[768 + b0].wrapping_add(self.s[512 + b1] ^ self.s[256 + b2].wrapping_add(self.s[b3]))
    }

    /// Forward rounds on one `(L, R)` pair.
    pub fn encipher(&self, mut l: u32, mut r: u32) -> (u32, u32) {
        for i in (0..18).step_by(2) {
            if i == 0 {
                l ^= self.p[i];
            } else {
                l ^= self.p[i] ^ self.f(r);
            }
            if i == 16 {
                r ^= self.p[i + 1];
            } else {
                r ^= self.p[i + 1] ^ self.f(l);
            }
        }
        (l, r)
    }

    /// Reverse rounds on one `(L, R)` pair.
    pub fn decipher(&self, mut l: u32, mut r: u32) -> (u32, u32) {
        for i in (1..18).rev().step_by(2) {
            if i == 17 {
                l ^= self.p[i];
            } else {
                l ^= self.p[i] ^ self.f(r);
            }
            if i == 1 {
                r ^= self.p[i - 1];
            } else {
                r ^= self.p[i - 1] ^ self.f(l);
            }
        }
        (l, r)
    }

    /// Stream-order encryption of two words: the output pair is swapped.
    pub fn encrypt_words(&self, w0: u32, w1: u32) -> (u32, u32) {
        let (l, r) = self.encipher(w0, w1);
        (r, l)
    }

    /// Stream-order decryption of two words: the output pair is swapped.
    pub fn decrypt_words(&self, w0: u32, w1: u32) -> (u32, u32) {
        let (l, r) = self.decipher(w0, w1);
        (r, l)
    }

    pub fn encrypt_block(&self, block: [u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let (w0, w1) = split_block(block);
        join_block(self.encrypt_words(w0, w1))
    }

    pub fn decrypt_block(&self, block: [u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let (w0, w1) = split_block(block);
        join_block(self.decrypt_words(w0, w1))
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.map_blocks(data, |c, b| c.encrypt_block(b))
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.map_blocks(data, |c, b| c.decrypt_block(b))
    }

    fn map_blocks(
        &self,
        data: &[u8],
        op: impl Fn(&Self, [u8; BLOCK_LEN]) -> [u8; BLOCK_LEN],
    ) -> Result<Vec<u8>> {
        if data.len() % BLOCK_LEN != 0 {
            return Err(Error::format(format!(
                "cipher input of {} bytes is not a whole number of {BLOCK_LEN}-byte blocks",
                data.len()
            )));
        }
        let mut out = Vec::with_capacity(data.len());
        for chunk in data.chunks_exact(BLOCK_LEN) {
            let mut block = [0u8; BLOCK_LEN];
            block.copy_from_slice(chunk);
            out.extend_from_slice(&op(self, block));
        }
        Ok(out)
    }
}

fn split_block(block: [u8; BLOCK_LEN]) -> (u32, u32) {
    (
        u32::from_le_bytes([block[0], block[1], block[2], block[3]]),
        u32::from_le_bytes([block[4], block[5], block[6], block[7]]),
    )
}

fn join_block((w0, w1): (u32, u32)) -> [u8; BLOCK_LEN] {
    let mut out = [0u8; BLOCK_LEN];
    out[..4].copy_from_slice(&w0.to_le_bytes());
    out[4..].copy_from_slice(&w1.to_le_bytes());
    out
}
