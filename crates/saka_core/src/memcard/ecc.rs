//! Hamming code stored in each page's spare area: three bytes per 128-byte
//! chunk of page data.

pub const CHUNK_LEN: usize = 128;

const COLUMN_MASKS: [u8; 7] = [0x55, 0x33, 0x0F, 0x00, 0xAA, 0xCC, 0xF0];
const COLUMN_PARITY: [u8; 256] = build_column_parity();

const fn parity(b: u8) -> u8 {
    (b.count_ones() & 1) as u8
}

const fn build_column_parity() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut b = 0;
    while b < 256 {
        let mut mask = 0u8;
        let mut i = 0;
        while i < COLUMN_MASKS.len() {
            mask |= parity(b as u8 & COLUMN_MASKS[i]) << i;
            i += 1;
        }
        table[b] = mask;
        b += 1;
    }
    table
}

pub fn chunk_ecc(chunk: &[u8]) -> [u8; 3] {
    let mut column = 0x77u8;
    let mut line0 = 0x7Fu8;
    let mut line1 = 0x7Fu8;
    for (i, &b) in chunk.iter().enumerate() {
        column ^= COLUMN_PARITY[b as usize];
        if parity(b) == 1 {
            line0 ^= !(i as u8);
            line1 ^= i as u8;
        }
    }
    [column, line0 & 0x7F, line1]
}

/// Spare-area bytes for one page: the codes of every chunk, zero-filled to
/// `spare_len`.
pub fn page_ecc(page: &[u8], spare_len: usize) -> Vec<u8> {
    let mut spare = Vec::with_capacity(spare_len);
    for chunk in page.chunks(CHUNK_LEN) {
        spare.extend_from_slice(&chunk_ecc(chunk));
    }
    spare.resize(spare_len, 0);
    spare
}
