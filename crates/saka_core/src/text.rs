//! In-game text codec. Strings are byte sequences where each character is one
//! or two bytes; the mapping comes from a charset table rather than a
//! standard encoding.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Character table shared by decode and encode. Built once and passed to
/// whatever needs to render or edit strings.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    double: HashMap<[u8; 2], String>,
    single: HashMap<u8, String>,
    reverse: HashMap<String, Vec<u8>>,
}

impl Lookup {
    /// A lookup with no table: ASCII and half-width katakana only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a lookup from `HEX,char` lines (`81,A` or `8140,　`).
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut lookup = Self::new();
        lookup.merge_csv(text)?;
        Ok(lookup)
    }

    /// Layers another table on top; later entries win.
    pub fn merge_csv(&mut self, text: &str) -> Result<()> {
        for (n, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let Some((code, ch)) = line.split_once(',') else {
                return Err(Error::format(format!("charset line {}: missing comma", n + 1)));
            };
            let bytes = parse_hex(code.trim()).ok_or_else(|| {
                Error::format(format!("charset line {}: bad code {code:?}", n + 1))
            })?;
            match bytes.as_slice() {
                [b] => {
                    self.single.insert(*b, ch.to_string());
                }
                [a, b] => {
                    self.double.insert([*a, *b], ch.to_string());
                }
                _ => {
                    return Err(Error::format(format!(
                        "charset line {}: code {code:?} is not 1 or 2 bytes",
                        n + 1
                    )));
                }
            }
            self.reverse.entry(ch.to_string()).or_insert(bytes);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.single.len() + self.double.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes up to the first NUL.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        let mut i = 0;
        while i < bytes.len() {
            if let Some(pair) = bytes.get(i..i + 2) {
                if let Some(s) = self.double.get(&[pair[0], pair[1]]) {
                    out.push_str(s);
                    i += 2;
                    continue;
                }
            }
            let b = bytes[i];
            match self.single.get(&b) {
                Some(s) => out.push_str(s),
                None => out.push(fallback_char(b)),
            }
            i += 1;
        }
        match out.find('\0') {
            Some(end) => out[..end].to_string(),
            None => out,
        }
    }

    /// Encodes `text` and zero-pads to `len` bytes.
    pub fn encode(&self, text: &str, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        for ch in text.chars() {
            let mut buf = [0u8; 4];
            let key: &str = ch.encode_utf8(&mut buf);
            if let Some(bytes) = self.reverse.get(key) {
                out.extend_from_slice(bytes);
            } else if let Some(b) = fallback_byte(ch) {
                out.push(b);
            } else {
                return Err(Error::range(format!("character {ch:?} has no in-game code")));
            }
        }
        if out.len() > len {
            return Err(Error::range(format!(
                "{text:?} encodes to {} bytes, field holds {len}",
                out.len()
            )));
        }
        out.resize(len, 0);
        Ok(out)
    }
}

const KATAKANA_FIRST: u8 = 0xA1;
const KATAKANA_LAST: u8 = 0xDF;
const HALFWIDTH_BASE: u32 = 0xFF61;

fn fallback_char(b: u8) -> char {
    match b {
        0 => '\0',
        0x20..=0x7E => b as char,
        KATAKANA_FIRST..=KATAKANA_LAST => {
            char::from_u32(HALFWIDTH_BASE + (b - KATAKANA_FIRST) as u32).unwrap_or('\u{FFFD}')
        }
        _ => '\u{FFFD}',
    }
}

fn fallback_byte(ch: char) -> Option<u8> {
    let c = ch as u32;
    match c {
        0x20..=0x7E => Some(c as u8),
        _ if (HALFWIDTH_BASE..=HALFWIDTH_BASE + (KATAKANA_LAST - KATAKANA_FIRST) as u32)
            .contains(&c) =>
        {
            Some(KATAKANA_FIRST + (c - HALFWIDTH_BASE) as u8)
        }
        _ => None,
    }
}

fn parse_hex(code: &str) -> Option<Vec<u8>> {
    if code.is_empty() || code.len() % 2 != 0 {
        return None;
    }
    (0..code.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(code.get(i..i + 2)?, 16).ok())
        .collect()
}
