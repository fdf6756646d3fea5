//! Sakatsuku 04 save codec: PS2 memory card filesystem, save cipher and
//! checksum, bit-packed schema decode and patch-in-place write-back.

pub mod bits;
pub mod checksum;
pub mod cipher;
pub mod container;
pub mod core_api;
pub mod error;
pub mod field;
pub mod head;
pub mod keys;
pub mod memcard;
pub mod schema;
pub mod text;

pub use error::{Error, Result};
