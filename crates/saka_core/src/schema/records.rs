//! Match records, the fixture schedule and game options. Only their leading
//! words are decoded; the rest is skipped to a fixed bit position.

use super::*;

const RECORD_END_BIT: u64 = 0x20D8F6;
pub(super) const SCHEDULE_END_BIT: u64 = 0x2110F8;

pub(super) fn read_record(w: &mut Walker<'_>) -> Result<()> {
    w.group(&[U16, U16], 0)?;
    w.skip_to(RECORD_END_BIT)
}

pub(super) fn read_schedule(w: &mut Walker<'_>) -> Result<()> {
    for _ in 0..11 {
        w.int(U5, 0)?;
    }
    w.skip_to(SCHEDULE_END_BIT)
}

pub(super) fn read_options(w: &mut Walker<'_>) -> Result<()> {
    w.int(U32, 0)?;
    for _ in 0..0xD {
        w.int(U1, 4)?;
    }
    Ok(())
}
