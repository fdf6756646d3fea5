use super::*;

const CANARY: [u8; 4] = [0x10, 0xE3, 0xEF, 0x1C];
const END_BIT: u64 = 0x105B8D;

pub(super) fn read(w: &mut Walker<'_>) -> Result<()> {
    w.int(U3, 2)?;
    w.group_named(
        &[U16, U16, U16, U16],
        10,
        &[(0, "living"), (1, "economy"), (2, "sports"), (3, "env")],
    )?;
    w.group_named(&[U32], 0, &[(0, "population")])?;
    w.group_named(
        &[U7, U7, U7, U8, U8],
        8,
        &[(0, "price"), (1, "traffic_level"), (2, "soccer_pop")],
    )?;
    w.group_named(&[U16, U16, U16], 0, &[(2, "soccer_level")])?;
    for _ in 0..3 {
        w.group(&[U16, U14], 4)?;
        w.group(&[U4, U5, U3, U8], 6)?;
    }
    w.group_named(&[U3, U4, U8], 3, &[(1, "town_type")])?;
    w.group(&[U1; 0xD], 0xD)?;
    w.group(&[U1; 0x27 * 3], 0x27 * 3)?;
    w.group(&[U4; 0xD], 0xD)?;
    w.group(&[U2; 0x27 * 3], 0x27 * 3)?;
    w.group(&[U8; 0x27], 0x27)?;
    w.int(U8, 2)?;
    w.canary(CANARY, END_BIT)
}
