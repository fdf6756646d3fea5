use super::*;

const CANARY: [u8; 4] = [0xEC, 0x76, 0x13, 0x89];
const END_BIT: u64 = 0x93E5;

pub(super) fn read(w: &mut Walker<'_>) -> Result<()> {
    w.group_named(
        &[U14, U4, U5, U3],
        8,
        &[(0, "year"), (1, "month"), (2, "date"), (3, "day")],
    )?;
    w.int_named(U32, 0, "funds")?;
    w.string_named(0x10, "manager_name")?;
    w.string(0x10)?;
    w.string_named(0x15, "club_name")?;
    w.string(0x1CB)?;
    w.int(U3, 2)?;
    w.group(&[U16, U16], 6)?;
    w.group(
        &[
            U32, U11, U1, U1, U1, U8, U8, U8, U8, U11, U11, U11, U11, U11, U11, U11, U11,
        ],
        30,
    )?;
    w.group(&[U8, U8, U8, U8, U8, U8, U8, U8, U8, U4], 14)?;
    w.group(&[U32; 0x20], 0)?;
    for _ in 0..0x32 {
        w.group(&[U16, U8, U8, U8], 8)?;
        w.group(&[U32; 0x10], 0)?;
    }
    w.group(&[U32; 0x30], 0)?;
    for _ in 0..0x72 {
        w.group(&[U16, U8], 4)?;
    }
    w.group(
        &[
            U16, U8, U8, U8, U8, U8, U8, U16, U8, U8, U8, U8, U8, U8, U16, U8, U8, U16, U16,
        ],
        0,
    )?;
    w.group(&[U16, U16, U16, U16, U16], 12)?;
    // probably the match RNG state
    w.int_named(U32, 0, "seed")?;
    w.group_named(&[U32, U8, U5, U16, U1], 12, &[(2, "difficulty")])?;
    w.group(&[U32, U32, U32, U8, U8], 16)?;
    w.group(&[U32, U8, U8, U8], 8)?;
    w.canary(CANARY, END_BIT)
}
