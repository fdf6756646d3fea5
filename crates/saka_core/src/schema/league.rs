use super::*;

const CANARY: [u8; 4] = [0x7C, 0x01, 0x83, 0xFE];
const END_BIT: u64 = 0x105750;

pub(super) fn read(w: &mut Walker<'_>) -> Result<()> {
    for _ in 0..7 {
        w.int(U32, 0)?;
        for _ in 0..2 {
            w.int(U32, 0)?;
            for _ in 0..0x19 {
                w.int(U11, 2)?;
            }
            w.align(2);
        }
    }
    w.int(U4, 4)?;
    w.canary(CANARY, END_BIT)
}
