use super::*;

const CANARY: [u8; 4] = [0x40, 0x03, 0xBF, 0xFC];
const END_BIT: u64 = 0x1045A2;

pub const TEAM_COUNT: usize = 0x109;
pub const PLAYER_COUNT: usize = 0x19;

pub(super) fn read(w: &mut Walker<'_>) -> Result<()> {
    for i in 0..TEAM_COUNT {
        w.scope(format!("teams[{i}]"), |w| {
            w.int_named(U16, 0, "id")?;
            for j in 0..PLAYER_COUNT {
                w.scope(format!("players[{j}]"), |w| {
                    w.group_named(
                        &[U16, U7, U8],
                        4,
                        &[(0, "id"), (1, "age"), (2, "ability_graph")],
                    )
                })?;
            }
            w.group_named(
                &[U16, U16, U7],
                6,
                &[(0, "unknown1"), (1, "unknown2"), (2, "friendly")],
            )
        })?;
    }
    // Shirt numbers are stored apart from the player records.
    for i in 0..TEAM_COUNT {
        for j in 0..PLAYER_COUNT {
            w.scope(format!("teams[{i}].players[{j}]"), |w| {
                w.int_named(U8, 0, "number")
            })?;
        }
    }
    w.group(&[U8, U8], 3)?;
    w.canary(CANARY, END_BIT)
}
