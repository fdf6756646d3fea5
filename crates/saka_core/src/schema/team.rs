use super::*;

const CANARY: [u8; 4] = [0xC0, 0x89, 0x3F, 0x76];
const END_BIT: u64 = 0xC1B5C;

pub const PLAYER_COUNT: usize = 0x19;
pub const ABILITY_COUNT: usize = 0x40;
pub const SCOUT_COUNT: usize = 3;
pub const SCOUT_ABILITY_COUNT: usize = 21;
pub const SCOUT_CANDIDATE_COUNT: usize = 0xA;

pub(super) fn read(w: &mut Walker<'_>) -> Result<()> {
    w.group(&[U8, U1, U1], 4)?;
    w.int(U16, 0)?;
    w.group(&[U8; 40], 0)?;
    w.string_named(0x20, "english_name")?;
    w.group(&[U8; 57], 0)?;
    w.string_named(0x20, "oilis_english_name")?;
    w.group(&[U8; 15], 0)?;
    w.group(&[U16, U16, U8, U8], 0)?;
    players(w)?;
    // A second copy of the squad block follows; it mirrors the first.
    w.hidden(players)?;

    for _ in 0..20 {
        w.int(U16, 0)?;
        w.string(0xD)?;
        w.group(&[U8; 0x15], 0x16)?;
        w.group(&[U8; 0x2B], 0)?;
        w.int(U16, 0)?;
    }
    w.group(&[U16, U4, U7], 4)?;
    for _ in 0..0x40 {
        w.group(&[U16, U16, U16], 0)?;
    }
    w.int(U11, 0)?;
    w.string(0xD)?;
    w.group(
        &[U8, U8, U4, U4, U7, U8, U4, U7, U3, U7, U16, U16, U4, U4, U4, U4],
        18,
    )?;
    w.group(
        &[U1, U2, U4, U4, U4, U4, U7, U7, U7, U7, U7, U3, U3, U3, U3, U3],
        16,
    )?;
    w.group(
        &[
            U3, U3, U3, U3, U3, U3, U4, U4, U4, U7, U4, U7, U3, U3, U7, U5, U1, U3, U4,
        ],
        19,
    )?;
    w.group(&[U32, U2, U10, U8, U8, U16, U8, U3, U3, U8, U8, U8], 17)?;
    w.group(&[U16; 14], 0)?;
    w.group(&[U32, U16, U16, U16, U16, U16], 0)?;
    w.group(&[U4, U7, U4, U7, U6, U4, U8, U4, U16, U16, U7], 13)?;
    w.group(&[U8; 9], 0)?;
    w.group(
        &[U16, U16, U8, U8, U5, U5, U6, U32, U32, U32, U32, U16],
        27,
    )?;
    for _ in 0..7 {
        w.group(&[S6, U8], 2)?;
        w.group(&[U8; 10], 0)?;
    }
    w.int(U8, 0)?;
    w.align(13);
    w.group(&[U16, U16, U16, U16], 10)?;
    w.group(&[U1; 0x19 * 0xA], 0x19 * 0xA)?;
    w.group(&[U7; 0x19 * 6], 0x19 * 6)?;
    w.group(&[U32; 0x19], 0)?;
    for _ in 0..0x19 + 2 {
        w.group(&[U8, U8], 2)?;
        w.group(&[U7, U7, U7, U7, U7, U7, U7, U7, U10], 9)?;
        w.group(&[U7, U7, U7, U7, U7, U7, U7, U7, U10], 9)?;
        w.group(&[U2; 48], 48)?;
    }
    w.group(&[U2, U8, U6], 4)?;
    for _ in 0..7 {
        w.group(&[U1, U1, U16, U6], 6)?;
    }
    w.align(2);
    w.group(&[U32; 2], 0)?;
    w.group(&[U8; 0x2E + 9], 0)?;
    w.align(1);
    w.group(&[U1; 3 + 0x2E + 21], 3 + 0x2E + 21)?;
    w.group(&[U6], 2)?;
    w.group(&[U5, U5, U1, U1, U16], 7)?;
    w.group(&[U8, U32], 5)?;
    w.group(&[U8; 0xF], 0)?;
    w.group(&[U1; 0x11 * 2 + 0xF], 0x11 * 2 + 0xF + 4)?;
    youth_players(w)?;
    scouts(w)?;
    coaches(w)?;
    facilities(w)?;
    history(w)?;
    w.canary(CANARY, END_BIT)
}

/// First-team squad: 25 records of 0x240 unpacked bytes plus the
/// formation and relationship tables that follow them.
fn players(w: &mut Walker<'_>) -> Result<()> {
    w.group(&[U16, U16, U1], 5)?;
    w.group(&[S6; PLAYER_COUNT], PLAYER_COUNT + 2)?;
    for i in 0..PLAYER_COUNT {
        w.scope(format!("players[{i}]"), player)?;
    }
    w.int(U16, 0)?;
    for _ in 0..10 {
        w.group(&[S6], 2)?;
        w.int(U16, 0)?;
    }
    w.group(&[S6, S6, U5, S6, S6, S6, S6, S6, U2], 9)?;
    w.group(
        &[
            U5, U3, U2, U2, U2, U2, U3, U3, U4, U4, U4, U4, U4, U4, U4, U4, U4, U4, U4, U3,
        ]
        .repeat(3),
        60,
    )?;
    w.align(1);
    for _ in 0..0x19 {
        w.group(&[U16; 0x19], 0)?;
    }
    w.group(&[U8; 3], 0)?;
    w.group(&[U8; 0x19], 0)?;
    w.int(U3, 2)?;
    w.string(0xD)?;
    w.group(
        &[
            U8, U4, U3, U8, U7, U16, U4, U4, U4, U4, U7, U7, U7, U1, S16, U3, U3, U3, U3, U2, U3,
            U4, U8, U4, U4, U3, U2,
        ],
        29,
    )?;
    w.group(&[U7; 0x35], 0x35)?;
    w.group(&[U8, U8, U5, U5, U5, U5, U5, U5, U3, U16, U3, U3, U3], 15)?;
    w.group(&[U16; 9], 0)?;
    w.int(U1, 2)?;
    w.group(&[U3, U1], 2)?;
    for _ in 0..0xC {
        w.group(&[U8, U8, U1, U1], 4)?;
        w.group(&[U1; 0x19], 0x19)?;
        w.group(&[U8, U5, U5, U8, U3].repeat(12), 5 * 12)?;
    }
    w.group(&[U8, U3].repeat(0x19 * 0xC), 2 * (0x19 * 0xC))?;
    for _ in 0..7 {
        w.int(U8, 0)?;
        for _ in 0..3 {
            w.group(&[S6, U8], 2)?;
            w.group(&[U8; 0xA], 0)?;
        }
    }
    w.int(U8, 0)?;
    Ok(())
}

fn player(w: &mut Walker<'_>) -> Result<()> {
    w.group_named(&[U16, U4, U7], 4, &[(0, "id"), (1, "pos"), (2, "age")])?;
    for l in 0..ABILITY_COUNT {
        w.scope(format!("abilities[{l}]"), |w| {
            w.group_named(
                &[U16, U16, U16],
                0,
                &[(0, "current"), (1, "current_max"), (2, "max")],
            )
        })?;
    }
    w.int(U11, 0)?;
    w.string_named(0xD, "name")?;
    w.group_named(
        &[U8, U8, U4, U4, U7, U8, U4, U7, U3, U7],
        11,
        &[
            (0, "born"),
            (1, "born2"),
            (2, "rank"),
            (3, "pos2"),
            (5, "height"),
            (7, "number"),
            (8, "foot"),
        ],
    )?;
    w.group(&[U16, U16], 0)?;
    w.group_named(&[U4, U4, U4, U4, U1, U2, U4, U4, U4, U4], 10, &[(9, "desire")])?;
    w.group_named(
        &[U7, U7, U7, U7, U7, U3, U3, U3, U3, U3, U3, U3, U3, U3, U3, U3],
        16,
        &[
            (0, "pride"),
            (1, "ambition"),
            (2, "persistence"),
            (5, "tone_type"),
            (11, "patient"),
            (14, "cooperation_type"),
            (15, "jl_factor"),
        ],
    )?;
    w.int_named(U4, 1, "grow_type_phy")?;
    w.int_named(U4, 1, "grow_type_tec")?;
    w.int_named(U4, 1, "grow_type_sys")?;
    w.group(&[U7, U4, U7, U3, U3, U7], 6)?;
    w.int_named(U5, 1, "style")?;
    w.group(&[U1, U3, U4], 6)?;
    w.group_named(&[U32, U2], 6, &[(0, "magic_value")])?;
    w.group_named(&[U10, U8, U8, U16], 6, &[(0, "tired"), (3, "salary")])?;
    w.group_named(
        &[U8, U3, U3, U8, U8, U8],
        6,
        &[(1, "offer_years_passed"), (2, "offer_years_total")],
    )?;
    w.group(&[U16; 14], 30)?;
    w.group(&[U32, U16, U16, U16], 0)?;
    w.group_named(
        &[U16, U16, U4, U7, U4, U7, U6, U4, U8, U4],
        12,
        &[(1, "abroad_days"), (9, "abroad_times")],
    )?;
    w.group_named(
        &[U16, U16, U7],
        0,
        &[(0, "captain_exp"), (1, "keyman_exp")],
    )?;
    w.group(&[S8; 9], 9)?;
    w.group_named(&[U16, U16, U8, S8, U5, U5, U6], 12, &[(6, "style_equip")])?;
    w.group_named(
        &[U32, U32, U32, U32, U16],
        20,
        &[
            (0, "style_learned1"),
            (1, "style_learned2"),
            (2, "style_learned3"),
            (3, "style_learned4"),
        ],
    )?;
    Ok(())
}

/// Youth squad records; same shape as the first team but nothing is edited.
fn youth_players(w: &mut Walker<'_>) -> Result<()> {
    for _ in 0..0x18 {
        w.group(&[U16, U4, U7], 4)?;
        w.group(&[U16, U16, U16].repeat(0x40), 0)?;
        w.group(&[U11], 2)?;
        w.string(0xD)?;
        w.group(&[U8, U8, U4, U4, U7, U8, U4, U7, U3, U7], 11)?;
        w.group(&[U16, U16], 0)?;
        w.group(&[U4, U4, U4, U4, U1, U2, U4, U4, U4, U4], 10)?;
        w.group(
            &[U7, U7, U7, U7, U7, U3, U3, U3, U3, U3, U3, U3, U3, U3, U3, U3, U4, U4],
            18,
        )?;
        w.group(&[U4, U7, U4, U7, U3, U3, U7, U5, U1, U3, U4], 14)?;
        w.group(&[U32, U2], 6)?;
        w.group(&[U10, U8, U8, U16], 6)?;
        w.group(&[U8, U3, U3, U8, U8, U8], 6)?;
        w.group(&[U16; 14], 30)?;
        w.group(
            &[U32, U16, U16, U16, U16, U16, U4, U7, U4, U7, U6, U4, U8, U4],
            22,
        )?;
        w.group(&[U16, U16, U7], 0)?;
        w.group(&[S8; 9], 9)?;
        w.group(&[U16, U16, U8, S8, U5, U5, U6], 12)?;
        w.group(&[U32, U32, U32, U32, U16], 20)?;
    }
    w.group(&[S3, U3], 2)?;
    for _ in 0..0x18 {
        w.group(&[U7; 6], 6)?;
    }
    w.align(2);
    w.group(&[U16, U3, U8].repeat(0x12 + 0x16 * 3), 4 * (0x12 + 0x16 * 3))?;
    Ok(())
}

fn scouts(w: &mut Walker<'_>) -> Result<()> {
    for i in 0..SCOUT_COUNT {
        w.scope(format!("scouts[{i}]"), |w| {
            w.int_named(U4, 2, "index")?;
            w.string_named(0xD, "name")?;
            w.group_named(
                &[U8, U8, U4, U7, U7, U16, U8],
                9,
                &[(0, "born"), (1, "age")],
            )?;
            w.group(&[U16, U4, U4, U4, U4], 6)?;
            w.group_indexed(&[U7; SCOUT_ABILITY_COUNT], SCOUT_ABILITY_COUNT, "abilities")?;
            w.group_named(
                &[U8, U8, U8, U16, U3, U3, U2],
                9,
                &[(0, "area1"), (1, "area2"), (3, "id")],
            )?;
            for _ in 0..5 {
                w.group(&[U16, U11, U4, U6, U8], 8)?;
                w.group(&[U16, U16, U3, U8], 6)?;
            }
            w.group(&[U14, U4, U5, U3], 6)?;
            w.group(
                &[U8, U8, U4, U3, U11, U8, U16, U11, U11, U11, U11, U11],
                20,
            )?;
            Ok(())
        })?;
    }
    for i in 0..SCOUT_CANDIDATE_COUNT {
        w.scope(format!("scout_candidates[{i}]"), |w| {
            w.group_named(
                &[U16, U3, U8],
                4,
                &[(0, "id"), (1, "offer_years"), (2, "age")],
            )
        })?;
    }
    Ok(())
}

fn coaches(w: &mut Walker<'_>) -> Result<()> {
    for _ in 0..4 {
        w.int(U3, 2)?;
        w.string(0xD)?;
        w.group(&[U8, U4, U3, U8, U7, U16, U4, U4, U4, U4], 11)?;
        w.group(
            &[U7, U7, U7, U1, U16, U3, U3, U3, U3, U2, U3, U4, U8, U4, U4, U3, U2],
            18,
        )?;
        w.group(&[U7; 0x35], 0x35)?;
        w.group(&[U8, U8, U5, U5, U5, U5, U5, U5, U3, U16, U3, U3, U3], 14)?;
        w.group(&[U16; 9], 20)?;
        w.int(U1, 1)?;
    }
    Ok(())
}

fn facilities(w: &mut Walker<'_>) -> Result<()> {
    for _ in 0..0x32 {
        w.group(&[U9, U6, U6, U9, U3], 8)?;
        w.group(&[U16, U16, U32, U16, U16, U16, U16], 0)?;
        w.group(&[U21], 4)?;
        w.group(&[U21], 4)?;
        w.group(&[U32; 13], 0)?;
    }
    for _ in 0..0x32 {
        w.group(&[U8, U6, U8, U2], 4)?;
        w.group(&[U16, U16, U32, U8], 12)?;
        w.group(&[U32; 0x10], 0)?;
        w.group(&[U8; 0x10], 0)?;
    }
    w.group(&[U8; 8 * 0xC], 0)?;
    w.int(U1, 2)?;
    w.int(U4, 2)?;
    w.group(&[U16, U8, U8, U8, U1, U1, U1, U1, U1], 12)?;
    w.group(&[U32; 0x10], 0)?;
    for _ in 0..7 {
        w.group(&[U8, U3, U3, U8, U8, U3, U16, U1, U1], 10)?;
    }
    w.group(&[U8; 0x20 + 0x1A], 0)?;
    w.group(&[U32; 3], 0)?;
    w.int(U2, 2)?;
    w.group(&[U16; 11], 0)?;
    for _ in 0..0x2C {
        w.group(&[U8, U3], 4)?;
        w.group(&[U32], 0)?;
    }
    for _ in 0..0x36 {
        w.group(&[U2, U1, U1], 3)?;
    }
    w.group(&[U8; 12], 0)?;
    for _ in 0..6 {
        w.int(U8, 1)?;
        for _ in 0..5 {
            w.string(0xD)?;
        }
        w.int(U8, 1)?;
    }
    w.group(&[U6, U1].repeat(4), 8)?;
    for _ in 0..0x27 {
        w.group(&[U2, U8, U8, U1], 4)?;
    }
    w.group(&[U8; 10], 0)?;
    w.group(&[U6, U1].repeat(4), 8)?;
    w.group(&[U8; 0x27 + 6], 0)?;
    w.align(1);
    for _ in 0..0x19 {
        w.group(&[U16, U16, U16], 0)?;
    }
    w.align(1);
    w.group(&[U8, U32, U32, U32], 0)?;
    for _ in 0..6 {
        w.group(&[U8; 0x16], 0)?;
        w.group(&[U2, U2, U2, U5, U5, U5], 6)?;
        w.group(&[U32; 3], 0)?;
        for _ in 0..0xA8 * 2 {
            w.align(4);
            w.int(S3, 4)?;
            for _ in 0..3 {
                w.align(4);
                w.group(&[S5, S6, S5, S4], 4)?;
                w.align(1);
                w.group(&[S4, S7, S7], 3)?;
            }
        }
    }
    Ok(())
}

fn history(w: &mut Walker<'_>) -> Result<()> {
    w.group(&[U32; 6], 0)?;
    w.group(&[U8; 2], 0)?;
    w.group(&[U16; 9], 0)?;
    w.group(&[U32; 9], 0)?;
    for _ in 0..0x1A {
        w.string(0xD)?;
        w.group(&[U8, U4, U8, U8, U3, U4, U6, U3], 8)?;
        w.group(&[U8; 18], 0)?;
        w.group(&[U8; 0x15 + 0x2B], 0)?;
        w.group(&[U8, S6, U16], 5)?;
    }
    for _ in 0..0x34 {
        w.group(&[U16, U11], 4)?;
        w.group(&[U4, U6, U8], 4)?;
        w.group(&[U16, U16, U3, U8], 6)?;
    }
    for _ in 0..0x78 + 0x3C + 0x3C {
        w.group(&[U16, U8], 4)?;
    }
    for _ in 0..0x1A {
        w.group(&[U8], 2)?;
        w.group(&[U16, U16, U16, U16], 0)?;
    }
    w.group(&[U16; 200], 0)?;
    for _ in 0..2 {
        w.group(&[U4], 2)?;
        w.string(0xD)?;
        w.group(&[U8, U8, U4, U7, U7, U16, U8, U16], 10)?;
        w.group(&[U4; 4], 5)?;
        w.group(&[U7; 21], 21)?;
        w.group(&[U8; 3], 3)?;
        w.group(&[U16, U3, U3, U2], 6)?;
        for _ in 0..5 {
            w.group(&[U16, U11], 4)?;
            w.group(&[U4, U6, U8], 4)?;
            w.group(&[U16, U16, U3, U8], 6)?;
        }
        w.group(&[U14, U4, U5, U3, U8, U8, U4, U3, U11, U8, U16], 14)?;
        w.group(&[U11; 5], 12)?;
    }
    w.group(&[U16, U16, U8], 6)?;
    w.group(&[U16; 0xD * 3], 0)?;
    w.group(&[U16], 4)?;
    w.group(&[U32, U32, U32, U16, U16, U16], 0)?;
    w.group(&[U3, U3], 2)?;
    w.group(&[U16; 2], 0)?;
    w.group(&[U32; 6], 0)?;
    Ok(())
}
