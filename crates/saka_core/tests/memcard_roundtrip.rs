mod common;

use std::fs;
use std::io::Cursor;

use saka_core::Error;
use saka_core::memcard::{CardImage, HEAD_FILE, ICON_FILE, MemoryCard};

use common::{
    CLUSTER_LEN, Node, OTHER_GAME, PAGES_PER_CLUSTER, SLOT_A, SLOT_B, build_card, expected_spare,
    page_of, sample_card, sample_container, sample_head, sample_icon, save_dir, spare_of,
    write_card,
};

fn open(bytes: Vec<u8>) -> MemoryCard<Cursor<Vec<u8>>> {
    MemoryCard::open(Cursor::new(bytes)).expect("open card")
}

#[test]
fn root_listing_hides_dot_entries() {
    let mut card = open(sample_card());
    assert_eq!(card.geometry().cluster_len, CLUSTER_LEN);
    assert_eq!(card.geometry().spare_len, 16);

    let names: Vec<String> = card
        .list_root_dir()
        .expect("list root")
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, [SLOT_A, OTHER_GAME, SLOT_B]);
    assert_eq!(card.save_names().expect("save names"), [SLOT_A, SLOT_B]);
}

#[test]
fn only_self_and_parent_entries_are_hidden() {
    let bytes = build_card(vec![
        Node::Dir {
            name: ".settings".to_string(),
            children: vec![],
        },
        save_dir(SLOT_A, vec![7u8; 100], sample_head(2004, b"A")),
    ]);
    let mut card = open(bytes);
    let names: Vec<String> = card
        .list_root_dir()
        .expect("list root")
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, [".settings", SLOT_A]);
    assert_eq!(card.save_names().expect("save names"), [SLOT_A]);
}

#[test]
fn save_entry_reads_all_three_files() {
    let mut card = open(sample_card());
    let entry = card.read_save_entry(SLOT_A).expect("read slot");
    assert_eq!(entry.name, SLOT_A);
    assert_eq!(entry.main_bytes, sample_container());
    assert_eq!(entry.head_bytes, sample_head(2004, b"RUST FC"));
    assert_eq!(entry.icon_bytes, sample_icon());
    assert_eq!(
        entry.modified.map(|t| t.to_string()).as_deref(),
        Some("2004-04-01 12:30:00")
    );

    let files: Vec<String> = card
        .lookup_entry_by_name(SLOT_A)
        .expect("lookup")
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(files, [SLOT_A, HEAD_FILE, ICON_FILE]);
}

#[test]
fn missing_entries_are_not_found() {
    let mut card = open(sample_card());
    assert!(matches!(
        card.lookup_entry_by_name("BISLPM-65530Saka_G99"),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        card.read_save_entry(OTHER_GAME),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn chain_write_then_read_returns_the_new_data_and_fresh_ecc() {
    let mut card = open(sample_card());
    let files = card.lookup_entry_by_name(SLOT_A).expect("lookup");
    let main = files.iter().find(|e| e.name == SLOT_A).expect("main file");
    let chain = card.cluster_chain(main.cluster).expect("chain");
    assert_eq!(chain.len(), (main.length as usize).div_ceil(CLUSTER_LEN));

    let data: Vec<u8> = (0..main.length).map(|i| (i * 31 % 256) as u8).collect();
    card.write_data_cluster(main, &data).expect("write");
    assert_eq!(card.read_data_cluster(main).expect("read back"), data);

    let alloc_offset = card.geometry().alloc_offset as usize;
    let image = card.into_inner().into_inner();
    let first_page = (chain.clusters()[0] as usize + alloc_offset) * PAGES_PER_CLUSTER;
    let page = page_of(&image, first_page);
    assert_eq!(&page[..16], &data[..16]);
    assert_eq!(spare_of(&image, first_page), expected_spare(page).as_slice());
}

#[test]
fn writes_must_match_the_existing_length() {
    let mut card = open(sample_card());
    let files = card.lookup_entry_by_name(SLOT_A).expect("lookup");
    let head = files.iter().find(|e| e.name == HEAD_FILE).expect("head");
    let too_long = vec![0u8; head.length as usize + 1];
    assert!(matches!(
        card.write_data_cluster(head, &too_long),
        Err(Error::ValueOutOfRange(_))
    ));
}

#[test]
fn image_write_touches_only_the_target_save() {
    let dir = tempfile::tempdir().expect("tempdir");
    let original = sample_card();
    let path = write_card(dir.path(), &original);
    let image = CardImage::new(&path);

    let other_before = image.read_save_entry(SLOT_B).expect("slot b");
    let mut main = image.read_save_entry(SLOT_A).expect("slot a").main_bytes;
    main[100] ^= 0xFF;
    let head = sample_head(2010, b"RUST FC");
    image
        .write_save_entry(SLOT_A, &main, Some(&head))
        .expect("write back");

    let after = image.read_save_entry(SLOT_A).expect("reread");
    assert_eq!(after.main_bytes, main);
    assert_eq!(after.head_bytes, head);
    assert_eq!(after.icon_bytes, sample_icon());
    assert_eq!(image.read_save_entry(SLOT_B).expect("slot b"), other_before);
    assert_eq!(fs::metadata(&path).expect("stat").len() as usize, original.len());
}

#[test]
fn head_is_left_alone_when_not_given() {
    let bytes = build_card(vec![save_dir(
        SLOT_A,
        vec![7u8; 3000],
        sample_head(2004, b"A"),
    )]);
    let mut card = open(bytes);
    card.write_save_entry(SLOT_A, &[9u8; 3000], None)
        .expect("write main only");
    let entry = card.read_save_entry(SLOT_A).expect("reread");
    assert_eq!(entry.main_bytes, vec![9u8; 3000]);
    assert_eq!(entry.head_bytes, sample_head(2004, b"A"));
}

#[test]
fn unformatted_images_are_rejected() {
    assert!(matches!(
        MemoryCard::open(Cursor::new(vec![0u8; 4096])),
        Err(Error::FormatMismatch(_))
    ));
    let mut short = sample_card();
    short.truncate(short.len() - 100);
    assert!(matches!(
        MemoryCard::open(Cursor::new(short)),
        Err(Error::FormatMismatch(_))
    ));
}
