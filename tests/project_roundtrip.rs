use sprite_editor::{
    common::SetKind,
    document::Document,
    export::{export_project, ExportOptions},
    message::{Message, Tool},
    persist::{open_project, save_project},
    sprite::RotateDirection,
    update::update,
};

#[test]
fn edit_save_open_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.xml");

    let mut doc = Document::with_defaults().unwrap();
    let set = doc.spritesets.iter().next().unwrap().id;
    let key = doc
        .add_sprite(SetKind::Foreground, set, 2, 4, "hero", "main character", 1)
        .unwrap();
    let points = (0..16).map(|y| (3, y)).collect();
    update(
        &mut doc,
        Message::Stroke {
            sprite: key,
            tool: Tool::Pencil,
            points,
        },
    )
    .unwrap();
    update(&mut doc, Message::RotateSprite(key, RotateDirection::Clockwise180)).unwrap();
    assert!(doc.modified);

    save_project(&mut doc, &path).unwrap();
    assert!(!doc.modified);
    assert!(!dir.path().join("game.xml.tmp").exists());

    let (mut loaded, report) = open_project(&path).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    let hero = loaded
        .spriteset(SetKind::Foreground, set)
        .unwrap()
        .sprite_by_name("hero")
        .unwrap();
    assert!(hero.is_size(2, 4));
    assert_eq!(hero.description, "main character");
    // Column 3 of the top half ends up as column 12 of the bottom half.
    assert_eq!(hero.get_pixel(12, 31), 1);
    assert_eq!(hero.get_pixel(12, 16), 1);
    assert_eq!(hero.get_pixel(12, 15), 0);
    assert_eq!(hero.get_pixel(3, 0), 0);

    let options = ExportOptions {
        stem: "game_data".to_string(),
        ..Default::default()
    };
    let out = dir.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    let summary = export_project(&mut loaded, &out, &options).unwrap();
    assert_eq!(summary.fg_tiles, 9);
    let tiles = std::fs::read(out.join("game_data_tiles.bin")).unwrap();
    assert_eq!(tiles.len(), 9 * 32);
    let header = std::fs::read_to_string(out.join("game_data.h")).unwrap();
    assert!(header.contains("#define kSprite_hero 1"));
}

#[test]
fn failed_open_leaves_document_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xml");
    std::fs::write(&path, "<spritely version=\"2\"><palettes>").unwrap();

    let doc = Document::with_defaults().unwrap();
    let before = doc.spritesets.len();
    assert!(open_project(&path).is_err());
    assert_eq!(doc.spritesets.len(), before);
}

#[test]
fn documents_keep_separate_history() {
    let mut a = Document::with_defaults().unwrap();
    let mut b = Document::with_defaults().unwrap();
    let set = a.spritesets.iter().next().unwrap().id;
    let key = a.add_sprite(SetKind::Foreground, set, 1, 1, "", "", 0).unwrap();
    update(
        &mut a,
        Message::Click {
            sprite: key,
            tool: Tool::Pencil,
            x: 0,
            y: 0,
        },
    )
    .unwrap();
    assert!(a.undo_mgr().can_undo());
    assert!(!b.undo_mgr().can_undo());
    assert!(!update(&mut b, Message::Undo).unwrap());

    // Auto names come from each document's own counter.
    assert_eq!(a.sprite(key).unwrap().name, "S3");
    let key_b = b.add_sprite(SetKind::Foreground, set, 1, 1, "", "", 0).unwrap();
    assert_eq!(b.sprite(key_b).unwrap().name, "S3");
}
