use anyhow::{bail, ensure, Context, Result};
use log::{info, warn};

use crate::{
    common::{ColorIdx, NUM_COLORS, NUM_SUBPALETTES},
    document::Document,
    message::{Dialogue, Message, Tool},
    sprite::{self, ClickResult},
    undo::SpriteKey,
};

// One tool click or a whole stroke; the stroke becomes a single undo entry.
fn apply_tool(doc: &mut Document, key: SpriteKey, tool: Tool, points: &[(usize, usize)]) -> Result<bool> {
    let current_color = doc.current_color(key).context("sprite not found")?;
    let op = tool.click_op();
    let mut picked: Option<ColorIdx> = None;
    let changed = doc.edit_sprite(key, tool.description(), |s| {
        for &(x, y) in points {
            if let ClickResult::Picked(c) = s.click(x, y, op, current_color) {
                picked = Some(c);
            }
        }
    })?;
    if let Some(c) = picked {
        let sp_key = doc.subpalette_key_for(key).context("subpalette not found")?;
        if let Some(sp) = doc.subpalette_mut(sp_key) {
            sp.current_color = c;
        }
    }
    Ok(changed)
}

fn resize(doc: &mut Document, key: SpriteKey, width: usize, height: usize) -> Result<bool> {
    doc.edit_sprite(key, "Resize", |s| {
        s.resize(width, height, || true);
    })
}

/// Apply one message to the document. Returns true if the document changed.
pub fn update(doc: &mut Document, message: Message) -> Result<bool> {
    match message {
        Message::Click { sprite, tool, x, y } => apply_tool(doc, sprite, tool, &[(x, y)]),
        Message::Stroke {
            sprite,
            tool,
            points,
        } => apply_tool(doc, sprite, tool, &points),
        Message::ResizeSprite {
            sprite,
            width,
            height,
        } => {
            ensure!(
                sprite::is_valid_size(width, height),
                "invalid sprite size {}x{}",
                width,
                height
            );
            let s = doc.sprite(sprite).context("sprite not found")?;
            if s.clips_data(width, height) {
                info!("Resizing {} to {}x{} would clip data; asking for confirmation", s.name, width, height);
                doc.dialogue = Some(Dialogue::ConfirmResizeClip {
                    sprite,
                    width,
                    height,
                });
                return Ok(false);
            }
            resize(doc, sprite, width, height)
        }
        Message::ConfirmDialogue(accept) => match doc.dialogue.take() {
            Some(Dialogue::ConfirmResizeClip {
                sprite,
                width,
                height,
            }) => {
                if accept {
                    resize(doc, sprite, width, height)
                } else {
                    Ok(false)
                }
            }
            None => {
                warn!("No dialogue to confirm");
                Ok(false)
            }
        },
        Message::RotateSprite(key, dir) => doc.edit_sprite(key, "Rotate", |s| s.rotate(dir)),
        Message::FlipSprite {
            sprite,
            horizontal,
            vertical,
        } => doc.edit_sprite(sprite, "Flip", |s| s.flip(horizontal, vertical)),
        Message::ShiftPixels(key, dir) => doc.edit_sprite(key, "Shift", |s| s.shift_pixels(dir)),
        Message::ClearSprite(key) => doc.edit_sprite(key, "Clear", |s| s.clear()),
        Message::CopySpriteData { source, target } => {
            let source = doc.sprite(source).context("source sprite not found")?.clone();
            let target_sprite = doc.sprite(target).context("target sprite not found")?;
            if !target_sprite.is_size(source.tile_width(), source.tile_height()) {
                warn!(
                    "Not copying {} into {}: sizes differ",
                    source.name, target_sprite.name
                );
                return Ok(false);
            }
            doc.edit_sprite(target, "Copy", |s| s.copy_data(&source))
        }
        Message::RenameSprite(key, name) => {
            doc.spritesets_mut(key.kind)
                .get_mut(key.spriteset)
                .context("sprite set not found")?
                .rename_sprite(key.sprite, &name)?;
            doc.record_sprite_edit(key, "Rename")
        }
        Message::SetSpriteDescription(key, desc) => {
            doc.edit_sprite(key, "Edit description", |s| s.description = desc)
        }
        Message::SetSpriteSubpalette(key, subpalette) => {
            ensure!(
                (subpalette as usize) < NUM_SUBPALETTES,
                "invalid subpalette id {}",
                subpalette
            );
            doc.edit_sprite(key, "Change subpalette", |s| {
                s.subpalette = subpalette;
                s.flush_bitmaps();
            })
        }
        Message::AddSprite {
            kind,
            spriteset,
            width,
            height,
        } => {
            let key = doc.add_sprite(kind, spriteset, width, height, "", "", 0)?;
            info!("Added sprite {:?}", key);
            Ok(true)
        }
        Message::DuplicateSprite(key) => {
            doc.duplicate_sprite(key)?;
            Ok(true)
        }
        Message::DeleteSprite(key) => {
            doc.delete_sprite(key)?;
            Ok(true)
        }
        Message::SelectSubpalette(key) => {
            ensure!(
                (key.subpalette as usize) < NUM_SUBPALETTES,
                "invalid subpalette id {}",
                key.subpalette
            );
            doc.palettes_mut(key.kind)
                .get_mut(key.palette)
                .context("palette not found")?
                .current_subpalette = key.subpalette;
            Ok(false)
        }
        Message::SelectColor(key, idx) => {
            if idx as usize >= NUM_COLORS {
                bail!("invalid color index {}", idx);
            }
            doc.subpalette_mut(key)
                .context("subpalette not found")?
                .current_color = idx;
            Ok(false)
        }
        Message::SetColor {
            subpalette,
            color_idx,
            color,
        } => {
            ensure!((color_idx as usize) < NUM_COLORS, "invalid color index {}", color_idx);
            doc.subpalette_mut(subpalette)
                .context("subpalette not found")?
                .set_color(color_idx, color);
            doc.record_subpalette_edit(subpalette, "Edit color")
        }
        Message::Undo => doc.undo(),
        Message::Redo => doc.redo(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::SetKind,
        sprite::RotateDirection,
        undo::SubpaletteKey,
    };

    fn setup() -> (Document, SpriteKey) {
        let mut doc = Document::with_defaults().unwrap();
        let set = doc.spritesets.iter().next().unwrap().id;
        let key = doc
            .add_sprite(SetKind::Foreground, set, 2, 2, "hero", "", 0)
            .unwrap();
        (doc, key)
    }

    #[test]
    fn pencil_paints_current_color() {
        let (mut doc, key) = setup();
        let sp = doc.subpalette_key_for(key).unwrap();
        update(&mut doc, Message::SelectColor(sp, 5)).unwrap();
        let changed = update(
            &mut doc,
            Message::Click {
                sprite: key,
                tool: Tool::Pencil,
                x: 3,
                y: 4,
            },
        )
        .unwrap();
        assert!(changed);
        assert_eq!(doc.sprite(key).unwrap().get_pixel(3, 4), 5);
        assert_eq!(doc.undo_mgr().undo_description(), Some("Pencil"));
    }

    #[test]
    fn eyedropper_sets_current_color() {
        let (mut doc, key) = setup();
        doc.edit_sprite(key, "setup", |s| s.set_pixel(1, 1, 9)).unwrap();
        let before = doc.undo_mgr().len();
        let changed = update(
            &mut doc,
            Message::Click {
                sprite: key,
                tool: Tool::Eyedropper,
                x: 1,
                y: 1,
            },
        )
        .unwrap();
        assert!(!changed);
        assert_eq!(doc.current_color(key), Some(9));
        assert_eq!(doc.undo_mgr().len(), before);
    }

    #[test]
    fn stroke_is_one_undo_entry() {
        let (mut doc, key) = setup();
        let points = vec![(0, 0), (1, 0), (2, 0), (3, 0)];
        update(
            &mut doc,
            Message::Stroke {
                sprite: key,
                tool: Tool::Pencil,
                points,
            },
        )
        .unwrap();
        assert_eq!(doc.undo_mgr().len(), 1);
        update(&mut doc, Message::Undo).unwrap();
        assert!(doc.sprite(key).unwrap().is_empty());
    }

    #[test]
    fn clipping_resize_needs_confirmation() {
        let (mut doc, key) = setup();
        doc.edit_sprite(key, "setup", |s| s.set_pixel(12, 12, 1)).unwrap();
        let resize = Message::ResizeSprite {
            sprite: key,
            width: 1,
            height: 1,
        };

        assert!(!update(&mut doc, resize.clone()).unwrap());
        assert!(doc.dialogue.is_some());
        assert!(!update(&mut doc, Message::ConfirmDialogue(false)).unwrap());
        assert!(doc.dialogue.is_none());
        assert_eq!(doc.sprite(key).unwrap().num_tiles(), 4);

        update(&mut doc, resize).unwrap();
        assert!(update(&mut doc, Message::ConfirmDialogue(true)).unwrap());
        assert_eq!(doc.sprite(key).unwrap().num_tiles(), 1);
    }

    #[test]
    fn editing_the_sprite_drops_pending_resize() {
        let (mut doc, key) = setup();
        doc.edit_sprite(key, "setup", |s| s.set_pixel(12, 12, 1)).unwrap();
        let resize = Message::ResizeSprite {
            sprite: key,
            width: 1,
            height: 1,
        };
        update(&mut doc, resize.clone()).unwrap();
        assert!(doc.dialogue.is_some());

        let click = Message::Click {
            sprite: key,
            tool: Tool::Pencil,
            x: 10,
            y: 10,
        };
        assert!(update(&mut doc, click).unwrap());
        assert!(doc.dialogue.is_none());
        assert!(!update(&mut doc, Message::ConfirmDialogue(true)).unwrap());
        assert_eq!(doc.sprite(key).unwrap().num_tiles(), 4);

        // Undo of an edit to that sprite also drops it.
        update(&mut doc, resize).unwrap();
        assert!(update(&mut doc, Message::Undo).unwrap());
        assert!(doc.dialogue.is_none());
    }

    #[test]
    fn resize_without_clipping_applies_directly() {
        let (mut doc, key) = setup();
        doc.edit_sprite(key, "setup", |s| s.set_pixel(0, 0, 1)).unwrap();
        let msg = Message::ResizeSprite {
            sprite: key,
            width: 4,
            height: 4,
        };
        assert!(update(&mut doc, msg).unwrap());
        assert!(doc.dialogue.is_none());
        assert_eq!(doc.sprite(key).unwrap().get_pixel(0, 0), 1);
        let bad = Message::ResizeSprite {
            sprite: key,
            width: 3,
            height: 1,
        };
        assert!(update(&mut doc, bad).is_err());
    }

    #[test]
    fn rotate_undo_restores() {
        let (mut doc, key) = setup();
        doc.edit_sprite(key, "setup", |s| s.set_pixel(0, 0, 7)).unwrap();
        update(&mut doc, Message::RotateSprite(key, RotateDirection::Clockwise90)).unwrap();
        assert_eq!(doc.sprite(key).unwrap().get_pixel(15, 0), 7);
        update(&mut doc, Message::Undo).unwrap();
        assert_eq!(doc.sprite(key).unwrap().get_pixel(0, 0), 7);
        update(&mut doc, Message::Redo).unwrap();
        assert_eq!(doc.sprite(key).unwrap().get_pixel(15, 0), 7);
    }

    #[test]
    fn rename_is_undoable() {
        let (mut doc, key) = setup();
        update(&mut doc, Message::RenameSprite(key, "villain".to_string())).unwrap();
        assert_eq!(doc.sprite(key).unwrap().name, "villain");
        update(&mut doc, Message::Undo).unwrap();
        assert_eq!(doc.sprite(key).unwrap().name, "hero");
        assert!(update(&mut doc, Message::RenameSprite(key, String::new())).is_err());
    }

    #[test]
    fn color_edit_is_undoable() {
        let (mut doc, _) = setup();
        let pal = doc.palettes.iter().next().unwrap().id;
        let key = SubpaletteKey {
            kind: SetKind::Foreground,
            palette: pal,
            subpalette: 3,
        };
        let orig = *doc.subpalette(key).unwrap().colors();
        let msg = Message::SetColor {
            subpalette: key,
            color_idx: 2,
            color: (31, 0, 31),
        };
        assert!(update(&mut doc, msg).unwrap());
        assert_eq!(doc.subpalette(key).unwrap().rgb(2), (31, 0, 31));
        update(&mut doc, Message::Undo).unwrap();
        assert_eq!(*doc.subpalette(key).unwrap().colors(), orig);
    }

    #[test]
    fn copy_requires_same_size() {
        let (mut doc, key) = setup();
        let set = key.spriteset;
        let small = doc
            .add_sprite(SetKind::Foreground, set, 1, 1, "small", "", 0)
            .unwrap();
        let other = doc
            .add_sprite(SetKind::Foreground, set, 2, 2, "other", "", 0)
            .unwrap();
        doc.edit_sprite(key, "setup", |s| s.set_pixel(5, 5, 4)).unwrap();
        let msg = Message::CopySpriteData {
            source: key,
            target: small,
        };
        assert!(!update(&mut doc, msg).unwrap());
        let msg = Message::CopySpriteData {
            source: key,
            target: other,
        };
        assert!(update(&mut doc, msg).unwrap());
        assert_eq!(doc.sprite(other).unwrap().get_pixel(5, 5), 4);
    }

    #[test]
    fn delete_then_undo_skips_deleted_sprite() {
        let (mut doc, key) = setup();
        update(
            &mut doc,
            Message::Click {
                sprite: key,
                tool: Tool::Pencil,
                x: 0,
                y: 0,
            },
        )
        .unwrap();
        update(&mut doc, Message::DeleteSprite(key)).unwrap();
        assert!(!update(&mut doc, Message::Undo).unwrap());
    }
}
