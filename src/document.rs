use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use log::{info, warn};

use crate::{
    common::{ColorIdx, MapId, Options, PaletteId, SetKind, SpritesetId, SubpaletteIdx},
    map::{BackgroundMap, DEFAULT_MAP_SIZE},
    message::Dialogue,
    palette::{Palette, Palettes, Subpalette},
    sprite::Sprite,
    spriteset::{NameSeq, Spriteset, Spritesets},
    undo::{SpriteKey, SubpaletteKey, UndoAction, UndoMgr},
};

pub struct Document {
    pub name: String,
    pub options: Options,
    pub palettes: Palettes,
    pub spritesets: Spritesets,
    pub bg_palettes: Palettes,
    pub bg_spritesets: Spritesets,
    pub maps: Vec<BackgroundMap>,

    // Editor state that is not saved:
    pub dialogue: Option<Dialogue>,
    pub modified: bool,
    pub path: Option<PathBuf>,
    pub(crate) undo: UndoMgr,
    pub(crate) names: NameSeq,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// An empty document with no palettes or sprite sets.
    pub fn new() -> Self {
        Document {
            name: "project".to_string(),
            options: Options::default(),
            palettes: Palettes::new(SetKind::Foreground),
            spritesets: Spritesets::new(SetKind::Foreground),
            bg_palettes: Palettes::new(SetKind::Background),
            bg_spritesets: Spritesets::new(SetKind::Background),
            maps: vec![],
            dialogue: None,
            modified: false,
            path: None,
            undo: UndoMgr::default(),
            names: NameSeq::default(),
        }
    }

    /// The starting point for a new project: one palette and one sprite set of
    /// each kind, a first sprite and a blank background map.
    pub fn with_defaults() -> Result<Self> {
        let mut doc = Document::new();
        let pal = doc.add_palette(SetKind::Foreground, "Palette", "")?;
        let ss = doc.add_spriteset(SetKind::Foreground, "Sprites", pal, "")?;
        doc.add_sprite(SetKind::Foreground, ss, 1, 1, "", "", 0)?;
        let bg_pal = doc.add_palette(SetKind::Background, "BgPalette", "")?;
        let bg_ss = doc.add_spriteset(SetKind::Background, "BgTiles", bg_pal, "")?;
        doc.add_sprite(SetKind::Background, bg_ss, 1, 1, "", "", 0)?;
        doc.add_map("Map", bg_ss, DEFAULT_MAP_SIZE, DEFAULT_MAP_SIZE)?;
        doc.modified = false;
        Ok(doc)
    }

    pub fn set_undo_limit(&mut self, limit: usize) {
        self.undo = UndoMgr::new(limit);
    }

    pub fn undo_mgr(&self) -> &UndoMgr {
        &self.undo
    }

    pub fn palettes(&self, kind: SetKind) -> &Palettes {
        match kind {
            SetKind::Foreground => &self.palettes,
            SetKind::Background => &self.bg_palettes,
        }
    }

    pub fn palettes_mut(&mut self, kind: SetKind) -> &mut Palettes {
        match kind {
            SetKind::Foreground => &mut self.palettes,
            SetKind::Background => &mut self.bg_palettes,
        }
    }

    pub fn spritesets(&self, kind: SetKind) -> &Spritesets {
        match kind {
            SetKind::Foreground => &self.spritesets,
            SetKind::Background => &self.bg_spritesets,
        }
    }

    pub fn spritesets_mut(&mut self, kind: SetKind) -> &mut Spritesets {
        match kind {
            SetKind::Foreground => &mut self.spritesets,
            SetKind::Background => &mut self.bg_spritesets,
        }
    }

    pub fn add_palette(&mut self, kind: SetKind, name: &str, desc: &str) -> Result<PaletteId> {
        let pal = self.palettes_mut(kind).add_palette(name, None, desc)?;
        pal.set_default_palette();
        let id = pal.id;
        self.modified = true;
        Ok(id)
    }

    pub fn add_spriteset(
        &mut self,
        kind: SetKind,
        name: &str,
        palette_id: PaletteId,
        desc: &str,
    ) -> Result<SpritesetId> {
        ensure!(
            self.palettes(kind).get(palette_id).is_some(),
            "palette {} does not exist",
            palette_id
        );
        let id = self
            .spritesets_mut(kind)
            .add_spriteset(name, None, desc, palette_id)?
            .id;
        self.modified = true;
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_sprite(
        &mut self,
        kind: SetKind,
        spriteset: SpritesetId,
        width: usize,
        height: usize,
        name: &str,
        desc: &str,
        subpalette: SubpaletteIdx,
    ) -> Result<SpriteKey> {
        let set = match kind {
            SetKind::Foreground => self.spritesets.get_mut(spriteset),
            SetKind::Background => self.bg_spritesets.get_mut(spriteset),
        }
        .context("sprite set not found")?;
        let sprite = set.add_sprite(width, height, name, desc, subpalette, &mut self.names)?;
        self.modified = true;
        Ok(SpriteKey {
            kind,
            spriteset,
            sprite,
        })
    }

    pub fn duplicate_sprite(&mut self, key: SpriteKey) -> Result<SpriteKey> {
        let set = match key.kind {
            SetKind::Foreground => self.spritesets.get_mut(key.spriteset),
            SetKind::Background => self.bg_spritesets.get_mut(key.spriteset),
        }
        .context("sprite set not found")?;
        let sprite = set.duplicate_sprite(key.sprite, &mut self.names)?;
        self.modified = true;
        Ok(SpriteKey { sprite, ..key })
    }

    /// Remove a sprite. Its undo history goes with it.
    pub fn delete_sprite(&mut self, key: SpriteKey) -> Result<()> {
        let removed = self
            .spritesets_mut(key.kind)
            .get_mut(key.spriteset)
            .context("sprite set not found")?
            .remove_sprite(key.sprite)
            .context("sprite not found")?;
        info!("Deleted sprite {}", removed.name);
        self.undo.forget_sprite(key);
        self.cancel_dialogue_for(key);
        self.modified = true;
        Ok(())
    }

    pub fn add_map(&mut self, name: &str, spriteset: SpritesetId, width: usize, height: usize) -> Result<MapId> {
        ensure!(
            self.bg_spritesets.get(spriteset).is_some(),
            "background sprite set {} does not exist",
            spriteset
        );
        ensure!(
            !self.maps.iter().any(|m| m.name == name),
            "map name '{}' already exists",
            name
        );
        let id = self.maps.iter().map(|m| m.id + 1).max().unwrap_or(0);
        self.maps
            .push(BackgroundMap::new(name, id, "", spriteset, width, height)?);
        self.modified = true;
        Ok(id)
    }

    pub fn spriteset(&self, kind: SetKind, id: SpritesetId) -> Option<&Spriteset> {
        self.spritesets(kind).get(id)
    }

    pub fn sprite(&self, key: SpriteKey) -> Option<&Sprite> {
        self.spritesets(key.kind).get(key.spriteset)?.sprite(key.sprite)
    }

    pub fn sprite_mut(&mut self, key: SpriteKey) -> Option<&mut Sprite> {
        self.spritesets_mut(key.kind)
            .get_mut(key.spriteset)?
            .sprite_mut(key.sprite)
    }

    pub fn palette_for(&self, key: SpriteKey) -> Option<&Palette> {
        let set = self.spriteset(key.kind, key.spriteset)?;
        self.palettes(key.kind).get(set.palette_id)
    }

    /// The subpalette a sprite is drawn with.
    pub fn subpalette_for(&self, key: SpriteKey) -> Option<&Subpalette> {
        let sprite = self.sprite(key)?;
        Some(self.palette_for(key)?.subpalette(sprite.subpalette))
    }

    pub fn subpalette_key_for(&self, key: SpriteKey) -> Option<SubpaletteKey> {
        let set = self.spriteset(key.kind, key.spriteset)?;
        Some(SubpaletteKey {
            kind: key.kind,
            palette: set.palette_id,
            subpalette: self.sprite(key)?.subpalette,
        })
    }

    pub fn subpalette(&self, key: SubpaletteKey) -> Option<&Subpalette> {
        Some(self.palettes(key.kind).get(key.palette)?.subpalette(key.subpalette))
    }

    pub fn subpalette_mut(&mut self, key: SubpaletteKey) -> Option<&mut Subpalette> {
        Some(
            self.palettes_mut(key.kind)
                .get_mut(key.palette)?
                .subpalette_mut(key.subpalette),
        )
    }

    /// The color the pencil and flood fill paint with on this sprite.
    pub fn current_color(&self, key: SpriteKey) -> Option<ColorIdx> {
        Some(self.subpalette_for(key)?.current_color)
    }

    /// Run an edit on a sprite and record it for undo. Returns true if the
    /// sprite's state actually changed.
    pub fn edit_sprite(&mut self, key: SpriteKey, description: &str, f: impl FnOnce(&mut Sprite)) -> Result<bool> {
        let sprite = self.sprite_mut(key).context("sprite not found")?;
        f(sprite);
        self.record_sprite_edit(key, description)
    }

    /// Snapshot the sprite and push an undo action if it differs from the last
    /// snapshot.
    pub fn record_sprite_edit(&mut self, key: SpriteKey, description: &str) -> Result<bool> {
        let sprite = self.sprite_mut(key).context("sprite not found")?;
        match sprite.take_undo_diff() {
            Some((before, after)) => {
                self.undo
                    .push(description, UndoAction::SpriteEdit { key, before, after });
                self.cancel_dialogue_for(key);
                self.modified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn record_subpalette_edit(&mut self, key: SubpaletteKey, description: &str) -> Result<bool> {
        let sp = self.subpalette_mut(key).context("subpalette not found")?;
        match sp.take_undo_diff() {
            Some((before, after)) => {
                self.undo
                    .push(description, UndoAction::SubpaletteEdit { key, before, after });
                self.modified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // A pending question about a sprite no longer holds once the sprite changes.
    fn cancel_dialogue_for(&mut self, key: SpriteKey) {
        let pending = matches!(
            self.dialogue,
            Some(Dialogue::ConfirmResizeClip { sprite, .. }) if sprite == key
        );
        if pending {
            info!("Sprite {:?} changed; dropping pending confirmation", key);
            self.dialogue = None;
        }
    }

    fn apply_undo_action(&mut self, action: &UndoAction, forward: bool) -> Result<()> {
        match action {
            UndoAction::SpriteEdit { key, before, after } => {
                let data = if forward { after } else { before };
                self.sprite_mut(*key)
                    .context("sprite for undo action no longer exists")?
                    .apply_undo_data(data)?;
                self.cancel_dialogue_for(*key);
                Ok(())
            }
            UndoAction::SubpaletteEdit { key, before, after } => {
                let colors = if forward { after } else { before };
                self.subpalette_mut(*key)
                    .context("subpalette for undo action no longer exists")?
                    .apply_undo_data(colors);
                Ok(())
            }
        }
    }

    /// Number everything for export: palettes and maps 0.. per kind, sprites
    /// 0.. within each sprite set. Tile ids run on across the sprite sets of
    /// one kind. Returns the foreground and background tile counts.
    ///
    /// The ids go stale on the next structural edit.
    pub fn assign_export_ids(&mut self) -> (u32, u32) {
        for palettes in [&mut self.palettes, &mut self.bg_palettes] {
            for (i, p) in palettes.iter_mut().enumerate() {
                p.export_id = i as u32;
            }
        }
        let mut counts = [0; 2];
        for (sets, count) in [&mut self.spritesets, &mut self.bg_spritesets]
            .into_iter()
            .zip(counts.iter_mut())
        {
            for (i, set) in sets.iter_mut().enumerate() {
                set.export_id = i as u32;
                *count = set.assign_export_ids(*count);
            }
        }
        for (i, m) in self.maps.iter_mut().enumerate() {
            m.export_id = i as u32;
        }
        (counts[0], counts[1])
    }

    /// Revert the most recent action. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(entry) = self.undo.pop_undo() else {
            return Ok(false);
        };
        if let Err(e) = self.apply_undo_action(&entry.action, false) {
            warn!("Dropping undo action '{}': {}", entry.description, e);
            return Err(e);
        }
        info!("Undo {}", entry.description);
        self.undo.push_undone(entry);
        self.modified = true;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let Some(entry) = self.undo.pop_redo() else {
            return Ok(false);
        };
        if let Err(e) = self.apply_undo_action(&entry.action, true) {
            warn!("Dropping redo action '{}': {}", entry.description, e);
            return Err(e);
        }
        info!("Redo {}", entry.description);
        self.undo.push_redone(entry);
        self.modified = true;
        Ok(true)
    }
}
