use anyhow::{bail, ensure, Context, Result};

use crate::{
    common::{PaletteId, SetKind, SpriteId, SpritesetId, SubpaletteIdx, NUM_SUBPALETTES},
    sprite::{self, Sprite},
};

/// Counter used to generate default sprite names ("S1", "S2", ...). Owned by
/// the document so independent documents do not share a sequence.
#[derive(Clone, Debug)]
pub struct NameSeq(u32);

impl Default for NameSeq {
    fn default() -> Self {
        NameSeq(1)
    }
}

impl NameSeq {
    pub fn next_name(&mut self) -> String {
        let name = format!("S{}", self.0);
        self.0 += 1;
        name
    }
}

#[derive(Clone, Debug)]
pub struct Spriteset {
    pub name: String,
    pub id: SpritesetId,
    pub desc: String,
    pub palette_id: PaletteId,
    sprites: Vec<Sprite>,
    next_sprite_id: SpriteId,
    pub(crate) export_id: u32,
}

impl Spriteset {
    pub fn new(name: &str, id: SpritesetId, desc: &str, palette_id: PaletteId) -> Self {
        Spriteset {
            name: name.to_string(),
            id,
            desc: desc.to_string(),
            palette_id,
            sprites: vec![],
            next_sprite_id: 1,
            export_id: 0,
        }
    }

    pub fn has_named_sprite(&self, name: &str) -> bool {
        self.sprites.iter().any(|s| s.name == name)
    }

    // Use `name` unless it is empty or taken, in which case generate one.
    fn unique_name(&self, name: &str, names: &mut NameSeq) -> String {
        if !name.is_empty() && !self.has_named_sprite(name) {
            return name.to_string();
        }
        loop {
            let candidate = names.next_name();
            if !self.has_named_sprite(&candidate) {
                return candidate;
            }
        }
    }

    pub fn add_sprite(
        &mut self,
        width: usize,
        height: usize,
        name: &str,
        desc: &str,
        subpalette: SubpaletteIdx,
        names: &mut NameSeq,
    ) -> Result<SpriteId> {
        ensure!(
            sprite::is_valid_size(width, height),
            "invalid sprite size {}x{}",
            width,
            height
        );
        ensure!(
            (subpalette as usize) < NUM_SUBPALETTES,
            "invalid subpalette id {}",
            subpalette
        );
        let name = self.unique_name(name, names);
        let id = self.next_sprite_id;
        self.next_sprite_id += 1;
        self.sprites
            .push(Sprite::new(id, width, height, &name, desc, subpalette));
        Ok(id)
    }

    pub fn duplicate_sprite(&mut self, id: SpriteId, names: &mut NameSeq) -> Result<SpriteId> {
        let source = self.sprite(id).context("sprite not found")?.clone();
        let new_id = self.add_sprite(
            source.tile_width(),
            source.tile_height(),
            "",
            &source.description,
            source.subpalette,
            names,
        )?;
        let dup = self.sprite_mut(new_id).context("sprite not found")?;
        dup.duplicate_from(&source);
        dup.record_snapshot();
        Ok(new_id)
    }

    pub fn remove_sprite(&mut self, id: SpriteId) -> Option<Sprite> {
        let idx = self.sprites.iter().position(|s| s.id() == id)?;
        Some(self.sprites.remove(idx))
    }

    pub fn rename_sprite(&mut self, id: SpriteId, name: &str) -> Result<()> {
        if name.is_empty() {
            bail!("Empty sprite name is invalid.");
        }
        if self.sprites.iter().any(|s| s.name == name && s.id() != id) {
            bail!("Sprite name {} already exists.", name);
        }
        self.sprite_mut(id).context("sprite not found")?.name = name.to_string();
        Ok(())
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.id() == id)
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.sprites.iter_mut().find(|s| s.id() == id)
    }

    pub fn sprite_by_name(&self, name: &str) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.name == name)
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprites_mut(&mut self) -> std::slice::IterMut<'_, Sprite> {
        self.sprites.iter_mut()
    }

    pub fn num_tiles(&self) -> usize {
        self.sprites.iter().map(Sprite::num_tiles).sum()
    }

    /// Number sprites 0.. in list order and give each one a contiguous run of
    /// tile ids starting at `first_tile`. Returns the next unused tile id.
    pub fn assign_export_ids(&mut self, first_tile: u32) -> u32 {
        let mut next_tile = first_tile;
        for (i, s) in self.sprites.iter_mut().enumerate() {
            s.export_id = i as u32;
            s.first_tile_id = next_tile;
            next_tile += s.num_tiles() as u32;
        }
        next_tile
    }

    pub fn export_id(&self) -> u32 {
        self.export_id
    }
}

/// The sprite sets of one kind, in creation order.
#[derive(Clone, Debug)]
pub struct Spritesets {
    pub kind: SetKind,
    sets: Vec<Spriteset>,
    next_id: SpritesetId,
}

impl Spritesets {
    pub fn new(kind: SetKind) -> Self {
        Spritesets {
            kind,
            sets: vec![],
            next_id: 0,
        }
    }

    pub fn add_spriteset(
        &mut self,
        name: &str,
        id: Option<SpritesetId>,
        desc: &str,
        palette_id: PaletteId,
    ) -> Result<&mut Spriteset> {
        let id = id.unwrap_or(self.next_id);
        if self.sets.iter().any(|s| s.id == id) {
            bail!("sprite set id {} already exists", id);
        }
        if self.sets.iter().any(|s| s.name == name) {
            bail!("sprite set name '{}' already exists", name);
        }
        self.next_id = self.next_id.max(id + 1);
        self.sets.push(Spriteset::new(name, id, desc, palette_id));
        self.sets.last_mut().context("sprite set was just added")
    }

    pub fn get(&self, id: SpritesetId) -> Option<&Spriteset> {
        self.sets.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SpritesetId) -> Option<&mut Spriteset> {
        self.sets.iter_mut().find(|s| s.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Spriteset> {
        self.sets.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Spriteset> {
        self.sets.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
