use anyhow::{bail, ensure, Context, Result};

use crate::{
    color,
    common::{Color555, ColorIdx, ColorRGB, PaletteId, SetKind, SubpaletteIdx, NUM_COLORS, NUM_SUBPALETTES},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DefaultColorSet {
    BlackAndWhite,
    GrayScale,
    Color1,
    Color2,
}

const COLOR1: [ColorRGB; NUM_COLORS] = [
    (31, 31, 31),
    (0, 0, 0),
    (31, 0, 0),
    (31, 16, 0),
    (31, 31, 0),
    (16, 31, 0),
    (0, 31, 0),
    (0, 31, 16),
    (0, 31, 31),
    (0, 16, 31),
    (0, 0, 31),
    (16, 0, 31),
    (31, 0, 31),
    (31, 0, 16),
    (16, 16, 16),
    (24, 24, 24),
];

const COLOR2: [ColorRGB; NUM_COLORS] = [
    (31, 31, 31),
    (0, 0, 0),
    (8, 4, 0),
    (16, 8, 2),
    (24, 14, 6),
    (31, 22, 14),
    (31, 28, 22),
    (4, 12, 4),
    (8, 20, 8),
    (14, 28, 14),
    (4, 6, 16),
    (8, 12, 24),
    (16, 20, 31),
    (20, 4, 4),
    (28, 10, 10),
    (31, 18, 18),
];

impl DefaultColorSet {
    pub fn colors(self) -> [Color555; NUM_COLORS] {
        let mut out = [0; NUM_COLORS];
        for (i, c) in out.iter_mut().enumerate() {
            let rgb = match self {
                DefaultColorSet::BlackAndWhite => {
                    if i == 0 {
                        (31, 31, 31)
                    } else {
                        (0, 0, 0)
                    }
                }
                DefaultColorSet::GrayScale => {
                    let v = (31 - i * 31 / (NUM_COLORS - 1)) as u8;
                    (v, v, v)
                }
                DefaultColorSet::Color1 => COLOR1[i],
                DefaultColorSet::Color2 => COLOR2[i],
            };
            *c = color::encode_rgb(rgb);
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct Subpalette {
    colors: [Color555; NUM_COLORS],
    pub current_color: ColorIdx,
    snapshot: [Color555; NUM_COLORS],
}

impl Subpalette {
    pub fn new(set: DefaultColorSet) -> Self {
        let colors = set.colors();
        Subpalette {
            colors,
            current_color: 1,
            snapshot: colors,
        }
    }

    pub fn set_default_colors(&mut self, set: DefaultColorSet) {
        self.colors = set.colors();
    }

    pub fn colors(&self) -> &[Color555; NUM_COLORS] {
        &self.colors
    }

    pub fn color(&self, idx: ColorIdx) -> Color555 {
        self.colors[idx as usize % NUM_COLORS]
    }

    pub fn rgb(&self, idx: ColorIdx) -> ColorRGB {
        color::decode(self.color(idx))
    }

    pub fn red(&self, idx: ColorIdx) -> u8 {
        self.rgb(idx).0
    }

    pub fn green(&self, idx: ColorIdx) -> u8 {
        self.rgb(idx).1
    }

    pub fn blue(&self, idx: ColorIdx) -> u8 {
        self.rgb(idx).2
    }

    pub fn set_color(&mut self, idx: ColorIdx, rgb: ColorRGB) {
        self.colors[idx as usize % NUM_COLORS] = color::encode_rgb(rgb);
    }

    /// Replace all 16 colors at once. Anything but 16 values is rejected
    /// without touching the current colors.
    pub fn import(&mut self, colors: &[Color555]) -> Result<()> {
        let colors: [Color555; NUM_COLORS] = colors
            .try_into()
            .ok()
            .with_context(|| format!("expected {} colors, found {}", NUM_COLORS, colors.len()))?;
        self.colors = colors.map(|c| c & 0x7FFF);
        Ok(())
    }

    pub fn record_snapshot(&mut self) {
        self.snapshot = self.colors;
    }

    /// Compare against the last snapshot; on change, adopt the current colors
    /// as the new baseline and return (before, after).
    pub fn take_undo_diff(&mut self) -> Option<([Color555; NUM_COLORS], [Color555; NUM_COLORS])> {
        if self.colors == self.snapshot {
            return None;
        }
        let before = self.snapshot;
        self.snapshot = self.colors;
        Some((before, self.colors))
    }

    pub fn apply_undo_data(&mut self, colors: &[Color555; NUM_COLORS]) {
        self.colors = *colors;
        self.record_snapshot();
    }
}

#[derive(Clone, Debug)]
pub struct Palette {
    pub name: String,
    pub id: PaletteId,
    pub desc: String,
    pub current_subpalette: SubpaletteIdx,
    subpalettes: Vec<Subpalette>, // Always NUM_SUBPALETTES entries
    pub(crate) export_id: u32,
}

impl Palette {
    pub fn new(name: &str, id: PaletteId, desc: &str) -> Self {
        Palette {
            name: name.to_string(),
            id,
            desc: desc.to_string(),
            current_subpalette: 0,
            subpalettes: vec![Subpalette::new(DefaultColorSet::BlackAndWhite); NUM_SUBPALETTES],
            export_id: 0,
        }
    }

    pub fn set_default_palette(&mut self) {
        for (i, sp) in self.subpalettes.iter_mut().enumerate() {
            let set = match i {
                0 => DefaultColorSet::Color1,
                1 => DefaultColorSet::Color2,
                2 => DefaultColorSet::GrayScale,
                _ => DefaultColorSet::BlackAndWhite,
            };
            sp.set_default_colors(set);
            sp.record_snapshot();
        }
    }

    pub fn subpalettes(&self) -> &[Subpalette] {
        &self.subpalettes
    }

    pub fn subpalette(&self, idx: SubpaletteIdx) -> &Subpalette {
        &self.subpalettes[idx as usize % NUM_SUBPALETTES]
    }

    pub fn subpalette_mut(&mut self, idx: SubpaletteIdx) -> &mut Subpalette {
        &mut self.subpalettes[idx as usize % NUM_SUBPALETTES]
    }

    pub fn current_subpalette(&self) -> &Subpalette {
        self.subpalette(self.current_subpalette)
    }

    pub fn import_subpalette(&mut self, idx: usize, colors: &[Color555]) -> Result<()> {
        ensure!(idx < NUM_SUBPALETTES, "invalid subpalette id {}", idx);
        self.subpalettes[idx].import(colors)
    }

    pub fn export_id(&self) -> u32 {
        self.export_id
    }
}

/// The palettes of one kind (foreground or background), in creation order.
#[derive(Clone, Debug)]
pub struct Palettes {
    pub kind: SetKind,
    palettes: Vec<Palette>,
    next_id: PaletteId,
}

impl Palettes {
    pub fn new(kind: SetKind) -> Self {
        Palettes {
            kind,
            palettes: vec![],
            next_id: 0,
        }
    }

    pub fn add_palette(&mut self, name: &str, id: Option<PaletteId>, desc: &str) -> Result<&mut Palette> {
        let id = id.unwrap_or(self.next_id);
        if self.palettes.iter().any(|p| p.id == id) {
            bail!("palette id {} already exists", id);
        }
        if self.palettes.iter().any(|p| p.name == name) {
            bail!("palette name '{}' already exists", name);
        }
        self.next_id = self.next_id.max(id + 1);
        self.palettes.push(Palette::new(name, id, desc));
        Ok(self.palettes.last_mut().context("palette was just added")?)
    }

    pub fn get(&self, id: PaletteId) -> Option<&Palette> {
        self.palettes.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PaletteId) -> Option<&mut Palette> {
        self.palettes.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Palette> {
        self.palettes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Palette> {
        self.palettes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }
}
