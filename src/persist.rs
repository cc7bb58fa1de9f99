use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use hashbrown::HashSet;
use json_pretty_compact::PrettyCompactFormatter;
use log::{error, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Serializer;

use crate::{
    color,
    common::{
        Color555, Options, Platform, SetKind, SpritesetId, SubpaletteIdx, NUM_COLORS, NUM_SUBPALETTES,
        TILE_SIZE,
    },
    document::Document,
    error::{EntityLoadError, PaletteLoadError, ProjectError},
    helpers::parse_size,
    map::BackgroundMap,
    palette::{Palette, Palettes},
    sprite::Sprite,
    spriteset::{NameSeq, Spriteset, Spritesets},
    tile::Tile,
};

pub const FILE_VERSION: &str = "2";
const XMLNS: &str = "http://kacmarcik.com/spritely";
const XMLNS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://kacmarcik.com/spritely spritely.xsd";

pub(crate) fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    info!("Saving {}", path.display());
    let formatter = PrettyCompactFormatter::new();
    let mut data_bytes = vec![];
    let mut ser = Serializer::with_formatter(&mut data_bytes, formatter);
    data.serialize(&mut ser)?;
    fs::create_dir_all(path.parent().context("invalid parent directory")?)?;
    fs::write(path, &data_bytes)?;
    Ok(())
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    info!("Loading {}", path.display());
    let data_bytes = std::fs::read(path)?;
    let data: T = serde_json::from_slice(&data_bytes)?;
    Ok(data)
}

// XML form of the project file. Ids and colors are kept as text so that a
// bad value fails only the entity that holds it.

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "spritely")]
pub(crate) struct ProjectXml {
    #[serde(rename = "@xmlns", default)]
    xmlns: String,
    #[serde(rename = "@xmlns:xsi", default)]
    xmlns_xsi: String,
    #[serde(rename = "@xsi:schemaLocation", default)]
    schema_location: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(default)]
    options: OptionsXml,
    #[serde(default)]
    palettes: PalettesXml,
    #[serde(default)]
    spritesets: SpritesetsXml,
    #[serde(default)]
    bgpalettes: PalettesXml,
    #[serde(default)]
    bgspritesets: SpritesetsXml,
    #[serde(default)]
    bgmaps: MapsXml,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OptionsXml {
    #[serde(rename = "@platform")]
    platform: String,
    #[serde(rename = "@sprite_pixel_grid")]
    sprite_show_pixel_grid: bool,
    #[serde(rename = "@sprite_tile_grid")]
    sprite_show_tile_grid: bool,
    #[serde(rename = "@sprite_transparent")]
    sprite_show_transparent_marker: bool,
    #[serde(rename = "@sprite_palette_index")]
    sprite_show_palette_index: bool,
    #[serde(rename = "@palette_transparent")]
    palette_show_transparent_marker: bool,
    #[serde(rename = "@palette_index")]
    palette_show_palette_index: bool,
    #[serde(rename = "@bgmap_grid")]
    bgmap_show_grid: bool,
    #[serde(rename = "@bgmap_screen")]
    bgmap_show_screen: bool,
}

impl Default for OptionsXml {
    fn default() -> Self {
        OptionsXml::from(&Options::default())
    }
}

impl From<&Options> for OptionsXml {
    fn from(o: &Options) -> Self {
        OptionsXml {
            platform: o.platform.name().to_string(),
            sprite_show_pixel_grid: o.sprite_show_pixel_grid,
            sprite_show_tile_grid: o.sprite_show_tile_grid,
            sprite_show_transparent_marker: o.sprite_show_transparent_marker,
            sprite_show_palette_index: o.sprite_show_palette_index,
            palette_show_transparent_marker: o.palette_show_transparent_marker,
            palette_show_palette_index: o.palette_show_palette_index,
            bgmap_show_grid: o.bgmap_show_grid,
            bgmap_show_screen: o.bgmap_show_screen,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct PalettesXml {
    #[serde(rename = "palette16", default)]
    palettes: Vec<Palette16Xml>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Palette16Xml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@desc", default)]
    desc: String,
    #[serde(rename = "subpalette16", default)]
    subpalettes: Vec<Subpalette16Xml>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Subpalette16Xml {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "color", default)]
    colors: Vec<ColorXml>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ColorXml {
    #[serde(rename = "@rgb", default)]
    rgb: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct SpritesetsXml {
    #[serde(rename = "spriteset16", default)]
    spritesets: Vec<SpritesetXml>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SpritesetXml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@desc", default)]
    desc: String,
    #[serde(rename = "@palette", default)]
    palette: String,
    #[serde(rename = "sprite", default)]
    sprites: Vec<SpriteXml>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SpriteXml {
    #[serde(rename = "@name", default)]
    name: String,
    // Export numbering from the last save; informational only on load.
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@firsttileid", default)]
    first_tile_id: String,
    #[serde(rename = "@desc", default)]
    desc: String,
    #[serde(rename = "@size", default)]
    size: String,
    #[serde(rename = "@palette", default)]
    subpalette: String,
    #[serde(rename = "tile", default)]
    tiles: Vec<TileXml>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TileXml {
    #[serde(rename = "row", default)]
    rows: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct MapsXml {
    #[serde(rename = "map", default)]
    maps: Vec<MapXml>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MapXml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@desc", default)]
    desc: String,
    #[serde(rename = "@spriteset", default)]
    spriteset: String,
    #[serde(rename = "@size", default)]
    size: String,
    #[serde(rename = "row", default)]
    rows: Vec<String>,
}

/// Problems found while opening a project that did not stop the load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub warnings: Vec<String>,
    pub errors: Vec<EntityLoadError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    fn fail(&mut self, e: EntityLoadError) {
        error!("{}", e);
        self.errors.push(e);
    }

    fn invalid(&mut self, kind: &'static str, name: &str, e: anyhow::Error) {
        self.fail(EntityLoadError::Invalid {
            kind,
            name: name.to_string(),
            message: format!("{:#}", e),
        });
    }
}

fn parse_id(text: &str) -> Result<u32> {
    text.trim()
        .parse()
        .with_context(|| format!("invalid id '{}'", text))
}

/// Load the 16 subpalettes of one palette. Nothing is changed unless the whole
/// block is valid.
pub(crate) fn load_palette16(pal: &mut Palette, xml: &Palette16Xml) -> Result<(), PaletteLoadError> {
    let palette = pal.name.clone();
    if xml.subpalettes.len() != NUM_SUBPALETTES {
        return Err(PaletteLoadError::SubpaletteCount {
            palette,
            found: xml.subpalettes.len(),
        });
    }
    let mut colors: [[Color555; NUM_COLORS]; NUM_SUBPALETTES] = [[0; NUM_COLORS]; NUM_SUBPALETTES];
    for (i, sp) in xml.subpalettes.iter().enumerate() {
        if sp.id.trim().parse::<usize>().ok() != Some(i) {
            return Err(PaletteLoadError::SubpaletteId {
                palette,
                expected: i,
                found: sp.id.clone(),
            });
        }
        if sp.colors.len() != NUM_COLORS {
            return Err(PaletteLoadError::ColorCount {
                palette,
                subpalette: i,
                found: sp.colors.len(),
            });
        }
        for (j, c) in sp.colors.iter().enumerate() {
            colors[i][j] = color::parse_hex(&c.rgb).map_err(|source| PaletteLoadError::Color {
                palette: palette.clone(),
                subpalette: i,
                source,
            })?;
        }
    }
    for (i, c) in colors.iter().enumerate() {
        pal.subpalette_mut(i as SubpaletteIdx).apply_undo_data(c);
    }
    Ok(())
}

fn load_palettes(palettes: &mut Palettes, xml: &PalettesXml, report: &mut LoadReport) {
    for p in &xml.palettes {
        let id = match parse_id(&p.id) {
            Ok(id) => id,
            Err(e) => {
                report.invalid("palette", &p.name, e);
                continue;
            }
        };
        let pal = match palettes.add_palette(&p.name, Some(id), &p.desc) {
            Ok(pal) => pal,
            Err(e) => {
                report.invalid("palette", &p.name, e);
                continue;
            }
        };
        pal.set_default_palette();
        if let Err(e) = load_palette16(pal, p) {
            report.fail(e.into());
        }
    }
}

fn load_sprite(set: &mut Spriteset, xml: &SpriteXml, names: &mut NameSeq, report: &mut LoadReport) -> Result<()> {
    let (width, height) = parse_size(&xml.size).with_context(|| format!("invalid size '{}'", xml.size))?;
    let subpalette: SubpaletteIdx = if xml.subpalette.trim().is_empty() {
        0
    } else {
        xml.subpalette
            .trim()
            .parse()
            .with_context(|| format!("invalid subpalette '{}'", xml.subpalette))?
    };
    let tiles = xml
        .tiles
        .iter()
        .enumerate()
        .map(|(i, t)| Tile::from_rows(&t.rows).with_context(|| format!("tile {}", i)))
        .collect::<Result<Vec<Tile>>>()?;
    if !xml.name.is_empty() && set.has_named_sprite(&xml.name) {
        report.warn(format!(
            "Duplicate sprite name '{}' in sprite set '{}'; the sprite was renamed",
            xml.name, set.name
        ));
    }
    let id = set.add_sprite(width, height, &xml.name, &xml.desc, subpalette, names)?;
    let sprite = set.sprite_mut(id).context("sprite was just added")?;
    for (i, tile) in tiles.iter().enumerate() {
        if !sprite.import_tile(i, tile) {
            report.warnings.push(format!(
                "Too many tiles specified for sprite '{}'. Ignoring extra tiles.",
                sprite.name
            ));
            break;
        }
    }
    sprite.record_snapshot();
    Ok(())
}

fn load_spritesets(
    sets: &mut Spritesets,
    palettes: &Palettes,
    names: &mut NameSeq,
    xml: &SpritesetsXml,
    report: &mut LoadReport,
) {
    for s in &xml.spritesets {
        let header = parse_id(&s.id).and_then(|id| {
            let palette = parse_id(&s.palette)?;
            ensure!(palettes.get(palette).is_some(), "palette {} does not exist", palette);
            Ok((id, palette))
        });
        let (id, palette) = match header {
            Ok(header) => header,
            Err(e) => {
                report.invalid("sprite set", &s.name, e);
                continue;
            }
        };
        let set = match sets.add_spriteset(&s.name, Some(id), &s.desc, palette) {
            Ok(set) => set,
            Err(e) => {
                report.invalid("sprite set", &s.name, e);
                continue;
            }
        };
        for sx in &s.sprites {
            if let Err(e) = load_sprite(set, sx, names, report) {
                report.invalid("sprite", &sx.name, e);
            }
        }
    }
}

fn load_map(
    xml: &MapXml,
    bg_spritesets: &Spritesets,
    ids: &HashSet<u32>,
    names: &HashSet<String>,
) -> Result<BackgroundMap> {
    let id = parse_id(&xml.id)?;
    let spriteset: SpritesetId = parse_id(&xml.spriteset)?;
    ensure!(
        bg_spritesets.get(spriteset).is_some(),
        "background sprite set {} does not exist",
        spriteset
    );
    if ids.contains(&id) {
        bail!("map id {} already exists", id);
    }
    if names.contains(&xml.name) {
        bail!("map name '{}' already exists", xml.name);
    }
    let (width, height) = parse_size(&xml.size).with_context(|| format!("invalid size '{}'", xml.size))?;
    let mut map = BackgroundMap::new(&xml.name, id, &xml.desc, spriteset, width, height)?;
    ensure!(
        xml.rows.len() <= height,
        "{} rows of data for a map of height {}",
        xml.rows.len(),
        height
    );
    for (y, row) in xml.rows.iter().enumerate() {
        map.set_row_text(y, row)?;
    }
    Ok(map)
}

fn load_maps(doc: &mut Document, xml: &MapsXml, report: &mut LoadReport) {
    let mut ids: HashSet<u32> = HashSet::new();
    let mut names: HashSet<String> = HashSet::new();
    for m in &xml.maps {
        match load_map(m, &doc.bg_spritesets, &ids, &names) {
            Ok(map) => {
                ids.insert(map.id);
                names.insert(map.name.clone());
                doc.maps.push(map);
            }
            Err(e) => report.invalid("map", &m.name, e),
        }
    }
}

fn load_options(xml: &OptionsXml, report: &mut LoadReport) -> Options {
    let platform = match Platform::from_name(&xml.platform) {
        Some(p) => p,
        None => {
            report.warn(format!("Unknown platform '{}', using GBA", xml.platform));
            Platform::GBA
        }
    };
    Options {
        platform,
        sprite_show_pixel_grid: xml.sprite_show_pixel_grid,
        sprite_show_tile_grid: xml.sprite_show_tile_grid,
        sprite_show_transparent_marker: xml.sprite_show_transparent_marker,
        sprite_show_palette_index: xml.sprite_show_palette_index,
        palette_show_transparent_marker: xml.palette_show_transparent_marker,
        palette_show_palette_index: xml.palette_show_palette_index,
        bgmap_show_grid: xml.bgmap_show_grid,
        bgmap_show_screen: xml.bgmap_show_screen,
    }
}

/// Build a fresh document from project file text.
pub fn parse_project(text: &str) -> Result<(Document, LoadReport), ProjectError> {
    let xml: ProjectXml = quick_xml::de::from_str(text)?;
    if xml.version != FILE_VERSION {
        return Err(ProjectError::Version(xml.version));
    }

    let mut report = LoadReport::default();
    let mut doc = Document::new();
    if !xml.name.is_empty() {
        doc.name = xml.name.clone();
    }
    doc.options = load_options(&xml.options, &mut report);
    load_palettes(&mut doc.palettes, &xml.palettes, &mut report);
    load_spritesets(
        &mut doc.spritesets,
        &doc.palettes,
        &mut doc.names,
        &xml.spritesets,
        &mut report,
    );
    load_palettes(&mut doc.bg_palettes, &xml.bgpalettes, &mut report);
    load_spritesets(
        &mut doc.bg_spritesets,
        &doc.bg_palettes,
        &mut doc.names,
        &xml.bgspritesets,
        &mut report,
    );
    load_maps(&mut doc, &xml.bgmaps, &mut report);
    doc.modified = false;
    Ok((doc, report))
}

/// Open a project file. The caller's current document is only replaced once
/// this returns successfully.
pub fn open_project(path: &Path) -> Result<(Document, LoadReport), ProjectError> {
    info!("Loading {}", path.display());
    let text = fs::read_to_string(path).map_err(|source| ProjectError::Read {
        path: path.to_owned(),
        source,
    })?;
    let (mut doc, report) = parse_project(&text)?;
    doc.path = Some(path.to_owned());
    info!(
        "Loaded {} palettes, {} sprite sets, {} maps ({} warnings, {} errors)",
        doc.palettes.len() + doc.bg_palettes.len(),
        doc.spritesets.len() + doc.bg_spritesets.len(),
        doc.maps.len(),
        report.warnings.len(),
        report.errors.len()
    );
    Ok((doc, report))
}

fn palette_xml(pal: &Palette) -> Palette16Xml {
    Palette16Xml {
        name: pal.name.clone(),
        id: pal.id.to_string(),
        desc: pal.desc.clone(),
        subpalettes: pal
            .subpalettes()
            .iter()
            .enumerate()
            .map(|(i, sp)| Subpalette16Xml {
                id: i.to_string(),
                colors: sp
                    .colors()
                    .iter()
                    .map(|&c| ColorXml {
                        rgb: color::format_hex(c),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn sprite_xml(sprite: &Sprite) -> SpriteXml {
    SpriteXml {
        name: sprite.name.clone(),
        id: sprite.export_id().to_string(),
        first_tile_id: sprite.first_tile_id().to_string(),
        desc: sprite.description.clone(),
        size: format!("{}x{}", sprite.tile_width(), sprite.tile_height()),
        subpalette: sprite.subpalette.to_string(),
        tiles: sprite
            .tiles()
            .iter()
            .map(|t| TileXml {
                rows: (0..TILE_SIZE).map(|y| t.row_text(y)).collect(),
            })
            .collect(),
    }
}

fn spritesets_xml(sets: &Spritesets) -> SpritesetsXml {
    SpritesetsXml {
        spritesets: sets
            .iter()
            .map(|s| SpritesetXml {
                name: s.name.clone(),
                id: s.id.to_string(),
                desc: s.desc.clone(),
                palette: s.palette_id.to_string(),
                sprites: s.sprites().iter().map(sprite_xml).collect(),
            })
            .collect(),
    }
}

fn palettes_xml(palettes: &Palettes) -> PalettesXml {
    PalettesXml {
        palettes: palettes.iter().map(palette_xml).collect(),
    }
}

fn project_xml(doc: &Document) -> ProjectXml {
    ProjectXml {
        xmlns: XMLNS.to_string(),
        xmlns_xsi: XMLNS_XSI.to_string(),
        schema_location: SCHEMA_LOCATION.to_string(),
        version: FILE_VERSION.to_string(),
        name: doc.name.clone(),
        options: OptionsXml::from(&doc.options),
        palettes: palettes_xml(doc.palettes(SetKind::Foreground)),
        spritesets: spritesets_xml(doc.spritesets(SetKind::Foreground)),
        bgpalettes: palettes_xml(doc.palettes(SetKind::Background)),
        bgspritesets: spritesets_xml(doc.spritesets(SetKind::Background)),
        bgmaps: MapsXml {
            maps: doc
                .maps
                .iter()
                .map(|m| MapXml {
                    name: m.name.clone(),
                    id: m.id.to_string(),
                    desc: m.desc.clone(),
                    spriteset: m.spriteset_id.to_string(),
                    size: format!("{}x{}", m.width(), m.height()),
                    rows: (0..m.height()).map(|y| m.row_text(y)).collect(),
                })
                .collect(),
        },
    }
}

/// Serialize the document to project file text. Sprites are renumbered first
/// so the written export ids are current.
pub fn project_to_string(doc: &mut Document) -> Result<String, ProjectError> {
    doc.assign_export_ids();
    let mut text = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    let mut ser = quick_xml::se::Serializer::with_root(&mut text, Some("spritely"))?;
    ser.indent('\t', 1);
    project_xml(doc).serialize(ser)?;
    text.push('\n');
    Ok(text)
}

/// Write `text` next to `path` and move it into place, so a failed write
/// never leaves a truncated file behind.
pub(crate) fn write_atomic(path: &Path, text: &[u8]) -> Result<(), ProjectError> {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let write_err = |source| ProjectError::Write {
        path: path.to_owned(),
        source,
    };
    fs::write(&tmp, text).map_err(write_err)?;
    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(source));
    }
    Ok(())
}

pub fn save_project(doc: &mut Document, path: &Path) -> Result<(), ProjectError> {
    info!("Saving {}", path.display());
    let text = project_to_string(doc)?;
    write_atomic(path, text.as_bytes())?;
    doc.path = Some(path.to_owned());
    doc.modified = false;
    Ok(())
}
