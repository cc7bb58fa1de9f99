use std::{
    fmt::Write as _,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use hashbrown::HashSet;
use itertools::Itertools;
use log::{info, warn};

use crate::{
    common::TILE_SIZE,
    document::Document,
    palette::{Palette, Palettes},
    persist::{project_to_string, write_atomic},
    sprite::Sprite,
    spriteset::Spritesets,
    tile::Tile,
};

#[derive(Clone, Debug)]
pub struct ExportOptions {
    /// Base name of every generated file.
    pub stem: String,
    /// Also write a copy of the project file next to the generated code.
    pub complete: bool,
    /// Also write one PNG sheet per foreground sprite set.
    pub png: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            stem: "sprites".to_string(),
            complete: false,
            png: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub fg_tiles: u32,
    pub bg_tiles: u32,
    pub warnings: Vec<String>,
}

// C identifiers allow only letters, digits and underscores.
fn c_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// One row of the sprite info table.
pub fn sprite_info_row(sprite: &Sprite) -> String {
    let (shape, size) = match sprite.shape_size() {
        Some((shape, size)) => (shape.symbol(), size.symbol()),
        None => ("INVALID", "INVALID"),
    };
    format!(
        "\t{{{:4},{:4},{:4},{:4},{:4},{:>16},{:>16} }}, // Sprite_{}",
        sprite.first_tile_id(),
        sprite.num_tiles(),
        sprite.pixel_width(),
        sprite.pixel_height(),
        sprite.subpalette,
        shape,
        size,
        sprite.name
    )
}

/// A tile row packed into a 32-bit word, leftmost pixel in the low nibble.
fn tile_row_word(tile: &Tile, y: usize) -> u32 {
    (0..TILE_SIZE).fold(0, |w, x| w | (tile.get_pixel(x, y) as u32) << (4 * x))
}

fn header_text(doc: &Document, stem: &str, warnings: &mut Vec<String>) -> Result<String> {
    let guard = format!("{}_H", c_ident(stem).to_uppercase());
    let mut out = String::new();
    writeln!(out, "// {}.h", stem)?;
    writeln!(out, "// Generated from project '{}'", doc.name)?;
    writeln!(out)?;
    writeln!(out, "#ifndef {}", guard)?;
    writeln!(out, "#define {}", guard)?;
    writeln!(out)?;
    writeln!(out, "#define kPlatform_{} 1", doc.options.platform.name())?;

    let mut defined: HashSet<String> = HashSet::new();
    for set in doc.spritesets.iter() {
        writeln!(out)?;
        writeln!(out, "// Sprite set : {}", set.name)?;
        for sprite in set.sprites() {
            let ident = format!("kSprite_{}", c_ident(&sprite.name));
            if !defined.insert(ident.clone()) {
                let msg = format!("{} is defined more than once", ident);
                warn!("{}", msg);
                warnings.push(msg);
            }
            writeln!(out, "#define {} {}", ident, sprite.export_id())?;
        }
        writeln!(
            out,
            "#define kSpriteset_{}_Count {}",
            c_ident(&set.name),
            set.sprites().len()
        )?;
    }
    if !doc.maps.is_empty() {
        writeln!(out)?;
        for map in &doc.maps {
            writeln!(out, "#define kBgMap_{} {}", c_ident(&map.name), map.export_id())?;
        }
    }
    writeln!(out)?;
    writeln!(out, "#endif // {}", guard)?;
    Ok(out)
}

fn write_palette_data(out: &mut String, pal: &Palette) -> Result<()> {
    if pal.export_id() != 0 {
        writeln!(out)?;
    }
    writeln!(out, "\t// Palette : {} [16-color]", pal.name)?;
    if !pal.desc.is_empty() {
        writeln!(out, "\t// Description : {}", pal.desc)?;
    }
    for (i, sp) in pal.subpalettes().iter().enumerate() {
        writeln!(
            out,
            "\t{}, // Subpalette #{}",
            sp.colors().iter().map(|c| format!("0x{:04x}", c)).join(", "),
            i
        )?;
    }
    Ok(())
}

fn write_palettes(out: &mut String, prefix: &str, palettes: &Palettes) -> Result<()> {
    writeln!(out, "const PaletteInfo {}PaletteInfo[] = {{", prefix)?;
    for pal in palettes.iter() {
        writeln!(
            out,
            "\t{{{:4},{:>6} }}, // Palette #{} : {}",
            0,
            "true",
            pal.export_id(),
            pal.name
        )?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    writeln!(out, "const unsigned short {}PaletteData[] = {{", prefix)?;
    for pal in palettes.iter() {
        write_palette_data(out, pal)?;
    }
    writeln!(out, "}};")?;
    Ok(())
}

fn write_tiles(out: &mut String, prefix: &str, sets: &Spritesets) -> Result<()> {
    writeln!(out, "const unsigned int {}TileData[] = {{", prefix)?;
    for set in sets.iter() {
        for sprite in set.sprites() {
            if sprite.export_id() != 0 || set.export_id() != 0 {
                writeln!(out)?;
            }
            writeln!(out, "\t// Sprite : {}", sprite.name)?;
            if !sprite.description.is_empty() {
                writeln!(out, "\t// Description : {}", sprite.description)?;
            }
            writeln!(
                out,
                "\t// Size : {}x{} = {} tiles",
                sprite.tile_width(),
                sprite.tile_height(),
                sprite.num_tiles()
            )?;
            for (i, tile) in sprite.tiles().iter().enumerate() {
                let words = (0..TILE_SIZE)
                    .map(|y| format!("0x{:08x}", tile_row_word(tile, y)))
                    .join(", ");
                writeln!(out, "\t{}, // Tile {}", words, sprite.first_tile_id() as usize + i)?;
            }
        }
    }
    writeln!(out, "}};")?;
    Ok(())
}

fn source_text(doc: &Document, stem: &str) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "// {}.c", stem)?;
    writeln!(out, "// Generated from project '{}'", doc.name)?;
    writeln!(out)?;
    writeln!(out, "#include \"{}.h\"", stem)?;

    for set in doc.spritesets.iter() {
        writeln!(out)?;
        writeln!(
            out,
            "// Sprite set : {} (palette {})",
            set.name,
            doc.palettes.get(set.palette_id).map_or("?", |p| p.name.as_str())
        )?;
        writeln!(out, "const SpriteInfo {}_SpriteInfo[] = {{", c_ident(&set.name))?;
        for sprite in set.sprites() {
            writeln!(out, "{}", sprite_info_row(sprite))?;
        }
        writeln!(out, "}};")?;
    }

    writeln!(out)?;
    write_palettes(&mut out, "", &doc.palettes)?;
    writeln!(out)?;
    write_tiles(&mut out, "", &doc.spritesets)?;

    writeln!(out)?;
    write_palettes(&mut out, "Bg", &doc.bg_palettes)?;
    writeln!(out)?;
    write_tiles(&mut out, "Bg", &doc.bg_spritesets)?;

    if !doc.maps.is_empty() {
        writeln!(out)?;
        writeln!(out, "const BgMapInfo BgMapInfo[] = {{")?;
        let mut offset = 0;
        for map in &doc.maps {
            writeln!(
                out,
                "\t{{{:6},{:4},{:4} }}, // BgMap_{}",
                offset,
                map.width(),
                map.height(),
                map.name
            )?;
            offset += map.width() * map.height();
        }
        writeln!(out, "}};")?;
    }
    Ok(out)
}

/// GBA 4bpp tile data for every sprite of one kind, in tile id order.
pub fn tile_blob(sets: &Spritesets) -> Vec<u8> {
    sets.iter()
        .flat_map(|set| set.sprites())
        .flat_map(|sprite| sprite.tiles())
        .flat_map(|tile| tile.to_4bpp())
        .collect()
}

/// Every color of every palette of one kind as little-endian RGB555.
pub fn palette_blob(palettes: &Palettes) -> Vec<u8> {
    palettes
        .iter()
        .flat_map(|p| p.subpalettes())
        .flat_map(|sp| sp.colors())
        .flat_map(|c| c.to_le_bytes())
        .collect()
}

pub fn map_blob(doc: &Document) -> Vec<u8> {
    doc.maps
        .iter()
        .flat_map(|m| m.entries())
        .flat_map(|e| e.to_word().to_le_bytes())
        .collect()
}

fn write_png(path: &Path, width: usize, height: usize, rgb: &[u8]) -> Result<()> {
    info!("Saving {}", path.display());
    let file = File::create(path).with_context(|| format!("unable to create {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width as u32, height as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgb)?;
    Ok(())
}

// Lay out the sprites of every foreground set side by side, one sheet per set.
fn write_png_sheets(doc: &mut Document, dir: &Path, stem: &str, files: &mut Vec<PathBuf>) -> Result<()> {
    let palettes = &doc.palettes;
    for set in doc.spritesets.iter_mut() {
        let Some(palette) = palettes.get(set.palette_id) else {
            warn!("Sprite set {} has no palette; skipping PNG", set.name);
            continue;
        };
        let width: usize = set.sprites().iter().map(Sprite::pixel_width).sum();
        let height = set.sprites().iter().map(Sprite::pixel_height).max().unwrap_or(0);
        if width == 0 || height == 0 {
            continue;
        }
        let mut sheet = vec![0u8; width * height * 3];
        let mut x0 = 0;
        for sprite in set.sprites_mut() {
            let pw = sprite.pixel_width();
            let bitmap = sprite.bitmap(palette.subpalette(sprite.subpalette));
            for (y, row) in bitmap.chunks(pw * 3).enumerate() {
                let start = (y * width + x0) * 3;
                sheet[start..start + row.len()].copy_from_slice(row);
            }
            x0 += pw;
        }
        let path = dir.join(format!("{}_{}.png", stem, c_ident(&set.name)));
        write_png(&path, width, height, &sheet)?;
        files.push(path);
    }
    Ok(())
}

/// Write every export artifact into `dir`.
pub fn export_project(doc: &mut Document, dir: &Path, options: &ExportOptions) -> Result<ExportSummary> {
    let stem = options.stem.as_str();
    let (fg_tiles, bg_tiles) = doc.assign_export_ids();
    let mut summary = ExportSummary {
        fg_tiles,
        bg_tiles,
        ..Default::default()
    };

    let mut outputs: Vec<(PathBuf, Vec<u8>)> = vec![
        (
            dir.join(format!("{}.h", stem)),
            header_text(doc, stem, &mut summary.warnings)?.into_bytes(),
        ),
        (dir.join(format!("{}.c", stem)), source_text(doc, stem)?.into_bytes()),
        (dir.join(format!("{}_tiles.bin", stem)), tile_blob(&doc.spritesets)),
        (dir.join(format!("{}_palettes.bin", stem)), palette_blob(&doc.palettes)),
        (dir.join(format!("{}_bg_tiles.bin", stem)), tile_blob(&doc.bg_spritesets)),
        (
            dir.join(format!("{}_bg_palettes.bin", stem)),
            palette_blob(&doc.bg_palettes),
        ),
        (dir.join(format!("{}_bg_maps.bin", stem)), map_blob(doc)),
    ];
    if options.complete {
        outputs.push((
            dir.join(format!("{}.xml", stem)),
            project_to_string(doc)?.into_bytes(),
        ));
    }
    for (path, data) in outputs {
        info!("Saving {}", path.display());
        write_atomic(&path, &data)?;
        summary.files.push(path);
    }
    if options.png {
        write_png_sheets(doc, dir, stem, &mut summary.files)?;
    }

    info!(
        "Exported {} files ({} sprite tiles, {} background tiles)",
        summary.files.len(),
        fg_tiles,
        bg_tiles
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::{Platform, SetKind},
        undo::SpriteKey,
    };

    fn sample() -> (Document, SpriteKey) {
        let mut doc = Document::with_defaults().unwrap();
        let set = doc.spritesets.iter().next().unwrap().id;
        let key = doc
            .add_sprite(SetKind::Foreground, set, 4, 2, "boss", "", 2)
            .unwrap();
        (doc, key)
    }

    #[test]
    fn info_row_format() {
        let (mut doc, key) = sample();
        doc.assign_export_ids();
        let row = sprite_info_row(doc.sprite(key).unwrap());
        assert_eq!(
            row,
            "\t{   1,   8,  32,  16,   2,      ATTR0_WIDE,   ATTR1_SIZE_32 }, // Sprite_boss"
        );
    }

    #[test]
    fn header_has_defines_and_platform() {
        let (mut doc, _) = sample();
        doc.options.platform = Platform::NDS;
        doc.assign_export_ids();
        let mut warnings = vec![];
        let h = header_text(&doc, "game", &mut warnings).unwrap();
        assert!(h.contains("#define kPlatform_NDS 1"));
        assert!(h.contains("#define kSprite_S1 0"));
        assert!(h.contains("#define kSprite_boss 1"));
        assert!(h.contains("#ifndef GAME_H"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn row_word_packs_left_pixel_low() {
        let mut tile = Tile::default();
        for x in 0..8 {
            tile.set_pixel(x, 0, x as u8);
        }
        assert_eq!(tile_row_word(&tile, 0), 0x76543210);
        let bytes = tile.to_4bpp();
        assert_eq!(&bytes[..4], &[0x10, 0x32, 0x54, 0x76]);
    }

    #[test]
    fn blob_sizes() {
        let (doc, _) = sample();
        assert_eq!(tile_blob(&doc.spritesets).len(), 9 * 32);
        assert_eq!(palette_blob(&doc.palettes).len(), 16 * 16 * 2);
        assert_eq!(map_blob(&doc).len(), 32 * 32 * 2);
    }

    #[test]
    fn palette_blob_is_little_endian() {
        let (doc, _) = sample();
        let pal = doc.palettes.iter().next().unwrap();
        let first = pal.subpalette(0).color(0);
        let blob = palette_blob(&doc.palettes);
        assert_eq!(u16::from_le_bytes([blob[0], blob[1]]), first);
    }

    #[test]
    fn export_writes_files() {
        let (mut doc, key) = sample();
        doc.edit_sprite(key, "setup", |s| s.set_pixel(0, 0, 3)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions {
            stem: "game".to_string(),
            complete: true,
            png: true,
        };
        let summary = export_project(&mut doc, dir.path(), &options).unwrap();
        assert_eq!(summary.fg_tiles, 9);
        assert_eq!(summary.bg_tiles, 1);
        for name in ["game.h", "game.c", "game_tiles.bin", "game.xml", "game_Sprites.png"] {
            assert!(dir.path().join(name).exists(), "{} missing", name);
        }
        let c = std::fs::read_to_string(dir.path().join("game.c")).unwrap();
        assert!(c.contains("// Sprite_boss"));
        assert!(c.contains("const SpriteInfo Sprites_SpriteInfo[]"));
        assert!(doc.sprite(key).unwrap().has_cached_bitmap());
    }
}
