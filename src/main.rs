use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use sprite_editor::{
    config::{get_config_path, EditorConfig},
    document::Document,
    export::{export_project, ExportOptions},
    persist::{open_project, save_project},
};

#[derive(Parser, Debug)]
#[command(about = "Sprite and background tile editor for GBA/NDS projects")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new project with a default palette, sprite set and map
    New {
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a summary of a project
    Info { path: Option<PathBuf> },
    /// Load a project and report every problem found
    Check { path: Option<PathBuf> },
    /// Generate C source and binary data for a project
    Export {
        path: Option<PathBuf>,
        /// Output directory (defaults to the last one used, then the project's directory)
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = "sprites")]
        stem: String,
        /// Also write a copy of the project file
        #[arg(long)]
        complete: bool,
        /// Also write PNG sheets of the sprites
        #[arg(long)]
        png: bool,
    },
}

fn project_path(arg: Option<PathBuf>, config: &EditorConfig) -> Result<PathBuf> {
    arg.or_else(|| config.recent_project.clone())
        .context("No project given and no recent project recorded.")
}

fn open(path: &Path, config: &mut EditorConfig) -> Result<Document> {
    let (mut doc, report) = open_project(path)?;
    for w in &report.warnings {
        warn!("{}", w);
    }
    for e in &report.errors {
        error!("{}", e);
    }
    doc.set_undo_limit(config.undo_limit);
    config.set_recent_project(path);
    Ok(doc)
}

fn print_info(doc: &Document) {
    println!("Project: {}", doc.name);
    println!("Platform: {}", doc.options.platform.name());
    for (label, palettes, sets) in [
        ("Sprites", &doc.palettes, &doc.spritesets),
        ("Background", &doc.bg_palettes, &doc.bg_spritesets),
    ] {
        println!("{}:", label);
        for pal in palettes.iter() {
            println!("  palette {} '{}'", pal.id, pal.name);
        }
        for set in sets.iter() {
            println!(
                "  sprite set {} '{}': {} sprites, {} tiles",
                set.id,
                set.name,
                set.sprites().len(),
                set.num_tiles()
            );
            for sprite in set.sprites() {
                println!(
                    "    {} ({}x{} tiles, subpalette {})",
                    sprite.name,
                    sprite.tile_width(),
                    sprite.tile_height(),
                    sprite.subpalette
                );
            }
        }
    }
    for map in &doc.maps {
        println!("Map {} '{}': {}x{}", map.id, map.name, map.width(), map.height());
    }
}

fn run(args: Args, config: &mut EditorConfig) -> Result<()> {
    match args.command {
        Command::New { path, name } => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            let mut doc = Document::with_defaults()?;
            if let Some(name) = name {
                doc.name = name;
            }
            save_project(&mut doc, &path)?;
            config.set_recent_project(&path);
            info!("Created {}", path.display());
        }
        Command::Info { path } => {
            let path = project_path(path, config)?;
            let doc = open(&path, config)?;
            print_info(&doc);
        }
        Command::Check { path } => {
            let path = project_path(path, config)?;
            let (_, report) = open_project(&path)?;
            for w in &report.warnings {
                println!("warning: {}", w);
            }
            for e in &report.errors {
                println!("error: {}", e);
            }
            if !report.errors.is_empty() {
                bail!("{} errors in {}", report.errors.len(), path.display());
            }
            println!("{}: ok", path.display());
        }
        Command::Export {
            path,
            out,
            stem,
            complete,
            png,
        } => {
            let path = project_path(path, config)?;
            let mut doc = open(&path, config)?;
            let out = match out.or_else(|| config.export_dir.clone()) {
                Some(dir) => dir,
                None => path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            };
            std::fs::create_dir_all(&out)?;
            let options = ExportOptions { stem, complete, png };
            let summary = export_project(&mut doc, &out, &options)?;
            for f in &summary.files {
                println!("{}", f.display());
            }
            if config.export_dir.as_ref() != Some(&out) {
                config.export_dir = Some(out);
                config.modified = true;
            }
        }
    }
    Ok(())
}

pub fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config_path = get_config_path()?;
    let mut config = match EditorConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Unable to load config: {:#}", e);
            EditorConfig::default()
        }
    };
    let result = run(args, &mut config);
    if let Err(e) = config.save(&config_path) {
        warn!("Unable to save config: {:#}", e);
    }
    result
}
