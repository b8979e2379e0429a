//! simsrig - inspect and import The Sims 1 character assets
//!
//! Assets are looked up by basename across the `--source` directories and FAR archives, in the
//! order given. Reconstructed rigs and actions are printed as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simsrig::{FarArchive, ImportOptions, Importer, Resolver};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "simsrig")]
#[command(about = "Inspect and import The Sims 1 character assets")]
#[command(version)]
struct Cli {
    /// Directory or FAR archive to search; repeat to add more, earlier wins
    #[arg(short, long = "source", global = true)]
    sources: Vec<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries of a FAR archive
    List {
        /// Archive path
        archive: PathBuf,
    },

    /// List the skills of a character file
    Skills {
        /// Character basename (without .cmx/.bcf)
        character: String,
    },

    /// Bind meshes to a skeleton and print the result
    Rig {
        /// Character basename holding the skeleton
        skeleton: String,

        /// Mesh basenames (without .bmf/.skn)
        meshes: Vec<String>,

        /// Take the meshes from this suit instead
        #[arg(long, conflicts_with = "meshes")]
        suit: Option<String>,

        /// Do not resolve mesh textures
        #[arg(long)]
        no_textures: bool,

        /// Leave textures extracted from archives on disk
        #[arg(long)]
        keep_textures: bool,
    },

    /// Assemble the keyframe curves of one skill
    Action {
        /// Character basename holding the skill
        character: String,

        /// Skill name
        skill: String,

        /// Check the animated bones against this character's skeleton
        #[arg(long)]
        skeleton: Option<String>,

        /// Time between keyframes
        #[arg(long, default_value_t = simsrig::DEFAULT_FRAME_LENGTH)]
        frame_length: f32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli, &mut std::io::stdout().lock())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Commands::List { archive } => list(&archive, out),
        Commands::Skills { character } => {
            let mut resolver = open_sources(&cli.sources)?;
            skills(&mut resolver, &character, out)
        }
        Commands::Rig {
            skeleton,
            meshes,
            suit,
            no_textures,
            keep_textures,
        } => {
            let mut resolver = open_sources(&cli.sources)?;
            let options = ImportOptions {
                load_textures: !no_textures,
                ..ImportOptions::default()
            };
            let mut importer = Importer::new(&mut resolver, options);
            let import = match suit.as_deref() {
                Some(suit) => importer
                    .import_suit(&skeleton, suit)
                    .with_context(|| format!("failed to import suit '{suit}' of '{skeleton}'"))?,
                None => importer
                    .import_character(&skeleton, meshes.as_slice())
                    .with_context(|| format!("failed to import '{skeleton}'"))?,
            };
            let printed = print_json(&import, out);
            if !keep_textures {
                import
                    .cleanup()
                    .context("failed to remove extracted textures")?;
            }
            printed
        }
        Commands::Action {
            character,
            skill,
            skeleton,
            frame_length,
        } => {
            let mut resolver = open_sources(&cli.sources)?;
            let options = ImportOptions {
                frame_length,
                ..ImportOptions::default()
            };
            let mut importer = Importer::new(&mut resolver, options);
            let action = importer
                .import_skill(&character, &skill)
                .with_context(|| format!("failed to import skill '{skill}' of '{character}'"))?;
            if let Some(skeleton) = skeleton {
                let data = importer.load_character(&skeleton)?;
                action.check_bones(data.skeleton()?)?;
            }
            print_json(&action, out)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn open_sources(sources: &[PathBuf]) -> Result<Resolver> {
    if sources.is_empty() {
        return Resolver::from_paths(["."]).context("failed to open the current directory");
    }
    let resolver = Resolver::from_paths(sources).context("failed to open asset sources")?;
    for source in resolver.sources() {
        log::info!("source: {source}");
    }
    Ok(resolver)
}

fn list(path: &Path, out: &mut impl Write) -> Result<()> {
    let archive = FarArchive::open_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    for entry in archive.entries() {
        writeln!(out, "{:>10}  {}", entry.length, entry.name)?;
    }
    Ok(())
}

fn skills(resolver: &mut Resolver, character: &str, out: &mut impl Write) -> Result<()> {
    let mut importer = Importer::new(resolver, ImportOptions::default());
    let data = importer
        .load_character(character)
        .with_context(|| format!("failed to load '{character}'"))?;
    for skill in &data.skills {
        writeln!(
            out,
            "{}\t{}\t{} motions",
            skill.name,
            skill.animation_name,
            skill.motions.len()
        )?;
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
