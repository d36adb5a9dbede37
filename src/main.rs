// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! photocull: AI-assisted photo culling
//!
//! Add camera files to a project, rate them with a hosted vision model,
//! review and override, then export Lightroom XMP sidecars.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use photocull::export::{self, ExportOptions};
use photocull::pipeline::Queue;
use photocull::project::{PhotoRecord, PhotoStatus, ProjectStore};
use photocull::scanner::collect_camera_files;
use photocull::{AppConfig, CullError, Result};

/// photocull CLI - AI-assisted photo culling
#[derive(Parser, Debug)]
#[command(name = "photocull")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Rate RAW/JPEG photos with a vision model and export XMP sidecars", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new project file
    New {
        /// Project file to create
        project: PathBuf,

        /// Project name (default: file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite an existing project file
        #[arg(long)]
        force: bool,
    },

    /// Add camera files or directories to a project
    Add {
        project: PathBuf,

        /// Files or directories to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Process pending photos
    Run {
        project: PathBuf,

        /// Only process these photos (id or id prefix)
        #[arg(long = "photo")]
        photos: Vec<String>,
    },

    /// List photos in a project
    List {
        project: PathBuf,

        /// Filter by status (pending, processing, completed, failed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show one photo in detail
    Show {
        project: PathBuf,
        photo: String,
    },

    /// Set a manual rating (0-5) or `clear` it
    Rate {
        project: PathBuf,
        photo: String,
        rating: String,
    },

    /// Mark photos for export
    Select {
        project: PathBuf,
        #[arg(required = true)]
        photos: Vec<String>,
    },

    /// Unmark photos for export
    Deselect {
        project: PathBuf,
        #[arg(required = true)]
        photos: Vec<String>,
    },

    /// Move failed photos back to pending
    Retry {
        project: PathBuf,
    },

    /// Remove a photo from the project
    Remove {
        project: PathBuf,
        photo: String,
    },

    /// Remove every photo from the project
    Clear {
        project: PathBuf,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },

    /// Export XMP sidecars
    Export {
        project: PathBuf,

        /// Zip archive to write (default: <project name>-xmp.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include completed photos that are not selected
        #[arg(long)]
        all: bool,

        /// Write sidecars beside the source files instead of a zip
        #[arg(long, conflicts_with = "output")]
        in_place: bool,

        /// Replace sidecars that already exist beside the source files
        #[arg(long, requires = "in_place")]
        overwrite: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::New { project, name, force } => run_new(&project, name, force),
        Commands::Add { project, paths, recursive } => run_add(&project, &paths, recursive, json),
        Commands::Run { project, photos } => run_queue(&config, &project, &photos, json).await,
        Commands::List { project, status } => run_list(&project, status.as_deref(), json),
        Commands::Show { project, photo } => run_show(&project, &photo, json),
        Commands::Rate { project, photo, rating } => {
            let rating = parse_rating_arg(&rating)?;
            let mut store = ProjectStore::open(&project)?;
            store.set_rating_override(&photo, rating)?;
            match rating {
                Some(r) => println!("Rated {} at {}", photo, r),
                None => println!("Cleared manual rating for {}", photo),
            }
            Ok(())
        }
        Commands::Select { project, photos } => run_select(&project, &photos, true),
        Commands::Deselect { project, photos } => run_select(&project, &photos, false),
        Commands::Retry { project } => {
            let mut store = ProjectStore::open(&project)?;
            let count = store.reset_failed()?;
            println!("{} failed photo(s) back to pending", count);
            Ok(())
        }
        Commands::Remove { project, photo } => {
            let mut store = ProjectStore::open(&project)?;
            let removed = store.remove(&photo)?;
            println!("Removed {} ({})", removed.file_name, removed.id);
            Ok(())
        }
        Commands::Clear { project, force } => {
            if !force {
                eprintln!("Use --force to confirm removing every photo");
                return Ok(());
            }
            let mut store = ProjectStore::open(&project)?;
            let count = store.clear()?;
            println!("Removed {} photo(s)", count);
            Ok(())
        }
        Commands::Export { project, output, all, in_place, overwrite } => {
            let options = ExportOptions { include_unselected: all, in_place, overwrite };
            run_export(&project, output.as_deref(), &options, json)
        }
        Commands::Config { action } => run_config_command(config, action, &cli.config),
    }
}

fn run_new(path: &Path, name: Option<String>, force: bool) -> Result<()> {
    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "photocull".to_string())
    });
    ProjectStore::create(path, &name, force)?;
    println!("Created project '{}' at {}", name, path.display());
    Ok(())
}

fn run_add(project: &Path, paths: &[PathBuf], recursive: bool, json: bool) -> Result<()> {
    let mut store = ProjectStore::open(project)?;
    let files = collect_camera_files(paths, recursive)?;
    let found = files.len();
    let added = store.add_paths(files)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else {
        println!(
            "Added {} photo(s) ({} already in project)",
            added.len(),
            found - added.len()
        );
    }
    Ok(())
}

async fn run_queue(config: &AppConfig, project: &Path, photos: &[String], json: bool) -> Result<()> {
    let mut store = ProjectStore::open(project)?;
    let queue = Queue::from_config(config);
    let report = queue.run(&mut store, photos).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Processed {}: {} completed, {} failed",
            report.processed, report.completed, report.failed
        );
        println!("{}", store.project().summary());
    }
    Ok(())
}

fn run_list(project: &Path, status: Option<&str>, json: bool) -> Result<()> {
    let store = ProjectStore::open(project)?;
    let status = status.map(str::parse::<PhotoStatus>).transpose()?;
    let photos: Vec<&PhotoRecord> = store
        .project()
        .photos
        .iter()
        .filter(|p| status.map_or(true, |s| p.status == s))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&photos)?);
        return Ok(());
    }

    for photo in &photos {
        println!(
            "{}  {:<10} {:<5} {}  {}  {}",
            photo.id,
            photo.status,
            rating_label(photo),
            if photo.selected { "x" } else { " " },
            photo.file_name,
            photo.metadata.summary()
        );
    }
    println!("{}", store.project().summary());
    Ok(())
}

fn run_show(project: &Path, query: &str, json: bool) -> Result<()> {
    let store = ProjectStore::open(project)?;
    let id = store.resolve(query)?;
    let photo = store
        .project()
        .photo(&id)
        .ok_or_else(|| CullError::PhotoNotFound(query.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(photo)?);
        return Ok(());
    }

    println!("{} ({})", photo.file_name, photo.id);
    println!("  Path:     {}", photo.path.display());
    println!("  Status:   {}", photo.status);
    println!("  Rating:   {}", rating_label(photo));
    println!("  Selected: {}", if photo.selected { "yes" } else { "no" });
    println!("  Shot:     {}", photo.metadata.summary());
    if let Some(camera) = &photo.metadata.camera {
        println!("  Camera:   {}", camera);
    }
    if let Some(lens) = &photo.metadata.lens {
        println!("  Lens:     {}", lens);
    }
    if let Some(preview) = &photo.preview {
        println!("  Preview:  {} ({}x{})", preview.path.display(), preview.width, preview.height);
    }
    if let Some(error) = &photo.error {
        println!("  Error:    {}", error);
    }
    if let Some(result) = photo.result() {
        let adj = &result.adjustments;
        println!("  Reason:   {}", result.reason);
        if !result.caption.is_empty() {
            println!("  Caption:  {}", result.caption);
        }
        if !result.keywords.is_empty() {
            println!("  Keywords: {}", result.keywords.join(", "));
        }
        println!(
            "  Edits:    exposure {:+.2}, contrast {:+.0}, highlights {:+.0}, shadows {:+.0}, whites {:+.0}, blacks {:+.0}, temperature {:+.0}",
            adj.exposure, adj.contrast, adj.highlights, adj.shadows, adj.whites, adj.blacks, result.temperature
        );
    }
    Ok(())
}

fn run_select(project: &Path, photos: &[String], selected: bool) -> Result<()> {
    let mut store = ProjectStore::open(project)?;
    for photo in photos {
        store.set_selected(photo, selected)?;
    }
    println!(
        "{} {} photo(s)",
        if selected { "Selected" } else { "Deselected" },
        photos.len()
    );
    Ok(())
}

fn run_export(project: &Path, output: Option<&Path>, options: &ExportOptions, json: bool) -> Result<()> {
    let store = ProjectStore::open(project)?;
    let report = export::export(store.project(), output, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Exported {} sidecar(s), {} photo(s) skipped", report.written, report.skipped);
        if !options.in_place {
            for path in &report.outputs {
                println!("  {}", path.display());
            }
        }
    }
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Model: {} ({})", config.api.model, config.api.endpoint);
            match config.api.resolve_api_key() {
                Ok(_) => println!("  Credential: found"),
                Err(e) => println!("  Credential: {}", e),
            }
            info!("Queue delay {} ms, retry up to {} attempts", config.queue.delay_ms, config.retry.max_attempts);
        }
    }

    Ok(())
}

/// `0`-`5`, or `clear`/`none` to drop the override
fn parse_rating_arg(arg: &str) -> Result<Option<u8>> {
    let arg = arg.trim();
    if arg.eq_ignore_ascii_case("clear") || arg.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let value: i64 = arg
        .parse()
        .map_err(|_| CullError::Config(format!("rating must be 0-5 or 'clear', got '{}'", arg)))?;
    match u8::try_from(value) {
        Ok(r) if r <= 5 => Ok(Some(r)),
        _ => Err(CullError::InvalidRating(value)),
    }
}

/// `4`, `4*` when overridden, `-` when unrated
fn rating_label(photo: &PhotoRecord) -> String {
    match (photo.displayed_rating(), photo.rating_override.is_some()) {
        (Some(r), true) => format!("{}*", r),
        (Some(r), false) => r.to_string(),
        (None, _) => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["photocull"]).is_err());
    }

    #[test]
    fn test_cli_add_command() {
        let cli = Cli::try_parse_from([
            "photocull", "add", "shoot.json", "/photos/a", "/photos/b.cr2", "-r"
        ]).unwrap();

        match cli.command {
            Commands::Add { project, paths, recursive } => {
                assert_eq!(project, PathBuf::from("shoot.json"));
                assert_eq!(paths.len(), 2);
                assert!(recursive);
            }
            _ => panic!("Expected Add command"),
        }
    }

    #[test]
    fn test_cli_run_with_photos() {
        let cli = Cli::try_parse_from([
            "photocull", "--format", "json", "run", "shoot.json", "--photo", "abc", "--photo", "def"
        ]).unwrap();

        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Run { photos, .. } => assert_eq!(photos, vec!["abc", "def"]),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_export_flags() {
        let cli = Cli::try_parse_from([
            "photocull", "export", "shoot.json", "-o", "out.zip", "--all"
        ]).unwrap();

        match cli.command {
            Commands::Export { output, all, in_place, .. } => {
                assert_eq!(output, Some(PathBuf::from("out.zip")));
                assert!(all);
                assert!(!in_place);
            }
            _ => panic!("Expected Export command"),
        }

        assert!(Cli::try_parse_from([
            "photocull", "export", "shoot.json", "-o", "out.zip", "--in-place"
        ]).is_err());
        assert!(Cli::try_parse_from(["photocull", "export", "shoot.json", "--overwrite"]).is_err());

        let cli = Cli::try_parse_from(["photocull", "export", "shoot.json", "--in-place", "--overwrite"]).unwrap();
        assert!(matches!(cli.command, Commands::Export { in_place: true, overwrite: true, .. }));
    }

    #[test]
    fn test_parse_rating_arg() {
        assert_eq!(parse_rating_arg("4").unwrap(), Some(4));
        assert_eq!(parse_rating_arg("0").unwrap(), Some(0));
        assert_eq!(parse_rating_arg("clear").unwrap(), None);
        assert!(matches!(parse_rating_arg("6"), Err(CullError::InvalidRating(6))));
        assert!(matches!(parse_rating_arg("-1"), Err(CullError::InvalidRating(-1))));
        assert!(parse_rating_arg("great").is_err());
    }
}
