//! joindots: command-line front end for the puzzle generator.
//!
//! Converts one photo into `<stem>.png` and `<stem>.pdf` in the output
//! directory, optionally printing per-stage pipeline diagnostics.
//!
//! # Usage
//!
//! ```text
//! joindots [OPTIONS] <IMAGE>
//! RUST_LOG=debug joindots --dots 150 --difficulty hard photo.jpg
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use joindots::{Clock, Generator, JobSettings, PipelineDiagnostics};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Turn a photo into a printable numbered connect-the-dots page.
///
/// Writes an A4 PNG (300 DPI) and an A4 PDF next to each other in the
/// output directory, named after the input file.
#[derive(Parser)]
#[command(name = "joindots", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Directory the PNG and PDF are written to.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Maximum number of dots to place (at least 2).
    #[arg(long, default_value_t = JobSettings::DEFAULT_DOT_COUNT, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(u64::from(JobSettings::MIN_DOT_COUNT)..))]
    dots: u32,

    /// How much outline detail survives simplification.
    #[arg(long, value_enum, default_value_t = Level::Medium)]
    difficulty: Level,

    /// Draw faint dashed lines between consecutive dots.
    #[arg(long)]
    guide_lines: bool,

    /// Full job settings as a JSON string, e.g.
    /// `{"dotCount":150,"difficulty":"hard","showGuideLines":false}`.
    ///
    /// When provided, `--dots`, `--difficulty` and `--guide-lines` are
    /// ignored.
    #[arg(long)]
    settings_json: Option<String>,

    /// Print per-stage pipeline diagnostics to stdout.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a text report.
    #[arg(long, requires = "diagnostics")]
    json: bool,
}

/// Difficulty selection.
#[derive(Clone, Copy, ValueEnum)]
enum Level {
    /// Few, long straight runs between dots.
    Easy,
    /// Balanced detail.
    Medium,
    /// Keeps fine outline detail.
    Hard,
}

impl From<Level> for joindots::Difficulty {
    fn from(level: Level) -> Self {
        match level {
            Level::Easy => Self::Easy,
            Level::Medium => Self::Medium,
            Level::Hard => Self::Hard,
        }
    }
}

/// Build [`JobSettings`] from CLI arguments.
///
/// If `--settings-json` is provided it is parsed directly and the
/// individual flags are ignored.
fn settings_from_cli(cli: &Cli) -> Result<JobSettings, String> {
    let settings = if let Some(ref json) = cli.settings_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --settings-json: {e}"))?
    } else {
        JobSettings {
            dot_count: cli.dots,
            difficulty: cli.difficulty.into(),
            show_guide_lines: cli.guide_lines,
        }
    };
    settings.validate().map_err(|e| e.to_string())?;
    Ok(settings)
}

/// `<dir>/<stem>.<extension>`, falling back to `joindots` for the stem.
fn output_path(dir: &Path, image_path: &Path, extension: &str) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("joindots");
    dir.join(format!("{stem}.{extension}"))
}

fn print_diagnostics(diagnostics: &PipelineDiagnostics, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{text}");
    } else {
        println!("{}", diagnostics.report());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match settings_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    info!(
        image = %cli.image_path.display(),
        bytes = image_bytes.len(),
        dot_count = settings.dot_count,
        difficulty = %settings.difficulty,
        guide_lines = settings.show_guide_lines,
        "generating puzzle"
    );

    let generator = Generator::default();
    let mut progress = |percent: u8| info!(percent, "progress");

    let result = if cli.diagnostics {
        generator
            .generate_with_diagnostics(&image_bytes, &settings, &StdClock, &mut progress)
            .map(|(generated, diagnostics)| (generated, Some(diagnostics)))
    } else {
        generator
            .generate(&image_bytes, &settings, &mut progress)
            .map(|generated| (generated, None))
    };

    let (generated, diagnostics) = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Generation failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref diagnostics) = diagnostics
        && let Err(msg) = print_diagnostics(diagnostics, cli.json)
    {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = std::fs::create_dir_all(&cli.output_dir) {
        eprintln!("Error creating {}: {e}", cli.output_dir.display());
        return ExitCode::FAILURE;
    }

    for (extension, bytes) in [("png", &generated.raster), ("pdf", &generated.paged)] {
        let path = output_path(&cli.output_dir, &cli.image_path, extension);
        if let Err(e) = std::fs::write(&path, bytes) {
            eprintln!("Error writing {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), bytes = bytes.len(), "wrote {extension}");
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_build_settings() {
        let cli = Cli::parse_from([
            "joindots",
            "photo.jpg",
            "--dots",
            "150",
            "--difficulty",
            "hard",
            "--guide-lines",
        ]);
        let settings = settings_from_cli(&cli).unwrap();
        assert_eq!(settings.dot_count, 150);
        assert_eq!(settings.difficulty, joindots::Difficulty::Hard);
        assert!(settings.show_guide_lines);
    }

    #[test]
    fn settings_json_overrides_flags() {
        let cli = Cli::parse_from([
            "joindots",
            "photo.jpg",
            "--dots",
            "150",
            "--settings-json",
            r#"{"dotCount":50,"difficulty":"easy","showGuideLines":true}"#,
        ]);
        let settings = settings_from_cli(&cli).unwrap();
        assert_eq!(settings.dot_count, 50);
        assert_eq!(settings.difficulty, joindots::Difficulty::Easy);
    }

    #[test]
    fn settings_json_is_validated() {
        let cli = Cli::parse_from([
            "joindots",
            "photo.jpg",
            "--settings-json",
            r#"{"dotCount":1,"difficulty":"easy","showGuideLines":false}"#,
        ]);
        assert!(settings_from_cli(&cli).is_err());
    }

    #[test]
    fn too_few_dots_is_a_usage_error() {
        assert!(Cli::try_parse_from(["joindots", "photo.jpg", "--dots", "1"]).is_err());
    }

    #[test]
    fn output_paths_use_the_input_stem() {
        let dir = Path::new("out");
        assert_eq!(
            output_path(dir, Path::new("photos/cat.jpeg"), "pdf"),
            Path::new("out/cat.pdf")
        );
        assert_eq!(output_path(dir, Path::new(""), "png"), Path::new("out/joindots.png"));
    }
}
