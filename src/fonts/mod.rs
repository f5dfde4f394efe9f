//! Bundled report font discovery.
//!
//! Generated documents embed the bundled Roboto family.  The font files are
//! not committed; they are resolved at runtime from the `TAKEBACK_FONTS_DIR`
//! environment variable, the directory next to the running executable, or the
//! crate's `assets/fonts` directory.  Tests use [`default_fonts_available`]
//! to skip PDF rasterization when no fonts are installed.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{self, FontData, FontFamily};

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// Environment variable overriding the font search path.
pub const FONTS_DIR_ENV: &str = "TAKEBACK_FONTS_DIR";

const FONT_FILES: &[&str] = &[
    "Roboto-Regular.ttf",
    "Roboto-Bold.ttf",
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

fn candidate_directories() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(path) = env::var(FONTS_DIR_ENV) {
        if !path.trim().is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            let candidate = bin_dir.join("assets/fonts");
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    let manifest_candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
    if !candidates.contains(&manifest_candidate) {
        candidates.push(manifest_candidate);
    }

    candidates
}

fn missing_files(directory: &Path) -> Vec<&'static str> {
    FONT_FILES
        .iter()
        .copied()
        .filter(|name| !directory.join(name).is_file())
        .collect()
}

fn resolve_directory() -> Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in candidate_directories() {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }
        let missing = missing_files(&candidate);
        if missing.is_empty() {
            return Ok(candidate);
        }
        attempts.push(format!(
            "{} (missing {})",
            candidate.display(),
            missing.join(", ")
        ));
    }

    Err(Error::new(
        format!(
            "Unable to locate report fonts. Checked: {}. See assets/fonts/README.md or set {}.",
            attempts.join("; "),
            FONTS_DIR_ENV
        ),
        io::Error::new(io::ErrorKind::NotFound, "report fonts not found"),
    ))
}

/// Loads the bundled font family for document finalization.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    let directory = resolve_directory()?;

    fonts::from_files(&directory, DEFAULT_FONT_FAMILY_NAME, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                DEFAULT_FONT_FAMILY_NAME,
                directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

/// Whether the bundled font files are present on this machine.
pub fn default_fonts_available() -> bool {
    resolve_directory().is_ok()
}
