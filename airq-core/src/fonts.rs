use std::path::{Path, PathBuf};

use ab_glyph::FontRef;
use once_cell::sync::OnceCell;
use plotters::style::{FontStyle, register_font};
use tracing::{debug, info, warn};

/// Family name every chart text style refers to.
pub const FONT_FAMILY: &str = "sans-serif";

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static INSTALLED: OnceCell<Option<PathBuf>> = OnceCell::new();

/// Registers the chart font once per process and returns the file it came from.
///
/// `preferred` is tried before the well-known system locations. Only the first
/// call has an effect.
pub fn install(preferred: Option<&Path>) -> Option<&'static Path> {
    INSTALLED.get_or_init(|| load(preferred)).as_deref()
}

/// Whether chart text can be drawn.
pub fn available() -> bool {
    install(None).is_some()
}

fn load(preferred: Option<&Path>) -> Option<PathBuf> {
    let candidates = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

    for path in candidates {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(font = %path.display(), %error, "font not readable");
                continue;
            }
        };
        if let Err(error) = FontRef::try_from_slice(&bytes) {
            warn!(font = %path.display(), %error, "invalid font file");
            continue;
        }

        // Only a parsed font is handed to the registry, which keeps it for the
        // rest of the process.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => {
                info!(font = %path.display(), "registered chart font");
                return Some(path);
            }
            Err(_) => warn!(font = %path.display(), "font rejected by chart backend"),
        }
    }

    warn!("no TrueType font found, charts are rendered without text");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_font_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"definitely not a font").expect("write");
        assert!(FontRef::try_from_slice(b"definitely not a font").is_err());

        let loaded = load(Some(&bogus));
        assert_ne!(loaded.as_deref(), Some(bogus.as_path()));
    }

    #[test]
    fn missing_preferred_font_falls_back() {
        let missing = Path::new("/nonexistent/airq/font.ttf");
        assert_ne!(load(Some(missing)).as_deref(), Some(missing));
    }
}
