//! Resource partitioning between the private and public storage areas.
//!
//! Every compiled file lives in the private area. Only files whose MIME
//! type is on the fixed allow-list below, and which are not server-side
//! templates, are mirrored into the public area where the delivery client
//! can fetch them. Files outside the allow-list are silently excluded,
//! never an error.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::storage::StorageArea;

/// MIME types of files accepted into the public compilation area.
pub const PUBLIC_MIME_TYPES: [&str; 18] = [
    "text/css",
    "image/png",
    "image/jpeg",
    "image/gif",
    "text/html",
    "application/x-shockwave-flash",
    "video/x-flv",
    "image/bmp",
    "image/svg+xml",
    "audio/mpeg",
    "audio/ogg",
    "video/quicktime",
    "video/webm",
    "video/ogg",
    "application/pdf",
    "application/x-font-woff",
    "application/vnd.ms-fontobject",
    "application/x-font-ttf",
];

/// Extension of rendered rubric templates, never exposed publicly.
pub const TEMPLATE_EXTENSION: &str = "tpl";

/// MIME type of a file, derived from its extension. `None` for anything
/// not worth classifying.
pub fn mime_type_of(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    let mime = match extension.as_str() {
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "htm" | "html" => "text/html",
        "swf" => "application/x-shockwave-flash",
        "flv" => "video/x-flv",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "oga" | "ogg" => "audio/ogg",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "pdf" => "application/pdf",
        "woff" => "application/x-font-woff",
        "eot" => "application/vnd.ms-fontobject",
        "ttf" => "application/x-font-ttf",
        "json" => "application/json",
        "toml" => "application/toml",
        "xml" => "application/xml",
        "tpl" => "text/x-template",
        _ => return None,
    };
    Some(mime)
}

/// Copy the full authored content tree into the private area.
///
/// Returns the number of files copied.
pub fn copy_private_resources(source_dir: &Path, private: &StorageArea) -> Result<usize> {
    let mut copied = 0usize;
    for entry in WalkDir::new(source_dir) {
        let entry = entry.with_context(|| {
            format!("failed to walk source directory {}", source_dir.display())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .expect("walked path is under the source directory");
        private.copy_into(entry.path(), relative)?;
        copied += 1;
    }
    Ok(copied)
}

/// Mirror allow-listed files from the private area into the public area.
///
/// `exclude` holds private-area-relative paths already handled elsewhere
/// (rubric stylesheets). Returns the number of files made public.
pub fn copy_public_resources(
    private: &StorageArea,
    public: &StorageArea,
    exclude: &HashSet<PathBuf>,
) -> Result<usize> {
    let mut copied = 0usize;
    for entry in WalkDir::new(private.root()) {
        let entry = entry.with_context(|| {
            format!("failed to walk private area {}", private.root().display())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(private.root())
            .expect("walked path is under the private area")
            .to_path_buf();

        if exclude.contains(&relative) {
            continue;
        }
        if entry
            .path()
            .extension()
            .is_some_and(|ext| ext == TEMPLATE_EXTENSION)
        {
            continue;
        }
        let Some(mime) = mime_type_of(entry.path()) else {
            continue;
        };
        if !PUBLIC_MIME_TYPES.contains(&mime) {
            continue;
        }

        tracing::debug!(file = %relative.display(), mime, "copying public resource");
        public.copy_into(entry.path(), &relative)?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_areas() -> (tempfile::TempDir, StorageArea, StorageArea) {
        let dir = tempfile::tempdir().unwrap();
        let private = StorageArea::spawn(dir.path(), "private").unwrap();
        let public = StorageArea::spawn(dir.path(), "public").unwrap();
        (dir, private, public)
    }

    #[test]
    fn mime_detection() {
        assert_eq!(mime_type_of(Path::new("style.css")), Some("text/css"));
        assert_eq!(mime_type_of(Path::new("a/b/photo.JPEG")), Some("image/jpeg"));
        assert_eq!(mime_type_of(Path::new("clip.ogv")), Some("video/ogg"));
        assert_eq!(mime_type_of(Path::new("song.ogg")), Some("audio/ogg"));
        assert_eq!(mime_type_of(Path::new("no_extension")), None);
        assert_eq!(mime_type_of(Path::new("archive.zip")), None);
    }

    #[test]
    fn private_copy_is_unconditional_and_recursive() {
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("css")).unwrap();
        std::fs::write(source.path().join("css/a.css"), "p {}").unwrap();
        std::fs::write(source.path().join("secret.key"), "nope").unwrap();

        let (_dir, private, _public) = spawn_areas();
        let copied = copy_private_resources(source.path(), &private).unwrap();
        assert_eq!(copied, 2);
        assert!(private.root().join("css/a.css").exists());
        assert!(private.root().join("secret.key").exists());
    }

    #[test]
    fn public_copy_filters_by_mime() {
        let (_dir, private, public) = spawn_areas();
        private.write(Path::new("img/logo.png"), "png").unwrap();
        private.write(Path::new("style.css"), "p {}").unwrap();
        private.write(Path::new("notes.txt"), "private notes").unwrap();
        private.write(Path::new("compact-test.json"), "{}").unwrap();

        let copied = copy_public_resources(&private, &public, &HashSet::new()).unwrap();
        assert_eq!(copied, 2);
        assert!(public.root().join("img/logo.png").exists());
        assert!(public.root().join("style.css").exists());
        assert!(!public.root().join("notes.txt").exists());
        assert!(!public.root().join("compact-test.json").exists());
    }

    #[test]
    fn public_copy_skips_templates_and_excluded() {
        let (_dir, private, public) = spawn_areas();
        private.write(Path::new("intro.tpl"), "<div/>").unwrap();
        private.write(Path::new("css/scoped.css"), "#r p {}").unwrap();
        private.write(Path::new("css/free.css"), "p {}").unwrap();

        let mut exclude = HashSet::new();
        exclude.insert(PathBuf::from("css/scoped.css"));

        let copied = copy_public_resources(&private, &public, &exclude).unwrap();
        assert_eq!(copied, 1);
        assert!(!public.root().join("intro.tpl").exists());
        assert!(!public.root().join("css/scoped.css").exists());
        assert!(public.root().join("css/free.css").exists());
    }
}
