//! Catalog manifest: a derived snapshot of the on-disk collection.
//!
//! The catalog is rebuilt in full from the filesystem after every crawl —
//! never incrementally maintained — so it is always consistent with disk
//! state at generation time. Entries carry the paths the external serving
//! component exposes (`/static/...`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::crawl::is_video_extension;

/// Extensions included in the catalog.
///
/// Note `swf` files are stored on disk but not cataloged; the serving
/// component has no player for them.
const CATALOG_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "mp4", "webm"];

/// One row of the output manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// On-disk filename (`<id>.<ext>`).
    pub name: String,
    /// Served path of the original file.
    pub url: String,
    /// Served path of the thumbnail, when one exists on disk.
    pub thumb: Option<String>,
    /// Whether the entry is a video (by extension).
    #[serde(rename = "isVideo")]
    pub is_video: bool,
}

/// Errors from catalog building or writing.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to scan the media directory.
    #[error("failed to scan {path}: {source}")]
    Scan {
        /// The directory that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the manifest file.
    #[error("failed to write catalog to {path}: {source}")]
    Write {
        /// The manifest path that could not be written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the manifest.
    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Builds the catalog from the current filesystem state.
///
/// Scans `media_dir`, keeps known media extensions, and marks a thumbnail
/// only when `<thumb_dir>/<stem>.jpg` exists. Entries are sorted by name so
/// repeated rebuilds of an identical tree are byte-identical.
///
/// # Errors
///
/// Returns [`CatalogError::Scan`] if the media directory cannot be read.
pub fn build_catalog(media_dir: &Path, thumb_dir: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let reader = std::fs::read_dir(media_dir).map_err(|source| CatalogError::Scan {
        path: media_dir.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for dir_entry in reader {
        let dir_entry = dir_entry.map_err(|source| CatalogError::Scan {
            path: media_dir.to_path_buf(),
            source,
        })?;
        let name = dir_entry.file_name().to_string_lossy().into_owned();

        let Some((stem, ext)) = name.rsplit_once('.') else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if !CATALOG_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let thumb_name = format!("{stem}.jpg");
        let thumb = thumb_dir
            .join(&thumb_name)
            .exists()
            .then(|| format!("/static/thumbs/{thumb_name}"));

        entries.push(CatalogEntry {
            url: format!("/static/{name}"),
            thumb,
            is_video: is_video_extension(&ext),
            name,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(entries = entries.len(), "catalog built");
    Ok(entries)
}

/// Writes the catalog as pretty-printed JSON to `path`.
///
/// # Errors
///
/// Returns [`CatalogError::Serialize`] or [`CatalogError::Write`] on failure.
pub fn write_catalog(entries: &[CatalogEntry], path: &Path) -> Result<(), CatalogError> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json).map_err(|source| CatalogError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_build_mixed_media_with_partial_thumbs() {
        let media = TempDir::new().unwrap();
        let thumbs = TempDir::new().unwrap();
        touch(&media.path().join("1.jpg"));
        touch(&media.path().join("2.mp4"));
        touch(&thumbs.path().join("1.jpg"));

        let entries = build_catalog(media.path(), thumbs.path()).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].name, "1.jpg");
        assert_eq!(entries[0].url, "/static/1.jpg");
        assert_eq!(entries[0].thumb.as_deref(), Some("/static/thumbs/1.jpg"));
        assert!(!entries[0].is_video);

        assert_eq!(entries[1].name, "2.mp4");
        assert_eq!(entries[1].url, "/static/2.mp4");
        assert!(entries[1].thumb.is_none());
        assert!(entries[1].is_video);
    }

    #[test]
    fn test_build_skips_unknown_extensions_and_extensionless() {
        let media = TempDir::new().unwrap();
        let thumbs = TempDir::new().unwrap();
        touch(&media.path().join("1.jpg"));
        touch(&media.path().join("notes.txt"));
        touch(&media.path().join("archive.swf"));
        touch(&media.path().join("noext"));

        let entries = build_catalog(media.path(), thumbs.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "1.jpg");
    }

    #[test]
    fn test_build_sorted_by_name() {
        let media = TempDir::new().unwrap();
        let thumbs = TempDir::new().unwrap();
        for name in ["30.png", "1.jpg", "200.webm"] {
            touch(&media.path().join(name));
        }

        let entries = build_catalog(media.path(), thumbs.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["1.jpg", "200.webm", "30.png"]);
    }

    #[test]
    fn test_build_missing_media_dir_errors() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let result = build_catalog(&missing, temp.path());
        assert!(matches!(result, Err(CatalogError::Scan { .. })));
    }

    #[test]
    fn test_write_emits_null_thumb_and_camel_case_flag() {
        let media = TempDir::new().unwrap();
        let thumbs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(&media.path().join("9.webm"));

        let entries = build_catalog(media.path(), thumbs.path()).unwrap();
        let path = out.path().join("catalog.json");
        write_catalog(&entries, &path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"thumb\": null"), "json was: {json}");
        assert!(json.contains("\"isVideo\": true"), "json was: {json}");

        let round_trip: Vec<CatalogEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(round_trip, entries);
    }

    #[test]
    fn test_build_empty_dir_yields_empty_catalog() {
        let media = TempDir::new().unwrap();
        let thumbs = TempDir::new().unwrap();
        assert!(build_catalog(media.path(), thumbs.path()).unwrap().is_empty());
    }
}
