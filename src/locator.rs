use anyhow::{bail, Result};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// SHA-1 file ids under which iTunes-style iOS backups store Safari's
/// History.db.
const BACKUP_FILE_IDS: &[&str] = &[
    "e74113c185fd8297e140cfcf9c99436c5cc06b57",
    "1a0e7afc19d307da602ccdcece51af33afe92c53",
];

/// Resolve the Safari History.db from a direct file path, an iOS backup
/// directory, or a full filesystem dump. First existing candidate wins;
/// finding nothing is a terminal error.
pub fn locate(input: &Path) -> Result<PathBuf> {
    if input.is_file() {
        return Ok(input.to_path_buf());
    }
    if !input.is_dir() {
        bail!("Path not found: {}", input.display());
    }

    // Newer backups shard files into two-hex-digit subdirectories; older
    // backups keep them flat at the top level.
    for id in BACKUP_FILE_IDS {
        let sharded = input.join(&id[..2]).join(id);
        if sharded.is_file() {
            debug!("Resolved backup file id {id}");
            return Ok(sharded);
        }
        let flat = input.join(id);
        if flat.is_file() {
            debug!("Resolved backup file id {id}");
            return Ok(flat);
        }
    }

    // Filesystem dump: private/var/mobile/Library/Safari/History.db, or the
    // per-app data container equivalent.
    for entry in WalkDir::new(input)
        .follow_links(true)
        .max_depth(12)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().file_name().and_then(|n| n.to_str()) != Some("History.db") {
            continue;
        }
        let path_str = entry.path().to_string_lossy().replace('\\', "/");
        if path_str.contains("Library/Safari") {
            debug!("Resolved History.db at {}", entry.path().display());
            return Ok(entry.path().to_path_buf());
        }
    }

    bail!(
        "Unable to locate a Safari History.db under {}",
        input.display()
    )
}
