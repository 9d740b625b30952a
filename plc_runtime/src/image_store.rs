//! On-disk control image store.
//!
//! The working directory holds:
//! - `<hash><module suffix>` - the current control image
//! - `lasttransferedPLC.md5` - marker with the hash of the current image
//! - `extra_files.txt` - manifest of auxiliary files installed with it
//!
//! The marker is published after the image bytes are on disk, so a
//! caller never sees a hash that does not match the stored image.

use crate::error::{RuntimeError, RuntimeResult};
use plc_common::consts::{AUX_MANIFEST_FILE, HASH_MARKER_FILE, MODULE_SUFFIX};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// An auxiliary file delivered with a control image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxFile {
    /// File name relative to the working directory.
    pub name: String,
    /// File contents.
    pub data: Vec<u8>,
}

impl AuxFile {
    /// Create an auxiliary file.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Manages the current control image and its auxiliary files.
#[derive(Debug)]
pub struct ImageStore {
    working_dir: PathBuf,
    /// File name of the current image, set only after a complete install.
    current: Option<String>,
}

impl ImageStore {
    /// Open the store, restoring the current image from the hash marker.
    pub fn open(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let current = stored_hash(&working_dir).map(|h| image_file_name(&h));
        match &current {
            Some(name) => info!("Restored control image {}", name),
            None => info!("No control image in {}", working_dir.display()),
        }
        Self {
            working_dir,
            current,
        }
    }

    /// Working directory of the store.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Whether a current image is recorded.
    pub fn has_image(&self) -> bool {
        self.current.is_some()
    }

    /// Full path of the current image file.
    pub fn current_image_path(&self) -> Option<PathBuf> {
        self.current.as_ref().map(|name| self.working_dir.join(name))
    }

    /// Hash persisted in the marker file.
    pub fn current_hash(&self) -> Option<String> {
        stored_hash(&self.working_dir)
    }

    /// Compare `candidate` with the persisted hash. Never fails.
    pub fn match_hash(&self, candidate: &str) -> bool {
        hash_matches(&self.working_dir, candidate)
    }

    /// Replace the current image.
    ///
    /// Previous image and auxiliary files are removed best-effort, then the
    /// new image is written, the marker published and each auxiliary file
    /// written and recorded in the manifest.
    ///
    /// # Errors
    /// - `RuntimeError::InvalidImageName` if `hash` or an auxiliary name is
    ///   unusable; nothing is touched in that case
    /// - `RuntimeError::InstallIo` on any write failure; the store is then
    ///   indeterminate and the caller should install again
    pub fn install(&mut self, hash: &str, image: &[u8], aux_files: &[AuxFile]) -> RuntimeResult<()> {
        validate_hash(hash)?;
        let file_name = image_file_name(hash);
        for aux in aux_files {
            validate_aux_name(&aux.name)?;
            if aux.name == file_name {
                return Err(RuntimeError::InvalidImageName(aux.name.clone()));
            }
        }

        self.remove_previous();

        fs::create_dir_all(&self.working_dir).map_err(|e| io_error(&self.working_dir, e))?;

        let image_path = self.working_dir.join(&file_name);
        fs::write(&image_path, image).map_err(|e| io_error(&image_path, e))?;

        self.publish_marker(hash)?;

        let manifest_path = self.manifest_path();
        let mut manifest = File::create(&manifest_path).map_err(|e| io_error(&manifest_path, e))?;
        for aux in aux_files {
            let path = self.working_dir.join(&aux.name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            }
            fs::write(&path, &aux.data).map_err(|e| io_error(&path, e))?;
            writeln!(manifest, "{}", aux.name).map_err(|e| io_error(&manifest_path, e))?;
        }
        manifest.sync_all().map_err(|e| io_error(&manifest_path, e))?;

        self.current = Some(file_name);
        info!(
            "Installed control image {} with {} auxiliary file(s)",
            hash,
            aux_files.len()
        );
        Ok(())
    }

    /// Delete the current image and every file listed in the manifest.
    ///
    /// Missing files are expected and ignored.
    fn remove_previous(&self) {
        if let Some(path) = self.current_image_path() {
            remove_quietly(&path);
        }
        if let Ok(manifest) = fs::read_to_string(self.manifest_path()) {
            for name in manifest.lines().map(str::trim).filter(|n| !n.is_empty()) {
                if validate_aux_name(name).is_ok() {
                    remove_quietly(&self.working_dir.join(name));
                }
            }
        }
    }

    /// Write the marker to a sibling file and rename it into place.
    fn publish_marker(&self, hash: &str) -> RuntimeResult<()> {
        let marker = self.marker_path();
        let staging = self.working_dir.join(marker_staging_name());
        fs::write(&staging, hash).map_err(|e| io_error(&staging, e))?;
        fs::rename(&staging, &marker).map_err(|e| io_error(&marker, e))
    }

    fn marker_path(&self) -> PathBuf {
        self.working_dir.join(HASH_MARKER_FILE)
    }

    fn manifest_path(&self) -> PathBuf {
        self.working_dir.join(AUX_MANIFEST_FILE)
    }
}

/// Hash recorded in the marker of `working_dir`.
///
/// A missing marker, or one that does not hold a usable hash, reads as no
/// image at all.
pub fn stored_hash(working_dir: &Path) -> Option<String> {
    let path = working_dir.join(HASH_MARKER_FILE);
    let content = fs::read_to_string(&path).ok()?;
    let hash = content.trim();
    match validate_hash(hash) {
        Ok(()) => Some(hash.to_string()),
        Err(_) => {
            warn!("Ignoring invalid hash marker {}", path.display());
            None
        }
    }
}

/// Compare `candidate` with the hash recorded in `working_dir`.
pub fn hash_matches(working_dir: &Path, candidate: &str) -> bool {
    stored_hash(working_dir).is_some_and(|hash| hash == candidate)
}

fn image_file_name(hash: &str) -> String {
    format!("{hash}{MODULE_SUFFIX}")
}

fn marker_staging_name() -> String {
    format!("{HASH_MARKER_FILE}.tmp")
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!("Could not remove {}: {}", path.display(), e);
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RuntimeError {
    RuntimeError::InstallIo {
        path: path.to_path_buf(),
        source,
    }
}

/// A hash names the image file, so it must be plain hex.
fn validate_hash(hash: &str) -> RuntimeResult<()> {
    if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RuntimeError::InvalidImageName(hash.to_string()));
    }
    Ok(())
}

/// Auxiliary files stay inside the working directory and never shadow
/// the store's own bookkeeping files.
fn validate_aux_name(name: &str) -> RuntimeResult<()> {
    let path = Path::new(name);
    let contained = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    let reserved =
        name == HASH_MARKER_FILE || name == AUX_MANIFEST_FILE || name == marker_staging_name();
    if !contained || reserved {
        return Err(RuntimeError::InvalidImageName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HASH_A: &str = "0123456789abcdef0123456789abcdef";
    const HASH_B: &str = "fedcba9876543210fedcba9876543210";

    fn store() -> (TempDir, ImageStore) {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::open(dir.path());
        (dir, store)
    }

    #[test]
    fn empty_store_has_no_image() {
        let (_dir, store) = store();
        assert!(!store.has_image());
        assert_eq!(store.current_hash(), None);
        assert!(!store.match_hash(HASH_A));
        assert!(!store.match_hash(""));
    }

    #[test]
    fn install_writes_image_marker_and_manifest() {
        let (dir, mut store) = store();
        let aux = vec![
            AuxFile::new("retain.bin", vec![1, 2, 3]),
            AuxFile::new("web/index.html", b"<html/>".to_vec()),
        ];
        store.install(HASH_A, b"image", &aux).unwrap();

        let image = dir.path().join(format!("{HASH_A}{MODULE_SUFFIX}"));
        assert_eq!(fs::read(&image).unwrap(), b"image");
        assert_eq!(store.current_image_path(), Some(image));
        assert_eq!(
            fs::read_to_string(dir.path().join(HASH_MARKER_FILE)).unwrap(),
            HASH_A
        );
        assert_eq!(
            fs::read_to_string(dir.path().join(AUX_MANIFEST_FILE)).unwrap(),
            "retain.bin\nweb/index.html\n"
        );
        assert_eq!(fs::read(dir.path().join("web/index.html")).unwrap(), b"<html/>");
        assert!(store.match_hash(HASH_A));
        assert!(!store.match_hash(HASH_B));
    }

    #[test]
    fn replace_removes_previous_files() {
        let (dir, mut store) = store();
        store
            .install(HASH_A, b"first", &[AuxFile::new("old.cfg", b"x".to_vec())])
            .unwrap();
        store
            .install(HASH_B, b"second", &[AuxFile::new("new.cfg", b"y".to_vec())])
            .unwrap();

        assert!(!dir.path().join(format!("{HASH_A}{MODULE_SUFFIX}")).exists());
        assert!(!dir.path().join("old.cfg").exists());
        assert!(dir.path().join("new.cfg").exists());
        assert!(dir.path().join(AUX_MANIFEST_FILE).exists());
        assert!(store.match_hash(HASH_B));
        assert!(!store.match_hash(HASH_A));
    }

    #[test]
    fn reinstall_same_hash_succeeds() {
        let (dir, mut store) = store();
        store.install(HASH_A, b"image", &[]).unwrap();
        store.install(HASH_A, b"image", &[]).unwrap();
        assert!(dir.path().join(format!("{HASH_A}{MODULE_SUFFIX}")).exists());
        assert!(store.match_hash(HASH_A));
    }

    #[test]
    fn reopen_restores_current_image() {
        let (dir, mut store) = store();
        store.install(HASH_A, b"image", &[]).unwrap();

        let reopened = ImageStore::open(dir.path());
        assert!(reopened.has_image());
        assert_eq!(
            reopened.current_image_path(),
            Some(dir.path().join(format!("{HASH_A}{MODULE_SUFFIX}")))
        );
    }

    #[test]
    fn marker_with_trailing_newline_still_matches() {
        let (dir, store) = store();
        fs::write(dir.path().join(HASH_MARKER_FILE), format!("{HASH_A}\n")).unwrap();
        assert!(store.match_hash(HASH_A));
    }

    #[test]
    fn invalid_names_are_rejected_before_touching_disk() {
        let (dir, mut store) = store();
        store.install(HASH_A, b"image", &[]).unwrap();

        for bad in ["", "../evil", "not-hex!", "abc/def"] {
            let result = store.install(bad, b"x", &[]);
            assert!(matches!(result, Err(RuntimeError::InvalidImageName(_))), "{bad}");
        }
        let own_image = format!("{HASH_B}{MODULE_SUFFIX}");
        let staging = marker_staging_name();
        for bad in [
            "../escape.txt",
            "/etc/passwd",
            "",
            HASH_MARKER_FILE,
            AUX_MANIFEST_FILE,
            staging.as_str(),
            own_image.as_str(),
        ] {
            let result = store.install(HASH_B, b"x", &[AuxFile::new(bad, b"x".to_vec())]);
            assert!(matches!(result, Err(RuntimeError::InvalidImageName(_))), "{bad}");
        }

        assert!(dir.path().join(format!("{HASH_A}{MODULE_SUFFIX}")).exists());
        assert!(store.match_hash(HASH_A));
    }

    #[test]
    fn aux_file_cannot_replace_image_bytes() {
        let (dir, mut store) = store();
        let shadow = AuxFile::new(format!("{HASH_A}{MODULE_SUFFIX}"), b"junk".to_vec());

        let result = store.install(HASH_A, b"image", &[shadow]);

        assert!(matches!(result, Err(RuntimeError::InvalidImageName(_))));
        assert!(!dir.path().join(format!("{HASH_A}{MODULE_SUFFIX}")).exists());
        assert!(!store.match_hash(HASH_A));
    }

    #[test]
    fn invalid_marker_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(HASH_MARKER_FILE), "../outside\n").unwrap();

        let store = ImageStore::open(dir.path());
        assert!(!store.has_image());
        assert_eq!(store.current_image_path(), None);
        assert_eq!(store.current_hash(), None);
        assert!(!store.match_hash("../outside"));
    }

    #[test]
    fn write_failure_is_install_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();

        let mut store = ImageStore::open(blocker.join("plc"));
        let result = store.install(HASH_A, b"image", &[]);
        assert!(matches!(result, Err(RuntimeError::InstallIo { .. })));
        assert!(!store.has_image());
    }
}
