//! Image → label → marks mapping and its on-disk snapshot.

use crate::config::Mode;
use crate::error::{MarkerError, Result};
use crate::labels::LabelCatalog;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

// ── Marks ───────────────────────────────────────────────────────────────────

/// Integer pixel coordinate in image space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A finished annotation. Box corners may come in any diagonal order;
/// finished polygons repeat their first point at the end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mark {
    Box { x1: i32, y1: i32, x2: i32, y2: i32 },
    Polygon { points: Vec<Point> },
}

impl Mark {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Mark::Box {
            x1: a.x,
            y1: a.y,
            x2: b.x,
            y2: b.y,
        }
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub path: PathBuf,
    marks: BTreeMap<String, Vec<Mark>>,
}

impl ImageEntry {
    fn empty(path: PathBuf, labels: &[String]) -> Self {
        Self {
            path,
            marks: labels.iter().map(|l| (l.clone(), Vec::new())).collect(),
        }
    }

    pub fn marks_for(&self, label: &str) -> &[Mark] {
        self.marks.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    fn file_name(&self) -> Option<&std::ffi::OsStr> {
        self.path.file_name()
    }
}

/// Every image carries a (possibly empty) mark list for every label, and the
/// image order is fixed once built so navigation stays stable across reloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationStore {
    mode: Mode,
    labels: Vec<String>,
    images: Vec<ImageEntry>,
}

pub fn snapshot_path(dir: &Path, mode: Mode) -> PathBuf {
    dir.join(format!("{mode}_marks.json"))
}

impl AnnotationStore {
    pub fn new(mode: Mode, image_paths: &[PathBuf], catalog: &LabelCatalog) -> Self {
        let labels = catalog.names().to_vec();
        let images = image_paths
            .iter()
            .map(|p| ImageEntry::empty(p.clone(), &labels))
            .collect();
        Self {
            mode,
            labels,
            images,
        }
    }

    /// Restores the mode's snapshot from `dir`, or builds an empty store when
    /// none exists. A snapshot that fails to parse is an error, never replaced.
    pub fn load(
        dir: &Path,
        image_paths: &[PathBuf],
        catalog: &LabelCatalog,
        mode: Mode,
    ) -> Result<Self> {
        let path = snapshot_path(dir, mode);
        if !path.exists() {
            info!("No {} snapshot in {}, starting fresh", mode, dir.display());
            return Ok(Self::new(mode, image_paths, catalog));
        }

        let text = std::fs::read_to_string(&path).map_err(|e| MarkerError::io(&path, e))?;
        let mut store: AnnotationStore = serde_json::from_str(&text).map_err(|source| {
            error!("Snapshot {} could not be parsed: {}", path.display(), source);
            MarkerError::SnapshotCorrupt {
                path: path.clone(),
                source,
            }
        })?;
        if store.mode != mode {
            return Err(MarkerError::SnapshotModeMismatch {
                path,
                expected: mode.to_string(),
                found: store.mode.to_string(),
            });
        }

        store.reconcile(image_paths, catalog);
        info!(
            "Loaded {} with {} images and {} marks",
            path.display(),
            store.images.len(),
            store.mark_count()
        );
        Ok(store)
    }

    /// Brings a restored store in line with the current catalog and directory listing.
    fn reconcile(&mut self, image_paths: &[PathBuf], catalog: &LabelCatalog) {
        let extra: Vec<String> = self
            .labels
            .iter()
            .filter(|l| !catalog.names().contains(l))
            .cloned()
            .collect();
        for label in &extra {
            warn!("Snapshot label {label:?} is not in the label file; keeping its marks");
        }
        self.labels = catalog.names().iter().cloned().chain(extra).collect();

        for entry in &mut self.images {
            for label in &self.labels {
                entry.marks.entry(label.clone()).or_default();
            }
        }

        // Matched entries take the freshly scanned path so a moved folder still resolves.
        for path in image_paths {
            match self
                .images
                .iter_mut()
                .find(|e| e.file_name() == path.file_name())
            {
                Some(entry) => {
                    if entry.path != *path {
                        debug!("{} now at {}", entry.path.display(), path.display());
                        entry.path = path.clone();
                    }
                }
                None => {
                    debug!("New image {} appended to the store", path.display());
                    self.images.push(ImageEntry::empty(path.clone(), &self.labels));
                }
            }
        }
    }

    /// Writes the whole store to the mode's snapshot file through a temporary
    /// file in the same directory, so a crash never leaves a truncated snapshot.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = snapshot_path(dir, self.mode);
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            MarkerError::SnapshotCorrupt {
                path: path.clone(),
                source,
            }
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| MarkerError::io(dir, e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| MarkerError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| MarkerError::io(&path, e.error))?;
        debug!("Saved {}", path.display());
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn images(&self) -> &[ImageEntry] {
        &self.images
    }

    pub fn image_path(&self, index: usize) -> Option<&Path> {
        self.images.get(index).map(|e| e.path.as_path())
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn mark_count(&self) -> usize {
        self.images
            .iter()
            .flat_map(|e| e.marks.values())
            .map(Vec::len)
            .sum()
    }

    pub fn marks(&self, image: usize, label: usize) -> &[Mark] {
        match (self.images.get(image), self.labels.get(label)) {
            (Some(entry), Some(label)) => entry.marks_for(label),
            _ => &[],
        }
    }

    fn list_mut(&mut self, image: usize, label: usize) -> Option<&mut Vec<Mark>> {
        let label = self.labels.get(label)?;
        self.images.get_mut(image)?.marks.get_mut(label)
    }

    /// Appends `mark` as given; duplicates and degenerate geometry are accepted.
    /// Returns false if either index is out of range.
    pub fn append(&mut self, image: usize, label: usize, mark: Mark) -> bool {
        match self.list_mut(image, label) {
            Some(list) => {
                list.push(mark);
                true
            }
            None => false,
        }
    }

    /// Pops the newest mark for (image, label). `None` means there was nothing to remove.
    pub fn remove_last(&mut self, image: usize, label: usize) -> Option<Mark> {
        self.list_mut(image, label)?.pop()
    }

    pub fn is_labeled(&self, image: usize, label: usize) -> bool {
        !self.marks(image, label).is_empty()
    }
}
