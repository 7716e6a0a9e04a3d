//! Projects the annotation store into training label files.
//!
//! Export reads the store only; re-running it overwrites earlier output with
//! identical content.

use crate::config::{LabelFormat, Mode, MASK_SIZE};
use crate::error::{MarkerError, Result};
use crate::store::{AnnotationStore, ImageEntry, Mark};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;
use imageproc::rect::Rect;
use log::{debug, info, warn};
use std::path::Path;

pub const MASK_BACKGROUND: Luma<u8> = Luma([0]);
pub const MASK_FOREGROUND: Luma<u8> = Luma([255]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportTarget {
    /// One KITTI text file of box records per image.
    KittiText,
    /// One filled-polygon mask image per image.
    Mask,
    /// Pascal VOC XML. Selectable, but not implemented.
    Voc,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub files_written: usize,
    pub marks_exported: usize,
}

impl ExportTarget {
    pub fn select(mode: Mode, format: LabelFormat) -> Self {
        match (mode, format) {
            (_, LabelFormat::Voc) => ExportTarget::Voc,
            (Mode::Detection, LabelFormat::Kitti) => ExportTarget::KittiText,
            (Mode::Segmentation, LabelFormat::Kitti) => ExportTarget::Mask,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportTarget::KittiText => "KITTI",
            ExportTarget::Mask => "segmentation mask",
            ExportTarget::Voc => "Pascal VOC",
        }
    }

    /// Writes one output file per image into `out_dir`, creating it if needed.
    pub fn export(&self, store: &AnnotationStore, out_dir: &Path) -> Result<ExportSummary> {
        if let ExportTarget::Voc = self {
            return Err(MarkerError::NotImplemented(self.name()));
        }

        info!("Generating {} labels in {}", self.name(), out_dir.display());
        std::fs::create_dir_all(out_dir).map_err(|e| MarkerError::io(out_dir, e))?;

        let mut summary = ExportSummary::default();
        for entry in store.images() {
            let marks = match self {
                ExportTarget::KittiText => write_kitti(entry, store.labels(), out_dir)?,
                ExportTarget::Mask => write_mask(entry, store.labels(), out_dir)?,
                ExportTarget::Voc => unreachable!("rejected above"),
            };
            summary.files_written += 1;
            summary.marks_exported += marks;
        }
        info!(
            "Done: {} files, {} marks",
            summary.files_written, summary.marks_exported
        );
        Ok(summary)
    }
}

// ── KITTI ───────────────────────────────────────────────────────────────────

/// Renders the KITTI records for one image, labels in catalog order.
/// Only type and bbox vary; truncation, occlusion, alpha, dimensions,
/// location and rotation are written as zero.
pub fn kitti_records(entry: &ImageEntry, labels: &[String]) -> (String, usize) {
    let mut text = String::new();
    let mut count = 0;
    for label in labels {
        for mark in entry.marks_for(label) {
            match *mark {
                Mark::Box { x1, y1, x2, y2 } => {
                    text.push_str(&format!(
                        "{label} 0 0 0 {x1} {y1} {x2} {y2} 0 0 0 0 0 0 0\n"
                    ));
                    count += 1;
                }
                Mark::Polygon { .. } => {
                    warn!(
                        "Skipping polygon mark on {} in KITTI export",
                        entry.path.display()
                    );
                }
            }
        }
    }
    (text, count)
}

fn write_kitti(entry: &ImageEntry, labels: &[String], out_dir: &Path) -> Result<usize> {
    let stem = entry
        .path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();
    let out_path = out_dir.join(format!("{stem}.txt"));
    let (text, count) = kitti_records(entry, labels);
    std::fs::write(&out_path, text).map_err(|e| MarkerError::io(&out_path, e))?;
    debug!("Wrote {} ({} records)", out_path.display(), count);
    Ok(count)
}

// ── Masks ───────────────────────────────────────────────────────────────────

/// Fills every mark of every label onto one fixed-size canvas. Later marks
/// paint over earlier ones; labels are not separated.
pub fn render_mask(entry: &ImageEntry, labels: &[String]) -> (GrayImage, usize) {
    let mut canvas = GrayImage::from_pixel(MASK_SIZE, MASK_SIZE, MASK_BACKGROUND);
    let mut count = 0;
    for label in labels {
        for mark in entry.marks_for(label) {
            if fill_mark(&mut canvas, mark) {
                count += 1;
            }
        }
    }
    (canvas, count)
}

fn fill_mark(canvas: &mut GrayImage, mark: &Mark) -> bool {
    match mark {
        Mark::Polygon { points } => {
            let mut ring: Vec<PixelPoint<i32>> =
                points.iter().map(|p| PixelPoint::new(p.x, p.y)).collect();
            // The fill routine closes the ring itself and rejects a repeated endpoint.
            while ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            if ring.len() < 3 {
                debug!("Skipping degenerate polygon with {} points", points.len());
                return false;
            }
            draw_polygon_mut(canvas, &ring, MASK_FOREGROUND);
            true
        }
        Mark::Box { x1, y1, x2, y2 } => {
            let rect = Rect::at(*x1.min(x2), *y1.min(y2))
                .of_size(x1.abs_diff(*x2) + 1, y1.abs_diff(*y2) + 1);
            draw_filled_rect_mut(canvas, rect, MASK_FOREGROUND);
            true
        }
    }
}

fn write_mask(entry: &ImageEntry, labels: &[String], out_dir: &Path) -> Result<usize> {
    let name = entry.path.file_name().unwrap_or_default();
    let out_path = out_dir.join(name);
    let (mask, count) = render_mask(entry, labels);
    mask.save(&out_path).map_err(|source| MarkerError::Image {
        path: out_path.clone(),
        source,
    })?;
    debug!("Wrote {} ({} shapes)", out_path.display(), count);
    Ok(count)
}
