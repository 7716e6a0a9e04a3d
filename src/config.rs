//! Command line and display configuration.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Supported image file extensions for scanning the input directory.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Side length of the single-channel canvas segmentation masks are drawn on.
pub const MASK_SIZE: u32 = 640;

#[derive(Parser, Debug)]
#[command(
    name = "image-marker",
    version,
    about = "Mark boxes or polygons on a folder of images and export training labels"
)]
pub struct Cli {
    /// Directory holding the images to annotate
    #[arg(short = 'i', long = "input", visible_alias = "in")]
    pub input: PathBuf,

    /// Directory exported label files are written to
    #[arg(
        short = 'o',
        long = "output",
        visible_alias = "out",
        default_value = "output/"
    )]
    pub output: PathBuf,

    /// Newline-delimited file of label names
    #[arg(short = 'l', long = "labels")]
    pub labels: PathBuf,

    /// Annotation geometry
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = Mode::Detection)]
    pub mode: Mode,

    /// Export format used by the generate key
    #[arg(
        short = 'f',
        long = "label_format",
        visible_alias = "lf",
        value_enum,
        default_value_t = LabelFormat::Kitti
    )]
    pub label_format: LabelFormat,

    /// Start with the box size overlay hidden
    #[arg(long, default_value_t = false)]
    pub hide_size: bool,
}

/// Annotation mode, fixed for a whole session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Detection,
    Segmentation,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Detection => "detection",
            Mode::Segmentation => "segmentation",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LabelFormat {
    Kitti,
    Voc,
}

/// Overlay switches carried over from the marker's option set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Print `[w,h]` next to every box.
    pub show_size: bool,
    /// Color the size text red when a box falls outside 50..=400 px per side.
    pub size_warn: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_size: true,
            size_warn: true,
        }
    }
}

impl DisplayOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            show_size: !cli.hide_size,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let cli = Cli::try_parse_from(["image-marker", "--input", "imgs/", "--labels", "l.txt"])
            .expect("parse");
        assert_eq!(cli.output, PathBuf::from("output/"));
        assert_eq!(cli.mode, Mode::Detection);
        assert_eq!(cli.label_format, LabelFormat::Kitti);
        assert!(DisplayOptions::from_cli(&cli).show_size);
    }

    #[test]
    fn aliases_are_accepted() {
        let cli = Cli::try_parse_from([
            "image-marker",
            "--in",
            "imgs/",
            "--out",
            "labels/",
            "-l",
            "l.txt",
            "-m",
            "segmentation",
            "--lf",
            "voc",
        ])
        .expect("parse");
        assert_eq!(cli.input, PathBuf::from("imgs/"));
        assert_eq!(cli.output, PathBuf::from("labels/"));
        assert_eq!(cli.mode, Mode::Segmentation);
        assert_eq!(cli.label_format, LabelFormat::Voc);
    }

    #[test]
    fn input_and_labels_are_required() {
        assert!(Cli::try_parse_from(["image-marker", "--labels", "l.txt"]).is_err());
        assert!(Cli::try_parse_from(["image-marker", "--input", "imgs/"]).is_err());
    }
}
