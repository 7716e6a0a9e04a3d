//! Session state and the dispatch of user input onto it.
//!
//! Everything here is synchronous: one action or pointer event is fully
//! applied, and the snapshot written, before the next one is looked at.

use crate::config::{Cli, DisplayOptions, Mode};
use crate::editor::{Draft, MarkEditor, PointerEvent};
use crate::error::{MarkerError, Result};
use crate::export::ExportTarget;
use crate::image_set;
use crate::labels::LabelCatalog;
use crate::navigation::{self, Cursor, NextUnlabeled};
use crate::store::AnnotationStore;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Keyboard commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    PrevImage,
    NextImage,
    Export,
    NextUnlabeled,
    RemoveLast,
    CycleLabel,
    ToggleSize,
    Quit,
}

impl Action {
    pub fn from_key(key: char) -> Option<Self> {
        Some(match key {
            'a' => Action::PrevImage,
            'd' => Action::NextImage,
            'g' => Action::Export,
            's' => Action::NextUnlabeled,
            'r' => Action::RemoveLast,
            '1' => Action::CycleLabel,
            't' => Action::ToggleSize,
            'q' => Action::Quit,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

pub struct Session {
    input_dir: PathBuf,
    output_dir: PathBuf,
    store: AnnotationStore,
    cursor: Cursor,
    editor: MarkEditor,
    export: ExportTarget,
    pub options: DisplayOptions,
    status: Option<StatusMessage>,
}

impl Session {
    /// Builds the session from the command line: lists the images, reads the
    /// label file and restores the mode's snapshot.
    pub fn start(cli: &Cli) -> Result<Self> {
        let images = image_set::scan_directory(&cli.input)?;
        if images.is_empty() {
            return Err(MarkerError::NoImages(cli.input.clone()));
        }
        let catalog = LabelCatalog::load(&cli.labels)?;
        info!(
            "{} images, {} labels, {} mode",
            images.len(),
            catalog.len(),
            cli.mode
        );

        let store = AnnotationStore::load(&cli.input, &images, &catalog, cli.mode)?;
        Ok(Self::new(
            cli.input.clone(),
            cli.output.clone(),
            store,
            ExportTarget::select(cli.mode, cli.label_format),
            DisplayOptions::from_cli(cli),
        ))
    }

    pub fn new(
        input_dir: PathBuf,
        output_dir: PathBuf,
        store: AnnotationStore,
        export: ExportTarget,
        options: DisplayOptions,
    ) -> Self {
        let editor = MarkEditor::new(store.mode());
        Self {
            input_dir,
            output_dir,
            store,
            cursor: Cursor::default(),
            editor,
            export,
            options,
            status: None,
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn mode(&self) -> Mode {
        self.store.mode()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor.clamped(&self.store)
    }

    pub fn current_image(&self) -> Option<&Path> {
        self.store.image_path(self.cursor().image)
    }

    pub fn current_label(&self) -> &str {
        self.store.label(self.cursor().label).unwrap_or_default()
    }

    pub fn draft(&self) -> Option<Draft> {
        self.editor.draft()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    fn notify(&mut self, level: StatusLevel, text: String) {
        match level {
            StatusLevel::Info => info!("{text}"),
            StatusLevel::Warning => warn!("{text}"),
        }
        self.status = Some(StatusMessage { level, text });
    }

    /// Applies one keyboard command, then writes the snapshot.
    pub fn apply(&mut self, action: Action) -> Flow {
        debug!("Action {:?}", action);
        let cursor = self.cursor();
        match action {
            Action::PrevImage | Action::NextImage => {
                let delta = if action == Action::PrevImage { -1 } else { 1 };
                self.editor.cancel();
                self.cursor.image =
                    navigation::advance(cursor.image, delta, self.store.image_count());
            }
            Action::CycleLabel => {
                self.editor.cancel();
                self.cursor.label = navigation::cycle_label(cursor.label, self.store.label_count());
                self.notify(
                    StatusLevel::Info,
                    format!("Active label: {}", self.current_label()),
                );
            }
            Action::NextUnlabeled => {
                self.editor.cancel();
                match navigation::find_next_unlabeled(&self.store, cursor.label) {
                    NextUnlabeled::Found(image) => self.cursor.image = image,
                    NextUnlabeled::AllLabeled => {
                        let text = format!(
                            "All images have been labeled with {}.",
                            self.current_label()
                        );
                        self.notify(StatusLevel::Info, text);
                    }
                }
            }
            Action::RemoveLast => {
                if self.store.remove_last(cursor.image, cursor.label).is_none() {
                    let text = format!("There are no {} marks on this image", self.current_label());
                    self.notify(StatusLevel::Info, text);
                }
            }
            Action::Export => match self.export.export(&self.store, &self.output_dir) {
                Ok(summary) => self.notify(
                    StatusLevel::Info,
                    format!(
                        "Exported {} marks to {} files in {}",
                        summary.marks_exported,
                        summary.files_written,
                        self.output_dir.display()
                    ),
                ),
                Err(e) => self.notify(StatusLevel::Warning, format!("Export failed: {e}")),
            },
            Action::ToggleSize => {
                self.options.show_size = !self.options.show_size;
            }
            Action::Quit => {
                self.save();
                return Flow::Quit;
            }
        }
        self.save();
        Flow::Continue
    }

    /// Feeds one pointer event to the editor, storing and saving any finished mark.
    pub fn pointer(&mut self, event: PointerEvent) {
        let Some(mark) = self.editor.handle(event) else {
            return;
        };
        let cursor = self.cursor();
        debug!(
            "Committed {:?} on image {} label {}",
            mark, cursor.image, cursor.label
        );
        self.store.append(cursor.image, cursor.label, mark);
        self.save();
    }

    /// Writes the snapshot. Failures are reported and retried on the next save.
    pub fn save(&mut self) -> bool {
        match self.store.save(&self.input_dir) {
            Ok(()) => true,
            Err(e) => {
                self.notify(StatusLevel::Warning, format!("Could not save marks: {e}"));
                false
            }
        }
    }
}
