use crate::config::DisplayOptions;
use crate::editor::{Draft, PointerButton, PointerEvent};
use crate::session::{Action, Flow, Session, StatusLevel};
use crate::store::{Mark, Point};
use eframe::egui;
use log::{debug, warn};
use std::path::PathBuf;

const ACTIVE_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 255, 0);
const INACTIVE_COLOR: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);
const DRAFT_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 200, 0);
const WARN_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 0, 0);

/// Boxes smaller or larger than this per side get a red size label.
const GOOD_BOX_SIDE: std::ops::RangeInclusive<u32> = 50..=400;

// ── Frame ───────────────────────────────────────────────────────────────────

struct LoadedFrame {
    path: PathBuf,
    image: Result<(egui::TextureHandle, (f32, f32)), String>,
}

fn load_frame(ctx: &egui::Context, path: PathBuf) -> LoadedFrame {
    let image = match image::open(&path) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let pixels = rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            let texture = ctx.load_texture("frame", color_image, egui::TextureOptions::LINEAR);
            debug!("Showing {}", path.display());
            Ok((texture, (size[0] as f32, size[1] as f32)))
        }
        Err(e) => {
            warn!("Cannot read image {}: {}", path.display(), e);
            Err(format!("Cannot read image {}: {}", path.display(), e))
        }
    };
    LoadedFrame { path, image }
}

pub fn size_in_range(options: &DisplayOptions, w: u32, h: u32) -> bool {
    options.size_warn && GOOD_BOX_SIDE.contains(&w) && GOOD_BOX_SIDE.contains(&h)
}

fn key_to_char(key: egui::Key) -> Option<char> {
    Some(match key {
        egui::Key::A => 'a',
        egui::Key::D => 'd',
        egui::Key::G => 'g',
        egui::Key::S => 's',
        egui::Key::R => 'r',
        egui::Key::T => 't',
        egui::Key::Q => 'q',
        egui::Key::Num1 => '1',
        _ => return None,
    })
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct MarkerApp {
    session: Session,
    frame: Option<LoadedFrame>,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,
}

impl MarkerApp {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            frame: None,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
        }
    }

    fn ensure_frame(&mut self, ctx: &egui::Context) {
        let Some(path) = self.session.current_image() else {
            self.frame = None;
            return;
        };
        if self.frame.as_ref().is_some_and(|f| f.path == path) {
            return;
        }
        self.frame = Some(load_frame(ctx, path.to_path_buf()));
    }

    fn image_size(&self) -> Option<(f32, f32)> {
        match &self.frame {
            Some(LoadedFrame {
                image: Ok((_, size)),
                ..
            }) => Some(*size),
            _ => None,
        }
    }

    /// Convert image-space coords to screen-space
    fn image_to_screen(&self, canvas_rect: egui::Rect, size: (f32, f32), p: Point) -> egui::Pos2 {
        let center = canvas_rect.center();
        center
            + self.pan
            + (egui::vec2(p.x as f32, p.y as f32) - egui::vec2(size.0, size.1) * 0.5) * self.zoom
    }

    /// Convert screen-space coords to image pixel coords
    fn screen_to_image(&self, canvas_rect: egui::Rect, size: (f32, f32), pos: egui::Pos2) -> Point {
        let rel = pos - canvas_rect.center() - self.pan;
        Point::new(
            (rel.x / self.zoom + size.0 * 0.5).floor() as i32,
            (rel.y / self.zoom + size.1 * 0.5).floor() as i32,
        )
    }

    fn draw_box(
        &self,
        painter: &egui::Painter,
        canvas_rect: egui::Rect,
        size: (f32, f32),
        (a, b): (Point, Point),
        color: egui::Color32,
    ) {
        let s_a = self.image_to_screen(canvas_rect, size, a);
        let s_b = self.image_to_screen(canvas_rect, size, b);
        let s_ab = self.image_to_screen(canvas_rect, size, Point::new(a.x, b.y));
        let s_ba = self.image_to_screen(canvas_rect, size, Point::new(b.x, a.y));
        let cross = egui::Stroke::new(1.0, egui::Color32::BLACK);
        painter.line_segment([s_a, s_b], cross);
        painter.line_segment([s_ab, s_ba], cross);
        painter.rect_stroke(
            egui::Rect::from_two_pos(s_a, s_b),
            0.0,
            egui::Stroke::new(2.0, color),
            egui::StrokeKind::Middle,
        );

        let options = &self.session.options;
        if options.show_size {
            let (w, h) = (a.x.abs_diff(b.x), a.y.abs_diff(b.y));
            let text_color = if size_in_range(options, w, h) {
                ACTIVE_COLOR
            } else {
                WARN_COLOR
            };
            painter.text(
                s_b,
                egui::Align2::LEFT_TOP,
                format!("[{w},{h}]"),
                egui::FontId::proportional(14.0),
                text_color,
            );
        }
    }

    fn draw_marks(&self, painter: &egui::Painter, canvas_rect: egui::Rect, size: (f32, f32)) {
        let store = self.session.store();
        let cursor = self.session.cursor();
        for label in 0..store.label_count() {
            let color = if label == cursor.label {
                ACTIVE_COLOR
            } else {
                INACTIVE_COLOR
            };
            for mark in store.marks(cursor.image, label) {
                match mark {
                    Mark::Box { x1, y1, x2, y2 } => self.draw_box(
                        painter,
                        canvas_rect,
                        size,
                        (Point::new(*x1, *y1), Point::new(*x2, *y2)),
                        color,
                    ),
                    Mark::Polygon { points } => {
                        let screen: Vec<egui::Pos2> = points
                            .iter()
                            .map(|p| self.image_to_screen(canvas_rect, size, *p))
                            .collect();
                        painter.add(egui::Shape::closed_line(
                            screen,
                            egui::Stroke::new(2.0, color),
                        ));
                    }
                }
            }
        }
    }

    fn draw_draft(&self, painter: &egui::Painter, canvas_rect: egui::Rect, size: (f32, f32)) {
        match self.session.draft() {
            Some(Draft::Box { from, to }) => {
                self.draw_box(painter, canvas_rect, size, (from, to), DRAFT_COLOR)
            }
            Some(Draft::Polyline { points, cursor }) => {
                let screen: Vec<egui::Pos2> = points
                    .iter()
                    .chain(cursor.iter())
                    .map(|p| self.image_to_screen(canvas_rect, size, *p))
                    .collect();
                for p in points.iter() {
                    painter.circle_filled(
                        self.image_to_screen(canvas_rect, size, *p),
                        3.0,
                        DRAFT_COLOR,
                    );
                }
                painter.add(egui::Shape::line(screen, egui::Stroke::new(1.5, DRAFT_COLOR)));
            }
            None => {}
        }
    }

    /// Forwards canvas pointer events to the session. Nothing gets through while
    /// no frame is shown; during a pan only releases do, so a drag still ends.
    fn dispatch_pointer(&mut self, events: &[egui::Event], canvas_rect: egui::Rect) {
        let Some(size) = self.image_size() else {
            return;
        };
        for event in events {
            let pointer = match event {
                egui::Event::PointerMoved(pos) => PointerEvent::Move {
                    pos: self.screen_to_image(canvas_rect, size, *pos),
                },
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    ..
                } => {
                    let button = match button {
                        egui::PointerButton::Primary => PointerButton::Primary,
                        egui::PointerButton::Secondary => PointerButton::Secondary,
                        _ => continue,
                    };
                    let pos_img = self.screen_to_image(canvas_rect, size, *pos);
                    if *pressed {
                        if !canvas_rect.contains(*pos) {
                            continue;
                        }
                        PointerEvent::Down {
                            pos: pos_img,
                            button,
                        }
                    } else {
                        PointerEvent::Up {
                            pos: pos_img,
                            button,
                        }
                    }
                }
                _ => continue,
            };
            if self.panning && !matches!(pointer, PointerEvent::Up { .. }) {
                continue;
            }
            self.session.pointer(pointer);
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let keys: Vec<egui::Key> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|e| match e {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        repeat: false,
                        ..
                    } => Some(*key),
                    _ => None,
                })
                .collect()
        });

        for key in keys {
            let Some(action) = key_to_char(key).and_then(Action::from_key) else {
                continue;
            };
            if self.session.apply(action) == Flow::Quit {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for MarkerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.session.save();
        }

        self.handle_keys(ctx);
        self.ensure_frame(ctx);

        // Header
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            let store = self.session.store();
            let cursor = self.session.cursor();
            ui.horizontal(|ui| {
                ui.label(format!("Mode: {}", self.session.mode()));
                ui.separator();
                ui.label(format!(
                    "Image {}/{}: {}",
                    cursor.image + 1,
                    store.image_count(),
                    self.session
                        .current_image()
                        .and_then(|p| p.file_name())
                        .unwrap_or_default()
                        .to_string_lossy()
                ));
                ui.separator();
                ui.colored_label(
                    ACTIVE_COLOR,
                    format!("Label: {}", self.session.current_label()),
                );
                ui.label(format!(
                    "({} marks)",
                    store.marks(cursor.image, cursor.label).len()
                ));
                ui.separator();
                ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("a/d: prev/next  s: next unlabeled  1: label  r: undo  g: export  t: sizes  q: quit");
                if self.session.mode() == crate::config::Mode::Segmentation {
                    ui.separator();
                    ui.label(if self.session.draft().is_some() {
                        "right-click closes the polygon"
                    } else {
                        "click to place polygon points"
                    });
                }
            });
            if let Some(status) = self.session.status() {
                let color = match status.level {
                    StatusLevel::Info => ui.visuals().text_color(),
                    StatusLevel::Warning => WARN_COLOR,
                };
                ui.colored_label(color, &status.text);
            }
        });

        // Canvas
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            // Draw background
            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            let Some(size) = self.image_size() else {
                if let Some(LoadedFrame { image: Err(msg), .. }) = &self.frame {
                    painter.text(
                        canvas_rect.center(),
                        egui::Align2::CENTER_CENTER,
                        msg,
                        egui::FontId::proportional(16.0),
                        WARN_COLOR,
                    );
                }
                return;
            };

            if let Some(LoadedFrame {
                image: Ok((tex, _)),
                ..
            }) = &self.frame
            {
                let img_rect = egui::Rect::from_min_max(
                    self.image_to_screen(canvas_rect, size, Point::new(0, 0)),
                    self.image_to_screen(
                        canvas_rect,
                        size,
                        Point::new(size.0 as i32, size.1 as i32),
                    ),
                );
                painter.image(
                    tex.id(),
                    img_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }

            self.draw_marks(&painter, canvas_rect, size);
            self.draw_draft(&painter, canvas_rect, size);

            // Handle pan (middle mouse button)
            let middle_down = ctx.input(|i| i.pointer.middle_down());
            if middle_down {
                let delta = ctx.input(|i| i.pointer.delta());
                self.pan += delta;
                self.panning = true;
            } else {
                self.panning = false;
            }

            // Handle zoom (scroll wheel)
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let center = canvas_rect.center();
                    let cursor_rel = cursor - center - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }

            let events = ctx.input(|i| i.events.clone());
            self.dispatch_pointer(&events, canvas_rect);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::export::ExportTarget;
    use crate::labels::LabelCatalog;
    use crate::store::AnnotationStore;
    use std::path::Path;

    fn app_for(dir: &Path, image: &Path) -> MarkerApp {
        let catalog: LabelCatalog = ["car"].into_iter().collect();
        let store = AnnotationStore::new(Mode::Detection, &[image.to_path_buf()], &catalog);
        let session = Session::new(
            dir.to_path_buf(),
            dir.join("out"),
            store,
            ExportTarget::KittiText,
            DisplayOptions::default(),
        );
        MarkerApp::new(session)
    }

    fn button(x: f32, y: f32, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos: egui::pos2(x, y),
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    fn canvas() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 100.0))
    }

    #[test]
    fn unreadable_image_reports_its_path() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("broken.png");
        std::fs::write(&path, b"not an image").expect("write file");

        let frame = load_frame(&egui::Context::default(), path.clone());
        let Err(msg) = &frame.image else {
            panic!("expected a decode error");
        };
        assert!(msg.contains(&path.display().to_string()));
    }

    #[test]
    fn pointer_input_is_ignored_without_a_frame() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("broken.png");
        std::fs::write(&path, b"not an image").expect("write file");

        let mut app = app_for(temp.path(), &path);
        app.frame = Some(load_frame(&egui::Context::default(), path));
        assert_eq!(app.image_size(), None);

        app.dispatch_pointer(&[button(50.0, 50.0, true)], canvas());
        assert_eq!(app.session.draft(), None);
        app.dispatch_pointer(&[button(60.0, 60.0, false)], canvas());
        assert_eq!(app.session.store().mark_count(), 0);
    }

    #[test]
    fn releasing_during_a_pan_finishes_the_drag() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("a.png");
        image::RgbImage::new(4, 4).save(&path).expect("write image");

        let mut app = app_for(temp.path(), &path);
        app.frame = Some(load_frame(&egui::Context::default(), path));
        assert_eq!(app.image_size(), Some((4.0, 4.0)));

        app.dispatch_pointer(&[button(50.0, 50.0, true)], canvas());
        assert!(app.session.draft().is_some());

        app.panning = true;
        app.dispatch_pointer(
            &[egui::Event::PointerMoved(egui::pos2(70.0, 70.0)), button(52.0, 52.0, false)],
            canvas(),
        );
        assert_eq!(app.session.draft(), None);
        assert_eq!(
            app.session.store().marks(0, 0),
            [Mark::from_corners(Point::new(2, 2), Point::new(4, 4))]
        );
    }

    #[test]
    fn size_label_is_green_only_inside_the_range() {
        let options = DisplayOptions::default();
        assert!(size_in_range(&options, 50, 400));
        assert!(!size_in_range(&options, 49, 100));
        assert!(!size_in_range(&options, 100, 401));

        let no_warn = DisplayOptions {
            size_warn: false,
            ..options
        };
        assert!(!size_in_range(&no_warn, 100, 100));
    }

    #[test]
    fn only_bound_keys_map_to_actions() {
        assert_eq!(
            key_to_char(egui::Key::Num1).and_then(Action::from_key),
            Some(Action::CycleLabel)
        );
        assert_eq!(key_to_char(egui::Key::Z), None);
    }
}
