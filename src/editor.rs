//! Pointer state machines that turn raw pointer events into finished marks.
//!
//! The editor never touches the store: it only decides when a mark is done and
//! hands it back to the caller. Which machine runs is chosen once from the
//! session [`Mode`].

use crate::config::Mode;
use crate::store::{Mark, Point};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Pointer input in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    Down { pos: Point, button: PointerButton },
    Move { pos: Point },
    Up { pos: Point, button: PointerButton },
}

/// Ephemeral shape to draw on top of the frame while a mark is in progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Draft {
    Box { from: Point, to: Point },
    /// Points placed so far plus the live cursor position, if known.
    Polyline { points: Vec<Point>, cursor: Option<Point> },
}

// ── Detection ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BoxDrag {
    #[default]
    Idle,
    Dragging { start: Point, current: Point },
}

impl BoxDrag {
    fn handle(&mut self, event: PointerEvent) -> Option<Mark> {
        match (self.clone(), event) {
            (
                _,
                PointerEvent::Down {
                    pos,
                    button: PointerButton::Primary,
                },
            ) => {
                *self = BoxDrag::Dragging {
                    start: pos,
                    current: pos,
                };
                None
            }
            (BoxDrag::Dragging { start, .. }, PointerEvent::Move { pos }) => {
                *self = BoxDrag::Dragging {
                    start,
                    current: pos,
                };
                None
            }
            (
                BoxDrag::Dragging { start, .. },
                PointerEvent::Up {
                    pos,
                    button: PointerButton::Primary,
                },
            ) => {
                *self = BoxDrag::Idle;
                Some(Mark::from_corners(start, pos))
            }
            _ => None,
        }
    }

    fn draft(&self) -> Option<Draft> {
        match *self {
            BoxDrag::Idle => None,
            BoxDrag::Dragging { start, current } => Some(Draft::Box {
                from: start,
                to: current,
            }),
        }
    }
}

// ── Segmentation ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolygonCollector {
    points: Vec<Point>,
    cursor: Option<Point>,
}

impl PolygonCollector {
    pub const MIN_POINTS: usize = 3;

    fn handle(&mut self, event: PointerEvent) -> Option<Mark> {
        match event {
            PointerEvent::Down {
                pos,
                button: PointerButton::Primary,
            } => {
                self.points.push(pos);
                self.cursor = Some(pos);
                None
            }
            PointerEvent::Down {
                button: PointerButton::Secondary,
                ..
            } => {
                if self.points.len() < Self::MIN_POINTS {
                    return None;
                }
                let mut points = std::mem::take(&mut self.points);
                points.push(points[0]);
                Some(Mark::Polygon { points })
            }
            PointerEvent::Move { pos } => {
                self.cursor = Some(pos);
                None
            }
            PointerEvent::Up { .. } => None,
        }
    }

    fn draft(&self) -> Option<Draft> {
        if self.points.is_empty() {
            return None;
        }
        Some(Draft::Polyline {
            points: self.points.clone(),
            cursor: self.cursor,
        })
    }
}

// ── Editor ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkEditor {
    Detection(BoxDrag),
    Segmentation(PolygonCollector),
}

impl MarkEditor {
    pub fn new(mode: Mode) -> Self {
        match mode {
            Mode::Detection => MarkEditor::Detection(BoxDrag::default()),
            Mode::Segmentation => MarkEditor::Segmentation(PolygonCollector::default()),
        }
    }

    /// Feeds one event; returns the mark it finished, if any.
    pub fn handle(&mut self, event: PointerEvent) -> Option<Mark> {
        match self {
            MarkEditor::Detection(drag) => drag.handle(event),
            MarkEditor::Segmentation(poly) => poly.handle(event),
        }
    }

    pub fn draft(&self) -> Option<Draft> {
        match self {
            MarkEditor::Detection(drag) => drag.draft(),
            MarkEditor::Segmentation(poly) => poly.draft(),
        }
    }

    /// Drops any in-progress mark. Called whenever the active image or label changes.
    pub fn cancel(&mut self) {
        match self {
            MarkEditor::Detection(drag) => *drag = BoxDrag::Idle,
            MarkEditor::Segmentation(poly) => *poly = PolygonCollector::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Down {
            pos: Point::new(x, y),
            button: PointerButton::Primary,
        }
    }

    fn right(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Down {
            pos: Point::new(x, y),
            button: PointerButton::Secondary,
        }
    }

    fn up(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Up {
            pos: Point::new(x, y),
            button: PointerButton::Primary,
        }
    }

    fn moved(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Move {
            pos: Point::new(x, y),
        }
    }

    #[test]
    fn drag_produces_a_box_from_press_to_release() {
        let mut editor = MarkEditor::new(Mode::Detection);
        assert_eq!(editor.handle(down(30, 40)), None);
        assert_eq!(editor.handle(moved(20, 25)), None);
        assert_eq!(
            editor.draft(),
            Some(Draft::Box {
                from: Point::new(30, 40),
                to: Point::new(20, 25)
            })
        );
        assert_eq!(
            editor.handle(up(10, 12)),
            Some(Mark::Box {
                x1: 30,
                y1: 40,
                x2: 10,
                y2: 12
            })
        );
        assert_eq!(editor.draft(), None);
    }

    #[test]
    fn zero_size_boxes_are_accepted() {
        let mut editor = MarkEditor::new(Mode::Detection);
        editor.handle(down(5, 5));
        assert_eq!(
            editor.handle(up(5, 5)),
            Some(Mark::Box {
                x1: 5,
                y1: 5,
                x2: 5,
                y2: 5
            })
        );
    }

    #[test]
    fn moves_and_releases_without_a_press_do_nothing() {
        let mut editor = MarkEditor::new(Mode::Detection);
        assert_eq!(editor.handle(moved(1, 1)), None);
        assert_eq!(editor.handle(up(2, 2)), None);
        assert_eq!(editor.draft(), None);
    }

    #[test]
    fn polygon_needs_three_points_to_commit() {
        let mut editor = MarkEditor::new(Mode::Segmentation);
        editor.handle(down(0, 0));
        editor.handle(down(10, 0));
        assert_eq!(editor.handle(right(0, 0)), None);
        assert!(editor.draft().is_some());

        editor.handle(down(5, 10));
        let Some(Mark::Polygon { points }) = editor.handle(right(99, 99)) else {
            panic!("expected a polygon");
        };
        assert_eq!(
            points,
            vec![
                Point::new(0, 0),
                Point::new(10, 0),
                Point::new(5, 10),
                Point::new(0, 0)
            ]
        );
        assert_eq!(points.first(), points.last());
        assert_eq!(editor.draft(), None);
    }

    #[test]
    fn polyline_draft_follows_the_cursor() {
        let mut editor = MarkEditor::new(Mode::Segmentation);
        assert_eq!(editor.draft(), None);
        editor.handle(down(1, 1));
        editor.handle(moved(4, 4));
        assert_eq!(
            editor.draft(),
            Some(Draft::Polyline {
                points: vec![Point::new(1, 1)],
                cursor: Some(Point::new(4, 4))
            })
        );
    }

    #[test]
    fn cancel_discards_partial_marks() {
        let mut editor = MarkEditor::new(Mode::Segmentation);
        for (x, y) in [(0, 0), (10, 0), (5, 10)] {
            editor.handle(down(x, y));
        }
        editor.cancel();
        assert_eq!(editor.handle(right(0, 0)), None);

        let mut editor = MarkEditor::new(Mode::Detection);
        editor.handle(down(0, 0));
        editor.cancel();
        assert_eq!(editor.handle(up(3, 3)), None);
    }
}
