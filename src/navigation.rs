//! Image and label cursor arithmetic.

use crate::store::AnnotationStore;

/// Moves `index` by `delta`, wrapping around both ends of `0..count`.
pub fn advance(index: usize, delta: isize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    (index as isize + delta).rem_euclid(count as isize) as usize
}

pub fn cycle_label(index: usize, label_count: usize) -> usize {
    advance(index, 1, label_count)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextUnlabeled {
    Found(usize),
    AllLabeled,
}

/// First image, in store order, with no marks for `label`.
pub fn find_next_unlabeled(store: &AnnotationStore, label: usize) -> NextUnlabeled {
    (0..store.image_count())
        .find(|&image| !store.is_labeled(image, label))
        .map_or(NextUnlabeled::AllLabeled, NextUnlabeled::Found)
}

/// Current image and label. Indices are re-wrapped against the store on every use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub image: usize,
    pub label: usize,
}

impl Cursor {
    pub fn clamped(self, store: &AnnotationStore) -> Self {
        Self {
            image: advance(self.image, 0, store.image_count()),
            label: advance(self.label, 0, store.label_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::labels::LabelCatalog;
    use crate::store::{Mark, Point};
    use std::path::PathBuf;

    fn store(images: usize) -> AnnotationStore {
        let paths: Vec<PathBuf> = (0..images).map(|i| PathBuf::from(format!("{i}.png"))).collect();
        let catalog: LabelCatalog = ["L0", "L1", "L2"].into_iter().collect();
        AnnotationStore::new(Mode::Detection, &paths, &catalog)
    }

    fn tick() -> Mark {
        Mark::from_corners(Point::new(0, 0), Point::new(1, 1))
    }

    #[test]
    fn advance_wraps_in_both_directions() {
        assert_eq!(advance(0, 1, 3), 1);
        assert_eq!(advance(2, 1, 3), 0);
        assert_eq!(advance(0, -1, 3), 2);
        assert_eq!(advance(1, -4, 3), 0);
        assert_eq!(advance(5, 0, 0), 0);
    }

    #[test]
    fn cycle_label_wraps_to_zero() {
        assert_eq!(cycle_label(0, 3), 1);
        assert_eq!(cycle_label(2, 3), 0);
    }

    #[test]
    fn finds_first_image_missing_the_label() {
        let mut store = store(3);
        store.append(0, 1, tick());
        store.append(2, 0, tick());
        assert_eq!(find_next_unlabeled(&store, 1), NextUnlabeled::Found(1));
        assert_eq!(find_next_unlabeled(&store, 0), NextUnlabeled::Found(1));
        assert_eq!(find_next_unlabeled(&store, 2), NextUnlabeled::Found(0));
    }

    #[test]
    fn reports_when_every_image_is_labeled() {
        let mut store = store(2);
        store.append(0, 0, tick());
        store.append(1, 0, tick());
        assert_eq!(find_next_unlabeled(&store, 0), NextUnlabeled::AllLabeled);
    }

    #[test]
    fn cursor_clamps_by_wrapping() {
        let store = store(2);
        let cursor = Cursor { image: 3, label: 4 }.clamped(&store);
        assert_eq!(cursor, Cursor { image: 1, label: 1 });
    }
}
