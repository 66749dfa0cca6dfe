use std::collections::HashMap;

use egui::{Pos2, Rect};

/// Drawn rectangles in paint order, each pointing back at its entry.
#[derive(Clone, Debug, Default)]
pub struct HitMap {
    rects: Vec<(Rect, usize)>,
    slots: HashMap<[u32; 4], usize>,
}

fn rect_key(rect: &Rect) -> [u32; 4] {
    [
        rect.min.x.to_bits(),
        rect.min.y.to_bits(),
        rect.max.x.to_bits(),
        rect.max.y.to_bits(),
    ]
}

impl HitMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `rect` for entry `index`. An identical rectangle already in the
    /// map is repointed in place and keeps its paint position.
    pub fn insert(&mut self, rect: Rect, index: usize) {
        match self.slots.get(&rect_key(&rect)) {
            Some(&slot) => self.rects[slot].1 = index,
            None => {
                self.slots.insert(rect_key(&rect), self.rects.len());
                self.rects.push((rect, index));
            }
        }
    }

    /// Entry under `pos`. Edges count as inside; the first match wins.
    pub fn hit_test(&self, pos: Pos2) -> Option<usize> {
        self.rects
            .iter()
            .find(|(rect, _)| {
                pos.x >= rect.min.x && pos.x <= rect.max.x && pos.y >= rect.min.y && pos.y <= rect.max.y
            })
            .map(|(_, index)| *index)
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
        self.slots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rect, usize)> + '_ {
        self.rects.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;
    use rstest::rstest;

    fn map() -> HitMap {
        let mut map = HitMap::new();
        map.insert(Rect::from_min_size(pos2(0.0, 0.0), egui::vec2(100.0, 38.0)), 0);
        map.insert(Rect::from_min_size(pos2(10.0, 40.0), egui::vec2(20.0, 38.0)), 1);
        map.insert(Rect::from_min_size(pos2(50.0, 40.0), egui::vec2(30.0, 38.0)), 2);
        map
    }

    #[rstest]
    #[case(pos2(5.0, 5.0), Some(0))]
    #[case(pos2(100.0, 38.0), Some(0))]
    #[case(pos2(15.0, 50.0), Some(1))]
    #[case(pos2(80.0, 78.0), Some(2))]
    #[case(pos2(40.0, 50.0), None)]
    #[case(pos2(5.0, 39.0), None)]
    #[case(pos2(-1.0, 5.0), None)]
    fn hit_test_is_inclusive_and_exact(#[case] pos: Pos2, #[case] expected: Option<usize>) {
        assert_eq!(map().hit_test(pos), expected);
    }

    #[test]
    fn identical_rect_is_replaced_in_place() {
        let mut map = map();
        map.insert(Rect::from_min_size(pos2(0.0, 0.0), egui::vec2(100.0, 38.0)), 7);
        assert_eq!(map.len(), 3);
        assert_eq!(map.hit_test(pos2(1.0, 1.0)), Some(7));
        assert_eq!(map.iter().next().map(|(_, i)| i), Some(7));
    }

    #[test]
    fn overlapping_rects_resolve_to_first_drawn() {
        let mut map = HitMap::new();
        map.insert(Rect::from_min_max(pos2(0.0, 0.0), pos2(10.0, 10.0)), 3);
        map.insert(Rect::from_min_max(pos2(5.0, 0.0), pos2(15.0, 10.0)), 4);
        assert_eq!(map.hit_test(pos2(7.0, 5.0)), Some(3));
        assert_eq!(map.hit_test(pos2(12.0, 5.0)), Some(4));
    }
}
