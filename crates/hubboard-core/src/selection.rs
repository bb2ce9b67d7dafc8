use serde::Serialize;
use tracing::trace;

/// The highlighted entry shared by the progress list and the timeline.
///
/// One coordinator owns it and hands references to every view that needs to
/// agree on which item is current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    index: usize,
    len: usize,
}

impl Selection {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rotates forward by `step`, wrapping to the start once the next page
    /// would begin past the end.
    pub fn advance(&mut self, step: usize) -> usize {
        let step = step.max(1);
        self.index = if self.index + step >= self.len {
            0
        } else {
            self.index + step
        };
        trace!(index = self.index, len = self.len, "advanced selection");
        self.index
    }

    pub fn select(&mut self, index: usize) -> usize {
        self.index = index.min(self.len.saturating_sub(1));
        self.index
    }

    pub fn is_highlighted(&self, id: usize) -> bool {
        !self.is_empty() && self.index == id
    }

    pub fn page<'a, T>(&self, items: &'a [T], size: usize) -> &'a [T] {
        let start = self.index.min(items.len());
        let end = start.saturating_add(size.max(1)).min(items.len());
        &items[start..end]
    }

    pub fn page_count(&self, size: usize) -> usize {
        self.len.div_ceil(size.max(1))
    }

    pub fn current_page(&self, size: usize) -> usize {
        self.index / size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::Selection;

    #[test]
    fn advance_wraps_single_steps() {
        let mut sel = Selection::new(3);
        assert_eq!(sel.advance(1), 1);
        assert_eq!(sel.advance(1), 2);
        assert_eq!(sel.advance(1), 0);
    }

    #[test]
    fn advance_by_pages_restarts_when_next_page_is_past_the_end() {
        let mut sel = Selection::new(5);
        assert_eq!(sel.advance(2), 2);
        assert_eq!(sel.advance(2), 4);
        assert_eq!(sel.advance(2), 0);

        let mut even = Selection::new(4);
        assert_eq!(even.advance(2), 2);
        assert_eq!(even.advance(2), 0);
    }

    #[test]
    fn empty_selection_stays_put() {
        let mut sel = Selection::new(0);
        assert_eq!(sel.advance(1), 0);
        assert_eq!(sel.select(7), 0);
        assert!(!sel.is_highlighted(0));
        assert_eq!(sel.page_count(2), 0);
        let items: [u8; 0] = [];
        assert!(sel.page(&items, 2).is_empty());
    }

    #[test]
    fn pages_and_highlight() {
        let ideas = ["a", "b", "c", "d", "e"];
        let mut sel = Selection::new(ideas.len());
        assert_eq!(sel.page(&ideas, 2), &["a", "b"]);
        sel.advance(2);
        sel.advance(2);
        assert_eq!(sel.page(&ideas, 2), &["e"]);
        assert_eq!(sel.page_count(2), 3);
        assert_eq!(sel.current_page(2), 2);
        assert!(sel.is_highlighted(4));
        assert!(!sel.is_highlighted(3));
    }

    #[test]
    fn select_clamps_into_range() {
        let mut sel = Selection::new(4);
        assert_eq!(sel.select(9), 3);
        assert_eq!(sel.select(1), 1);
        assert_eq!(sel.len(), 4);

        let mut empty = Selection::new(0);
        assert_eq!(empty.select(3), 0);
        assert!(!empty.is_highlighted(0));
    }
}
