//! Ordered frame sequence with bounded linear undo.
//!
//! Every mutation records a whole new generation of the sequence rather than
//! a diff. Generations are shared (`Arc`) so a reader holding a
//! [`FrameStore::snapshot`] keeps a consistent view while the store moves on.

use std::{collections::VecDeque, sync::Arc};

use pixmatrix_types::{
    config::DEFAULT_HISTORY_DEPTH,
    frame::{FrameBuffer, GridSize},
};
use tracing::{debug, warn};

/// One historical version of the full frame sequence.
pub type Generation = Arc<Vec<FrameBuffer>>;

#[derive(Debug, Clone)]
pub struct FrameStore {
    history: VecDeque<Generation>,
    size: GridSize,
    current: usize,
    depth: usize,
    selected: usize,
}

impl FrameStore {
    /// Store holding `first` as its only frame, with the default undo depth.
    pub fn new(first: FrameBuffer) -> Self {
        Self::with_depth(first, DEFAULT_HISTORY_DEPTH)
    }

    /// `depth` bounds the number of retained generations, current included.
    /// A depth of zero is treated as one. Every frame the store accepts later
    /// must have the same grid size as `first`.
    pub fn with_depth(first: FrameBuffer, depth: usize) -> Self {
        let depth = depth.max(1);
        let size = first.size();
        let mut history = VecDeque::with_capacity(depth);
        history.push_back(Arc::new(vec![first]));
        Self {
            history,
            size,
            current: 0,
            depth,
            selected: 0,
        }
    }

    /// Grid size shared by every frame in every generation.
    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn current(&self) -> &[FrameBuffer] {
        &self.history[self.current]
    }

    /// Shared handle to the current generation.
    pub fn snapshot(&self) -> Generation {
        Arc::clone(&self.history[self.current])
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    /// Always false: the sequence holds at least one frame.
    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    pub fn generation_index(&self) -> usize {
        self.current
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_frame(&self) -> &FrameBuffer {
        &self.current()[self.selected]
    }

    pub fn get(&self, index: usize) -> Option<&FrameBuffer> {
        self.current().get(index)
    }

    /// Select a frame, clamping to the last frame. Returns the new selection.
    pub fn select(&mut self, index: usize) -> usize {
        self.selected = index.min(self.len() - 1);
        self.selected
    }

    /// Record a new generation produced by `mutator` from the current one.
    ///
    /// Generations after the current pointer are discarded first, and the
    /// oldest generation is evicted once the window is full. An empty result,
    /// or one holding a frame of another grid size, is rejected and leaves the
    /// store untouched. Returns whether a generation was recorded.
    pub fn append<F>(&mut self, mutator: F) -> bool
    where
        F: FnOnce(&[FrameBuffer]) -> Vec<FrameBuffer>,
    {
        let next = mutator(self.current());
        if next.is_empty() {
            warn!("rejecting mutation that would leave the frame sequence empty");
            return false;
        }
        if let Some(frame) = next.iter().find(|frame| frame.size() != self.size) {
            warn!(
                expected = ?self.size,
                got = ?frame.size(),
                "rejecting frame with mismatched grid size"
            );
            return false;
        }

        self.history.truncate(self.current + 1);
        if self.history.len() >= self.depth {
            self.history.pop_front();
        }
        self.history.push_back(Arc::new(next));
        self.current = self.history.len() - 1;
        self.clamp_selection();
        debug!(
            generation = self.current,
            frames = self.len(),
            "recorded frame generation"
        );
        true
    }

    /// Step back one generation. Saturates at the oldest retained generation
    /// and returns whether the pointer moved.
    pub fn undo(&mut self) -> bool {
        if self.current == 0 {
            debug!("undo ignored at oldest retained generation");
            return false;
        }
        self.current -= 1;
        self.clamp_selection();
        debug!(generation = self.current, frames = self.len(), "undo");
        true
    }

    /// Insert `frame` right after `index` (clamped to the last frame) and
    /// select it.
    pub fn insert_after(&mut self, index: usize, frame: FrameBuffer) -> bool {
        let at = index.min(self.len() - 1) + 1;
        let inserted = self.append(|frames| {
            let mut next = frames.to_vec();
            next.insert(at, frame);
            next
        });
        if inserted {
            self.selected = at;
        }
        inserted
    }

    /// Append `frame` at the end of the sequence and select it.
    pub fn push(&mut self, frame: FrameBuffer) -> bool {
        let last = self.len() - 1;
        self.insert_after(last, frame)
    }

    /// Insert a copy of the frame at `index` right after it and select the copy.
    pub fn duplicate_at(&mut self, index: usize) -> bool {
        let Some(frame) = self.get(index).cloned() else {
            debug!(index, "duplicate ignored: index out of range");
            return false;
        };
        self.insert_after(index, frame)
    }

    /// Remove the frame at `index`. The last remaining frame is never removed.
    ///
    /// Deleting the selected frame selects its predecessor; deleting a frame
    /// before the selection shifts the selection so it stays on the same frame.
    pub fn delete_at(&mut self, index: usize) -> bool {
        let len = self.len();
        if len <= 1 {
            debug!("delete ignored: sequence must keep at least one frame");
            return false;
        }
        if index >= len {
            debug!(index, "delete ignored: index out of range");
            return false;
        }

        let selected = self.selected;
        let removed = self.append(|frames| {
            let mut next = frames.to_vec();
            next.remove(index);
            next
        });
        if removed {
            self.selected = if index <= selected {
                selected.saturating_sub(1)
            } else {
                selected
            };
            self.clamp_selection();
        }
        removed
    }

    /// Replace the frame at `index`. Out-of-range indices are ignored.
    pub fn replace_at(&mut self, index: usize, frame: FrameBuffer) -> bool {
        if index >= self.len() {
            debug!(index, "replace ignored: index out of range");
            return false;
        }
        self.append(|frames| {
            let mut next = frames.to_vec();
            next[index] = frame;
            next
        })
    }

    /// Replace the whole sequence, e.g. after a drag-and-drop reorder.
    pub fn reorder(&mut self, sequence: Vec<FrameBuffer>) -> bool {
        self.append(move |_| sequence)
    }

    /// Swap the frame at `index` with its predecessor.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.len() {
            return false;
        }
        self.swap_neighbours(index - 1)
    }

    /// Swap the frame at `index` with its successor.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.len() {
            return false;
        }
        self.swap_neighbours(index)
    }

    fn swap_neighbours(&mut self, first: usize) -> bool {
        let mut sequence = self.current().to_vec();
        sequence.swap(first, first + 1);
        let selected = self.selected;
        let swapped = self.reorder(sequence);
        if swapped {
            // Keep the selection on the frame that moved.
            if selected == first {
                self.selected = first + 1;
            } else if selected == first + 1 {
                self.selected = first;
            }
        }
        swapped
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmatrix_types::{color::Rgba, frame::GridSize};

    fn marker(value: u8) -> FrameBuffer {
        FrameBuffer::filled(GridSize::new(2, 2), Rgba::opaque(value, 0, 0))
    }

    fn markers(store: &FrameStore) -> Vec<u8> {
        store.current().iter().map(|f| f.pixel(0, 0).r).collect()
    }

    #[test]
    fn history_window_evicts_oldest() {
        let mut store = FrameStore::new(marker(0));
        for i in 1..=25u8 {
            assert!(store.push(marker(i)));
        }
        assert_eq!(store.history_len(), 20);
        assert_eq!(store.generation_index(), 19);

        while store.undo() {}
        assert_eq!(store.generation_index(), 0);
        // Oldest retained generation is the one produced by the 6th append.
        assert_eq!(markers(&store), vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(!store.undo());
        assert_eq!(store.generation_index(), 0);
    }

    #[test]
    fn append_after_undo_discards_future() {
        let mut store = FrameStore::new(marker(0));
        store.push(marker(1));
        store.push(marker(2));
        store.push(marker(3));
        assert_eq!(store.history_len(), 4);

        store.undo();
        store.undo();
        assert_eq!(markers(&store), vec![0, 1]);

        store.push(marker(9));
        assert_eq!(store.history_len(), 3);
        assert_eq!(store.generation_index(), 2);
        assert_eq!(markers(&store), vec![0, 1, 9]);
        store.undo();
        assert_eq!(markers(&store), vec![0, 1]);
    }

    #[test]
    fn configurable_depth() {
        let mut store = FrameStore::with_depth(marker(0), 3);
        for i in 1..=5u8 {
            store.push(marker(i));
        }
        assert_eq!(store.history_len(), 3);
        while store.undo() {}
        assert_eq!(markers(&store), vec![0, 1, 2, 3]);

        let mut single = FrameStore::with_depth(marker(0), 0);
        single.push(marker(1));
        assert_eq!(single.history_len(), 1);
        assert!(!single.undo());
        assert_eq!(markers(&single), vec![0, 1]);
    }

    #[test]
    fn deleting_last_frame_is_rejected() {
        let mut store = FrameStore::new(marker(0));
        assert!(!store.delete_at(0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.history_len(), 1);
    }

    #[test]
    fn empty_mutation_is_rejected() {
        let mut store = FrameStore::new(marker(0));
        assert!(!store.append(|_| Vec::new()));
        assert!(!store.reorder(Vec::new()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.history_len(), 1);
    }

    #[test]
    fn frames_of_another_size_are_rejected() {
        let mut store = FrameStore::new(marker(0));
        assert_eq!(store.size(), GridSize::new(2, 2));
        let wrong = FrameBuffer::black(GridSize::new(3, 3));

        assert!(!store.push(wrong.clone()));
        assert!(!store.replace_at(0, wrong.clone()));
        assert!(!store.reorder(vec![marker(1), wrong]));
        assert_eq!(store.history_len(), 1);
        assert_eq!(markers(&store), vec![0]);
        assert!(store.current().iter().all(|f| f.size() == store.size()));
    }

    #[test]
    fn out_of_range_indices_leave_history_alone() {
        let mut store = FrameStore::new(marker(0));
        store.push(marker(1));
        let history = store.history_len();

        assert!(!store.delete_at(7));
        assert!(!store.duplicate_at(7));
        assert!(!store.replace_at(7, marker(5)));
        assert!(!store.move_up(7));
        assert!(!store.move_down(1));
        assert_eq!(store.history_len(), history);

        assert!(store.insert_after(42, marker(8)));
        assert_eq!(markers(&store), vec![0, 1, 8]);
        assert_eq!(store.select(99), 2);
    }

    #[test]
    fn insert_duplicate_replace() {
        let mut store = FrameStore::new(marker(0));
        store.insert_after(0, marker(1));
        store.insert_after(0, marker(2));
        assert_eq!(markers(&store), vec![0, 2, 1]);
        assert_eq!(store.selected(), 1);

        store.duplicate_at(2);
        assert_eq!(markers(&store), vec![0, 2, 1, 1]);
        assert_eq!(store.selected(), 3);
        assert!(store.current()[3].shares_storage(&store.current()[2]));

        store.replace_at(0, marker(7));
        assert_eq!(markers(&store), vec![7, 2, 1, 1]);
    }

    #[test]
    fn delete_adjusts_selection() {
        let mut store = FrameStore::new(marker(0));
        for i in 1..=4u8 {
            store.push(marker(i));
        }
        store.select(3);

        // Deleting the selected frame selects its predecessor.
        store.delete_at(3);
        assert_eq!(markers(&store), vec![0, 1, 2, 4]);
        assert_eq!(store.selected(), 2);

        // Deleting before the selection keeps the same frame selected.
        store.delete_at(0);
        assert_eq!(markers(&store), vec![1, 2, 4]);
        assert_eq!(store.selected(), 1);
        assert_eq!(store.selected_frame().pixel(0, 0).r, 2);

        // Deleting after the selection leaves it alone.
        store.delete_at(2);
        assert_eq!(store.selected(), 1);

        store.select(0);
        store.delete_at(0);
        assert_eq!(store.selected(), 0);
        assert_eq!(markers(&store), vec![2]);
    }

    #[test]
    fn reorder_and_moves() {
        let mut store = FrameStore::new(marker(0));
        store.push(marker(1));
        store.push(marker(2));
        store.select(0);

        assert!(store.move_down(0));
        assert_eq!(markers(&store), vec![1, 0, 2]);
        assert_eq!(store.selected(), 1);

        assert!(store.move_up(2));
        assert_eq!(markers(&store), vec![1, 2, 0]);
        assert_eq!(store.selected(), 2);
        assert!(!store.move_up(0));

        store.reorder(vec![marker(5)]);
        assert_eq!(store.selected(), 0);
    }

    #[test]
    fn undo_reclamps_selection() {
        let mut store = FrameStore::new(marker(0));
        store.push(marker(1));
        store.push(marker(2));
        assert_eq!(store.selected(), 2);

        store.undo();
        assert_eq!(store.len(), 2);
        assert_eq!(store.selected(), 1);
    }

    #[test]
    fn snapshots_survive_mutation() {
        let mut store = FrameStore::new(marker(0));
        let before = store.snapshot();
        store.push(marker(1));
        store.delete_at(0);
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].pixel(0, 0).r, 0);
        assert_eq!(markers(&store), vec![1]);
    }
}
