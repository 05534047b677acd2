//! Undo/redo for face selection.
//!
//! Snapshots hold only the per-face `selected` flags, one vector per image. Face geometry
//! never changes after detection, so restoring flags is enough to restore a selection.

use crate::batch::ImageFaces;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

type Snapshot = Vec<Vec<bool>>;

/// Linear selection history with a cursor, like an editor's undo stack.
///
/// Call [`SelectionHistory::record`] after every selection change. Recording after an
/// undo discards the redo branch.
#[derive(Debug, Clone)]
pub struct SelectionHistory {
    snapshots: Vec<Snapshot>,
    index: usize,
    max_depth: usize,
}

impl SelectionHistory {
    /// Start a history whose first entry is the current selection.
    pub fn new(images: &[ImageFaces]) -> Self {
        Self::with_depth(images, DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_depth(images: &[ImageFaces], max_depth: usize) -> Self {
        Self {
            snapshots: vec![snapshot(images)],
            index: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// Push the current selection. Does nothing when it equals the current entry.
    pub fn record(&mut self, images: &[ImageFaces]) {
        let current = snapshot(images);
        if self.snapshots.get(self.index) == Some(&current) {
            return;
        }
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(current);
        if self.snapshots.len() > self.max_depth {
            let excess = self.snapshots.len() - self.max_depth;
            self.snapshots.drain(0..excess);
        }
        self.index = self.snapshots.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Step back one entry. Returns false when there is nothing to undo or the face lists
    /// no longer match the recorded shape.
    pub fn undo(&mut self, images: &mut [ImageFaces]) -> bool {
        if !self.can_undo() || !restore(images, &self.snapshots[self.index - 1]) {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn redo(&mut self, images: &mut [ImageFaces]) -> bool {
        if !self.can_redo() || !restore(images, &self.snapshots[self.index + 1]) {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

fn snapshot(images: &[ImageFaces]) -> Snapshot {
    images
        .iter()
        .map(|img| img.faces.iter().map(|f| f.is_selected()).collect())
        .collect()
}

fn restore(images: &mut [ImageFaces], snapshot: &Snapshot) -> bool {
    let shape_matches = images.len() == snapshot.len()
        && images
            .iter()
            .zip(snapshot)
            .all(|(img, flags)| img.faces.len() == flags.len());
    if !shape_matches {
        return false;
    }
    for (img, flags) in images.iter_mut().zip(snapshot) {
        for (face, &selected) in img.faces.iter_mut().zip(flags) {
            face.set_selected(selected);
        }
    }
    true
}
