use serde::Serialize;

/// Structural change emitted to the rendering layer.
///
/// Positions are flat positions. Changes for one operation are queued in the
/// order a renderer must apply them: structural changes first, then any
/// `RangeChanged` for rows whose position shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    /// Everything changed; re-read the whole sequence
    FullReload,
    /// `len` rows were inserted starting at `start`
    InsertRange { start: usize, len: usize },
    /// The row at `pos` was removed
    RemoveAt { pos: usize },
    /// Rows `start..start + len` must be rebound
    RangeChanged { start: usize, len: usize },
    /// The row at `from` now sits at `to`
    MoveFlat { from: usize, to: usize },
}

/// FIFO of pending changes, drained by the owner after each operation
#[derive(Debug, Default)]
pub(crate) struct ChangeLog {
    pending: Vec<Change>,
}

impl ChangeLog {
    pub(crate) fn push(&mut self, change: Change) {
        tracing::trace!(?change, "queue change");
        self.pending.push(change);
    }

    pub(crate) fn drain(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Replay `changes` against a renderer-side copy of the rows.
///
/// `current` is the engine's sequence after the operation; inserted and
/// rebound rows are read from it. Returns `false` if a change does not fit
/// the copy (a position past its end), which would mean the engine emitted an
/// inconsistent stream.
pub fn replay<E: Clone>(rows: &mut Vec<E>, changes: &[Change], current: &[E]) -> bool {
    for change in changes {
        match *change {
            Change::FullReload => {
                *rows = current.to_vec();
            }
            Change::InsertRange { start, len } => {
                if start > rows.len() || start + len > current.len() {
                    return false;
                }
                let inserted = current[start..start + len].iter().cloned();
                rows.splice(start..start, inserted);
            }
            Change::RemoveAt { pos } => {
                if pos >= rows.len() {
                    return false;
                }
                rows.remove(pos);
            }
            Change::RangeChanged { start, len } => {
                if start + len > rows.len() || start + len > current.len() {
                    return false;
                }
                rows[start..start + len].clone_from_slice(&current[start..start + len]);
            }
            Change::MoveFlat { from, to } => {
                if from >= rows.len() || to >= rows.len() {
                    return false;
                }
                let row = rows.remove(from);
                rows.insert(to, row);
            }
        }
    }
    true
}
