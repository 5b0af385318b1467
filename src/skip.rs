//! Bookkeeping for skipping one complete CBOR item without a schema.
//!
//! Each container being skipped pushes a frame holding the number of child items
//! still to come, or an indefinite marker that only a break byte can remove. Once a
//! child is fully consumed the stack is [pruned](LengthStack::prune). The item is
//! skipped when the stack is empty again.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Finite(usize),
    Indefinite,
}

#[derive(Debug, Default)]
pub(crate) struct LengthStack {
    frames: Vec<Frame>,
}

impl LengthStack {
    pub fn new() -> Self {
        LengthStack::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push_indefinite(&mut self) {
        self.frames.push(Frame::Indefinite);
    }

    /// Pushes a container with `count` child items. Empty containers are complete
    /// as soon as their header is read, so they prune instead.
    pub fn push_finite(&mut self, count: usize) {
        if count > 0 {
            self.frames.push(Frame::Finite(count));
        } else {
            self.prune();
        }
    }

    /// Handles a break byte: the top frame must be indefinite. Returns `false` on a
    /// break that does not close an indefinite container.
    pub fn close_indefinite(&mut self) -> bool {
        if self.frames.last() != Some(&Frame::Indefinite) {
            return false;
        }
        self.frames.pop();
        self.prune();
        true
    }

    /// Records that one child item was consumed.
    ///
    /// Finite frames counting down to their last child are removed and the
    /// completion cascades to the parent; an indefinite frame stops the cascade.
    /// For example, pruning `[3, 2, 1, 1]` gives `[3, 1]`.
    pub fn prune(&mut self) {
        while let Some(top) = self.frames.last_mut() {
            match top {
                Frame::Indefinite => break,
                Frame::Finite(1) => {
                    self.frames.pop();
                }
                Frame::Finite(n) => {
                    *n -= 1;
                    break;
                }
            }
        }
    }

    #[cfg(test)]
    fn finite_counts(&self) -> Vec<Option<usize>> {
        self.frames
            .iter()
            .map(|f| match f {
                Frame::Finite(n) => Some(*n),
                Frame::Indefinite => None,
            })
            .collect()
    }
}
