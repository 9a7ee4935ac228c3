use core::ops::Range;

/// Fixed-capacity byte vector with in-place splicing
///
/// Every mutation either completes or leaves the bytes untouched, so callers
/// can treat `insert_at` and `remove_range` as atomic edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteBuffer<const N: usize> {
    bytes: heapless::Vec<u8, N>,
}

impl<const N: usize> ByteBuffer<N> {
    pub const fn new() -> Self {
        Self {
            bytes: heapless::Vec::new(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes still available before the buffer is full
    pub fn remaining(&self) -> usize {
        N - self.bytes.len()
    }

    /// Replace the whole content, refusing sources larger than `N`
    pub fn replace(&mut self, src: &[u8]) -> bool {
        if src.len() > N {
            return false;
        }
        self.bytes.clear();
        self.bytes.extend_from_slice(src).is_ok()
    }

    /// Insert `src` at `pos`, shifting the tail to the right
    pub fn insert_at(&mut self, pos: usize, src: &[u8]) -> bool {
        let old_len = self.bytes.len();
        if pos > old_len || src.len() > self.remaining() {
            return false;
        }
        if self.bytes.resize(old_len + src.len(), 0).is_err() {
            return false;
        }
        self.bytes.copy_within(pos..old_len, pos + src.len());
        self.bytes[pos..pos + src.len()].copy_from_slice(src);
        true
    }

    /// Remove `range`, shifting the tail to the left
    pub fn remove_range(&mut self, range: Range<usize>) -> bool {
        let old_len = self.bytes.len();
        if range.start > range.end || range.end > old_len {
            return false;
        }
        let removed = range.end - range.start;
        self.bytes.copy_within(range.end..old_len, range.start);
        self.bytes.truncate(old_len - removed);
        true
    }

    /// Replace `range` with `src`, growing or shrinking as needed
    pub fn splice(&mut self, range: Range<usize>, src: &[u8]) -> bool {
        let old_len = self.bytes.len();
        if range.start > range.end || range.end > old_len {
            return false;
        }
        let removed = range.end - range.start;
        if old_len - removed + src.len() > N {
            return false;
        }
        if src.len() > removed {
            let grow = src.len() - removed;
            if self.bytes.resize(old_len + grow, 0).is_err() {
                return false;
            }
            self.bytes.copy_within(range.end..old_len, range.end + grow);
        } else {
            let shrink = removed - src.len();
            self.bytes.copy_within(range.end..old_len, range.end - shrink);
            self.bytes.truncate(old_len - shrink);
        }
        self.bytes[range.start..range.start + src.len()].copy_from_slice(src);
        true
    }
}

impl<const N: usize> core::ops::Deref for ByteBuffer<N> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}
