#![no_std]
#![forbid(unsafe_code)]

//! # Serio Ring
//!
//! Fixed-capacity circular byte buffer with zero-copy segment access.
//!
//! `ByteRing` is the exchange buffer between a hardware driver moving bytes
//! in interrupt context and the blocking reader/writer threads of a serial
//! device. Besides the usual bulk `push_back`/`pop_front` copies it exposes
//! the longest contiguous occupied/free run as a slice, so a DMA-style
//! transfer can move bytes directly into or out of the storage and commit
//! them afterwards with `advance_back`/`advance_front`.
//!
//! The ring performs no locking itself. Callers serialize access, which
//! keeps it usable from both thread and interrupt context under an
//! externally supplied critical section.

use core::cmp::min;

/// Circular byte buffer over caller-owned storage.
///
/// Two occupancy thresholds, the high and low watermark, gate admission and
/// wakeup decisions of the owning device. They never affect correctness of
/// the FIFO itself.
pub struct ByteRing<'a> {
    storage: &'a mut [u8],
    /// Read cursor.
    front: usize,
    /// Write cursor.
    back: usize,
    occupied: usize,
    high_mark: usize,
    low_mark: usize,
}

impl<'a> ByteRing<'a> {
    /// Create a ring over `storage` with default watermarks
    /// (high = 3/4 capacity, low = 1/4 capacity).
    ///
    /// Panics if the storage is shorter than 2 bytes.
    pub fn new(storage: &'a mut [u8]) -> Self {
        let cap = storage.len();
        let low = (cap / 4).max(1);
        let high = (cap * 3 / 4).max(low + 1);
        Self::with_watermarks(storage, high, low)
    }

    /// Create a ring with explicit watermarks.
    ///
    /// Panics unless `0 < low < high <= capacity`.
    pub fn with_watermarks(storage: &'a mut [u8], high: usize, low: usize) -> Self {
        let cap = storage.len();
        assert!(low > 0 && low < high && high <= cap, "invalid watermarks");
        Self {
            storage,
            front: 0,
            back: 0,
            occupied: 0,
            high_mark: high,
            low_mark: low,
        }
    }

    /// Total storage capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of occupied bytes.
    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.capacity()
    }

    pub fn high_watermark(&self) -> usize {
        self.high_mark
    }

    pub fn low_watermark(&self) -> usize {
        self.low_mark
    }

    /// Reset both cursors and the occupied count; the ring becomes empty.
    pub fn clear(&mut self) {
        self.front = 0;
        self.back = 0;
        self.occupied = 0;
    }

    /// Copy as many bytes of `data` as fit, starting at the write cursor.
    ///
    /// Returns the number of bytes actually stored. Partial writes are
    /// normal; the caller must check the count.
    pub fn push_back(&mut self, data: &[u8]) -> usize {
        let cap = self.capacity();
        let n = min(data.len(), cap - self.occupied);
        let first = min(n, cap - self.back);
        self.storage[self.back..self.back + first].copy_from_slice(&data[..first]);
        self.storage[..n - first].copy_from_slice(&data[first..n]);
        self.back = (self.back + n) % cap;
        self.occupied += n;
        n
    }

    /// Copy up to `buf.len()` occupied bytes out, starting at the read
    /// cursor. Returns the number of bytes actually copied.
    pub fn pop_front(&mut self, buf: &mut [u8]) -> usize {
        let cap = self.capacity();
        let n = min(buf.len(), self.occupied);
        let first = min(n, cap - self.front);
        buf[..first].copy_from_slice(&self.storage[self.front..self.front + first]);
        buf[first..n].copy_from_slice(&self.storage[..n - first]);
        self.front = (self.front + n) % cap;
        self.occupied -= n;
        n
    }

    /// Longest run of occupied bytes starting at the read cursor without
    /// wrapping past the end of storage. Empty when the ring is empty.
    ///
    /// Intended for a single zero-copy outbound transfer; commit the bytes
    /// actually sent with [`advance_front`](Self::advance_front).
    pub fn front_contiguous(&self) -> &[u8] {
        if self.occupied == 0 {
            return &[];
        }
        let run = min(self.occupied, self.capacity() - self.front);
        &self.storage[self.front..self.front + run]
    }

    /// Longest run of free bytes starting at the write cursor without
    /// wrapping. Empty when the ring is full.
    ///
    /// Intended as the target of a single zero-copy inbound transfer;
    /// commit the bytes actually received with
    /// [`advance_back`](Self::advance_back).
    pub fn back_contiguous(&mut self) -> &mut [u8] {
        let cap = self.capacity();
        let free = cap - self.occupied;
        if free == 0 {
            return &mut [];
        }
        let run = min(free, cap - self.back);
        &mut self.storage[self.back..self.back + run]
    }

    /// Commit `n` bytes already copied out of a front-contiguous segment.
    ///
    /// The count is clamped to the occupied bytes. A return value smaller
    /// than `n` means the external transfer and the ring bookkeeping have
    /// diverged; callers must treat that as a fatal consistency fault, not
    /// a retryable condition.
    pub fn advance_front(&mut self, n: usize) -> usize {
        let cap = self.capacity();
        let commit = min(n, self.occupied);
        self.front = (self.front + commit) % cap;
        self.occupied -= commit;
        commit
    }

    /// Commit `n` bytes already transferred into a back-contiguous segment.
    ///
    /// Clamped to the free space; see [`advance_front`](Self::advance_front)
    /// for the meaning of a short return.
    pub fn advance_back(&mut self, n: usize) -> usize {
        let cap = self.capacity();
        let commit = min(n, cap - self.occupied);
        self.back = (self.back + commit) % cap;
        self.occupied += commit;
        commit
    }

    /// Un-commit exactly one byte of previously written tail data, freeing
    /// one byte of space.
    ///
    /// This exists for one purpose: a continuous hardware receiver must
    /// always have somewhere to write, so when the ring fills up the owner
    /// sacrifices the newest queued byte rather than stop listening. The
    /// data loss is a deliberate trade-off favoring continuous reception
    /// over completeness. No-op on an empty ring.
    pub fn retreat_back(&mut self) {
        if self.occupied == 0 {
            return;
        }
        let cap = self.capacity();
        self.back = (self.back + cap - 1) % cap;
        self.occupied -= 1;
    }

    /// True while the occupied count is below the high watermark.
    pub fn is_below_high_watermark(&self) -> bool {
        self.occupied < self.high_mark
    }

    /// True while the occupied count is below the low watermark.
    pub fn is_below_low_watermark(&self) -> bool {
        self.occupied < self.low_mark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrip() {
        let mut storage = [0u8; 8];
        let mut ring = ByteRing::new(&mut storage);

        assert_eq!(ring.push_back(b"abc"), 3);
        assert_eq!(ring.len(), 3);

        let mut out = [0u8; 8];
        assert_eq!(ring.pop_front(&mut out), 3);
        assert_eq!(&out[..3], b"abc");
        assert!(ring.is_empty());
    }

    #[test]
    fn push_is_clamped_to_free_space() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);

        assert_eq!(ring.push_back(b"123456"), 4);
        assert!(ring.is_full());
        assert_eq!(ring.push_back(b"x"), 0);

        let mut out = [0u8; 4];
        assert_eq!(ring.pop_front(&mut out), 4);
        assert_eq!(&out, b"1234");
    }

    #[test]
    fn wraps_across_storage_end() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);
        let mut out = [0u8; 4];

        ring.push_back(b"abc");
        ring.pop_front(&mut out[..3]);
        // Cursors now sit at index 3; the next push wraps.
        assert_eq!(ring.push_back(b"wxyz"), 4);
        assert_eq!(ring.pop_front(&mut out), 4);
        assert_eq!(&out, b"wxyz");
    }

    #[test]
    fn contiguous_segments_split_at_storage_end() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);
        let mut out = [0u8; 4];

        ring.push_back(b"ab");
        ring.pop_front(&mut out[..2]);
        ring.push_back(b"cdef");

        // Occupied region wraps: [ef|..|cd]
        assert_eq!(ring.front_contiguous(), b"cd");
        assert_eq!(ring.advance_front(2), 2);
        assert_eq!(ring.front_contiguous(), b"ef");
    }

    #[test]
    fn back_contiguous_tracks_free_run() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);
        let mut out = [0u8; 4];

        ring.push_back(b"ab");
        ring.pop_front(&mut out[..1]);
        // back = 2, front = 1: free run is [2..4], then [0..1] after wrap.
        assert_eq!(ring.back_contiguous().len(), 2);
        assert_eq!(ring.advance_back(2), 2);
        assert_eq!(ring.back_contiguous().len(), 1);
        assert_eq!(ring.advance_back(1), 1);
        assert!(ring.is_full());
        assert!(ring.back_contiguous().is_empty());
    }

    #[test]
    fn advance_is_clamped() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);

        assert_eq!(ring.advance_front(1), 0);
        assert_eq!(ring.advance_back(10), 4);
        assert_eq!(ring.advance_back(1), 0);
        assert_eq!(ring.advance_front(10), 4);
    }

    #[test]
    fn retreat_back_frees_one_byte() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);

        ring.push_back(b"abcd");
        assert!(ring.back_contiguous().is_empty());
        ring.retreat_back();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.back_contiguous().len(), 1);
    }

    #[test]
    fn retreat_back_on_empty_is_noop() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);
        ring.retreat_back();
        assert!(ring.is_empty());
    }

    #[test]
    fn watermark_predicates() {
        let mut storage = [0u8; 16];
        let mut ring = ByteRing::with_watermarks(&mut storage, 8, 2);
        let mut out = [0u8; 16];

        assert!(ring.is_below_high_watermark());
        assert!(ring.is_below_low_watermark());

        ring.push_back(&[0u8; 9]);
        assert!(!ring.is_below_high_watermark());
        assert!(!ring.is_below_low_watermark());

        ring.pop_front(&mut out[..8]);
        assert_eq!(ring.len(), 1);
        assert!(ring.is_below_low_watermark());
        assert!(ring.is_below_high_watermark());
    }

    #[test]
    fn default_watermarks() {
        let mut storage = [0u8; 16];
        let ring = ByteRing::new(&mut storage);
        assert_eq!(ring.high_watermark(), 12);
        assert_eq!(ring.low_watermark(), 4);
    }

    #[test]
    #[should_panic(expected = "invalid watermarks")]
    fn rejects_inverted_watermarks() {
        let mut storage = [0u8; 16];
        let _ = ByteRing::with_watermarks(&mut storage, 2, 8);
    }

    #[test]
    fn clear_resets_cursors() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);

        ring.push_back(b"ab");
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.back_contiguous().len(), 4);
    }
}
