//! Fixed-capacity byte ring for stream reassembly
//!
//! Provides O(1) consume operations instead of O(n) Vec::drain().

/// Largest contiguous view handed out by `get_slice`
const STAGING_SIZE: usize = 256;

/// Fixed-capacity ring buffer with O(1) advance
pub struct RingBuffer<const N: usize = 1024> {
    data: [u8; N],
    head: usize, // Write position (next empty slot)
    tail: usize, // Read position (first valid byte)
    len: usize,
    staging: [u8; STAGING_SIZE],
}

impl<const N: usize> RingBuffer<N> {
    /// Create a new empty ring buffer
    pub const fn new() -> Self {
        Self {
            data: [0u8; N],
            head: 0,
            tail: 0,
            len: 0,
            staging: [0u8; STAGING_SIZE],
        }
    }

    /// Append bytes to the buffer
    ///
    /// Returns how many bytes did not fit and were dropped.
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let mut dropped = 0;
        for &b in bytes {
            if self.len < N {
                self.data[self.head] = b;
                self.head = (self.head + 1) % N;
                self.len += 1;
            } else {
                dropped += 1;
            }
        }
        dropped
    }

    /// Consume n bytes from the front
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.tail = (self.tail + n) % N;
        self.len -= n;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }

    /// Read byte at logical index (handles wraparound)
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        (index < self.len).then(|| self.data[(self.tail + index) % N])
    }

    /// Find a 3-byte pattern, returns offset from tail
    pub fn find_pattern_3(&self, pattern: [u8; 3]) -> Option<usize> {
        if self.len < 3 {
            return None;
        }
        (0..self.len - 2).find(|&i| {
            self.data[(self.tail + i) % N] == pattern[0]
                && self.data[(self.tail + i + 1) % N] == pattern[1]
                && self.data[(self.tail + i + 2) % N] == pattern[2]
        })
    }

    /// Get contiguous slice (copies to staging if data wraps around)
    pub fn get_slice(&mut self, start: usize, len: usize) -> Option<&[u8]> {
        if start + len > self.len || len > STAGING_SIZE {
            return None;
        }

        let real_start = (self.tail + start) % N;

        if real_start + len <= N {
            Some(&self.data[real_start..real_start + len])
        } else {
            for i in 0..len {
                self.staging[i] = self.data[(real_start + i) % N];
            }
            Some(&self.staging[..len])
        }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
