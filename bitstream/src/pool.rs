//! Reusable byte buffers for growable writers.

/// Source of byte buffers that can be rented and handed back.
pub trait BufferPool {
    /// Returns a zeroed buffer of exactly `min_len` bytes.
    fn rent(&mut self, min_len: usize) -> Vec<u8>;

    /// Returns a buffer to the pool for later reuse.
    fn release(&mut self, buffer: Vec<u8>);
}

/// A free-list pool that retains at most `max_retained` buffers.
#[derive(Debug)]
pub struct SimpleBufferPool {
    free: Vec<Vec<u8>>,
    max_retained: usize,
}

impl SimpleBufferPool {
    #[must_use]
    pub const fn new(max_retained: usize) -> Self {
        Self {
            free: Vec::new(),
            max_retained,
        }
    }

    /// Number of buffers waiting to be rented.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl Default for SimpleBufferPool {
    fn default() -> Self {
        Self::new(16)
    }
}

impl BufferPool for SimpleBufferPool {
    fn rent(&mut self, min_len: usize) -> Vec<u8> {
        let reusable = self
            .free
            .iter()
            .position(|buffer| buffer.capacity() >= min_len);
        let mut buffer = match reusable {
            Some(index) => self.free.swap_remove(index),
            None => Vec::with_capacity(min_len),
        };
        buffer.clear();
        buffer.resize(min_len, 0);
        buffer
    }

    fn release(&mut self, buffer: Vec<u8>) {
        if self.free.len() < self.max_retained {
            self.free.push(buffer);
        }
    }
}
