//! Fixed-capacity rolling window over `f64` samples.

#[derive(Debug, Clone)]
pub(crate) struct RingBuffer {
    buffer: Vec<f64>,
    head: usize,
    capacity: usize,
}

impl RingBuffer {
    /// A zero capacity is clamped to one; periods are validated upstream.
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    /// Appends `value`, returning the evicted oldest sample once full.
    #[inline]
    pub(crate) fn push(&mut self, value: f64) -> Option<f64> {
        if self.is_full() {
            let old = std::mem::replace(&mut self.buffer[self.head], value);
            self.head += 1;
            if self.head == self.capacity {
                self.head = 0;
            }
            Some(old)
        } else {
            self.buffer.push(value);
            None
        }
    }

    /// Samples from oldest to newest.
    pub(crate) fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.buffer[self.head..]
            .iter()
            .chain(self.buffer[..self.head].iter())
            .copied()
    }

    /// Mean of a full window; `None` while filling.
    pub(crate) fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.capacity as f64)
    }

    /// Maximum of a full window; `None` while filling.
    pub(crate) fn max(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.iter().reduce(f64::max)
    }

    /// Minimum of a full window; `None` while filling.
    pub(crate) fn min(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.iter().reduce(f64::min)
    }
}
