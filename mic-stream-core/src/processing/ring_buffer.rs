/// Fixed-capacity circular buffer of captured 16-bit samples.
///
/// Not synchronized; wrap in `parking_lot::Mutex` for cross-thread access.
///
/// Overflow behavior: drops oldest samples.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<i16>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
    dropped: u64,
    /// Samples read or overwritten since the last reset.
    consumed: u64,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
            dropped: 0,
            consumed: 0,
        }
    }

    /// Write samples into the ring buffer.
    ///
    /// If the buffer overflows, the oldest samples are dropped.
    /// If `samples` is larger than capacity, only the last `capacity` samples are kept.
    pub fn write(&mut self, samples: &[i16]) {
        if samples.is_empty() || self.capacity == 0 {
            self.dropped += samples.len() as u64;
            self.consumed += samples.len() as u64;
            return;
        }

        let samples = if samples.len() > self.capacity {
            let skip = samples.len() - self.capacity;
            self.dropped += skip as u64;
            self.consumed += skip as u64;
            &samples[skip..]
        } else {
            samples
        };

        let overflow = (self.available + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            self.dropped += overflow as u64;
            self.consumed += overflow as u64;
        }

        // At most two contiguous copies: up to the end, then from the start.
        let first = samples.len().min(self.capacity - self.write_index);
        self.buffer[self.write_index..self.write_index + first].copy_from_slice(&samples[..first]);
        let rest = samples.len() - first;
        self.buffer[..rest].copy_from_slice(&samples[first..]);

        self.write_index = (self.write_index + samples.len()) % self.capacity;
        self.available += samples.len();
    }

    /// Move up to `out.len()` samples into `out`, oldest first.
    ///
    /// Returns the number of samples copied.
    pub fn read_into(&mut self, out: &mut [i16]) -> usize {
        self.read_until(out, u64::MAX)
    }

    /// Like [`read_into`](Self::read_into), but never past absolute sample
    /// position `limit` (counted from the last reset).
    pub fn read_until(&mut self, out: &mut [i16], limit: u64) -> usize {
        let before_limit = limit.saturating_sub(self.consumed);
        let to_read = out
            .len()
            .min(self.available)
            .min(usize::try_from(before_limit).unwrap_or(usize::MAX));
        if to_read == 0 {
            return 0;
        }

        let first = to_read.min(self.capacity - self.read_index);
        out[..first].copy_from_slice(&self.buffer[self.read_index..self.read_index + first]);
        let rest = to_read - first;
        out[first..to_read].copy_from_slice(&self.buffer[..rest]);

        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        self.consumed += to_read as u64;
        to_read
    }

    /// Read and remove up to `count` samples from the buffer.
    pub fn read(&mut self, count: usize) -> Vec<i16> {
        let mut out = vec![0; count.min(self.available)];
        let read = self.read_into(&mut out);
        out.truncate(read);
        out
    }

    /// Number of samples currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Samples lost to overflow since creation or the last reset.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Absolute position of the oldest unread sample.
    pub fn position(&self) -> u64 {
        self.consumed
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
        self.dropped = 0;
        self.consumed = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_write_read() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3]);

        assert_eq!(buf.count(), 3);
        assert_eq!(buf.read(3), vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn read_partial() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3, 4, 5]);

        assert_eq!(buf.read(3), vec![1, 2, 3]);
        assert_eq!(buf.count(), 2);

        let rest = buf.read(10); // request more than available
        assert_eq!(rest, vec![4, 5]);
        assert!(buf.is_empty());
    }

    #[test]
    fn read_into_reports_short_reads() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[7, 8]);

        let mut out = [0i16; 4];
        assert_eq!(buf.read_into(&mut out), 2);
        assert_eq!(&out[..2], &[7, 8]);
        assert_eq!(buf.read_into(&mut out), 0);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1, 2, 3, 4]);
        buf.write(&[5, 6]); // overflow: drops 1, 2

        assert_eq!(buf.count(), 4);
        assert_eq!(buf.dropped(), 2);
        assert_eq!(buf.read(4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn write_larger_than_capacity() {
        let mut buf = RingBuffer::new(3);
        buf.write(&[1, 2, 3, 4, 5]); // only last 3 kept

        assert_eq!(buf.count(), 3);
        assert_eq!(buf.read(3), vec![3, 4, 5]);
    }

    #[test]
    fn wraparound() {
        let mut buf = RingBuffer::new(4);

        buf.write(&[1, 2, 3]);
        buf.read(2); // discard 1, 2; read_index = 2

        buf.write(&[4, 5, 6]); // wraps around

        assert_eq!(buf.count(), 4);
        assert_eq!(buf.read(4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn reset_clears_buffer() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3]);
        buf.reset();

        assert!(buf.is_empty());
        assert!(buf.read(10).is_empty());
    }

    #[test]
    fn read_until_stops_at_limit() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[1, 2, 3, 4, 5, 6]);

        let mut out = [0i16; 8];
        assert_eq!(buf.read_until(&mut out, 4), 4);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
        assert_eq!(buf.read_until(&mut out, 4), 0);
        assert_eq!(buf.position(), 4);
        assert_eq!(buf.count(), 2);
    }

    #[test]
    fn overwritten_samples_advance_position() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(buf.position(), 2);

        // Only 3 and 4 precede position 4.
        let mut out = [0i16; 4];
        assert_eq!(buf.read_until(&mut out, 4), 2);
        assert_eq!(&out[..2], &[3, 4]);
    }

    #[test]
    fn zero_capacity_drops_everything() {
        let mut buf = RingBuffer::new(0);
        buf.write(&[1, 2]);
        assert!(buf.is_empty());
        assert_eq!(buf.dropped(), 2);
    }
}
