//! Growable, block-aligned byte storage backing regular file content.

use crate::error::{Error, Result};

/// Allocation granularity: capacity is always a multiple of this.
pub const BLOCK_SIZE: usize = 4096;

/// Offset-addressed byte store with a logical size independent of capacity.
///
/// Capacity grows to the smallest multiple of [`BLOCK_SIZE`] covering the
/// request and never shrinks. Bytes that enter the logical size without
/// being written (gaps and truncate-grow) always read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    size: usize,
}

impl ByteBuffer {
    /// Create an empty buffer with no allocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The logical content.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// Write `data` at `offset`, growing storage as needed.
    ///
    /// The new logical size is `max(offset + data.len(), size)`, so a
    /// zero-length write past the end still extends the file. Returns the
    /// number of bytes written, which is always `data.len()`.
    pub fn write(&mut self, data: &[u8], offset: u64) -> Result<usize> {
        let start = to_index(offset)?;
        let end = start.checked_add(data.len()).ok_or_else(|| {
            Error::file_too_large(offset.saturating_add(data.len() as u64), usize::MAX as u64)
        })?;

        self.reserve(end)?;

        if start > self.size {
            self.data[self.size..start].fill(0);
        }
        self.data[start..end].copy_from_slice(data);
        self.size = self.size.max(end);

        Ok(data.len())
    }

    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes copied; 0 when `offset >= size`.
    pub fn read(&self, buf: &mut [u8], offset: u64) -> usize {
        let Ok(start) = usize::try_from(offset) else {
            return 0;
        };
        if start >= self.size {
            return 0;
        }

        let count = buf.len().min(self.size - start);
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        count
    }

    /// Set the logical size.
    ///
    /// Shrinking keeps the allocation. Growing zero-fills the newly exposed
    /// range and allocates if it lies beyond the current capacity.
    pub fn truncate(&mut self, size: u64) -> Result<()> {
        let new_size = to_index(size)?;
        if new_size > self.size {
            self.reserve(new_size)?;
            self.data[self.size..new_size].fill(0);
        }
        self.size = new_size;
        Ok(())
    }

    /// Ensure capacity covers `required` bytes, rounding up to a block.
    fn reserve(&mut self, required: usize) -> Result<()> {
        if required <= self.data.len() {
            return Ok(());
        }

        let capacity = required
            .div_ceil(BLOCK_SIZE)
            .checked_mul(BLOCK_SIZE)
            .ok_or_else(|| Error::file_too_large(required as u64, isize::MAX as u64))?;

        // Capacities past isize::MAX fail here rather than in resize.
        self.data
            .try_reserve_exact(capacity - self.data.len())
            .map_err(|_| Error::file_too_large(required as u64, isize::MAX as u64))?;
        self.data.resize(capacity, 0);
        Ok(())
    }
}

fn to_index(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::file_too_large(value, usize::MAX as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buf = ByteBuffer::new();
        assert_eq!(buf.size(), 0);
        assert_eq!(buf.capacity(), 0);
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn test_write_and_read() {
        let mut buf = ByteBuffer::new();
        assert_eq!(buf.write(b"hello\0", 0).unwrap(), 6);
        assert_eq!(buf.size(), 6);
        assert_eq!(buf.capacity(), BLOCK_SIZE);

        let mut out = [0u8; 6];
        assert_eq!(buf.read(&mut out, 0), 6);
        assert_eq!(&out, b"hello\0");
    }

    #[test]
    fn test_write_5000_bytes_allocates_two_blocks() {
        let mut buf = ByteBuffer::new();
        let data = vec![7u8; 5000];
        assert_eq!(buf.write(&data, 0).unwrap(), 5000);
        assert_eq!(buf.size(), 5000);
        assert_eq!(buf.capacity(), 8192);
    }

    #[test]
    fn test_growth_is_minimal_not_doubling() {
        let mut buf = ByteBuffer::new();
        buf.write(&[1u8; BLOCK_SIZE], 0).unwrap();
        assert_eq!(buf.capacity(), BLOCK_SIZE);

        buf.write(&[2u8], BLOCK_SIZE as u64).unwrap();
        assert_eq!(buf.capacity(), 2 * BLOCK_SIZE);

        buf.write(&[3u8], (2 * BLOCK_SIZE) as u64).unwrap();
        assert_eq!(buf.capacity(), 3 * BLOCK_SIZE);
    }

    #[test]
    fn test_growth_preserves_existing_bytes() {
        let mut buf = ByteBuffer::new();
        buf.write(b"abc", 0).unwrap();
        buf.write(b"xyz", 10_000).unwrap();

        let mut out = [0u8; 3];
        buf.read(&mut out, 0);
        assert_eq!(&out, b"abc");
        buf.read(&mut out, 10_000);
        assert_eq!(&out, b"xyz");
    }

    #[test]
    fn test_read_clamps_to_size() {
        let mut buf = ByteBuffer::new();
        buf.write(b"hello", 0).unwrap();

        let mut out = [0xffu8; 10];
        assert_eq!(buf.read(&mut out, 2), 3);
        assert_eq!(&out[..3], b"llo");
        assert_eq!(out[3], 0xff);
    }

    #[test]
    fn test_read_past_end_returns_zero() {
        let mut buf = ByteBuffer::new();
        buf.write(b"hello", 0).unwrap();

        let mut out = [0u8; 4];
        assert_eq!(buf.read(&mut out, 5), 0);
        assert_eq!(buf.read(&mut out, 100), 0);
        assert_eq!(buf.read(&mut out, u64::MAX), 0);
    }

    #[test]
    fn test_write_gap_reads_as_zero() {
        let mut buf = ByteBuffer::new();
        buf.write(b"ab", 0).unwrap();
        buf.write(b"z", 6).unwrap();

        assert_eq!(buf.as_slice(), b"ab\0\0\0\0z");
    }

    #[test]
    fn test_empty_write_past_end_extends_size() {
        let mut buf = ByteBuffer::new();
        assert_eq!(buf.write(&[], 100).unwrap(), 0);
        assert_eq!(buf.size(), 100);
        assert_eq!(buf.capacity(), BLOCK_SIZE);
        assert!(buf.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_truncate_shrink_keeps_capacity() {
        let mut buf = ByteBuffer::new();
        buf.write(&[9u8; 5000], 0).unwrap();
        buf.truncate(10).unwrap();

        assert_eq!(buf.size(), 10);
        assert_eq!(buf.capacity(), 8192);
    }

    #[test]
    fn test_truncate_twice_is_noop() {
        let mut buf = ByteBuffer::new();
        buf.write(b"hello world", 0).unwrap();
        buf.truncate(5).unwrap();
        let snapshot = buf.clone();
        buf.truncate(5).unwrap();
        assert_eq!(buf, snapshot);

        buf.truncate(0).unwrap();
        assert_eq!(buf.size(), 0);
    }

    #[test]
    fn test_shrink_then_grow_does_not_expose_stale_bytes() {
        let mut buf = ByteBuffer::new();
        buf.write(b"secret", 0).unwrap();
        buf.truncate(0).unwrap();
        buf.truncate(6).unwrap();
        assert_eq!(buf.as_slice(), &[0u8; 6]);

        buf.write(b"top", 0).unwrap();
        buf.truncate(1).unwrap();
        buf.write(b"!", 4).unwrap();
        assert_eq!(buf.as_slice(), b"t\0\0\0!");
    }

    #[test]
    fn test_truncate_beyond_capacity_allocates() {
        let mut buf = ByteBuffer::new();
        buf.truncate(5000).unwrap();
        assert_eq!(buf.size(), 5000);
        assert_eq!(buf.capacity(), 8192);

        let mut out = [1u8; 8];
        assert_eq!(buf.read(&mut out, 4992), 8);
        assert_eq!(out, [0u8; 8]);
    }

    #[test]
    fn test_offset_overflow_is_rejected() {
        let mut buf = ByteBuffer::new();
        let err = buf.write(b"x", u64::MAX).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { .. }));
        assert_eq!(buf.size(), 0);
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_size_past_address_space_is_rejected() {
        let mut buf = ByteBuffer::new();
        buf.write(b"abc", 0).unwrap();

        let err = buf.truncate(1u64 << 63).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { .. }));
        let err = buf.write(b"x", 1u64 << 63).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { .. }));

        assert_eq!(buf.as_slice(), b"abc");
        assert_eq!(buf.capacity(), BLOCK_SIZE);
    }

    // Property-based tests
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Write(Vec<u8>, u64),
        Truncate(u64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (prop::collection::vec(any::<u8>(), 0..600), 0u64..20_000)
                .prop_map(|(data, offset)| Op::Write(data, offset)),
            (0u64..20_000).prop_map(Op::Truncate),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Written bytes read back unchanged at the same offset
        #[test]
        fn prop_write_read_roundtrip(
            data in prop::collection::vec(any::<u8>(), 0..10_000),
            offset in 0u64..50_000,
        ) {
            let mut buf = ByteBuffer::new();
            prop_assert_eq!(buf.write(&data, offset)?, data.len());

            let mut out = vec![0u8; data.len()];
            prop_assert_eq!(buf.read(&mut out, offset), data.len());
            prop_assert_eq!(out, data);
        }

        /// Capacity is block aligned and covers the logical size after any op sequence
        #[test]
        fn prop_capacity_invariants(ops in prop::collection::vec(arb_op(), 0..40)) {
            let mut buf = ByteBuffer::new();
            let mut model: Vec<u8> = Vec::new();

            for op in ops {
                match op {
                    Op::Write(data, offset) => {
                        buf.write(&data, offset)?;
                        let end = offset as usize + data.len();
                        if model.len() < end {
                            model.resize(end, 0);
                        }
                        model[offset as usize..end].copy_from_slice(&data);
                    }
                    Op::Truncate(size) => {
                        buf.truncate(size)?;
                        model.resize(size as usize, 0);
                    }
                }

                prop_assert!(buf.capacity() >= buf.size());
                prop_assert_eq!(buf.capacity() % BLOCK_SIZE, 0);
            }

            prop_assert_eq!(buf.as_slice(), &model[..]);
        }
    }
}
