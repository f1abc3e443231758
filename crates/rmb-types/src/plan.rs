use std::ops::Range;

use crate::error::{TypeError, TypeResult};

/// One byte range of a [`WritePlan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteRange {
    pub offset: u64,
    pub length: u64,
}

impl WriteRange {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// The range as slice indices into a buffer of `buffer_len` bytes.
    pub fn checked_range(&self, buffer_len: usize) -> TypeResult<Range<usize>> {
        let out_of_bounds = || TypeError::RangeOutOfBounds {
            offset: self.offset,
            length: self.length,
            buffer_len,
        };
        let start = usize::try_from(self.offset).map_err(|_| out_of_bounds())?;
        let end = usize::try_from(self.end()).map_err(|_| out_of_bounds())?;
        if end > buffer_len {
            return Err(out_of_bounds());
        }
        Ok(start..end)
    }
}

/// The ordered, contiguous, non-overlapping ranges a buffer is written in.
///
/// Every range is at most `max_write_size` bytes; only the last one may be
/// shorter. The plan is derived, never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WritePlan {
    ranges: Vec<WriteRange>,
    total_len: u64,
    max_write_size: u64,
}

impl WritePlan {
    /// Partition `total_len` bytes into ranges of at most `max_write_size`.
    ///
    /// A zero `max_write_size` is rejected. An empty buffer yields an empty
    /// plan.
    pub fn new(total_len: u64, max_write_size: u64) -> TypeResult<Self> {
        if max_write_size == 0 {
            return Err(TypeError::ZeroWriteSize);
        }
        let count = Self::chunk_count(total_len, max_write_size)?;
        let mut ranges = Vec::with_capacity(count as usize);
        let mut offset = 0;
        while offset < total_len {
            let length = max_write_size.min(total_len - offset);
            ranges.push(WriteRange { offset, length });
            offset += length;
        }
        Ok(Self {
            ranges,
            total_len,
            max_write_size,
        })
    }

    /// `ceil(total_len / max_write_size)`.
    pub fn chunk_count(total_len: u64, max_write_size: u64) -> TypeResult<u64> {
        if max_write_size == 0 {
            return Err(TypeError::ZeroWriteSize);
        }
        Ok(total_len.div_ceil(max_write_size))
    }

    pub fn ranges(&self) -> &[WriteRange] {
        &self.ranges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WriteRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    pub fn max_write_size(&self) -> u64 {
        self.max_write_size
    }
}

impl<'a> IntoIterator for &'a WritePlan {
    type Item = &'a WriteRange;
    type IntoIter = std::slice::Iter<'a, WriteRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}
