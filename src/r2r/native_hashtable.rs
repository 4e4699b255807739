//! A bucketed hash table keyed by an 8-bit low-hash byte.
//!
//! Supports full enumeration and per-bucket lookup over payload offsets, without requiring the
//! full hash value to be recoverable from the table itself — callers supply it and compare only
//! the low byte, narrowing (not proving) a match.

use crate::bytes::ByteSliceExt;
use crate::r2r::errors::NativeHashtableReadError;

/// One entry in a [NativeHashtable]: the low 8 bits of the entry's hash code, and the absolute
/// offset of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashtableEntry {
  pub low_hashcode: u8,
  pub payload_offset: usize,
}

/// A bucketed hash table over a byte blob.
#[derive(Clone, Copy)]
pub struct NativeHashtable<'a> {
  base: usize,
  bytes: &'a [u8],
  bucket_offsets: &'a [u8],
  bucket_count: usize,
}

const ENTRY_CONTINUES: u8 = 0x01;
const ENTRY_END: u8 = 0x00;

impl<'a> NativeHashtable<'a> {
  /// Parses a [NativeHashtable] header from `bytes`, which must begin exactly at the table's
  /// start RVA. `base` is the absolute offset of `bytes[0]` within the image.
  pub fn from_bytes(base: usize, bytes: &'a [u8]) -> Result<Self, NativeHashtableReadError> {
    let log2_buckets = *bytes.first().ok_or(NativeHashtableReadError::Truncated)?;

    if log2_buckets > 31 {
      return Err(NativeHashtableReadError::InvalidBucketCount);
    }

    let bucket_count = 1usize << log2_buckets;
    let table_start = 1;
    let table_len = bucket_count
      .checked_mul(4)
      .ok_or(NativeHashtableReadError::InvalidBucketCount)?;
    let bucket_offsets = bytes
      .get(table_start..table_start + table_len)
      .ok_or(NativeHashtableReadError::Truncated)?;

    Ok(Self {
      base,
      bytes,
      bucket_offsets,
      bucket_count,
    })
  }

  /// Returns the number of buckets.
  #[inline]
  pub const fn bucket_count(&self) -> usize {
    self.bucket_count
  }

  fn bucket_start(&self, bucket: usize) -> Option<usize> {
    let off = bucket * 4;
    let raw = self.bucket_offsets.get(off..off + 4)?;

    Some(u32::from_le_bytes(raw.try_into().ok()?) as usize)
  }

  fn read_bucket(&self, mut offset: usize, out: &mut impl FnMut(HashtableEntry) -> bool) {
    loop {
      let Some(marker) = self.bytes.get(offset) else {
        return;
      };

      if *marker == ENTRY_END {
        return;
      }

      if *marker != ENTRY_CONTINUES {
        return;
      }

      offset += 1;

      let Some(low_hashcode) = self.bytes.get(offset).copied() else {
        return;
      };

      offset += 1;

      let Some(payload_offset) = self.bytes.read::<u32>(&mut offset) else {
        return;
      };

      let entry = HashtableEntry {
        low_hashcode,
        payload_offset: self.base + payload_offset as usize,
      };

      if !out(entry) {
        return;
      }
    }
  }

  /// Visits every entry in the table; ordering is unspecified (bucket order, then in-bucket
  /// order).
  pub fn enumerate_all(&self) -> impl Iterator<Item = HashtableEntry> + '_ {
    (0..self.bucket_count).flat_map(move |bucket| {
      let mut entries = Vec::new();

      if let Some(start) = self.bucket_start(bucket) {
        self.read_bucket(start, &mut |e| {
          entries.push(e);
          true
        });
      }

      entries.into_iter()
    })
  }

  /// Returns candidate entries in the bucket matching `full_hash & 0xff`. Candidates must still
  /// be confirmed against the full key by the caller.
  pub fn lookup(&self, full_hash: u32) -> Vec<HashtableEntry> {
    let low = (full_hash & 0xff) as u8;
    let bucket = (full_hash as usize) & (self.bucket_count - 1);
    let mut entries = Vec::new();

    if let Some(start) = self.bucket_start(bucket) {
      self.read_bucket(start, &mut |e| {
        if e.low_hashcode == low {
          entries.push(e);
        }
        true
      });
    }

    entries
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn build(buckets: &[Vec<(u8, u32)>]) -> Vec<u8> {
    let log2 = buckets.len().trailing_zeros() as u8;
    assert_eq!(1usize << log2, buckets.len());

    let mut bucket_offsets = Vec::new();
    let mut stream = Vec::new();
    let header_len = 1 + buckets.len() * 4;

    for bucket in buckets {
      bucket_offsets.extend_from_slice(&((header_len + stream.len()) as u32).to_le_bytes());

      for (low, payload) in bucket {
        stream.push(ENTRY_CONTINUES);
        stream.push(*low);
        stream.extend_from_slice(&payload.to_le_bytes());
      }

      stream.push(ENTRY_END);
    }

    let mut bytes = vec![log2];

    bytes.extend_from_slice(&bucket_offsets);
    bytes.extend_from_slice(&stream);

    bytes
  }

  #[test]
  fn test_lookup_matches_low_hash_in_bucket() {
    // With 2 buckets, bucket = low_hashcode & 1, so an entry's bucket is determined by its own
    // low hash; both entries here land in bucket 1, and only the matching low hash is returned.
    let bytes = build(&[vec![(0x10, 100)], vec![(0x11, 200), (0x13, 300)]]);
    let table = NativeHashtable::from_bytes(0, &bytes).unwrap();

    assert_eq!(2, table.bucket_count());

    let found = table.lookup(0x13);

    assert_eq!(1, found.len());
    assert_eq!(300, found[0].payload_offset);
  }

  #[test]
  fn test_enumerate_all_visits_every_entry() {
    let bytes = build(&[vec![(1, 10)], vec![(2, 20), (3, 30)]]);
    let table = NativeHashtable::from_bytes(0, &bytes).unwrap();

    let all: Vec<_> = table.enumerate_all().collect();

    assert_eq!(3, all.len());
  }

  #[test]
  fn test_invalid_bucket_count_is_rejected() {
    let bytes = vec![32u8];

    assert!(matches!(
      NativeHashtable::from_bytes(0, &bytes),
      Err(NativeHashtableReadError::InvalidBucketCount)
    ));
  }
}
