//! The `EXCEPTION_INFO` section: a per-method index into exception-handling clause arrays.
//!
//! Spec §4.13: the section is a flat sequence of `(methodRva, ehInfoRva)` pairs, terminated by one
//! trailing pair that is never itself a map entry — it only bounds the size of the entry before
//! it. Each EH-clause array entry is 24 bytes.

use crate::bytes::ByteSliceExt;
use crate::r2r::errors::BadImageError;
use std::collections::BTreeMap;

/// The on-disk size, in bytes, of one exception-handling clause.
pub const CLAUSE_SIZE: u32 = 24;

/// A method's exception-handling clause array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EhInfo {
  pub eh_info_rva: u32,
  pub file_offset: usize,
  pub clause_count: u32,
}

/// Parses the `EXCEPTION_INFO` section into a map from method RVA to its [EhInfo].
pub fn parse_exception_info(
  bytes: &[u8],
  offset_of_rva: impl Fn(u32) -> Option<usize>,
) -> Result<BTreeMap<u32, EhInfo>, BadImageError> {
  let mut pairs = Vec::new();
  let mut offset = 0;

  while offset + 8 <= bytes.len() {
    let method_rva = bytes.read::<u32>(&mut offset).ok_or(BadImageError::Truncated)?;
    let eh_info_rva = bytes.read::<u32>(&mut offset).ok_or(BadImageError::Truncated)?;

    pairs.push((method_rva, eh_info_rva));
  }

  let mut map = BTreeMap::new();

  for pair in pairs.windows(2) {
    let &[(method_rva, eh_info_rva), (_, next_eh_info_rva)] = pair else {
      unreachable!("windows(2) always yields 2-element slices");
    };

    let clause_count = next_eh_info_rva.saturating_sub(eh_info_rva) / CLAUSE_SIZE;
    let file_offset = offset_of_rva(eh_info_rva).ok_or(BadImageError::OutOfRangeRva(eh_info_rva))?;

    map.insert(
      method_rva,
      EhInfo {
        eh_info_rva,
        file_offset,
        clause_count,
      },
    );
  }

  Ok(map)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn build(pairs: &[(u32, u32)]) -> Vec<u8> {
    let mut bytes = Vec::new();

    for (m, e) in pairs {
      bytes.extend_from_slice(&m.to_le_bytes());
      bytes.extend_from_slice(&e.to_le_bytes());
    }

    bytes
  }

  #[test]
  fn test_clause_count_from_gap_to_next_pair() {
    let bytes = build(&[(0x1000, 0x2000), (0x1100, 0x2000 + 48), (0xffff_ffff, 0x2000 + 48 + 24)]);
    let map = parse_exception_info(&bytes, |rva| Some(rva as usize)).unwrap();

    assert_eq!(2, map.len());
    assert_eq!(2, map[&0x1000].clause_count);
    assert_eq!(1, map[&0x1100].clause_count);
    assert!(!map.contains_key(&0xffff_ffff));
  }

  #[test]
  fn test_empty_section_yields_empty_map() {
    let map = parse_exception_info(&[], |rva| Some(rva as usize)).unwrap();

    assert!(map.is_empty());
  }
}
