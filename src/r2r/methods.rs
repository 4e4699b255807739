//! The method-entrypoint blob format, and the `MethodDef` entrypoint parser (NativeArray-keyed).

use crate::bytes::{ByteSliceExt, NativeUnsigned};
use crate::metadata::streams::tables::id::RowId;
use crate::metadata::streams::tables::rows::MethodDefRow;
use crate::metadata::MetadataReader;
use crate::r2r::errors::BadImageError;
use crate::r2r::native_array::NativeArray;

/// A decoded method-entrypoint blob: the runtime-function index, and the offset of an optional
/// fixup blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodEntryPoint {
  pub runtime_function_id: u32,
  pub fixup_offset: Option<usize>,
}

/// Decodes a method-entrypoint blob starting at `offset` within `bytes`.
///
/// `id`'s bit 0 indicates a fixup blob is present; bit 1 (only meaningful when bit 0 is set)
/// indicates a second unsigned follows and is subtracted from the current offset (i.e. the
/// offset just past that second unsigned) to yield the fixup offset. The remaining, shifted-out
/// bits of `id` are the runtime-function index.
pub fn decode_entry_point(bytes: &[u8], offset: &mut usize) -> Option<MethodEntryPoint> {
  let id = bytes.read_with::<u32, _>(offset, NativeUnsigned)?;
  let has_fixup = id & 1 != 0;

  if !has_fixup {
    return Some(MethodEntryPoint {
      runtime_function_id: id >> 1,
      fixup_offset: None,
    });
  }

  let has_explicit_fixup_offset = id & 2 != 0;

  if !has_explicit_fixup_offset {
    return Some(MethodEntryPoint {
      runtime_function_id: id >> 1,
      fixup_offset: Some(*offset),
    });
  }

  let delta = bytes.read_with::<u32, _>(offset, NativeUnsigned)?;
  let fixup_offset = (*offset).checked_sub(delta as usize)?;

  Some(MethodEntryPoint {
    runtime_function_id: id >> 2,
    fixup_offset: Some(fixup_offset),
  })
}

/// A non-generic method entrypoint.
#[derive(Clone, Copy)]
pub struct Method<'a> {
  pub handle: RowId<MethodDefRow>,
  pub entry: MethodEntryPoint,
  pub reader: &'a MetadataReader<'a>,
}

/// Walks a `METHODDEF_ENTRYPOINTS` [NativeArray]; for each RID `1..=method_count` with a present
/// entry, decodes its [MethodEntryPoint] and marks `is_entry_point[runtime_function_id]`.
///
/// `image` is the whole image buffer, used to resolve the absolute payload offsets the
/// [NativeArray] returns back into blob-local offsets.
pub fn parse_method_def_entry_points<'a>(
  image: &[u8],
  array: &NativeArray<'_>,
  method_count: u32,
  reader: &'a MetadataReader<'a>,
  is_entry_point: &mut [bool],
) -> Result<Vec<Method<'a>>, BadImageError> {
  let mut methods = Vec::new();

  for rid in 1..=method_count {
    let Some(payload_offset) = array.try_get_at((rid - 1) as usize) else {
      continue;
    };

    let mut offset = payload_offset;
    let entry =
      decode_entry_point(image, &mut offset).ok_or(BadImageError::Truncated)?;

    let id = entry.runtime_function_id as usize;
    let flag = is_entry_point
      .get_mut(id)
      .ok_or(BadImageError::OutOfRangeIndex {
        index: id,
        len: is_entry_point.len(),
      })?;

    *flag = true;

    methods.push(Method {
      handle: RowId::new(rid as usize),
      entry,
      reader,
    });
  }

  Ok(methods)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn encode_unsigned(val: u32) -> Vec<u8> {
    if val < (1 << 7) {
      vec![(val << 1) as u8]
    } else if val < (1 << 14) {
      vec![((val >> 8) << 2) as u8 | 1, val as u8]
    } else if val < (1 << 29) {
      vec![
        ((val >> 24) << 3) as u8 | 3,
        (val >> 16) as u8,
        (val >> 8) as u8,
        val as u8,
      ]
    } else {
      let mut buf = vec![7u8];
      buf.extend_from_slice(&val.to_le_bytes());
      buf
    }
  }

  #[test]
  fn test_decode_entry_point_without_fixup() {
    let bytes = encode_unsigned(42 << 1);
    let offset = &mut 0;
    let entry = decode_entry_point(&bytes, offset).unwrap();

    assert_eq!(42, entry.runtime_function_id);
    assert_eq!(None, entry.fixup_offset);
  }

  #[test]
  fn test_decode_entry_point_with_implicit_fixup() {
    let mut bytes = encode_unsigned((7 << 1) | 1);
    let fixup_start = bytes.len();
    bytes.extend_from_slice(&[0xAA]);

    let offset = &mut 0;
    let entry = decode_entry_point(&bytes, offset).unwrap();

    assert_eq!(7, entry.runtime_function_id);
    assert_eq!(Some(fixup_start), entry.fixup_offset);
  }

  #[test]
  fn test_decode_entry_point_with_explicit_fixup_offset() {
    let mut bytes = encode_unsigned((3 << 2) | 3);
    bytes.extend_from_slice(&encode_unsigned(2));
    let after_delta = bytes.len();

    let offset = &mut 0;
    let entry = decode_entry_point(&bytes, offset).unwrap();

    assert_eq!(3, entry.runtime_function_id);
    assert_eq!(Some(after_delta - 2), entry.fixup_offset);
  }
}
