//! The `AVAILABLE_TYPES` section: a [NativeHashtable] enumerating every type the assembly exposes.
//!
//! Spec §4.11: each entry's payload is a single `NativeUnsigned`-encoded token. Bit 0 selects
//! which table the remaining bits index — `TypeDef` when clear, `ExportedType` when set — and the
//! remaining bits are the 1-based row id.

use crate::bytes::{ByteSliceExt, NativeUnsigned};
use crate::metadata::streams::tables::id::RowId;
use crate::metadata::MetadataReader;
use crate::r2r::format::{NameFormatter, TypeHandle};
use crate::r2r::native_hashtable::NativeHashtable;

/// Decodes a single `AVAILABLE_TYPES` entry's token at `offset` within `bytes`.
pub fn decode_handle(bytes: &[u8], offset: &mut usize) -> Option<TypeHandle> {
  let token = bytes.read_with::<u32, _>(offset, NativeUnsigned)?;
  let rid = (token >> 1) as usize;

  if token & 1 != 0 {
    Some(TypeHandle::ExportedType(RowId::new(rid)))
  } else {
    Some(TypeHandle::TypeDef(RowId::new(rid)))
  }
}

/// Enumerates every entry of an `AVAILABLE_TYPES` [NativeHashtable] and renders each through
/// `formatter`.
///
/// Per spec §7, an entry whose token cannot be decoded, or whose handle `formatter` cannot render,
/// is silently skipped rather than failing the whole read. `ExportedType` entries are prefixed
/// with `"exported "` to distinguish them from locally defined types with the same rendered name.
pub fn parse_available_types(
  table: &NativeHashtable<'_>,
  image: &[u8],
  reader: &MetadataReader<'_>,
  formatter: &impl NameFormatter,
) -> Vec<String> {
  table
    .enumerate_all()
    .filter_map(|entry| {
      let mut offset = entry.payload_offset;
      let handle = decode_handle(image, &mut offset)?;
      let name = formatter.format_type_handle(reader, handle)?;

      Some(match handle {
        TypeHandle::ExportedType(_) => format!("exported {name}"),
        TypeHandle::TypeDef(_) => name,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn encode_unsigned(val: u32) -> Vec<u8> {
    assert!(val < (1 << 7));
    vec![(val << 1) as u8]
  }

  #[test]
  fn test_decode_handle_type_def() {
    let bytes = encode_unsigned(5 << 1);
    let offset = &mut 0;

    assert_eq!(
      Some(TypeHandle::TypeDef(RowId::new(5))),
      decode_handle(&bytes, offset)
    );
  }

  #[test]
  fn test_decode_handle_exported_type() {
    let bytes = encode_unsigned((5 << 1) | 1);
    let offset = &mut 0;

    assert_eq!(
      Some(TypeHandle::ExportedType(RowId::new(5))),
      decode_handle(&bytes, offset)
    );
  }
}
