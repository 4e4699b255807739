//! The runtime-function table: fixed-stride records mapping code ranges to unwind/GC info.

use crate::bytes::ByteSliceExt;
use crate::r2r::errors::BadImageError;
use crate::r2r::image::MachineClass;
use crate::r2r::unwind::{gc_info_overlaps_unwind_record, GcInfo, UnwindDecoder, UnwindInfo};

/// Returns the byte stride of one runtime-function record for `machine`: 12 bytes on X64 (start
/// RVA, end RVA, unwind RVA), 8 bytes otherwise (start RVA, unwind RVA).
pub fn record_stride(machine: MachineClass) -> usize {
  match machine {
    MachineClass::X64 => 12,
    _ => 8,
  }
}

/// One fixed-stride record as stored in the table, before unwind/GC info is attached.
#[derive(Debug, Clone, Copy)]
struct RawRecord {
  start_rva: u32,
  end_rva: Option<u32>,
  unwind_rva: u32,
}

fn read_record(bytes: &[u8], id: usize, machine: MachineClass) -> Option<RawRecord> {
  let stride = record_stride(machine);
  let offset = &mut id.checked_mul(stride)?;
  let start_rva = bytes.read::<u32>(offset)?;

  let end_rva = match machine {
    MachineClass::X64 => Some(bytes.read::<u32>(offset)?),
    _ => None,
  };

  let unwind_rva = bytes.read::<u32>(offset)?;

  Some(RawRecord {
    start_rva,
    end_rva,
    unwind_rva,
  })
}

/// A code fragment belonging to a method: start/end RVAs plus its unwind and (only at the
/// method's entry id) GC info.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeFunction<'a> {
  pub id: usize,
  pub start_rva: u32,
  pub end_rva: Option<u32>,
  pub unwind_rva: u32,
  /// Offset of this fragment's start, relative to the owning method's first fragment.
  pub code_offset: u32,
  pub unwind: UnwindInfo<'a>,
  pub gc_info: Option<GcInfo<'a>>,
}

/// Walks the runtime-function table starting at `entry_id`, the id of a method's first fragment.
///
/// Terminates when the next id is past the end of the table or is itself an entrypoint id (per
/// `is_entry_point`) other than `entry_id`.
pub fn walk_method_fragments<'a>(
  image: &'a [u8],
  table: &'a [u8],
  entry_id: usize,
  total_runtime_functions: usize,
  is_entry_point: &[bool],
  machine: MachineClass,
  r2r_major_version: u16,
  decoder: &impl UnwindDecoder,
  offset_of_rva: impl Fn(u32) -> Option<usize>,
) -> Result<Vec<RuntimeFunction<'a>>, BadImageError> {
  if entry_id >= total_runtime_functions {
    return Err(BadImageError::OutOfRangeIndex {
      index: entry_id,
      len: total_runtime_functions,
    });
  }

  let mut fragments = Vec::new();
  let mut id = entry_id;
  let mut code_offset = 0u32;

  loop {
    if id >= total_runtime_functions {
      break;
    }

    if id != entry_id && is_entry_point.get(id).copied().unwrap_or(false) {
      break;
    }

    let record = read_record(table, id, machine).ok_or(BadImageError::BadRuntimeFunctionStride)?;

    let unwind_offset = offset_of_rva(record.unwind_rva)
      .ok_or(BadImageError::OutOfRangeRva(record.unwind_rva))?;
    let unwind = decoder
      .read_unwind(image, record.unwind_rva, unwind_offset)
      .ok_or(BadImageError::OutOfRangeRva(record.unwind_rva))?;

    let gc_info = if id == entry_id {
      let gc_rva = if gc_info_overlaps_unwind_record(machine) {
        record.unwind_rva
      } else {
        record.unwind_rva.saturating_add(unwind.bytes.len() as u32)
      };

      offset_of_rva(gc_rva)
        .and_then(|gc_offset| decoder.read_gc_info(image, gc_offset, machine, r2r_major_version))
    } else {
      None
    };

    let fragment_size = record
      .end_rva
      .map(|end| end.saturating_sub(record.start_rva))
      .unwrap_or(0);

    fragments.push(RuntimeFunction {
      id,
      start_rva: record.start_rva,
      end_rva: record.end_rva,
      unwind_rva: record.unwind_rva,
      code_offset,
      unwind,
      gc_info,
    });

    code_offset = code_offset.saturating_add(fragment_size);
    id += 1;
  }

  Ok(fragments)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_record_stride_by_machine() {
    assert_eq!(12, record_stride(MachineClass::X64));
    assert_eq!(8, record_stride(MachineClass::X86));
    assert_eq!(8, record_stride(MachineClass::Arm32));
    assert_eq!(8, record_stride(MachineClass::Arm64));
  }

  #[test]
  fn test_read_record_x64() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0x1000u32.to_le_bytes());
    bytes.extend_from_slice(&0x1010u32.to_le_bytes());
    bytes.extend_from_slice(&0x2000u32.to_le_bytes());

    let record = read_record(&bytes, 0, MachineClass::X64).unwrap();

    assert_eq!(0x1000, record.start_rva);
    assert_eq!(Some(0x1010), record.end_rva);
    assert_eq!(0x2000, record.unwind_rva);
  }

  #[test]
  fn test_read_record_arm64_has_no_end_rva() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0x1000u32.to_le_bytes());
    bytes.extend_from_slice(&0x2000u32.to_le_bytes());

    let record = read_record(&bytes, 0, MachineClass::Arm64).unwrap();

    assert_eq!(0x1000, record.start_rva);
    assert_eq!(None, record.end_rva);
    assert_eq!(0x2000, record.unwind_rva);
  }
}
