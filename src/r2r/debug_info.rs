//! The `DEBUG_INFO` section: a [NativeArray] from runtime-function id to per-function debug data.
//!
//! Spec §4.14: the payload itself (a variable-length bounds/sequence-points/locals encoding) is
//! delegated to an external decoder; this crate only resolves the offset.

use crate::r2r::native_array::NativeArray;

/// Returns the file offset of `runtime_function_id`'s debug-info blob, if present.
pub fn debug_info_offset(array: &NativeArray<'_>, runtime_function_id: usize) -> Option<usize> {
  array.try_get_at(runtime_function_id)
}
