//! Architecture-specific unwind and GC-info decoding.
//!
//! Disassembling unwind opcodes and GC-info bit streams is machine-specific and explicitly out of
//! scope for the core container parser (see the crate's Non-goals). This module models the seam
//! the core calls through: a small capability set, swappable per architecture, that the core
//! treats opaquely.

use crate::r2r::image::MachineClass;

/// Raw, un-interpreted unwind info for one runtime function: the bytes starting at the unwind
/// RVA, whose length is architecture-defined and must be known by the decoder, not the core.
#[derive(Debug, Clone, Copy)]
pub struct UnwindInfo<'a> {
  pub rva: u32,
  pub bytes: &'a [u8],
}

/// Raw, un-interpreted GC info for a runtime function's entry point.
#[derive(Debug, Clone, Copy)]
pub struct GcInfo<'a> {
  pub bytes: &'a [u8],
}

/// Decodes unwind and GC info for one machine architecture.
///
/// On x86, GC info begins at the unwind record itself; on every other architecture it follows
/// immediately after. `ArmThumb2` reuses the Amd64 decoder (see the crate's design notes on this
/// unverified assumption carried over from the source format).
pub trait UnwindDecoder {
  /// Reads the unwind info starting at `offset` in `image`, for the given [MachineClass].
  fn read_unwind<'a>(&self, image: &'a [u8], rva: u32, offset: usize) -> Option<UnwindInfo<'a>>;

  /// Reads the GC info associated with a runtime function's entry point.
  fn read_gc_info<'a>(
    &self,
    image: &'a [u8],
    offset: usize,
    machine: MachineClass,
    r2r_major_version: u16,
  ) -> Option<GcInfo<'a>>;
}

/// Returns whether GC info for `machine` is placed immediately at the unwind record (`true`, x86)
/// or immediately after it (`false`, every other architecture).
pub fn gc_info_overlaps_unwind_record(machine: MachineClass) -> bool {
  matches!(machine, MachineClass::X86)
}
