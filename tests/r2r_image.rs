//! Drives [R2RReader] end-to-end against a synthetic, in-memory container: no `object`-crate PE
//! parsing involved, just a minimal [PeAdapter] mapping RVAs to file offsets by identity.

use r2r::metadata::errors::MetadataReadError;
use r2r::metadata::MetadataReader;
use r2r::r2r::image::MachineClass;
use r2r::r2r::instance_methods::{ModuleResolver, SignatureFormatter};
use r2r::r2r::unwind::{GcInfo, UnwindDecoder, UnwindInfo};
use r2r::r2r::{PeAdapter, R2RReader};

const R2R_SIGNATURE: u32 = 0x0052_5452;
const SECTION_RUNTIME_FUNCTIONS: u16 = 102;
const SECTION_METHODDEF_ENTRYPOINTS: u16 = 103;

const RUNTIME_FUNCTION_COUNT: u32 = 7;
// Runtime-function ids that own a MethodDef entrypoint; every other id is a continuation
// fragment of whichever owning id precedes it. Matches the `[T,F,T,F,F,T,F]` bitmap shape.
const ENTRY_POINT_IDS: [u32; 3] = [0, 2, 5];

fn native_unsigned(value: u32) -> Vec<u8> {
  if value < (1 << 7) {
    vec![(value << 1) as u8]
  } else if value < (1 << 14) {
    vec![((value >> 8) << 2) as u8 | 1, value as u8]
  } else if value < (1 << 29) {
    vec![
      ((value >> 24) << 3) as u8 | 3,
      (value >> 16) as u8,
      (value >> 8) as u8,
      value as u8,
    ]
  } else {
    let mut buf = vec![7u8];
    buf.extend_from_slice(&value.to_le_bytes());
    buf
  }
}

/// Builds a `METHODDEF_ENTRYPOINTS` `NativeArray`: three RIDs (1..=3), each present, whose
/// entry-point blobs carry no fixup and decode to [ENTRY_POINT_IDS] in order.
fn build_method_def_entry_points() -> Vec<u8> {
  let payload: Vec<u8> = ENTRY_POINT_IDS.iter().map(|id| (id << 2) as u8).collect();
  let header = native_unsigned(((payload.len() as u32) << 3) | 1); // width selector 1 = 4 bits

  let mut table = vec![0u8; (payload.len() * 4).div_ceil(8)];

  for (i, _) in payload.iter().enumerate() {
    let raw = (i + 1) as u8;
    let bit_offset = i * 4;

    table[bit_offset / 8] |= raw << (bit_offset % 8);
  }

  let mut bytes = header;
  bytes.extend_from_slice(&table);
  bytes.extend_from_slice(&payload);
  bytes
}

/// Builds the `RUNTIME_FUNCTIONS` table for the X86 record shape (start RVA, unwind RVA), every
/// record pointing at the same shared unwind blob.
fn build_runtime_functions(unwind_rva: u32) -> Vec<u8> {
  let mut bytes = Vec::new();

  for id in 0..RUNTIME_FUNCTION_COUNT {
    bytes.extend_from_slice(&(id * 0x10).to_le_bytes());
    bytes.extend_from_slice(&unwind_rva.to_le_bytes());
  }

  bytes
}

/// Builds a minimal, valid ECMA-335 metadata blob: a header, a `#~` stream whose `valid` mask is
/// zero (no tables present), and a one-byte `#Strings` heap.
fn build_metadata() -> Vec<u8> {
  let mut header = Vec::new();

  header.extend_from_slice(&0x424A5342u32.to_le_bytes()); // "BSJB"
  header.extend_from_slice(&1u16.to_le_bytes()); // major
  header.extend_from_slice(&1u16.to_le_bytes()); // minor
  header.extend_from_slice(&0u32.to_le_bytes()); // reserved
  header.extend_from_slice(&4u32.to_le_bytes()); // version string length
  header.extend_from_slice(&[0u8; 4]); // version string, empty
  header.extend_from_slice(&0u16.to_le_bytes()); // flags
  header.extend_from_slice(&2u16.to_le_bytes()); // stream count

  let tables_data: Vec<u8> = {
    let mut d = Vec::new();

    d.extend_from_slice(&0u32.to_le_bytes()); // reserved0
    d.push(2); // major_version
    d.push(0); // minor_version
    d.push(0); // heap_sizes: narrow heaps
    d.push(1); // reserved1
    d.extend_from_slice(&0u64.to_le_bytes()); // valid: no tables present
    d.extend_from_slice(&0u64.to_le_bytes()); // sorted

    d
  };
  let strings_data: Vec<u8> = vec![0u8];

  // record("#~\0\0") + record("#Strings\0\0\0\0")
  let stream_headers_len = (4 + 4 + 4) + (4 + 4 + 12);
  let tables_offset = (header.len() + stream_headers_len) as u32;
  let strings_offset = tables_offset + tables_data.len() as u32;

  let mut stream_headers = Vec::new();

  stream_headers.extend_from_slice(&tables_offset.to_le_bytes());
  stream_headers.extend_from_slice(&(tables_data.len() as u32).to_le_bytes());
  stream_headers.extend_from_slice(b"#~\0\0");
  stream_headers.extend_from_slice(&strings_offset.to_le_bytes());
  stream_headers.extend_from_slice(&(strings_data.len() as u32).to_le_bytes());
  stream_headers.extend_from_slice(b"#Strings\0\0\0\0");

  let mut blob = header;

  blob.extend_from_slice(&stream_headers);
  blob.extend_from_slice(&tables_data);
  blob.extend_from_slice(&strings_data);

  blob
}

fn build_r2r_header(runtime_functions: (u32, u32), method_def_entry_points: (u32, u32)) -> Vec<u8> {
  let mut bytes = Vec::new();

  bytes.extend_from_slice(&R2R_SIGNATURE.to_le_bytes());
  bytes.extend_from_slice(&1u16.to_le_bytes()); // major_version
  bytes.extend_from_slice(&0u16.to_le_bytes()); // minor_version
  bytes.extend_from_slice(&0u32.to_le_bytes()); // flags
  bytes.extend_from_slice(&2u16.to_le_bytes()); // section count

  bytes.extend_from_slice(&SECTION_RUNTIME_FUNCTIONS.to_le_bytes());
  bytes.extend_from_slice(&runtime_functions.0.to_le_bytes());
  bytes.extend_from_slice(&runtime_functions.1.to_le_bytes());

  bytes.extend_from_slice(&SECTION_METHODDEF_ENTRYPOINTS.to_le_bytes());
  bytes.extend_from_slice(&method_def_entry_points.0.to_le_bytes());
  bytes.extend_from_slice(&method_def_entry_points.1.to_le_bytes());

  bytes
}

/// Lays out a full image: `RUNTIME_FUNCTIONS`, a shared 4-byte unwind blob, `METHODDEF_ENTRYPOINTS`
/// and finally the R2R header, with RVAs equal to file offsets throughout.
fn build_image() -> (Vec<u8>, u32) {
  let runtime_functions_rva = 0u32;
  let unwind_blob_rva = RUNTIME_FUNCTION_COUNT * 8;
  let method_def_entry_points = build_method_def_entry_points();
  let method_def_entry_points_rva = unwind_blob_rva + 4;
  let header_rva = method_def_entry_points_rva + method_def_entry_points.len() as u32;

  let header = build_r2r_header(
    (runtime_functions_rva, RUNTIME_FUNCTION_COUNT * 8),
    (method_def_entry_points_rva, method_def_entry_points.len() as u32),
  );

  let mut image = build_runtime_functions(unwind_blob_rva);

  image.extend_from_slice(&[0u8; 4]); // shared unwind blob
  image.extend_from_slice(&method_def_entry_points);
  image.extend_from_slice(&header);

  (image, header_rva)
}

struct TestPe<'a> {
  image: &'a [u8],
  metadata: &'a [u8],
  header_rva: u32,
  machine: u16,
}

impl<'a> PeAdapter<'a> for TestPe<'a> {
  fn data(&self) -> &'a [u8] {
    self.image
  }

  fn offset_of_rva(&self, rva: u32) -> Option<usize> {
    let offset = rva as usize;

    (offset <= self.image.len()).then_some(offset)
  }

  fn machine(&self) -> u16 {
    self.machine
  }

  fn image_base(&self) -> u64 {
    0x1400_0000
  }

  fn managed_native_header_directory(&self) -> Option<(u32, u32)> {
    Some((self.header_rva, 0))
  }

  fn is_il_library(&self) -> bool {
    true
  }

  fn export_rva(&self, _name: &[u8]) -> Option<u32> {
    None
  }

  fn metadata(&self) -> Result<MetadataReader<'a>, MetadataReadError> {
    MetadataReader::from_bytes(self.metadata)
  }
}

struct NoModules;

impl<'a> ModuleResolver<'a> for NoModules {
  fn resolve_override(&self, _ref_idx: u32) -> Option<&'a MetadataReader<'a>> {
    None
  }

  fn system_module(&self) -> Option<&'a MetadataReader<'a>> {
    None
  }
}

struct NoSignatures;

impl SignatureFormatter for NoSignatures {
  fn read_type_signature(&self, _bytes: &[u8], _offset: &mut usize) -> Option<String> {
    None
  }
}

/// Reads unwind info as a fixed 4-byte window and GC info as a fixed 1-byte window; real decoding
/// is out of scope for the container reader and lives behind [UnwindDecoder].
struct FixedWidthUnwind;

impl UnwindDecoder for FixedWidthUnwind {
  fn read_unwind<'a>(&self, image: &'a [u8], rva: u32, offset: usize) -> Option<UnwindInfo<'a>> {
    image.get(offset..offset + 4).map(|bytes| UnwindInfo { rva, bytes })
  }

  fn read_gc_info<'a>(
    &self,
    image: &'a [u8],
    offset: usize,
    _machine: MachineClass,
    _r2r_major_version: u16,
  ) -> Option<GcInfo<'a>> {
    image.get(offset..offset + 1).map(|bytes| GcInfo { bytes })
  }
}

#[test]
fn parses_methods_and_runtime_function_fragments() {
  let (image, header_rva) = build_image();
  let metadata = build_metadata();
  let pe = TestPe {
    image: &image,
    metadata: &metadata,
    header_rva,
    machine: 0x014c, // I386, untagged: Windows
  };

  let reader = R2RReader::new(pe, "synthetic.dll").unwrap();

  assert!(!reader.composite());
  assert_eq!(r2r::r2r::image::OperatingSystem::Windows, reader.operating_system());
  assert_eq!(r2r::r2r::image::CoffMachine::I386, reader.machine());
  assert_eq!(MachineClass::X86, reader.architecture());
  assert!(reader.primary_metadata().is_some());
  assert!(reader.component_headers().is_empty());
  assert_eq!(2, reader.ready_to_run_header().unwrap().sections.iter().count());

  let methods = reader.methods(&NoModules, &NoSignatures).unwrap();

  assert_eq!(ENTRY_POINT_IDS.len(), methods.len());

  for (i, method) in methods.iter().enumerate() {
    assert_eq!(i + 1, method.handle.index());
    assert_eq!(ENTRY_POINT_IDS[i], method.entry.runtime_function_id);
    assert_eq!(None, method.entry.fixup_offset);
  }

  assert!(reader.instance_methods(&NoModules, &NoSignatures).unwrap().is_empty());

  // id 0 owns fragment 1 (continuation); id 2 owns fragments 3 and 4; id 5 owns fragment 6.
  let expected_fragments = [(0usize, vec![0usize, 1]), (2, vec![2, 3, 4]), (5, vec![5, 6])];

  for (entry_id, fragment_ids) in expected_fragments {
    let fragments = reader.runtime_function_fragments(entry_id, &FixedWidthUnwind).unwrap();

    assert_eq!(fragment_ids.len(), fragments.len());

    for (fragment, expected_id) in fragments.iter().zip(fragment_ids) {
      assert_eq!(expected_id, fragment.id);
      assert_eq!((expected_id as u32) * 0x10, fragment.start_rva);
      assert_eq!(expected_id == entry_id, fragment.gc_info.is_some());
    }
  }

  assert!(reader.manifest_reference_assemblies().unwrap().is_empty());
  assert_eq!(None, reader.compiler_identifier().unwrap());
  assert!(reader.runtime_function_to_eh_info().unwrap().is_empty());
  assert!(reader.debug_info_array().unwrap().is_none());
}
