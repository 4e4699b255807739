//! The `InstanceMethod` entrypoint parser: generic/instantiated methods, keyed by a
//! [NativeHashtable] rather than a [NativeArray].

use crate::bytes::{ByteSliceExt, NativeUnsigned};
use crate::metadata::streams::tables::id::RowId;
use crate::metadata::streams::tables::rows::{MemberRefRow, MethodDefRow};
use crate::metadata::MetadataReader;
use crate::r2r::errors::{BadImageError, ReadR2RError};
use crate::r2r::methods::{decode_entry_point, MethodEntryPoint};
use crate::r2r::native_hashtable::NativeHashtable;

const OWNER_TYPE: u32 = 0x01;
const SLOT_INSTEAD_OF_TOKEN: u32 = 0x02;
const MEMBER_REF_TOKEN: u32 = 0x04;
const METHOD_INSTANTIATION: u32 = 0x08;
const CONSTRAINED: u32 = 0x10;

/// A marker byte at the start of an owning-type signature indicating the signature overrides the
/// active metadata reader: what follows is a 1-based assembly-reference index, then the real
/// owning-type signature read against the referenced module.
const MODULE_OVERRIDE_MARKER: u8 = 0x3f;

/// Renders ECMA-335 type signatures into display strings.
///
/// Full signature parsing is out of scope for the R2R container parser; this is the seam a
/// caller plugs a real signature decoder into.
pub trait SignatureFormatter {
  /// Reads and renders one type signature starting at `offset`, advancing it past the signature.
  fn read_type_signature(&self, bytes: &[u8], offset: &mut usize) -> Option<String>;
}

/// Either a `MethodDef` or `MemberRef` handle, depending on the `MemberRefToken` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodHandle {
  MethodDef(RowId<MethodDefRow>),
  MemberRef(RowId<MemberRefRow>),
}

/// A generic/instantiated method entrypoint.
pub struct InstanceMethod<'a> {
  pub handle: MethodHandle,
  pub owning_type: Option<String>,
  pub method_type_args: Vec<String>,
  pub constrained_type: Option<String>,
  pub entry: MethodEntryPoint,
  pub bucket: u8,
  pub reader: &'a MetadataReader<'a>,
}

/// Resolves the metadata reader a module-override opcode names, or the system module
/// (`System.Private.CoreLib`) when `composite` and no override applies.
pub trait ModuleResolver<'a> {
  fn resolve_override(&self, ref_idx: u32) -> Option<&'a MetadataReader<'a>>;
  fn system_module(&self) -> Option<&'a MetadataReader<'a>>;
}

/// Decodes one `InSTANCE_METHOD_ENTRYPOINTS` hashtable entry per spec §4.8.
fn decode_instance_method<'a>(
  bytes: &[u8],
  offset: &mut usize,
  default_reader: &'a MetadataReader<'a>,
  resolver: &impl ModuleResolver<'a>,
  signatures: &impl SignatureFormatter,
  composite: bool,
) -> Result<InstanceMethod<'a>, ReadR2RError> {
  let flags = bytes
    .read::<u32>(offset)
    .ok_or(BadImageError::Truncated)?;

  let mut reader = default_reader;
  let mut owning_type = None;

  if flags & OWNER_TYPE != 0 {
    if bytes.get(*offset) == Some(&MODULE_OVERRIDE_MARKER) {
      *offset += 1;

      let ref_idx = bytes
        .read_with::<u32, _>(offset, NativeUnsigned)
        .ok_or(BadImageError::Truncated)?;

      reader = resolver
        .resolve_override(ref_idx)
        .ok_or(ReadR2RError::MissingReferenceAssembly(ref_idx))?;
    } else if composite {
      reader = resolver
        .system_module()
        .ok_or(ReadR2RError::MissingReferenceAssembly(0))?;
    }

    owning_type = Some(
      signatures
        .read_type_signature(bytes, offset)
        .ok_or(BadImageError::Truncated)?,
    );
  }

  if flags & SLOT_INSTEAD_OF_TOKEN != 0 {
    return Err(ReadR2RError::NotImplemented("SlotInsteadOfToken instance method entries"));
  }

  let rid = bytes
    .read_with::<u32, _>(offset, NativeUnsigned)
    .ok_or(BadImageError::Truncated)?;

  let handle = if flags & MEMBER_REF_TOKEN != 0 {
    MethodHandle::MemberRef(RowId::new(rid as usize))
  } else {
    MethodHandle::MethodDef(RowId::new(rid as usize))
  };

  let mut method_type_args = Vec::new();

  if flags & METHOD_INSTANTIATION != 0 {
    let n = bytes
      .read_with::<u32, _>(offset, NativeUnsigned)
      .ok_or(BadImageError::Truncated)?;

    for _ in 0..n {
      method_type_args.push(
        signatures
          .read_type_signature(bytes, offset)
          .ok_or(BadImageError::Truncated)?,
      );
    }
  }

  let mut constrained_type = None;

  if flags & CONSTRAINED != 0 {
    constrained_type = Some(
      signatures
        .read_type_signature(bytes, offset)
        .ok_or(BadImageError::Truncated)?,
    );
  }

  let entry = decode_entry_point(bytes, offset).ok_or(BadImageError::Truncated)?;

  Ok(InstanceMethod {
    handle,
    owning_type,
    method_type_args,
    constrained_type,
    entry,
    bucket: 0,
    reader,
  })
}

/// Walks an `INSTANCE_METHOD_ENTRYPOINTS` [NativeHashtable], decoding every entry.
///
/// Per spec, an out-of-range `runtime_function_id` is *not* fatal here (unlike the `MethodDef`
/// path): the entry is still produced but its entrypoint bit is left unset.
pub fn parse_instance_method_entry_points<'a>(
  image: &[u8],
  table: &NativeHashtable<'_>,
  default_reader: &'a MetadataReader<'a>,
  resolver: &impl ModuleResolver<'a>,
  signatures: &impl SignatureFormatter,
  composite: bool,
  is_entry_point: &mut [bool],
) -> Result<Vec<InstanceMethod<'a>>, ReadR2RError> {
  let mut methods = Vec::new();

  for entry in table.enumerate_all() {
    let mut offset = entry.payload_offset;
    let mut method = decode_instance_method(
      image,
      &mut offset,
      default_reader,
      resolver,
      signatures,
      composite,
    )?;

    method.bucket = entry.low_hashcode;

    if let Some(flag) = is_entry_point.get_mut(method.entry.runtime_function_id as usize) {
      *flag = true;
    }

    methods.push(method);
  }

  Ok(methods)
}
