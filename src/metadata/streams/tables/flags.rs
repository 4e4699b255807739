//! ECMA-335 II.23.1 attribute flag and enumeration types used by table rows.

use crate::bytes::bitflags;

bitflags! {
  /// ECMA-335 II.23.1.15 `TypeAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct TypeAttributes: u32 {
    const VISIBILITY_MASK = 0x0000_0007;
    const NOT_PUBLIC = 0x0000_0000;
    const PUBLIC = 0x0000_0001;
    const NESTED_PUBLIC = 0x0000_0002;
    const NESTED_PRIVATE = 0x0000_0003;
    const NESTED_FAMILY = 0x0000_0004;
    const NESTED_ASSEMBLY = 0x0000_0005;
    const NESTED_FAM_AND_ASSEM = 0x0000_0006;
    const NESTED_FAM_OR_ASSEM = 0x0000_0007;
    const LAYOUT_MASK = 0x0000_0018;
    const AUTO_LAYOUT = 0x0000_0000;
    const SEQUENTIAL_LAYOUT = 0x0000_0008;
    const EXPLICIT_LAYOUT = 0x0000_0010;
    const CLASS_SEMANTICS_MASK = 0x0000_0020;
    const CLASS = 0x0000_0000;
    const INTERFACE = 0x0000_0020;
    const ABSTRACT = 0x0000_0080;
    const SEALED = 0x0000_0100;
    const SPECIAL_NAME = 0x0000_0400;
    const IMPORT = 0x0000_1000;
    const SERIALIZABLE = 0x0000_2000;
    const STRING_FORMAT_MASK = 0x0003_0000;
    const ANSI_CLASS = 0x0000_0000;
    const UNICODE_CLASS = 0x0001_0000;
    const AUTO_CLASS = 0x0002_0000;
    const CUSTOM_FORMAT_CLASS = 0x0003_0000;
    const BEFORE_FIELD_INIT = 0x0010_0000;
    const RT_SPECIAL_NAME = 0x0000_0800;
    const HAS_SECURITY = 0x0004_0000;
    const IS_TYPE_FORWARDER = 0x0020_0000;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.5 `FieldAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct FieldAttributes: u16 {
    const FIELD_ACCESS_MASK = 0x0007;
    const PRIVATE_SCOPE = 0x0000;
    const PRIVATE = 0x0001;
    const FAM_AND_ASSEM = 0x0002;
    const ASSEMBLY = 0x0003;
    const FAMILY = 0x0004;
    const FAM_OR_ASSEM = 0x0005;
    const PUBLIC = 0x0006;
    const STATIC = 0x0010;
    const INIT_ONLY = 0x0020;
    const LITERAL = 0x0040;
    const NOT_SERIALIZED = 0x0080;
    const SPECIAL_NAME = 0x0200;
    const PINVOKE_IMPL = 0x2000;
    const RT_SPECIAL_NAME = 0x0400;
    const HAS_FIELD_MARSHAL = 0x1000;
    const HAS_DEFAULT = 0x8000;
    const HAS_FIELD_RVA = 0x0100;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.10 `MethodAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct MethodAttributes: u16 {
    const MEMBER_ACCESS_MASK = 0x0007;
    const PRIVATE_SCOPE = 0x0000;
    const PRIVATE = 0x0001;
    const FAM_AND_ASSEM = 0x0002;
    const ASSEM = 0x0003;
    const FAMILY = 0x0004;
    const FAM_OR_ASSEM = 0x0005;
    const PUBLIC = 0x0006;
    const STATIC = 0x0010;
    const FINAL = 0x0020;
    const VIRTUAL = 0x0040;
    const HIDE_BY_SIG = 0x0080;
    const VTABLE_LAYOUT_MASK = 0x0100;
    const REUSE_SLOT = 0x0000;
    const NEW_SLOT = 0x0100;
    const STRICT = 0x0200;
    const ABSTRACT = 0x0400;
    const SPECIAL_NAME = 0x0800;
    const PINVOKE_IMPL = 0x2000;
    const UNMANAGED_EXPORT = 0x0008;
    const RT_SPECIAL_NAME = 0x1000;
    const HAS_SECURITY = 0x4000;
    const REQUIRE_SEC_OBJECT = 0x8000;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.11 `MethodImplAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct MethodImplAttributes: u16 {
    const CODE_TYPE_MASK = 0x0003;
    const IL = 0x0000;
    const NATIVE = 0x0001;
    const OPTIL = 0x0002;
    const RUNTIME = 0x0003;
    const MANAGED_MASK = 0x0004;
    const UNMANAGED = 0x0004;
    const MANAGED = 0x0000;
    const FORWARD_REF = 0x0010;
    const PRESERVE_SIG = 0x0080;
    const INTERNAL_CALL = 0x1000;
    const SYNCHRONIZED = 0x0020;
    const NO_INLINING = 0x0008;
    const MAX_METHOD_IMPL_VAL = 0xffff;
    const NO_OPTIMIZATION = 0x0040;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.2 `AssemblyFlags`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct AssemblyFlags: u32 {
    const PUBLIC_KEY = 0x0001;
    const RETARGETABLE = 0x0100;
    const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
    const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.4 `EventAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct EventAttributes: u16 {
    const SPECIAL_NAME = 0x0200;
    const RT_SPECIAL_NAME = 0x0400;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.6 `FileAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct FileAttributes: u32 {
    const CONTAINS_META_DATA = 0x0000;
    const CONTAINS_NO_META_DATA = 0x0001;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.7 `GenericParamAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct GenericParamAttributes: u16 {
    const VARIANCE_MASK = 0x0003;
    const NONE = 0x0000;
    const COVARIANT = 0x0001;
    const CONTRAVARIANT = 0x0002;
    const SPECIAL_CONSTRAINT_MASK = 0x001c;
    const REFERENCE_TYPE_CONSTRAINT = 0x0004;
    const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
    const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.8 `PInvokeAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct PInvokeAttributes: u16 {
    const NO_MANGLE = 0x0001;
    const CHAR_SET_MASK = 0x0006;
    const CHAR_SET_NOT_SPEC = 0x0000;
    const CHAR_SET_ANSI = 0x0002;
    const CHAR_SET_UNICODE = 0x0004;
    const CHAR_SET_AUTO = 0x0006;
    const SUPPORTS_LAST_ERROR = 0x0040;
    const CALL_CONV_MASK = 0x0700;
    const CALL_CONV_WINAPI = 0x0100;
    const CALL_CONV_CDECL = 0x0200;
    const CALL_CONV_STDCALL = 0x0300;
    const CALL_CONV_THISCALL = 0x0400;
    const CALL_CONV_FASTCALL = 0x0500;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.12 `MethodSemanticsAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct MethodSemanticsAttributes: u16 {
    const SETTER = 0x0001;
    const GETTER = 0x0002;
    const OTHER = 0x0004;
    const ADD_ON = 0x0008;
    const REMOVE_ON = 0x0010;
    const FIRE = 0x0020;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.13 `ParamAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct ParamAttributes: u16 {
    const IN = 0x0001;
    const OUT = 0x0002;
    const OPTIONAL = 0x0010;
    const HAS_DEFAULT = 0x1000;
    const HAS_FIELD_MARSHAL = 0x2000;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.14 `PropertyAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct PropertyAttributes: u16 {
    const SPECIAL_NAME = 0x0200;
    const RT_SPECIAL_NAME = 0x0400;
    const HAS_DEFAULT = 0x1000;
  }
}

bitflags! {
  /// ECMA-335 II.23.1.16 `ManifestResourceAttributes`.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct ManifestResourceAttributes: u32 {
    const VISIBILITY_MASK = 0x0007;
    const PUBLIC = 0x0001;
    const PRIVATE = 0x0002;
  }
}

/// ECMA-335 II.23.1.1 `AssemblyHashAlgorithm`.
///
/// Not a bit field; a small enumeration of known hash algorithm ids, stored as a raw `u32` so
/// unrecognized values (reserved for future use) still round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyHashAlgorithm(pub u32);

impl AssemblyHashAlgorithm {
  pub const NONE: Self = Self(0x0000_0000);
  pub const MD5: Self = Self(0x0000_8003);
  pub const SHA1: Self = Self(0x0000_8004);
}

#[cfg(feature = "read")]
impl<'a> crate::bytes::FromBytes<'a, ()> for AssemblyHashAlgorithm {
  #[inline]
  fn from_bytes(buf: &'a [u8], offset: &mut usize, _: ()) -> Option<Self> {
    use crate::bytes::ByteSliceExt;

    Some(Self(buf.read::<u32>(offset)?))
  }
}

impl crate::bytes::ByteSize<()> for AssemblyHashAlgorithm {
  #[inline]
  fn byte_size(_: ()) -> usize {
    core::mem::size_of::<u32>()
  }
}

/// ECMA-335 II.23.1.16 `ElementType`, restricted to the single-byte tag used by the `Constant`
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementType(pub u8);

impl ElementType {
  pub const BOOLEAN: Self = Self(0x02);
  pub const CHAR: Self = Self(0x03);
  pub const I1: Self = Self(0x04);
  pub const U1: Self = Self(0x05);
  pub const I2: Self = Self(0x06);
  pub const U2: Self = Self(0x07);
  pub const I4: Self = Self(0x08);
  pub const U4: Self = Self(0x09);
  pub const I8: Self = Self(0x0a);
  pub const U8: Self = Self(0x0b);
  pub const R4: Self = Self(0x0c);
  pub const R8: Self = Self(0x0d);
  pub const STRING: Self = Self(0x0e);
  pub const CLASS: Self = Self(0x12);
}

#[cfg(feature = "read")]
impl<'a> crate::bytes::FromBytes<'a, ()> for ElementType {
  #[inline]
  fn from_bytes(buf: &'a [u8], offset: &mut usize, _: ()) -> Option<Self> {
    use crate::bytes::ByteSliceExt;

    Some(Self(buf.read::<u8>(offset)?))
  }
}

impl crate::bytes::ByteSize<()> for ElementType {
  #[inline]
  fn byte_size(_: ()) -> usize {
    core::mem::size_of::<u8>()
  }
}

#[cfg(feature = "read")]
mod row_field {
  use super::super::table::RowField;
  use super::{AssemblyHashAlgorithm, ElementType};
  use crate::bytes::{ByteSize, FromBytes};
  use crate::metadata::headers::MetadataTablesHeader;

  macro_rules! simple_row_field {
    ($ty:ty) => {
      impl RowField for $ty {
        #[inline]
        fn row_read(buf: &[u8], offset: &mut usize, _: &MetadataTablesHeader) -> Option<Self> {
          <$ty as FromBytes<'_, ()>>::from_bytes(buf, offset, ())
        }

        #[inline]
        fn row_size(_: &MetadataTablesHeader) -> usize {
          <$ty as ByteSize<()>>::byte_size(())
        }
      }
    };
  }

  simple_row_field!(super::TypeAttributes);
  simple_row_field!(super::FieldAttributes);
  simple_row_field!(super::MethodAttributes);
  simple_row_field!(super::MethodImplAttributes);
  simple_row_field!(super::AssemblyFlags);
  simple_row_field!(super::EventAttributes);
  simple_row_field!(super::FileAttributes);
  simple_row_field!(super::GenericParamAttributes);
  simple_row_field!(super::PInvokeAttributes);
  simple_row_field!(super::MethodSemanticsAttributes);
  simple_row_field!(super::ParamAttributes);
  simple_row_field!(super::PropertyAttributes);
  simple_row_field!(super::ManifestResourceAttributes);
  simple_row_field!(AssemblyHashAlgorithm);
  simple_row_field!(ElementType);
}
