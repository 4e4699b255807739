//! The external name-formatter seam.
//!
//! Rendering a metadata handle or an import-cell fixup signature into a display string requires
//! either full ECMA-335 name resolution (namespaces, nesting, generic arity) or decoding a fixup
//! blob against the loader's binder — both explicitly out of scope for the R2R container parser
//! (spec §1, §9). [NameFormatter] is the seam a caller plugs a real implementation into; the core
//! only calls through it.

use crate::metadata::streams::tables::id::RowId;
use crate::metadata::streams::tables::rows::{ExportedTypeRow, TypeDefRow};
use crate::metadata::MetadataReader;

/// Either row kind an `AVAILABLE_TYPES` entry can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHandle {
  TypeDef(RowId<TypeDefRow>),
  ExportedType(RowId<ExportedTypeRow>),
}

/// Renders metadata handles and import-cell signatures into display strings.
pub trait NameFormatter {
  /// Renders a [TypeHandle] (a `TypeDef` or `ExportedType` row) against `reader`.
  ///
  /// Returns `None` on a malformed token; per spec §7, callers treat this as "skip the entry"
  /// rather than a fatal error.
  fn format_type_handle(&self, reader: &MetadataReader<'_>, handle: TypeHandle) -> Option<String>;

  /// Renders the fixup signature at `signature_rva` (an `IMPORT_SECTIONS` entry's symbolic name).
  fn format_import_cell(&self, image: &[u8], signature_rva: u32) -> Option<String>;
}
