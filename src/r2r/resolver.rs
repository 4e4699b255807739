//! The external assembly resolver seam.
//!
//! The manifest metadata's `AssemblyRef` table only records the *name* of a referenced assembly
//! (spec §4.9); turning that into the other assembly's own metadata requires a binder-style
//! probing policy (GAC, app-local, framework directories, ...) that has nothing to do with
//! parsing an R2R container. [AssemblyResolver] is the seam a caller supplies; the core never
//! probes the filesystem itself.

use crate::metadata::streams::tables::id::RowId;
use crate::metadata::streams::tables::rows::AssemblyRefRow;
use crate::metadata::MetadataReader;

/// Resolves an `AssemblyRef` row to the referenced assembly's own [MetadataReader].
pub trait AssemblyResolver<'a> {
  /// Resolves `handle` (a row of `referrer`'s `AssemblyRef` table) to the metadata of the
  /// assembly it names.
  ///
  /// Returns `None` if the assembly cannot be located; the caller then surfaces
  /// [crate::r2r::errors::ReadR2RError::MissingReferenceAssembly] rather than failing the whole
  /// read.
  fn resolve(
    &self,
    referrer: &MetadataReader<'_>,
    handle: RowId<AssemblyRefRow>,
  ) -> Option<&'a MetadataReader<'a>>;
}
