//! The manifest-metadata reference-assembly index space.
//!
//! Unifies two disjoint spaces — the primary reader's `AssemblyRef` rows, and a manifest reader's
//! `AssemblyRef` rows — into a single densely numbered index starting at 2.

use crate::metadata::streams::tables::id::RowId;
use crate::metadata::streams::tables::rows::AssemblyRefRow;
use crate::metadata::MetadataReader;

/// Either a row of the primary metadata reader, or a row of the manifest reader.
pub enum AssemblyReference<'a, 'm> {
  Primary(&'a MetadataReader<'a>, RowId<AssemblyRefRow>),
  Manifest(&'m MetadataReader<'m>, RowId<AssemblyRefRow>),
}

/// Resolves `ref_idx` against the primary reader's `AssemblyRef` row count (`primary_count`,
/// zero for composite images) and the manifest reader's own rows.
///
/// `ref_idx` of `0` or `1` is reserved and not resolvable through this function; callers must
/// reject those before calling.
pub fn resolve<'a, 'm>(
  ref_idx: u32,
  primary: Option<&'a MetadataReader<'a>>,
  primary_count: u32,
  manifest: &'m MetadataReader<'m>,
) -> Option<AssemblyReference<'a, 'm>> {
  if ref_idx <= primary_count {
    let primary = primary?;

    return Some(AssemblyReference::Primary(
      primary,
      RowId::new(ref_idx.checked_sub(1)? as usize),
    ));
  }

  let manifest_idx = ref_idx.checked_sub(primary_count)?.checked_sub(2)?;

  Some(AssemblyReference::Manifest(
    manifest,
    RowId::new(manifest_idx as usize),
  ))
}
