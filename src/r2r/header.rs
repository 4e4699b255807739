//! The R2R header and its section directory.

use crate::bytes::{ByteSliceExt, FromBytes};
use crate::r2r::errors::BadImageError;
use std::collections::BTreeMap;

/// The magic signature at the start of every [R2RHeader]: the bytes `R`, `T`, `R`, `\0`.
pub const R2R_SIGNATURE: u32 = 0x0052_5452;

/// A named section of an R2R header: the type tag plus its (RVA, size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
  CompilerIdentifier,
  ImportSections,
  RuntimeFunctions,
  MethodDefEntryPoints,
  ExceptionInfo,
  DebugInfo,
  AvailableTypes,
  InstanceMethodEntryPoints,
  ManifestMetadata,
  Assemblies,
}

impl SectionType {
  fn from_raw(raw: u16) -> Option<Self> {
    match raw {
      100 => Some(Self::CompilerIdentifier),
      101 => Some(Self::ImportSections),
      102 => Some(Self::RuntimeFunctions),
      103 => Some(Self::MethodDefEntryPoints),
      104 => Some(Self::ExceptionInfo),
      105 => Some(Self::DebugInfo),
      106 => Some(Self::AvailableTypes),
      107 => Some(Self::InstanceMethodEntryPoints),
      108 => Some(Self::ManifestMetadata),
      109 => Some(Self::Assemblies),
      _ => None,
    }
  }
}

/// A section's location within the image: RVA and byte size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
  pub rva: u32,
  pub size: u32,
}

impl<'a> FromBytes<'a> for Section {
  fn from_bytes(buf: &'a [u8], offset: &mut usize, _: ()) -> Option<Self> {
    Some(Self {
      rva: buf.read(offset)?,
      size: buf.read(offset)?,
    })
  }
}

/// A section directory: an owned map from [SectionType] to [Section], rejecting duplicate types.
#[derive(Debug, Clone, Default)]
pub struct SectionDirectory(BTreeMap<SectionType, Section>);

impl SectionDirectory {
  fn parse(
    buf: &[u8],
    offset: &mut usize,
    count: u16,
  ) -> Result<Self, BadImageError> {
    let mut sections = BTreeMap::new();

    for _ in 0..count {
      let ty = buf.read::<u16>(offset).ok_or(BadImageError::Truncated)?;
      let section = buf.read::<Section>(offset).ok_or(BadImageError::Truncated)?;

      let Some(ty) = SectionType::from_raw(ty) else {
        continue;
      };

      if sections.insert(ty, section).is_some() {
        return Err(BadImageError::DuplicateSectionType(ty));
      }
    }

    Ok(Self(sections))
  }

  /// Returns the [Section] recorded for `ty`, if present.
  pub fn get(&self, ty: SectionType) -> Option<Section> {
    self.0.get(&ty).copied()
  }

  /// Iterates over every `(SectionType, Section)` pair present in the directory.
  pub fn iter(&self) -> impl Iterator<Item = (SectionType, Section)> + '_ {
    self.0.iter().map(|(ty, s)| (*ty, *s))
  }

  /// Returns the [Section] for `ty`, or a [BadImageError::MissingSection] error.
  pub fn require(&self, ty: SectionType) -> Result<Section, BadImageError> {
    self.get(ty).ok_or(BadImageError::MissingSection(ty))
  }
}

impl PartialOrd for SectionType {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for SectionType {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    (*self as u8).cmp(&(*other as u8))
  }
}

/// The top-level R2R header: signature, version, flags and the section directory.
#[derive(Debug, Clone)]
pub struct R2RHeader {
  pub major_version: u16,
  pub minor_version: u16,
  pub flags: u32,
  pub sections: SectionDirectory,
}

impl R2RHeader {
  /// Parses an [R2RHeader] from `buf`, which must begin exactly at the header's start RVA.
  pub fn from_bytes(buf: &[u8]) -> Result<Self, BadImageError> {
    let offset = &mut 0;
    let signature = buf.read::<u32>(offset).ok_or(BadImageError::Truncated)?;

    if signature != R2R_SIGNATURE {
      return Err(BadImageError::MissingRtrHeader);
    }

    let major_version = buf.read::<u16>(offset).ok_or(BadImageError::Truncated)?;
    let minor_version = buf.read::<u16>(offset).ok_or(BadImageError::Truncated)?;
    let flags = buf.read::<u32>(offset).ok_or(BadImageError::Truncated)?;
    let count = buf.read::<u16>(offset).ok_or(BadImageError::Truncated)?;
    let sections = SectionDirectory::parse(buf, offset, count)?;

    Ok(Self {
      major_version,
      minor_version,
      flags,
      sections,
    })
  }
}

/// A per-component header for composite images: identical shape to [R2RHeader] minus the
/// top-level signature, keyed to a component instead of the whole image.
#[derive(Debug, Clone)]
pub struct CoreHeader {
  pub sections: SectionDirectory,
}

impl CoreHeader {
  /// Parses a [CoreHeader] from `buf`, which must begin exactly at the component's header RVA.
  pub fn from_bytes(buf: &[u8]) -> Result<Self, BadImageError> {
    let offset = &mut 0;
    let count = buf.read::<u16>(offset).ok_or(BadImageError::Truncated)?;
    let sections = SectionDirectory::parse(buf, offset, count)?;

    Ok(Self { sections })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn build_header(sections: &[(u16, u32, u32)]) -> Vec<u8> {
    let mut buf = R2R_SIGNATURE.to_le_bytes().to_vec();

    buf.extend_from_slice(&1u16.to_le_bytes()); // major
    buf.extend_from_slice(&0u16.to_le_bytes()); // minor
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags
    buf.extend_from_slice(&(sections.len() as u16).to_le_bytes());

    for (ty, rva, size) in sections {
      buf.extend_from_slice(&ty.to_le_bytes());
      buf.extend_from_slice(&rva.to_le_bytes());
      buf.extend_from_slice(&size.to_le_bytes());
    }

    buf
  }

  #[test]
  fn test_parses_section_directory() {
    let bytes = build_header(&[(102, 0x100, 0x50), (103, 0x200, 0x30)]);
    let header = R2RHeader::from_bytes(&bytes).unwrap();

    assert_eq!(
      Some(Section { rva: 0x100, size: 0x50 }),
      header.sections.get(SectionType::RuntimeFunctions)
    );
    assert_eq!(
      Some(Section { rva: 0x200, size: 0x30 }),
      header.sections.get(SectionType::MethodDefEntryPoints)
    );
    assert_eq!(None, header.sections.get(SectionType::DebugInfo));
  }

  #[test]
  fn test_duplicate_section_type_is_rejected() {
    let bytes = build_header(&[(102, 0x100, 0x50), (102, 0x200, 0x30)]);

    assert!(matches!(
      R2RHeader::from_bytes(&bytes),
      Err(BadImageError::DuplicateSectionType(SectionType::RuntimeFunctions))
    ));
  }

  #[test]
  fn test_bad_signature_is_rejected() {
    let mut bytes = build_header(&[]);
    bytes[0] = 0xff;

    assert!(matches!(
      R2RHeader::from_bytes(&bytes),
      Err(BadImageError::MissingRtrHeader)
    ));
  }
}
