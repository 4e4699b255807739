//! The `IMPORT_SECTIONS` section: fixup cell tables and their symbolic names.
//!
//! Spec §4.10: each record in the section directory's `IMPORT_SECTIONS` entry names one fixup
//! cell table (an array of machine-word slots the loader patches at bind time) and a parallel
//! signature table (one RVA per cell, naming what the loader should bind that cell to).

use crate::bytes::{ByteSliceExt, FromBytes};
use crate::r2r::errors::BadImageError;
use crate::r2r::format::NameFormatter;
use crate::r2r::image::MachineClass;
use std::collections::BTreeMap;

/// The on-disk size, in bytes, of one [ImportSectionHeader] record.
pub const RECORD_STRIDE: usize = 20;

/// One `IMPORT_SECTIONS` directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSectionHeader {
  pub rva: u32,
  pub size: u32,
  pub flags: u16,
  pub ty: u8,
  pub entry_size: u8,
  pub signatures_rva: u32,
  pub aux_data_rva: u32,
}

impl<'a> FromBytes<'a> for ImportSectionHeader {
  fn from_bytes(buf: &'a [u8], offset: &mut usize, _: ()) -> Option<Self> {
    Some(Self {
      rva: buf.read(offset)?,
      size: buf.read(offset)?,
      flags: buf.read(offset)?,
      ty: buf.read(offset)?,
      entry_size: buf.read(offset)?,
      signatures_rva: buf.read(offset)?,
      aux_data_rva: buf.read(offset)?,
    })
  }
}

/// Derives the fixup-cell width for `machine` when a record's `entry_size` is `0`.
fn default_entry_size(machine: MachineClass) -> u8 {
  match machine {
    MachineClass::X86 | MachineClass::Arm32 => 4,
    MachineClass::X64 | MachineClass::Arm64 => 8,
  }
}

fn read_cell(buf: &[u8], offset: usize, entry_size: u8) -> Option<i64> {
  match entry_size {
    4 => {
      let mut o = offset;
      buf.read::<u32>(&mut o).map(|v| v as i32 as i64)
    }
    8 => {
      let mut o = offset;
      buf.read::<u64>(&mut o).map(|v| v as i64)
    }
    _ => None,
  }
}

/// A single fixup cell: its RVA within the image, the raw machine-word value presently stored
/// there, and the symbolic name resolved from its signature (if the formatter could render one).
#[derive(Debug, Clone)]
pub struct ImportCell {
  pub rva: u32,
  pub raw_value: i64,
  pub signature_rva: u32,
  pub name: Option<String>,
}

/// A parsed `IMPORT_SECTIONS` record, with its cells read and named.
#[derive(Debug, Clone)]
pub struct ImportSection {
  pub header: ImportSectionHeader,
  pub cells: Vec<ImportCell>,
}

/// Parses every record of an `IMPORT_SECTIONS` section.
///
/// `section_bytes` is the section's own bytes (the directory of records); `image` is the whole
/// image buffer, needed to read each record's cell table and signature table via `offset_of_rva`.
/// Also accumulates the image-wide cell-RVA → symbolic-name map spec §4.10 describes.
pub fn parse_import_sections(
  image: &[u8],
  section_bytes: &[u8],
  machine: MachineClass,
  offset_of_rva: impl Fn(u32) -> Option<usize>,
  formatter: &impl NameFormatter,
) -> Result<(Vec<ImportSection>, BTreeMap<u32, String>), BadImageError> {
  let mut sections = Vec::new();
  let mut cell_names = BTreeMap::new();
  let mut offset = 0;

  while offset + RECORD_STRIDE <= section_bytes.len() {
    let header = section_bytes
      .read::<ImportSectionHeader>(&mut offset)
      .ok_or(BadImageError::Truncated)?;

    let entry_size = if header.entry_size == 0 {
      default_entry_size(machine)
    } else {
      header.entry_size
    };

    if entry_size != 4 && entry_size != 8 {
      return Err(BadImageError::Truncated);
    }

    let count = header.size as usize / entry_size as usize;
    let cells_base = offset_of_rva(header.rva).ok_or(BadImageError::OutOfRangeRva(header.rva))?;
    let signatures_base = if header.signatures_rva != 0 {
      Some(offset_of_rva(header.signatures_rva).ok_or(BadImageError::OutOfRangeRva(header.signatures_rva))?)
    } else {
      None
    };

    let mut cells = Vec::with_capacity(count);

    for i in 0..count {
      let cell_rva = header.rva + (i * entry_size as usize) as u32;
      let raw_value = read_cell(image, cells_base + i * entry_size as usize, entry_size)
        .ok_or(BadImageError::Truncated)?;

      let signature_rva = signatures_base
        .and_then(|base| image.get(base + i * 4..).and_then(|rest| rest.read::<u32>(&mut 0)))
        .unwrap_or(0);

      let name = formatter.format_import_cell(image, signature_rva);

      if let Some(name) = &name {
        cell_names.insert(cell_rva, name.clone());
      }

      cells.push(ImportCell {
        rva: cell_rva,
        raw_value,
        signature_rva,
        name,
      });
    }

    sections.push(ImportSection { header, cells });
  }

  Ok((sections, cell_names))
}
