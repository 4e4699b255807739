//! PE utilities for the [object] crate.

#[cfg(feature = "read")]
#[doc(inline)]
pub use read::*;

#[cfg(feature = "read")]
#[doc(hidden)]
mod read {
  use crate::bytes::ByteSliceExt;
  use crate::metadata::errors::MetadataReadError;
  use crate::metadata::MetadataReader;
  use crate::pe::errors::ReadManagedPeError;
  use crate::pe::headers::CliHeader;
  use object::pe::{ImageNtHeaders32, ImageNtHeaders64};
  use object::read::pe::{ImageNtHeaders, PeFile};

  pub type ManagedPeFile32<'a> = ManagedPeFile<'a, ImageNtHeaders32>;
  pub type ManagedPeFile64<'a> = ManagedPeFile<'a, ImageNtHeaders64>;

  /// A PE object file with a CIL metadata data directory.
  pub struct ManagedPeFile<'a, Pe>
  where
    Pe: ImageNtHeaders,
  {
    pe: PeFile<'a, Pe, &'a [u8]>,
    header: CliHeader,
  }

  impl<'a, Pe> ManagedPeFile<'a, Pe>
  where
    Pe: ImageNtHeaders,
  {
    /// Returns the [ManagedPeFile] from the given data.
    pub fn from_data(data: &'a [u8]) -> Result<Self, ReadManagedPeError> {
      Self::from_pe(PeFile::parse(data)?)
    }

    /// Returns the [ManagedPeFile] from the given [PeFile].
    pub fn from_pe(pe: PeFile<'a, Pe, &'a [u8]>) -> Result<Self, ReadManagedPeError> {
      let directory = pe
        .data_directories()
        .get(14)
        .ok_or(ReadManagedPeError::MissingCliHeader)?;

      let data = directory
        .data(pe.data(), &pe.section_table())
        .map_err(|_| ReadManagedPeError::MissingCliHeader)?;

      let header = data
        .read::<CliHeader>(&mut 0)
        .ok_or(ReadManagedPeError::MissingCliHeader)?;

      Ok(Self { pe, header })
    }

    /// Returns the [MetadataReader] for this PE file.
    pub fn metadata(&self) -> Result<MetadataReader, MetadataReadError> {
      let metadata = self.header.metadata;
      let data = self
        .pe
        .section_table()
        .pe_data_at(self.pe.data(), metadata.virtual_address)
        .ok_or(MetadataReadError::NotEnough)?
        .get(..metadata.size as _)
        .ok_or(MetadataReadError::NotEnough)?;

      MetadataReader::from_bytes(data)
    }

    /// Returns the [CliHeader] for this PE file.
    pub const fn cli_header(&self) -> &CliHeader {
      &self.header
    }

    /// Returns the raw COFF machine constant for this PE file.
    pub fn machine(&self) -> u16 {
      self.pe.nt_headers().file_header().machine.get(object::LittleEndian)
    }

    /// Returns the CLI runtime flags from the CLI header, e.g. to check `IL_LIBRARY`.
    pub fn cor_flags(&self) -> crate::pe::headers::CliRuntimeFlags {
      self.header.flags
    }

    /// Returns the image's preferred load address.
    pub fn image_base(&self) -> u64 {
      self.pe.relative_address_base()
    }

    /// Returns the full PE image bytes.
    pub fn data(&self) -> &'a [u8] {
      self.pe.data()
    }

    /// Translates an RVA to a file offset within [Self::data], by locating the section that
    /// contains it.
    ///
    /// Returns `None` if the RVA does not fall inside any section.
    pub fn offset_of_rva(&self, rva: u32) -> Option<usize> {
      let data = self.pe.data();
      let at = self.pe.section_table().pe_data_at(data, rva)?;

      Some(at.as_ptr() as usize - data.as_ptr() as usize)
    }

    /// Looks up an export by name and returns its RVA.
    ///
    /// Used to locate the `RTR_HEADER` export on images that embed a managed-native header
    /// without a CLI data directory pointing at it (composite R2R images).
    pub fn export_rva(&self, name: &[u8]) -> Option<u32> {
      use object::read::Object;

      let exports = self.pe.exports().ok()?;
      let image_base = self.pe.relative_address_base();

      exports.iter().find(|e| e.name() == name).map(|e| {
        let addr = e.address();

        u32::try_from(addr.saturating_sub(image_base)).unwrap_or(addr as u32)
      })
    }
  }
}
