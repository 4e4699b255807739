//! ECMA-335 metadata physical layout.

pub mod errors;
pub mod headers;
pub mod streams;

#[cfg(feature = "read")]
#[doc(inline)]
pub use read::*;

#[cfg(feature = "read")]
#[doc(hidden)]
mod read {
  use super::errors::MetadataReadError;
  use super::headers::MetadataHeader;
  use super::streams::blobs::BlobsHeap;
  use super::streams::strings::StringsHeap;
  use super::streams::tables::id::RowId;
  use super::streams::tables::rows::{AssemblyRefRow, MethodDefRow};
  use super::streams::tables::table::RowRead;
  use super::streams::tables::TablesStream;
  use super::streams::{MetadataStream, MetadataStreamIter};
  use crate::bytes::ByteSliceExt;
  use crate::metadata::headers::METADATA_MAGIC;
  use core::cell::OnceCell;

  /// A ECMA-335 metadata reader.
  ///
  /// Beyond the raw stream walk in [MetadataReader::streams], this caches the handful of streams
  /// the R2R container cross-references most often (`#~`, `#Strings`) behind a lazy, one-shot
  /// lookup so repeated lookups (e.g. resolving many `AssemblyRef` simple names) don't re-walk the
  /// stream directory.
  pub struct MetadataReader<'a> {
    bytes: &'a [u8],
    header: MetadataHeader<'a>,
    streams: usize,
    tables: OnceCell<Option<TablesStream<'a>>>,
    strings: OnceCell<Option<StringsHeap<'a>>>,
    blobs: OnceCell<Option<BlobsHeap<'a>>>,
  }

  impl<'a> MetadataReader<'a> {
    /// Creates a new [MetadataReader] from the given bytes.
    ///
    /// Attempts to parse and verify the [MetadataHeader] from the given bytes before returning the
    /// reader.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, MetadataReadError> {
      let offset = &mut 0;
      let header = bytes
        .read::<MetadataHeader>(offset)
        .ok_or(MetadataReadError::NotEnough)?;

      if header.signature != METADATA_MAGIC {
        return Err(MetadataReadError::BadSignature(header.signature));
      }

      Ok(Self {
        bytes,
        header,
        streams: *offset,
        tables: OnceCell::new(),
        strings: OnceCell::new(),
        blobs: OnceCell::new(),
      })
    }

    /// Gets the [MetadataHeader].
    pub const fn header(&self) -> &MetadataHeader<'a> {
      &self.header
    }

    /// Gets the [MetadataStreamIter].
    pub fn streams(&self) -> MetadataStreamIter<'a> {
      MetadataStreamIter::new(self.header.streams as _, self.streams, self.bytes)
    }

    fn find_stream<T>(&self, pick: impl Fn(&MetadataStream<'a>) -> Option<T>) -> Option<T> {
      self.streams().find_map(|s| pick(&s.ok()?))
    }

    /// Returns the `#~` tables stream, if present. Cached after the first call.
    pub fn tables(&self) -> Option<&TablesStream<'a>> {
      self
        .tables
        .get_or_init(|| self.find_stream(MetadataStream::as_tables))
        .as_ref()
    }

    /// Returns the `#Strings` heap, if present. Cached after the first call.
    pub fn strings(&self) -> Option<&StringsHeap<'a>> {
      self
        .strings
        .get_or_init(|| self.find_stream(MetadataStream::as_strings))
        .as_ref()
    }

    /// Returns the `#Blob` heap, if present. Cached after the first call.
    pub fn blobs(&self) -> Option<&BlobsHeap<'a>> {
      self
        .blobs
        .get_or_init(|| self.find_stream(MetadataStream::as_blobs))
        .as_ref()
    }

    /// Returns the number of rows in the `AssemblyRef` table, or `0` if the tables stream is
    /// absent.
    pub fn assembly_ref_count(&self) -> u32 {
      self
        .tables()
        .map(|tables| AssemblyRefRow::table_len(tables.header()) as u32)
        .unwrap_or(0)
    }

    /// Returns the `AssemblyRef` row at `id`, or `None` if the tables stream is absent or `id` is
    /// out of range.
    pub fn assembly_ref(&self, id: RowId<AssemblyRefRow>) -> Option<AssemblyRefRow> {
      self.tables()?.assembly_refs().get(id)
    }

    /// Returns the simple name of an `AssemblyRef` row, resolved through the `#Strings` heap.
    pub fn assembly_ref_simple_name(&self, row: AssemblyRefRow) -> Option<&'a str> {
      self.strings()?.get(row.name())?.to_str().ok()
    }
  }
}
