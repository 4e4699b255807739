#[cfg(feature = "read")]
#[doc(inline)]
pub use read::*;

pub trait Row: Sized {}

#[cfg(feature = "read")]
#[doc(hidden)]
mod read {
  use super::Row;
  use crate::metadata::errors::MetadataStreamReadError;
  use crate::metadata::headers::{HeapSizes, MetadataTablesHeader};
  use crate::metadata::streams::tables::id::RowId;
  use core::marker::PhantomData;

  /// A slice of bytes containing the data for a metadata table.
  #[repr(transparent)]
  pub struct TableBytes<'a, R> {
    row: PhantomData<R>,
    bytes: &'a [u8],
  }

  impl<'a, R: RowRead> TableBytes<'a, R> {
    /// Creates a new [TableReader] from the given bytes and [MetadataTablesHeader].
    pub fn from_bytes(
      bytes: &'a [u8],
      offset: &mut usize,
      header: &MetadataTablesHeader,
    ) -> Result<Self, MetadataStreamReadError<'a>> {
      let len = R::table_len(header);
      let size = R::row_size(header);
      let size = len.saturating_mul(size);
      let bytes = bytes
        .get(*offset..*offset + size)
        .ok_or(MetadataStreamReadError::NotEnough)?;

      *offset += size;

      Ok(Self {
        row: PhantomData,
        bytes,
      })
    }

    /// Creates a new [TableReader] from the given bytes and [MetadataTablesHeader].
    pub fn reader<'h>(&self, header: &'h MetadataTablesHeader) -> TableReader<'a, 'h, R> {
      TableReader {
        row: PhantomData,
        bytes: self.bytes,
        header,
      }
    }
  }

  impl<'a, R> Default for TableBytes<'a, R> {
    fn default() -> Self {
      Self {
        row: PhantomData,
        bytes: &[],
      }
    }
  }

  impl<'a, R> Clone for TableBytes<'a, R> {
    fn clone(&self) -> Self {
      *self
    }
  }

  impl<'a, R> Copy for TableBytes<'a, R> {}

  /// Reads rows from a metadata table.
  pub struct TableReader<'a, 'h, R> {
    row: PhantomData<R>,
    bytes: &'a [u8],
    header: &'h MetadataTablesHeader,
  }

  impl<'a, 'h, R: RowRead> TableReader<'a, 'h, R> {
    /// Gets the row from the given [RowId].
    pub fn get(&self, id: RowId<R>) -> Option<R> {
      let mut offset = id.index() * R::row_size(self.header);

      R::from_bytes(self.bytes, &mut offset, id, self.header)
    }
  }

  impl<'a, 'h, R> Clone for TableReader<'a, 'h, R> {
    fn clone(&self) -> Self {
      *self
    }
  }

  impl<'a, 'h, R> Copy for TableReader<'a, 'h, R> {}

  impl<'a, 'h, R: RowRead> IntoIterator for TableReader<'a, 'h, R> {
    type Item = R;
    type IntoIter = TableReaderIter<'a, 'h, R>;

    fn into_iter(self) -> Self::IntoIter {
      TableReaderIter {
        row: self.row,
        id: RowId::new(0),
        bytes: self.bytes,
        header: self.header,
      }
    }
  }

  /// Iterates over rows in a metadata table.
  pub struct TableReaderIter<'a, 'h, R> {
    row: PhantomData<R>,
    id: RowId<R>,
    bytes: &'a [u8],
    header: &'h MetadataTablesHeader,
  }

  impl<'a, 'h, R: RowRead> Iterator for TableReaderIter<'a, 'h, R> {
    type Item = R;

    fn next(&mut self) -> Option<Self::Item> {
      let mut offset = self.id.index() * R::row_size(self.header);
      let row = R::from_bytes(self.bytes, &mut offset, self.id, self.header)?;

      self.id = self.id.next();

      Some(row)
    }
  }

  pub trait RowRead: Row {
    /// Returns the size of a row in bytes using the given [MetadataTablesHeader].
    fn row_size(header: &MetadataTablesHeader) -> usize;
    /// Returns the number of rows in the table using the given [MetadataTablesHeader].
    fn table_len(header: &MetadataTablesHeader) -> usize;
    /// Reads the row with the given [RowId] from the given buffer and [MetadataTablesHeader].
    fn from_bytes(
      buf: &[u8],
      offset: &mut usize,
      id: RowId<Self>,
      header: &MetadataTablesHeader,
    ) -> Option<Self>;
  }

  impl From<&MetadataTablesHeader> for HeapSizes {
    fn from(header: &MetadataTablesHeader) -> HeapSizes {
      header.heap_sizes
    }
  }

  impl From<&MetadataTablesHeader> for () {
    fn from(_: &MetadataTablesHeader) {}
  }

  /// A field of a table row that can be read using only a [MetadataTablesHeader] for context.
  ///
  /// Bridges fixed-width integers (no context), heap ids (need [HeapSizes]) and row ids / coded
  /// ids (need the whole header, to size themselves against other tables' row counts) behind one
  /// trait so `table::row!` can read any field uniformly.
  pub trait RowField: Sized {
    fn row_read(buf: &[u8], offset: &mut usize, header: &MetadataTablesHeader) -> Option<Self>;
    fn row_size(header: &MetadataTablesHeader) -> usize;
  }

  macro_rules! plain_row_field {
    ($ty:ty) => {
      impl RowField for $ty {
        #[inline]
        fn row_read(buf: &[u8], offset: &mut usize, _: &MetadataTablesHeader) -> Option<Self> {
          use crate::bytes::ByteSliceExt;

          buf.read::<$ty>(offset)
        }

        #[inline]
        fn row_size(_: &MetadataTablesHeader) -> usize {
          use crate::bytes::ByteSize;

          <$ty as ByteSize<()>>::byte_size(())
        }
      }
    };
  }

  plain_row_field!(u8);
  plain_row_field!(u16);
  plain_row_field!(u32);
  plain_row_field!(u64);

  macro_rules! heap_row_field {
    ($ty:ty) => {
      impl RowField for $ty {
        #[inline]
        fn row_read(buf: &[u8], offset: &mut usize, header: &MetadataTablesHeader) -> Option<Self> {
          use crate::bytes::ByteSliceExt;

          buf.read_with::<$ty, _>(offset, HeapSizes::from(header))
        }

        #[inline]
        fn row_size(header: &MetadataTablesHeader) -> usize {
          use crate::bytes::ByteSize;

          <$ty as ByteSize<HeapSizes>>::byte_size(HeapSizes::from(header))
        }
      }
    };
  }

  heap_row_field!(crate::metadata::streams::blobs::BlobId);
  heap_row_field!(crate::metadata::streams::guids::GuidId);
  heap_row_field!(crate::metadata::streams::strings::StringId);

  impl<R: RowRead> RowField for RowId<R> {
    #[inline]
    fn row_read(buf: &[u8], offset: &mut usize, header: &MetadataTablesHeader) -> Option<Self> {
      use crate::bytes::ByteSliceExt;

      buf.read_with(offset, header)
    }

    #[inline]
    fn row_size(header: &MetadataTablesHeader) -> usize {
      use crate::bytes::ByteSize;

      <RowId<R> as ByteSize<&MetadataTablesHeader>>::byte_size(header)
    }
  }

  /// Defines a table row struct: a set of named fields, each read in declaration order via
  /// [RowField], plus a [RowRead] impl keyed off the row type's table id.
  macro_rules! row {
    (
      $(#[$attr:meta])*
      struct $name:ident : $id:literal {
        $(
          $(#[$field_attr:meta])*
          $field:ident : $ty:ty,
        )*
      }
    ) => {
      $(#[$attr])*
      #[derive(Debug, Clone, Copy)]
      pub struct $name {
        id: RowId<$name>,
        $(
          $(#[$field_attr])*
          $field: $ty,
        )*
      }

      impl $name {
        /// This row type's metadata table id.
        pub const ID: usize = $id;

        /// Returns the [RowId] of this row.
        #[inline]
        pub fn id(&self) -> RowId<$name> {
          self.id
        }

        $(
          $(#[$field_attr])*
          #[inline]
          pub fn $field(&self) -> $ty {
            self.$field
          }
        )*
      }

      impl Row for $name {}

      #[cfg(feature = "read")]
      impl RowRead for $name {
        fn row_size(header: &MetadataTablesHeader) -> usize {
          0 $(+ <$ty as RowField>::row_size(header))*
        }

        fn table_len(header: &MetadataTablesHeader) -> usize {
          header.rows[$id] as usize
        }

        fn from_bytes(
          buf: &[u8],
          offset: &mut usize,
          id: RowId<Self>,
          header: &MetadataTablesHeader,
        ) -> Option<Self> {
          Some(Self {
            id,
            $(
              $field: <$ty as RowField>::row_read(buf, offset, header)?,
            )*
          })
        }
      }
    };
  }

  pub use row;
}
