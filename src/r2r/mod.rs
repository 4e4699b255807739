//! The ReadyToRun (R2R) container reader.
//!
//! [R2RReader] is the front door: it owns the image bytes, classifies the target machine/OS, locates
//! the R2R header (single or composite), and lazily materializes each named section on first
//! access, per the one-shot-guard discipline in spec §5/§9.

pub mod available_types;
pub mod compiler_identifier;
pub mod debug_info;
pub mod errors;
pub mod exception_info;
pub mod format;
pub mod header;
pub mod image;
pub mod import_sections;
pub mod instance_methods;
pub mod manifest;
pub mod methods;
pub mod native_array;
pub mod native_hashtable;
pub mod resolver;
pub mod runtime_functions;
pub mod unwind;

use self::errors::{BadImageError, ReadR2RError};
use self::format::NameFormatter;
use self::header::{CoreHeader, R2RHeader, Section, SectionType};
use self::image::{classify, Classification, Image, MachineClass};
use self::import_sections::ImportSection;
use self::instance_methods::{InstanceMethod, ModuleResolver, SignatureFormatter};
use self::manifest::AssemblyReference;
use self::methods::Method;
use self::native_array::NativeArray;
use self::native_hashtable::NativeHashtable;
use self::resolver::AssemblyResolver;
use self::runtime_functions::{record_stride, walk_method_fragments, RuntimeFunction};
use self::unwind::UnwindDecoder;
use crate::bytes::{ByteSliceExt, FromBytes};
use crate::metadata::errors::MetadataReadError;
use crate::metadata::streams::tables::id::RowId;
use crate::metadata::streams::tables::rows::AssemblyRefRow;
use crate::metadata::MetadataReader;
use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;

const RTR_HEADER_EXPORT: &[u8] = b"RTR_HEADER";

/// The seam between [R2RReader] and a concrete PE reader, per spec §4.4.
///
/// Decouples the R2R core from any one PE-parsing crate; the `object`-backed implementation
/// ([ManagedPeFile][crate::pe::ManagedPeFile]) lives behind the `object` feature, but a caller
/// could supply their own.
pub trait PeAdapter<'a> {
  /// The full image, as contiguous bytes.
  fn data(&self) -> &'a [u8];

  /// Translates an RVA to a file offset. `None` if the RVA does not fall inside any section.
  fn offset_of_rva(&self, rva: u32) -> Option<usize>;

  /// The raw COFF machine constant.
  fn machine(&self) -> u16;

  /// The image's preferred load address.
  fn image_base(&self) -> u64;

  /// The managed-native header directory (RVA, size), if the CLI header declares one.
  fn managed_native_header_directory(&self) -> Option<(u32, u32)>;

  /// Whether the CLI header's runtime flags include `ILLibrary`.
  fn is_il_library(&self) -> bool;

  /// Looks up an export's RVA by name.
  fn export_rva(&self, name: &[u8]) -> Option<u32>;

  /// Reads the embedded ECMA-335 metadata, if the CLI header's metadata directory is present.
  fn metadata(&self) -> Result<MetadataReader<'a>, MetadataReadError>;
}

#[cfg(feature = "object")]
mod object_adapter {
  use super::PeAdapter;
  use crate::metadata::errors::MetadataReadError;
  use crate::metadata::MetadataReader;
  use crate::pe::headers::CliRuntimeFlags;
  use crate::pe::object::ManagedPeFile;
  use object::read::pe::ImageNtHeaders;

  impl<'a, Pe: ImageNtHeaders> PeAdapter<'a> for &ManagedPeFile<'a, Pe> {
    fn data(&self) -> &'a [u8] {
      ManagedPeFile::data(self)
    }

    fn offset_of_rva(&self, rva: u32) -> Option<usize> {
      ManagedPeFile::offset_of_rva(self, rva)
    }

    fn machine(&self) -> u16 {
      ManagedPeFile::machine(self)
    }

    fn image_base(&self) -> u64 {
      ManagedPeFile::image_base(self)
    }

    fn managed_native_header_directory(&self) -> Option<(u32, u32)> {
      let dir = self.cli_header().managed_native_header;

      (dir.virtual_address != 0).then_some((dir.virtual_address, dir.size))
    }

    fn is_il_library(&self) -> bool {
      self.cor_flags().contains(CliRuntimeFlags::COMIMAGE_FLAGS_IL_LIBRARY)
    }

    fn export_rva(&self, name: &[u8]) -> Option<u32> {
      ManagedPeFile::export_rva(self, name)
    }

    fn metadata(&self) -> Result<MetadataReader<'a>, MetadataReadError> {
      ManagedPeFile::metadata(self)
    }
  }
}

/// Either the single-image [R2RHeader] or a composite image's per-component [CoreHeader]s.
enum Headers {
  Single(R2RHeader),
  Composite(Vec<CoreHeader>),
}

struct ManifestState<'a> {
  reader: MetadataReader<'a>,
  references: Vec<RowId<AssemblyRefRow>>,
}

/// The R2R container reader: classifies the image, locates its header(s), and exposes every
/// section named in spec §4, materializing each lazily on first access.
pub struct R2RReader<'a, P> {
  pe: P,
  image: Image<'a>,
  classification: Classification,
  composite: bool,
  headers: Headers,
  primary_metadata: Option<MetadataReader<'a>>,

  manifest: OnceCell<Option<ManifestState<'a>>>,
  reference_cache: RefCell<BTreeMap<u32, &'a MetadataReader<'a>>>,

  methods: OnceCell<Vec<Method<'a>>>,
  instance_methods: OnceCell<Vec<InstanceMethod<'a>>>,
  entry_point_bitmap: OnceCell<Vec<bool>>,
  import_sections: OnceCell<(Vec<ImportSection>, BTreeMap<u32, String>)>,
  available_types: OnceCell<Vec<String>>,
  compiler_identifier: OnceCell<Option<String>>,
}

impl<'a, P: PeAdapter<'a>> R2RReader<'a, P> {
  /// Classifies `pe` and locates its R2R header(s), per spec §4.5.
  ///
  /// `label` is a diagnostic name for the image (e.g. its file path).
  pub fn new(pe: P, label: &'a str) -> Result<Self, ReadR2RError> {
    let classification = classify(pe.machine())?;
    let image = Image::new(pe.data(), label);

    let (composite, header_rva) = match pe.managed_native_header_directory() {
      Some((rva, _)) => (false, rva),
      None => {
        let rva = pe
          .export_rva(RTR_HEADER_EXPORT)
          .ok_or(BadImageError::MissingRtrHeader)?;

        (true, rva)
      }
    };

    if !composite && !pe.is_il_library() {
      return Err(BadImageError::NotReadyToRun.into());
    }

    let header_offset = pe
      .offset_of_rva(header_rva)
      .ok_or(BadImageError::OutOfRangeRva(header_rva))?;
    let header_bytes = &pe.data()[header_offset..];

    let primary_metadata = if composite {
      None
    } else {
      Some(pe.metadata().map_err(|_| BadImageError::NotReadyToRun)?)
    };

    let headers = if composite {
      let r2r_header = R2RHeader::from_bytes(header_bytes)?;
      let assemblies = r2r_header.sections.require(SectionType::Assemblies)?;
      let assemblies_offset = pe
        .offset_of_rva(assemblies.rva)
        .ok_or(BadImageError::OutOfRangeRva(assemblies.rva))?;
      let assemblies_bytes = pe
        .data()
        .get(assemblies_offset..assemblies_offset + assemblies.size as usize)
        .ok_or(BadImageError::Truncated)?;

      let mut component_rvas = Vec::new();
      let mut off = 0;

      while off + 4 <= assemblies_bytes.len() {
        component_rvas.push(assemblies_bytes.read::<u32>(&mut off).ok_or(BadImageError::Truncated)?);
      }

      let mut components = Vec::with_capacity(component_rvas.len());

      for rva in component_rvas {
        let offset = pe.offset_of_rva(rva).ok_or(BadImageError::OutOfRangeRva(rva))?;
        components.push(CoreHeader::from_bytes(&pe.data()[offset..])?);
      }

      Headers::Composite(components)
    } else {
      Headers::Single(R2RHeader::from_bytes(header_bytes)?)
    };

    Ok(Self {
      pe,
      image,
      classification,
      composite,
      headers,
      primary_metadata,
      manifest: OnceCell::new(),
      reference_cache: RefCell::new(BTreeMap::new()),
      methods: OnceCell::new(),
      instance_methods: OnceCell::new(),
      entry_point_bitmap: OnceCell::new(),
      import_sections: OnceCell::new(),
      available_types: OnceCell::new(),
      compiler_identifier: OnceCell::new(),
    })
  }

  /// The image's diagnostic label and bytes.
  pub fn image(&self) -> &Image<'a> {
    &self.image
  }

  pub fn machine(&self) -> self::image::CoffMachine {
    self.classification.machine
  }

  pub fn operating_system(&self) -> self::image::OperatingSystem {
    self.classification.operating_system
  }

  pub fn architecture(&self) -> MachineClass {
    self.classification.architecture
  }

  pub fn composite(&self) -> bool {
    self.composite
  }

  pub fn image_base(&self) -> u64 {
    self.pe.image_base()
  }

  /// The single-image [R2RHeader], or `None` for a composite image.
  pub fn ready_to_run_header(&self) -> Option<&R2RHeader> {
    match &self.headers {
      Headers::Single(header) => Some(header),
      Headers::Composite(_) => None,
    }
  }

  /// The per-component [CoreHeader]s, or an empty slice for a non-composite image.
  pub fn component_headers(&self) -> &[CoreHeader] {
    match &self.headers {
      Headers::Single(_) => &[],
      Headers::Composite(headers) => headers,
    }
  }

  /// The primary metadata reader, present only on non-composite images.
  pub fn primary_metadata(&self) -> Option<&MetadataReader<'a>> {
    self.primary_metadata.as_ref()
  }

  fn section_sources(&self) -> Vec<&self::header::SectionDirectory> {
    match &self.headers {
      Headers::Single(header) => vec![&header.sections],
      Headers::Composite(headers) => headers.iter().map(|h| &h.sections).collect(),
    }
  }

  fn find_section(&self, ty: SectionType) -> Option<Section> {
    self.section_sources().into_iter().find_map(|d| d.get(ty))
  }

  fn section_bytes(&self, section: Section) -> Result<&'a [u8], BadImageError> {
    let offset = self
      .pe
      .offset_of_rva(section.rva)
      .ok_or(BadImageError::OutOfRangeRva(section.rva))?;

    self
      .pe
      .data()
      .get(offset..offset + section.size as usize)
      .ok_or(BadImageError::Truncated)
  }

  /// Initializes the `MANIFEST_METADATA` reader and its `AssemblyRef` list on first access.
  fn manifest(&self) -> Result<Option<&ManifestState<'a>>, BadImageError> {
    self
      .manifest
      .get_or_init(|| {
        let section = self.find_section(SectionType::ManifestMetadata)?;
        let bytes = self.section_bytes(section).ok()?;
        let reader = MetadataReader::from_bytes(bytes).ok()?;
        let count = reader.assembly_ref_count();
        let references = (0..count).map(|i| RowId::new(i as usize)).collect();

        Some(ManifestState { reader, references })
      })
      .as_ref()
      .map_or(Ok(None), |s| Ok(Some(s)))
  }

  /// Resolves `ref_idx` against the unified reference-assembly index space (spec §4.6), calling
  /// `resolver` at most once per index and caching a successful result.
  pub fn resolve_reference_assembly(
    &self,
    ref_idx: u32,
    resolver: &impl AssemblyResolver<'a>,
  ) -> Result<&'a MetadataReader<'a>, ReadR2RError> {
    if let Some(cached) = self.reference_cache.borrow().get(&ref_idx) {
      return Ok(*cached);
    }

    let manifest = self
      .manifest()
      .map_err(ReadR2RError::from)?
      .ok_or(ReadR2RError::MissingReferenceAssembly(ref_idx))?;

    let primary_count = self.primary_metadata.as_ref().map_or(0, MetadataReader::assembly_ref_count);

    let reference = manifest::resolve(ref_idx, self.primary_metadata.as_ref(), primary_count, &manifest.reader)
      .ok_or(ReadR2RError::MissingReferenceAssembly(ref_idx))?;

    let (referrer, handle) = match reference {
      AssemblyReference::Primary(reader, id) => (reader, id),
      AssemblyReference::Manifest(reader, id) => (reader, id),
    };

    let resolved = resolver
      .resolve(referrer, handle)
      .ok_or(ReadR2RError::MissingReferenceAssembly(ref_idx))?;

    self.reference_cache.borrow_mut().insert(ref_idx, resolved);

    Ok(resolved)
  }

  /// The simple names of the manifest's `AssemblyRef` rows, in table order (spec §6).
  pub fn manifest_reference_assemblies(&self) -> Result<Vec<&'a str>, BadImageError> {
    let Some(manifest) = self.manifest()? else {
      return Ok(Vec::new());
    };

    Ok(
      manifest
        .references
        .iter()
        .filter_map(|id| {
          let row = manifest.reader.assembly_ref(*id)?;

          manifest.reader.assembly_ref_simple_name(row)
        })
        .collect(),
    )
  }

  fn total_runtime_functions(&self) -> Result<usize, BadImageError> {
    let section = self
      .find_section(SectionType::RuntimeFunctions)
      .ok_or(BadImageError::MissingSection(SectionType::RuntimeFunctions))?;

    Ok(section.size as usize / record_stride(self.classification.architecture))
  }

  /// Parses every `METHODDEF_ENTRYPOINTS` / `INSTANCE_METHOD_ENTRYPOINTS` section (per component,
  /// for composite images) and the entrypoint bitmap they populate together, on first access.
  fn methods_and_bitmap(
    &self,
    resolver: &impl ModuleResolver<'a>,
    signatures: &impl SignatureFormatter,
  ) -> Result<(&Vec<Method<'a>>, &Vec<InstanceMethod<'a>>, &Vec<bool>), ReadR2RError> {
    if let (Some(methods), Some(instance_methods), Some(bitmap)) =
      (self.methods.get(), self.instance_methods.get(), self.entry_point_bitmap.get())
    {
      return Ok((methods, instance_methods, bitmap));
    }

    let total = self.total_runtime_functions()?;
    let mut bitmap = vec![false; total];
    let mut methods = Vec::new();
    let mut instance_methods = Vec::new();

    let readers: Vec<&MetadataReader<'a>> = match &self.headers {
      Headers::Single(_) => self.primary_metadata.iter().collect(),
      Headers::Composite(_) => {
        if let Some(reader) = resolver.system_module() {
          vec![reader]
        } else {
          Vec::new()
        }
      }
    };

    for (section_idx, sections) in self.section_sources().into_iter().enumerate() {
      let Some(reader) = readers.get(section_idx).or_else(|| readers.first()) else {
        continue;
      };

      if let Some(section) = sections.get(SectionType::MethodDefEntryPoints) {
        let section_offset = self
          .pe
          .offset_of_rva(section.rva)
          .ok_or(BadImageError::OutOfRangeRva(section.rva))?;
        let bytes = self.section_bytes(section)?;
        let array = NativeArray::from_bytes(section_offset, bytes).map_err(BadImageError::from)?;
        let parsed = self::methods::parse_method_def_entry_points(
          self.pe.data(),
          &array,
          array.count() as u32,
          reader,
          &mut bitmap,
        )?;

        methods.extend(parsed);
      }

      if let Some(section) = sections.get(SectionType::InstanceMethodEntryPoints) {
        let section_offset = self
          .pe
          .offset_of_rva(section.rva)
          .ok_or(BadImageError::OutOfRangeRva(section.rva))?;
        let bytes = self.section_bytes(section)?;
        let table = NativeHashtable::from_bytes(section_offset, bytes).map_err(BadImageError::from)?;

        let parsed = self::instance_methods::parse_instance_method_entry_points(
          self.pe.data(),
          &table,
          reader,
          resolver,
          signatures,
          self.composite,
          &mut bitmap,
        )?;

        instance_methods.extend(parsed);
      }
    }

    let _ = self.methods.set(methods);
    let _ = self.instance_methods.set(instance_methods);
    let _ = self.entry_point_bitmap.set(bitmap);

    Ok((
      self.methods.get().unwrap(),
      self.instance_methods.get().unwrap(),
      self.entry_point_bitmap.get().unwrap(),
    ))
  }

  /// Non-generic method entrypoints, in discovery order. Parsed (and cached) on first access.
  pub fn methods(
    &self,
    resolver: &impl ModuleResolver<'a>,
    signatures: &impl SignatureFormatter,
  ) -> Result<&[Method<'a>], ReadR2RError> {
    self.methods_and_bitmap(resolver, signatures).map(|(m, _, _)| m.as_slice())
  }

  /// Generic/instantiated method entrypoints, in discovery order, each tagged with the low-hash
  /// bucket its [NativeHashtable] entry came from. Parsed (and cached) on first access.
  pub fn instance_methods(
    &self,
    resolver: &impl ModuleResolver<'a>,
    signatures: &impl SignatureFormatter,
  ) -> Result<&[InstanceMethod<'a>], ReadR2RError> {
    self.methods_and_bitmap(resolver, signatures).map(|(_, i, _)| i.as_slice())
  }

  /// Walks the runtime-function table for `entry_id`, a method's first fragment id, per spec
  /// §4.9. Requires the entrypoint bitmap, so `methods`/`instance_methods` must already have been
  /// materialized through [Self::methods] or [Self::instance_methods].
  pub fn runtime_function_fragments(
    &self,
    entry_id: usize,
    decoder: &impl UnwindDecoder,
  ) -> Result<Vec<RuntimeFunction<'a>>, BadImageError> {
    let total = self.total_runtime_functions()?;
    let section = self
      .find_section(SectionType::RuntimeFunctions)
      .ok_or(BadImageError::MissingSection(SectionType::RuntimeFunctions))?;
    let table = self.section_bytes(section)?;
    let bitmap = self
      .entry_point_bitmap
      .get()
      .ok_or(BadImageError::MissingSection(SectionType::MethodDefEntryPoints))?;
    let r2r_major_version = match &self.headers {
      Headers::Single(header) => header.major_version,
      Headers::Composite(_) => 0,
    };

    walk_method_fragments(
      self.pe.data(),
      table,
      entry_id,
      total,
      bitmap,
      self.classification.architecture,
      r2r_major_version,
      decoder,
      |rva| self.pe.offset_of_rva(rva),
    )
  }

  /// Parses every `IMPORT_SECTIONS` directory and its fixup-cell names, on first access.
  pub fn import_sections(
    &self,
    formatter: &impl NameFormatter,
  ) -> Result<(&[ImportSection], &BTreeMap<u32, String>), BadImageError> {
    if let Some((sections, names)) = self.import_sections.get() {
      return Ok((sections.as_slice(), names));
    }

    let Some(section) = self.find_section(SectionType::ImportSections) else {
      let _ = self.import_sections.set((Vec::new(), BTreeMap::new()));
      return Ok((&[], self.import_sections.get().map(|(_, n)| n).unwrap()));
    };

    let bytes = self.section_bytes(section)?;
    let result = self::import_sections::parse_import_sections(
      self.pe.data(),
      bytes,
      self.classification.architecture,
      |rva| self.pe.offset_of_rva(rva),
      formatter,
    )?;

    let _ = self.import_sections.set(result);

    let (sections, names) = self.import_sections.get().unwrap();

    Ok((sections.as_slice(), names))
  }

  /// Every `AVAILABLE_TYPES` entry (primary, or every component's), formatted to a display string.
  pub fn available_types(&self, formatter: &impl NameFormatter) -> Result<&[String], BadImageError> {
    if let Some(names) = self.available_types.get() {
      return Ok(names.as_slice());
    }

    let mut names = Vec::new();

    for sections in self.section_sources() {
      let Some(section) = sections.get(SectionType::AvailableTypes) else {
        continue;
      };

      let offset = self
        .pe
        .offset_of_rva(section.rva)
        .ok_or(BadImageError::OutOfRangeRva(section.rva))?;
      let bytes = self.section_bytes(section)?;
      let table = NativeHashtable::from_bytes(offset, bytes).map_err(BadImageError::from)?;

      let Some(reader) = self.primary_metadata.as_ref() else {
        continue;
      };

      names.extend(self::available_types::parse_available_types(
        &table,
        self.pe.data(),
        reader,
        formatter,
      ));
    }

    let _ = self.available_types.set(names);

    Ok(self.available_types.get().unwrap().as_slice())
  }

  /// The `COMPILER_IDENTIFIER` section, decoded as UTF-8, or `None` if the section is absent.
  pub fn compiler_identifier(&self) -> Result<Option<&str>, BadImageError> {
    if let Some(id) = self.compiler_identifier.get() {
      return Ok(id.as_deref());
    }

    let id = match self.find_section(SectionType::CompilerIdentifier) {
      Some(section) => self::compiler_identifier::parse_compiler_identifier(self.section_bytes(section)?),
      None => None,
    };

    let _ = self.compiler_identifier.set(id);

    Ok(self.compiler_identifier.get().unwrap().as_deref())
  }

  /// Maps every method RVA in `EXCEPTION_INFO` to its [exception_info::EhInfo], per spec §4.13.
  pub fn runtime_function_to_eh_info(&self) -> Result<BTreeMap<u32, self::exception_info::EhInfo>, BadImageError> {
    let Some(section) = self.find_section(SectionType::ExceptionInfo) else {
      return Ok(BTreeMap::new());
    };

    let bytes = self.section_bytes(section)?;

    self::exception_info::parse_exception_info(bytes, |rva| self.pe.offset_of_rva(rva))
  }

  /// The `DEBUG_INFO` [NativeArray], if present, for resolving per-runtime-function debug offsets.
  pub fn debug_info_array(&self) -> Result<Option<NativeArray<'a>>, BadImageError> {
    let Some(section) = self.find_section(SectionType::DebugInfo) else {
      return Ok(None);
    };

    let offset = self
      .pe
      .offset_of_rva(section.rva)
      .ok_or(BadImageError::OutOfRangeRva(section.rva))?;
    let bytes = self.section_bytes(section)?;

    Ok(Some(NativeArray::from_bytes(offset, bytes).map_err(BadImageError::from)?))
  }
}
