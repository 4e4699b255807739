//! Image classification: target machine, operating system and architecture.

use crate::r2r::errors::BadImageError;

/// The operating system a composite COFF machine field was XOR-tagged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
  Windows,
  Apple,
  FreeBsd,
  Linux,
  NetBsd,
}

/// OS XOR tags applied to the COFF machine field, tried in this order (Windows implicitly via
/// XOR with zero).
const OS_TAGS: [(OperatingSystem, u16); 5] = [
  (OperatingSystem::Windows, 0x0000),
  (OperatingSystem::Apple, 0x4644),
  (OperatingSystem::FreeBsd, 0xADC4),
  (OperatingSystem::Linux, 0x7B79),
  (OperatingSystem::NetBsd, 0x1993),
];

/// Known COFF machine constants recognized after the OS tag is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoffMachine {
  I386,
  Amd64,
  Arm,
  Thumb,
  ArmThumb2,
  Arm64,
}

impl CoffMachine {
  fn from_raw(raw: u16) -> Option<Self> {
    match raw {
      0x014c => Some(Self::I386),
      0x8664 => Some(Self::Amd64),
      0x01c0 => Some(Self::Arm),
      0x01c2 => Some(Self::Thumb),
      0x01c4 => Some(Self::ArmThumb2),
      0xaa64 => Some(Self::Arm64),
      _ => None,
    }
  }
}

/// The target architecture class, derived from [CoffMachine].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineClass {
  X86,
  X64,
  Arm32,
  Arm64,
}

impl From<CoffMachine> for MachineClass {
  fn from(machine: CoffMachine) -> Self {
    match machine {
      CoffMachine::I386 => Self::X86,
      CoffMachine::Amd64 => Self::X64,
      CoffMachine::Arm | CoffMachine::Thumb | CoffMachine::ArmThumb2 => Self::Arm32,
      CoffMachine::Arm64 => Self::Arm64,
    }
  }
}

/// The result of classifying a COFF machine field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
  pub operating_system: OperatingSystem,
  pub machine: CoffMachine,
  pub architecture: MachineClass,
}

/// Recovers the OS and true machine constant from a COFF machine field that may have been
/// XOR-tagged with an OS marker.
///
/// Tries each OS tag in enumeration order (Windows, Apple, FreeBSD, Linux, NetBSD); the first XOR
/// that produces a recognized machine constant wins.
pub fn classify(coff_machine: u16) -> Result<Classification, BadImageError> {
  for (os, tag) in OS_TAGS {
    if let Some(machine) = CoffMachine::from_raw(coff_machine ^ tag) {
      return Ok(Classification {
        operating_system: os,
        machine,
        architecture: machine.into(),
      });
    }
  }

  Err(BadImageError::InvalidMachine)
}

/// The R2R image's immutable backing bytes, plus a human-readable label (e.g. its file path) for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct Image<'a> {
  bytes: &'a [u8],
  label: &'a str,
}

impl<'a> Image<'a> {
  /// Wraps `bytes` as an [Image] labeled `label`.
  pub fn new(bytes: &'a [u8], label: &'a str) -> Self {
    Self { bytes, label }
  }

  /// Returns the whole image as contiguous bytes.
  #[inline]
  pub fn bytes(&self) -> &'a [u8] {
    self.bytes
  }

  /// Returns this image's diagnostic label.
  #[inline]
  pub fn label(&self) -> &'a str {
    self.label
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_classify_windows_is_identity() {
    let result = classify(0x8664).unwrap();

    assert_eq!(OperatingSystem::Windows, result.operating_system);
    assert_eq!(CoffMachine::Amd64, result.machine);
    assert_eq!(MachineClass::X64, result.architecture);
  }

  #[test]
  fn test_classify_linux_xor() {
    let result = classify(0x8664 ^ 0x7B79).unwrap();

    assert_eq!(OperatingSystem::Linux, result.operating_system);
    assert_eq!(CoffMachine::Amd64, result.machine);
    assert_eq!(MachineClass::X64, result.architecture);
  }

  #[test]
  fn test_classify_every_known_pair_round_trips() {
    let machines = [
      (CoffMachine::I386, 0x014cu16),
      (CoffMachine::Amd64, 0x8664),
      (CoffMachine::Arm, 0x01c0),
      (CoffMachine::Thumb, 0x01c2),
      (CoffMachine::ArmThumb2, 0x01c4),
      (CoffMachine::Arm64, 0xaa64),
    ];

    for (os, tag) in OS_TAGS {
      for (machine, raw) in machines {
        let result = classify(raw ^ tag).unwrap();

        assert_eq!(os, result.operating_system);
        assert_eq!(machine, result.machine);
      }
    }
  }

  #[test]
  fn test_classify_unknown_machine_is_invalid() {
    assert!(matches!(classify(0x1234), Err(BadImageError::InvalidMachine)));
  }
}
