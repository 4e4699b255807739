//! The `COMPILER_IDENTIFIER` section: a free-form string naming the compiler that produced the
//! image, e.g. `"crossgen2 6.0.0"`.

/// Decodes the `COMPILER_IDENTIFIER` section's bytes as UTF-8, stripping a single trailing NUL if
/// present.
///
/// Returns `None` if the bytes are not valid UTF-8.
pub fn parse_compiler_identifier(bytes: &[u8]) -> Option<String> {
  let bytes = match bytes.split_last() {
    Some((0, rest)) => rest,
    _ => bytes,
  };

  core::str::from_utf8(bytes).ok().map(str::to_owned)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_strips_trailing_nul() {
    assert_eq!(Some("crossgen2".to_owned()), parse_compiler_identifier(b"crossgen2\0"));
  }

  #[test]
  fn test_without_trailing_nul() {
    assert_eq!(Some("crossgen2".to_owned()), parse_compiler_identifier(b"crossgen2"));
  }

  #[test]
  fn test_invalid_utf8_is_rejected() {
    assert_eq!(None, parse_compiler_identifier(&[0xff, 0xfe]));
  }
}
