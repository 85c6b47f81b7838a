//! Turn uploaded bytes into roster text.

use std::panic;

use tracing::debug;

use crate::{Error, Result};

const PDF_MAGIC: &[u8] = b"%PDF-";

pub(crate) fn roster_text(bytes: &[u8]) -> Result<String> {
  if bytes.iter().all(u8::is_ascii_whitespace) {
    return Err(Error::InvalidFormat("empty file".into()));
  }

  if bytes.starts_with(PDF_MAGIC) {
    debug!(len = bytes.len(), "extracting text from PDF roster");
    // pdf-extract panics on some malformed documents.
    return panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
      .map_err(|_| Error::Pdf("text extraction aborted".into()))?
      .map_err(|e| Error::Pdf(e.to_string()));
  }

  Ok(decode_text(bytes))
}

/// UTF-8 (BOM tolerated), falling back to Latin-1 for legacy exports.
fn decode_text(bytes: &[u8]) -> String {
  match std::str::from_utf8(bytes) {
    Ok(text) => text.trim_start_matches('\u{feff}').to_owned(),
    Err(_) => bytes.iter().copied().map(char::from).collect(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn utf8_with_bom() {
    let text = roster_text("\u{feff}MAYO 2024".as_bytes()).unwrap();
    assert_eq!(text, "MAYO 2024");
  }

  #[test]
  fn latin1_fallback() {
    // "PEÑA" in Latin-1.
    let text = roster_text(&[0x50, 0x45, 0xD1, 0x41]).unwrap();
    assert_eq!(text, "PEÑA");
  }

  #[test]
  fn empty_input_is_invalid() {
    assert!(matches!(roster_text(b" \n\t"), Err(Error::InvalidFormat(_))));
    assert!(matches!(roster_text(b""), Err(Error::InvalidFormat(_))));
  }

  #[test]
  fn broken_pdf_is_reported() {
    let err = roster_text(b"%PDF-1.4\nthis is not really a pdf").unwrap_err();
    assert!(matches!(err, Error::Pdf(_)));
  }
}
