//! Input guard: size and type validation before any processing.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::sanitize::sanitize_input;

/// Default maximum input size in bytes (50 KiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 50 * 1024;

/// Reasons an input document is refused.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("input is empty")]
    Empty,
    #[error("input is {size} bytes, exceeding the {max} byte limit")]
    TooLarge { size: u64, max: usize },
    #[error("unsupported input type: {0} (plain text required)")]
    UnsupportedType(String),
    #[error("input is not valid UTF-8 text")]
    NotUtf8,
    #[error("input contains binary data")]
    Binary,
    #[error("not a regular file: {0}")]
    NotAFile(String),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Document text that passed validation and sanitization.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    text: String,
    raw_bytes: usize,
    sha256: String,
}

impl ValidatedInput {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Size of the input as received, before sanitization.
    pub fn raw_bytes(&self) -> usize {
        self.raw_bytes
    }

    /// Hex SHA-256 of the sanitized text.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }
}

/// Validate text that is already a `str` (e.g. from stdin).
pub fn validate_text(text: &str, max_bytes: usize) -> Result<ValidatedInput, InputError> {
    check_size(text.len() as u64, max_bytes)?;
    if text.contains('\0') {
        return Err(InputError::Binary);
    }
    finish(text)
}

/// Validate raw bytes. UTF-8 text without NUL bytes is always accepted;
/// anything else is sniffed so known binary formats get a precise error.
pub fn validate_bytes(bytes: &[u8], max_bytes: usize) -> Result<ValidatedInput, InputError> {
    check_size(bytes.len() as u64, max_bytes)?;

    let decoded = std::str::from_utf8(bytes);
    if let Ok(text) = decoded {
        if !text.contains('\0') {
            return validate_text(text, max_bytes);
        }
    }

    if let Some(kind) = infer::get(bytes) {
        if !kind.mime_type().starts_with("text/") {
            return Err(InputError::UnsupportedType(kind.mime_type().to_string()));
        }
    }

    Err(match decoded {
        Ok(_) => InputError::Binary,
        Err(_) => InputError::NotUtf8,
    })
}

/// Read and validate a file. The size is checked before the content is read.
pub async fn read_file(path: &Path, max_bytes: usize) -> Result<ValidatedInput, InputError> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Err(InputError::NotAFile(path.display().to_string()));
    }
    check_size(meta.len(), max_bytes)?;

    debug!("Reading {} ({} bytes)", path.display(), meta.len());
    let bytes = tokio::fs::read(path).await?;
    validate_bytes(&bytes, max_bytes)
}

fn check_size(size: u64, max_bytes: usize) -> Result<(), InputError> {
    if size > max_bytes as u64 {
        return Err(InputError::TooLarge {
            size,
            max: max_bytes,
        });
    }
    Ok(())
}

fn finish(text: &str) -> Result<ValidatedInput, InputError> {
    let clean = sanitize_input(text);
    if clean.trim().is_empty() {
        return Err(InputError::Empty);
    }

    let mut hasher = Sha256::new();
    hasher.update(clean.as_bytes());
    let sha256 = hex::encode(hasher.finalize());

    Ok(ValidatedInput {
        raw_bytes: text.len(),
        text: clean,
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_text() {
        let input = validate_text("Brown v. Board of Education, 347 U.S. 483", 1024).unwrap();
        assert_eq!(input.text(), "Brown v. Board of Education, 347 U.S. 483");
        assert_eq!(input.raw_bytes(), 41);
        assert_eq!(input.sha256().len(), 64);
    }

    #[test]
    fn test_rejects_oversized_input() {
        let text = "a".repeat(DEFAULT_MAX_INPUT_BYTES + 1);
        match validate_text(&text, DEFAULT_MAX_INPUT_BYTES) {
            Err(InputError::TooLarge { size, max }) => {
                assert_eq!(size, DEFAULT_MAX_INPUT_BYTES as u64 + 1);
                assert_eq!(max, DEFAULT_MAX_INPUT_BYTES);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_input_at_limit() {
        let text = "a".repeat(DEFAULT_MAX_INPUT_BYTES);
        assert!(validate_text(&text, DEFAULT_MAX_INPUT_BYTES).is_ok());
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!(matches!(validate_text("", 1024), Err(InputError::Empty)));
        assert!(matches!(validate_text(" \n\t ", 1024), Err(InputError::Empty)));
        // Only control characters: empty once sanitized
        assert!(matches!(
            validate_text("\u{0007}\u{001b}", 1024),
            Err(InputError::Empty)
        ));
    }

    #[test]
    fn test_rejects_nul_bytes() {
        assert!(matches!(
            validate_text("abc\0def", 1024),
            Err(InputError::Binary)
        ));
    }

    #[test]
    fn test_rejects_pdf_bytes() {
        let mut pdf = b"%PDF-1.7\n%".to_vec();
        pdf.extend_from_slice(&[0xE2, 0xE3, 0xCF, 0xD3]);
        pdf.extend_from_slice(b"\n1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        match validate_bytes(&pdf, 1024) {
            Err(InputError::UnsupportedType(mime)) => assert_eq!(mime, "application/pdf"),
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn test_text_resembling_magic_numbers_is_accepted() {
        // "BM", "MZ" and "ID3" open BMP, PE and MP3 files
        for opening in [
            "BMW of North America, Inc. v. Gore, 517 U.S. 559 (1996), limits punitive damages.",
            "MZM Holdings v. Baker, 12 F.3d 45 (2d Cir. 1993).",
            "ID3 Technologies v. Smith was dismissed.",
        ] {
            let input = validate_bytes(opening.as_bytes(), 1024).unwrap();
            assert_eq!(input.text(), opening);
        }
    }

    #[test]
    fn test_rejects_utf8_with_nul_bytes() {
        assert!(matches!(
            validate_bytes(b"Roe v. Wade\0\0", 1024),
            Err(InputError::Binary)
        ));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let bytes = [0x66, 0x6f, 0xff, 0xfe, 0x6f];
        assert!(matches!(
            validate_bytes(&bytes, 1024),
            Err(InputError::NotUtf8)
        ));
    }

    #[test]
    fn test_strips_control_characters() {
        let input = validate_text("Roe v.\u{0008} Wade\r\n", 1024).unwrap();
        assert_eq!(input.text(), "Roe v. Wade\n");
    }

    #[tokio::test]
    async fn test_read_file_checks_size_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brief.txt");
        std::fs::write(&path, "x".repeat(2048)).unwrap();

        assert!(matches!(
            read_file(&path, 1024).await,
            Err(InputError::TooLarge { size: 2048, .. })
        ));
        assert!(read_file(&path, 4096).await.is_ok());
    }

    #[tokio::test]
    async fn test_read_file_accepts_brief_opening_with_bm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gore.txt");
        std::fs::write(&path, "BMW of North America, Inc. v. Gore, 517 U.S. 559 (1996).\n").unwrap();

        let input = read_file(&path, 1024).await.unwrap();
        assert!(input.text().starts_with("BMW of North America"));
    }

    #[tokio::test]
    async fn test_read_file_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_file(dir.path(), 1024).await,
            Err(InputError::NotAFile(_))
        ));
    }
}
