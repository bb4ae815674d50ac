//! PDF text via pdf-extract

use anyhow::{anyhow, Context};
use std::fs;
use std::panic;
use std::path::Path;

pub fn extract(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    extract_from_bytes(&bytes)
}

/// Text of every page, in page order
pub fn extract_from_bytes(bytes: &[u8]) -> anyhow::Result<String> {
    // pdf-extract panics on some malformed documents
    let outcome = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match outcome {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(anyhow!("{}", e)),
        Err(_) => Err(anyhow!("malformed PDF structure")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_error() {
        assert!(extract_from_bytes(b"%PDF-garbage").is_err());
        assert!(extract_from_bytes(b"").is_err());
    }
}
