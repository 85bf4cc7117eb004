//! Plain-text extraction: read the file, reject empty content.

use std::path::Path;

use crate::error::ExtractError;
use crate::models::{DocMeta, TextUnit};

pub fn extract_text(path: &Path, meta: &DocMeta) -> Result<Vec<TextUnit>, ExtractError> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    if content.trim().is_empty() {
        return Err(ExtractError::EmptyDocument(meta.source.clone()));
    }

    Ok(vec![TextUnit {
        text: content,
        meta: meta.clone(),
    }])
}
