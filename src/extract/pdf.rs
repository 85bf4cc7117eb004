//! PDF extraction: native text layer per page, with an OCR pass for scanned
//! documents.
//!
//! A scanned or image-only PDF has little or no extractable text layer, so
//! when the parsed text falls below a threshold every page is rasterized
//! (`pdftoppm`) and OCRed (`tesseract`). OCR is slow; the threshold keeps it
//! off the hot path for ordinary PDFs. If the OCR output beats the native
//! text, it is appended as an additional `pdf_ocr`-tagged unit.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::extract::run_command;
use crate::models::{DocMeta, SourceKind, TextUnit};

pub async fn extract_pdf(
    config: &ExtractConfig,
    path: &Path,
    meta: &DocMeta,
) -> Result<Vec<TextUnit>, ExtractError> {
    let bytes = std::fs::read(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut units = Vec::new();
    let mut native_len = 0usize;

    for (index, page) in pages.iter().enumerate() {
        let trimmed = page.trim();
        native_len += trimmed.len();
        if trimmed.is_empty() {
            continue;
        }
        let mut page_meta = meta.clone();
        page_meta.page = Some(index as u32 + 1);
        units.push(TextUnit {
            text: trimmed.to_string(),
            meta: page_meta,
        });
    }

    if native_len < config.pdf_ocr_threshold {
        info!(
            source = %meta.source,
            native_len,
            threshold = config.pdf_ocr_threshold,
            "low text layer, running OCR"
        );
        let ocr_text = ocr_pdf(config, path).await?;
        if let Some(unit) = ocr_addendum(native_len, ocr_text, meta) {
            units.push(unit);
        }
    }

    if units.is_empty() {
        return Err(ExtractError::EmptyDocument(meta.source.clone()));
    }

    Ok(units)
}

/// The OCR result only earns a unit when it beats the native text layer.
fn ocr_addendum(native_len: usize, ocr_text: String, meta: &DocMeta) -> Option<TextUnit> {
    if ocr_text.len() <= native_len {
        return None;
    }
    let mut ocr_meta = meta.clone();
    ocr_meta.kind = SourceKind::PdfOcr;
    Some(TextUnit {
        text: ocr_text,
        meta: ocr_meta,
    })
}

/// Rasterize every page into a temp directory and OCR each image. The
/// directory and all page images are removed when the `TempDir` drops, on
/// the error paths included.
async fn ocr_pdf(config: &ExtractConfig, path: &Path) -> Result<String, ExtractError> {
    let dir = tempfile::tempdir()?;
    let prefix = dir.path().join("page");
    let timeout = Duration::from_secs(config.command_timeout_secs);

    run_command(
        "pdftoppm",
        &[
            OsStr::new("-png"),
            path.as_os_str(),
            prefix.as_os_str(),
        ],
        timeout,
    )
    .await?;

    let mut images: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    images.sort_by_key(|p| page_number(p));

    debug!(pages = images.len(), "rasterized pages for OCR");

    let mut out = String::new();
    for image in &images {
        let output = run_command(
            "tesseract",
            &[
                image.as_os_str(),
                OsStr::new("stdout"),
                OsStr::new("-l"),
                OsStr::new("eng"),
            ],
            timeout,
        )
        .await?;
        let text = String::from_utf8_lossy(&output.stdout);
        if !text.trim().is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text.trim());
        }
    }

    Ok(out)
}

/// `pdftoppm` numbers its output `page-1.png`, `page-2.png`, ... without a
/// fixed width, so a lexicographic sort would put page-10 before page-2.
fn page_number(path: &Path) -> u32 {
    path.file_stem()
        .and_then(OsStr::to_str)
        .and_then(|stem| stem.rsplit('-').next())
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn page_numbers_sort_numerically() {
        let mut paths: Vec<PathBuf> = ["page-10.png", "page-2.png", "page-1.png"]
            .iter()
            .map(PathBuf::from)
            .collect();
        paths.sort_by_key(|p| page_number(p));
        assert_eq!(paths[0], PathBuf::from("page-1.png"));
        assert_eq!(paths[1], PathBuf::from("page-2.png"));
        assert_eq!(paths[2], PathBuf::from("page-10.png"));
    }

    #[test]
    fn ocr_unit_appended_only_when_longer_than_native_text() {
        let meta = DocMeta::new("u1", SourceKind::Pdf, "scan.pdf");

        let unit = ocr_addendum(10, "recovered text from a scanned page".to_string(), &meta);
        let unit = unit.expect("longer OCR output must produce a unit");
        assert_eq!(unit.meta.kind, SourceKind::PdfOcr);
        assert_eq!(unit.meta.source, "scan.pdf");

        assert!(ocr_addendum(400, "short".to_string(), &meta).is_none());
        assert!(ocr_addendum(5, "12345".to_string(), &meta).is_none());
    }

    #[tokio::test]
    async fn invalid_pdf_is_a_pdf_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"not a pdf at all").unwrap();
        let meta = DocMeta::new("u1", SourceKind::Pdf, "broken.pdf");
        let err = extract_pdf(&ExtractConfig::default(), file.path(), &meta)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
