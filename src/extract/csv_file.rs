//! CSV extraction: one text unit per row, rendered as `header: value` lines.

use std::path::Path;

use crate::error::ExtractError;
use crate::models::{DocMeta, TextUnit};

pub fn extract_csv(path: &Path, meta: &DocMeta) -> Result<Vec<TextUnit>, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(ExtractError::from)?;

    let headers = reader.headers()?.clone();
    let mut units = Vec::new();

    for record in reader.records() {
        let record = record?;
        let mut lines = Vec::with_capacity(record.len());
        for (i, field) in record.iter().enumerate() {
            let header = headers.get(i).unwrap_or("");
            if header.is_empty() && field.is_empty() {
                continue;
            }
            lines.push(format!("{}: {}", header, field));
        }
        if lines.is_empty() {
            continue;
        }
        units.push(TextUnit {
            text: lines.join("\n"),
            meta: meta.clone(),
        });
    }

    if units.is_empty() {
        return Err(ExtractError::EmptyDocument(meta.source.clone()));
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use std::io::Write;

    fn meta() -> DocMeta {
        DocMeta::new("u1", SourceKind::Csv, "data.csv")
    }

    #[test]
    fn one_unit_per_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,city\nAda,London\nGrace,Washington").unwrap();

        let units = extract_csv(file.path(), &meta()).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "name: Ada\ncity: London");
        assert_eq!(units[1].text, "name: Grace\ncity: Washington");
    }

    #[test]
    fn header_only_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,city").unwrap();
        let err = extract_csv(file.path(), &meta()).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument(_)));
    }

    #[test]
    fn empty_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = extract_csv(file.path(), &meta()).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument(_)));
    }
}
