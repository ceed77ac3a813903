use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Serialize, de::DeserializeOwned};

use crate::corpus::error::{CorpusError, io_error, parse_error};

/// Read one record per line. Blank lines are skipped; a bad line fails the
/// whole read with its line number.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CorpusError> {
    let content = fs::read_to_string(path)
        .map_err(|err| io_error(format!("failed to read '{}': {err}", path.display())))?;

    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(line).map_err(|err| {
            parse_error(format!(
                "'{}' line {}: {err}",
                path.display(),
                line_no + 1
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<(), CorpusError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            io_error(format!(
                "failed to create directory '{}': {err}",
                parent.display()
            ))
        })?;
    }
    let file = fs::File::create(path)
        .map_err(|err| io_error(format!("failed to create '{}': {err}", path.display())))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let encoded = serde_json::to_string(record)
            .map_err(|err| io_error(format!("failed to encode record: {err}")))?;
        writer
            .write_all(encoded.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|err| io_error(format!("failed to write '{}': {err}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|err| io_error(format!("failed to flush '{}': {err}", path.display())))?;
    Ok(())
}
