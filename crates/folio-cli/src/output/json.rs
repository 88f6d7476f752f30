use folio_core::error::FolioError;
use serde::Serialize;
use std::path::Path;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), FolioError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Always JSON when saving to a file.
pub fn write<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), FolioError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
