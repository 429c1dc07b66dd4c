// Shared helpers for OOXML containers (xlsx, docx)

use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{IoError, Result};

pub(crate) fn open_archive(path: &Path) -> Result<ZipArchive<std::fs::File>> {
    let file = std::fs::File::open(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|e| IoError::Container {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read a part of the archive as UTF-8 text.
pub(crate) fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, part: &str) -> Result<String> {
    let mut file = archive.by_name(part).map_err(|e| IoError::Xml {
        part: part.to_string(),
        message: format!("part not found: {}", e),
    })?;

    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Text of a predefined or numeric entity reference (`quot`, `#233`, `#x41`).
pub(crate) fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "quot" => Some('"'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

pub(crate) fn xml_error(part: &str, e: impl std::fmt::Display) -> IoError {
    IoError::Xml {
        part: part.to_string(),
        message: e.to_string(),
    }
}
