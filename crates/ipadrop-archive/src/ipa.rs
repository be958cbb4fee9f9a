//! Locating and parsing the application `Info.plist`.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use ipadrop_core::{ExtractedFields, MetadataOutcome};
use plist::{Dictionary, Value};
use zip::ZipArchive;

use crate::error::ArchiveError;

/// Largest `Info.plist` we are willing to decompress. Real ones are a few KiB.
pub const MAX_INFO_PLIST_BYTES: u64 = 4 * 1024 * 1024;

const PAYLOAD_DIR: &str = "Payload";
const INFO_PLIST: &str = "Info.plist";
const APP_SUFFIX: &str = ".app";

/// Read the identifying fields from the archive at `path`.
pub fn read_fields(path: &Path) -> Result<ExtractedFields, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let entry = archive
        .file_names()
        .filter(|name| is_app_info_plist(name))
        .min()
        .map(str::to_owned)
        .ok_or(ArchiveError::InfoPlistNotFound)?;
    tracing::debug!(archive = %path.display(), entry = %entry, "Found application Info.plist");

    let mut plist_file = archive.by_name(&entry)?;
    if plist_file.size() > MAX_INFO_PLIST_BYTES {
        return Err(ArchiveError::InfoPlistTooLarge {
            size: plist_file.size(),
            limit: MAX_INFO_PLIST_BYTES,
        });
    }

    // The declared size comes from the archive itself; bound the read too.
    let mut bytes = Vec::new();
    (&mut plist_file)
        .take(MAX_INFO_PLIST_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|source| ArchiveError::Read {
            entry: entry.clone(),
            source,
        })?;
    if bytes.len() as u64 > MAX_INFO_PLIST_BYTES {
        return Err(ArchiveError::InfoPlistTooLarge {
            size: bytes.len() as u64,
            limit: MAX_INFO_PLIST_BYTES,
        });
    }

    let dict = Value::from_reader(Cursor::new(bytes))?
        .into_dictionary()
        .ok_or(ArchiveError::NotADictionary)?;

    Ok(ExtractedFields {
        bundle_id: string_key(&dict, "CFBundleIdentifier"),
        version: string_key(&dict, "CFBundleShortVersionString"),
        build: string_key(&dict, "CFBundleVersion"),
    })
}

/// Read the identifying fields, substituting defaults on any failure.
pub fn inspect(path: &Path) -> MetadataOutcome {
    match read_fields(path) {
        Ok(fields) => MetadataOutcome::from_fields(fields),
        Err(err) => MetadataOutcome::from_failure(err),
    }
}

/// `Payload/<Name>.app/Info.plist`, and nothing nested deeper.
fn is_app_info_plist(name: &str) -> bool {
    let mut parts = name.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(PAYLOAD_DIR), Some(app), Some(INFO_PLIST), None) => {
            app.len() > APP_SUFFIX.len() && app.ends_with(APP_SUFFIX)
        }
        _ => false,
    }
}

fn string_key(dict: &Dictionary, key: &str) -> Option<String> {
    dict.get(key).and_then(Value::as_string).map(str::to_owned)
}
