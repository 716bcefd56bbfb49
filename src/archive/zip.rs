//! Zip unpacking with caller-declared entry name encoding.
//!
//! Storefront packages are frequently built on systems that write entry names in a
//! legacy code page without setting the UTF-8 flag. Names that are already valid UTF-8 are
//! kept as-is; everything else is decoded with the declared encoding, falling back to the
//! zip crate's own (CP437) decoding when no encoding was declared.

use std::borrow::Cow;
use std::io;
use std::path::Path;

use encoding_rs::Encoding;
use ::zip::ZipArchive;

use super::confined_path;
use crate::error::WatchError;
use crate::fsx as fs;

/// Decodes a raw entry name.
pub fn decode_entry_name<'a>(raw: &'a [u8], fallback: &'a str, encoding: Option<&'static Encoding>) -> Cow<'a, str> {
    if let Ok(utf8) = std::str::from_utf8(raw) {
        return Cow::Borrowed(utf8);
    }
    match encoding {
        Some(enc) => {
            let (decoded, _, _) = enc.decode(raw);
            decoded
        }
        None => Cow::Borrowed(fallback),
    }
}

/// Extracts every entry of the zip archive at `archive` into `dest`.
pub fn unpack(archive: &Path, dest: &Path, encoding: Option<&'static Encoding>) -> Result<(), WatchError> {
    let file = fs::File::open(archive).map_err(WatchError::io(archive))?;
    let mut zip = ZipArchive::new(io::BufReader::new(file))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = decode_entry_name(entry.name_raw(), entry.name(), encoding).into_owned();
        let rel = confined_path(&name)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(WatchError::io(&target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(WatchError::io(parent))?;
        }
        let mut out = fs::File::create(&target).map_err(WatchError::io(&target))?;
        io::copy(&mut entry, &mut out).map_err(WatchError::io(&target))?;
    }

    Ok(())
}
