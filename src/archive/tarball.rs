//! Tar archives, optionally wrapped in gzip, xz or zstd.

use std::io::{self, BufReader, Read};
use std::path::Path;

use super::{confined_path, TarCodec};
use crate::error::WatchError;
use crate::fsx as fs;

/// Opens `archive` and wraps it in the decoder matching `codec`.
pub(crate) fn open_decoder(archive: &Path, codec: TarCodec) -> Result<Box<dyn Read>, WatchError> {
    let file = fs::File::open(archive).map_err(WatchError::io(archive))?;
    let reader = BufReader::new(file);
    let decoder: Box<dyn Read> = match codec {
        TarCodec::None => Box::new(reader),
        TarCodec::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
        TarCodec::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        TarCodec::Zstd => Box::new(zstd::stream::read::Decoder::new(reader).map_err(WatchError::io(archive))?),
    };
    Ok(decoder)
}

/// Extracts every regular file and directory of the tar archive into `dest`.
///
/// Links and special files are skipped; entry paths are confined to `dest`.
pub fn unpack(archive: &Path, dest: &Path, codec: TarCodec) -> Result<(), WatchError> {
    let mut tar = tar::Archive::new(open_decoder(archive, codec)?);

    for entry in tar.entries().map_err(WatchError::io(archive))? {
        let mut entry = entry.map_err(WatchError::io(archive))?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let rel = confined_path(&name)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(&rel);

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            fs::create_dir_all(&target).map_err(WatchError::io(&target))?;
        } else if kind.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(WatchError::io(parent))?;
            }
            let mut out = fs::File::create(&target).map_err(WatchError::io(&target))?;
            io::copy(&mut entry, &mut out).map_err(WatchError::io(&target))?;
        }
    }

    Ok(())
}
