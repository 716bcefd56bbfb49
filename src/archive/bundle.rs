//! Asset bundle (`.unitypackage`) unpacking.
//!
//! A bundle is a gzip-compressed tar whose top level holds one directory per asset GUID:
//!
//! ```text
//! <guid>/asset       raw asset bytes (absent for folders)
//! <guid>/asset.meta  importer settings
//! <guid>/pathname    first line is the asset's project-relative path
//! <guid>/preview.png optional thumbnail
//! ```
//!
//! Unpacking lays every `asset` out at its `pathname`, producing the directory tree a user
//! would see after importing the bundle. GUID entries missing either file are skipped.

use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use super::{confined_path, tarball, TarCodec};
use crate::error::WatchError;
use crate::fsx as fs;

/// Reads the first line of a `pathname` file, without its line terminator.
fn read_pathname(path: &Path) -> Result<String, WatchError> {
    let file = fs::File::open(path).map_err(WatchError::io(path))?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).map_err(WatchError::io(path))?;
    Ok(line.trim_end_matches(&['\n', '\r'][..]).to_string())
}

/// Unpacks the bundle at `archive` into `dest`, using a temporary directory under `staging`
/// for the raw GUID layout.
pub fn unpack(archive: &Path, dest: &Path, staging: &Path) -> Result<(), WatchError> {
    let raw = tempfile::Builder::new()
        .prefix(".bundle-")
        .tempdir_in(staging)
        .map_err(WatchError::io(staging))?;

    let mut tar = tar::Archive::new(tarball::open_decoder(archive, TarCodec::Gzip)?);
    tar.unpack(raw.path()).map_err(WatchError::io(archive))?;

    for (guid, entry_dir) in fs::list_children(raw.path())? {
        let asset = entry_dir.join("asset");
        let pathname = entry_dir.join("pathname");
        if !asset.is_file() || !pathname.is_file() {
            debug!(guid = %guid, "bundle entry without asset payload skipped");
            continue;
        }

        let rel = confined_path(&read_pathname(&pathname)?)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(rel);
        fs::move_path(&asset, &target)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn append(builder: &mut tar::Builder<impl Write>, path: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }

    #[test]
    fn lays_assets_out_at_their_pathnames() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("outfit.unitypackage");
        {
            let gz = flate2::write::GzEncoder::new(fs::File::create(&archive).unwrap(), flate2::Compression::default());
            let mut builder = tar::Builder::new(gz);
            append(&mut builder, "0a1b/asset", b"fbx bytes");
            append(&mut builder, "0a1b/pathname", b"Assets/Outfit/outfit.fbx\n00");
            append(&mut builder, "0a1b/asset.meta", b"guid: 0a1b");
            // folder entries carry no asset
            append(&mut builder, "ffee/pathname", b"Assets/Outfit");
            append(&mut builder, "c3d4/asset", b"material");
            append(&mut builder, "c3d4/pathname", b"Assets/Outfit/Materials/cloth.mat\r\n");
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let staging = dir.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        unpack(&archive, &out, &staging).unwrap();

        assert_eq!(fs::read(out.join("Assets/Outfit/outfit.fbx")).unwrap(), b"fbx bytes");
        assert_eq!(fs::read(out.join("Assets/Outfit/Materials/cloth.mat")).unwrap(), b"material");
        assert!(fs::list_children(&staging).unwrap().is_empty(), "raw layout must be removed");
    }

    #[test]
    fn escaping_pathname_is_rejected() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("evil.unitypackage");
        {
            let gz = flate2::write::GzEncoder::new(fs::File::create(&archive).unwrap(), flate2::Compression::default());
            let mut builder = tar::Builder::new(gz);
            append(&mut builder, "aa/asset", b"x");
            append(&mut builder, "aa/pathname", b"../../outside.txt");
            builder.into_inner().unwrap().finish().unwrap();
        }
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        assert!(matches!(unpack(&archive, &out, dir.path()), Err(WatchError::UnsafeEntry(_))));
    }
}
