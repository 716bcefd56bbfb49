//! # Container Classification and Unpacking
//!
//! Decides, from a file name alone, whether a downloaded file is a plain file, a generic
//! compressed archive or an asset bundle, and provides the unpacking routine for each
//! archive kind. No content sniffing is performed: an unrecognised extension is simply
//! [`Container::Plain`].

pub mod bundle;
pub mod tarball;
pub mod zip;

use std::path::{Component, Path, PathBuf};

use encoding_rs::Encoding;

use crate::error::WatchError;

/// Compression wrapped around a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCodec {
    None,
    Gzip,
    Xz,
    Zstd,
}

/// Generic archive formats that unpack into a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar(TarCodec),
}

/// The result of classifying a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Plain,
    GenericArchive(ArchiveFormat),
    AssetBundle,
}

impl Container {
    pub fn is_archive(self) -> bool {
        !matches!(self, Container::Plain)
    }
}

/// Classifies `name` by its (case-insensitive) extension.
pub fn classify(name: &str) -> Container {
    let lower = name.to_ascii_lowercase();
    let ends = |suffixes: &[&str]| suffixes.iter().any(|s| lower.ends_with(s));

    if ends(&[".zip"]) {
        Container::GenericArchive(ArchiveFormat::Zip)
    } else if ends(&[".unitypackage"]) {
        Container::AssetBundle
    } else if ends(&[".tar.gz", ".tgz"]) {
        Container::GenericArchive(ArchiveFormat::Tar(TarCodec::Gzip))
    } else if ends(&[".tar.xz", ".txz"]) {
        Container::GenericArchive(ArchiveFormat::Tar(TarCodec::Xz))
    } else if ends(&[".tar.zst", ".tzst"]) {
        Container::GenericArchive(ArchiveFormat::Tar(TarCodec::Zstd))
    } else if ends(&[".tar"]) {
        Container::GenericArchive(ArchiveFormat::Tar(TarCodec::None))
    } else {
        Container::Plain
    }
}

/// Unpacks `archive` into the existing directory `dest`.
///
/// `encoding` only affects how zip entry names are decoded; `staging` is a scratch
/// directory for unpackers that need an intermediate layout.
pub fn unpack(
    container: Container,
    archive: &Path,
    dest: &Path,
    encoding: Option<&'static Encoding>,
    staging: &Path,
) -> Result<(), WatchError> {
    match container {
        Container::Plain => Ok(()),
        Container::GenericArchive(ArchiveFormat::Zip) => zip::unpack(archive, dest, encoding),
        Container::GenericArchive(ArchiveFormat::Tar(codec)) => tarball::unpack(archive, dest, codec),
        Container::AssetBundle => bundle::unpack(archive, dest, staging),
    }
}

/// Resolves a text-encoding label. Accepts WHATWG labels plus the common Python-style
/// code page names storefront configurations tend to use.
pub fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
    let alias = match normalized.as_str() {
        "cp932" | "ms-kanji" | "mskanji" => "windows-31j",
        "cp949" | "uhc" => "windows-949",
        "cp936" => "gbk",
        "cp950" => "big5",
        "utf8" => "utf-8",
        "sjis" | "shift-jis" => "shift_jis",
        other => other,
    };
    Encoding::for_label(alias.as_bytes()).or_else(|| Encoding::for_label(label.trim().as_bytes()))
}

/// Converts an archive entry name into a relative path confined to the extraction root.
///
/// Backslashes are treated as separators, empty and `.` components are dropped, and any
/// `..`, root or prefix component rejects the entry.
pub(crate) fn confined_path(name: &str) -> Result<PathBuf, WatchError> {
    if name.contains('\0') {
        return Err(WatchError::UnsafeEntry(name.to_string()));
    }
    let unified = name.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(WatchError::UnsafeEntry(name.to_string()));
            }
        }
    }
    Ok(out)
}
