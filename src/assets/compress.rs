//! Gzip compression of deployable web assets.
//!
//! Output is deterministic: the gzip header carries a zero timestamp and no
//! file name, so identical input bytes always produce identical `.gz` files.

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub const GZ_SUFFIX: &str = ".gz";
pub const LICENSE_SUFFIX: &str = ".LICENSE.txt";

/// Compress a byte buffer.
pub fn gzip_bytes(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::with_capacity(data.len() / 2 + 64), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a gzip buffer.
pub fn gunzip_bytes(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

pub fn is_compressed(path: &Path) -> bool {
    file_name_ends_with(path, GZ_SUFFIX)
}

pub fn is_license_file(path: &Path) -> bool {
    file_name_ends_with(path, LICENSE_SUFFIX)
}

fn file_name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(suffix))
        .unwrap_or(false)
}

/// Write `<path>.gz` next to `path`, leaving the original in place.
pub fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let data = fs::read(path)?;
    let compressed = gzip_bytes(&data)?;

    let mut target = path.as_os_str().to_owned();
    target.push(GZ_SUFFIX);
    let target = PathBuf::from(target);

    fs::write(&target, compressed)?;
    Ok(target)
}

/// Compress every regular file under `dir` that is neither already gzipped
/// nor a license notice. Returns the number of files written.
pub fn compress_tree(dir: &Path) -> io::Result<usize> {
    let mut written = 0;
    for file in super::stage::collect_files(dir)? {
        if is_compressed(&file) || is_license_file(&file) {
            continue;
        }
        let target = compress_file(&file)?;
        log::debug!("[Assets] [GZIP] {}", target.display());
        written += 1;
    }
    Ok(written)
}
