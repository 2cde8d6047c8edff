//! Cheap per-file fingerprint
//!
//! `md5(decimal(size) || sample)` where the sample is the whole content for
//! files of at most two windows, otherwise the first and the last window.
//! This is an identity proxy for change and rename detection, not an
//! integrity check: two files of equal size with equal boundary windows
//! share a fingerprint.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Size of the head and tail sample windows
pub const SAMPLE_WINDOW: u64 = 4096;

/// Computes the fingerprint of the file at `path`, whose size is `size`
///
/// # Errors
/// Returns the I/O error if the file cannot be opened or read
pub fn fingerprint_file(path: &Path, size: u64) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut ctx = md5::Context::new();
    ctx.consume(size.to_string().as_bytes());

    if size <= SAMPLE_WINDOW * 2 {
        let mut content = Vec::with_capacity(size as usize);
        file.read_to_end(&mut content)?;
        ctx.consume(&content);
    } else {
        let mut window = vec![0u8; SAMPLE_WINDOW as usize];
        file.read_exact(&mut window)?;
        ctx.consume(&window);
        file.seek(SeekFrom::End(-(SAMPLE_WINDOW as i64)))?;
        file.read_exact(&mut window)?;
        ctx.consume(&window);
    }

    Ok(format!("{:x}", ctx.compute()))
}

/// Fingerprint of an in-memory buffer, using the same sampling rule
pub fn fingerprint_bytes(data: &[u8]) -> String {
    let window = SAMPLE_WINDOW as usize;
    let mut ctx = md5::Context::new();
    ctx.consume(data.len().to_string().as_bytes());
    if data.len() <= window * 2 {
        ctx.consume(data);
    } else {
        ctx.consume(&data[..window]);
        ctx.consume(&data[data.len() - window..]);
    }
    format!("{:x}", ctx.compute())
}
