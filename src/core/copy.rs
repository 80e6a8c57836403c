//! Chunked, resumable file copy.
//!
//! A [CopyJob] holds both descriptors open between budget ticks. Each [CopyJob::pump]
//! moves at most `budget` buffers; the descriptors are closed when the job is dropped,
//! whether it finished or failed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::core::error::{IoContext, TaskError};

/// Result of one [CopyJob::pump] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pumped {
    /// Budget ran out with data left to copy.
    Pending,
    /// End of file reached; total bytes written.
    Finished(u64),
}

/// Outcome of trying to reserve space up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prealloc {
    Reserved,
    Unsupported,
}

#[derive(Debug)]
pub struct CopyJob {
    src: File,
    dst: File,
    src_path: PathBuf,
    dst_path: PathBuf,
    written: u64,
}

impl CopyJob {
    /// Open `src` for reading and create `dst` with `mode`.
    ///
    /// An existing destination is removed first, unless `skip_existing` is set, in which
    /// case nothing is opened and `Ok(None)` is returned.
    pub fn open(
        src: &Path,
        dst: &Path,
        mode: u32,
        skip_existing: bool,
    ) -> Result<Option<CopyJob>, TaskError> {
        if fs::symlink_metadata(dst).is_ok() {
            if skip_existing {
                return Ok(None);
            }
            fs::remove_file(dst).at(dst)?;
        }

        let src_file = File::open(src).at(src)?;
        let dst_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(dst)
            .at(dst)?;

        let len = src_file.metadata().at(src)?.len();
        if let Prealloc::Unsupported = preallocate(&dst_file, len).at(dst)? {
            tracing::debug!(path = %dst.display(), "preallocation unsupported, continuing");
        }

        Ok(Some(CopyJob {
            src: src_file,
            dst: dst_file,
            src_path: src.to_path_buf(),
            dst_path: dst.to_path_buf(),
            written: 0,
        }))
    }

    /// Copy chunks until end of file or until `budget` reaches zero.
    pub fn pump(&mut self, buf: &mut [u8], budget: &mut usize) -> Result<Pumped, TaskError> {
        match pump_chunks(&mut self.src, &mut self.dst, buf, budget, &mut self.written) {
            Ok(done) => Ok(done),
            Err(Side::Read(e)) => Err(TaskError::io(&self.src_path, e)),
            Err(Side::Write(e)) => Err(TaskError::io(&self.dst_path, e)),
        }
    }

    /// Bytes written so far for this file.
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    #[inline]
    pub fn destination(&self) -> &Path {
        &self.dst_path
    }

    /// Swap the destination descriptor, e.g. for one that rejects writes.
    #[cfg(test)]
    pub(crate) fn replace_destination(&mut self, file: File) {
        self.dst = file;
    }
}

/// Which end of the copy failed.
#[derive(Debug)]
pub(crate) enum Side {
    Read(io::Error),
    Write(io::Error),
}

/// Core copy loop, generic so it can be exercised with in-memory readers and writers.
pub(crate) fn pump_chunks<R: Read, W: Write>(
    src: &mut R,
    dst: &mut W,
    buf: &mut [u8],
    budget: &mut usize,
    written: &mut u64,
) -> Result<Pumped, Side> {
    while *budget > 0 {
        let n = loop {
            match src.read(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Side::Read(e)),
            }
        };
        if n == 0 {
            dst.flush().map_err(Side::Write)?;
            return Ok(Pumped::Finished(*written));
        }
        dst.write_all(&buf[..n]).map_err(Side::Write)?;
        *written += n as u64;
        *budget -= 1;
    }
    Ok(Pumped::Pending)
}

/// Reserve `len` bytes for `file`. Filesystems without support are not an error.
#[cfg(target_os = "linux")]
pub(crate) fn preallocate(file: &File, len: u64) -> io::Result<Prealloc> {
    use std::os::fd::AsRawFd;

    if len == 0 {
        return Ok(Prealloc::Reserved);
    }
    let Ok(len) = libc::off_t::try_from(len) else {
        return Ok(Prealloc::Unsupported);
    };
    // SAFETY: the descriptor is owned by `file` and stays open for the whole call.
    let rc = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
    match rc {
        0 => Ok(Prealloc::Reserved),
        libc::EOPNOTSUPP | libc::ENOSYS | libc::EINVAL => Ok(Prealloc::Unsupported),
        code => Err(io::Error::from_raw_os_error(code)),
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn preallocate(_file: &File, _len: u64) -> io::Result<Prealloc> {
    Ok(Prealloc::Unsupported)
}
