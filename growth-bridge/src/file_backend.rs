//! File back-end (spec §4.5 "File back-end"): the target is a regular file or a block device.
//! NWA is whatever the emulated TOC's last session leaves off at (or the file's current end, for
//! a freshly created file with no markers yet); writes are appended or overwrite the whole file
//! according to an explicit flag; capacity is probed via `statvfs`/`BLKGETSIZE64` depending on
//! whether the path names a regular file or a block device.

use std::fs::{File, Metadata, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use scsi_lib::core::addressing::Lba;
use scsi_lib::core::constants::SECTOR_SIZE;

use crate::backend::{GrowthBridgeError, SessionWriteReport, WriteTarget};
use crate::toc_emulation::{self, SessionMarker};

nix::ioctl_read!(blkgetsize64, 0x12, 114, u64);

/// Whether a new session may only be appended after the last recorded one, or is free to
/// overwrite the whole target from the start (spec §4.4.2's overwrite policy has an analogous
/// "always" mode; here it governs the session, not a single file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    Append,
    Overwrite,
}

pub struct FileBackend {
    path: PathBuf,
    file: File,
    mode: AppendMode,
    sessions: Vec<SessionMarker>,
}

impl FileBackend {
    /// Open (creating if absent) `path` as a growth-bridge target and scan it for existing
    /// emulated-TOC session markers (spec §4.5).
    pub fn open(path: impl AsRef<Path>, mode: AppendMode) -> Result<Self, GrowthBridgeError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;
        let sessions = toc_emulation::scan_sessions(&mut file)?;
        Ok(Self { path, file, mode, sessions })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sessions(&self) -> &[SessionMarker] {
        &self.sessions
    }

    fn metadata(&self) -> std::io::Result<Metadata> {
        self.file.metadata()
    }
}

impl WriteTarget for FileBackend {
    /// Spec §4.5: "NWA is the file's current end" absent any recognized session marker;
    /// otherwise it's the address right after the last recognized session's data.
    fn next_writable_address(&self) -> Result<Lba, GrowthBridgeError> {
        if self.mode == AppendMode::Overwrite {
            return Ok(Lba::ZERO);
        }
        if let Some(nwa) = toc_emulation::next_writable_after(&self.sessions) {
            return Ok(nwa);
        }
        let len = self.metadata()?.len();
        Lba::try_from((len / u64::from(SECTOR_SIZE)) as i32)
            .map_err(|_| GrowthBridgeError::NoNwa)
    }

    /// Probed via `statvfs` for a regular file's containing filesystem, or `BLKGETSIZE64` for a
    /// block device (spec §4.5 "capacity is probed via statvfs / BLKGETSIZE ... depending on
    /// platform").
    fn capacity_blocks(&self) -> Option<u64> {
        let metadata = self.metadata().ok()?;
        if metadata.file_type().is_block_device() {
            let mut size: u64 = 0;
            // SAFETY: blkgetsize64 writes exactly one u64 through the pointer we pass, and the
            // fd is valid for the lifetime of this call.
            unsafe { blkgetsize64(self.file.as_raw_fd(), &mut size).ok()? };
            return Some(size / u64::from(SECTOR_SIZE));
        }

        let stat = nix::sys::statvfs::fstatvfs(&self.file).ok()?;
        let free_bytes = stat.blocks_available() * stat.fragment_size();
        let current_blocks = metadata.len() / u64::from(SECTOR_SIZE);
        Some(current_blocks + free_bytes / u64::from(SECTOR_SIZE))
    }

    fn write_session(
        &mut self,
        content: &mut dyn Read,
        cancel: &AtomicBool,
    ) -> Result<SessionWriteReport, GrowthBridgeError> {
        // Content streams to exactly `next_writable_address()`, per the `WriteTarget` contract
        // (the session-write caller already baked this LBA into the directory records it
        // rendered). The marker trails the data instead of preceding it, so reserving its block
        // never shifts where the caller's bytes actually land.
        let data_start = self.next_writable_address()?;

        self.file.seek(SeekFrom::Start(u64::from(data_start.raw() as u32) * u64::from(SECTOR_SIZE)))?;

        let mut blocks_written: u64 = 0;
        let mut buf = vec![0u8; 64 * SECTOR_SIZE as usize];
        let mut cancelled = false;
        loop {
            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            let n = read_fill(content, &mut buf)?;
            if n == 0 {
                break;
            }
            let padded = n.div_ceil(SECTOR_SIZE as usize) * SECTOR_SIZE as usize;
            for b in &mut buf[n..padded] {
                *b = 0;
            }
            self.file.write_all(&buf[..padded])?;
            blocks_written += (padded / SECTOR_SIZE as usize) as u64;
            if n < buf.len() {
                break;
            }
        }

        let marker_lba = Lba::try_from(data_start.raw() + blocks_written as i32).map_err(|_| GrowthBridgeError::NoNwa)?;
        let previous_marker = self
            .sessions
            .iter()
            .max_by_key(|m| m.session_number)
            .map(|m| Lba::try_from(m.data_start.raw() + m.data_blocks as i32).unwrap_or(Lba::ZERO));
        let session_number = self.sessions.iter().map(|m| m.session_number).max().map(|n| n + 1).unwrap_or(0);
        let marker = SessionMarker {
            session_number,
            data_start,
            data_blocks: blocks_written as u32,
            previous_marker,
        };
        toc_emulation::write_marker(&mut self.file, marker_lba, marker)?;
        self.sessions.push(marker);

        Ok(SessionWriteReport { session_start: data_start, blocks_written, cancelled })
    }

    fn finalize(&mut self) -> Result<(), GrowthBridgeError> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// Fill `buf` from `r` as far as it will go before hitting EOF, unlike a single `read` call
/// which may return short reads from a pipe-backed `Leaf::External`.
fn read_fill(r: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fresh_file_starts_at_block_zero() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let backend = FileBackend::open(tmp.path(), AppendMode::Append).unwrap();
        assert_eq!(backend.next_writable_address().unwrap(), Lba::ZERO);
    }

    #[test]
    fn second_session_starts_after_first() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut backend = FileBackend::open(tmp.path(), AppendMode::Append).unwrap();
        let cancel = AtomicBool::new(false);

        let mut content_a = Cursor::new(vec![0x61u8; 2048]);
        let report_a = backend.write_session(&mut content_a, &cancel).unwrap();
        assert_eq!(report_a.blocks_written, 1);

        let nwa_after_a = backend.next_writable_address().unwrap();
        assert!(nwa_after_a.raw() > 0);

        let mut content_b = Cursor::new(vec![0x62u8; 2048]);
        let report_b = backend.write_session(&mut content_b, &cancel).unwrap();
        assert!(report_b.session_start.raw() > report_a.session_start.raw());
    }

    #[test]
    fn reopen_rediscovers_sessions_via_markers() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let cancel = AtomicBool::new(false);
        {
            let mut backend = FileBackend::open(tmp.path(), AppendMode::Append).unwrap();
            let mut content = Cursor::new(vec![0x41u8; 4096]);
            backend.write_session(&mut content, &cancel).unwrap();
        }
        let reopened = FileBackend::open(tmp.path(), AppendMode::Append).unwrap();
        assert_eq!(reopened.sessions().len(), 1);
    }
}
