//! Emulated table-of-contents for overwriteable media and plain files (spec §4.5): "For
//! overwriteable media with no hardware multi-session, GB emulates a table-of-contents by
//! writing a marker block ... at session boundaries. On subsequent open, GB scans for those
//! markers and reconstructs session-list + leadout positions."
//!
//! This is a from-scratch marker format, not a re-implementation of libisoburn's on-disk
//! layout (spec §9 open question (b) notwithstanding — that one is about AHCI sense codes, not
//! this); the marker only needs to be self-describing enough for this crate's own reopen path
//! to find it. It is documented here, not left implicit, so a future reopen of an image written
//! by an older build of this crate can still recognize its markers (the version field gates
//! that).

use std::io::{Read, Seek, SeekFrom, Write};

use scsi_lib::core::addressing::Lba;
use scsi_lib::core::constants::SECTOR_SIZE;

/// Marks the start of a marker block; chosen to be vanishingly unlikely to occur as the first
/// 8 bytes of real ISO 9660 content (which always starts a volume descriptor at LBA 16, never
/// at a session's first block).
pub const MARKER_MAGIC: [u8; 8] = *b"CdGbToC1";
pub const MARKER_FORMAT_VERSION: u16 = 1;

/// One emulated session-boundary marker, occupying exactly one 2 KiB block immediately after a
/// session's data (spec §4.5, §3.1 "session leadouts").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMarker {
    pub session_number: u32,
    /// LBA this session's actual ISO data begins at. The marker itself occupies the block
    /// immediately following the data (`data_start + data_blocks`), not one before it, so that
    /// `WriteTarget::next_writable_address()` can keep meaning exactly where content starts
    /// without the caller needing to know a marker block exists at all.
    pub data_start: Lba,
    /// Length of this session's data in blocks, not counting the marker block. Zero while the
    /// session is still being written; patched in by [`write_marker`]'s caller once known.
    pub data_blocks: u32,
    /// LBA of the previous session's marker, or `None` for the first session.
    pub previous_marker: Option<Lba>,
}

impl SessionMarker {
    fn to_block(self) -> [u8; SECTOR_SIZE as usize] {
        let mut block = [0u8; SECTOR_SIZE as usize];
        block[0..8].copy_from_slice(&MARKER_MAGIC);
        block[8..10].copy_from_slice(&MARKER_FORMAT_VERSION.to_be_bytes());
        block[10..14].copy_from_slice(&self.session_number.to_be_bytes());
        block[14..18].copy_from_slice(&self.data_start.raw().to_be_bytes());
        block[18..22].copy_from_slice(&self.data_blocks.to_be_bytes());
        let previous = self.previous_marker.map(Lba::raw).unwrap_or(-1);
        block[22..26].copy_from_slice(&previous.to_be_bytes());
        block
    }

    fn from_block(block: &[u8]) -> Option<Self> {
        if block.len() < 26 || block[0..8] != MARKER_MAGIC {
            return None;
        }
        let version = u16::from_be_bytes(block[8..10].try_into().ok()?);
        if version != MARKER_FORMAT_VERSION {
            return None;
        }
        let session_number = u32::from_be_bytes(block[10..14].try_into().ok()?);
        let data_start = Lba::try_from(i32::from_be_bytes(block[14..18].try_into().ok()?)).ok()?;
        let data_blocks = u32::from_be_bytes(block[18..22].try_into().ok()?);
        let previous_raw = i32::from_be_bytes(block[22..26].try_into().ok()?);
        let previous_marker = if previous_raw < 0 { None } else { Lba::try_from(previous_raw).ok() };
        Some(Self { session_number, data_start, data_blocks, previous_marker })
    }
}

/// Write one marker block at `at`, returning the LBA the session's actual data starts at.
pub fn write_marker<W: Write + Seek>(w: &mut W, at: Lba, marker: SessionMarker) -> std::io::Result<Lba> {
    w.seek(SeekFrom::Start(u64::from(at.raw() as u32) * u64::from(SECTOR_SIZE)))?;
    w.write_all(&marker.to_block())?;
    Ok(marker.data_start)
}

/// Scan `r` from the start for every session marker, following the `previous_marker` chain
/// backward from the highest LBA found so the result is returned oldest-first, mirroring how a
/// real hardware TOC lists sessions in recording order.
pub fn scan_sessions<R: Read + Seek>(r: &mut R) -> std::io::Result<Vec<SessionMarker>> {
    let total_len = r.seek(SeekFrom::End(0))?;
    let total_blocks = total_len / u64::from(SECTOR_SIZE);

    let mut candidates = Vec::new();
    let mut block_buf = [0u8; SECTOR_SIZE as usize];
    let mut lba = 0i32;
    while u64::from(lba as u32) < total_blocks {
        r.seek(SeekFrom::Start(u64::from(lba as u32) * u64::from(SECTOR_SIZE)))?;
        if r.read_exact(&mut block_buf).is_err() {
            break;
        }
        if let Some(marker) = SessionMarker::from_block(&block_buf) {
            let next = marker.data_start.raw() + marker.data_blocks as i32;
            candidates.push(marker);
            lba = next.max(lba + 1);
        } else {
            lba += 1;
        }
    }

    candidates.sort_by_key(|m| m.session_number);
    Ok(candidates)
}

/// The address the next session's data should start at, i.e. one block past the last session's
/// trailing marker; `None` for a medium that carries no recognizable sessions yet (NWA is then
/// whatever the caller's own default is, typically `Lba::ZERO`).
pub fn next_writable_after(sessions: &[SessionMarker]) -> Option<Lba> {
    sessions.iter().max_by_key(|m| m.session_number).and_then(|last| {
        Lba::try_from(last.data_start.raw() + last.data_blocks as i32 + 1).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn marker_round_trips_through_block_bytes() {
        let marker = SessionMarker {
            session_number: 2,
            data_start: Lba::try_from(20).unwrap(),
            data_blocks: 100,
            previous_marker: Some(Lba::ZERO),
        };
        let block = marker.to_block();
        assert_eq!(SessionMarker::from_block(&block), Some(marker));
    }

    #[test]
    fn scan_finds_two_sessions_in_order() {
        let mut buf = Cursor::new(vec![0u8; 256 * SECTOR_SIZE as usize]);
        // Session 0's data occupies LBA 0..20; its marker trails at LBA 20.
        write_marker(
            &mut buf,
            Lba::try_from(20).unwrap(),
            SessionMarker { session_number: 0, data_start: Lba::ZERO, data_blocks: 20, previous_marker: None },
        )
        .unwrap();
        // Session 1's data occupies LBA 21..51; its marker trails at LBA 51.
        write_marker(
            &mut buf,
            Lba::try_from(51).unwrap(),
            SessionMarker {
                session_number: 1,
                data_start: Lba::try_from(21).unwrap(),
                data_blocks: 30,
                previous_marker: Some(Lba::try_from(20).unwrap()),
            },
        )
        .unwrap();

        let sessions = scan_sessions(&mut buf).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_number, 0);
        assert_eq!(sessions[1].session_number, 1);
        assert_eq!(next_writable_after(&sessions), Lba::try_from(52).ok());
    }

    #[test]
    fn empty_medium_has_no_sessions() {
        let mut buf = Cursor::new(vec![0u8; 64 * SECTOR_SIZE as usize]);
        let sessions = scan_sessions(&mut buf).unwrap();
        assert!(sessions.is_empty());
        assert_eq!(next_writable_after(&sessions), None);
    }
}
