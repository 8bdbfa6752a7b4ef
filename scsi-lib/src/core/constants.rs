/// The number of frames per second of audio.
pub const FRAMES_PER_SECOND: u8 = 75;

/// The number of frames per minute of audio.
pub const FRAMES_PER_MINUTE: u16 = FRAMES_PER_SECOND as u16 * 60;

/// The number of frames in the pregap.
///
/// CDs are designed so that the first frame of playable audio actually occurs at 00:02:00 (2
/// seconds in), meaning there are 150 frames of gap between the first Logical Block Address
/// (LBA) at 00:00:00 and the first Logical Sector Number (LSN) at 00:02:00.
pub const PREGAP_OFFSET: u8 = FRAMES_PER_SECOND * 2;

/// One ISO 9660 / MMC logical block, in bytes.
pub const SECTOR_SIZE: u32 = 2048;

/// Default DVD write burst size (§4.3 "writeTrack").
pub const DEFAULT_OBS: usize = 32 * 1024;

/// Alternate DVD write burst size some drives prefer.
pub const LARGE_OBS: usize = 64 * 1024;

pub const CHROMADISC_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout (ms) for SPC/SBC/MMC commands not otherwise listed (spec §6.4).
pub const DEFAULT_TIMEOUT_MS: u32 = 30_000;

/// Timeout (ms) for WRITE(10)/WRITE(12), RESERVE_TRACK, CLOSE_TRACK/SESSION, BLANK,
/// FORMAT_UNIT, SEND_OPC_INFORMATION and SYNCHRONIZE_CACHE.
pub const LONG_OPERATION_TIMEOUT_MS: u32 = 200_000;

/// Timeout (ms) for START_STOP_UNIT when loading media.
pub const LOAD_TIMEOUT_MS: u32 = 300_000;
