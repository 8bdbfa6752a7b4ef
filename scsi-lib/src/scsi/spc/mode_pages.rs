//! MODE SENSE(10) / MODE SELECT(10), used to read page 2Ah (MMC capabilities and mechanical
//! status) and to stage page 05h (write parameters) before a write session.

use crate::scsi::{Command, Control, Direction};

const MODE_SENSE_10_RESPONSE_MIN: usize = 8;

#[derive(Debug)]
pub struct ModeSense10 {
    pub page_control: u8,
    pub page_code: u8,
    pub subpage_code: u8,
    pub allocation_length: u16,
    pub control: Control,
}

impl ModeSense10 {
    pub fn page_2a(control: Control) -> Self {
        Self {
            page_control: 0,
            page_code: 0x2A,
            subpage_code: 0,
            allocation_length: 255,
            control,
        }
    }

    pub fn page_05(control: Control) -> Self {
        Self {
            page_control: 0,
            page_code: 0x05,
            subpage_code: 0,
            allocation_length: 64,
            control,
        }
    }
}

impl Command<10> for ModeSense10 {
    const OP_CODE: u8 = 0x5A;

    type Response = ModeSenseResponse;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0] = Self::OP_CODE;
        bytes[2] = (self.page_control << 6) | (self.page_code & 0x3F);
        bytes[3] = self.subpage_code;
        bytes[7] = (self.allocation_length >> 8) as u8;
        bytes[8] = self.allocation_length as u8;
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        self.allocation_length.into()
    }
}

/// Raw MODE SENSE(10) response: the 8-byte mode parameter header followed by whatever page data
/// the drive chose to return.
///
/// Drives are documented (and occasionally observed) to truncate page 2Ah well below its nominal
/// length; [`Page2a::parse`] tolerates any response of at least 12 bytes rather than rejecting
/// short pages outright.
#[derive(Debug)]
pub struct ModeSenseResponse {
    pub raw: Vec<u8>,
}

impl TryFrom<Vec<u8>> for ModeSenseResponse {
    type Error = std::convert::Infallible;

    fn try_from(raw: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Self { raw })
    }
}

impl ModeSenseResponse {
    /// Mode page payload, after the mode parameter header and any block descriptors.
    pub fn page_data(&self) -> &[u8] {
        if self.raw.len() <= MODE_SENSE_10_RESPONSE_MIN {
            return &[];
        }
        let block_descriptor_len = u16::from_be_bytes([self.raw[6], self.raw[7]]) as usize;
        let start = MODE_SENSE_10_RESPONSE_MIN + block_descriptor_len;
        if start >= self.raw.len() { &[] } else { &self.raw[start..] }
    }
}

/// Page 2Ah: "CD/DVD Capabilities and Mechanical Status", decoded permissively.
#[derive(Debug, Clone, Copy, Default)]
pub struct Page2a {
    pub dvd_ram_read: bool,
    pub dvd_r_read: bool,
    pub cd_rw_read: bool,
    pub dvd_ram_write: bool,
    pub dvd_r_write: bool,
    pub cd_rw_write: bool,
    pub buffer_size_supported_kb: u16,
}

impl Page2a {
    /// Parse a page 2Ah body that the mode header has already stripped down to page bytes.
    ///
    /// The full page is 2 (header) + up to 30 bytes, but many real drives report a truncated
    /// page whose length byte undercounts what the spec wants. We only require the first 12
    /// bytes, which cover the fields we actually act on, and log a debug line rather than
    /// erroring when the drive sent fewer than the nominal 32.
    pub fn parse(page: &[u8]) -> Option<Self> {
        if page.len() < 12 {
            return None;
        }
        if page.len() < 32 {
            tracing::debug!(
                target: "chromadisc::cmd_trace",
                len = page.len(),
                "drive returned a short page 2Ah; parsing the fields that are present"
            );
        }

        Some(Self {
            dvd_ram_read: page[2] & 0x20 != 0,
            dvd_r_read: page[2] & 0x10 != 0,
            cd_rw_read: page[2] & 0x01 != 0,
            dvd_ram_write: page[3] & 0x20 != 0,
            dvd_r_write: page[3] & 0x10 != 0,
            cd_rw_write: page[3] & 0x01 != 0,
            buffer_size_supported_kb: u16::from_be_bytes([page[8], page[9]]),
        })
    }
}

/// WRITE TYPE field of page 05h (MMC-5 Table 381), the subset the growth bridge actually
/// selects between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
    /// Single incremental packet/track per command; closed explicitly (CD-R, DVD-R sequential).
    TrackAtOnce,
    /// One session containing possibly-multiple tracks closed together.
    SessionAtOnce,
    /// Overwriteable media (DVD+RW, DVD-RAM, BD-RE, formatted DVD-RW): no session semantics.
    Packet,
}

impl WriteType {
    fn code(self) -> u8 {
        match self {
            Self::TrackAtOnce => 0b001,
            Self::SessionAtOnce => 0b010,
            Self::Packet => 0b101,
        }
    }
}

/// Options the Drive Lifecycle Engine fills in before staging page 05h for a session
/// (spec §4.2 "Mode pages"): write type, target track's data block type, and whether the
/// session should be left open for further appends.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub write_type: WriteType,
    /// Data Block Type field (MMC-5 Table 381): 0x08 is Mode 1 data, the only block type the
    /// ISO tree engine's session writer emits.
    pub data_block_type: u8,
    /// MULTI-SESSION field: 0 = no more sessions, 3 = leave the session open for appending.
    pub multi_session: u8,
    pub track_mode: u8,
}

impl WriteOptions {
    /// The one combination the growth bridge needs for an appendable ISO 9660 session: Mode 1
    /// data blocks, track mode 4 (data track, incremental, no pre-emphasis), left open so a
    /// later session can still be appended.
    pub fn iso_session(write_type: WriteType, leave_open: bool) -> Self {
        Self {
            write_type,
            data_block_type: 0x08,
            multi_session: if leave_open { 0b11 } else { 0b00 },
            track_mode: 0x04,
        }
    }

    /// Assemble the 32-byte page 05h body (MMC-5 Table 381), given to [`ModeSelect10`] as
    /// `page_data` once written, and stored on the drive for the next MODE SELECT (spec §4.2
    /// "Mode pages").
    pub fn assemble(self) -> [u8; 32] {
        let mut page = [0u8; 32];
        page[0] = 0x05; // page code, PS=0
        page[1] = 0x32; // page length (50 bytes total - 2)
        page[2] = (u8::from(true) << 5) | self.write_type.code(); // BUFE=1 + write type
        page[3] = (self.multi_session << 6) | self.track_mode;
        page[4] = self.data_block_type & 0x0F;
        page
    }
}

#[derive(Debug)]
pub struct ModeSelect10 {
    pub save_pages: bool,
    pub page_data: Vec<u8>,
    pub control: Control,
}

impl Command<10> for ModeSelect10 {
    const OP_CODE: u8 = 0x55;

    type Response = super::request_sense::Ack;

    fn as_cdb(&self) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        let len = (8 + self.page_data.len()) as u16;
        bytes[0] = Self::OP_CODE;
        bytes[1] = 0x10 | u8::from(self.save_pages);
        bytes[7] = (len >> 8) as u8;
        bytes[8] = len as u8;
        bytes[9] = self.control.into();
        bytes
    }

    fn allocation_len(&self) -> usize {
        0
    }

    fn direction(&self) -> crate::scsi::Direction {
        crate::scsi::Direction::ToDevice
    }

    fn write_payload(&self) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; 8];
        buf.extend_from_slice(&self.page_data);
        Some(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page2a_rejects_truly_short_pages() {
        assert!(Page2a::parse(&[0u8; 4]).is_none());
    }

    #[test]
    fn page2a_tolerates_undersized_but_usable_page() {
        let mut page = vec![0u8; 12];
        page[2] = 0x21; // DVD-RAM read + CD-RW read
        page[3] = 0x10; // DVD-R write
        let parsed = Page2a::parse(&page).expect("12-byte page should still parse");
        assert!(parsed.dvd_ram_read);
        assert!(parsed.cd_rw_read);
        assert!(parsed.dvd_r_write);
    }

    #[test]
    fn write_options_iso_session_leaves_multi_session_open() {
        let open = WriteOptions::iso_session(WriteType::TrackAtOnce, true).assemble();
        let closed = WriteOptions::iso_session(WriteType::TrackAtOnce, false).assemble();
        assert_eq!(open[3] >> 6, 0b11);
        assert_eq!(closed[3] >> 6, 0b00);
        assert_eq!(open[0], 0x05);
        assert_eq!(open[4] & 0x0F, 0x08);
    }
}
