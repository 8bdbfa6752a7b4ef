//! Argument parsing for the `chromadisc` binary. Per spec §1 this is glue only: no pattern
//! expansion, no interactive dialog, no mkisofs/cdrecord personality emulation — just enough
//! structure to drive the ISO Tree Engine, Growth Bridge and Drive Lifecycle Engine from a
//! shell.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chromadisc", version, about = "ISO 9660 / Rock Ridge / Joliet authoring and burning")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Device node to use when a subcommand needs one and `--device` isn't passed to it
    /// directly. Falls back to `CHROMADISC_DEVICE`.
    #[arg(long, global = true, env = "CHROMADISC_DEVICE")]
    pub device: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a new ISO 9660 image from disk content and write it to a regular file.
    Mkiso(MkisoArgs),
    /// Read back an existing image (or a later session of a multi-session one) and restore its
    /// tree to a directory on disk.
    Extract(ExtractArgs),
    /// Print identity, capabilities and media state for a drive, or the volume descriptor
    /// fields of an already-written image.
    Info(InfoArgs),
    /// Stream a rendered session onto optical media via the Drive Lifecycle Engine.
    Burn(BurnArgs),
}

/// One `DISK_PATH:IMAGE_PATH` graft pair, or `IMAGE_PATH` alone for an empty directory (mkdir).
#[derive(Debug, Clone)]
pub struct GraftArg {
    pub disk_path: Option<PathBuf>,
    pub image_path: String,
}

impl std::str::FromStr for GraftArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((disk, image)) if !disk.is_empty() => Ok(Self {
                disk_path: Some(PathBuf::from(disk)),
                image_path: image.to_string(),
            }),
            _ => Err(format!("`{s}` is not in DISK_PATH:IMAGE_PATH form")),
        }
    }
}

#[derive(Debug, Args)]
pub struct MkisoArgs {
    /// Path of the ISO image to create.
    #[arg(short, long)]
    pub output: PathBuf,

    /// One `disk_path:image_path` pair per occurrence; the disk side is grafted (recursively,
    /// for directories) at the image side.
    #[arg(short, long = "graft", value_name = "DISK:IMAGE")]
    pub grafts: Vec<GraftArg>,

    /// Append a new session after whatever sessions `output` already contains, instead of
    /// overwriting it from block 0.
    #[arg(long)]
    pub append: bool,

    #[arg(long, default_value = "CHROMADISC")]
    pub volume_id: String,
    #[arg(long, default_value = "")]
    pub publisher: String,
    #[arg(long, default_value = "")]
    pub preparer: String,
    #[arg(long, default_value = "")]
    pub application_id: String,

    /// Enable Rock Ridge (POSIX) extensions.
    #[arg(long)]
    pub rock_ridge: bool,
    /// Enable a parallel Joliet directory hierarchy.
    #[arg(long)]
    pub joliet: bool,
    /// Enable the 1999 ISO 9660 amendment's long-name directory records.
    #[arg(long)]
    pub iso9660_1999: bool,
    /// Carry AAIP extended attributes (xattrs/ACLs) alongside Rock Ridge.
    #[arg(long)]
    pub aaip: bool,
    /// Record a per-file MD5 content tag and an MD5 session checksum tag.
    #[arg(long)]
    pub record_md5: bool,

    /// Comma-separated relax-compliance flags: `lowercase`, `deep-paths`, `long-paths`,
    /// `30-char-names`, `omit-versions`.
    #[arg(long, value_delimiter = ',')]
    pub relax: Vec<String>,

    /// Extra zero blocks appended after the session's last extent.
    #[arg(long, default_value_t = 0)]
    pub padding_blocks: u32,
    /// Round the whole session up to a multiple of this many blocks.
    #[arg(long, default_value_t = 0)]
    pub alignment_blocks: u32,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Image to read. For a session other than the first, pass `--session-base`.
    #[arg(short, long)]
    pub image: PathBuf,
    /// Directory to restore into; must already exist.
    #[arg(short, long)]
    pub dest: PathBuf,
    /// LBA the session to read starts at (block 0 for the first/only session).
    #[arg(long, default_value_t = 0)]
    pub session_base: u32,
    /// Apply recorded uid/gid (normally only meaningful running as root).
    #[arg(long)]
    pub preserve_owner: bool,
    /// Apply recorded mtime/atime after writing content.
    #[arg(long)]
    pub preserve_times: bool,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Print volume descriptor fields of an already-written image instead of querying the
    /// drive named by the top-level `--device`/`CHROMADISC_DEVICE`.
    #[arg(short, long)]
    pub image: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BurnArgs {
    /// Already-rendered ISO image whose bytes are streamed onto the drive as the next session.
    #[arg(short, long)]
    pub image: PathBuf,
    /// Track number to address with SEND CUE SHEET / WRITE (spec §4.3 "writeTrack").
    #[arg(long, default_value_t = 1)]
    pub track_number: u8,
}
