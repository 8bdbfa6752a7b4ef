//! `chromadisc extract`: load an existing image's primary hierarchy and restore it to disk
//! (spec §4.4.3 "Restore reconstruction", §8 round-trip property).

use iso_tree::extract::RestoreOptions;
use iso_tree::{read_session_at, restore_to_disk};
use scsi_lib::core::addressing::Lba;

use crate::cli::ExtractArgs;
use crate::error::Result;

pub fn run(args: ExtractArgs) -> Result<()> {
    let session_base = i32::try_from(args.session_base)
        .ok()
        .and_then(|raw| Lba::try_from(raw).ok())
        .unwrap_or(Lba::ZERO);
    let volume = read_session_at(&args.image, session_base)?;

    std::fs::create_dir_all(&args.dest)?;
    restore_to_disk(
        &volume.root,
        &args.dest,
        RestoreOptions {
            preserve_owner: args.preserve_owner,
            preserve_times: args.preserve_times,
        },
    )?;

    println!("restored `{}` into `{}`", volume.volume_id, args.dest.display());
    Ok(())
}
