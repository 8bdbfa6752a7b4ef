//! `chromadisc mkiso`: graft disk content into a fresh [`iso_tree::Volume`] and render one
//! session through the file-backed [`growth_bridge::FileBackend`] (spec §4.4.2, §4.4.8, §4.5
//! "File back-end").

use std::sync::atomic::AtomicBool;

use growth_bridge::FileBackend;
use growth_bridge::file_backend::AppendMode;
use indicatif::{ProgressBar, ProgressStyle};
use iso_tree::graft::{graft, GraftConfig, GraftOptions};
use iso_tree::write::{ComplianceLevel, RelaxFlags, WriteOptions, write_session};
use iso_tree::Volume;

use crate::cli::MkisoArgs;
use crate::error::Result;

fn parse_relax(names: &[String]) -> RelaxFlags {
    let mut flags = RelaxFlags::empty();
    for name in names {
        flags |= match name.as_str() {
            "lowercase" => RelaxFlags::ALLOW_LOWERCASE,
            "deep-paths" => RelaxFlags::ALLOW_DEEP_PATHS,
            "long-paths" => RelaxFlags::ALLOW_LONG_PATHS,
            "30-char-names" => RelaxFlags::ALLOW_30_CHAR_NAMES,
            "omit-versions" => RelaxFlags::OMIT_VERSION_NUMBERS,
            other => {
                tracing::warn!(flag = other, "unrecognized --relax flag, ignoring");
                RelaxFlags::empty()
            }
        };
    }
    flags
}

pub fn run(args: MkisoArgs) -> Result<()> {
    let mut volume = Volume::new();
    volume.volume_id = args.volume_id.clone();
    volume.publisher = args.publisher.clone();
    volume.data_preparer = args.preparer.clone();
    volume.application_id = args.application_id.clone();

    let graft_cfg = GraftConfig::default();
    for entry in &args.grafts {
        let options = match &entry.disk_path {
            Some(disk_path) => GraftOptions::disk(disk_path),
            None => GraftOptions::mkdir(),
        };
        graft(&volume.root, &entry.image_path, options, graft_cfg, &|_| false)?;
        tracing::debug!(image_path = %entry.image_path, "grafted");
    }

    let options = WriteOptions {
        compliance_level: ComplianceLevel::L1,
        rock_ridge: args.rock_ridge,
        joliet: args.joliet,
        iso9660_1999: args.iso9660_1999,
        hfsplus: false,
        fat: false,
        aaip: args.aaip,
        record_md5: args.record_md5,
        partition_offset: 0,
        volume_uuid_override: None,
        relax: parse_relax(&args.relax),
        padding_blocks: args.padding_blocks,
        alignment_blocks: args.alignment_blocks,
        stream_recording: false,
        dvd_output_block_size: scsi_lib::core::constants::DEFAULT_OBS,
    };

    let mode = if args.append { AppendMode::Append } else { AppendMode::Overwrite };
    let mut backend = FileBackend::open(&args.output, mode)?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    progress.set_message(format!("writing session to {}", args.output.display()));
    progress.enable_steady_tick(std::time::Duration::from_millis(120));

    let cancel = AtomicBool::new(false);
    let report = write_session(&volume, &options, &mut backend, &cancel)?;
    backend.finalize()?;

    progress.finish_and_clear();
    println!(
        "wrote {} blocks starting at LBA {} (root extent LBA {})",
        report.blocks_written,
        report.session_start.raw(),
        report.root_extent.raw(),
    );
    Ok(())
}
