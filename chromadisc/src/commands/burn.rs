//! `chromadisc burn`: stream an already-rendered ISO image onto optical media as the next
//! session (spec §4.3 "writeTrack", §4.5 "Drive back-end").
//!
//! This does not re-render from a tree; it takes bytes already laid out by `mkiso` (or any
//! other ISO 9660 writer) and drives them through the Drive Lifecycle Engine exactly as the
//! Growth Bridge's drive back-end would for a freshly computed session.

use std::fs::File;
use std::sync::atomic::AtomicBool;

use drive_lifecycle::DriveLifecycle;
use growth_bridge::backend::WriteTarget;
use growth_bridge::DriveBackend;
use indicatif::{ProgressBar, ProgressStyle};
use scsi_lib::transport::sgio::LinuxSgAdapter;

use crate::cli::BurnArgs;
use crate::error::{CliError, Result};
use crate::signal;

pub fn run(args: BurnArgs, fallback_device: Option<String>) -> Result<()> {
    let devnode = fallback_device.ok_or(CliError::NoDriveFound)?;

    let adapter = LinuxSgAdapter;
    let mut lifecycle = DriveLifecycle::grab(adapter, &devnode)?;
    lifecycle.probe();
    lifecycle.read_toc()?;

    let mut backend = DriveBackend::new(lifecycle, args.track_number);
    let mut content = File::open(&args.image)?;
    let cancel = std::sync::Arc::new(AtomicBool::new(false));

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    progress.set_message(format!("burning {} to {devnode}", args.image.display()));
    progress.enable_steady_tick(std::time::Duration::from_millis(120));

    // A signal only flips `signal::abort_requested()`; this thread is the bridge that turns
    // that into the `cancel` flag `write_track`'s streaming loop actually polls (spec §5
    // "Cancellation").
    let watcher_cancel = cancel.clone();
    let watcher_done = std::sync::Arc::new(AtomicBool::new(false));
    let watcher_done_flag = watcher_done.clone();
    let watcher = std::thread::spawn(move || {
        while !watcher_done_flag.load(std::sync::atomic::Ordering::Relaxed) {
            if signal::abort_requested() {
                watcher_cancel.store(true, std::sync::atomic::Ordering::Relaxed);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    });

    let write_result = backend.write_session(&mut content, &cancel);
    let finalize_result = backend.finalize();

    watcher_done.store(true, std::sync::atomic::Ordering::Relaxed);
    let _ = watcher.join();

    progress.finish_and_clear();

    let report = write_result?;
    finalize_result?;

    if report.cancelled {
        println!("burn cancelled after {} blocks", report.blocks_written);
    } else {
        println!("burned {} blocks starting at LBA {}", report.blocks_written, report.session_start.raw());
    }
    Ok(())
}
