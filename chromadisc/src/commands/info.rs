//! `chromadisc info`: either the identity/capabilities/media state of a grabbed drive (spec
//! §3.1), or the volume descriptor fields of an already-written image.

use scsi_lib::device::Drive;
use scsi_lib::transport::sgio::LinuxSgAdapter;

use crate::cli::InfoArgs;
use crate::error::{CliError, Result};

pub fn run(args: InfoArgs, fallback_device: Option<String>) -> Result<()> {
    if let Some(image) = &args.image {
        let volume = iso_tree::read_volume(image)?;
        println!("volume id:        {}", volume.volume_id);
        println!("publisher:        {}", volume.publisher);
        println!("data preparer:    {}", volume.data_preparer);
        println!("application id:   {}", volume.application_id);
        println!("creation time:    {}", volume.creation_time);
        println!("El Torito images: {}", volume.boot_catalog.entries().len());
        return Ok(());
    }

    let devnode = fallback_device.ok_or(CliError::NoDriveFound)?;

    let adapter = LinuxSgAdapter;
    let mut drive = Drive::grab(&adapter, &devnode).map_err(|e| CliError::Io(std::io::Error::other(e.to_string())))?;
    drive.probe(&adapter);

    println!("device:    {}", drive.identity.devnode);
    println!("vendor:    {}", drive.identity.vendor);
    println!("product:   {}", drive.identity.product_id);
    println!("revision:  {}", drive.identity.revision);
    println!("removable: {}", drive.identity.removable_medium);
    match drive.capabilities.page_2a {
        Some(page) => {
            println!(
                "write:     CD-RW={} DVD-R={} DVD-RAM={}  (buffer {} KiB)",
                page.cd_rw_write, page.dvd_r_write, page.dvd_ram_write, page.buffer_size_supported_kb
            );
        }
        None => println!("write:     capabilities not probed (page 2Ah unavailable)"),
    }

    Ok(())
}
