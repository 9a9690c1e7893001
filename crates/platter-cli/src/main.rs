//! Platter CLI
//!
//! Inspect raw disk images and virtual disks: partition tables, descriptor
//! layout, address translation and raw sector contents.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use platter_core::{BlockDevice, ZoneTable, SECTOR_SIZE};
use platter_pipeline::PartialDevice;
use platter_vaults::vdisk::{read_descriptor, DiskAddressTranslator};
use platter_vaults::{open_vault, VaultConfig};
use platter_zones::read_zone_table;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "platter")]
#[command(about = "Disk image, partition table and virtual disk inspector", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log detection and parse steps
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Open images without write access
    #[arg(long, global = true)]
    read_only: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Size, sector count and partition table type
    Info { image: PathBuf },

    /// List partition table entries
    Zones {
        image: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Show a virtual disk descriptor
    Vdisk {
        descriptor: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Map a virtual disk sector to its extent
    Translate {
        descriptor: PathBuf,
        #[arg(allow_negative_numbers = true)]
        sector: i64,
    },

    /// Hex dump of one sector
    ReadSector {
        image: PathBuf,
        sector: u64,
        /// Address sectors relative to this partition
        #[arg(long)]
        zone: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = VaultConfig {
        read_only: cli.read_only,
        ..VaultConfig::default()
    };

    match cli.command {
        Command::Info { image } => cmd_info(&image, config),
        Command::Zones { image, json } => cmd_zones(&image, config, json),
        Command::Vdisk { descriptor, json } => cmd_vdisk(&descriptor, json),
        Command::Translate { descriptor, sector } => cmd_translate(&descriptor, sector),
        Command::ReadSector { image, sector, zone } => cmd_read_sector(&image, config, sector, zone),
    }
}

fn open(path: &Path, config: VaultConfig) -> Result<Box<dyn BlockDevice>> {
    let device = open_vault(path, config).with_context(|| format!("cannot open {}", path.display()))?;
    tracing::debug!(path = %path.display(), kind = device.identify(), sectors = device.sector_count(), "opened image");
    Ok(device)
}

fn zone_table(device: &mut dyn BlockDevice, path: &Path) -> Result<Option<Box<dyn ZoneTable>>> {
    read_zone_table(device).with_context(|| format!("cannot read partition table of {}", path.display()))
}

fn cmd_info(path: &Path, config: VaultConfig) -> Result<()> {
    let mut device = open(path, config)?;

    println!("=== Image ===");
    println!("Path:     {}", path.display());
    println!("Type:     {}", device.identify());
    println!("Size:     {} bytes ({})", device.length(), format_bytes(device.length()));
    println!("Sectors:  {}", device.sector_count());
    println!();

    match zone_table(device.as_mut(), path)? {
        Some(table) => {
            println!("=== Partition Table ===");
            println!("Type:        {}", table.identify());
            println!("Partitions:  {}", table.entries().len());
        }
        None => println!("No recognized partition table found."),
    }
    Ok(())
}

fn cmd_zones(path: &Path, config: VaultConfig, json: bool) -> Result<()> {
    let mut device = open(path, config)?;
    let table = zone_table(device.as_mut(), path)?;

    if json {
        let entries = table.as_ref().map(|t| t.entries()).unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    let Some(table) = table else {
        println!("No recognized partition table found.");
        println!("This may be an unpartitioned volume.");
        return Ok(());
    };

    println!("Partition table: {}", table.identify());
    println!();
    if table.entries().is_empty() {
        println!("No partitions found.");
        return Ok(());
    }

    println!(
        "{:<5} {:>12} {:>12} {:<5} {:<36} {}",
        "Index", "Start", "Sectors", "Boot", "Type", "Name"
    );
    println!("{}", "-".repeat(90));
    for entry in table.iter() {
        println!(
            "{:<5} {:>12} {:>12} {:<5} {:<36} {}",
            entry.index,
            entry.start_sector,
            entry.sector_count,
            if entry.bootable { "*" } else { "" },
            entry.type_name,
            entry.raw_name
        );
    }
    Ok(())
}

fn cmd_vdisk(path: &Path, json: bool) -> Result<()> {
    let descriptor = read_descriptor(path).with_context(|| format!("cannot read descriptor {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    let header = &descriptor.header;
    println!("=== Virtual Disk ===");
    println!("Path:         {}", path.display());
    if let Some(version) = header.version {
        println!("Version:      {}", version);
    }
    if let Some(cid) = header.cid {
        println!("CID:          {:08x}", cid);
    }
    if header.has_parent() {
        println!("Parent CID:   {:08x}", header.parent_cid.unwrap_or_default());
    }
    if let Some(create_type) = &header.create_type {
        println!("Create type:  {}", create_type);
    }
    if let Some(adapter) = descriptor.adapter_type() {
        println!("Adapter:      {}", adapter);
    }
    println!(
        "Capacity:     {} sectors ({})",
        descriptor.total_sectors(),
        format_bytes(descriptor.length())
    );
    match descriptor.geometry {
        Some(g) => println!(
            "Geometry:     {} cylinders, {} heads, {} sectors/track",
            g.cylinders, g.heads, g.sectors_per_track
        ),
        None => println!("Geometry:     none"),
    }
    if !descriptor.geometry_consistent() {
        println!("              (geometry does not cover the extents exactly)");
    }

    println!();
    println!("=== Extents ===");
    println!("{:<5} {:<8} {:>12} {:<10} {}", "Index", "Access", "Sectors", "Kind", "File");
    println!("{}", "-".repeat(60));
    for (index, extent) in descriptor.extents.iter().enumerate() {
        println!(
            "{:<5} {:<8} {:>12} {:<10} {}",
            index,
            extent.access.to_string(),
            extent.size_in_sectors,
            extent.kind.to_string(),
            extent.file_name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_translate(path: &Path, sector: i64) -> Result<()> {
    let descriptor = read_descriptor(path).with_context(|| format!("cannot read descriptor {}", path.display()))?;
    let translator = DiskAddressTranslator::new(&descriptor.extents)?;
    let (index, local) = translator
        .translate(sector)
        .with_context(|| format!("sector {} is outside the disk", sector))?;
    let extent = &descriptor.extents[index];

    println!("Sector:   {}", sector);
    println!("Extent:   {} ({})", index, extent);
    println!("File:     {}", extent.file_name.as_deref().unwrap_or("-"));
    println!("Local:    {}", local);
    if extent.offset != 0 {
        println!("In file:  {}", extent.offset + local);
    }
    Ok(())
}

fn cmd_read_sector(path: &Path, config: VaultConfig, sector: u64, zone: Option<usize>) -> Result<()> {
    let mut device = open(path, config)?;
    let mut buf = vec![0u8; SECTOR_SIZE];

    match zone {
        Some(index) => {
            let Some(table) = zone_table(device.as_mut(), path)? else {
                bail!("{} has no partition table", path.display());
            };
            let Some(entry) = table.get_entry(index).cloned() else {
                bail!("partition {} not found ({} entries)", index, table.entries().len());
            };
            let mut partition = PartialDevice::for_entry(device, &entry)?;
            partition
                .read_sector(sector, &mut buf)
                .with_context(|| format!("cannot read sector {} of partition {}", sector, index))?;
            println!("Partition {} sector {} (absolute {})", index, sector, partition.start() + sector);
        }
        None => {
            device
                .read_sector(sector, &mut buf)
                .with_context(|| format!("cannot read sector {}", sector))?;
            println!("Sector {}", sector);
        }
    }

    print_hex_dump(&buf);
    Ok(())
}

fn print_hex_dump(data: &[u8]) {
    for (row, chunk) in data.chunks(16).enumerate() {
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!("{:04x}  {:<32}  {}", row * 16, hex::encode(chunk), ascii);
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1_048_576 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else if bytes < 1_073_741_824 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_translate() {
        let cli = Cli::try_parse_from(["platter", "translate", "disk.vmdk", "1500"]).unwrap();
        assert!(matches!(cli.command, Command::Translate { sector: 1500, .. }));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1_048_576), "3.00 MB");
    }
}
