use anyhow::Context;
use clap::{Args, Subcommand};
use fleetdesk_core::{DeviceId, DevicePatch, DeviceType, EntityStatus, LocationId, NewDevice};

use crate::cli::common::{build_session, print_device};

#[derive(Debug, Args)]
pub(crate) struct DevicesCommand {
    #[command(subcommand)]
    subcmd: DevicesSubcommand,
}

#[derive(Debug, Subcommand)]
enum DevicesSubcommand {
    /// List devices, optionally only those at one location.
    List {
        #[arg(long)]
        location: Option<String>,
    },

    /// Show one device.
    Get { id: String },

    /// Register a device at a location (at most 10 per location).
    Create(CreateDevice),

    /// Change selected fields of a device, or move it.
    Update(UpdateDevice),

    /// Delete a device.
    Delete { id: String },
}

#[derive(Debug, Args)]
struct CreateDevice {
    #[arg(long)]
    serial: String,

    #[arg(long = "type")]
    device_type: DeviceType,

    #[arg(long)]
    location: String,

    #[arg(long, default_value = "active")]
    status: EntityStatus,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    image: Option<String>,
}

#[derive(Debug, Args)]
struct UpdateDevice {
    id: String,

    #[arg(long)]
    serial: Option<String>,

    #[arg(long = "type")]
    device_type: Option<DeviceType>,

    #[arg(long)]
    status: Option<EntityStatus>,

    /// Move the device to another location.
    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    image: Option<String>,
}

impl DevicesCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;

        match &self.subcmd {
            DevicesSubcommand::List { location } => {
                session
                    .fetch_devices()
                    .await
                    .context("failed to list devices")?;
                let devices = match location {
                    Some(location) => session
                        .devices()
                        .at_location(&LocationId::from(location.as_str())),
                    None => session.devices().items(),
                };
                if devices.is_empty() {
                    println!("No devices.");
                }
                for device in &devices {
                    print_device(device);
                }
            }
            DevicesSubcommand::Get { id } => {
                let device = session
                    .fetch_device(&DeviceId::from(id.as_str()))
                    .await
                    .with_context(|| format!("failed to load device {id}"))?;
                print_device(&device);
            }
            DevicesSubcommand::Create(args) => {
                let device = NewDevice {
                    serial_number: args.serial.clone(),
                    name: args.name.clone(),
                    device_type: args.device_type,
                    status: args.status,
                    location_id: LocationId::from(args.location.as_str()),
                    image_ref: args.image.clone(),
                };
                let created = session
                    .create_device(&device)
                    .await
                    .context("failed to create device")?;
                println!("Created device:");
                print_device(&created);
            }
            DevicesSubcommand::Update(args) => {
                let patch = DevicePatch {
                    serial_number: args.serial.clone(),
                    name: args.name.clone(),
                    device_type: args.device_type,
                    status: args.status,
                    location_id: args
                        .location
                        .as_deref()
                        .map(LocationId::from),
                    image_ref: args.image.clone(),
                };
                let updated = session
                    .update_device(&DeviceId::from(args.id.as_str()), &patch)
                    .await
                    .with_context(|| format!("failed to update device {}", args.id))?;
                println!("Updated device:");
                print_device(&updated);
            }
            DevicesSubcommand::Delete { id } => {
                session
                    .delete_device(&DeviceId::from(id.as_str()))
                    .await
                    .with_context(|| format!("failed to delete device {id}"))?;
                println!("Deleted device {id}.");
            }
        }

        Ok(())
    }
}
