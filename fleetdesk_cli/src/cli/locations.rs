use anyhow::Context;
use clap::{Args, Subcommand};
use fleetdesk_core::{DeviceId, EntityStatus, LocationId, LocationPatch, NewLocation};

use crate::cli::common::{build_session, print_location};

#[derive(Debug, Args)]
pub(crate) struct LocationsCommand {
    #[command(subcommand)]
    subcmd: LocationsSubcommand,
}

#[derive(Debug, Subcommand)]
enum LocationsSubcommand {
    /// List all locations.
    List,

    /// Show one location.
    Get { id: String },

    /// Create a location.
    Create(CreateLocation),

    /// Change selected fields of a location.
    Update(UpdateLocation),

    /// Delete a location. Its devices are left in place.
    Delete { id: String },
}

#[derive(Debug, Args)]
struct CreateLocation {
    #[arg(long)]
    title: String,

    #[arg(long)]
    address: String,

    #[arg(long, default_value = "active")]
    status: EntityStatus,

    /// Device to attach; repeat for several.
    #[arg(long = "device")]
    devices: Vec<String>,
}

#[derive(Debug, Args)]
struct UpdateLocation {
    id: String,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    address: Option<String>,

    #[arg(long)]
    status: Option<EntityStatus>,
}

impl LocationsCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;

        match &self.subcmd {
            LocationsSubcommand::List => {
                let locations = session
                    .fetch_locations()
                    .await
                    .context("failed to list locations")?;
                if locations.is_empty() {
                    println!("No locations.");
                }
                for location in &locations {
                    print_location(location);
                }
            }
            LocationsSubcommand::Get { id } => {
                let location = session
                    .fetch_location(&LocationId::from(id.as_str()))
                    .await
                    .with_context(|| format!("failed to load location {id}"))?;
                print_location(&location);
                for device_id in &location.device_ids {
                    println!("    - {device_id}");
                }
            }
            LocationsSubcommand::Create(args) => {
                let location = NewLocation {
                    title: args.title.clone(),
                    address: args.address.clone(),
                    status: args.status,
                    device_ids: args
                        .devices
                        .iter()
                        .map(|id| DeviceId::from(id.as_str()))
                        .collect(),
                };
                let created = session
                    .create_location(&location)
                    .await
                    .context("failed to create location")?;
                println!("Created location:");
                print_location(&created);
            }
            LocationsSubcommand::Update(args) => {
                let patch = LocationPatch {
                    title: args.title.clone(),
                    address: args.address.clone(),
                    status: args.status,
                    device_ids: None,
                };
                let updated = session
                    .update_location(&LocationId::from(args.id.as_str()), &patch)
                    .await
                    .with_context(|| format!("failed to update location {}", args.id))?;
                println!("Updated location:");
                print_location(&updated);
            }
            LocationsSubcommand::Delete { id } => {
                session
                    .delete_location(&LocationId::from(id.as_str()))
                    .await
                    .with_context(|| format!("failed to delete location {id}"))?;
                println!("Deleted location {id}.");
            }
        }

        Ok(())
    }
}
