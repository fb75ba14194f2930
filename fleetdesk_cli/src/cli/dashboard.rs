use anyhow::Context;
use clap::Args;

use crate::cli::common::{build_session, print_device, print_location};

#[derive(Debug, Args)]
pub(crate) struct DashboardCommand {}

impl DashboardCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;
        let overview = session
            .dashboard()
            .await
            .context("failed to load dashboard")?;

        let stats = &overview.stats;
        println!(
            "Locations: {} ({} active)",
            stats.total_locations, stats.active_locations
        );
        println!(
            "Devices: {} ({} active)",
            stats.total_devices, stats.active_devices
        );
        println!("Issues: {}", stats.issues);

        println!("\nRecent locations:");
        for location in &overview.recent_locations {
            print_location(location);
        }
        println!("\nRecent devices:");
        for device in &overview.recent_devices {
            print_device(device);
        }
        Ok(())
    }
}
