use clap::{ArgAction, Parser, Subcommand};

use crate::cli::{
    auth::AuthCommand, dashboard::DashboardCommand, devices::DevicesCommand,
    locations::LocationsCommand, route::RouteCommand,
};

pub(crate) fn get_args() -> CliOpts {
    CliOpts::parse()
}

#[derive(Debug, Parser)]
#[command(name = "fleetdesk", version = clap::crate_version!())]
pub(crate) struct CliOpts {
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    subcmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in, sign out and inspect the stored session.
    Auth(AuthCommand),

    /// Manage locations.
    Locations(LocationsCommand),

    /// Manage devices.
    Devices(DevicesCommand),

    /// Show dashboard totals and recent activity.
    Dashboard(DashboardCommand),

    /// Check where navigation to a path would land.
    Route(RouteCommand),
}

impl CliOpts {
    pub(crate) fn verbose(&self) -> u8 {
        self.verbose
    }

    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        match &self.subcmd {
            Command::Auth(cmd) => cmd.run().await,
            Command::Locations(cmd) => cmd.run().await,
            Command::Devices(cmd) => cmd.run().await,
            Command::Dashboard(cmd) => cmd.run().await,
            Command::Route(cmd) => cmd.run().await,
        }
    }
}
