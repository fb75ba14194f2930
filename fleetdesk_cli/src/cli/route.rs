use clap::Args;
use fleetdesk_core::RouteDecision;

use crate::cli::common::build_session;

#[derive(Debug, Args)]
pub(crate) struct RouteCommand {
    /// Path to check, e.g. `/devices/abc`.
    path: String,
}

impl RouteCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;
        let decision = session.guard(&self.path);

        match decision.redirect_target(session.route_guard()) {
            None => println!("{}: allowed", self.path),
            Some(target) => match decision {
                RouteDecision::RedirectToLogin { .. } => {
                    println!("{}: login required, redirect to {target}", self.path)
                }
                _ => println!("{}: already signed in, redirect to {target}", self.path),
            },
        }
        Ok(())
    }
}
