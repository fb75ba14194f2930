use anyhow::Context;
use clap::{Args, Subcommand};
use fleetdesk_api::SessionStatus;

use crate::cli::common::{build_session, print_credentials};

#[derive(Debug, Args)]
pub(crate) struct AuthCommand {
    #[command(subcommand)]
    subcmd: AuthSubcommand,
}

#[derive(Debug, Subcommand)]
enum AuthSubcommand {
    /// Log in and persist the session in the keyring.
    Login(LoginCommand),

    /// Create an account and log in.
    Register(RegisterCommand),

    /// Show stored session metadata.
    Status(StatusCommand),

    /// Show the signed-in user.
    Me(MeCommand),

    /// Log out and remove the stored session.
    Logout(LogoutCommand),
}

impl AuthCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        match &self.subcmd {
            AuthSubcommand::Login(cmd) => cmd.run().await,
            AuthSubcommand::Register(cmd) => cmd.run().await,
            AuthSubcommand::Status(cmd) => cmd.run().await,
            AuthSubcommand::Me(cmd) => cmd.run().await,
            AuthSubcommand::Logout(cmd) => cmd.run().await,
        }
    }
}

#[derive(Debug, Args)]
struct LoginCommand {
    #[arg(long)]
    email: String,

    #[arg(long, env = "FLEETDESK_PASSWORD", hide_env_values = true)]
    password: String,
}

impl LoginCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;
        let user = session
            .login(&self.email, &self.password)
            .await
            .context("login failed")?;

        println!("Logged in as {} <{}>", user.name, user.email);
        if let Some(credentials) = session.vault().stored() {
            print_credentials(&credentials);
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
struct RegisterCommand {
    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    #[arg(long, env = "FLEETDESK_PASSWORD", hide_env_values = true)]
    password: String,
}

impl RegisterCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;
        let user = session
            .register(&self.name, &self.email, &self.password)
            .await
            .context("registration failed")?;

        println!("Registered {} <{}> ({})", user.name, user.email, user.id);
        Ok(())
    }
}

#[derive(Debug, Args)]
struct StatusCommand {
    /// Exchange the refresh token now.
    #[arg(long)]
    refresh: bool,
}

impl StatusCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;
        if self.refresh {
            session
                .refresh_session()
                .await
                .context("session refresh failed")?;
            println!("Session refreshed.");
        }

        match session.status() {
            SessionStatus::Authenticated => println!("Status: signed in"),
            SessionStatus::LoginRequired => println!("Status: login required"),
        }
        match session.vault().stored() {
            Some(credentials) => print_credentials(&credentials),
            None => println!("No session stored in keyring."),
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
struct MeCommand {}

impl MeCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;
        let user = session
            .current_user()
            .await
            .context("failed to load current user")?;

        println!("{} <{}> ({})", user.name, user.email, user.id);
        Ok(())
    }
}

#[derive(Debug, Args)]
struct LogoutCommand {}

impl LogoutCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let session = build_session()?;
        session.logout().await;
        println!("Cleared stored session from keyring.");
        Ok(())
    }
}
