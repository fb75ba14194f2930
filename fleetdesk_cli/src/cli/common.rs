use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use fleetdesk_api::{
    ApiConfig, KeyringTokenStore, ReqwestTransport, StoredCredentials, TokenLifetimes,
};
use fleetdesk_app::FleetSession;
use fleetdesk_core::{Device, Location, Timestamp};

const KEYRING_SERVICE: &str = "fleetdesk";
const KEYRING_ACCOUNT: &str = "session";

pub(crate) type CliSession = FleetSession<KeyringTokenStore>;

pub(crate) fn load_api_config() -> anyhow::Result<ApiConfig> {
    let mut config = ApiConfig::default();
    if let Ok(base_url) = env::var("FLEETDESK_API_URL") {
        config.base_url = base_url;
    }
    if let Ok(user_agent) = env::var("FLEETDESK_USER_AGENT") {
        config.user_agent = user_agent;
    }
    if let Some(ttl) = duration_from_env("FLEETDESK_ACCESS_TTL_SECS")? {
        config.access_token_ttl = ttl;
    }
    if let Some(ttl) = duration_from_env("FLEETDESK_REFRESH_TTL_SECS")? {
        config.refresh_token_ttl = ttl;
    }

    config.validate().context("invalid API configuration")?;
    Ok(config)
}

pub(crate) fn build_session() -> anyhow::Result<CliSession> {
    let config = load_api_config()?;
    let transport = ReqwestTransport::new(&config).context("failed to create HTTP transport")?;
    log::debug!("using API at {}", transport.base_url());

    let store = KeyringTokenStore::new(KEYRING_SERVICE, KEYRING_ACCOUNT);
    Ok(FleetSession::new(
        store,
        Arc::new(transport),
        TokenLifetimes::from(&config),
    ))
}

pub(crate) fn print_credentials(credentials: &StoredCredentials) {
    let now = Timestamp::now();
    println!("Updated at: {}", credentials.updated_at);
    println!(
        "Access token: {}",
        describe_expiry(credentials.access_expires_at, now)
    );
    println!(
        "Refresh token: {}",
        describe_expiry(credentials.refresh_expires_at, now)
    );
}

pub(crate) fn print_location(location: &Location) {
    println!(
        "{}  {}  [{}]  {} device(s)",
        location.id,
        location.title,
        location.status,
        location.device_count()
    );
    println!("    {}", location.address);
}

pub(crate) fn print_device(device: &Device) {
    println!(
        "{}  {}  {}  [{}]  at {}",
        device.id,
        device.serial_number,
        device.device_type,
        device.status,
        device.location_id
    );
    if let Some(name) = &device.name {
        println!("    name: {name}");
    }
    if let Some(image) = &device.image_ref {
        println!("    image: {image}");
    }
}

fn describe_expiry(expires_at: Timestamp, now: Timestamp) -> String {
    let remaining = expires_at.signed_duration_since(now).num_seconds();
    if remaining >= 0 {
        format!("valid until {expires_at} (in {remaining}s)")
    } else {
        format!("expired at {expires_at} ({}s ago)", -remaining)
    }
}

fn duration_from_env(name: &str) -> anyhow::Result<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("`{name}` must be a whole number of seconds"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}
