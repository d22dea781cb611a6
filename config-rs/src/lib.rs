//! config-rs/lib.rs
//! Shared configuration utilities for the relay workspace
//! Provides `.env` loading and standardized port/address resolution

use std::env;
use std::net::SocketAddr;

/// Load variables from a `.env` file in the working directory, if any.
///
/// Variables already present in the process environment win.
pub fn load_env() -> bool {
    match dotenv::dotenv() {
        Ok(path) => {
            log::debug!("Loaded environment from {}", path.display());
            true
        }
        Err(_) => false,
    }
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "RELAY")
/// * `default_port` - The default port to use if not specified in environment
///
/// Checks `<NAME>_SERVICE_PORT` first, then the conventional `PORT`.
///
/// # Returns
/// The port number to use for the service
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    let raw = env::var(&var_name).or_else(|_| env::var("PORT"));

    match raw {
        Ok(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {} or PORT, using default {}", var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding a service
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "RELAY")
/// * `default_port` - The default port to use if not specified in environment
///
/// # Returns
/// A SocketAddr configured with the appropriate bind address and port
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    // Check if there's a full address override
    if let Ok(addr_str) = env::var(&var_name) {
        if let Some(addr) = parse_socket_addr(&addr_str) {
            return addr;
        }
        log::warn!("Invalid address format in {}, using default", var_name);
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Parse `host:port`, accepting an optional `http://` or `https://` scheme.
fn parse_socket_addr(value: &str) -> Option<SocketAddr> {
    let trimmed = value.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);

    without_scheme.trim_end_matches('/').parse::<SocketAddr>().ok()
}
