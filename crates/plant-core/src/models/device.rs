//! Device Models
//!
//! Registered devices, the add-device form, and server address handling.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Highest accepted seed value for the moisture and light sliders.
pub const MAX_SEED_VALUE: i32 = 10;

/// A registered plant-care device
///
/// Serialized as one element of the registry blob. The legacy keys
/// `portNumber` and `flaskServerIp` written by earlier app builds are
/// accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Display label
    pub name: String,

    /// Unique registry key (historically the device port number)
    #[serde(alias = "portNumber")]
    pub id: String,

    /// `host[:port]` of the device's control/telemetry server
    #[serde(alias = "flaskServerIp")]
    pub server_address: String,

    /// Seed value for the moisture slider
    pub initial_moisture: i32,

    /// Seed value for the light slider
    pub initial_light: i32,
}

impl DeviceRecord {
    /// Parse the stored server address, filling in `default_port` when absent.
    pub fn address(&self, default_port: u16) -> Result<ServerAddress> {
        ServerAddress::parse(&self.server_address, default_port)
    }
}

/// Raw add-device form submission
///
/// Every field arrives as text, exactly as typed. [`NewDevice::validate`]
/// turns it into a [`DeviceRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDevice {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub server_address: String,
    #[serde(default)]
    pub initial_moisture: String,
    #[serde(default)]
    pub initial_light: String,
}

impl NewDevice {
    /// Validate the form and build the record to register.
    pub fn validate(&self) -> Result<DeviceRecord> {
        let name = self.name.trim();
        let id = self.id.trim();
        let server_address = self.server_address.trim();
        let moisture = self.initial_moisture.trim();
        let light = self.initial_light.trim();

        if [name, id, server_address, moisture, light]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(Error::invalid_input("all fields are required"));
        }

        if !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid_input("device id must contain digits only"));
        }

        if !is_valid_server_address(server_address) {
            return Err(Error::invalid_input(format!(
                "server address must be an IPv4 address or localhost with an optional port: {}",
                server_address
            )));
        }

        Ok(DeviceRecord {
            name: name.to_string(),
            id: id.to_string(),
            server_address: server_address.to_string(),
            initial_moisture: parse_seed("initialMoisture", moisture)?,
            initial_light: parse_seed("initialLight", light)?,
        })
    }
}

fn parse_seed(field: &str, raw: &str) -> Result<i32> {
    let value: i32 = raw
        .parse()
        .map_err(|_| Error::invalid_input(format!("{} must be a whole number", field)))?;
    if !(0..=MAX_SEED_VALUE).contains(&value) {
        return Err(Error::invalid_input(format!(
            "{} must be between 0 and {}",
            field, MAX_SEED_VALUE
        )));
    }
    Ok(value)
}

/// `a.b.c.d` or `localhost`, optionally followed by a `:port` that fits in a `u16`.
fn is_valid_server_address(raw: &str) -> bool {
    let (host, port) = match raw.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (raw, None),
    };

    if let Some(port) = port {
        let digits = !port.is_empty() && port.chars().all(|c| c.is_ascii_digit());
        if !digits || port.parse::<u16>().is_err() {
            return false;
        }
    }

    host == "localhost" || is_dotted_quad(host)
}

fn is_dotted_quad(host: &str) -> bool {
    let octets: Vec<&str> = host.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            !octet.is_empty()
                && octet.len() <= 3
                && !(octet.len() > 1 && octet.starts_with('0'))
                && octet.chars().all(|c| c.is_ascii_digit())
                && octet.parse::<u16>().map(|v| v <= 255).unwrap_or(false)
        })
}

/// Normalized device server address
///
/// Built from the stored `host[:port]` string. A leading scheme and any
/// trailing path are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    host: String,
    port: u16,
}

impl ServerAddress {
    /// Parse `host[:port]`, using `default_port` when no port is given.
    pub fn parse(raw: &str, default_port: u16) -> Result<Self> {
        let raw = raw.trim();
        let without_scheme = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .find_map(|scheme| raw.strip_prefix(scheme))
            .unwrap_or(raw);
        let authority = without_scheme
            .split(['/', '?'])
            .next()
            .unwrap_or_default();

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::invalid_input(format!("invalid port in server address: {}", raw))
                })?;
                (host, port)
            }
            None => (authority, default_port),
        };

        if host.is_empty() {
            return Err(Error::invalid_input(format!(
                "server address has no host: {:?}",
                raw
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://host:port`
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Absolute HTTP URL for `path` on the device server.
    pub fn http_url(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&self.http_base())?.join(path)?)
    }

    /// Socket.IO websocket endpoint (Engine.IO protocol v4).
    pub fn socket_io_url(&self) -> String {
        format!(
            "ws://{}:{}/socket.io/?EIO=4&transport=websocket",
            self.host, self.port
        )
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
