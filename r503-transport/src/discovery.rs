//! Serial device discovery

use serialport::SerialPortInfo;
use tracing::debug;

use crate::error::{Error, Result};

/// Path prefix of USB serial adapters
pub const DEVICE_PREFIX: &str = "/dev/ttyUSB";

/// Pick the lexically-first `/dev/ttyUSB*` device the OS reports.
pub fn discover_port() -> Result<String> {
    let ports = serialport::available_ports()?;
    first_matching(ports, DEVICE_PREFIX)
}

/// Pick the lexically-first port whose name starts with `prefix`.
pub fn first_matching(
    ports: impl IntoIterator<Item = SerialPortInfo>,
    prefix: &str,
) -> Result<String> {
    let mut candidates: Vec<String> = ports
        .into_iter()
        .map(|port| port.port_name)
        .filter(|name| name.starts_with(prefix))
        .collect();
    candidates.sort();

    debug!("Serial candidates for {}*: {:?}", prefix, candidates);

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoSerialPorts(format!("{}*", prefix)))
}
