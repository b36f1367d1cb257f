use std::collections::HashSet;

use crate::app::error::ParseError;
use crate::app::models::DiscoveredDevice;

pub fn parse_endpoint(token: &str) -> Result<(String, u16), ParseError> {
    let invalid = || ParseError::InvalidEndpoint(token.to_string());
    let (ip, port) = token.rsplit_once(':').ok_or_else(invalid)?;
    if ip.is_empty() {
        return Err(invalid());
    }
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok((ip.to_string(), port))
}

/// One service row: `<instance> <service type> <ip:port>`.
pub fn parse_mdns_line(line: &str) -> Result<DiscoveredDevice, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(ParseError::TooFewColumns(line.to_string()));
    }
    let (ip, port) = parse_endpoint(tokens[tokens.len() - 1])?;
    Ok(DiscoveredDevice {
        ip,
        port,
        label: tokens[0].to_string(),
        service: (tokens.len() > 2).then(|| tokens[1].to_string()),
    })
}

/// `adb mdns services`: header first, then one row per service. Rows are
/// deduplicated by instance name, keeping the first; malformed rows are skipped.
pub fn parse_mdns_services(output: &str) -> Vec<DiscoveredDevice> {
    let mut seen = HashSet::new();
    output
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_mdns_line(line).ok())
        .filter(|device| seen.insert(device.label.clone()))
        .collect()
}
