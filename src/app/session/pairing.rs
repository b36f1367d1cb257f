use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::adb::bridge::CommandBridge;
use crate::app::adb::mdns::parse_mdns_services;
use crate::app::adb::paths::quote_host_arg;
use crate::app::error::AppError;
use crate::app::models::{new_trace_id, CommandResult, DiscoveredDevice};

/// How long callers keep the flow on screen after a successful connect.
pub const CONNECTED_EXIT_DELAY: Duration = Duration::from_secs(2);

pub const PAIR_SUCCESS_MARKER: &str = "Successfully";
pub const CONNECT_SUCCESS_MARKER: &str = "connected to";

const PAIRING_SERVICE: &str = "pairing";
const CONNECT_SERVICE: &str = "connect";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PairingPhase {
    #[default]
    AwaitingCode,
    AwaitingConnect,
    Connected,
}

pub async fn discover_devices<B: CommandBridge + ?Sized>(
    bridge: &B,
    trace_id: &str,
) -> Result<Vec<DiscoveredDevice>, AppError> {
    let output = bridge.run_generic("adb mdns services", trace_id).await?;
    Ok(parse_mdns_services(&output))
}

pub async fn attempt_pair<B: CommandBridge + ?Sized>(
    bridge: &B,
    address: &str,
    code: &str,
    trace_id: &str,
) -> CommandResult {
    let command = format!(
        "adb pair {} {}",
        quote_host_arg(address),
        quote_host_arg(code)
    );
    bridge.run_generic(&command, trace_id).await
}

/// Drops every existing connection first so the new one is the only target.
pub async fn attempt_connect<B: CommandBridge + ?Sized>(
    bridge: &B,
    address: &str,
    trace_id: &str,
) -> CommandResult {
    if let Err(err) = bridge.run_generic("adb disconnect", trace_id).await {
        warn!(trace_id = %trace_id, error = %err.error, "disconnect before connect failed");
    }
    let command = format!("adb connect {}", quote_host_arg(address));
    bridge.run_generic(&command, trace_id).await
}

fn offers(device: &DiscoveredDevice, service_hint: &str) -> bool {
    device
        .service
        .as_deref()
        .is_some_and(|service| service.contains(service_hint))
}

fn preferred_address(devices: &[DiscoveredDevice], service_hint: &str) -> Option<String> {
    devices
        .iter()
        .find(|device| offers(device, service_hint))
        .or_else(|| devices.first())
        .map(DiscoveredDevice::address)
}

fn host_of(address: &str) -> &str {
    address.rsplit_once(':').map_or(address, |(host, _)| host)
}

/// The connect endpoint of the device just paired. Only rows sharing the
/// paired host qualify; a same-host row without a connect service yields the
/// bare host.
fn connect_address_for(devices: &[DiscoveredDevice], paired: &str) -> Option<String> {
    let host = host_of(paired.trim());
    if host.is_empty() {
        return None;
    }
    let same_host: Vec<&DiscoveredDevice> = devices.iter().filter(|device| device.ip == host).collect();
    if let Some(device) = same_host.iter().find(|device| offers(device, CONNECT_SERVICE)) {
        return Some(device.address());
    }
    same_host.first().map(|device| device.ip.clone())
}

fn outcome_text(outcome: &CommandResult) -> String {
    match outcome {
        Ok(output) => output.clone(),
        Err(err) => err.error.clone(),
    }
}

/// Wireless setup: pair with a code, then connect.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairingSession {
    pub phase: PairingPhase,
    pub pairing_notice: Option<String>,
    pub connecting_notice: Option<String>,
    pub discovered: Vec<DiscoveredDevice>,
    pub pair_address: String,
    pub pair_code: String,
    pub connect_address: String,
}

impl PairingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the latest scan and fills the current phase's address field
    /// when it is still empty.
    pub fn apply_discovery(&mut self, devices: Vec<DiscoveredDevice>) {
        match self.phase {
            PairingPhase::AwaitingCode if self.pair_address.trim().is_empty() => {
                if let Some(address) = preferred_address(&devices, PAIRING_SERVICE) {
                    self.pair_address = address;
                }
            }
            PairingPhase::AwaitingConnect if self.connect_address.trim().is_empty() => {
                let address = if self.pair_address.trim().is_empty() {
                    preferred_address(&devices, CONNECT_SERVICE)
                } else {
                    connect_address_for(&devices, &self.pair_address)
                };
                if let Some(address) = address {
                    self.connect_address = address;
                }
            }
            _ => {}
        }
        self.discovered = devices;
    }

    /// Returns `true` when the phase advanced.
    pub fn apply_pair_outcome(&mut self, outcome: &CommandResult) -> bool {
        self.pairing_notice = Some(outcome_text(outcome));
        let paired = matches!(outcome, Ok(output) if output.contains(PAIR_SUCCESS_MARKER));
        if paired && self.phase == PairingPhase::AwaitingCode {
            self.phase = PairingPhase::AwaitingConnect;
            return true;
        }
        false
    }

    pub fn apply_connect_outcome(&mut self, outcome: &CommandResult) -> bool {
        self.connecting_notice = Some(outcome_text(outcome));
        let connected = matches!(outcome, Ok(output) if output.contains(CONNECT_SUCCESS_MARKER));
        if connected && self.phase == PairingPhase::AwaitingConnect {
            self.phase = PairingPhase::Connected;
            return true;
        }
        false
    }

    /// AwaitingCode -> AwaitingConnect without pairing.
    pub fn skip(&mut self) -> bool {
        if self.phase != PairingPhase::AwaitingCode {
            return false;
        }
        self.phase = PairingPhase::AwaitingConnect;
        true
    }

    pub fn back(&mut self) -> bool {
        if self.phase != PairingPhase::AwaitingConnect {
            return false;
        }
        self.phase = PairingPhase::AwaitingCode;
        true
    }

    /// A failed scan leaves the session untouched.
    pub async fn discover<B: CommandBridge + ?Sized>(&mut self, bridge: &B) -> Result<usize, AppError> {
        let trace_id = new_trace_id();
        match discover_devices(bridge, &trace_id).await {
            Ok(devices) => {
                info!(trace_id = %trace_id, count = devices.len(), "mdns discovery finished");
                let count = devices.len();
                self.apply_discovery(devices);
                Ok(count)
            }
            Err(err) => {
                warn!(trace_id = %trace_id, error = %err.error, "mdns discovery failed");
                Err(err)
            }
        }
    }

    /// Only runs while awaiting a code. Empty input is ignored without
    /// touching the bridge.
    pub async fn pair<B: CommandBridge + ?Sized>(
        &mut self,
        bridge: &B,
        address: &str,
        code: &str,
    ) -> bool {
        let (address, code) = (address.trim(), code.trim());
        if self.phase != PairingPhase::AwaitingCode || address.is_empty() || code.is_empty() {
            return false;
        }
        self.pair_address = address.to_string();
        self.pair_code = code.to_string();

        let trace_id = new_trace_id();
        let outcome = attempt_pair(bridge, address, code, &trace_id).await;
        let advanced = self.apply_pair_outcome(&outcome);
        info!(trace_id = %trace_id, address = %address, paired = advanced, "pair attempt finished");
        if advanced {
            let _ = self.discover(bridge).await;
        }
        advanced
    }

    /// Only runs while awaiting a connect; pair or [`skip`](Self::skip) first.
    pub async fn connect<B: CommandBridge + ?Sized>(&mut self, bridge: &B, address: &str) -> bool {
        let address = address.trim();
        if self.phase != PairingPhase::AwaitingConnect || address.is_empty() {
            return false;
        }
        self.connect_address = address.to_string();

        let trace_id = new_trace_id();
        let outcome = attempt_connect(bridge, address, &trace_id).await;
        let connected = self.apply_connect_outcome(&outcome);
        info!(trace_id = %trace_id, address = %address, connected, "connect attempt finished");
        connected
    }
}
