use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::app::adb::bridge::CommandBridge;
use crate::app::adb::parse::{parse_connected_serials, parse_getprop_value};
use crate::app::adb::paths::quote_host_arg;
use crate::app::error::AppError;
use crate::app::models::{new_trace_id, DeviceIdentity};

pub const PROP_MODEL: &str = "ro.product.model";
pub const PROP_DEVICE: &str = "ro.product.device";
pub const PROP_RELEASE: &str = "ro.build.version.release";
pub const PROP_SDK: &str = "ro.build.version.sdk";
pub const PROP_BUILD_ID: &str = "ro.build.id";
pub const PROP_SECURITY_PATCH: &str = "ro.build.version.security_patch";

pub const TRACKED_PROPERTIES: [&str; 6] = [
    PROP_MODEL,
    PROP_DEVICE,
    PROP_RELEASE,
    PROP_SDK,
    PROP_BUILD_ID,
    PROP_SECURITY_PATCH,
];

pub const NO_DEVICE_MESSAGE: &str =
    "No device found. Plug in your device and enable USB debugging, or connect wirelessly.";

pub async fn check_connection<B: CommandBridge + ?Sized>(
    bridge: &B,
    trace_id: &str,
) -> Result<DeviceIdentity, AppError> {
    let output = bridge.run_generic("adb devices -l", trace_id).await?;
    let checked_at_ms = Utc::now().timestamp_millis();
    let serials = parse_connected_serials(&output);
    let Some(serial) = serials.first() else {
        return Ok(DeviceIdentity::disconnected(checked_at_ms));
    };
    if serials.len() > 1 {
        debug!(trace_id = %trace_id, count = serials.len(), serial = %serial, "multiple devices attached, using first");
    }
    Ok(DeviceIdentity {
        serial: serial.clone(),
        connected: true,
        properties: BTreeMap::new(),
        checked_at_ms,
    })
}

/// One `getprop` per tracked property, issued concurrently and addressed to
/// `serial`. Failed or blank reads are left out of the map.
pub async fn refresh_properties<B: CommandBridge + ?Sized>(
    bridge: &B,
    serial: &str,
    trace_id: &str,
) -> BTreeMap<String, String> {
    let serial_arg = quote_host_arg(serial);
    let reads = TRACKED_PROPERTIES.iter().map(|name| {
        let command = format!("adb -s {serial_arg} shell getprop {name}");
        async move { bridge.run_generic(&command, trace_id).await }
    });
    let results = join_all(reads).await;

    let mut properties = BTreeMap::new();
    for (name, result) in TRACKED_PROPERTIES.iter().zip(results) {
        match result {
            Ok(output) => {
                if let Some(value) = parse_getprop_value(&output) {
                    properties.insert(name.to_string(), value);
                }
            }
            Err(err) => {
                warn!(trace_id = %trace_id, property = %name, error = %err.error, "property read failed");
            }
        }
    }
    properties
}

/// Latest known device facts plus the banner shown when there are none.
#[derive(Debug, Clone, Default)]
pub struct DeviceSession {
    identity: DeviceIdentity,
    error: Option<AppError>,
}

impl DeviceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    pub fn banner(&self) -> Option<&str> {
        self.error.as_ref().map(|err| err.error.as_str())
    }

    /// Replaces the identity wholesale; nothing from a previous device survives.
    pub async fn refresh<B: CommandBridge + ?Sized>(&mut self, bridge: &B) -> &DeviceIdentity {
        let trace_id = new_trace_id();
        match check_connection(bridge, &trace_id).await {
            Ok(mut identity) => {
                if identity.connected {
                    identity.properties =
                        refresh_properties(bridge, &identity.serial, &trace_id).await;
                    info!(trace_id = %trace_id, serial = %identity.serial, "device connected");
                    self.error = None;
                } else {
                    self.error = Some(AppError::no_device(NO_DEVICE_MESSAGE, &trace_id));
                }
                self.identity = identity;
            }
            Err(err) => {
                warn!(trace_id = %trace_id, error = %err.error, "device check failed");
                self.identity = DeviceIdentity::disconnected(Utc::now().timestamp_millis());
                self.error = Some(err);
            }
        }
        &self.identity
    }

    /// Refreshes every `interval` until `on_update` returns `false`.
    pub async fn poll<B, F>(&mut self, bridge: &B, interval: Duration, mut on_update: F)
    where
        B: CommandBridge + ?Sized,
        F: FnMut(&DeviceIdentity) -> bool,
    {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let identity = self.refresh(bridge).await;
            if !on_update(identity) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{ok, process_failure, FakeBridge};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const TWO_DEVICES: &str = "List of devices attached\n192.168.1.20:5555     offline\nR58M123ABC             device usb:1-1 product:beyond1 model:SM_G973F transport_id:4\n";

    fn getprop_reply(line: &str) -> Option<&'static str> {
        if line.ends_with(PROP_MODEL) {
            Some("SM-G973F")
        } else if line.ends_with(PROP_RELEASE) {
            Some("12")
        } else if line.ends_with(PROP_SDK) {
            Some("31\r\n")
        } else if line.ends_with(PROP_BUILD_ID) {
            Some("SP1A.210812.016")
        } else if line.ends_with(PROP_SECURITY_PATCH) {
            Some("")
        } else {
            None
        }
    }

    #[tokio::test]
    async fn reports_serial_of_non_offline_device_only() {
        let bridge = FakeBridge::new(|_| ok(TWO_DEVICES));
        let identity = check_connection(&bridge, "t").await.unwrap();
        assert!(identity.connected);
        assert_eq!(identity.serial, "R58M123ABC");
        assert!(identity.properties.is_empty());
    }

    #[tokio::test]
    async fn no_devices_means_disconnected_without_property_reads() {
        let bridge = FakeBridge::new(|_| ok("List of devices attached\n\n"));
        let mut session = DeviceSession::new();
        let identity = session.refresh(&bridge).await;
        assert!(!identity.connected);
        assert_eq!(bridge.calls(), vec!["adb devices -l".to_string()]);
        assert!(session.error().map(AppError::is_no_device).unwrap_or(false));
    }

    #[tokio::test]
    async fn reads_properties_addressed_to_serial_and_tolerates_failures() {
        let bridge = FakeBridge::new(|line| {
            if line.starts_with("adb devices") {
                return ok(TWO_DEVICES);
            }
            assert!(line.contains("-s ") && line.contains("R58M123ABC"), "{line}");
            match getprop_reply(line) {
                Some(value) => ok(value),
                None => process_failure("error: closed"),
            }
        });
        let mut session = DeviceSession::new();
        let identity = session.refresh(&bridge).await.clone();

        assert_eq!(identity.property(PROP_MODEL), Some("SM-G973F"));
        assert_eq!(identity.property(PROP_SDK), Some("31"));
        assert_eq!(identity.property(PROP_BUILD_ID), Some("SP1A.210812.016"));
        assert_eq!(identity.property(PROP_DEVICE), None);
        assert_eq!(identity.property(PROP_SECURITY_PATCH), None);
        assert!(session.banner().is_none());
        assert_eq!(bridge.calls().len(), 1 + TRACKED_PROPERTIES.len());
    }

    #[tokio::test]
    async fn stale_properties_are_discarded_on_disconnect() {
        let attached = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&attached);
        let bridge = FakeBridge::new(move |line| {
            if line.starts_with("adb devices") {
                if flag.load(Ordering::SeqCst) {
                    ok(TWO_DEVICES)
                } else {
                    ok("List of devices attached\n")
                }
            } else {
                ok("value")
            }
        });
        let mut session = DeviceSession::new();
        assert!(!session.refresh(&bridge).await.properties.is_empty());

        attached.store(false, Ordering::SeqCst);
        let identity = session.refresh(&bridge).await;
        assert!(!identity.connected);
        assert!(identity.properties.is_empty());
        assert!(identity.serial.is_empty());
    }

    #[tokio::test]
    async fn bridge_failure_surfaces_as_banner() {
        let bridge = FakeBridge::new(|_| process_failure("adb server didn't ACK"));
        let mut session = DeviceSession::new();
        assert!(!session.refresh(&bridge).await.connected);
        assert_eq!(session.banner(), Some("adb server didn't ACK"));
    }

    #[tokio::test]
    async fn poll_stops_when_callback_declines() {
        let bridge = FakeBridge::new(|_| ok("List of devices attached\n"));
        let mut session = DeviceSession::new();
        let mut seen = 0;
        session
            .poll(&bridge, Duration::from_millis(1), |_| {
                seen += 1;
                seen < 3
            })
            .await;
        assert_eq!(seen, 3);
        assert_eq!(bridge.calls().len(), 3);
    }
}
