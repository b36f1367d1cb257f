use std::sync::LazyLock;

use regex::Regex;

use crate::app::error::ParseError;
use crate::app::models::DeviceSummary;

const DEVICES_HEADER: &str = "list of devices";
const NO_SUCH_FILE_SENTINEL: &str = ": No such file or directory";

fn is_devices_noise(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('*')
        || trimmed.to_lowercase().contains(DEVICES_HEADER)
}

pub fn parse_adb_devices(output: &str) -> Vec<DeviceSummary> {
    output
        .lines()
        .filter(|line| !is_devices_noise(line))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 2 {
                return None;
            }
            let mut model = None;
            let mut product = None;
            let mut transport_id = None;
            for token in tokens.iter().skip(2) {
                if let Some(value) = token.strip_prefix("model:") {
                    model = Some(value.to_string());
                } else if let Some(value) = token.strip_prefix("product:") {
                    product = Some(value.to_string());
                } else if let Some(value) = token.strip_prefix("transport_id:") {
                    transport_id = Some(value.to_string());
                }
            }
            Some(DeviceSummary {
                serial: tokens[0].to_string(),
                state: tokens[1].to_string(),
                model,
                product,
                transport_id,
            })
        })
        .collect()
}

/// Serials of devices that are attached and usable: the line carries the
/// `device` state token and no `offline` marker.
pub fn parse_connected_serials(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !is_devices_noise(line))
        .filter(|line| line.contains("device") && !line.contains("offline"))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Single `getprop <name>` output. Blank means the property is unset.
pub fn parse_getprop_value(output: &str) -> Option<String> {
    let value = output.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Names from `ls -1A`. Empty-glob artifacts such as
/// `*.*: No such file or directory` are not entries.
pub fn parse_ls_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.ends_with(NO_SUCH_FILE_SENTINEL))
        .filter(|line| *line != "." && *line != "..")
        .map(str::to_string)
        .collect()
}

/// Output of `test -d <path> && echo true || echo false`.
pub fn parse_is_dir_probe(output: &str) -> bool {
    output.trim() == "true"
}

static ADB_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)version\s+([\d.]+)").expect("adb version regex is valid")
});

static SCRCPY_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)?").expect("scrcpy version regex is valid"));

pub fn parse_adb_version(output: &str) -> Result<String, ParseError> {
    ADB_VERSION_RE
        .captures(output)
        .map(|caps| caps[1].trim().to_string())
        .ok_or(ParseError::MissingVersion)
}

pub fn parse_scrcpy_version(output: &str) -> Result<String, ParseError> {
    SCRCPY_VERSION_RE
        .find(output)
        .map(|found| found.as_str().to_string())
        .ok_or(ParseError::MissingVersion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_adb_devices_output() {
        let output = "List of devices attached\n0123456789ABCDEF device product:sdk_gphone64_arm64 model:Pixel_7 device:emu64a transport_id:1\nemulator-5554 unauthorized transport_id:2\n";
        let parsed = parse_adb_devices(output);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].serial, "0123456789ABCDEF");
        assert_eq!(parsed[0].state, "device");
        assert_eq!(parsed[0].model.as_deref(), Some("Pixel_7"));
        assert_eq!(parsed[1].state, "unauthorized");
    }

    #[test]
    fn skips_offline_devices() {
        let output = "List of devices attached\n192.168.1.20:5555\toffline\nR58M123ABC\tdevice usb:1-1 product:beyond1 model:SM_G973F\n";
        assert_eq!(parse_connected_serials(output), vec!["R58M123ABC".to_string()]);
    }

    #[test]
    fn ignores_daemon_notices_and_crlf() {
        let output = "* daemon not running; starting now at tcp:5037\r\n* daemon started successfully\r\nList of devices attached\r\n\r\nemulator-5554\tdevice\r\n";
        assert_eq!(parse_connected_serials(output), vec!["emulator-5554".to_string()]);
    }

    #[test]
    fn reports_no_serials_when_only_unauthorized_or_empty() {
        assert!(parse_connected_serials("List of devices attached\n\n").is_empty());
        assert!(parse_connected_serials("").is_empty());
        assert!(parse_connected_serials("List of devices attached\nABC unauthorized\n").is_empty());
    }

    #[test]
    fn parses_getprop_values() {
        assert_eq!(parse_getprop_value("Pixel 7\r\n").as_deref(), Some("Pixel 7"));
        assert_eq!(parse_getprop_value("  \n"), None);
    }

    #[test]
    fn drops_empty_glob_sentinels() {
        let output = "*/: No such file or directory\n*.*: No such file or directory\n";
        assert!(parse_ls_names(output).is_empty());

        let output = "Alarms\r\nDCIM\r\n.nomedia\r\nmy file.txt\r\n";
        assert_eq!(
            parse_ls_names(output),
            vec!["Alarms", "DCIM", ".nomedia", "my file.txt"]
        );
    }

    #[test]
    fn parses_dir_probe() {
        assert!(parse_is_dir_probe("true\n"));
        assert!(!parse_is_dir_probe("false"));
        assert!(!parse_is_dir_probe(""));
    }

    #[test]
    fn parses_tool_versions() {
        let adb = "Android Debug Bridge version 1.0.41\nVersion 35.0.1-11580240\nInstalled as /opt/adb\n";
        assert_eq!(parse_adb_version(adb).as_deref(), Ok("1.0.41"));

        let scrcpy = "scrcpy 2.4 <https://github.com/Genymobile/scrcpy>\n";
        assert_eq!(parse_scrcpy_version(scrcpy).as_deref(), Ok("2.4"));

        assert_eq!(parse_adb_version("garbage"), Err(ParseError::MissingVersion));
        assert_eq!(parse_scrcpy_version("scrcpy"), Err(ParseError::MissingVersion));
    }
}
