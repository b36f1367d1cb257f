use serde::{Deserialize, Serialize};

pub const DEFAULT_BITRATE_MBPS: u32 = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorSettings {
    pub flags: Vec<String>,
    pub bitrate_mbps: u32,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            flags: Vec::new(),
            bitrate_mbps: DEFAULT_BITRATE_MBPS,
        }
    }
}

/// The line goes through a shell, so only plain `--name[=value]` flags pass.
pub fn validate_mirror_flag(flag: &str) -> Result<(), String> {
    let Some(body) = flag.strip_prefix("--") else {
        return Err(format!("mirror flag must start with '--': {flag}"));
    };
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (body, None),
    };
    let name_ok = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
    let value_ok = value.map_or(true, |value| {
        !value.is_empty()
            && value
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | ':' | ','))
    });
    if name_ok && value_ok {
        Ok(())
    } else {
        Err(format!("unsupported mirror flag: {flag}"))
    }
}

pub fn build_mirror_command(settings: &MirrorSettings) -> Result<String, String> {
    let bitrate = if settings.bitrate_mbps == 0 {
        DEFAULT_BITRATE_MBPS
    } else {
        settings.bitrate_mbps
    };
    let mut parts = vec![
        "scrcpy".to_string(),
        "--video-bit-rate".to_string(),
        format!("{bitrate}M"),
    ];
    for flag in &settings.flags {
        let flag = flag.trim();
        if flag.is_empty() {
            continue;
        }
        validate_mirror_flag(flag)?;
        parts.push(flag.to_string());
    }
    Ok(parts.join(" "))
}

/// scrcpy reports some non-fatal conditions as failures prefixed with `WARN:`.
pub fn is_warning_only(message: &str) -> bool {
    message.trim_start().starts_with("WARN:")
}
