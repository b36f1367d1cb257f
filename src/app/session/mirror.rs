use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::app::adb::bridge::CommandBridge;
use crate::app::adb::scrcpy::{build_mirror_command, is_warning_only, MirrorSettings, DEFAULT_BITRATE_MBPS};
use crate::app::config::{
    Preferences, PREF_MIRROR_BITRATE, PREF_MIRROR_FLAGS, PREF_SAVE_MIRROR_SETTINGS,
};
use crate::app::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MirrorOutcome {
    /// The mirror window was closed.
    Stopped,
    /// The tool exited with a `WARN:` message, treated as a normal stop.
    StoppedWithWarning { message: String },
}

/// Saved flags are a JSON array of strings, or of `{ "arg": "--flag" }`
/// objects written by older versions. Anything unreadable is ignored.
pub fn load_mirror_settings(prefs: &Preferences) -> MirrorSettings {
    let flags = match serde_json::from_str::<Vec<Value>>(prefs.get(PREF_MIRROR_FLAGS)) {
        Ok(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(flag) => Some(flag.clone()),
                Value::Object(map) => map.get("arg").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    let bitrate_mbps = prefs
        .get(PREF_MIRROR_BITRATE)
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|bitrate| *bitrate > 0)
        .unwrap_or(DEFAULT_BITRATE_MBPS);
    MirrorSettings {
        flags,
        bitrate_mbps,
    }
}

pub fn remember_mirror_settings(
    prefs: &mut Preferences,
    settings: &MirrorSettings,
    trace_id: &str,
) -> Result<(), AppError> {
    let flags = serde_json::to_string(&settings.flags).map_err(|err| {
        AppError::system(format!("Failed to encode mirror flags: {err}"), trace_id)
    })?;
    prefs.set(PREF_MIRROR_FLAGS, flags);
    prefs.set(PREF_MIRROR_BITRATE, settings.bitrate_mbps.to_string());
    Ok(())
}

/// Runs the mirror tool until it exits. Settings are persisted first when the
/// user opted in.
pub async fn launch_mirror<B: CommandBridge + ?Sized>(
    bridge: &B,
    settings: &MirrorSettings,
    prefs: &mut Preferences,
    trace_id: &str,
) -> Result<MirrorOutcome, AppError> {
    let command = build_mirror_command(settings).map_err(|msg| AppError::validation(msg, trace_id))?;
    if prefs.get_bool(PREF_SAVE_MIRROR_SETTINGS) {
        remember_mirror_settings(prefs, settings, trace_id)?;
    }

    info!(trace_id = %trace_id, command = %command, "starting mirror");
    match bridge.run_generic(&command, trace_id).await {
        Ok(_) => Ok(MirrorOutcome::Stopped),
        Err(err) if is_warning_only(&err.error) => {
            warn!(trace_id = %trace_id, message = %err.error, "mirror stopped with warning");
            Ok(MirrorOutcome::StoppedWithWarning { message: err.error })
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{ok, process_failure, FakeBridge};

    #[test]
    fn loads_both_saved_flag_shapes() {
        let mut prefs = Preferences::in_memory();
        prefs.set(
            PREF_MIRROR_FLAGS,
            r#"["--stay-awake", {"arg": "--turn-screen-off", "label": "Screen off"}, 3]"#,
        );
        prefs.set(PREF_MIRROR_BITRATE, "16");
        let settings = load_mirror_settings(&prefs);
        assert_eq!(settings.flags, vec!["--stay-awake", "--turn-screen-off"]);
        assert_eq!(settings.bitrate_mbps, 16);
    }

    #[test]
    fn missing_or_garbage_prefs_fall_back_to_defaults() {
        let mut prefs = Preferences::in_memory();
        assert_eq!(load_mirror_settings(&prefs), MirrorSettings::default());
        prefs.set(PREF_MIRROR_FLAGS, "not json");
        prefs.set(PREF_MIRROR_BITRATE, "0");
        assert_eq!(load_mirror_settings(&prefs), MirrorSettings::default());
    }

    #[tokio::test]
    async fn persists_only_when_opted_in() {
        let bridge = FakeBridge::new(|_| ok(""));
        let settings = MirrorSettings {
            flags: vec!["--stay-awake".to_string()],
            bitrate_mbps: 4,
        };
        let mut prefs = Preferences::in_memory();
        launch_mirror(&bridge, &settings, &mut prefs, "t").await.unwrap();
        assert!(!prefs.is_dirty());

        prefs.set_bool(PREF_SAVE_MIRROR_SETTINGS, true);
        launch_mirror(&bridge, &settings, &mut prefs, "t").await.unwrap();
        assert_eq!(load_mirror_settings(&prefs), settings);
        assert_eq!(
            bridge.calls()[0],
            "scrcpy --video-bit-rate 4M --stay-awake"
        );
    }

    #[tokio::test]
    async fn warn_exit_counts_as_stop() {
        let bridge = FakeBridge::new(|_| process_failure("WARN: Device disconnected"));
        let mut prefs = Preferences::in_memory();
        let outcome = launch_mirror(&bridge, &MirrorSettings::default(), &mut prefs, "t")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MirrorOutcome::StoppedWithWarning {
                message: "WARN: Device disconnected".to_string()
            }
        );
    }

    #[tokio::test]
    async fn real_failure_propagates_and_bad_flag_never_runs() {
        let bridge = FakeBridge::new(|_| process_failure("ERROR: Could not find any ADB device"));
        let mut prefs = Preferences::in_memory();
        let err = launch_mirror(&bridge, &MirrorSettings::default(), &mut prefs, "t")
            .await
            .unwrap_err();
        assert_eq!(err.error, "ERROR: Could not find any ADB device");

        let bad = MirrorSettings {
            flags: vec!["--record=a.mp4; rm -rf ~".to_string()],
            bitrate_mbps: 8,
        };
        let err = launch_mirror(&bridge, &bad, &mut prefs, "t").await.unwrap_err();
        assert_eq!(err.code, crate::app::error::ERR_VALIDATION);
        assert_eq!(bridge.calls().len(), 1);
    }
}
