use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use scrcpy_plus_lib::app::adb::bridge::CommandBridge;
use scrcpy_plus_lib::app::adb::parse::parse_adb_devices;
use scrcpy_plus_lib::app::commands::{invoke, IpcRequest};
use scrcpy_plus_lib::app::config::{
    config_path, load_config, save_config_to_path, PREF_SAVE_MIRROR_SETTINGS,
};
use scrcpy_plus_lib::app::error::AppError;
use scrcpy_plus_lib::app::logging::init_logging;
use scrcpy_plus_lib::app::models::{new_trace_id, CommandResponse, DeviceIdentity};
use scrcpy_plus_lib::app::session::device::DeviceSession;
use scrcpy_plus_lib::app::session::files::FileNavigator;
use scrcpy_plus_lib::app::session::mirror::{launch_mirror, load_mirror_settings, MirrorOutcome};
use scrcpy_plus_lib::app::session::packages::PackageInventory;
use scrcpy_plus_lib::app::session::pairing::PairingSession;
use scrcpy_plus_lib::app::session::tools::check_tool_versions;
use scrcpy_plus_lib::app::state::AppState;

const USAGE: &str = "Usage: scrcpy_plus [--json] <command>

Commands:
  invoke <channel> <payload>     send one request through the channel gate
  devices                        list every attached device
  device [--watch]               show the attached device
  ls [PATH]                      list a device directory
  discover                       list wireless debugging services
  pair <IP:PORT> <CODE>          pair with a pairing code
  connect <IP:PORT>              connect over Wi-Fi
  packages [--system]            list installed packages
  uninstall <PACKAGE>            uninstall a package
  toggle <PACKAGE> [--system]    enable or disable a package
  mirror [--bitrate N] [--remember] [FLAGS...]
                                 start screen mirroring
  versions                       check bundled tool versions
  config [--init]                show the config, or write it out
";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Invoke { channel: String, payload: String },
    Devices,
    Device { watch: bool },
    Ls { path: Option<String> },
    Discover,
    Pair { address: String, code: String },
    Connect { address: String },
    Packages { include_system: bool },
    Uninstall { id: String },
    Toggle { id: String, include_system: bool },
    Mirror { bitrate: Option<u32>, remember: bool, flags: Vec<String> },
    Versions,
    Config { init: bool },
}

#[derive(Debug, Clone)]
struct Args {
    action: Action,
    json: bool,
}

fn required(value: Option<String>, what: &str) -> Result<String, String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{what} is required\n\n{USAGE}"))
}

fn parse_args_from(raw: Vec<String>) -> Result<Args, String> {
    let mut json = false;
    let mut rest = Vec::new();
    for arg in raw {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => rest.push(arg),
        }
    }

    let mut it = rest.into_iter();
    let command = it.next().ok_or_else(|| USAGE.to_string())?;
    let action = match command.as_str() {
        "invoke" => Action::Invoke {
            channel: required(it.next(), "channel")?,
            payload: it.collect::<Vec<_>>().join(" "),
        },
        "devices" => Action::Devices,
        "device" => Action::Device {
            watch: it.any(|arg| arg == "--watch"),
        },
        "ls" => Action::Ls { path: it.next() },
        "discover" => Action::Discover,
        "pair" => Action::Pair {
            address: required(it.next(), "address")?,
            code: required(it.next(), "pairing code")?,
        },
        "connect" => Action::Connect {
            address: required(it.next(), "address")?,
        },
        "packages" => Action::Packages {
            include_system: it.any(|arg| arg == "--system"),
        },
        "uninstall" => Action::Uninstall {
            id: required(it.next(), "package")?,
        },
        "toggle" => Action::Toggle {
            id: required(it.next(), "package")?,
            include_system: it.any(|arg| arg == "--system"),
        },
        "mirror" => {
            let mut bitrate = None;
            let mut remember = false;
            let mut flags = Vec::new();
            while let Some(arg) = it.next() {
                match arg.as_str() {
                    "--bitrate" => {
                        let value = it
                            .next()
                            .ok_or_else(|| "--bitrate requires a value".to_string())?;
                        bitrate = Some(
                            value
                                .parse::<u32>()
                                .map_err(|_| format!("invalid bitrate: {value}"))?,
                        );
                    }
                    "--remember" => remember = true,
                    _ => flags.push(arg),
                }
            }
            Action::Mirror {
                bitrate,
                remember,
                flags,
            }
        }
        "versions" => Action::Versions,
        "config" => Action::Config {
            init: it.any(|arg| arg == "--init"),
        },
        other => return Err(format!("Unknown command: {other}\n\n{USAGE}")),
    };
    Ok(Args { action, json })
}

fn parse_args() -> Result<Args, String> {
    parse_args_from(std::env::args().skip(1).collect())
}

fn emit<T: Serialize>(json: bool, trace_id: &str, data: &T, text: impl FnOnce() -> String) {
    if json {
        let response = CommandResponse {
            trace_id: trace_id.to_string(),
            data,
        };
        match serde_json::to_string_pretty(&response) {
            Ok(body) => println!("{body}"),
            Err(err) => eprintln!("failed to encode output: {err}"),
        }
    } else {
        println!("{}", text());
    }
}

fn report_error(json: bool, err: &AppError) {
    if json {
        match serde_json::to_string_pretty(err) {
            Ok(body) => eprintln!("{body}"),
            Err(_) => eprintln!("{err}"),
        }
        return;
    }
    eprintln!("error: {err}");
    if let Some(hint) = &err.hint {
        eprintln!("hint: {hint}");
    }
}

fn describe_identity(identity: &DeviceIdentity, banner: Option<&str>) -> String {
    if !identity.connected {
        return banner.unwrap_or("No device connected").to_string();
    }
    let mut lines = vec![format!("serial: {}", identity.serial)];
    for (name, value) in &identity.properties {
        lines.push(format!("{name}: {value}"));
    }
    lines.join("\n")
}

async fn run(action: Action, state: &mut AppState, json: bool, trace_id: &str) -> Result<(), AppError> {
    let client = state.client();
    match action {
        Action::Invoke { channel, payload } => {
            let request = IpcRequest {
                channel,
                payload,
                trace_id: Some(trace_id.to_string()),
            };
            let response = invoke(state.bridge.as_ref(), request).await?;
            emit(json, &response.trace_id, &response.data, || response.data.clone());
        }
        Action::Devices => {
            let output = client.run_generic("adb devices -l", trace_id).await?;
            let devices = parse_adb_devices(&output);
            emit(json, trace_id, &devices, || {
                devices
                    .iter()
                    .map(|device| {
                        let model = device.model.as_deref().unwrap_or("-");
                        format!("{}\t{}\t{model}", device.serial, device.state)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
        Action::Device { watch } => {
            let mut session = DeviceSession::new();
            if watch {
                let interval = Duration::from_secs(state.config.device.refresh_interval_secs);
                session
                    .poll(&client, interval, |identity| {
                        emit(json, trace_id, identity, || describe_identity(identity, None));
                        true
                    })
                    .await;
            } else {
                let identity = session.refresh(&client).await.clone();
                let banner = session.banner().map(str::to_string);
                emit(json, trace_id, &identity, || {
                    describe_identity(&identity, banner.as_deref())
                });
            }
        }
        Action::Ls { path } => {
            let mut navigator = FileNavigator::new(&state.config.browser.home, &state.config.browser.root);
            match path {
                Some(path) => navigator.navigate(&client, &path).await,
                None => navigator.reload(&client).await,
            }
            if let Some(err) = navigator.error() {
                return Err(err.clone());
            }
            emit(json, trace_id, &navigator.entries(), || {
                let mut lines = vec![navigator.current_path().to_string()];
                lines.extend(navigator.entries().iter().map(|entry| {
                    if entry.is_dir {
                        format!("  {}/", entry.name)
                    } else {
                        format!("  {}", entry.name)
                    }
                }));
                lines.join("\n")
            });
        }
        Action::Discover => {
            let mut session = PairingSession::new();
            session.discover(&client).await?;
            emit(json, trace_id, &session.discovered, || {
                session
                    .discovered
                    .iter()
                    .map(|device| format!("{}\t{}", device.label, device.address()))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
        Action::Pair { address, code } => {
            let mut session = PairingSession::new();
            let paired = session.pair(&client, &address, &code).await;
            let notice = session.pairing_notice.clone().unwrap_or_default();
            emit(json, trace_id, &session, || notice.clone());
            if !paired {
                return Err(AppError::process(notice, None, trace_id));
            }
        }
        Action::Connect { address } => {
            let mut session = PairingSession::new();
            session.skip();
            let connected = session.connect(&client, &address).await;
            let notice = session.connecting_notice.clone().unwrap_or_default();
            emit(json, trace_id, &session, || notice.clone());
            if !connected {
                return Err(AppError::process(notice, None, trace_id));
            }
        }
        Action::Packages { include_system } => {
            let mut inventory = PackageInventory::new();
            inventory.rebuild(&client, include_system).await?;
            emit(json, trace_id, &inventory.packages(), || {
                inventory
                    .packages()
                    .iter()
                    .map(|package| {
                        if package.disabled {
                            format!("{} (disabled)", package.id)
                        } else {
                            package.id.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
        Action::Uninstall { id } => {
            let mut inventory = PackageInventory::new();
            inventory.uninstall(&client, &id).await?;
            let notice = inventory.notice().unwrap_or_default().to_string();
            emit(json, trace_id, &notice, || notice.clone());
        }
        Action::Toggle { id, include_system } => {
            let mut inventory = PackageInventory::new();
            inventory.rebuild(&client, include_system).await?;
            inventory.toggle_disable(&client, &id).await?;
            let notice = inventory.notice().unwrap_or_default().to_string();
            emit(json, trace_id, &notice, || notice.clone());
        }
        Action::Mirror {
            bitrate,
            remember,
            flags,
        } => {
            if remember {
                state.preferences.set_bool(PREF_SAVE_MIRROR_SETTINGS, true);
            }
            let mut settings = load_mirror_settings(&state.preferences);
            if !flags.is_empty() {
                settings.flags = flags;
            }
            if let Some(bitrate) = bitrate {
                settings.bitrate_mbps = bitrate;
            }
            let outcome = launch_mirror(&client, &settings, &mut state.preferences, trace_id).await?;
            emit(json, trace_id, &outcome, || match &outcome {
                MirrorOutcome::Stopped => "mirroring stopped".to_string(),
                MirrorOutcome::StoppedWithWarning { message } => {
                    format!("mirroring stopped: {message}")
                }
            });
        }
        Action::Versions => {
            let report = check_tool_versions(&client, &mut state.preferences, trace_id).await;
            emit(json, trace_id, &report, || {
                let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "unknown".to_string());
                let mut text = format!(
                    "adb: {}\nscrcpy: {}",
                    show(&report.versions.adb),
                    show(&report.versions.scrcpy)
                );
                if let Some(implicated) = &report.implicated {
                    text.push_str(&format!(
                        "\n{implicated} may not be properly installed or configured"
                    ));
                }
                text
            });
            if let Some(err) = report.error {
                return Err(err);
            }
        }
        Action::Config { init } => {
            let path = config_path();
            if init {
                save_config_to_path(&state.config, &path, trace_id)?;
            }
            emit(json, trace_id, &state.config, || {
                let body = serde_json::to_string_pretty(&state.config).unwrap_or_default();
                format!("# {}\n{body}", path.display())
            });
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match parse_args() {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let trace_id = new_trace_id();
    let config = match load_config(&trace_id) {
        Ok(config) => config,
        Err(err) => {
            report_error(args.json, &err);
            std::process::exit(1);
        }
    };
    init_logging(&config.logging.log_level);

    let mut state = AppState::with_config(config, &trace_id);
    let outcome = run(args.action, &mut state, args.json, &trace_id).await;
    if let Err(err) = state.shutdown(&trace_id) {
        warn!(trace_id = %trace_id, error = %err.error, "failed to save preferences");
    }
    if let Err(err) = outcome {
        report_error(args.json, &err);
        std::process::exit(1);
    }
}
