//! Console probe for the VolumeDeck mixer.
//!
//! Drives the same method channel the host UI uses and prints the JSON
//! response envelope. Set `RUST_LOG=debug` to see per-session fallbacks.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use volumedeck_mixer::channel::{self, MethodResponse};
use volumedeck_mixer::{extract_icon_png, Mixer, PlatformBackend};

#[derive(Parser)]
#[command(name = "volumedeck-mixer", version, about = "Inspect and control per-application audio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the master state and every audio session
    Snapshot {
        /// Only print the master state
        #[arg(long)]
        no_sessions: bool,
    },

    /// Find the session id of an executable (e.g. chrome.exe)
    Find { exe_name: String },

    /// Set the master volume (0.0 to 1.0)
    MasterVolume {
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Set the master mute state
    MasterMute {
        #[arg(action = ArgAction::Set)]
        mute: bool,
    },

    /// Set a session's volume (0.0 to 1.0)
    SessionVolume {
        session_id: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Set a session's mute state
    SessionMute {
        session_id: String,
        #[arg(action = ArgAction::Set)]
        mute: bool,
    },

    /// Send a raw method call with JSON arguments
    Call {
        method: String,
        #[arg(default_value = "")]
        args: String,
    },

    /// Write the icon of an executable to a PNG file
    Icon {
        path: String,
        #[arg(long, default_value_t = 32)]
        size: u32,
        #[arg(long)]
        out: PathBuf,
    },
}

impl Command {
    /// Translate a subcommand into a method channel request.
    fn into_request(self) -> Result<(String, Value)> {
        let request = match self {
            Command::Snapshot { no_sessions } => {
                (channel::GET_SNAPSHOT, json!({ "includeSessions": !no_sessions }))
            }
            Command::Find { exe_name } => {
                (channel::FIND_SESSION_ID_BY_EXE, json!({ "exeName": exe_name }))
            }
            Command::MasterVolume { value } => (channel::SET_MASTER_VOLUME, json!({ "value": value })),
            Command::MasterMute { mute } => (channel::SET_MASTER_MUTE, json!({ "mute": mute })),
            Command::SessionVolume { session_id, value } => (
                channel::SET_SESSION_VOLUME,
                json!({ "sessionId": session_id, "value": value }),
            ),
            Command::SessionMute { session_id, mute } => (
                channel::SET_SESSION_MUTE,
                json!({ "sessionId": session_id, "mute": mute }),
            ),
            Command::Call { method, args } => {
                let arguments = channel::parse_arguments(&args).context("Invalid arguments")?;
                return Ok((method, arguments));
            }
            Command::Icon { .. } => bail!("icon is not a method channel request"),
        };

        Ok((request.0.to_string(), request.1))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    #[cfg(windows)]
    let _com = volumedeck_mixer::ComGuard::new().context("Failed to initialize COM")?;

    let (method, arguments) = match cli.command {
        Command::Icon { path, size, out } => return write_icon(&path, size, &out),
        command => command.into_request()?,
    };

    let mixer = Mixer::new(PlatformBackend::default());
    let response = channel::dispatch(&mixer, &method, &arguments);

    println!("{}", serde_json::to_string_pretty(&response)?);

    match response {
        MethodResponse::Success { .. } => Ok(()),
        MethodResponse::Error { code, message } => bail!("{}: {}", code, message),
        MethodResponse::NotImplemented { method } => bail!("method not implemented: {}", method),
    }
}

fn write_icon(path: &str, size: u32, out: &Path) -> Result<()> {
    let png = extract_icon_png(path, size).with_context(|| format!("No icon for {}", path))?;
    std::fs::write(out, &png).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("{} bytes written to {}", png.len(), out.display());
    Ok(())
}
