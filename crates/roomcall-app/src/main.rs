mod cli;
mod console;
mod render;

use std::path::Path;
use std::sync::Arc;

use roomcall_call::{
    CallChannels, CallCoordinator, CallSettings, ChatHistoryConfig, HeadlessDevices,
    RegistrySettings, RelayClient, RelaySettings, SignalingChannel, WebRtcNegotiator,
    WebRtcSettings,
};
use roomcall_common::{CallError, ConfigError};
use roomcall_config::RoomcallConfig;
use tracing_subscriber::EnvFilter;

fn load_config(args: &cli::Args) -> Result<RoomcallConfig, ConfigError> {
    match args.config {
        Some(ref path) => roomcall_config::load_config_from(Path::new(path)),
        None => roomcall_config::load_config(),
    }
}

fn relay_settings(args: &cli::Args, config: &RoomcallConfig) -> RelaySettings {
    let relay = &config.relay;
    RelaySettings {
        url: args.relay.clone().unwrap_or_else(|| relay.url.clone()),
        connect_timeout_secs: relay.connect_timeout_secs.into(),
        heartbeat_interval_secs: relay.heartbeat_interval_secs.into(),
        reconnect_delay_secs: relay.reconnect_delay_secs.into(),
        max_reconnect_delay_secs: relay.max_reconnect_delay_secs.into(),
    }
}

fn call_settings(args: &cli::Args, config: &RoomcallConfig) -> CallSettings {
    let mut settings = CallSettings::new(&args.room, &args.name);
    settings.registry = RegistrySettings {
        initiate_delay: config.call.initiate_delay(),
        negotiation_timeout: config.call.negotiation_timeout(),
        max_participants: config.call.max_participants as usize,
    };
    settings.chat = ChatHistoryConfig {
        max_messages: config.chat.max_messages as usize,
    };
    settings
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Config is read first so its level can seed the filter.
    let loaded = load_config(&args);
    let config_level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".into());
    let log_directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("roomcall={config_level}"));
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "roomcall=info".parse().unwrap()),
            ),
        )
        .init();

    tracing::info!("roomcall v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        RoomcallConfig::default()
    });

    if let Err(e) = run(args, config).await {
        tracing::error!("Call failed: {e}");
        eprintln!("roomcall: {e}");
        std::process::exit(1);
    }
    tracing::info!("Shutdown complete");
}

async fn run(args: cli::Args, config: RoomcallConfig) -> Result<(), CallError> {
    let relay = relay_settings(&args, &config);
    tracing::info!("Relay: {}", relay.url);
    let (client, signaling_rx) = RelayClient::connect(relay);
    let client = Arc::new(client);

    let (negotiator, incoming_rx) = WebRtcNegotiator::new(
        WebRtcSettings {
            stun_servers: config.ice.stun_servers.clone(),
        },
        Arc::clone(&client) as Arc<dyn SignalingChannel>,
    )?;

    let (handle, mut events) = CallCoordinator::start(
        call_settings(&args, &config),
        Arc::new(HeadlessDevices),
        Arc::new(negotiator),
        Arc::clone(&client) as Arc<dyn SignalingChannel>,
        CallChannels {
            signaling: signaling_rx,
            incoming: incoming_rx,
        },
    )
    .await?;

    println!("{}", console::HELP);
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Some(line) = render::describe(&event) {
                println!("{line}");
            }
        }
    });

    console::run(&handle).await;

    handle.end().await?;
    client.disconnect().await;
    let _ = printer.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    fn args(extra: &[&str]) -> cli::Args {
        let mut argv = vec!["roomcall", "--room", "standup"];
        argv.extend_from_slice(extra);
        cli::Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn relay_url_override_wins() {
        let config = RoomcallConfig::default();
        let settings = relay_settings(&args(&["--relay", "ws://10.0.0.2:9000"]), &config);
        assert_eq!(settings.url, "ws://10.0.0.2:9000");
        assert_eq!(
            settings.heartbeat_interval_secs,
            u64::from(config.relay.heartbeat_interval_secs)
        );
    }

    #[test]
    fn relay_url_defaults_to_config() {
        let config = RoomcallConfig::default();
        let settings = relay_settings(&args(&[]), &config);
        assert_eq!(settings.url, config.relay.url);
    }

    #[test]
    fn call_settings_follow_config() {
        let mut config = RoomcallConfig::default();
        config.call.max_participants = 4;
        config.call.initiate_delay_ms = 250;
        config.chat.max_messages = 20;

        let settings = call_settings(&args(&["--name", "ada"]), &config);
        assert_eq!(settings.room, "standup");
        assert_eq!(settings.display_name, "ada");
        assert_eq!(settings.registry.max_participants, 4);
        assert_eq!(settings.registry.initiate_delay, Duration::from_millis(250));
        assert_eq!(settings.chat.max_messages, 20);
    }
}
