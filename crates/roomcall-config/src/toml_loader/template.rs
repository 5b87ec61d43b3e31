/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# roomcall configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[relay]
# url = "ws://127.0.0.1:3000/ws"
# connect_timeout_secs = 15      # 1-120
# heartbeat_interval_secs = 25   # 5-300
# reconnect_delay_secs = 1
# max_reconnect_delay_secs = 30

[call]
# initiate_delay_ms = 1000       # 0-10000, back-off before offering to a joiner
# negotiation_timeout_secs = 30  # 1-300
# max_participants = 8           # 2-32

[ice]
# stun_servers = ["stun:stun.l.google.com:19302", "stun:stun1.l.google.com:19302"]

[chat]
# max_messages = 500             # 10-10000

[logging]
# level = "info"                 # trace, debug, info, warn, error
"##
    .to_string()
}
