//! Structured logging for the shim.
//!
//! Every event carries a `component` field so shim output can be told apart from
//! whatever the host process prints on stderr.
//!
//! # Usage
//!
//! ```ignore
//! use mkvshim_config::log_channel_warn;
//!
//! log_channel_warn!("Endpoint unavailable", path = %fifo.display());
//! ```

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const SHIM: &'static str = "SHIM";
    pub const CHANNEL: &'static str = "CHANNEL";
    pub const CONFIG: &'static str = "CONFIG";
}

// === SHIM logging macros ===

#[macro_export]
macro_rules! log_shim_error {
    ($msg:literal $(, $($field:tt)+)?) => {
        tracing::error!(component = "SHIM", $($($field)+,)? $msg)
    };
}

#[macro_export]
macro_rules! log_shim_warn {
    ($msg:literal $(, $($field:tt)+)?) => {
        tracing::warn!(component = "SHIM", $($($field)+,)? $msg)
    };
}

#[macro_export]
macro_rules! log_shim_info {
    ($msg:literal $(, $($field:tt)+)?) => {
        tracing::info!(component = "SHIM", $($($field)+,)? $msg)
    };
}

#[macro_export]
macro_rules! log_shim_debug {
    ($msg:literal $(, $($field:tt)+)?) => {
        tracing::debug!(component = "SHIM", $($($field)+,)? $msg)
    };
}

// === CHANNEL logging macros ===

#[macro_export]
macro_rules! log_channel_warn {
    ($msg:literal $(, $($field:tt)+)?) => {
        tracing::warn!(component = "CHANNEL", $($($field)+,)? $msg)
    };
}

#[macro_export]
macro_rules! log_channel_info {
    ($msg:literal $(, $($field:tt)+)?) => {
        tracing::info!(component = "CHANNEL", $($($field)+,)? $msg)
    };
}

#[macro_export]
macro_rules! log_channel_debug {
    ($msg:literal $(, $($field:tt)+)?) => {
        tracing::debug!(component = "CHANNEL", $($($field)+,)? $msg)
    };
}

// === CONFIG logging macros ===

#[macro_export]
macro_rules! log_config_warn {
    ($msg:literal $(, $($field:tt)+)?) => {
        tracing::warn!(component = "CONFIG", $($($field)+,)? $msg)
    };
}

/// Install a stderr subscriber filtered by `directive`.
///
/// Uses `try_init`: if the host process already installed a global subscriber,
/// the shim's events flow into it and this call does nothing.
pub fn init_logging(directive: &str) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
