//! Supervisor notification strategies.

pub mod fifo;
pub mod frame;
pub mod signal;

use std::path::Path;

use mkvshim_config::{log_channel_warn, Config, NotifyStrategy};

use crate::error::{Result, ShimError};
pub use fifo::FifoChannel;
pub use signal::SignalChannel;

/// Something that can be told a managed file was completed.
pub trait Notify: Send + Sync {
    fn notify(&self, path: &Path) -> Result<()>;
}

/// The one strategy a process runs.
#[derive(Debug)]
pub enum Channel {
    Fifo(FifoChannel),
    Signal(SignalChannel),
    Disabled,
}

impl Channel {
    /// Set up the configured strategy. Setup failures degrade to a disabled
    /// channel of the same kind; the host is never affected.
    pub fn attach(config: &Config) -> Self {
        match config.strategy {
            NotifyStrategy::Fifo => match FifoChannel::open(&config.fifo_path) {
                Ok(fifo) => Channel::Fifo(fifo),
                Err(e) => {
                    log_channel_warn!("Message channel disabled", error = %e);
                    Channel::Fifo(FifoChannel::disabled(&config.fifo_path))
                }
            },
            NotifyStrategy::Signal => Channel::Signal(SignalChannel::discover(config.signal_pid)),
            NotifyStrategy::None => Channel::Disabled,
        }
    }

    /// Tear down; safe to call more than once.
    pub fn detach(&self) {
        if let Channel::Fifo(fifo) = self {
            if fifo.is_enabled() {
                fifo.close();
            }
        }
    }

    pub fn strategy(&self) -> NotifyStrategy {
        match self {
            Channel::Fifo(_) => NotifyStrategy::Fifo,
            Channel::Signal(_) => NotifyStrategy::Signal,
            Channel::Disabled => NotifyStrategy::None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Channel::Fifo(fifo) => fifo.is_enabled(),
            Channel::Signal(sig) => sig.is_enabled(),
            Channel::Disabled => false,
        }
    }
}

impl Notify for Channel {
    fn notify(&self, path: &Path) -> Result<()> {
        match self {
            Channel::Fifo(fifo) => fifo.notify(path),
            Channel::Signal(sig) => sig.notify(path),
            Channel::Disabled => Err(ShimError::ChannelDisabled),
        }
    }
}
