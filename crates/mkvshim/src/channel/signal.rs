//! Signal notification: a bare `SIGUSR1` per completed title.
//!
//! Carries no payload; the receiver has to work out which file finished.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::Path;

use mkvshim_config::{log_channel_debug, log_channel_info};

use super::Notify;
use crate::error::{Result, ShimError};

pub const NOTIFY_SIGNAL: Signal = Signal::SIGUSR1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalChannel {
    target: Option<Pid>,
}

impl SignalChannel {
    pub fn new(target: Option<Pid>) -> Self {
        Self {
            target: target.filter(|p| p.as_raw() > 1),
        }
    }

    /// Use `explicit` if given, otherwise the parent of our parent.
    pub fn discover(explicit: Option<i32>) -> Self {
        let target = explicit.map(Pid::from_raw).or_else(grandparent_pid);
        let channel = Self::new(target);
        match channel.target {
            Some(pid) => log_channel_info!("Signal target resolved", pid = pid.as_raw()),
            None => log_channel_info!("No signal target; notifications disabled"),
        }
        channel
    }

    pub fn target(&self) -> Option<Pid> {
        self.target
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Send the notification signal.
    pub fn raise(&self) -> Result<()> {
        let pid = self.target.ok_or(ShimError::ChannelDisabled)?;
        kill(pid, NOTIFY_SIGNAL)?;
        log_channel_debug!("Signalled supervisor", pid = pid.as_raw());
        Ok(())
    }
}

impl Notify for SignalChannel {
    fn notify(&self, _path: &Path) -> Result<()> {
        self.raise()
    }
}

#[cfg(target_os = "linux")]
fn grandparent_pid() -> Option<Pid> {
    let parent = nix::unistd::getppid();
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", parent.as_raw())).ok()?;
    parse_stat_ppid(&stat).map(Pid::from_raw)
}

#[cfg(not(target_os = "linux"))]
fn grandparent_pid() -> Option<Pid> {
    None
}

/// Parent pid field of a `/proc/<pid>/stat` line.
///
/// The command name is parenthesised and may itself contain `)` or spaces, so
/// fields are counted from the last `)`.
pub fn parse_stat_ppid(stat: &str) -> Option<i32> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let _state = fields.next()?;
    fields.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::Command;

    #[test]
    fn test_parse_stat_ppid() {
        assert_eq!(parse_stat_ppid("1234 (makemkvcon) S 42 1234 1 0"), Some(42));
        assert_eq!(parse_stat_ppid("77 (evil) name) R 9 77 77"), Some(9));
        assert_eq!(parse_stat_ppid("garbage"), None);
        assert_eq!(parse_stat_ppid("1 (x) S notanumber"), None);
    }

    #[test]
    fn test_init_and_zero_never_targeted() {
        assert!(!SignalChannel::new(Some(Pid::from_raw(0))).is_enabled());
        assert!(!SignalChannel::new(Some(Pid::from_raw(1))).is_enabled());
        assert!(!SignalChannel::new(None).is_enabled());
    }

    #[test]
    fn test_disabled_never_sends() {
        let channel = SignalChannel::new(None);
        assert!(matches!(
            channel.notify(Path::new("/output/title00.mkv")),
            Err(ShimError::ChannelDisabled)
        ));
    }

    #[test]
    fn test_explicit_target_preferred() {
        let channel = SignalChannel::discover(Some(4242));
        assert_eq!(channel.target(), Some(Pid::from_raw(4242)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_discovers_grandparent() {
        let expected = {
            let stat =
                std::fs::read_to_string(format!("/proc/{}/stat", nix::unistd::getppid())).unwrap();
            parse_stat_ppid(&stat).unwrap()
        };
        let channel = SignalChannel::discover(None);
        if expected > 1 {
            assert_eq!(channel.target(), Some(Pid::from_raw(expected)));
        } else {
            assert_eq!(channel.target(), None);
        }
    }

    #[test]
    fn test_signal_delivered_to_target() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let channel = SignalChannel::new(Some(Pid::from_raw(child.id() as i32)));

        channel.notify(Path::new("/output/title07.mkv")).unwrap();

        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(libc::SIGUSR1));
    }
}
