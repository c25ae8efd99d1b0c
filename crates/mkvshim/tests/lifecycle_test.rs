//! Process-wide attach/detach. The context is a one-shot global, so this file
//! holds a single test and runs in its own process.

use std::os::unix::io::IntoRawFd;
use std::path::Path;

use mkvshim::intercept::close_hook;
use mkvshim::{attach_with, context, detach, reals, Notify, ShimError};
use mkvshim_config::{testing::TestEnvironment, NotifyStrategy};

#[test]
fn test_attach_once_detach_once() {
    assert!(context().is_none());

    let env = TestEnvironment::new().unwrap();
    std::fs::write(&env.fifo_path, b"").unwrap();

    // Before attach the close hook is a plain close.
    let fd = tempfile::tempfile().unwrap().into_raw_fd();
    assert_eq!(unsafe { close_hook(fd) }, 0);

    let first = attach_with(&env.config()) as *const _;
    assert!(reals::is_resolved());

    let mut other = env.config();
    other.strategy = NotifyStrategy::None;
    let second = attach_with(&other) as *const _;
    assert_eq!(first, second, "attach must build the context exactly once");

    let ctx = context().unwrap();
    assert_eq!(ctx.channel().strategy(), NotifyStrategy::Fifo);
    assert_eq!(ctx.policy().prefix(), "/output/");

    // Unmanaged closes go through the hook without notifying.
    let dir = tempfile::tempdir().unwrap();
    let file = std::fs::File::create(dir.path().join("title00.mkv")).unwrap();
    std::io::Write::write_all(&mut &file, b"data").unwrap();
    assert_eq!(unsafe { close_hook(file.into_raw_fd()) }, 0);

    // Closing a bad descriptor still reports the real failure.
    assert_eq!(unsafe { close_hook(-1) }, -1);
    assert_eq!(mkvshim::errno::get(), libc::EBADF);

    detach();
    detach();
    assert!(ctx.is_detached());
    assert!(matches!(
        ctx.channel().notify(Path::new("/output/title00.mkv")),
        Err(ShimError::ChannelDisabled)
    ));

    assert_eq!(std::fs::read(&env.fifo_path).unwrap(), b"init\0fini\0");
}
