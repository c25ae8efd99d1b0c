//! Stand-in for the ripper: creates each file with mode 0644 under umask 002,
//! writes the requested number of bytes and closes it. Without the shim every
//! file ends up 0644; a forced 0666 shows up as 0664.
//!
//! Usage: ripper <path> <bytes> [<path> <bytes> ...]

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.len() % 2 != 0 {
        eprintln!("Usage: ripper <path> <bytes> [<path> <bytes> ...]");
        std::process::exit(2);
    }

    unsafe { libc::umask(0o002) };

    for pair in args.chunks(2) {
        let (path, size) = (&pair[0], pair[1].parse::<usize>()?);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path)?;
        file.write_all(&vec![0x1a; size])?;
        println!("wrote {} bytes to {}", size, path);
    }
    Ok(())
}
