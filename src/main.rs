use std::io;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser as _;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ethersrv::config::{self, Cli};
use ethersrv::drives::{Drive, DriveTable};
use ethersrv::fs::fat;
use ethersrv::lock::{LockFile, LOCK_PATH};
use ethersrv::net::RawSock;
use ethersrv::Server;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = err.print();
            return code;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = match config::resolve(cli) {
        Ok(settings) => settings,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut drives = DriveTable::new();
    for (index, path) in &settings.exports {
        let root = match std::fs::canonicalize(path) {
            Ok(root) => root,
            Err(err) => {
                error!("failed to resolve path '{}': {err}", path.display());
                return ExitCode::FAILURE;
            }
        };
        let fat = fat::is_fat(&root);
        if !fat {
            warn!(
                "the path '{}' doesn't seem to be stored on a FAT filesystem, \
                 DOS attributes won't be supported",
                root.display()
            );
        }
        drives.map(*index, Drive { root, fat });
    }

    let mut sock = match RawSock::open(&settings.interface) {
        Ok(sock) => sock,
        Err(err) => {
            error!(
                "failed to open a raw socket on '{}': {err} \
                 (raw Ethernet sockets usually require root)",
                settings.interface
            );
            return ExitCode::FAILURE;
        }
    };

    let lock = match LockFile::acquire(LOCK_PATH) {
        Ok(lock) => lock,
        Err(err) => {
            error!(
                "failed to acquire '{LOCK_PATH}': {err}. Is ethersrv running already? \
                 If you are sure it is not, delete the lock file."
            );
            return ExitCode::FAILURE;
        }
    };

    use ethersrv::net::FrameIo as _;
    info!("listening on '{}' [{}]", settings.interface, sock.mac());
    for (letter, drive) in drives.iter() {
        info!("drive {letter}: mapped to {}", drive.root.display());
    }

    if !settings.foreground {
        if let Err(err) = daemonize() {
            error!("failed to daemonize: {err}");
            return ExitCode::FAILURE;
        }
    }

    // Single-threaded by design: one task owns every cache and requests are
    // processed to completion in arrival order.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to start the runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut server = Server::new(drives);
    let result: io::Result<()> = runtime.block_on(async {
        let mut terminate = signal(SignalKind::terminate())?;
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut quit = signal(SignalKind::quit())?;
        tokio::select! {
            res = server.serve(&mut sock) => res,
            _ = terminate.recv() => Ok(()),
            _ = interrupt.recv() => Ok(()),
            _ = quit.recv() => Ok(()),
        }
    });

    drop(lock);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Forks into the background; the parent exits immediately and SIGHUP is
/// ignored so closing the controlling terminal does not kill the daemon.
fn daemonize() -> io::Result<()> {
    unsafe { libc::signal(libc::SIGHUP, libc::SIG_IGN) };
    match unsafe { libc::fork() } {
        0 => Ok(()),
        pid if pid > 0 => std::process::exit(0),
        _ => Err(io::Error::last_os_error()),
    }
}
