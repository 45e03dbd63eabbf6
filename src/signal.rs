use std::io;
use std::thread;

use log::{error, warn};

use crate::utils::parallel::CancellationFlag;

pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Watches for Ctrl-C on a helper thread.
///
/// The first interrupt sets `flag`: no new folders are started and the ones
/// in progress finish their writes. A second interrupt exits immediately.
pub fn install_interrupt_handler(flag: CancellationFlag) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("dvtag-signal".into())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Cannot listen for Ctrl-C: {}", e);
                        return;
                    }
                    if flag.is_cancelled() {
                        warn!("Interrupted again, exiting");
                        std::process::exit(INTERRUPTED_EXIT_CODE);
                    }
                    warn!("Interrupt received, finishing folders in progress (Ctrl-C again to abort)");
                    flag.cancel();
                }
            });
        })?;
    Ok(())
}
