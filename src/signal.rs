//! Ctrl+C handling.
//!
//! A single `AtomicBool` is shared by the walker, the hashing passes and the
//! deletion loop. Each of them checks it between files and winds down,
//! returning what it has so far; the binary then exits with code 130.
//!
//! ```rust,no_run
//! use dupdiff::duplicates::FinderConfig;
//! use dupdiff::signal::install_handler;
//!
//! let handler = install_handler();
//! let config = FinderConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a shutdown without a signal.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag for workers.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the Ctrl+C hook, or reuse the one already installed.
///
/// `ctrlc` accepts one hook per process. A repeated call (several `run_app`
/// invocations in one test binary) gets the existing handler back with its
/// flag cleared. If the hook cannot be registered at all the returned handler
/// still works for [`ShutdownHandler::request_shutdown`].
pub fn install_handler() -> ShutdownHandler {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return handler.clone();
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing current file...");
        let _ = stderr.flush();

        log::info!("Shutdown signal received");
    });

    if let Err(e) = installed {
        log::debug!("Ctrl+C handler not installed: {}", e);
    }

    // Another thread may have won the race; both paths agree on one handler.
    let handler = GLOBAL_HANDLER.get_or_init(|| handler).clone();
    handler.reset();
    handler
}
