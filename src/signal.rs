//! Signal handling for graceful shutdown.
//!
//! Ctrl+C only sets a flag. The runner checks it between files, so an
//! encode that is already running finishes and its replace step completes
//! (or fails) normally before the run stops. A source file is therefore
//! never left half-replaced by an interrupt.
//!
//! # Usage
//!
//! ```rust,no_run
//! use media_fixer::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//!
//! // Between two files
//! if handler.is_shutdown_requested() {
//!     return;
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared shutdown flag.
///
/// Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a new shutdown handler with the flag initially set to `false`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Manually request a shutdown.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the shutdown flag, e.g. to set it from a signal handler.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

/// Install a Ctrl+C handler that sets the shutdown flag on interrupt.
///
/// Call once, early in startup. The process can only hold one handler.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if a handler is already registered
/// or the platform refuses it.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Finishing the current file before stopping..."
        );
        let _ = std::io::stderr().flush();

        log::info!("Shutdown signal received");
    })?;

    Ok(handler)
}
