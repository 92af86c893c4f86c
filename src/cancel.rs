//! Cooperative cancellation.
//!
//! SIGINT and SIGTERM set a shared flag that long-running loops poll between
//! remote calls. A second signal while the flag is already set terminates the
//! process immediately with the interrupt exit code.

use crate::error::{PhabError, Result};
use crate::exit_codes;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Shared interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag no signal is wired to.
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag set by SIGINT and SIGTERM.
    ///
    /// Registration failures are logged; the command then simply cannot be
    /// interrupted cooperatively.
    pub fn install() -> Self {
        let cancel = Self::new();
        for signal in [SIGINT, SIGTERM] {
            let registered = flag::register_conditional_shutdown(
                signal,
                exit_codes::INTERRUPTED,
                Arc::clone(&cancel.0),
            )
            .and_then(|_| flag::register(signal, Arc::clone(&cancel.0)));
            if let Err(e) = registered {
                warn!("cannot install handler for signal {}: {}", signal, e);
            }
        }
        cancel
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PhabError::Interrupted)
        } else {
            Ok(())
        }
    }
}
