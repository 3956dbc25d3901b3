use crate::error::SaveBackupError;
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Interrupt state shared between the watch loop and the Ctrl-C handler
#[derive(Clone, Default)]
pub struct WatchContext {
    interrupt_flag: Arc<AtomicBool>,
}

impl WatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the interrupt flag for signal handler setup
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt_flag.clone()
    }

    /// Check if an interrupt has been requested
    pub fn is_interrupted(&self) -> bool {
        self.interrupt_flag.load(Ordering::SeqCst)
    }

    /// Set interrupt state (mainly for testing)
    pub fn set_interrupted(&self, interrupted: bool) {
        self.interrupt_flag.store(interrupted, Ordering::SeqCst);
    }
}

/// Route Ctrl-C to the context's interrupt flag. Can only be installed once per process.
pub fn install_interrupt_handler(context: &WatchContext) -> Result<()> {
    let flag = context.interrupt_flag();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| SaveBackupError::config(format!("Could not install Ctrl-C handler: {e}")))
}
