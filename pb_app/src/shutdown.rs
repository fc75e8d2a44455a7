use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Sets up a Ctrl+C handler that clears the running flag; the
/// coordinator turns that into a single EXIT broadcast
pub fn setup(running: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        running.store(false, Ordering::Relaxed);
    })
}
