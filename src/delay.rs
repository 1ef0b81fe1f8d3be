use std::thread;
use std::time::Duration;

use log::info;

/// Fixed pause before every remote call. Caps the aggregate request rate
/// regardless of how many workers are running; not a retry back-off.
pub fn request_throttle(delay: Duration) {
    thread::sleep(delay);
}

/// Fixed pause between retry attempts after a failure.
pub fn retry_pause(delay: Duration) {
    info!("Waiting {:.1}s before retrying...", delay.as_secs_f64());
    thread::sleep(delay);
}

/// Escalating pause after a rate-limit signal: delay grows with the
/// attempt number (1-based).
pub fn rate_limit_pause(delay: Duration, attempt: u32) {
    let scaled = delay * attempt.max(1);
    info!(
        "Rate limited. Waiting {:.1}s before retrying...",
        scaled.as_secs_f64()
    );
    thread::sleep(scaled);
}
