//! Background scheduled tasks for the application.
//!
//! The expiry scan is the only recurring job: it finalizes due giveaways
//! and triggers winner selection. Call `spawn_all` once during startup.

use crate::services::GiveawayService;
use chrono::Utc;

/// Spawn all background tasks.
///
/// Notes
/// - The scan pass is idempotent: the service claims each record's
///   `ended` flag atomically, so overlapping or repeated passes never
///   finalize a record twice.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(giveaway_service: GiveawayService, scan_interval_secs: u64) {
    tokio::spawn(async move {
        loop {
            match giveaway_service.finalize_due(Utc::now()).await {
                Ok(n) if n > 0 => log::info!("Finalized giveaways this pass: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Giveaway scan pass failed: {e:?}"),
            }
            tokio::time::sleep(std::time::Duration::from_secs(scan_interval_secs)).await;
        }
    });
}
