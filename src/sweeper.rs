use std::time::{Duration, Instant};

use crate::events::EventSink;
use crate::spooler::Spooler;

/// Remove every terminal job whose grace window has elapsed, emitting a
/// deletion event for each. Run once after every completed command.
pub fn sweep_expired(spooler: &mut Spooler) {
    let now = Instant::now();
    let grace = spooler.grace_window;
    for id in spooler.jobs.expired_ids(now, grace) {
        spooler.jobs.remove(id);
        spooler.sink.job_deleted(id);
    }
}

pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(10);
