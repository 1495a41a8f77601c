//! One check cycle: fetch, load state, evaluate, save state.

use tracing::{debug, info};

use crate::error::Result;
use crate::health::{evaluate, Evaluation, Thresholds};
use crate::source::StatsSource;
use crate::state::{StateRecord, StateStore};

/// Run a single check against `source`.
///
/// `store` is only consulted when given; callers pass one when an
/// events-per-minute threshold is configured. The new counters are saved
/// after a successful evaluation, replacing the previous state.
pub async fn run_check(
    source: &dyn StatsSource,
    store: Option<&StateStore>,
    thresholds: &Thresholds,
) -> Result<Evaluation> {
    let snapshot = source.fetch().await?;
    debug!(source = source.description(), captured_at = snapshot.captured_at(), "snapshot captured");

    let state = match store {
        Some(store) => store.load()?,
        None => StateRecord::default(),
    };

    let evaluation = evaluate(&snapshot, &state, thresholds)?;

    if let (Some(store), Some(next)) = (store, &evaluation.next_state) {
        store.save(next)?;
    }

    info!(status = %evaluation.report.status(), "check finished");
    Ok(evaluation)
}
