use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Time left for record processing before the invocation deadline, keeping
/// `margin_ms` in reserve for the final acknowledgment.
pub fn processing_budget(deadline_ms: u64, now_ms: u64, margin_ms: u64) -> Duration {
    Duration::from_millis(deadline_ms.saturating_sub(now_ms).saturating_sub(margin_ms))
}

/// Cancels `token` once `budget` elapses. Abort the returned handle when the
/// invocation finishes first.
pub fn spawn_deadline_watchdog(token: CancellationToken, budget: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(budget).await;
        tracing::warn!(
            component = "deadline",
            event = "budget_exhausted",
            budget_ms = budget.as_millis() as u64,
            "cancelling in-flight processing"
        );
        token.cancel();
    })
}
