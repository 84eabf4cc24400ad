/// Percentage of `total_ms` covered by `elapsed_ms`, rounded half up.
///
/// Not clamped: a probe that underestimates the duration yields values above
/// 100. Returns `None` when there is nothing to report yet.
pub fn percentage(elapsed_ms: i64, total_ms: i64) -> Option<u64> {
    if elapsed_ms <= 0 || total_ms <= 0 {
        return None;
    }
    let elapsed = elapsed_ms as u128;
    let total = total_ms as u128;
    Some(u64::try_from((elapsed * 200 + total) / (total * 2)).unwrap_or(u64::MAX))
}

pub fn status_text(percentage: u64) -> String {
    format!("Encoding video : % {}.", percentage)
}

/// Turns elapsed-time samples for one job into status updates.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    total_duration_ms: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressUpdate {
    pub percentage: u64,
    pub text: String,
}

impl ProgressTracker {
    pub fn new(total_duration_ms: i64) -> Self {
        ProgressTracker { total_duration_ms }
    }

    pub fn total_duration_ms(&self) -> i64 {
        self.total_duration_ms
    }

    pub fn sample(&self, elapsed_ms: i64) -> Option<ProgressUpdate> {
        let percentage = percentage(elapsed_ms, self.total_duration_ms)?;
        Some(ProgressUpdate {
            percentage,
            text: status_text(percentage),
        })
    }
}
