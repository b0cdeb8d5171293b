//! Pure trend math over snapshot history.

use crate::domain::{QuoteSnapshot, TrendDirection, TrendSequence};

/// Percent move from `start` to `end`. Zero or negative starts would divide
/// by zero or flip the sign, so they yield 0.0.
pub fn percent_change(start: f64, end: f64) -> f64 {
    if start <= 0.0 {
        return 0.0;
    }
    (end - start) / start * 100.0
}

/// Percent move from the day-open price to the latest price.
///
/// `None` when no day-open exists or it is unusable for division.
pub fn daily_trend(day_open: Option<f64>, latest: f64) -> Option<f64> {
    day_open
        .filter(|open| *open > 0.0)
        .map(|open| percent_change(open, latest))
}

/// Split an intraday snapshot history into maximal directional runs.
///
/// Snapshots must be in ascending time order. A flat step (equal prices)
/// counts as up. Adjacent runs share their boundary snapshot, so each run's
/// end time equals the next run's start time. Fewer than two snapshots yield
/// no runs.
pub fn segment(snapshots: &[QuoteSnapshot]) -> Vec<TrendSequence> {
    if snapshots.len() < 2 {
        return Vec::new();
    }

    let mut sequences = Vec::new();
    let mut run_start = 0;
    let mut run_direction = direction_of(&snapshots[0], &snapshots[1]);

    for i in 1..snapshots.len() - 1 {
        let next_direction = direction_of(&snapshots[i], &snapshots[i + 1]);
        if next_direction != run_direction {
            sequences.push(build_sequence(&snapshots[run_start..=i], run_direction));
            run_start = i;
            run_direction = next_direction;
        }
    }

    sequences.push(build_sequence(&snapshots[run_start..], run_direction));
    sequences
}

fn direction_of(prev: &QuoteSnapshot, next: &QuoteSnapshot) -> TrendDirection {
    if next.price >= prev.price {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    }
}

fn build_sequence(run: &[QuoteSnapshot], direction: TrendDirection) -> TrendSequence {
    let first = &run[0];
    let last = &run[run.len() - 1];
    TrendSequence {
        direction,
        start_time: first.refreshed_at,
        end_time: last.refreshed_at,
        start_price: first.price,
        end_price: last.price,
        currency: last.currency.clone(),
        change_percent: percent_change(first.price, last.price),
        snapshot_count: run.len(),
    }
}
