//! Simulated arrival-time derivation.
//!
//! ETAs are a deterministic function of the route's base departure, the
//! stop's position and the current tick. Nothing here is ever stored;
//! every consumer recomputes from the same inputs.

use chrono::{Duration, NaiveDate};

use crate::catalog::DepartureTime;

/// Derive one display ETA per stop.
///
/// Stop `i` sits `4 + 3*i` minutes past the base departure, alternating
/// one minute of spread on `(tick + i) mod 2` plus a jitter term in
/// {-1, 0, +1} from `(tick + 17*i) mod 3`. Minute overflow rolls into the
/// hour and day per normal clock arithmetic.
pub fn compute_etas(
    base: DepartureTime,
    stop_count: usize,
    tick: u64,
    service_date: NaiveDate,
) -> Vec<String> {
    let departure = service_date.and_time(base.time());
    (0..stop_count as i64)
        .map(|i| {
            let tick = tick as i64;
            let offset = 4 + 3 * i + (tick + i) % 2;
            let noise = (tick + 17 * i) % 3 - 1;
            let eta = departure + Duration::minutes(offset + noise);
            eta.format("%-I:%M %p").to_string()
        })
        .collect()
}
