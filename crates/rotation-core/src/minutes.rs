// Playing-time normalization: numeric minutes or "MM:SS" text to decimal minutes.

use crate::table::Cell;

/// Convert one time-played cell into non-negative decimal minutes.
///
/// Never fails: anything that cannot be read as a duration counts as zero
/// minutes so a single malformed cell cannot abort a run.
pub fn normalize_minutes(cell: &Cell) -> f64 {
    match cell {
        Cell::Missing => 0.0,
        Cell::Number(n) => non_negative(*n),
        Cell::Text(s) => {
            let s = s.trim();
            if s.contains(':') {
                if let Some(minutes) = parse_clock(s) {
                    return minutes;
                }
            }
            s.parse::<f64>().map(non_negative).unwrap_or(0.0)
        }
    }
}

/// Parse `<minutes>:<seconds>` where both parts are whole numbers.
fn parse_clock(s: &str) -> Option<f64> {
    let (minutes, seconds) = s.split_once(':')?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    let seconds: u32 = seconds.trim().parse().ok()?;
    Some(f64::from(minutes) + f64::from(seconds) / 60.0)
}

fn non_negative(n: f64) -> f64 {
    if n.is_finite() && n >= 0.0 {
        n
    } else {
        0.0
    }
}
