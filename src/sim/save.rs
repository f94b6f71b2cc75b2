/// Persisted statistics: best height and fastest completion.
///
/// ## File format:
///   Key-value lines in `stats.dat`:
///   ```
///   highest_point=734
///   fastest_ticks=5120
///   ```
///   Unknown keys are ignored, unparsable values fall back to 0.
///   `fastest_ticks=0` means the tower has not been finished yet.

use std::path::{Path, PathBuf};

const STATS_FILE: &str = "stats.dat";

/// Metres awarded for reaching the finish.
pub const MAX_SCORE: u32 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub highest_point: u32,
    pub fastest_ticks: u64,
}

impl Stats {
    /// Record a finish time. Returns true when it is a new best.
    pub fn offer_time(&mut self, ticks: u64) -> bool {
        if self.fastest_ticks == 0 || ticks < self.fastest_ticks {
            self.fastest_ticks = ticks;
            true
        } else {
            false
        }
    }

    /// Record a climb height. Returns true when it is a new best.
    pub fn offer_height(&mut self, metres: u32) -> bool {
        if metres > self.highest_point {
            self.highest_point = metres;
            true
        } else {
            false
        }
    }
}

/// Climb height in metres for a player at `y`, 0 at the start line and
/// `MAX_SCORE` at the top of the map.
pub fn score_from_y(y: f64, start_y: f64) -> u32 {
    if start_y <= 0.0 {
        return 0;
    }
    let score = (start_y - y) / start_y * MAX_SCORE as f64;
    score.clamp(0.0, MAX_SCORE as f64) as u32
}

/// Inverse of `score_from_y`: the y of a height in metres.
pub fn y_from_score(metres: u32, start_y: f64) -> f64 {
    start_y - metres.min(MAX_SCORE) as f64 / MAX_SCORE as f64 * start_y
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

/// Writable data directory: exe dir, then XDG data home, then CWD.
pub fn data_dir() -> PathBuf {
    // 1. Try exe directory (works for local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // Check if writable (system installs under /usr won't be)
            let test_path = parent.join(".write_test_nanoclimb");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home (~/.local/share/nanoclimb) for system installs
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/nanoclimb");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. Fallback to CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn stats_path() -> PathBuf {
    data_dir().join(STATS_FILE)
}

// ══════════════════════════════════════════════════════════════
// Load / save
// ══════════════════════════════════════════════════════════════

pub fn load_stats() -> Stats {
    load_stats_from(&stats_path())
}

pub fn save_stats(stats: &Stats) -> Result<(), String> {
    save_stats_to(&stats_path(), stats)
}

/// Missing or unreadable file = fresh stats.
pub fn load_stats_from(path: &Path) -> Stats {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_stats(&content),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("could not read {}: {e}", path.display());
            }
            Stats::default()
        }
    }
}

pub fn save_stats_to(path: &Path, stats: &Stats) -> Result<(), String> {
    std::fs::write(path, serialize(stats))
        .map_err(|e| format!("Saving stats to {} failed: {}", path.display(), e))
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn serialize(stats: &Stats) -> String {
    let mut out = String::with_capacity(64);
    out.push_str(&format!("highest_point={}\n", stats.highest_point));
    out.push_str(&format!("fastest_ticks={}\n", stats.fastest_ticks));
    out
}

fn parse_stats(content: &str) -> Stats {
    let mut stats = Stats::default();
    for line in content.lines() {
        let line = line.trim();
        if let Some(val) = line.strip_prefix("highest_point=") {
            stats.highest_point = val.trim().parse().unwrap_or(0).min(MAX_SCORE);
        } else if let Some(val) = line.strip_prefix("fastest_ticks=") {
            stats.fastest_ticks = val.trim().parse().unwrap_or(0);
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.dat");
        let stats = Stats { highest_point: 734, fastest_ticks: 5120 };
        save_stats_to(&path, &stats).unwrap();
        assert_eq!(load_stats_from(&path), stats);
    }

    #[test]
    fn missing_file_is_fresh_stats() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_stats_from(&dir.path().join("nope.dat")), Stats::default());
    }

    #[test]
    fn save_into_missing_dir_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("stats.dat");
        let err = save_stats_to(&path, &Stats::default()).unwrap_err();
        assert!(err.starts_with("Saving stats to"));
    }

    #[test]
    fn parse_tolerates_noise() {
        let s = parse_stats("# old file\nhighest_point = 12\nfastest_ticks=abc\nlives=3\n");
        assert_eq!(s, Stats { highest_point: 0, fastest_ticks: 0 });
        let s = parse_stats("highest_point=99999\nfastest_ticks= 42 \n");
        assert_eq!(s, Stats { highest_point: MAX_SCORE, fastest_ticks: 42 });
    }

    #[test]
    fn records_only_improve() {
        let mut s = Stats::default();
        assert!(s.offer_time(900));
        assert!(!s.offer_time(950));
        assert!(s.offer_time(800));
        assert!(s.offer_height(10));
        assert!(!s.offer_height(10));
        assert_eq!(s, Stats { highest_point: 10, fastest_ticks: 800 });
    }

    #[test]
    fn score_scales_from_start_to_top() {
        assert_eq!(score_from_y(920.0, 920.0), 0);
        assert_eq!(score_from_y(460.0, 920.0), 500);
        assert_eq!(score_from_y(0.0, 920.0), 1000);
        assert_eq!(score_from_y(-30.0, 920.0), 1000);
        assert_eq!(score_from_y(990.0, 920.0), 0);
        assert_eq!(y_from_score(500, 920.0), 460.0);
        assert_eq!(y_from_score(5000, 920.0), 0.0);
    }
}
