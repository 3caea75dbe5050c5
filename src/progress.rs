//! Terminal feedback for long reconciliation runs.
//!
//! Interactive runs get indicatif bars for the matching and report-writing
//! phases and spinners while tables load. Batch runs (`--log-only`) draw
//! nothing; the same milestones are reported as `log` lines instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner} [{elapsed_precise}]";

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Switch every later bar and spinner to log output. Set once from the CLI.
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Seconds under a minute, minutes above: "4.2s", "3.5m".
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

fn quiet(pb: ProgressBar) -> ProgressBar {
    pb.set_draw_target(ProgressDrawTarget::hidden());
    pb
}

/// Bar over `len` rows. Nothing is drawn in log-only mode or for an empty batch.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = if is_log_only() || len == 0 {
        quiet(ProgressBar::new(len))
    } else {
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        ProgressBar::new(len).with_style(style)
    };
    pb.set_message(msg.to_string());
    pb
}

/// Log-only counterpart of a bar tick: one line every `interval` rows and
/// one at the last row.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if !is_log_only() || total == 0 {
        return;
    }
    if current % interval == 0 || current == total {
        let pct = 100.0 * current as f64 / total as f64;
        log::info!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

/// Spinner for a table load; in log-only mode the message is logged once.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = if is_log_only() {
        log::info!("{}", msg);
        quiet(ProgressBar::new_spinner())
    } else {
        let style = ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let pb = ProgressBar::new_spinner().with_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    pb.set_message(msg.to_string());
    pb
}
