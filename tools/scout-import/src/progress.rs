//! Progress display for long file scans
//!
//! Bars draw on stderr and hide themselves when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str =
    "{spinner:.green} {prefix:>12} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}";

/// Record-count progress bar for one stage phase
pub fn create_progress_bar(total_records: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total_records), ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_bar()
        .template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_prefix(label.to_string());
    pb
}
