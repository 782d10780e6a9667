use crate::demux::DemuxStats;
use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
// Spinner messages are refreshed every this many records
const REFRESH_EVERY: u64 = 1 << 12;

fn spinner_style(color: &str) -> ProgressStyle {
    ProgressStyle::with_template(&format!(
        "{{spinner:.{color}}} {{prefix:<12}} {{msg:>10}} {{elapsed_precise}}"
    ))
    .unwrap_or_else(|_| ProgressStyle::default_spinner())
    .tick_chars(TICK_CHARS)
}

/// Total / matched / unmatched spinners shown while reads stream through
pub struct RunProgress {
    total: ProgressBar,
    matched: ProgressBar,
    unmatched: ProgressBar,
}

impl RunProgress {
    pub fn new(visible: bool) -> Self {
        let multi = MultiProgress::new();
        if !visible {
            multi.set_draw_target(ProgressDrawTarget::hidden());
        }
        let total = multi.add(ProgressBar::new_spinner());
        let matched = multi.add(ProgressBar::new_spinner());
        let unmatched = multi.add(ProgressBar::new_spinner());

        for (bar, color, prefix) in [
            (&total, "blue", "Total:"),
            (&matched, "green", "Matched:"),
            (&unmatched, "red", "Unmatched:"),
        ] {
            bar.set_style(spinner_style(color));
            bar.set_prefix(prefix);
        }
        Self {
            total,
            matched,
            unmatched,
        }
    }

    pub fn update(&self, total: u64, matched: u64) {
        if total % REFRESH_EVERY == 0 {
            self.set(total, matched);
        }
    }

    fn set(&self, total: u64, matched: u64) {
        self.total.set_message(total.to_string());
        self.matched.set_message(matched.to_string());
        self.unmatched.set_message((total - matched).to_string());
        self.total.tick();
    }

    pub fn finish(&self, total: u64, matched: u64) {
        self.set(total, matched);
        for bar in [&self.total, &self.matched, &self.unmatched] {
            bar.finish();
        }
    }
}

/// Indented, coloured status lines for the command line
pub struct ProgressTracker {
    start_time: Instant,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn step(&self, message: &str) {
        println!("{} {}", "•".blue(), message.bold());
    }

    pub fn substep(&self, message: &str) {
        println!("  {} {}", "◦".cyan(), message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green(), message.green().bold());
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", "⚠".yellow(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message.red().bold());
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn print_summary(stats: &DemuxStats, elapsed: Duration) {
    let unit = if stats.paired { "pairs" } else { "reads" };

    println!("\n{}", "Summary".bold().underline());
    println!("  • Total {unit}: {}", stats.total.to_string().bold());
    println!(
        "  • Matched {unit}: {} ({:.1}%)",
        stats.matched.to_string().green().bold(),
        percent(stats.matched, stats.total)
    );
    println!(
        "  • Unmatched {unit}: {} ({:.1}%)",
        stats.unmatched.to_string().red().bold(),
        percent(stats.unmatched, stats.total)
    );
    if stats.paired {
        println!(
            "  • Orientation: {} forward, {} swapped",
            stats.forward.to_string().bold(),
            stats.swapped.to_string().bold()
        );
    }

    println!("\n{}", "Samples".bold().underline());
    let width = stats
        .per_sample
        .iter()
        .map(|s| s.sample.len())
        .max()
        .unwrap_or(0);
    for sample in &stats.per_sample {
        let count = sample.reads.to_string();
        let count = if sample.reads == 0 {
            count.dimmed()
        } else {
            count.cyan()
        };
        println!("  • {:<width$}  {count}", sample.sample);
    }
    println!("\n  Time: {:.2}s", elapsed.as_secs_f64());
}
