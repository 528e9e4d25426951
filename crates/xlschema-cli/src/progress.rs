use colored::*;
use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use xlschema_core::{FileOutcome, Phase, ProgressReporter};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// Fingerprinting shows a spinner; schema and data phases get a bar sized to
/// the number of files. Nothing is drawn when stderr is not a terminal.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    interactive: bool,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            interactive: Term::stderr().is_term(),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

/// Fingerprinting hashes files in parallel without per-file callbacks, so it
/// gets a spinner; the other phases count files on a bar.
fn phase_bar(phase: Phase, total_files: usize, interactive: bool) -> ProgressBar {
    let pb = match phase {
        Phase::Fingerprint => {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS);
            pb.set_style(style);
            pb.set_message(format!("{} {} files...", phase.label(), total_files));
            pb
        }
        Phase::Schema | Phase::Data => {
            let pb = ProgressBar::new(total_files as u64);
            let template = format!(
                "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} files {{msg}}",
                phase.label()
            );
            let style = ProgressStyle::with_template(&template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━╸─")
                .tick_chars(TICK_CHARS);
            pb.set_style(style);
            pb
        }
    };
    if !interactive {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl ProgressReporter for CliReporter {
    fn on_phase_start(&self, phase: Phase, total_files: usize) {
        self.set_bar(phase_bar(phase, total_files, self.interactive));
    }

    fn on_file_start(&self, relative_path: &str) {
        self.with_bar(|pb| pb.set_message(relative_path.to_string()));
    }

    fn on_file_done(&self, _relative_path: &str, outcome: FileOutcome) {
        self.with_bar(|pb| {
            pb.inc(1);
            if outcome == FileOutcome::Skipped {
                pb.set_message("skipped".yellow().to_string());
            }
        });
    }

    fn on_phase_complete(&self, phase: Phase, duration_secs: f64) {
        self.finish_bar();
        if self.interactive {
            eprintln!(
                "  {} {} complete in {:.2}s",
                "✓".green(),
                phase.label(),
                duration_secs
            );
        }
    }
}
