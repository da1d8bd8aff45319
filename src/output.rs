//! Console output and styling.
//!
//! All user-facing terminal output goes through [`OutputFormatter`] so the
//! styling stays consistent. The action log file is written separately by
//! [`crate::action_log`].

use crate::action_log::{ActionEvent, ActionKind};
use crate::file_organizer::RunSummary;
use crate::restore::RestoreReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar over the top-level entries of a run.
    ///
    /// ```no_run
    /// use dirjanitor::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints one line per event, styled by kind.
    pub fn event(event: &ActionEvent, dry_run: bool) {
        let message = event.message();
        match event.kind {
            ActionKind::Moved | ActionKind::Deleted if dry_run => Self::dry_run_notice(&message),
            ActionKind::Moved | ActionKind::Deleted => Self::success(&message),
            ActionKind::Skipped => Self::plain(&format!("  {}", message.dimmed())),
            ActionKind::Failed => Self::error(&message),
        }
    }

    /// Prints a summary table with per-category counts and run totals.
    pub fn summary_table(summary: &RunSummary) {
        Self::header("SUMMARY");

        let max_category_len = summary
            .per_category
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max("Duplicates".len());

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Entries".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 12));

        // BTreeMap keeps the rows sorted.
        for (category, count) in &summary.per_category {
            println!(
                "{:<width$} | {}",
                category,
                count.to_string().green(),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 12));
        let totals = [
            ("Moved", summary.moved),
            ("Duplicates", summary.duplicates),
            ("Deleted", summary.deleted),
            ("Skipped", summary.skipped),
            ("Failed", summary.failed),
        ];
        for (label, count) in totals {
            let count = if label == "Failed" && count > 0 {
                count.to_string().red().bold()
            } else {
                count.to_string().bold()
            };
            println!("{:<width$} | {}", label, count, width = max_category_len);
        }
    }

    /// Prints the outcome of a restore.
    pub fn restore_report(report: &RestoreReport) {
        Self::success(&format!("Restored: {}", report.restored_files));

        for (original, actual) in &report.renamed {
            Self::warning(&format!(
                "{} was occupied, restored as {}",
                original.display(),
                actual.display()
            ));
        }

        if !report.skipped_files.is_empty() {
            Self::warning(&format!("Skipped: {}", report.skipped_files.len()));
            for (path, reason) in &report.skipped_files {
                Self::plain(&format!("    - {}: {}", path.display(), reason));
            }
        }

        if !report.failed_restores.is_empty() {
            Self::error(&format!("Failed: {}", report.failed_restores.len()));
            for (path, reason) in &report.failed_restores {
                eprintln!("    - {}: {}", path.display(), reason);
            }
            Self::warning("The restore manifest was kept. Fix the issues above and run again.");
        }

        if report.removed_dirs > 0 {
            Self::info(&format!(
                "Removed {} empty organization folders",
                report.removed_dirs
            ));
        }
    }
}
