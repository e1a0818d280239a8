//! End-of-run report

use crossterm::style::Stylize;

use crate::installer::RunOutcome;

/// Render `outcome` for the terminal.
pub fn render_summary(outcome: &RunOutcome) -> String {
    let mut out = String::new();

    let title = if outcome.dry_run {
        "Summary (dry run, nothing was installed)"
    } else {
        "Summary"
    };
    out.push_str(&format!("\n{}\n", title.bold()));

    if outcome.installed.is_empty() {
        out.push_str("  Installed: none\n");
    } else {
        out.push_str(&format!("  Installed ({}):\n", outcome.installed.len()));
        for id in &outcome.installed {
            let note = if outcome.already_present.contains(id) {
                " (already present)"
            } else {
                ""
            };
            out.push_str(&format!("    {} {}{}\n", "✓".green(), id, note));
        }
    }

    if !outcome.failed.is_empty() {
        out.push_str(&format!("  Failed ({}):\n", outcome.failed.len()));
        for failure in &outcome.failed {
            out.push_str(&format!("    {} {}: {}\n", "✗".red(), failure.id, failure.reason));
        }
    }

    if !outcome.warnings.is_empty() {
        out.push_str("  Skipped:\n");
        for warning in &outcome.warnings {
            out.push_str(&format!("    {} {}\n", "!".yellow(), warning));
        }
    }

    out
}
