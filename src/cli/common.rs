//! Shared helpers for CLI commands.
//!
//! All interactive I/O in trellis-forge lives here. Flows in the library
//! crate expose decision points as values; these helpers turn them into
//! prompts, honoring `--yes`/`--stash` style flags and degrading to safe
//! defaults when stdin is not a terminal.

use std::io::{self, IsTerminal, Write};

use anyhow::Result;
use colored::Colorize;

use crate::installer::WorkingTreeAction;

/// Print a section heading.
pub fn heading(text: &str) {
    println!("{}", text.bold());
}

/// Ask a yes/no question. `assume_yes` short-circuits to `true`; a
/// non-interactive stdin answers `false` so scripted runs never hang.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("{prompt} [y/N]: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Decide what to do about a dirty working tree.
///
/// `--stash` pre-answers with [`WorkingTreeAction::Stash`]; `--yes`
/// proceeds over the modifications; otherwise the user picks. A
/// non-interactive stdin aborts, the only safe default.
pub fn choose_working_tree_action(stash: bool, assume_yes: bool) -> Result<WorkingTreeAction> {
    if stash {
        return Ok(WorkingTreeAction::Stash);
    }
    if assume_yes {
        return Ok(WorkingTreeAction::Proceed);
    }
    if !io::stdin().is_terminal() {
        return Ok(WorkingTreeAction::Abort);
    }

    print!("The source tree has local changes. [s]tash, [p]roceed, [a]bort? ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(match answer.trim().to_lowercase().as_str() {
        "s" | "stash" => WorkingTreeAction::Stash,
        "p" | "proceed" => WorkingTreeAction::Proceed,
        _ => WorkingTreeAction::Abort,
    })
}

/// `ok`/`missing` marker for file presence listings.
pub fn presence_marker(present: bool) -> colored::ColoredString {
    if present {
        "ok".green()
    } else {
        "missing".red()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assume_yes_skips_the_prompt() {
        assert!(confirm("irrelevant", true).unwrap());
    }

    #[test]
    fn stash_flag_wins() {
        assert_eq!(
            choose_working_tree_action(true, false).unwrap(),
            WorkingTreeAction::Stash
        );
        assert_eq!(
            choose_working_tree_action(true, true).unwrap(),
            WorkingTreeAction::Stash
        );
    }
}
