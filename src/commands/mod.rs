mod account;
mod announcement;
mod config_cmd;
mod farm;
mod faq;

pub use account::AccountCommand;
pub use announcement::AnnouncementCommand;
pub use config_cmd::ConfigCommand;
pub use farm::FarmCommand;
pub use faq::FaqCommand;

use clap::ValueEnum;
use std::io::{self, Write};

use technanas::sync::RefreshOutcome;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Tells the user on stderr when a refresh fell back to cached data.
fn report_refresh(outcome: &RefreshOutcome) {
    if outcome.is_stale() {
        eprintln!("Note: {}", outcome);
    }
}

/// Asks a yes/no question on stdin; anything but `y` is no.
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
