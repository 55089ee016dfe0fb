//! Terminal output for long-running commands
//!
//! Numbered steps, a shared bar style for model builds and texture batches,
//! and the closing timing line.

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

use crate::converter::ModelProgress;

// Emojis fall back to nothing on terminals that cannot draw them.

/// Scanning a directory
pub static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
/// Writing a MOD
pub static DISK: Emoji<'_, '_> = Emoji("💾 ", "");
/// Loading shader tables
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
/// Converting many textures
pub static TRUCK: Emoji<'_, '_> = Emoji("🚚 ", "");
/// Texture batch summary
pub static PICTURE: Emoji<'_, '_> = Emoji("🖼️  ", "");
/// Decoding a MOD
pub static CUBE: Emoji<'_, '_> = Emoji("📐 ", "");

static DONE: Emoji<'_, '_> = Emoji("✨ ", "");

const BAR_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos}/{len} {elapsed}";

/// `[step/steps] <emoji>message`
pub fn print_step(step: usize, steps: usize, emoji: Emoji, msg: &str) {
    let counter = style(format!("[{step}/{steps}]")).bold().dim();
    println!("{counter} {emoji}{msg}");
}

/// Final line of a command, with the elapsed time.
pub fn print_done(elapsed: Duration) {
    println!("{DONE}Done in {}", HumanDuration(elapsed));
}

/// Bar of `len` steps labelled with `msg`.
///
/// # Panics
/// Panics if the bar template stops being a valid indicatif template.
#[must_use]
pub fn simple_bar(len: u64, msg: &str) -> ProgressBar {
    let bar_style = ProgressStyle::with_template(BAR_TEMPLATE)
        .expect("valid template")
        .progress_chars("=> ");
    let pb = ProgressBar::new(len).with_style(bar_style);
    pb.set_message(msg.to_string());
    pb
}

/// Follow a model conversion: the bar restarts for every phase and the
/// message names the primitive being worked on.
pub fn update_model_bar(pb: &ProgressBar, progress: &ModelProgress) {
    pb.set_length(progress.total as u64);
    pb.set_position(progress.current as u64);
    let phase = progress.phase.as_str();
    pb.set_message(match &progress.current_item {
        Some(item) => format!("{phase} {item}"),
        None => phase.to_string(),
    });
}

/// Failed entries of a texture batch, one per line.
pub fn print_failures<'a>(results: impl IntoIterator<Item = &'a String>) {
    let mut failures = results.into_iter().filter(|m| m.starts_with("Failed")).peekable();
    if failures.peek().is_none() {
        return;
    }
    println!();
    println!("{}", style("Failures:").red().bold());
    for msg in failures {
        println!("  {msg}");
    }
}
