//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::{style, Emoji, Style};

static CHECK: Emoji<'_, '_> = Emoji("✓", "[OK]");
static CROSS: Emoji<'_, '_> = Emoji("✗", "[FAIL]");
static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");

fn marker(ctx: &UiContext, emoji: &Emoji<'_, '_>, plain: &'static str) -> String {
    if ctx.is_interactive() {
        emoji.to_string()
    } else {
        plain.to_string()
    }
}

/// Report title
pub fn header(_ctx: &UiContext, title: &str) {
    println!("{}", style(title).cyan().bold());
}

/// Section heading
pub fn section(_ctx: &UiContext, title: &str) {
    println!();
    println!("{}", style(title).bold());
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    println!("  {} {}", style(marker(ctx, &CHECK, "[OK]")).green(), message);
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    println!(
        "  {} {} ({})",
        style(marker(ctx, &CHECK, "[OK]")).green(),
        message,
        style(detail).dim()
    );
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    println!("  {} {}", style(marker(ctx, &WARN, "[WARN]")).yellow(), message);
}

pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    println!(
        "  {} {} - {}",
        style(marker(ctx, &WARN, "[WARN]")).yellow(),
        message,
        style(hint).dim()
    );
}

pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    println!(
        "  {} {}: {}",
        style(marker(ctx, &CROSS, "[FAIL]")).red(),
        message,
        style(detail).red()
    );
}

/// Aligned `key: value` line
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.is_interactive() {
        println!("  {:<12} {}", style(format!("{key}:")).dim(), value);
    } else {
        println!("  {:<12} {}", format!("{key}:"), value);
    }
}

/// `key: value` colored by status
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    let value_style = if ok {
        Style::new().green()
    } else {
        Style::new().yellow()
    };

    if ctx.is_interactive() {
        println!(
            "  {:<12} {}",
            style(format!("{key}:")).dim(),
            value_style.apply_to(value)
        );
    } else {
        let prefix = if ok { "[OK]" } else { "[WARN]" };
        println!("  {} {}: {}", prefix, key, value);
    }
}

/// Closing line of a report
pub fn summary(_ctx: &UiContext, ok: bool, message: &str) {
    println!();
    if ok {
        println!("{}", style(message).green().bold());
    } else {
        println!("{}", style(message).yellow().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        // These should not panic
        header(&ctx, "Test");
        section(&ctx, "Section");
        step_ok(&ctx, "Step completed");
        step_warn_hint(&ctx, "Warning", "do something");
        step_error_detail(&ctx, "Error", "detail");
        key_value(&ctx, "path", "/tmp");
        key_value_status(&ctx, "git", "2.43.0", true);
        summary(&ctx, true, "Done");
    }

    #[test]
    fn plain_markers_outside_terminals() {
        let ctx = UiContext::non_interactive();
        assert_eq!(marker(&ctx, &CHECK, "[OK]"), "[OK]");
        assert_eq!(marker(&ctx, &CROSS, "[FAIL]"), "[FAIL]");
    }
}
