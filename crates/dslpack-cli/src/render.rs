use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use dslpack_core::Package;
use dslpack_workshop::{GetOutcome, GetStatus};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

/// Per-package fetch progress. Rich output draws one bar per package; plain
/// output stays silent.
pub(crate) struct FetchProgress {
    style: OutputStyle,
    current: Option<(String, ProgressBar)>,
    packages: u64,
    started_at: Instant,
}

impl FetchProgress {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self {
            style,
            current: None,
            packages: 0,
            started_at: Instant::now(),
        }
    }

    pub(crate) fn observe(&mut self, total: u64, package: &Package, message: &str) {
        if self.style == OutputStyle::Plain {
            return;
        }

        let same_package = self
            .current
            .as_ref()
            .is_some_and(|(unique_id, _)| unique_id == package.unique_id());
        if !same_package {
            self.finish_current();
            self.packages += 1;
            let progress_bar = ProgressBar::new(total.max(1));
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {prefix:<40} [{bar:20.cyan/blue}] {msg}",
            ) {
                progress_bar.set_style(style.tick_chars("|/-\\ ").progress_chars("=>-"));
            }
            progress_bar.set_prefix(package.unique_id().to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            self.current = Some((package.unique_id().to_string(), progress_bar));
        }

        if let Some((_, progress_bar)) = &self.current {
            progress_bar.set_length(total.max(1));
            progress_bar.inc(1);
            progress_bar.set_message(message.to_string());
        }
    }

    pub(crate) fn finish(mut self) {
        self.finish_current();
        if self.style == OutputStyle::Rich && self.packages > 0 {
            println!(
                "{}",
                render_status_line(
                    self.style,
                    "fetched",
                    &format!(
                        "{} package(s) in {}",
                        self.packages,
                        format_elapsed(self.started_at.elapsed())
                    ),
                )
            );
        }
    }

    fn finish_current(&mut self) {
        if let Some((_, progress_bar)) = self.current.take() {
            progress_bar.finish_and_clear();
        }
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("{status} {message}"),
        OutputStyle::Rich => format!(
            "{} {message}",
            colorize(status_style(status), &format!("{status:>9}"))
        ),
    }
}

pub(crate) fn render_package_line(package: &Package) -> String {
    let mut line = format!("{} {}", package.alias(), package.unique_id());
    if package.indirect {
        line.push_str(" (indirect)");
    }
    if let (true, Some(local_path)) = (package.replaced, &package.local_path) {
        line.push_str(&format!(" => {}", local_path.display()));
    }
    line
}

pub(crate) fn render_get_outcome(style: OutputStyle, outcome: &GetOutcome) -> Vec<String> {
    match outcome.status {
        GetStatus::AlreadyPresent => vec![render_status_line(
            style,
            "unchanged",
            &format!("{} is already required", outcome.package.unique_id()),
        )],
        GetStatus::Added => {
            let mut lines = vec![render_status_line(
                style,
                "added",
                &format!("{} as {}", outcome.package.unique_id(), outcome.package.alias()),
            )];
            lines.extend(
                outcome
                    .added
                    .iter()
                    .filter(|unique_id| *unique_id != outcome.package.unique_id())
                    .map(|unique_id| render_status_line(style, "indirect", unique_id)),
            );
            lines
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn status_style(status: &str) -> Style {
    let color = match status {
        "added" | "fetched" | "unlocked" => AnsiColor::BrightGreen,
        "indirect" => AnsiColor::BrightBlue,
        _ => AnsiColor::BrightYellow,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
