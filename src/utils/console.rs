// src/utils/console.rs

//! Terminal layout for change reports and run summaries.
//!
//! Reports are written to stdout rather than through the `log` facade so
//! they stay readable when `RUST_LOG` filters library diagnostics. Anything
//! below warning tone is muted once the log level drops under `info`.

use std::io::{self, Stdout, Write};

const HEADER_WIDTH: usize = 60;
const RULE_WIDTH: usize = 40;
const INDENT: &str = "    ";

/// How a status line is marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Success,
    Warning,
}

impl Tone {
    fn marker(self) -> &'static str {
        match self {
            Tone::Plain => "",
            Tone::Success => "✓ ",
            Tone::Warning => "! ",
        }
    }
}

/// Writes the sectioned report layout to any sink.
pub struct Printer<W: Write> {
    out: W,
    muted: bool,
}

impl Printer<Stdout> {
    /// Printer on stdout, muted when logging is quieter than `info`.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), log::max_level() < log::LevelFilter::Info)
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, muted: bool) -> Self {
        Self { out, muted }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, indent: &str, tone: Tone, text: &str) {
        if self.muted && tone != Tone::Warning {
            return;
        }
        // Write errors are ignored.
        let _ = writeln!(self.out, "{}{}{}", indent, tone.marker(), text);
    }

    pub fn status(&mut self, tone: Tone, message: &str) {
        self.line("", tone, message);
    }

    pub fn info(&mut self, message: &str) {
        self.status(Tone::Plain, message);
    }

    pub fn success(&mut self, message: &str) {
        self.status(Tone::Success, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.status(Tone::Warning, message);
    }

    /// Boxed title opening a run.
    pub fn header(&mut self, title: &str) {
        let border = "═".repeat(HEADER_WIDTH);
        self.info(&border);
        self.info(&format!("  {}", title));
        self.info(&border);
    }

    /// Bracketed section title, e.g. `[Changed Values]`.
    pub fn section(&mut self, title: &str) {
        self.info(&format!("[{}]", title));
    }

    /// Indented entry under a section.
    pub fn item(&mut self, message: &str) {
        self.line(INDENT, Tone::Plain, message);
    }

    /// `LABEL: value` detail below an item.
    pub fn field(&mut self, label: &str, value: &str) {
        self.info(&format!("{}  {}: {}", INDENT, label, value));
    }

    pub fn rule(&mut self) {
        self.info(&"─".repeat(RULE_WIDTH));
    }

    /// Key/value block closing a run, followed by flagged notes.
    pub fn summary(&mut self, title: &str, items: &[(&str, String)], notes: &[(Tone, String)]) {
        self.info("");
        self.info(&format!("[SUMMARY] {}", title));
        for (key, value) in items {
            self.item(&format!("{}: {}", key, value));
        }
        for (tone, note) in notes {
            self.line(INDENT, *tone, note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(muted: bool, draw: impl FnOnce(&mut Printer<Vec<u8>>)) -> String {
        let mut printer = Printer::new(Vec::new(), muted);
        draw(&mut printer);
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn test_section_layout() {
        let out = render(false, |p| {
            p.section("Changed Values");
            p.item("path: root['a']");
            p.field("OLD", "1");
            p.success("done");
        });
        assert_eq!(
            out,
            "[Changed Values]\n    path: root['a']\n      OLD: 1\n✓ done\n"
        );
    }

    #[test]
    fn test_summary_marks_notes() {
        let out = render(false, |p| {
            p.summary(
                "Run complete",
                &[("Changed courses", "2".to_string())],
                &[(Tone::Warning, "[comparison-failed] course 7: timeout".to_string())],
            );
        });
        assert_eq!(
            out,
            "\n[SUMMARY] Run complete\n    Changed courses: 2\n    ! [comparison-failed] course 7: timeout\n"
        );
    }

    #[test]
    fn test_muted_printer_keeps_warnings() {
        let out = render(true, |p| {
            p.header("Course Monitor");
            p.info("Checking notifications...");
            p.warn("watch list is empty");
        });
        assert_eq!(out, "! watch list is empty\n");
    }
}
