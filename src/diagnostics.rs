//! Optional colourised rendering of [`ParseError`]/[`VmError`] for a host's
//! terminal or log sink. Never called by the VM itself — a host that wants
//! plain text just uses `Display` directly.

use colored::Colorize;

use crate::error::{ParseError, VmError};
use crate::program::Program;

/// Render a parse error as a two-line terminal diagnostic: a coloured label
/// plus a source-position caret line.
pub fn render_parse_error(err: &ParseError) -> String {
    format!(
        "{label} {passage}:{line}:{column}\n  {bar} {message}",
        label = "parse error:".red().bold(),
        passage = err.passage.cyan(),
        line = err.line,
        column = err.column,
        bar = "|".dimmed(),
        message = err.code.to_string(),
    )
}

/// Render a fatal VM error as a single coloured line.
pub fn render_vm_error(err: &VmError) -> String {
    format!("{} {}", "fatal:".red().bold(), err)
}

/// Render a one-line load summary for a successfully parsed [`Program`] —
/// passage count plus the source's line count, which `Program` otherwise
/// only carries for the JSON cache.
pub fn render_load_summary(program: &Program) -> String {
    format!(
        "{label} {passages} passage(s), {lines} source line(s)",
        label = "loaded:".green().bold(),
        passages = program.passages.len(),
        lines = program.line_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorCode;

    #[test]
    fn parse_error_rendering_mentions_passage_and_position() {
        let err = ParseError::new(
            "Start",
            3,
            7,
            ParseErrorCode::UnknownCommand("bogus".to_string()),
        );
        let rendered = render_parse_error(&err);
        assert!(rendered.contains("Start:3:7"));
        assert!(rendered.contains("bogus"));
    }

    #[test]
    fn vm_error_rendering_includes_message() {
        let rendered = render_vm_error(&VmError::UnknownJumpTarget("Nowhere".to_string()));
        assert!(rendered.contains("Nowhere"));
    }

    #[test]
    fn load_summary_reports_passage_and_line_counts() {
        use crate::program::Program;
        let program = Program::parse("::Start\nHello\nWorld\n").unwrap();
        let rendered = render_load_summary(&program);
        assert!(rendered.contains('1'));
        assert!(rendered.contains('3'));
    }
}
