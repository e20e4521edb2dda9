//! Splits normalised Twee source into passages.

#[derive(Debug, Clone, PartialEq)]
pub struct RawPassage {
    pub name: String,
    pub body: String,
    pub start_line: usize,
}

/// Normalise line endings to `\n` and strip a UTF-8 BOM if present.
fn normalise(source: &str) -> String {
    let stripped = source.strip_prefix('\u{feff}').unwrap_or(source);
    stripped.replace("\r\n", "\n").replace('\r', "\n")
}

/// Number of lines in `source` after the same BOM-strip/CRLF-normalisation
/// the preprocessor itself applies, so it agrees with the line numbers
/// passages and tokens are measured against.
pub fn count_lines(source: &str) -> usize {
    normalise(source).split('\n').count()
}

/// Split source text into passages. Everything before the first `::`-line is
/// ignored. A passage body runs up to (but not including) the next
/// `::`-line, stripped of trailing `\n`, `\r` and space characters.
pub fn split_passages(source: &str) -> Vec<RawPassage> {
    let normalised = normalise(source);
    let lines: Vec<&str> = normalised.split('\n').collect();

    let mut passages = Vec::new();
    let mut current: Option<(String, usize, Vec<&str>)> = None;

    for (idx, line) in lines.iter().enumerate() {
        let line_number = idx + 1;
        if line.starts_with("::") {
            if let Some((name, start_line, body_lines)) = current.take() {
                passages.push(finish(name, start_line, body_lines));
            }
            let name = line[2..].trim().to_string();
            current = Some((name, line_number + 1, Vec::new()));
        } else if let Some((_, _, body_lines)) = current.as_mut() {
            body_lines.push(line);
        }
    }

    if let Some((name, start_line, body_lines)) = current.take() {
        passages.push(finish(name, start_line, body_lines));
    }

    passages
}

fn finish(name: String, start_line: usize, body_lines: Vec<&str>) -> RawPassage {
    let joined = body_lines.join("\n");
    let body = joined
        .trim_end_matches(['\n', '\r', ' '])
        .to_string();
    RawPassage { name, body, start_line }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_colon_colon_lines() {
        let src = "ignored\n::Start\nHello<<pause>>\n::Other\nWorld\n";
        let passages = split_passages(src);
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].name, "Start");
        assert_eq!(passages[0].body, "Hello<<pause>>");
        assert_eq!(passages[1].name, "Other");
        assert_eq!(passages[1].body, "World");
    }

    #[test]
    fn trims_trailing_whitespace_and_newlines() {
        let src = "::Start\nHello   \n\n";
        let passages = split_passages(src);
        assert_eq!(passages[0].body, "Hello");
    }

    #[test]
    fn strips_bom_and_normalises_crlf() {
        let src = "\u{feff}::Start\r\nHello\r\n";
        let passages = split_passages(src);
        assert_eq!(passages[0].name, "Start");
        assert_eq!(passages[0].body, "Hello");
    }

    #[test]
    fn empty_passage_body_is_empty_string() {
        let src = "::Start\n::Next\nBody";
        let passages = split_passages(src);
        assert_eq!(passages[0].body, "");
        assert_eq!(passages[1].body, "Body");
    }

    #[test]
    fn start_line_is_first_body_line() {
        let src = "junk\njunk\n::Start\nHello";
        let passages = split_passages(src);
        assert_eq!(passages[0].start_line, 4);
    }

    #[test]
    fn count_lines_matches_normalised_source() {
        assert_eq!(count_lines("a\nb\nc"), 3);
        assert_eq!(count_lines("\u{feff}a\r\nb\r\n"), 3);
    }
}
