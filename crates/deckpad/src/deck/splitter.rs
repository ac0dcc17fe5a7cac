/// A slide as it appears in the source, before frontmatter parsing and
/// markdown compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSlide {
    /// YAML between the two separators, if the slide has a frontmatter block.
    pub frontmatter: Option<String>,
    /// 1-based line of the first frontmatter line (or of the body when there
    /// is no frontmatter). Used for error reporting.
    pub line: usize,
    pub body: String,
}

/// Split deck source into raw slides.
///
/// A line made only of three or more dashes separates slides. When such a
/// separator is directly followed by a `key:` line and another separator
/// closes the block, the lines in between are that slide's frontmatter.
/// Separators inside fenced code blocks are ignored. Units with neither
/// frontmatter nor body text are dropped.
pub fn split(source: &str) -> Vec<RawSlide> {
    let source = source.replace("\r\n", "\n");
    let lines: Vec<&str> = source.split('\n').collect();
    let separators = separator_lines(&lines);

    let mut slides = Vec::new();
    let mut current = Unit::starting_at(0);
    let mut i = 0;
    while i < lines.len() {
        if separators.contains(&i) {
            current.finish(&lines, i, &mut slides);
            if let Some(close) = frontmatter_close(&lines, &separators, i) {
                current = Unit {
                    frontmatter: Some((i + 1, close)),
                    body_start: close + 1,
                };
                i = close + 1;
            } else {
                current = Unit::starting_at(i + 1);
                i += 1;
            }
            continue;
        }
        i += 1;
    }
    current.finish(&lines, lines.len(), &mut slides);

    slides
}

/// Line range bookkeeping for the slide being collected.
struct Unit {
    /// `(first_line, closing_separator)` of the frontmatter block.
    frontmatter: Option<(usize, usize)>,
    body_start: usize,
}

impl Unit {
    fn starting_at(line: usize) -> Self {
        Self {
            frontmatter: None,
            body_start: line,
        }
    }

    fn finish(&self, lines: &[&str], end: usize, slides: &mut Vec<RawSlide>) {
        let body_lines = lines.get(self.body_start..end).unwrap_or(&[]);
        let body = trim_blank_lines(body_lines);
        let frontmatter = self
            .frontmatter
            .map(|(start, close)| lines[start..close].join("\n"));

        if frontmatter.is_none() && body.is_empty() {
            return;
        }

        let line = match self.frontmatter {
            Some((start, _)) => start + 1,
            None => first_content_line(body_lines, self.body_start) + 1,
        };

        slides.push(RawSlide {
            frontmatter,
            line,
            body,
        });
    }
}

/// Indexes of separator lines that sit outside fenced code blocks.
fn separator_lines(lines: &[&str]) -> Vec<usize> {
    let mut found = Vec::new();
    let mut in_code_fence = false;
    let mut fence_char = '`';
    let mut fence_len = 0;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if in_code_fence {
            let closing_count = trimmed.chars().take_while(|&c| c == fence_char).count();
            if closing_count >= fence_len
                && trimmed
                    .chars()
                    .skip(closing_count)
                    .all(|c| c.is_whitespace())
            {
                in_code_fence = false;
            }
            continue;
        }

        if let Some(c) = trimmed.chars().next().filter(|c| *c == '`' || *c == '~') {
            let count = trimmed.chars().take_while(|&ch| ch == c).count();
            if count >= 3 {
                in_code_fence = true;
                fence_char = c;
                fence_len = count;
                continue;
            }
        }

        if is_separator(line) {
            found.push(i);
        }
    }

    found
}

/// If the separator at `open` starts a frontmatter block, return the index of
/// the separator that closes it.
fn frontmatter_close(lines: &[&str], separators: &[usize], open: usize) -> Option<usize> {
    let first = lines.get(open + 1)?;
    if !is_yaml_key_line(first) {
        return None;
    }
    separators.iter().copied().find(|&s| s > open)
}

pub(crate) fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

/// `title: Intro`, `data:`, `global-class: x`. A markdown heading (`# A`) or
/// plain prose does not qualify.
fn is_yaml_key_line(line: &str) -> bool {
    let Some(colon) = line.find(':') else {
        return false;
    };
    let key = &line[..colon];
    let rest = &line[colon + 1..];
    !key.is_empty()
        && key
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && (rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t'))
}

fn trim_blank_lines(lines: &[&str]) -> String {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    lines[start..end.max(start)].join("\n")
}

fn first_content_line(lines: &[&str], offset: usize) -> usize {
    offset
        + lines
            .iter()
            .position(|l| !l.trim().is_empty())
            .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_separators() {
        let slides = split("# A\n---\n# B\n---\n# C");
        assert_eq!(slides.len(), 3);
        assert_eq!(slides[0].body, "# A");
        assert_eq!(slides[1].body, "# B");
        assert_eq!(slides[2].body, "# C");
        assert!(slides.iter().all(|s| s.frontmatter.is_none()));
    }

    #[test]
    fn test_frontmatter_block() {
        let slides = split("# Intro\n\n---\ntitle: Second\nclass: dark\n---\n\n# Two");
        assert_eq!(slides.len(), 2);
        assert_eq!(
            slides[1].frontmatter.as_deref(),
            Some("title: Second\nclass: dark")
        );
        assert_eq!(slides[1].body, "# Two");
        assert_eq!(slides[1].line, 4);
    }

    #[test]
    fn test_leading_headmatter() {
        let slides = split("---\ntitle: Cover\n---\n# Welcome\n---\n# Next");
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].frontmatter.as_deref(), Some("title: Cover"));
        assert_eq!(slides[0].body, "# Welcome");
        assert_eq!(slides[1].body, "# Next");
    }

    #[test]
    fn test_leading_plain_separator_adds_no_slide() {
        let slides = split("---\n# Only\n");
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].body, "# Only");
    }

    #[test]
    fn test_frontmatter_only_slide_is_kept() {
        let slides = split("# A\n---\ntitle: Empty\n---\n");
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].body, "");
    }

    #[test]
    fn test_blank_units_are_dropped() {
        let slides = split("# A\n---\n\n---\n# B\n---\n");
        assert_eq!(slides.len(), 2);
    }

    #[test]
    fn test_separator_in_code_fence_ignored() {
        let body = "# Code\n\n```yaml\n---\nkey: value\n---\n```\n---\n# After";
        let slides = split(body);
        assert_eq!(slides.len(), 2, "dashes inside a fence must not split");
        assert!(slides[0].body.contains("key: value"));
    }

    #[test]
    fn test_tilde_fence() {
        let slides = split("~~~\n---\n~~~\n---\nnext");
        assert_eq!(slides.len(), 2);
    }

    #[test]
    fn test_heading_after_separator_is_not_frontmatter() {
        let slides = split("one\n---\n# heading: with colon\n---\nthree");
        assert_eq!(slides.len(), 3);
        assert!(slides[1].frontmatter.is_none());
    }

    #[test]
    fn test_crlf_normalized() {
        let slides = split("# A\r\n---\r\ntitle: B\r\n---\r\nbody");
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].frontmatter.as_deref(), Some("title: B"));
        assert_eq!(slides[1].body, "body");
    }

    #[test]
    fn test_longer_dash_runs_separate() {
        let slides = split("a\n-----\nb");
        assert_eq!(slides.len(), 2);
    }

    #[test]
    fn test_key_line_detection() {
        assert!(is_yaml_key_line("title: Hello"));
        assert!(is_yaml_key_line("data:"));
        assert!(is_yaml_key_line("global-class: x"));
        assert!(!is_yaml_key_line("# A"));
        assert!(!is_yaml_key_line("Hello world"));
        assert!(!is_yaml_key_line("http://example.com"));
        assert!(!is_yaml_key_line(""));
    }
}
