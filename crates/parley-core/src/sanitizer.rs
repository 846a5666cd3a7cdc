//! Persona sanitizer: final casing/whitespace pass over the reply text.
//!
//! Only layout and case change. Words are never dropped, reordered or truncated, and
//! `sanitize(sanitize(x)) == sanitize(x)`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaCase {
    /// Upper-case everything (the assistant "speaks" in capitals on screen).
    #[default]
    Upper,
    /// Leave casing untouched.
    Preserve,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputSanitizer {
    case: PersonaCase,
}

impl OutputSanitizer {
    pub fn new(case: PersonaCase) -> Self {
        Self { case }
    }

    pub fn sanitize(&self, text: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        for line in text.lines() {
            let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            let previous_blank = lines.last().map(|l| l.is_empty()).unwrap_or(true);
            if collapsed.is_empty() && previous_blank {
                continue;
            }
            lines.push(collapsed);
        }
        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        let joined = lines.join("\n");
        match self.case {
            PersonaCase::Upper => joined.to_uppercase(),
            PersonaCase::Preserve => joined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_uppercases() {
        let s = OutputSanitizer::new(PersonaCase::Upper);
        assert_eq!(s.sanitize("  the   answer\tis 4  "), "THE ANSWER IS 4");
    }

    #[test]
    fn keeps_single_blank_line_between_paragraphs() {
        let s = OutputSanitizer::new(PersonaCase::Preserve);
        assert_eq!(s.sanitize("\n\nOne.\n\n\n\nTwo.\n\n"), "One.\n\nTwo.");
    }

    #[test]
    fn preserve_leaves_case() {
        let s = OutputSanitizer::new(PersonaCase::Preserve);
        assert_eq!(s.sanitize("Hello World"), "Hello World");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "",
            "   ",
            "plain",
            "  Mixed   Case \n\n\n second\tline ",
            "straße and ﬁ ligature",
            "emoji 🙂  spacing\r\nwindows line",
            "{\"json\": true}",
        ];
        for case in [PersonaCase::Upper, PersonaCase::Preserve] {
            let s = OutputSanitizer::new(case);
            for x in samples {
                let once = s.sanitize(x);
                assert_eq!(s.sanitize(&once), once, "input {:?}", x);
            }
        }
    }

    #[test]
    fn content_is_preserved() {
        let s = OutputSanitizer::new(PersonaCase::Upper);
        let out = s.sanitize("one two three four five");
        assert_eq!(out.split_whitespace().count(), 5);
    }
}
