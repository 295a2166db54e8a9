//! Normalization of raw model output into a complete tutor card
//!
//! Generative endpoints return prose, fenced JSON, JSON wrapped in prose,
//! heading-delimited text, or fragments cut off mid-token. This module maps
//! all of it onto the fixed [`TutorCard`] shape through a chain of recovery
//! strategies, tried in order of decreasing structure:
//!
//! 1. The whole payload parses as a card
//! 2. A balanced `{...}` object embedded in the text parses as a card
//! 3. Heading-delimited sections ("Simple explanation:", "Key commands:", ...)
//! 4. The raw text becomes the simple explanation
//!
//! The chain is total: [`normalize`] never fails, never panics, and always
//! returns a card with every field present.

use crate::card::TutorCard;

/// Minimum explanation length before an extracted JSON fragment is trusted.
/// Shorter fragments are usually truncated or boilerplate objects.
const MIN_EXPLANATION_LEN: usize = 40;

/// Convert raw model output into a complete tutor card.
///
/// This is a pure function: no I/O, no shared state, no failure path.
/// Whatever the upstream produced, the result has all six fields, with
/// markdown heading and code-fence markers stripped from text fields and
/// list fields split into trimmed items.
///
/// # Example
///
/// ```
/// use netprep_tutor::normalize;
///
/// let card = normalize("Simple explanation:\nOSPF is a link-state protocol.");
/// assert_eq!(card.simple_explanation, "OSPF is a link-state protocol.");
/// assert!(card.key_commands.is_empty());
/// ```
pub fn normalize(raw: &str) -> TutorCard {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return TutorCard::default();
    }

    // 1. The whole payload is already a card, possibly inside a code fence.
    let unfenced = strip_code_fences(trimmed);
    if let Ok(card) = serde_json::from_str::<TutorCard>(unfenced.trim()) {
        // Upstream sometimes serializes the real card into one of its own
        // string fields. Recover the inner object before trusting the outer.
        if card.simple_explanation.is_empty() {
            if let Some(inner) = extract_embedded_card(&card.title)
                .or_else(|| extract_embedded_card(&card.real_world_example))
            {
                return clean_card(inner);
            }
        }
        if !card.is_empty() {
            return clean_card(card);
        }
    }

    // 2. A card object buried in prose.
    if let Some(card) = extract_embedded_card(trimmed) {
        return clean_card(card);
    }

    // 3. Heading-delimited plain text.
    if let Some(card) = parse_sections(trimmed) {
        return clean_card(card);
    }

    // 4. Nothing structured: echo the text as the explanation.
    clean_card(TutorCard {
        simple_explanation: trimmed.to_string(),
        ..TutorCard::default()
    })
}

/// Scan `text` for balanced `{...}` objects and return the first one that
/// parses as a card substantial enough to trust: an explanation of at least
/// [`MIN_EXPLANATION_LEN`] characters plus one other non-empty field.
fn extract_embedded_card(text: &str) -> Option<TutorCard> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find('{') {
        let start = search_from + rel;
        let Some(len) = balanced_object_len(&text[start..]) else {
            // This opener never closes; a later one still can.
            search_from = start + 1;
            continue;
        };

        let candidate = &text[start..start + len];
        if let Ok(card) = serde_json::from_str::<TutorCard>(candidate) {
            if card.simple_explanation.trim().len() >= MIN_EXPLANATION_LEN
                && card.has_structure_beyond_explanation()
            {
                return Some(card);
            }
        }

        // Step past the opening brace only, so objects nested inside a
        // rejected wrapper still get their turn.
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced `{...}` object at the start of `text`.
/// Tracks JSON string boundaries so braces inside string values and
/// escaped quotes do not confuse the depth count.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Field a heading line can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Explanation,
    Example,
    Commands,
    Mistakes,
    QuickCheck,
}

/// Recognized heading labels, longest-ish first so "real-world example"
/// is never shadowed by a shorter prefix.
const LABELS: &[(&str, Section)] = &[
    ("simple explanation", Section::Explanation),
    ("real-world example", Section::Example),
    ("real world example", Section::Example),
    ("key commands", Section::Commands),
    ("common mistakes", Section::Mistakes),
    ("quick check", Section::QuickCheck),
    ("title", Section::Title),
];

/// Match a line against the known labels, tolerating markdown prefixes
/// (`#`, `*`, `-`, `>`) and bold markers. Returns the section plus any
/// content that followed the colon on the same line.
fn match_label(line: &str) -> Option<(Section, &str)> {
    let stripped =
        line.trim_start_matches(|c: char| matches!(c, '#' | '*' | '-' | '>' | ' ' | '\t'));

    for (label, section) in LABELS {
        let Some(head) = stripped.get(..label.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(label) {
            continue;
        }

        let rest = stripped[label.len()..].trim_start_matches('*').trim_start();
        if let Some(tail) = rest.strip_prefix(':') {
            return Some((*section, tail.trim_start_matches('*').trim()));
        }
        // A bare heading line such as "## Key commands".
        if rest.is_empty() {
            return Some((*section, ""));
        }
    }
    None
}

/// Parse heading-delimited text into a card. Each recognized label owns
/// everything up to the next label or the end of the text; chatter before
/// the first label is dropped. Returns `None` when no label is present.
fn parse_sections(text: &str) -> Option<TutorCard> {
    let mut sections: Vec<(Section, String)> = Vec::new();
    let mut current: Option<(Section, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some((section, inline)) = match_label(line) {
            if let Some((sec, lines)) = current.take() {
                sections.push((sec, lines.join("\n")));
            }
            let mut lines = Vec::new();
            if !inline.is_empty() {
                lines.push(inline);
            }
            current = Some((section, lines));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    if let Some((sec, lines)) = current.take() {
        sections.push((sec, lines.join("\n")));
    }

    if sections.is_empty() {
        return None;
    }

    let mut card = TutorCard::default();
    for (section, content) in sections {
        match section {
            Section::Title => card.title = content,
            Section::Explanation => card.simple_explanation = content,
            Section::Example => card.real_world_example = content,
            Section::Commands => card.key_commands = vec![content],
            Section::Mistakes => card.common_mistakes = vec![content],
            Section::QuickCheck => card.quick_check = vec![content],
        }
    }
    Some(card)
}

/// Apply the final cleanup pass to every field: markdown stripping on text,
/// item splitting on lists, whitespace trimming everywhere.
fn clean_card(card: TutorCard) -> TutorCard {
    TutorCard {
        title: clean_text(&card.title).trim_matches('*').trim().to_string(),
        simple_explanation: clean_text(&card.simple_explanation),
        real_world_example: clean_text(&card.real_world_example),
        key_commands: clean_list(card.key_commands),
        common_mistakes: clean_list(card.common_mistakes),
        quick_check: clean_list(card.quick_check),
    }
}

/// Strip heading markers and code-fence lines from a text field while
/// preserving its line structure.
fn clean_text(text: &str) -> String {
    let cleaned: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(strip_heading)
        .map(str::trim_end)
        .collect();
    cleaned.join("\n").trim().to_string()
}

/// Remove a leading markdown heading marker (`#` through `######`).
fn strip_heading(line: &str) -> &str {
    let l = line.trim_start();
    let rest = l.trim_start_matches('#');
    let hashes = l.len() - rest.len();
    if (1..=6).contains(&hashes) && (rest.is_empty() || rest.starts_with(' ')) {
        rest.trim_start()
    } else {
        l
    }
}

/// Split list entries on newlines and bullet markers into trimmed,
/// non-empty items.
fn clean_list(entries: Vec<String>) -> Vec<String> {
    entries
        .iter()
        .flat_map(|entry| entry.lines())
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(strip_bullet)
        .map(|item| item.trim().trim_matches('`').trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

/// Remove a leading bullet or enumeration marker from a list line.
fn strip_bullet(line: &str) -> &str {
    let l = line.trim_start();

    for marker in ['-', '*', '•'] {
        if let Some(rest) = l.strip_prefix(marker) {
            return rest.trim_start();
        }
    }

    // "1. item" and "2) item" enumerations.
    let digits = l.len() - l.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &l[digits..];
        if let Some(r) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return r.trim_start();
        }
    }

    l
}

/// Drop code-fence lines, keeping the fenced content itself.
fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}
