//! Speaking-time estimate for clue prompts.
//!
//! The buzzer stays locked while the host reads the prompt aloud; the unlock
//! delay is a deterministic function of the text so every deployment behaves
//! identically. Roughly four syllables per second, bounded so degenerate
//! prompts still give players a moment and walls of text do not stall play.

const MS_PER_SYLLABLE: u64 = 250;
const MIN_READING_MS: u64 = 2_000;
const MAX_READING_MS: u64 = 10_000;

/// Estimate how long the prompt takes to read aloud, in milliseconds.
///
/// A leading parenthesised aside (stage directions for the host) is not read
/// to players and is stripped. Underscore runs render as the spoken word
/// "blank".
#[must_use]
pub fn speaking_time_ms(prompt: &str) -> u64 {
    let text = strip_leading_aside(prompt);
    let text = spell_out_blanks(text);
    let syllables: u64 = text
        .split_whitespace()
        .map(|word| estimate_syllables(word) as u64)
        .sum();
    (syllables * MS_PER_SYLLABLE).clamp(MIN_READING_MS, MAX_READING_MS)
}

fn strip_leading_aside(text: &str) -> &str {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix('(') {
        if let Some(close) = rest.find(')') {
            return &rest[close + 1..];
        }
    }
    trimmed
}

fn spell_out_blanks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_blank = false;
    for ch in text.chars() {
        if ch == '_' {
            if !in_blank {
                out.push_str(" blank ");
                in_blank = true;
            }
        } else {
            in_blank = false;
            out.push(ch);
        }
    }
    out
}

/// Conservative per-word syllable count: short words read as one beat,
/// longer words count vowel groups with a trailing silent `e` stripped.
fn estimate_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 0;
    }
    if letters.len() <= 3 {
        return 1;
    }

    let trimmed = match letters.as_slice() {
        [head @ .., 'e'] => head,
        all => all,
    };

    let mut groups = 0usize;
    let mut in_group = false;
    for &c in trimmed {
        let is_vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if is_vowel && !in_group {
            groups += 1;
        }
        in_group = is_vowel;
    }
    groups.max(1)
}
