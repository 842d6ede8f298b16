//! Keystroke planning: which keys to press for one character, including the
//! occasional simulated slip and its correction.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use relay_core::HidKeyCode;

use super::TypingConfig;

const KEYBOARD_ROWS: [&str; 4] = ["qwertyuiop", "asdfghjkl", "zxcvbnm", "1234567890"];
const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];
const COMMON_LETTERS: &[char] = &['e', 's', 't', 'n', 'r', 'i', 'o', 'l', 'a'];

/// One step of a character's keystroke plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Type a character as text.
    Type(char),
    /// Press and release a key.
    Tap(HidKeyCode),
    /// Wait before the next step.
    Pause(Duration),
}

/// Returns a key next to `c` on its keyboard row, keeping `c`'s case.
///
/// Characters on no row get a random vowel.
pub fn nearby_char<R: Rng + ?Sized>(c: char, rng: &mut R) -> char {
    let lower = c.to_ascii_lowercase();
    for row in KEYBOARD_ROWS {
        let keys: Vec<char> = row.chars().collect();
        if let Some(idx) = keys.iter().position(|&k| k == lower) {
            let mut neighbours = Vec::with_capacity(2);
            if idx > 0 {
                neighbours.push(keys[idx - 1]);
            }
            if idx + 1 < keys.len() {
                neighbours.push(keys[idx + 1]);
            }
            if let Some(&chosen) = neighbours.choose(rng) {
                return if c.is_uppercase() {
                    chosen.to_ascii_uppercase()
                } else {
                    chosen
                };
            }
        }
    }
    VOWELS.choose(rng).copied().unwrap_or('e')
}

/// Plans the keystrokes for one character.
///
/// With probability `mistake_probability`, an alphanumeric character is
/// typed with a slip that is then corrected: either a neighbouring key
/// instead of the right one, or the right key followed by an extra one. The
/// visible result is always exactly `c`.
pub fn plan_char<R: Rng + ?Sized>(c: char, config: &TypingConfig, rng: &mut R) -> Vec<Step> {
    let slip = rng.gen::<f64>() < config.mistake_probability;
    if slip && c.is_alphanumeric() && c != ' ' {
        if rng.gen_bool(0.5) {
            let wrong = nearby_char(c, rng);
            if wrong != c {
                return vec![
                    Step::Type(wrong),
                    Step::Pause(config.backspace_pause.sample(rng)),
                    Step::Tap(HidKeyCode::Backspace),
                    Step::Pause(config.correction_pause.sample(rng)),
                    Step::Type(c),
                ];
            }
        } else {
            let mut extra = nearby_char(c, rng);
            if extra == c && c.is_alphabetic() {
                extra = COMMON_LETTERS.choose(rng).copied().unwrap_or('e');
            }
            return vec![
                Step::Type(c),
                Step::Pause(config.insertion_pause.sample(rng)),
                Step::Type(extra),
                Step::Pause(config.backspace_pause.sample(rng)),
                Step::Tap(HidKeyCode::Backspace),
                Step::Pause(config.correction_pause.sample(rng)),
            ];
        }
    }

    match c {
        '\n' => vec![Step::Tap(HidKeyCode::Enter)],
        '\t' => vec![Step::Tap(HidKeyCode::Tab)],
        other => vec![Step::Type(other)],
    }
}

/// Delay after a character: `base_interval ± interval_variation`, floored at
/// `min_interval`.
pub fn next_interval<R: Rng + ?Sized>(config: &TypingConfig, rng: &mut R) -> Duration {
    let base = config.base_interval.as_secs_f64();
    let variation = config.interval_variation.as_secs_f64();
    let jitter = if variation > 0.0 {
        rng.gen_range(-variation..=variation)
    } else {
        0.0
    };
    Duration::from_secs_f64((base + jitter).max(0.0)).max(config.min_interval)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
