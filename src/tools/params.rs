// src/tools/params.rs

//! Typed arguments derived from a step's intended-action text.

use crate::error::CapabilityError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// A named alternative for choice capabilities. Aliases may be several words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alternative {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl Alternative {
    fn words(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

/// What argument a capability accepts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamKind {
    None,
    Flag,
    Choice(&'static [Alternative]),
    Seconds { default: f64 },
    Count { default: u32 },
}

impl ParamKind {
    pub fn hint(&self) -> String {
        match self {
            ParamKind::None => String::new(),
            ParamKind::Flag => "ON or OFF".into(),
            ParamKind::Choice(alts) => alts.iter().map(|a| a.name).collect::<Vec<_>>().join(" or "),
            ParamKind::Seconds { default } => format!("duration in seconds, default {default}"),
            ParamKind::Count { default } => format!("count, default {default}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Param {
    Flag(bool),
    Choice(&'static str),
    /// The text asked to flip the current state.
    Toggle,
    Seconds(f64),
    Count(u32),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Flag(true) => f.write_str("ON"),
            Param::Flag(false) => f.write_str("OFF"),
            Param::Choice(name) => f.write_str(name),
            Param::Toggle => f.write_str("toggle"),
            Param::Seconds(s) => write!(f, "{s}s"),
            Param::Count(n) => write!(f, "{n}"),
        }
    }
}

const ON_WORDS: &[&str] = &["on", "enable", "enabled", "true", "activate", "activated"];
const OFF_WORDS: &[&str] = &["off", "disable", "disabled", "false", "deactivate", "deactivated"];
const TOGGLE_WORDS: &[&str] = &["toggle", "switch", "flip", "change"];
const DIRECTION_WORDS: &[&str] = &["to", "into"];
const ARTICLES: &[&str] = &["the", "a", "an"];

static SECONDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(s|sec|secs|second|seconds|m|min|mins|minute|minutes)\b")
        .expect("valid seconds regex")
});
static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:photo|photos|picture|pictures|shot|shots|times?)\b")
        .expect("valid count regex")
});
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)([A-Za-z]*)").expect("valid number regex"));
static CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:[,;]|\bthen\b|\band\b|\balso\b)\s*").expect("valid clause regex")
});

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect()
}

/// Derive the argument for `kind`.
///
/// Flags and choices are read from the intended action. When it states
/// nothing, they are read from the clauses of `command` that mention one of
/// `keywords`. A flip is only produced when the text asks for one. Durations
/// and counts fall back to the whole command. `Ok(None)` means "not stated".
pub fn resolve(
    kind: ParamKind,
    keywords: &[&str],
    intended_action: &str,
    command: &str,
) -> Result<Option<Param>, CapabilityError> {
    match kind {
        ParamKind::None => Ok(None),
        ParamKind::Flag | ParamKind::Choice(_) => Ok(resolve_state(kind, keywords, intended_action, command)),
        ParamKind::Seconds { .. } => Ok(parse_seconds(intended_action)
            .or_else(|| first_number(intended_action).and_then(|n| n.parse().ok()))
            .or_else(|| parse_seconds(command))
            .filter(|s| *s > 0.0)
            .map(Param::Seconds)),
        ParamKind::Count { .. } => {
            let stated = parse_count(intended_action)
                .or_else(|| first_number(intended_action))
                .or_else(|| parse_count(command));
            match stated {
                Some(text) => Ok(Some(to_count(text)?).filter(|n| *n > 0).map(Param::Count)),
                None => Ok(None),
            }
        }
    }
}

fn resolve_state(kind: ParamKind, keywords: &[&str], intended_action: &str, command: &str) -> Option<Param> {
    if let Some(param) = stated_state(kind, intended_action) {
        return Some(param);
    }
    if asks_toggle(intended_action) {
        return Some(Param::Toggle);
    }

    let clauses = subject_clauses(command, keywords);
    if let Some(param) = clauses.iter().rev().find_map(|c| stated_state(kind, c)) {
        return Some(param);
    }
    clauses.iter().any(|c| asks_toggle(c)).then_some(Param::Toggle)
}

fn stated_state(kind: ParamKind, text: &str) -> Option<Param> {
    match kind {
        ParamKind::Flag => parse_flag(text).map(Param::Flag),
        ParamKind::Choice(alts) => parse_choice(alts, text).map(Param::Choice),
        _ => None,
    }
}

fn asks_toggle(text: &str) -> bool {
    words(text).iter().any(|w| TOGGLE_WORDS.contains(&w.as_str()))
}

/// Clauses of `command` that mention any of `keywords`.
pub fn subject_clauses<'a>(command: &'a str, keywords: &[&str]) -> Vec<&'a str> {
    if keywords.is_empty() {
        return Vec::new();
    }
    CLAUSE
        .split(command)
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .filter(|clause| words(clause).iter().any(|w| keywords.contains(&w.as_str())))
        .collect()
}

/// Last ON/OFF word wins.
pub fn parse_flag(text: &str) -> Option<bool> {
    words(text).iter().rev().find_map(|w| {
        if ON_WORDS.contains(&w.as_str()) {
            Some(true)
        } else if OFF_WORDS.contains(&w.as_str()) {
            Some(false)
        } else {
            None
        }
    })
}

/// The alternative named right after "to"/"into", else the one mentioned
/// last. At each position the longest matching phrase is taken.
pub fn parse_choice(alts: &'static [Alternative], text: &str) -> Option<&'static str> {
    let tokens = words(text);
    let mut mentions = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let longest = alts
            .iter()
            .flat_map(|alt| alt.words().map(move |phrase| (alt.name, words(phrase))))
            .filter(|(_, phrase)| !phrase.is_empty() && tokens[i..].starts_with(phrase))
            .max_by_key(|(_, phrase)| phrase.len());
        match longest {
            Some((name, phrase)) => {
                mentions.push((i, name));
                i += phrase.len();
            }
            None => i += 1,
        }
    }

    mentions
        .iter()
        .rev()
        .find(|(start, _)| follows_direction(&tokens, *start))
        .or(mentions.last())
        .map(|(_, name)| *name)
}

fn follows_direction(tokens: &[String], start: usize) -> bool {
    tokens[..start]
        .iter()
        .rev()
        .find(|t| !ARTICLES.contains(&t.as_str()))
        .is_some_and(|t| DIRECTION_WORDS.contains(&t.as_str()))
}

fn parse_seconds(text: &str) -> Option<f64> {
    let caps = SECONDS.captures(text)?;
    let value: f64 = caps[1].parse().ok()?;
    let unit = caps[2].to_ascii_lowercase();
    Some(if unit.starts_with('m') { value * 60.0 } else { value })
}

/// Digits of the first "N photos"-style mention; repeat counts are skipped.
fn parse_count(text: &str) -> Option<&str> {
    COUNT
        .captures_iter(text)
        .filter(|c| !c[0].to_ascii_lowercase().contains("time"))
        .find_map(|c| c.get(1).map(|m| m.as_str()))
}

/// First bare number; "1080p" or "30fps" are labels, not numbers.
fn first_number(text: &str) -> Option<&str> {
    NUMBER
        .captures_iter(text)
        .find(|c| c[2].is_empty())
        .and_then(|c| c.get(1).map(|m| m.as_str()))
}

fn to_count(text: &str) -> Result<u32, CapabilityError> {
    if text.contains('.') {
        return Err(CapabilityError::InvalidArgument(format!(
            "count must be a whole number, got {text}"
        )));
    }
    text.parse()
        .map_err(|_| CapabilityError::InvalidArgument(format!("count out of range: {text}")))
}
