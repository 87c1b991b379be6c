use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::remote::CounterPair;
use crate::vocab::Vocabulary;

/// A `word(-word)*=` token at the start of a line or after whitespace.
static KEY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)([A-Za-z0-9][\w.]*(?:-[\w.]+)*)=").expect("valid key token pattern")
});

/// Same token, anchored: used to find where a value ends.
static KEY_AT_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][\w.]*(?:-[\w.]+)*=").expect("valid key prefix pattern")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("valid number pattern"));

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid integer pattern"));

/// RouterOS-style prompts: `[admin@MikroTik] >` or `[admin@MikroTik] /interface>`.
static PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]*\]\s*[>/]").expect("valid prompt pattern"));

/// Extracts typed values from unstructured CLI responses.
///
/// Every method is total: a missing key, an unparseable value or an empty
/// response all yield `None` rather than an error.
#[derive(Debug, Clone, Default)]
pub struct TelemetryParser {
    vocab: Vocabulary,
}

impl TelemetryParser {
    pub fn new(vocab: Vocabulary) -> Self {
        Self { vocab }
    }

    /// Find `key` (as `key:` or `key=`) and return the first signed decimal
    /// number in its value, after unit suffixes have been stripped.
    pub fn parse_numeric(&self, text: &str, key: &str) -> Option<f64> {
        self.lines(text)
            .filter_map(|line| locate_value(line, key))
            .find_map(|value| self.numeric_value(value_extent(value)))
    }

    /// Find `key` and return its value, stopping at the next `key=` token on
    /// the same line. Quoted values are returned without their quotes.
    pub fn parse_string(&self, text: &str, key: &str) -> Option<String> {
        self.lines(text)
            .filter_map(|line| locate_value(line, key))
            .map(|value| unquote(value_extent(value)))
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Read a number out of an already-isolated value such as `-75dBm@6Mbps`.
    pub fn numeric_value(&self, value: &str) -> Option<f64> {
        let mut stripped = unquote(value).to_string();
        for suffix in &self.vocab.unit_suffixes {
            stripped = remove_ignore_case(&stripped, suffix);
        }
        NUMBER
            .find(&stripped)
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    /// Boolean-coded fields: only the truthy literal means `true`.
    pub fn flag(&self, value: &str) -> bool {
        unquote(value).eq_ignore_ascii_case(&self.vocab.truthy_literal)
    }

    /// Whether a device response reports a failed command.
    pub fn contains_failure(&self, response: &str) -> bool {
        let lower = response.to_lowercase();
        self.vocab
            .failure_keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && lower.contains(&keyword.to_lowercase()))
    }

    /// Collect every key/value pair in a multi-line response. Keys are
    /// lowercased; when a key repeats, the first occurrence wins.
    pub fn key_values(&self, text: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for line in self.lines(text) {
            for (key, value) in parse_key_value_line(line) {
                map.entry(key.to_ascii_lowercase()).or_insert(value);
            }
        }
        trace!(pairs = map.len(), "collected key/value pairs");
        map
    }

    fn lines<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        text.lines().filter(move |line| !self.is_noise_line(line))
    }

    fn is_noise_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty()
            || self
                .vocab
                .comment_prefixes
                .iter()
                .any(|prefix| !prefix.is_empty() && trimmed.starts_with(prefix.as_str()))
            || PROMPT.is_match(trimmed)
    }
}

/// Split a line holding several `key=value` pairs.
///
/// Output shapes vary per command and firmware, so three strategies are
/// tried in turn: the `word(-word)*=` tokenizer, whitespace splitting, and a
/// quote-aware character scanner. Returns an empty list when nothing fits.
pub fn parse_key_value_line(line: &str) -> Vec<(String, String)> {
    let pairs = tokenize_pairs(line);
    if !pairs.is_empty() {
        return pairs;
    }

    let pairs = split_whitespace_pairs(line);
    if !pairs.is_empty() {
        return pairs;
    }

    scan_pairs(line)
}

/// Parse a `received,transmitted` counter value such as `23334,25484`.
pub fn parse_counter_pair(value: &str) -> CounterPair {
    let mut parts = unquote(value).split(',').map(|part| {
        INTEGER
            .find(part)
            .and_then(|m| m.as_str().parse::<u64>().ok())
    });

    CounterPair {
        rx: parts.next().flatten(),
        tx: parts.next().flatten(),
    }
}

fn tokenize_pairs(line: &str) -> Vec<(String, String)> {
    // (key start, key end, value start)
    let keys: Vec<(usize, usize, usize)> = KEY_TOKEN
        .captures_iter(line)
        .filter_map(|caps| {
            let key = caps.get(1)?;
            let whole = caps.get(0)?;
            Some((key.start(), key.end(), whole.end()))
        })
        .filter(|(start, _, _)| !inside_quotes(line, *start))
        .collect();

    keys.iter()
        .enumerate()
        .map(|(i, &(key_start, key_end, value_start))| {
            let value_end = keys.get(i + 1).map_or(line.len(), |next| next.0);
            let value = unquote(line[value_start..value_end].trim());
            (line[key_start..key_end].to_string(), value.to_string())
        })
        .collect()
}

fn split_whitespace_pairs(line: &str) -> Vec<(String, String)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        if let Some((key, value)) = token.split_once('=') {
            if !key.is_empty() {
                pairs.push((key.to_string(), unquote(value).to_string()));
            }
        } else if let Some(key) = token.strip_suffix(':').filter(|k| !k.is_empty()) {
            if let Some(value) = tokens.get(i + 1) {
                pairs.push((key.to_string(), unquote(value).to_string()));
                i += 1;
            }
        }
        i += 1;
    }

    pairs
}

fn scan_pairs(line: &str) -> Vec<(String, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        let key_start = i;
        while i < chars.len() && !matches!(chars[i], '=' | ':') && !chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() || chars[i].is_whitespace() {
            continue;
        }
        let key: String = chars[key_start..i].iter().collect();
        i += 1;

        let value = match chars.get(i).copied() {
            Some(q) if q == '"' || q == '\'' => {
                i += 1;
                let value_start = i;
                while i < chars.len() && chars[i] != q {
                    i += 1;
                }
                let value: String = chars[value_start..i].iter().collect();
                i += 1;
                value
            }
            _ => {
                let value_start = i;
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                chars[value_start..i].iter().collect()
            }
        };

        if !key.is_empty() {
            pairs.push((key, value));
        }
    }

    pairs
}

/// Return the text after `key:` / `key=` on this line. The match is
/// case-insensitive and must not be the tail of a longer key
/// (`signal-strength` does not match `tx-signal-strength`).
/// Keys inside quoted values, such as a `comment="..."`, are skipped.
fn locate_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    if key.is_empty() {
        return None;
    }

    // ASCII lowercasing keeps byte offsets identical to `line`.
    let lower = line.to_ascii_lowercase();
    let key = key.to_ascii_lowercase();
    let mut from = 0;

    while let Some(pos) = lower[from..].find(&key) {
        let start = from + pos;
        let end = start + key.len();

        let bounded = lower[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_key_char(c));
        let after = lower[end..].trim_start();

        if bounded
            && matches!(after.chars().next(), Some(':' | '='))
            && !inside_quotes(line, start)
        {
            let value_start = line.len() - after.len() + 1;
            return Some(&line[value_start..]);
        }

        from = end;
    }

    None
}

/// Cut a value at the next `key=` token, treating quoted text as atomic.
fn value_extent(rest: &str) -> &str {
    let rest = rest.trim_start();
    let mut quote: Option<char> = None;
    let mut after_space = true;

    for (i, c) in rest.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if after_space && matches!(c, '"' | '\'') => quote = Some(c),
            None if after_space && i > 0 && KEY_AT_START.is_match(&rest[i..]) => {
                return rest[..i].trim_end();
            }
            None => {}
        }
        after_space = c.is_whitespace();
    }

    rest.trim_end()
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q) {
            return inner.strip_suffix(q).unwrap_or(inner);
        }
    }
    value
}

fn inside_quotes(line: &str, index: usize) -> bool {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        if i >= index {
            break;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '"' | '\'') => quote = Some(c),
            None => {}
        }
    }
    quote.is_some()
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn remove_ignore_case(haystack: &str, needle: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }

    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut i = 0;

    while let Some(pos) = lower[i..].find(&needle) {
        out.push_str(&haystack[i..i + pos]);
        i += pos + needle.len();
    }
    out.push_str(&haystack[i..]);
    out
}
