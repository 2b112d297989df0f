//! Member and measure label formatters
//!
//! Two formatter families are understood:
//!
//! - `DATE[pattern]` with Java-style letters (`yyyy`, `yy`, `MMMM`, `MMM`,
//!   `MM`, `M`, `dd`, `d`, `EEEE`, `EEE`) and `'quoted'` literals
//! - `DOUBLE[pattern]` in decimal-format style: `0` is a mandatory digit,
//!   `#` an optional one, `,` enables thousands grouping
//!
//! Values a formatter does not apply to are rendered with `Display`.

use std::fmt;

use crate::schema::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatter {
    Date {
        source: String,
        /// Equivalent chrono format string
        chrono: String,
    },
    Double {
        source: String,
        min_integer_digits: usize,
        min_fraction_digits: usize,
        max_fraction_digits: usize,
        grouping: bool,
    },
}

impl Formatter {
    /// Parses `DATE[...]` or `DOUBLE[...]`. `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (family, rest) = text.split_once('[')?;
        let pattern = rest.strip_suffix(']')?;
        match family.trim() {
            "DATE" => Some(Formatter::Date {
                source: text.to_string(),
                chrono: date_pattern_to_chrono(pattern)?,
            }),
            "DOUBLE" => parse_decimal(text, pattern),
            _ => None,
        }
    }

    pub fn format(&self, value: &Value) -> String {
        match (self, value) {
            (Formatter::Date { chrono, .. }, Value::Date(date)) => date.format(chrono).to_string(),
            (
                Formatter::Double {
                    min_integer_digits,
                    min_fraction_digits,
                    max_fraction_digits,
                    grouping,
                    ..
                },
                Value::Int(_) | Value::Double(_),
            ) => match value.as_f64() {
                Some(v) if v.is_finite() => format_decimal(
                    v,
                    *min_integer_digits,
                    *min_fraction_digits,
                    *max_fraction_digits,
                    *grouping,
                ),
                _ => value.to_string(),
            },
            _ => value.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Formatter::Date { source, .. } | Formatter::Double { source, .. } => source,
        }
    }
}

impl fmt::Display for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source())
    }
}

fn date_pattern_to_chrono(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            let end = chars[i + 1..].iter().position(|&c| c == '\'')? + i + 1;
            if end == i + 1 {
                out.push('\'');
            }
            for &literal in &chars[i + 1..end] {
                push_literal(&mut out, literal);
            }
            i = end + 1;
            continue;
        }
        let run = chars[i..].iter().take_while(|&&r| r == c).count();
        let directive = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('E', n) if n >= 4 => "%A",
            ('E', _) => "%a",
            (c, _) if c.is_ascii_alphabetic() => return None,
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
                i += run;
                continue;
            }
        };
        out.push_str(directive);
        i += run;
    }
    Some(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn parse_decimal(source: &str, pattern: &str) -> Option<Formatter> {
    let (integer, fraction) = pattern.split_once('.').unwrap_or((pattern, ""));
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.chars().all(|c| matches!(c, '#' | '0' | ','))
        || !fraction.chars().all(|c| matches!(c, '#' | '0'))
    {
        return None;
    }
    Some(Formatter::Double {
        source: source.to_string(),
        min_integer_digits: integer.chars().filter(|&c| c == '0').count(),
        min_fraction_digits: fraction.chars().filter(|&c| c == '0').count(),
        max_fraction_digits: fraction.len(),
        grouping: integer.contains(','),
    })
}

fn format_decimal(
    value: f64,
    min_integer_digits: usize,
    min_fraction_digits: usize,
    max_fraction_digits: usize,
    grouping: bool,
) -> String {
    let rendered = format!("{:.*}", max_fraction_digits, value.abs());
    let (integer, fraction) = rendered
        .split_once('.')
        .unwrap_or((rendered.as_str(), ""));

    let mut fraction = fraction.to_string();
    while fraction.len() > min_fraction_digits && fraction.ends_with('0') {
        fraction.pop();
    }

    let mut integer = integer.trim_start_matches('0').to_string();
    while integer.len() < min_integer_digits {
        integer.insert(0, '0');
    }
    if integer.is_empty() && fraction.is_empty() {
        integer.push('0');
    }
    if grouping {
        integer = group_thousands(&integer);
    }

    let negative = value < 0.0
        && integer
            .chars()
            .chain(fraction.chars())
            .any(|c| c != '0' && c != ',');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&integer);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
