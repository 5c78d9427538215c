//! Numeric-aware natural ordering for page filenames.
//!
//! Scanned pages arrive with names like `page2.jpg`, `page10.jpg`,
//! `p001.png`. Plain lexicographic order puts `page10` before `page2`, which
//! is never what the scanlator meant, and directory enumeration order is
//! unspecified and must not be trusted. Every collected directory listing is
//! therefore sorted with [`natural_cmp`] before pages are appended.
//!
//! The comparator tokenizes names into alternating digit and non-digit runs:
//! digit runs compare numerically, everything else compares as lowercased
//! text. Leading zeros only break ties (`p1` < `p01` is stable, not random).

use std::cmp::Ordering;

/// Compare two names with embedded numbers ordered numerically.
///
/// `"page2" < "page10"`, `"ch1-p3" < "ch1-p12" < "ch2-p1"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ta = tokens(a);
    let mut tb = tokens(b);

    loop {
        match (ta.next(), tb.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.cmp_token(&y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Sort a slice of items by a name key using [`natural_cmp`].
pub fn sort_natural_by_key<T>(items: &mut [T], key: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| natural_cmp(key(a), key(b)));
}

enum Token<'a> {
    Number(&'a str),
    Text(&'a str),
}

impl Token<'_> {
    fn cmp_token(&self, other: &Token<'_>) -> Ordering {
        match (self, other) {
            (Token::Number(a), Token::Number(b)) => {
                // Strip leading zeros, then compare by length and digits.
                let a_trim = a.trim_start_matches('0');
                let b_trim = b.trim_start_matches('0');
                a_trim
                    .len()
                    .cmp(&b_trim.len())
                    .then_with(|| a_trim.cmp(b_trim))
                    // Tie-break on the raw run so "p1" and "p01" stay stable.
                    .then_with(|| a.len().cmp(&b.len()))
            }
            (Token::Text(a), Token::Text(b)) => {
                let a = a.to_lowercase();
                let b = b.to_lowercase();
                a.cmp(&b)
            }
            // Numbers sort before text at the same position.
            (Token::Number(_), Token::Text(_)) => Ordering::Less,
            (Token::Text(_), Token::Number(_)) => Ordering::Greater,
        }
    }
}

/// Split a name into alternating digit / non-digit runs.
fn tokens(s: &str) -> impl Iterator<Item = Token<'_>> {
    let bytes = s.as_bytes();
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos >= bytes.len() {
            return None;
        }
        let start = pos;
        let is_digit = bytes[pos].is_ascii_digit();
        while pos < bytes.len() && bytes[pos].is_ascii_digit() == is_digit {
            pos += 1;
        }
        let run = &s[start..pos];
        Some(if is_digit {
            Token::Number(run)
        } else {
            Token::Text(run)
        })
    })
}
