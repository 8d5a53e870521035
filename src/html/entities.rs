//! Character reference decoding and escaping.

const MAX_HEX_DIGITS: usize = 6;
const MAX_DEC_DIGITS: usize = 7;

/// Named references we decode. Anything else passes through unchanged.
const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("shy", '\u{ad}'),
    ("copy", '©'),
    ("reg", '®'),
    ("trade", '™'),
    ("sect", '§'),
    ("para", '¶'),
    ("middot", '·'),
    ("deg", '°'),
    ("hellip", '…'),
    ("ndash", '–'),
    ("mdash", '—'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("sbquo", '‚'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("bdquo", '„'),
    ("laquo", '«'),
    ("raquo", '»'),
    ("euro", '€'),
    ("auml", 'ä'),
    ("ouml", 'ö'),
    ("uuml", 'ü'),
    ("Auml", 'Ä'),
    ("Ouml", 'Ö'),
    ("Uuml", 'Ü'),
    ("szlig", 'ß'),
    ("eacute", 'é'),
    ("egrave", 'è'),
    ("aacute", 'á'),
    ("agrave", 'à'),
];

/// Decode named and numeric character references.
///
/// Numeric references must be semicolon-terminated and name a valid scalar
/// value. Malformed or unknown references are copied through verbatim.
pub fn decode_entities(s: &str) -> String {
    if memchr::memchr(b'&', s.as_bytes()).is_none() {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut copy_start = 0;
    let mut i = 0;

    while let Some(rel) = memchr::memchr(b'&', &bytes[i..]) {
        let amp = i + rel;
        out.push_str(&s[copy_start..amp]);
        match decode_at(s, amp) {
            Some((ch, consumed)) => {
                out.push(ch);
                i = amp + consumed;
            }
            None => {
                out.push('&');
                i = amp + 1;
            }
        }
        copy_start = i;
    }
    out.push_str(&s[copy_start..]);
    out
}

// Returns the decoded char and the byte length of the reference at `amp`.
fn decode_at(s: &str, amp: usize) -> Option<(char, usize)> {
    let rest = &s[amp + 1..];
    if let Some(numeric) = rest.strip_prefix('#') {
        let (digits, radix, prefix) = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 2),
            None => (numeric, 10, 1),
        };
        let max = if radix == 16 { MAX_HEX_DIGITS } else { MAX_DEC_DIGITS };
        let end = digits.find(';')?;
        if end == 0 || end > max {
            return None;
        }
        let value = u32::from_str_radix(&digits[..end], radix).ok()?;
        let ch = char::from_u32(value)?;
        return Some((ch, 1 + prefix + end + 1));
    }
    let end = rest
        .bytes()
        .take(8)
        .position(|b| b == b';')?;
    let name = &rest[..end];
    NAMED
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, ch)| (*ch, 1 + end + 1))
}

/// Escape text content for serialization.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape a double-quoted attribute value for serialization.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
