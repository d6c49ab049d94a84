//! Human-readable size strings and the byte count embedded in them.
//!
//! Rendered form: `"1.50 KB (1,536 Bytes)"`; under 1024 bytes: `"512 B (512 Bytes)"`.
//! Catalog tools write the same shape with locale-specific separators
//! (`"1,5 MB (1.572.864 Bytes)"`), so parsing only trusts the parenthesized count.

const UNITS: &[u8] = b" KMGTPE";

/// Render `bytes` with a binary unit prefix and the exact count in parentheses.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B ({bytes} Bytes)");
    }
    let z = ((63 - bytes.leading_zeros()) / 10) as usize;
    let value = bytes as f64 / (1_u64 << (z * 10)) as f64;
    format!(
        "{:.2} {}B ({} Bytes)",
        value,
        UNITS[z] as char,
        group_thousands(bytes)
    )
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn is_separator(c: char) -> bool {
    matches!(c, ',' | '.' | ' ' | '\'' | '\u{a0}' | '\u{202f}')
}

/// Strip thousands separators and parse the remaining digits.
fn parse_grouped(s: &str) -> Option<u64> {
    let digits: String = s.trim().chars().filter(|c| !is_separator(*c)).collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Extract the byte count from a display string. Returns None when no exact count is present.
///
/// Accepts `"... (<count> Bytes)"` / `"... (<count> B)"` and a bare `"<count> B"` or
/// `"<count> Bytes"`. A scaled value such as `"1.5 KB"` has no exact count and yields None.
pub fn parse_size(display: &str) -> Option<u64> {
    let s = display.trim();
    if let Some(open) = s.rfind('(') {
        let inner = &s[open + 1..];
        let inner = inner.strip_suffix(')').unwrap_or(inner).trim();
        return parse_grouped(strip_byte_unit(inner)?);
    }
    parse_grouped(strip_byte_unit(s)?)
}

fn strip_byte_unit(s: &str) -> Option<&str> {
    s.strip_suffix("Bytes")
        .or_else(|| s.strip_suffix("bytes"))
        .or_else(|| s.strip_suffix('B'))
        .filter(|rest| rest.is_empty() || rest.ends_with(' ') || rest.ends_with(|c: char| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_small() {
        assert_eq!(format_size(0), "0 B (0 Bytes)");
        assert_eq!(format_size(1023), "1023 B (1023 Bytes)");
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_size(1024), "1.00 KB (1,024 Bytes)");
        assert_eq!(format_size(1536), "1.50 KB (1,536 Bytes)");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB (5,242,880 Bytes)");
        assert!(format_size(u64::MAX).contains(" EB ("));
    }

    #[test]
    fn test_parse_catalog_shapes() {
        assert_eq!(parse_size("1,5 MB (1.572.864 Bytes)"), Some(1_572_864));
        assert_eq!(parse_size("12 KB (12 345 Bytes)"), Some(12_345));
        assert_eq!(parse_size("700 B (700 B)"), Some(700));
        assert_eq!(parse_size("42 Bytes"), Some(42));
        assert_eq!(parse_size("1.5 KB"), None);
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("(n/a Bytes)"), None);
    }
}
