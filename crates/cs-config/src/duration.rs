//! Duration strings used by environment overrides

/// Parse a duration into whole seconds.
///
/// Accepts a bare number of seconds (`"900"`) or a number with one of the
/// suffixes `s`, `m`, `h`, `d` (`"15m"`, `"168h"`, `"7d"`).
/// Returns `None` for anything else, including zero or negative values.
pub fn parse_duration_secs(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (number, multiplier) = match value.chars().last()? {
        's' => (&value[..value.len() - 1], 1),
        'm' => (&value[..value.len() - 1], 60),
        'h' => (&value[..value.len() - 1], 3600),
        'd' => (&value[..value.len() - 1], 86_400),
        c if c.is_ascii_digit() => (value, 1),
        _ => return None,
    };

    let number: i64 = number.trim().parse().ok()?;
    if number <= 0 {
        return None;
    }
    number.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_seconds() {
        assert_eq!(parse_duration_secs("900"), Some(900));
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_duration_secs("30s"), Some(30));
        assert_eq!(parse_duration_secs("15m"), Some(900));
        assert_eq!(parse_duration_secs("168h"), Some(604_800));
        assert_eq!(parse_duration_secs("7d"), Some(604_800));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_duration_secs(""), None);
        assert_eq!(parse_duration_secs("m"), None);
        assert_eq!(parse_duration_secs("15x"), None);
        assert_eq!(parse_duration_secs("-5m"), None);
        assert_eq!(parse_duration_secs("0"), None);
    }
}
