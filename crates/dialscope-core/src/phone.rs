//! Canonical phone-number codec.
//!
//! A phone number is a 10-digit NANP number (3-digit NPA, 3-digit NXX,
//! 4-digit subscriber) held as a `u64` in the range `[2_000_000_000,
//! 10_000_000_000)`. [`NONE`] marks an absent or unparseable number.

/// Sentinel for "no number" / "not found".
pub const NONE: u64 = u64::MAX;

/// Lower bound of the canonical range (NPA starts at 200).
pub const MIN_PN: u64 = 2_000_000_000;

/// Exclusive upper bound of the canonical range.
pub const MAX_PN: u64 = 10_000_000_000;

/// Parse a phone number from user input.
///
/// Strips an optional leading `+1` or `1` country code along with dashes
/// and spaces, then reads the first 10 consecutive decimal digits. Returns
/// [`NONE`] if fewer than 10 digits remain or the value falls outside the
/// canonical range.
pub fn parse(input: &str) -> u64 {
    let mut s = input.trim();
    s = s.strip_prefix("+1").unwrap_or(s);

    let mut digits = [0u8; 11];
    let mut n = 0;
    for c in s.chars() {
        match c {
            '0'..='9' => {
                if n == digits.len() {
                    break;
                }
                digits[n] = c as u8 - b'0';
                n += 1;
            }
            '-' | ' ' => {}
            _ => break,
        }
    }

    // An 11-digit run starting with 1 carries the country code inline.
    let ds: &[u8] = if n == 11 && digits[0] == 1 {
        &digits[1..11]
    } else {
        &digits[..n.min(10)]
    };
    if ds.len() < 10 {
        return NONE;
    }

    let pn = ds.iter().fold(0u64, |acc, &d| acc * 10 + u64::from(d));
    if (MIN_PN..MAX_PN).contains(&pn) { pn } else { NONE }
}

/// Format a canonical phone number as bare decimal digits.
pub fn format(pn: u64) -> String {
    pn.to_string()
}

/// 3-digit area code.
#[inline]
pub fn npa(pn: u64) -> u64 {
    pn / 10_000_000
}

/// 6-digit exchange prefix.
#[inline]
pub fn npa_nxx(pn: u64) -> u64 {
    pn / 10_000
}

/// 7-digit thousands-block prefix.
#[inline]
pub fn npa_nxx_x(pn: u64) -> u64 {
    pn / 1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_digits() {
        assert_eq!(parse("2025551212"), 2025551212);
        assert_eq!(parse("9995550000"), 9995550000);
    }

    #[test]
    fn test_parse_strips_country_code() {
        assert_eq!(parse("+12025551212"), 2025551212);
        assert_eq!(parse("12025551212"), 2025551212);
    }

    #[test]
    fn test_parse_strips_separators() {
        assert_eq!(parse("202-555-1212"), 2025551212);
        assert_eq!(parse("1 202 555 1212"), 2025551212);
        assert_eq!(parse("+1-202-555-1212"), 2025551212);
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(parse(""), NONE);
        assert_eq!(parse("202555121"), NONE);
        assert_eq!(parse("1202555"), NONE);
    }

    #[test]
    fn test_parse_out_of_range() {
        // NPA below 200 is not a valid NANP number.
        assert_eq!(parse("1025551212"), NONE);
        assert_eq!(parse("0025551212"), NONE);
    }

    #[test]
    fn test_parse_stops_at_garbage() {
        assert_eq!(parse("2025551212x99"), 2025551212);
        assert_eq!(parse("20255512;12"), NONE);
    }

    #[test]
    fn test_parse_takes_first_ten_of_longer_run() {
        assert_eq!(parse("20255512129999"), 2025551212);
    }

    #[test]
    fn test_derived_keys() {
        assert_eq!(npa(2025551212), 202);
        assert_eq!(npa_nxx(2025551212), 202555);
        assert_eq!(npa_nxx_x(2025551212), 2025551);
    }

    #[test]
    fn test_format() {
        assert_eq!(format(2025551212), "2025551212");
    }
}
