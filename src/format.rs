//! Display helpers for on-chain fixed-point values.
//!
//! The venue reports monetary values as decimal integer strings scaled by
//! 10^8 (prices, leverage) or 10^18 (token amounts). All arithmetic here is
//! integer arithmetic on i128.

pub const PRICE_DECIMALS: u32 = 8;
pub const TOKEN_DECIMALS: u32 = 18;

/// Parses a scaled integer string ("2000000000000000000") into its raw value.
pub fn parse_fixed(s: &str) -> Option<i128> {
    s.trim().parse().ok()
}

/// Parses a human decimal ("12.5") into a value scaled by 10^decimals.
/// Rejects inputs with more fractional digits than the scale can hold.
pub fn to_fixed(s: &str, decimals: u32) -> Option<i128> {
    let s = s.trim();
    let (sign, s) = match s.strip_prefix('-') {
        Some(rest) => (-1i128, rest),
        None => (1i128, s),
    };
    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > decimals as usize {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac: i128 = if frac.is_empty() {
        0
    } else {
        frac.parse::<i128>().ok()? * 10i128.pow(decimals - frac.len() as u32)
    };
    Some(sign * (whole * 10i128.pow(decimals) + frac))
}

/// Renders a raw scaled value as a decimal string with `precision` fractional digits.
pub fn format_fixed(value: i128, decimals: u32, precision: usize) -> String {
    let scale = 10u128.pow(decimals);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let whole = abs / scale;
    if precision == 0 {
        return format!("{}{}", sign, whole);
    }
    let frac = format!("{:0width$}", abs % scale, width = decimals as usize);
    format!("{}{}.{}", sign, whole, &frac[..precision.min(decimals as usize)])
}

/// Renders a 10^18-scaled token amount string, falling back to the raw input
/// when it does not parse.
pub fn format_token(s: &str) -> String {
    match parse_fixed(s) {
        Some(value) => format_fixed(value, TOKEN_DECIMALS, 2),
        None => s.to_owned(),
    }
}

/// Renders a 10^8-scaled price string.
pub fn format_price(s: &str) -> String {
    match parse_fixed(s) {
        Some(value) => format_fixed(value, PRICE_DECIMALS, 2),
        None => s.to_owned(),
    }
}

pub fn format_percent(p: f64) -> String {
    format!("{:+.2}%", p)
}

pub fn format_quote(close: f64) -> String {
    format!("{:.2}", close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_sums_without_precision_loss() {
        let a = parse_fixed("1000000000000000000").unwrap();
        let b = parse_fixed("2000000000000000000").unwrap();
        assert_eq!(a + b, 3_000_000_000_000_000_000);
    }

    #[test]
    fn parse_fixed_rejects_garbage() {
        assert_eq!(parse_fixed("12.5"), None);
        assert_eq!(parse_fixed("abc"), None);
        assert_eq!(parse_fixed(""), None);
        assert_eq!(parse_fixed("-42"), Some(-42));
    }

    #[test]
    fn to_fixed_scales_decimals() {
        assert_eq!(to_fixed("1", TOKEN_DECIMALS), Some(1_000_000_000_000_000_000));
        assert_eq!(to_fixed("0.5", TOKEN_DECIMALS), Some(500_000_000_000_000_000));
        assert_eq!(to_fixed("2.5", PRICE_DECIMALS), Some(250_000_000));
        assert_eq!(to_fixed("-1.25", PRICE_DECIMALS), Some(-125_000_000));
        assert_eq!(to_fixed(".5", PRICE_DECIMALS), Some(50_000_000));
    }

    #[test]
    fn to_fixed_rejects_overflowing_fraction() {
        assert_eq!(to_fixed("0.123456789", PRICE_DECIMALS), None);
        assert_eq!(to_fixed("1.2.3", PRICE_DECIMALS), None);
        assert_eq!(to_fixed("", PRICE_DECIMALS), None);
        assert_eq!(to_fixed("1e8", PRICE_DECIMALS), None);
    }

    #[test]
    fn formats_fixed_point() {
        assert_eq!(format_fixed(3_000_000_000_000_000_000, TOKEN_DECIMALS, 2), "3.00");
        assert_eq!(format_fixed(123_456_789, PRICE_DECIMALS, 2), "1.23");
        assert_eq!(format_fixed(-123_456_789, PRICE_DECIMALS, 4), "-1.2345");
        assert_eq!(format_fixed(42, PRICE_DECIMALS, 0), "0");
        assert_eq!(format_token("1500000000000000000"), "1.50");
        assert_eq!(format_token("n/a"), "n/a");
    }

    #[test]
    fn formats_percent() {
        assert_eq!(format_percent(1.234), "+1.23%");
        assert_eq!(format_percent(-0.5), "-0.50%");
    }
}
