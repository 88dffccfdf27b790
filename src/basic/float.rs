//! Packed decimal floating point literals.

/// Exponent bias of the first byte.
const EXPONENT_BIAS: i32 = 0x40;
/// Significant digits shown when a literal is printed.
pub const PRECISION: usize = 14;

/// Decode a 4-byte (single) or 8-byte (double) literal.  The first byte is
/// the biased exponent and each following nibble is one decimal digit, most
/// significant first.
pub fn decode_float(bytes: &[u8]) -> f64 {
    let (exponent, digits) = match bytes.split_first() {
        Some((exponent, digits)) => (*exponent as i32, digits),
        None => return 0.0,
    };
    let mut value = 0.0f64;
    for b in digits {
        value = value * 10.0 + (b >> 4) as f64;
        value = value * 10.0 + (b & 0x0F) as f64;
    }
    while value >= 1.0 {
        value /= 10.0;
    }
    value * 10f64.powi(exponent - EXPONENT_BIAS)
}

/// Format a value like C's `%.<precision>g`: fixed notation for moderate
/// exponents, scientific otherwise, with trailing zeros removed.
pub fn format_general(value: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    // Rounding to the requested precision may bump the exponent, so take it
    // from the rounded scientific rendering.
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exponent < 0 { '-' } else { '+' },
            exponent.abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}
