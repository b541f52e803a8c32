//! Constant values of fields and enumerators, and their C++ spelling.

use dwarfdecl_dwarf::AttrValue;
use std::fmt;

/// A constant as it was encoded: `sdata` is signed, every other constant
/// form is unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstValue {
    Signed(i64),
    Unsigned(u64),
}

impl ConstValue {
    pub fn from_attr(value: &AttrValue) -> Option<Self> {
        match *value {
            AttrValue::Signed(v) => Some(ConstValue::Signed(v)),
            AttrValue::Unsigned(v) => Some(ConstValue::Unsigned(v)),
            AttrValue::Flag(b) => Some(ConstValue::Unsigned(b as u64)),
            _ => None,
        }
    }

    /// Raw 64-bit payload, two's complement for signed values.
    pub fn bits(self) -> u64 {
        match self {
            ConstValue::Signed(v) => v as u64,
            ConstValue::Unsigned(v) => v,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Signed(v) => write!(f, "{v}"),
            ConstValue::Unsigned(v) => write!(f, "{v}"),
        }
    }
}

/// How a default value is spelled, chosen from the field's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueClass {
    Float,
    Double,
    Char,
    Bool,
    Integer,
}

fn classify(type_spelling: &str) -> ValueClass {
    let base = type_spelling
        .split_whitespace()
        .filter(|word| !matches!(*word, "const" | "volatile"))
        .next_back()
        .unwrap_or("");
    match base {
        "float" => ValueClass::Float,
        "double" => ValueClass::Double,
        "char" | "char8_t" | "char16_t" | "char32_t" | "wchar_t" => ValueClass::Char,
        "bool" => ValueClass::Bool,
        _ => ValueClass::Integer,
    }
}

/// Spell `value` as an initializer for a field whose type prints as
/// `type_spelling`.
pub fn format_default_value(type_spelling: &str, value: ConstValue) -> String {
    match classify(type_spelling) {
        ValueClass::Float => format_float(f32::from_bits(value.bits() as u32)),
        ValueClass::Double => format_double(f64::from_bits(value.bits())),
        ValueClass::Char => format_char(value.bits()),
        ValueClass::Bool => (value.bits() != 0).to_string(),
        ValueClass::Integer => value.to_string(),
    }
}

/// Shortest decimal that reads back to the same `f32`.
pub fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "std::numeric_limits<float>::quiet_NaN()".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}std::numeric_limits<float>::infinity()");
    }
    with_decimal_point(value.to_string())
}

/// Shortest decimal that reads back to the same `f64`.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "std::numeric_limits<double>::quiet_NaN()".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}std::numeric_limits<double>::infinity()");
    }
    with_decimal_point(value.to_string())
}

fn with_decimal_point(mut text: String) -> String {
    if !text.contains(&['.', 'e', 'E'][..]) {
        text.push_str(".0");
    }
    text
}

/// Character literal for a code point, with sign-extended single-byte
/// values folded back to their byte.
pub fn format_char(raw: u64) -> String {
    let value = if raw & !0xFF == !0xFF { raw & 0xFF } else { raw };
    match value {
        0x27 => "'\\''".to_string(),
        0x5C => "'\\\\'".to_string(),
        0x20..=0x7E => format!("'{}'", value as u8 as char),
        0..=0xFF => format!("'\\x{value:02X}'"),
        0x100..=0xFFFF => format!("'\\u{value:04X}'"),
        _ => format!("'\\U{value:08X}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_literals() {
        assert_eq!(format_char(65), "'A'");
        assert_eq!(format_char(9), "'\\x09'");
        assert_eq!(format_char(0x1F600), "'\\U0001F600'");
        assert_eq!(format_char(0x263A), "'\\u263A'");
        assert_eq!(format_char(0xE9), "'\\xE9'");
        assert_eq!(format_char(0x27), "'\\''");
        assert_eq!(format_char(0x5C), "'\\\\'");
        // -1 stored in a signed char
        assert_eq!(format_char(-1i64 as u64), "'\\xFF'");
    }

    #[test]
    fn test_float_round_trip() {
        for v in [0.1f32, 7.77, -2.5e-8, 1.0e30, 0.0, 16_777_216.0] {
            let text = format_float(v);
            assert_eq!(text.parse::<f32>().unwrap(), v, "{text}");
            assert!(text.contains('.') || text.contains('e'), "{text}");
        }
        assert_eq!(format_float(1.0), "1.0");
    }

    #[test]
    fn test_double_round_trip() {
        for v in [0.1f64, std::f64::consts::PI, -1.0e-300, 123456789.125] {
            let text = format_double(v);
            assert_eq!(text.parse::<f64>().unwrap(), v, "{text}");
        }
        assert_eq!(format_double(2.0), "2.0");
        assert_eq!(
            format_double(f64::NEG_INFINITY),
            "-std::numeric_limits<double>::infinity()"
        );
    }

    #[test]
    fn test_default_value_by_type() {
        let pi = ConstValue::Unsigned(std::f32::consts::PI.to_bits() as u64);
        assert_eq!(
            format_default_value("const float", pi),
            std::f32::consts::PI.to_string()
        );
        let half = ConstValue::Unsigned(0.5f64.to_bits());
        assert_eq!(format_default_value("double", half), "0.5");
        assert_eq!(format_default_value("const char", ConstValue::Signed(65)), "'A'");
        assert_eq!(format_default_value("char32_t", ConstValue::Unsigned(0x1F600)), "'\\U0001F600'");
        assert_eq!(format_default_value("bool", ConstValue::Unsigned(1)), "true");
        assert_eq!(format_default_value("const bool", ConstValue::Unsigned(0)), "false");
        assert_eq!(format_default_value("int", ConstValue::Signed(-42)), "-42");
        assert_eq!(format_default_value("unsigned long", ConstValue::Unsigned(u64::MAX)), "18446744073709551615");
        // Pointer-to-char is not a character
        assert_eq!(format_default_value("const char *", ConstValue::Unsigned(0)), "0");
    }
}
