//! Command-line argument values to OSC arguments
//!
//! Values may carry an explicit type tag, `tag:value`:
//!
//! | tag | type    | example          |
//! |-----|---------|------------------|
//! | `i` | int32   | `i:42`           |
//! | `f` | float32 | `f:0.5`          |
//! | `s` | string  | `s:42`           |
//! | `b` | blob    | `b:deadbeef`     |
//! | `h` | int64   | `h:-9000000000`  |
//! | `d` | float64 | `d:3.14159`      |
//! | `t` | uint64  | `t:1`            |
//!
//! Untagged values become an int32 if they parse as one, a float32 if they
//! parse as a float, and a string otherwise.

use anyhow::{anyhow, bail, Context, Result};
use oscwire_core::Argument;

pub fn parse_argument(raw: &str) -> Result<Argument> {
    if let Some((tag, value)) = raw.split_once(':') {
        if tag.len() == 1 {
            return parse_tagged(tag, value).with_context(|| format!("Invalid argument '{}'", raw));
        }
    }

    if let Ok(value) = raw.parse::<i32>() {
        return Ok(Argument::Int(value));
    }
    if let Ok(value) = raw.parse::<f32>() {
        return Ok(Argument::Float(value));
    }
    Ok(Argument::Str(raw.to_string()))
}

fn parse_tagged(tag: &str, value: &str) -> Result<Argument> {
    let arg = match tag {
        "i" => Argument::Int(value.parse()?),
        "f" => Argument::Float(value.parse()?),
        "s" => Argument::Str(value.to_string()),
        "b" => Argument::Blob(parse_hex(value)?),
        "h" => Argument::Int64(value.parse()?),
        "d" => Argument::Float64(value.parse()?),
        "t" => Argument::UInt64(value.parse()?),
        other => bail!("unknown type tag '{}'", other),
    };
    Ok(arg)
}

/// Parse hex digits, ignoring whitespace and an optional `0x` prefix
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits");
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            Some(pair)
                .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|byte| u8::from_str_radix(byte, 16).ok())
                .ok_or_else(|| anyhow!("invalid hex digit in '{}'", digits))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged() {
        assert_eq!(parse_argument("42").unwrap(), Argument::Int(42));
        assert_eq!(parse_argument("-0.25").unwrap(), Argument::Float(-0.25));
        assert_eq!(parse_argument("hello").unwrap(), Argument::Str("hello".into()));
        // too large for int32
        assert_eq!(
            parse_argument("3000000000").unwrap(),
            Argument::Float(3_000_000_000.0)
        );
    }

    #[test]
    fn test_tagged() {
        assert_eq!(parse_argument("s:42").unwrap(), Argument::Str("42".into()));
        assert_eq!(parse_argument("h:-9000000000").unwrap(), Argument::Int64(-9_000_000_000));
        assert_eq!(parse_argument("d:0.5").unwrap(), Argument::Float64(0.5));
        assert_eq!(parse_argument("t:7").unwrap(), Argument::UInt64(7));
        assert_eq!(
            parse_argument("b:de ad be ef").unwrap(),
            Argument::Blob(vec![0xde, 0xad, 0xbe, 0xef])
        );
    }

    #[test]
    fn test_colon_in_string() {
        assert_eq!(
            parse_argument("http://host").unwrap(),
            Argument::Str("http://host".into())
        );
        assert_eq!(parse_argument("s:a:b").unwrap(), Argument::Str("a:b".into()));
    }

    #[test]
    fn test_invalid_tagged() {
        assert!(parse_argument("i:abc").is_err());
        assert!(parse_argument("x:1").is_err());
        assert!(parse_argument("b:abc").is_err());
        assert!(parse_argument("t:-1").is_err());
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0x2f61").unwrap(), vec![0x2f, 0x61]);
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_parse_hex_non_ascii() {
        assert!(parse_hex("aé0").is_err());
        assert!(parse_hex("éé").is_err());
        assert!(parse_hex("+f").is_err());
        assert!(parse_argument("b:2fé1").is_err());
    }
}
