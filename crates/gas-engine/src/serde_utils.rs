//! Fee amounts travel as strings, either decimal or `0x` prefixed hex.

pub(crate) mod u256 {
    use alloy::primitives::U256;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(U256Visitor)
    }

    pub(crate) fn parse(value: &str) -> Option<U256> {
        let value = value.trim();
        match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            Some(hex) => U256::from_str_radix(hex, 16).ok(),
            None => U256::from_str_radix(value, 10).ok(),
        }
    }

    struct U256Visitor;

    impl<'de> Visitor<'de> for U256Visitor {
        type Value = U256;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a decimal or 0x prefixed hex string, or an unsigned integer")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<U256, E> {
            Ok(U256::from(value))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<U256, E> {
            parse(value).ok_or_else(|| E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_decimal_and_hex() {
            assert_eq!(parse("21000"), Some(U256::from(21000)));
            assert_eq!(parse("0x5208"), Some(U256::from(21000)));
            assert_eq!(parse("-1"), None);
            assert_eq!(parse("1.5"), None);
        }
    }
}
