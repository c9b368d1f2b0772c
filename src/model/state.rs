// src/model/state.rs

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// USPS codes EIA reports on: the states, DC, and the inhabited territories.
const USPS_CODES: [&str; 56] = [
    "AK", "AL", "AR", "AS", "AZ", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "GU", "HI", "IA", "ID",
    "IL", "IN", "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MP", "MS", "MT", "NC", "ND",
    "NE", "NH", "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "PR", "RI", "SC", "SD", "TN", "TX",
    "UT", "VA", "VI", "VT", "WA", "WI", "WV", "WY",
];

/// Code used by EIA for national totals; canonicalized to "no state".
pub const NATIONAL: &str = "US";

/// A validated two-letter USPS state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateCode([u8; 2]);

impl StateCode {
    /// Trims and upper-cases `s`; `None` unless it is a known USPS code.
    pub fn parse(s: &str) -> Option<Self> {
        let code = s.trim().to_ascii_uppercase();
        USPS_CODES
            .binary_search(&code.as_str())
            .ok()
            .map(|_| {
                let b = code.as_bytes();
                StateCode([b[0], b[1]])
            })
    }

    pub fn as_str(&self) -> &str {
        // only ever built from ASCII entries of USPS_CODES
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StateCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StateCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        StateCode::parse(&text)
            .ok_or_else(|| de::Error::custom(format!("unknown state code {text:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_sorted_for_binary_search() {
        let mut sorted = USPS_CODES;
        sorted.sort();
        assert_eq!(sorted, USPS_CODES);
    }

    #[test]
    fn parse_canonicalizes() {
        assert_eq!(StateCode::parse(" ca ").unwrap().as_str(), "CA");
        assert_eq!(StateCode::parse("PR").unwrap().to_string(), "PR");
        assert!(StateCode::parse("US").is_none());
        assert!(StateCode::parse("XX").is_none());
        assert!(StateCode::parse("CAL").is_none());
    }
}
