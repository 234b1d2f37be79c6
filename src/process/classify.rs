use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static HCPCS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]\d{4}$").unwrap());
static CPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}$").unwrap());

/// Which billing code family a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CodeType {
    #[serde(rename = "CPT")]
    Cpt,
    #[serde(rename = "HCPCS")]
    Hcpcs,
    Unknown,
}

impl CodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Cpt => "CPT",
            CodeType::Hcpcs => "HCPCS",
            CodeType::Unknown => "Unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpt" => Some(CodeType::Cpt),
            "hcpcs" => Some(CodeType::Hcpcs),
            "unknown" => Some(CodeType::Unknown),
            _ => None,
        }
    }

    /// The family named by a column header, if it names exactly one.
    /// "CPT/HCPCS Code" names both and gives no hint.
    pub fn from_header(header: &str) -> Option<Self> {
        let h = header.to_lowercase();
        match (h.contains("hcpcs"), h.contains("cpt")) {
            (true, false) => Some(CodeType::Hcpcs),
            (false, true) => Some(CodeType::Cpt),
            _ => None,
        }
    }

    /// The family implied by the shape of the value alone.
    pub fn from_pattern(code: &str) -> Self {
        if HCPCS_RE.is_match(code) {
            CodeType::Hcpcs
        } else if CPT_RE.is_match(code) {
            CodeType::Cpt
        } else {
            CodeType::Unknown
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `code` found under the column titled `header`.
/// An unambiguous header wins over the value's shape.
pub fn classify(code: &str, header: &str) -> CodeType {
    CodeType::from_header(header).unwrap_or_else(|| CodeType::from_pattern(code.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_classification() {
        assert_eq!(classify("E0100", "Code"), CodeType::Hcpcs);
        assert_eq!(classify("e0100", "Code"), CodeType::Hcpcs);
        assert_eq!(classify("86003", "Code"), CodeType::Cpt);
        assert_eq!(classify("8600", "Code"), CodeType::Unknown);
        assert_eq!(classify("0001U", "Code"), CodeType::Unknown);
        assert_eq!(classify("E01000", "Code"), CodeType::Unknown);
    }

    #[test]
    fn test_header_hint_wins() {
        assert_eq!(classify("86003", "HCPCS Code"), CodeType::Hcpcs);
        assert_eq!(classify("not-a-code", "HCPCS Code(s)"), CodeType::Hcpcs);
        assert_eq!(classify("E0100", "CPT Code"), CodeType::Cpt);
    }

    #[test]
    fn test_mixed_header_falls_back_to_pattern() {
        assert_eq!(classify("99213", "CPT/HCPCS Code"), CodeType::Cpt);
        assert_eq!(classify("T1015", "CPT/HCPCS Code"), CodeType::Hcpcs);
    }

    #[test]
    fn test_str_round_trip() {
        for ty in [CodeType::Cpt, CodeType::Hcpcs, CodeType::Unknown] {
            assert_eq!(CodeType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(CodeType::from_str("icd"), None);
        assert_eq!(
            serde_json::to_string(&CodeType::Hcpcs).unwrap(),
            "\"HCPCS\""
        );
    }
}
