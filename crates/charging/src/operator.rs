use phf::phf_map;

pub const TESLA: &str = "Tesla";
pub const UNKNOWN_OPERATOR: &str = "Unknown";

/// Known spellings of operator names, keyed by their folded form.
pub static OPERATOR_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "tesla" => "Tesla",
    "tesla, inc." => "Tesla",
    "tesla inc" => "Tesla",
    "tesla inc." => "Tesla",
    "tesla motors" => "Tesla",
    "tesla motors inc." => "Tesla",
    "tesla supercharger" => "Tesla",
    "特斯拉" => "Tesla",
    "bp" => "BP",
    "bp pulse" => "BP",
    "bp chargemaster" => "BP",
    "shell" => "Shell",
    "shell recharge" => "Shell",
    "state grid" => "State Grid",
    "state grid corporation of china" => "State Grid",
    "国家电网" => "State Grid",
    "teld" => "TELD",
    "teld new energy" => "TELD",
    "特来电" => "TELD",
    "star charge" => "Star Charge",
    "星星充电" => "Star Charge",
    "(unknown operator)" => "Unknown",
    "(business owner at location)" => "Business Owner",
};

/// Operators recognised by a single word anywhere in the name, checked in
/// order after the alias table.
pub static OPERATOR_KEYWORDS: &[(&str, &str)] = &[
    ("tesla", "Tesla"),
    ("bp", "BP"),
    ("shell", "Shell"),
    ("teld", "TELD"),
];

/// Trims, collapses inner whitespace and lowercases.
pub fn fold(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Maps a raw operator name to its canonical form. Unrecognised names are
/// returned folded.
pub fn normalize_operator(raw: Option<&str>) -> String {
    let folded = fold(raw.unwrap_or_default());
    if folded.is_empty() {
        return UNKNOWN_OPERATOR.to_owned();
    }
    if let Some(canonical) = OPERATOR_ALIASES.get(folded.as_str()) {
        return (*canonical).to_owned();
    }
    let keyword_match = {
        let tokens = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .collect::<Vec<_>>();
        OPERATOR_KEYWORDS
            .iter()
            .find(|(keyword, _)| tokens.contains(keyword))
            .map(|(_, canonical)| *canonical)
    };
    keyword_match.map(str::to_owned).unwrap_or(folded)
}

pub fn is_tesla(operator_name: &str) -> bool {
    operator_name == TESLA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_canonical_names() {
        assert_eq!(normalize_operator(Some("TESLA, INC.")), "Tesla");
        assert_eq!(normalize_operator(Some("  Tesla   Motors  ")), "Tesla");
        assert_eq!(normalize_operator(Some("国家电网")), "State Grid");
        assert_eq!(normalize_operator(Some("(Unknown Operator)")), "Unknown");
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(normalize_operator(Some("BP Pulse UK")), "BP");
        assert_eq!(normalize_operator(Some("Shell Recharge Solutions")), "Shell");
        assert_eq!(normalize_operator(Some("Tesla (Destination)")), "Tesla");
        assert_eq!(normalize_operator(Some("BPower Charging")), "bpower charging");
    }

    #[test]
    fn unrecognised_names_pass_through_folded() {
        assert_eq!(normalize_operator(Some("  EVCharge  Co ")), "evcharge co");
    }

    #[test]
    fn missing_names_are_unknown() {
        assert_eq!(normalize_operator(None), UNKNOWN_OPERATOR);
        assert_eq!(normalize_operator(Some("   ")), UNKNOWN_OPERATOR);
    }

    #[test]
    fn tesla_is_an_exact_match_on_the_normalized_name() {
        assert!(is_tesla(&normalize_operator(Some("tesla motors inc."))));
        assert!(!is_tesla("tesla"));
        assert!(!is_tesla("Teslas"));
    }
}
