use crate::types::CaseIndex;

/// Character pairs that spell the same morpheme in the two competing
/// scripts (台 and 臺 are both "Tai" in county names).
const SCRIPT_VARIANTS: &[(char, char)] = &[('台', '臺')];

/// Trailing administrative-unit characters: city, county, district,
/// rural township, urban township.
const UNIT_SUFFIXES: &[char] = &['市', '縣', '區', '鄉', '鎮'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub resolved_name: String,
    pub case_count: u64,
}

/// A single step of the name-matching cascade. Steps are pure and are
/// tried in order; the first to return `Some` wins.
type Strategy = fn(&str, &CaseIndex) -> Option<Match>;

const STRATEGIES: [Strategy; 5] = [
    exact,
    script_variant,
    suffix_stripped,
    containment,
    variant_containment,
];

/// Resolves a boundary feature's raw region name against the case
/// index. Never fails: an unmatched name comes back unchanged with a
/// count of zero.
pub fn resolve(raw_name: &str, index: &CaseIndex) -> Match {
    if !raw_name.is_empty() {
        for strategy in STRATEGIES {
            if let Some(m) = strategy(raw_name, index) {
                return m;
            }
        }
    }
    Match {
        resolved_name: raw_name.to_string(),
        case_count: 0,
    }
}

/// Alternate spellings of `name` under the script-variant table, in
/// both directions, excluding the input itself.
pub fn script_variants(name: &str) -> Vec<String> {
    let mut variants = Vec::new();
    for &(a, b) in SCRIPT_VARIANTS {
        if name.contains(a) {
            let swapped = name.replace(a, &b.to_string());
            if swapped != name && !variants.contains(&swapped) {
                variants.push(swapped);
            }
        }
        if name.contains(b) {
            let swapped = name.replace(b, &a.to_string());
            if swapped != name && !variants.contains(&swapped) {
                variants.push(swapped);
            }
        }
    }
    variants
}

/// Strips one trailing administrative-unit character, if present.
pub fn strip_unit_suffix(name: &str) -> &str {
    name.strip_suffix(UNIT_SUFFIXES).unwrap_or(name)
}

fn exact(raw: &str, index: &CaseIndex) -> Option<Match> {
    index.get(raw).map(|count| Match {
        resolved_name: raw.to_string(),
        case_count: count,
    })
}

fn script_variant(raw: &str, index: &CaseIndex) -> Option<Match> {
    for variant in script_variants(raw) {
        if let Some(count) = index.get(&variant) {
            return Some(Match {
                resolved_name: variant,
                case_count: count,
            });
        }
    }
    None
}

fn suffix_stripped(raw: &str, index: &CaseIndex) -> Option<Match> {
    let stripped = strip_unit_suffix(raw);
    for key in index.keys() {
        if strip_unit_suffix(key) == stripped {
            return Some(Match {
                resolved_name: key.to_string(),
                case_count: index.get(key).unwrap_or(0),
            });
        }
    }
    None
}

fn containment(raw: &str, index: &CaseIndex) -> Option<Match> {
    containment_of(strip_unit_suffix(raw), index)
}

fn variant_containment(raw: &str, index: &CaseIndex) -> Option<Match> {
    for variant in script_variants(strip_unit_suffix(raw)) {
        if let Some(m) = containment_of(&variant, index) {
            return Some(m);
        }
    }
    None
}

fn containment_of(stripped: &str, index: &CaseIndex) -> Option<Match> {
    if stripped.is_empty() {
        return None;
    }
    for key in index.keys() {
        let stripped_key = strip_unit_suffix(key);
        if stripped_key.is_empty() {
            continue;
        }
        if stripped.contains(stripped_key) || stripped_key.contains(stripped) {
            return Some(Match {
                resolved_name: key.to_string(),
                case_count: index.get(key).unwrap_or(0),
            });
        }
    }
    None
}

/// All known spellings of a county name: the name itself, its
/// suffix-stripped short form, the script-variant of each, and the
/// 市/縣 swap (counties that were upgraded to cities still appear under
/// the old suffix in some boundary files).
pub fn county_variants(county: &str) -> Vec<String> {
    let mut variants = vec![county.to_string()];
    let mut push = |v: String| {
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    };
    push(strip_unit_suffix(county).to_string());
    for swapped in script_variants(county) {
        push(strip_unit_suffix(&swapped).to_string());
        push(swapped);
    }
    if let Some(base) = county.strip_suffix('市') {
        push(format!("{}縣", base));
        for swapped in script_variants(base) {
            push(format!("{}縣", swapped));
        }
    }
    variants
}

/// Pre-filter for township maps: does the feature's declared parent
/// county denote the target county under any known variant? Tested by
/// exact equality, containment in either direction, and stripped-form
/// equality or containment.
pub fn parent_matches(feature_county: &str, variants: &[String]) -> bool {
    if feature_county.is_empty() {
        return false;
    }
    let feature_stripped = strip_unit_suffix(feature_county);
    variants.iter().any(|variant| {
        let variant_stripped = strip_unit_suffix(variant);
        feature_county == variant
            || feature_county.contains(variant.as_str())
            || variant.contains(feature_county)
            || feature_stripped == variant_stripped
            || feature_stripped.contains(variant_stripped)
            || variant_stripped.contains(feature_stripped)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, u64)]) -> CaseIndex {
        let mut idx = CaseIndex::new();
        for (name, count) in entries {
            idx.insert(name, *count);
        }
        idx
    }

    #[test]
    fn exact_match_wins() {
        let idx = index(&[("高雄市", 120)]);
        let m = resolve("高雄市", &idx);
        assert_eq!(m.resolved_name, "高雄市");
        assert_eq!(m.case_count, 120);
    }

    #[test]
    fn script_variant_match() {
        let idx = index(&[("台南市", 80)]);
        let m = resolve("臺南市", &idx);
        assert_eq!(m.resolved_name, "台南市");
        assert_eq!(m.case_count, 80);
    }

    #[test]
    fn script_variant_symmetry() {
        let a = index(&[("臺東縣", 7)]);
        let b = index(&[("台東縣", 7)]);
        assert_eq!(resolve("台東縣", &a).case_count, 7);
        assert_eq!(resolve("臺東縣", &b).case_count, 7);
    }

    #[test]
    fn suffix_stripped_match_both_ways() {
        let idx = index(&[("鳳山區", 30)]);
        assert_eq!(resolve("鳳山", &idx).case_count, 30);

        let idx = index(&[("鳳山", 30)]);
        assert_eq!(resolve("鳳山區", &idx).case_count, 30);
    }

    #[test]
    fn empty_index_never_matches() {
        let idx = CaseIndex::new();
        let m = resolve("高雄市", &idx);
        assert_eq!(m.case_count, 0);
        assert_eq!(m.resolved_name, "高雄市");
    }

    #[test]
    fn empty_name_never_matches() {
        let idx = index(&[("高雄市", 120)]);
        assert_eq!(resolve("", &idx).case_count, 0);
    }

    #[test]
    fn unknown_sentinel_excluded_from_index() {
        let idx = index(&[("未知", 99), ("高雄市", 5)]);
        assert_eq!(idx.len(), 1);
        assert_eq!(resolve("未知", &idx).case_count, 0);
    }

    #[test]
    fn containment_match() {
        // Older boundary files carry merged-era names like 台南縣新營市,
        // whose stripped form still contains the district's short name.
        let idx = index(&[("台南縣新營市", 12)]);
        let m = resolve("新營", &idx);
        assert_eq!(m.case_count, 12);
        assert_eq!(m.resolved_name, "台南縣新營市");
    }

    #[test]
    fn variant_plus_containment_match() {
        let idx = index(&[("台西鄉", 3)]);
        assert_eq!(resolve("臺西", &idx).case_count, 3);
    }

    #[test]
    fn first_strategy_wins_over_later_ones() {
        // 左營區 matches exactly; the stripped form also appears under
        // a different key but must not be consulted.
        let idx = index(&[("左營區", 10), ("左營", 99)]);
        let m = resolve("左營區", &idx);
        assert_eq!(m.case_count, 10);
    }

    #[test]
    fn resolve_is_idempotent() {
        let idx = index(&[("台南市", 80), ("高雄市", 120)]);
        let first = resolve("臺南市", &idx);
        let second = resolve("臺南市", &idx);
        assert_eq!(first, second);
    }

    #[test]
    fn last_write_wins_on_duplicate_keys() {
        let idx = index(&[("高雄市", 1), ("高雄市", 2)]);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("高雄市"), Some(2));
    }

    #[test]
    fn county_variants_cover_script_and_suffix_forms() {
        let variants = county_variants("台南市");
        for expected in ["台南市", "台南", "臺南市", "臺南", "台南縣", "臺南縣"] {
            assert!(variants.iter().any(|v| v == expected), "missing {expected}");
        }
    }

    #[test]
    fn parent_filter_accepts_variants() {
        let variants = county_variants("高雄市");
        assert!(parent_matches("高雄市", &variants));
        assert!(parent_matches("高雄縣", &variants));
        assert!(parent_matches("高雄", &variants));
    }

    #[test]
    fn parent_filter_rejects_other_counties() {
        let variants = county_variants("台南市");
        assert!(!parent_matches("高雄市", &variants));
        assert!(!parent_matches("屏東縣", &variants));
        assert!(!parent_matches("", &variants));
    }

    #[test]
    fn strip_unit_suffix_only_strips_one_char() {
        assert_eq!(strip_unit_suffix("鳳山區"), "鳳山");
        assert_eq!(strip_unit_suffix("鳳山"), "鳳山");
        assert_eq!(strip_unit_suffix("市"), "");
    }
}
