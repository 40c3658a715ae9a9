//! Field extraction from the flattened text of a listing card.
//!
//! Listing cards on Japanese rental sites render rent, fees, floor plan,
//! area, building age and station access as loose text. These helpers pull
//! each field out with a dedicated pattern and return zero / `None` when the
//! card does not mention it.

use std::sync::LazyLock;

use regex::Regex;

/// Labels introducing the monthly rent.
pub const RENT_LABELS: &[&str] = &["賃料", "家賃"];
/// Labels introducing the management fee.
pub const MANAGEMENT_LABELS: &[&str] = &["管理費", "共益費"];
/// Labels introducing the parking fee.
pub const PARKING_LABELS: &[&str] = &["駐車場", "駐車料金"];

static LABELLED_MONEY: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    RENT_LABELS
        .iter()
        .chain(MANAGEMENT_LABELS)
        .chain(PARKING_LABELS)
        .map(|label| {
            let pattern =
                format!(r"{label}[^0-9\-]*([0-9]+(?:\.[0-9]+)?万円|[0-9,]+円|-)");
            (*label, Regex::new(&pattern).expect("valid money regex"))
        })
        .collect()
});

static MAN_YEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?万円)").expect("valid 万円 regex"));

static LAYOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([1-4]LDK|[1-4]DK|[1-4]K|ワンルーム)\b").expect("valid layout regex")
});

static AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*(?:m2|㎡)").expect("valid area regex")
});

static AGE_YEARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"築\s*([0-9]+)\s*年").expect("valid age regex"));

static AGE_MONTHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"築\s*([0-9]+)\s*ヶ月").expect("valid age-months regex"));

static WALK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"徒歩\s*([0-9]+)\s*分").expect("valid walk regex"));

static STATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\w\x{3000}-\x{9fff}]+駅)").expect("valid station regex")
});

/// Collapse whitespace runs into single spaces and trim.
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Amounts above this are treated as unparsable.
const MAX_YEN: f64 = 1e15;

/// Convert a money token (`8.5万円`, `5,000円`, `-`) to yen.
pub fn to_yen(token: &str) -> u64 {
    let token = token.replace(',', "");
    let token = token.trim();
    if token.is_empty() || token.starts_with('-') {
        return 0;
    }

    if token.contains("万円") {
        let number: String = token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        return number
            .parse::<f64>()
            .ok()
            .map(|n| (n * 10_000.0).round())
            .filter(|yen| yen.is_finite() && *yen >= 0.0 && *yen <= MAX_YEN)
            .map_or(0, |yen| yen as u64);
    }

    let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Find the first amount introduced by one of `labels`, tried in order.
pub fn money_by_label(text: &str, labels: &[&str]) -> u64 {
    for label in labels {
        let matched = LABELLED_MONEY
            .iter()
            .find(|(known, _)| known == label)
            .and_then(|(_, re)| re.captures(text))
            .and_then(|caps| caps.get(1));
        if let Some(m) = matched {
            return to_yen(m.as_str());
        }
    }
    0
}

/// Monthly rent: labelled amount, else the first `N万円` in the text.
pub fn rent(text: &str) -> u64 {
    match money_by_label(text, RENT_LABELS) {
        0 => MAN_YEN
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map_or(0, |m| to_yen(m.as_str())),
        rent => rent,
    }
}

/// Floor plan such as `2LDK` or `ワンルーム`; empty when absent.
pub fn layout(text: &str) -> String {
    LAYOUT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or_else(String::new, |m| m.as_str().to_string())
}

/// Floor area in square meters.
pub fn area_m2(text: &str) -> Option<f64> {
    AREA.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Building age in years; `新築` (new build) is zero.
pub fn age_years(text: &str) -> Option<f64> {
    if text.contains("新築") {
        return Some(0.0);
    }
    if let Some(years) = capture_number(&AGE_YEARS, text) {
        return Some(years as f64);
    }
    capture_number(&AGE_MONTHS, text).map(|months| (months as f64 / 12.0 * 100.0).round() / 100.0)
}

/// Walking minutes to the station.
pub fn walk_minutes(text: &str) -> Option<u32> {
    capture_number(&WALK, text)
}

/// First station name (a word ending in `駅`); empty when absent.
pub fn station(text: &str) -> String {
    STATION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or_else(String::new, |m| normalize_space(m.as_str()))
}

fn capture_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = "パークハイツ渋谷 賃料 8.5万円 管理費 5,000円 駐車場 - \
                        2LDK 55.2m2 築15年 JR山手線/渋谷駅 徒歩7分";

    #[test]
    fn test_normalize_space() {
        assert_eq!(normalize_space("  a \n\t b  c "), "a b c");
        assert_eq!(normalize_space("   "), "");
    }

    #[test]
    fn test_to_yen() {
        assert_eq!(to_yen("8.5万円"), 85_000);
        assert_eq!(to_yen("7.3万円"), 73_000);
        assert_eq!(to_yen("12万円"), 120_000);
        assert_eq!(to_yen("5,000円"), 5_000);
        assert_eq!(to_yen("-"), 0);
        assert_eq!(to_yen(""), 0);
    }

    #[test]
    fn test_to_yen_out_of_range_is_zero() {
        assert_eq!(to_yen("99999999999999999999万円"), 0);
        assert_eq!(to_yen("99999999999999999999999円"), 0);
        assert_eq!(to_yen("1.2.3万円"), 0);
    }

    #[test]
    fn test_money_fields() {
        assert_eq!(rent(CARD), 85_000);
        assert_eq!(money_by_label(CARD, MANAGEMENT_LABELS), 5_000);
        assert_eq!(money_by_label(CARD, PARKING_LABELS), 0);
    }

    #[test]
    fn test_rent_falls_back_to_first_man_yen() {
        assert_eq!(rent("ワンルーム 6.2万円 / 3000円"), 62_000);
        assert_eq!(rent("お問い合わせください"), 0);
    }

    #[test]
    fn test_second_label_used_when_first_absent() {
        assert_eq!(money_by_label("共益費 3,000円", MANAGEMENT_LABELS), 3_000);
        assert_eq!(money_by_label("家賃 9万円", RENT_LABELS), 90_000);
    }

    #[test]
    fn test_layout_area_age_walk_station() {
        assert_eq!(layout(CARD), "2LDK");
        assert_eq!(area_m2(CARD), Some(55.2));
        assert_eq!(age_years(CARD), Some(15.0));
        assert_eq!(walk_minutes(CARD), Some(7));
        assert_eq!(station(CARD), "渋谷駅");
    }

    #[test]
    fn test_age_variants() {
        assert_eq!(age_years("新築 1K"), Some(0.0));
        assert_eq!(age_years("築 5 ヶ月"), Some(0.42));
        assert_eq!(age_years("築年数不詳"), None);
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(layout("no plan"), "");
        assert_eq!(area_m2("no area"), None);
        assert_eq!(walk_minutes("バス10分"), None);
        assert_eq!(station("no station"), "");
    }
}
