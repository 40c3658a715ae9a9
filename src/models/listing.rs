//! Listing data structure.

use serde::{Deserialize, Serialize};

/// Placeholder rendered for fields the page did not expose.
pub const UNKNOWN: &str = "不明";

/// A rental listing extracted from a search result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    /// Site-local identifier derived from the detail URL
    pub property_id: String,

    /// Key of the site rule that produced this listing
    pub site: String,

    /// Building or listing name
    pub name: String,

    /// Absolute URL of the detail page
    pub detail_url: String,

    /// Monthly rent in yen
    pub rent_yen: u64,

    /// Management / common-area fee in yen
    pub management_fee_yen: u64,

    /// Parking fee in yen
    pub parking_fee_yen: u64,

    /// Rent plus fees
    pub total_yen: u64,

    /// Floor plan (e.g., "2LDK"), empty if unknown
    pub layout: String,

    /// Floor area in square meters
    pub area_m2: Option<f64>,

    /// Building age in years
    pub age_years: Option<f64>,

    /// Nearest station name, empty if unknown
    pub nearest_station: String,

    /// Walking minutes to the nearest station
    pub station_walk_min: Option<u32>,
}

impl Listing {
    /// Identifier stable across runs: `{site}:{property_id}`.
    pub fn unique_id(&self) -> String {
        format!("{}:{}", self.site, self.property_id)
    }

    /// Format listing for display using a template.
    ///
    /// Supported placeholders:
    /// - `{site}`, `{name}`, `{url}`, `{layout}`, `{station}`
    /// - `{total}`, `{rent}`, `{management_fee}`, `{parking_fee}` (yen, grouped)
    /// - `{area}` (one decimal), `{age}`, `{walk}`
    pub fn format(&self, template: &str) -> String {
        let area = self
            .area_m2
            .map_or_else(|| UNKNOWN.to_string(), |a| format!("{a:.1}"));
        let age = self
            .age_years
            .map_or_else(|| UNKNOWN.to_string(), format_compact);
        let walk = self
            .station_walk_min
            .map_or_else(|| UNKNOWN.to_string(), |w| w.to_string());

        template
            .replace("{site}", &self.site)
            .replace("{name}", &self.name)
            .replace("{url}", &self.detail_url)
            .replace("{layout}", &self.layout)
            .replace("{station}", &self.nearest_station)
            .replace("{total}", &format_yen(self.total_yen))
            .replace("{rent}", &format_yen(self.rent_yen))
            .replace("{management_fee}", &format_yen(self.management_fee_yen))
            .replace("{parking_fee}", &format_yen(self.parking_fee_yen))
            .replace("{area}", &area)
            .replace("{age}", &age)
            .replace("{walk}", &walk)
    }
}

/// Group digits with commas: `123456` -> `"123,456"`.
pub fn format_yen(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Shortest decimal rendering: `5.0` -> `"5"`, `0.25` -> `"0.25"`.
fn format_compact(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
