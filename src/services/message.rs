//! Notification message rendering.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::{Listing, NotifyConfig};

/// What a run has to report.
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    /// Listings not seen before
    NewListings(&'a [Listing]),
    /// Listings fetched, none new
    NoNewListings { total: usize },
    /// First run recorded its baseline
    Baseline { total: usize },
    /// No listing could be extracted at all
    NothingFetched,
}

impl Notification<'_> {
    /// Render the message text, capped at `max_message_chars`.
    pub fn render(&self, config: &NotifyConfig) -> String {
        let text = match self {
            Notification::NewListings(listings) => render_new(listings, config),
            Notification::NoNewListings { total } => [
                ":information_source: Rent Monitor 実行結果".to_string(),
                format!("取得件数: {total}"),
                "新着件数: 0".to_string(),
            ]
            .join("\n"),
            Notification::Baseline { total } => [
                ":information_source: Rent Monitor 初回実行".to_string(),
                format!("取得件数: {total}"),
                "既存物件として記録しました (新着通知なし)".to_string(),
            ]
            .join("\n"),
            Notification::NothingFetched => ":warning: Rent Monitor 取得件数 0".to_string(),
        };
        truncate_message(&text, config.max_message_chars)
    }
}

fn render_new(listings: &[Listing], config: &NotifyConfig) -> String {
    let mut lines = vec![
        format!(":house: Rent Monitor 新着 {} 件", listings.len()),
        "[賃貸新着通知] 検索URLの新着物件があります".to_string(),
        String::new(),
    ];

    for listing in listings.iter().take(config.max_items) {
        lines.push(listing.format(&config.item_template));
        lines.push(String::new());
    }

    let hidden = listings.len().saturating_sub(config.max_items);
    if hidden > 0 {
        lines.push(format!("…ほか {hidden} 件"));
    }

    lines.join("\n").trim().to_string()
}

/// Cut `text` to at most `max_chars` graphemes, ending with `…` when cut.
pub fn truncate_message(text: &str, max_chars: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = graphemes[..max_chars.saturating_sub(1)].concat();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str, name: &str) -> Listing {
        Listing {
            property_id: id.to_string(),
            site: "suumo".to_string(),
            name: name.to_string(),
            detail_url: format!("https://suumo.jp/chintai/{id}/"),
            rent_yen: 80_000,
            management_fee_yen: 4_000,
            parking_fee_yen: 0,
            total_yen: 84_000,
            layout: "1K".to_string(),
            area_m2: Some(25.0),
            age_years: None,
            nearest_station: "中野駅".to_string(),
            station_walk_min: Some(5),
        }
    }

    #[test]
    fn test_new_listings_message() {
        let listings = vec![listing("jnc_1", "ハイツA"), listing("jnc_2", "ハイツB")];
        let text = Notification::NewListings(&listings).render(&NotifyConfig::default());

        assert!(text.starts_with(":house: Rent Monitor 新着 2 件\n"));
        assert!(text.contains("・[suumo] ハイツA"));
        assert!(text.contains("合計: 84,000円 (家賃80,000/管理費4,000/駐車場0)"));
        assert!(text.contains("間取り: 1K / 25.0㎡ / 築不明年"));
        assert!(text.contains("最寄: 中野駅 徒歩5分"));
        assert!(text.contains("URL: https://suumo.jp/chintai/jnc_2/"));
        assert!(!text.contains("ほか"));
    }

    #[test]
    fn test_summary_is_capped_at_max_items() {
        let listings: Vec<Listing> = (0..5)
            .map(|i| listing(&format!("jnc_{i}"), &format!("ハイツ{i}")))
            .collect();
        let config = NotifyConfig {
            max_items: 2,
            ..NotifyConfig::default()
        };
        let text = Notification::NewListings(&listings).render(&config);

        assert!(text.contains("新着 5 件"));
        assert!(text.contains("ハイツ1"));
        assert!(!text.contains("ハイツ2"));
        assert!(text.ends_with("…ほか 3 件"));
    }

    #[test]
    fn test_zero_new_messages() {
        let config = NotifyConfig::default();
        assert_eq!(
            Notification::NoNewListings { total: 12 }.render(&config),
            ":information_source: Rent Monitor 実行結果\n取得件数: 12\n新着件数: 0"
        );
        assert!(
            Notification::Baseline { total: 4 }
                .render(&config)
                .contains("取得件数: 4")
        );
        assert_eq!(
            Notification::NothingFetched.render(&config),
            ":warning: Rent Monitor 取得件数 0"
        );
    }

    #[test]
    fn test_message_is_truncated() {
        let listings: Vec<Listing> = (0..50)
            .map(|i| listing(&format!("jnc_{i}"), &"長い名前".repeat(20)))
            .collect();
        let config = NotifyConfig {
            max_items: 50,
            max_message_chars: 500,
            ..NotifyConfig::default()
        };
        let text = Notification::NewListings(&listings).render(&config);
        assert_eq!(text.graphemes(true).count(), 500);
        assert!(text.ends_with('…'));
    }

    #[test]
    fn test_truncate_keeps_grapheme_clusters() {
        let text = "👨‍👩‍👧abc";
        assert_eq!(truncate_message(text, 10), text);
        assert_eq!(truncate_message(text, 2), "👨‍👩‍👧…");
    }
}
