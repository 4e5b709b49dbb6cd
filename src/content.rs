use crate::entry::{LabelEntry, format_display_date};
use serde::{Deserialize, Serialize};

const MISSING: &str = "-";

/// Shop details printed in each label's header and footer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelBranding {
    pub shop_name: String,
    pub shop_address: String,
    pub licence: String,
}

impl LabelBranding {
    pub fn is_empty(&self) -> bool {
        self.shop_name.is_empty() && self.shop_address.is_empty() && self.licence.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Currency {
    pub symbol: String,
    pub decimal_digits: u32,
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            symbol: "₹".to_string(),
            decimal_digits: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub caption: &'static str,
    pub value: String,
}

/// Text of one filled label, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelContent {
    pub shop_name: String,
    pub shop_address: String,
    pub licence: String,
    pub product_name: String,
    pub image_ref: Option<String>,
    pub rows: Vec<DetailRow>,
}

impl LabelContent {
    pub fn new(entry: &LabelEntry, branding: &LabelBranding, currency: &Currency) -> Self {
        let or_missing = |value: &str| {
            let value = value.trim();
            if value.is_empty() {
                MISSING.to_string()
            } else {
                value.to_string()
            }
        };
        let date = |date| format_display_date(date).unwrap_or_else(|| MISSING.to_string());
        let digits = currency.decimal_digits.min(4);
        let rows = vec![
            DetailRow {
                caption: "Net Content",
                value: or_missing(&entry.net_content),
            },
            DetailRow {
                caption: "Batch No",
                value: or_missing(&entry.batch_number),
            },
            DetailRow {
                caption: "Pkg Date",
                value: date(entry.packing_date),
            },
            DetailRow {
                caption: "Exp. Date",
                value: date(entry.expiry_date),
            },
            DetailRow {
                caption: "MRP",
                value: format!("{}{}", currency.symbol, entry.mrp.format(digits)),
            },
        ];
        Self {
            shop_name: branding.shop_name.clone(),
            shop_address: branding.shop_address.clone(),
            licence: branding.licence.clone(),
            product_name: entry.name.trim().to_string(),
            image_ref: entry.image_ref.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Money;
    use chrono::NaiveDate;

    #[test]
    fn missing_values_render_as_dash() {
        let entry = LabelEntry {
            name: "Dry Figs".to_string(),
            ..LabelEntry::default()
        };
        let content = LabelContent::new(&entry, &LabelBranding::default(), &Currency::default());
        let values: Vec<&str> = content.rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["-", "-", "-", "-", "₹0.00"]);
        assert_eq!(content.product_name, "Dry Figs");
    }

    #[test]
    fn filled_values_are_formatted() {
        let entry = LabelEntry {
            name: "Shilajit".to_string(),
            net_content: "20g".to_string(),
            batch_number: "31415".to_string(),
            packing_date: NaiveDate::from_ymd_opt(2024, 2, 9),
            expiry_date: NaiveDate::from_ymd_opt(2026, 2, 8),
            mrp: Money::from_minor(129_900),
            image_ref: Some("shilajit.png".to_string()),
        };
        let branding = LabelBranding {
            shop_name: "Valley Stores".to_string(),
            shop_address: "Main Bazar".to_string(),
            licence: "LIC No: 000".to_string(),
        };
        let currency = Currency {
            symbol: "Rs.".to_string(),
            decimal_digits: 2,
        };
        let content = LabelContent::new(&entry, &branding, &currency);
        let pairs: Vec<(&str, &str)> = content
            .rows
            .iter()
            .map(|r| (r.caption, r.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Net Content", "20g"),
                ("Batch No", "31415"),
                ("Pkg Date", "09/02/2024"),
                ("Exp. Date", "08/02/2026"),
                ("MRP", "Rs.1299.00"),
            ]
        );
        assert_eq!(content.shop_name, "Valley Stores");
        assert_eq!(content.image_ref.as_deref(), Some("shilajit.png"));
        assert!(!branding.is_empty());
        assert!(LabelBranding::default().is_empty());
    }
}
