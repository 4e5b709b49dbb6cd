use crate::error::LabelSheetError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

const MONEY_SCALE: u32 = 2;
const MONEY_UNIT: u64 = 100;

/// Non-negative price held in hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "MoneyRepr", into = "String")]
pub struct Money {
    minor: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MoneyRepr {
    Number(f64),
    Text(String),
}

impl Money {
    pub const ZERO: Money = Money { minor: 0 };

    pub fn from_minor(minor: u64) -> Self {
        Self { minor }
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    /// Parses form input such as `35.07`, `₹35.07` or `1,234.5`. An empty
    /// string is zero; negative amounts and text without digits are rejected.
    pub fn parse(raw: &str) -> Option<Money> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Some(Money::ZERO);
        }
        let mut int_digits: Vec<u8> = Vec::new();
        let mut frac_digits: Vec<u8> = Vec::new();
        let mut in_frac = false;

        let mut prev: Option<char> = None;
        for ch in raw.chars() {
            let started = !int_digits.is_empty() || in_frac;
            match ch {
                '-' => return None,
                '0'..='9' if in_frac => frac_digits.push(ch as u8 - b'0'),
                '0'..='9' => int_digits.push(ch as u8 - b'0'),
                // A dot closing a currency code ("Rs.") is part of the symbol.
                '.' if started || !prev.is_some_and(char::is_alphabetic) => {
                    if in_frac {
                        return None;
                    }
                    in_frac = true;
                }
                ',' if !int_digits.is_empty() && !in_frac => {}
                // Symbols, codes and spacing are tolerated only before the amount.
                _ if started => return None,
                _ => {}
            }
            prev = Some(ch);
        }

        if int_digits.is_empty() && frac_digits.is_empty() {
            return None;
        }

        let mut int_part: u64 = 0;
        for d in int_digits {
            int_part = int_part.checked_mul(10)?.checked_add(d as u64)?;
        }

        let mut frac_part: u64 = 0;
        for i in 0..MONEY_SCALE as usize {
            let d = frac_digits.get(i).copied().unwrap_or(0);
            frac_part = frac_part * 10 + d as u64;
        }
        if frac_digits.get(MONEY_SCALE as usize).copied().unwrap_or(0) >= 5 {
            frac_part += 1;
        }

        int_part.checked_mul(MONEY_UNIT)?.checked_add(frac_part).map(Money::from_minor)
    }

    pub fn from_f64(value: f64) -> Option<Money> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let minor = (value * MONEY_UNIT as f64).round();
        if minor > u64::MAX as f64 {
            return None;
        }
        Some(Money::from_minor(minor as u64))
    }

    /// Formats with `digits` decimals (rounding half up when fewer than two).
    pub fn format(&self, digits: u32) -> String {
        if digits >= MONEY_SCALE {
            let int_part = self.minor / MONEY_UNIT;
            let frac = self.minor % MONEY_UNIT;
            let pad = (digits - MONEY_SCALE) as usize;
            return format!("{int_part}.{frac:02}{}", "0".repeat(pad));
        }
        let drop = 10u64.pow(MONEY_SCALE - digits);
        let scaled = (self.minor + drop / 2) / drop;
        if digits == 0 {
            return scaled.to_string();
        }
        let unit = 10u64.pow(digits);
        format!(
            "{}.{:0width$}",
            scaled / unit,
            scaled % unit,
            width = digits as usize
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(MONEY_SCALE))
    }
}

impl TryFrom<MoneyRepr> for Money {
    type Error = String;

    fn try_from(value: MoneyRepr) -> Result<Self, Self::Error> {
        match value {
            MoneyRepr::Number(n) => {
                Money::from_f64(n).ok_or_else(|| format!("invalid price {n}"))
            }
            MoneyRepr::Text(s) => Money::parse(&s).ok_or_else(|| format!("invalid price {s:?}")),
        }
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_string()
    }
}

/// A submitted product description before quantity expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItem {
    pub name: String,
    pub net_content: String,
    pub batch_number: Option<String>,
    pub packing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub mrp: Money,
    #[serde(alias = "image")]
    pub image_ref: Option<String>,
    pub quantity: u32,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            name: String::new(),
            net_content: String::new(),
            batch_number: None,
            packing_date: None,
            expiry_date: None,
            mrp: Money::ZERO,
            image_ref: None,
            quantity: 1,
        }
    }
}

impl LineItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn net_content(mut self, net_content: impl Into<String>) -> Self {
        self.net_content = net_content.into();
        self
    }

    pub fn dates(mut self, packing: Option<NaiveDate>, expiry: Option<NaiveDate>) -> Self {
        self.packing_date = packing;
        self.expiry_date = expiry;
        self
    }

    pub fn mrp(mut self, mrp: Money) -> Self {
        self.mrp = mrp;
        self
    }

    pub fn image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn batch_number(mut self, batch_number: impl Into<String>) -> Self {
        self.batch_number = Some(batch_number.into());
        self
    }

    /// Copies to emit. Zero is read as one, like an empty quantity field.
    pub fn copies(&self) -> usize {
        self.quantity.max(1) as usize
    }

    pub fn validate(&self) -> Result<(), LabelSheetError> {
        validate_date_range(self.packing_date, self.expiry_date)
    }
}

pub fn validate_date_range(
    packing: Option<NaiveDate>,
    expiry: Option<NaiveDate>,
) -> Result<(), LabelSheetError> {
    match (packing, expiry) {
        (Some(packing), Some(expiry)) if expiry <= packing => {
            Err(LabelSheetError::InvalidDateRange { packing, expiry })
        }
        _ => Ok(()),
    }
}

/// Content of one physical label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelEntry {
    pub name: String,
    pub net_content: String,
    pub batch_number: String,
    pub packing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub mrp: Money,
    pub image_ref: Option<String>,
}

impl LabelEntry {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

impl From<&LineItem> for LabelEntry {
    fn from(item: &LineItem) -> Self {
        Self {
            name: item.name.clone(),
            net_content: item.net_content.clone(),
            batch_number: item.batch_number.clone().unwrap_or_default(),
            packing_date: item.packing_date,
            expiry_date: item.expiry_date,
            mrp: item.mrp,
            image_ref: item.image_ref.clone(),
        }
    }
}

pub fn expand_line_item(item: &LineItem) -> Result<Vec<LabelEntry>, LabelSheetError> {
    item.validate()?;
    let entry = LabelEntry::from(item);
    Ok(vec![entry; item.copies()])
}

pub fn format_display_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DISPLAY_DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn money_parses_form_input() {
        assert_eq!(Money::parse("35.07"), Some(Money::from_minor(3507)));
        assert_eq!(Money::parse("₹35.07"), Some(Money::from_minor(3507)));
        assert_eq!(Money::parse("Rs. 12"), Some(Money::from_minor(1200)));
        assert_eq!(Money::parse("1,234.5"), Some(Money::from_minor(123450)));
        assert_eq!(Money::parse("0.125"), Some(Money::from_minor(13)));
        assert_eq!(Money::parse(""), Some(Money::ZERO));
        assert_eq!(Money::parse("-1.00"), None);
        assert_eq!(Money::parse("abc"), None);
        assert_eq!(Money::parse("1.2.3"), None);
        assert_eq!(Money::parse("12kg"), None);
    }

    #[test]
    fn currency_codes_with_dots_keep_the_amount_whole() {
        assert_eq!(Money::parse("Rs.12"), Some(Money::from_minor(1200)));
        assert_eq!(Money::parse("Rs.12.50"), Some(Money::from_minor(1250)));
        assert_eq!(Money::parse("INR 7"), Some(Money::from_minor(700)));
        assert_eq!(Money::parse(".5"), Some(Money::from_minor(50)));
        assert_eq!(Money::parse("₹.75"), Some(Money::from_minor(75)));
    }

    #[test]
    fn separators_inside_the_amount_are_rejected() {
        assert_eq!(Money::parse("1 2"), None);
        assert_eq!(Money::parse("1+2"), None);
        assert_eq!(Money::parse("12. 5"), None);
        assert_eq!(Money::parse("+ 12"), Some(Money::from_minor(1200)));
        assert_eq!(Money::parse("₹ 1,299"), Some(Money::from_minor(129_900)));
    }

    #[test]
    fn money_formats_with_digits() {
        let price = Money::from_minor(3507);
        assert_eq!(price.to_string(), "35.07");
        assert_eq!(price.format(0), "35");
        assert_eq!(price.format(1), "35.1");
        assert_eq!(price.format(3), "35.070");
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
    }

    #[test]
    fn money_deserializes_from_number_or_text() {
        let from_text: Money = serde_json::from_str("\"49.90\"").expect("text");
        let from_number: Money = serde_json::from_str("49.9").expect("number");
        assert_eq!(from_text, from_number);
        assert!(serde_json::from_str::<Money>("-3").is_err());
        assert_eq!(serde_json::to_string(&from_text).expect("ser"), "\"49.90\"");
    }

    #[test]
    fn expansion_emits_quantity_copies_with_shared_batch() {
        let item = LineItem::new("Walnut Kernels")
            .net_content("250g")
            .mrp(Money::from_minor(45000))
            .batch_number("48213")
            .quantity(3);
        let entries = expand_line_item(&item).expect("expand");
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.batch_number == "48213"));
        assert!(entries.iter().all(|e| e == &entries[0]));
    }

    #[test]
    fn zero_quantity_emits_one_copy() {
        let item = LineItem::new("Saffron").quantity(0);
        assert_eq!(expand_line_item(&item).expect("expand").len(), 1);
    }

    #[test]
    fn quantity_is_not_capped() {
        let item = LineItem::new("Almonds").quantity(20);
        assert_eq!(expand_line_item(&item).expect("expand").len(), 20);
    }

    #[test]
    fn same_day_expiry_is_rejected() {
        let item = LineItem::new("Honey").dates(Some(date(2024, 1, 1)), Some(date(2024, 1, 1)));
        let err = expand_line_item(&item).expect_err("expiry must be after packing");
        assert!(matches!(err, LabelSheetError::InvalidDateRange { .. }));
    }

    #[test]
    fn open_date_ranges_are_accepted() {
        assert!(validate_date_range(Some(date(2024, 1, 1)), None).is_ok());
        assert!(validate_date_range(None, Some(date(2024, 1, 1))).is_ok());
        assert!(validate_date_range(Some(date(2024, 1, 1)), Some(date(2024, 1, 2))).is_ok());
        assert!(validate_date_range(Some(date(2024, 3, 1)), Some(date(2024, 1, 2))).is_err());
    }

    #[test]
    fn blank_entries_have_no_name() {
        assert!(LabelEntry::blank().is_blank());
        let mut entry = LabelEntry::blank();
        entry.name = "   ".to_string();
        assert!(entry.is_blank());
        entry.name = "Dates".to_string();
        assert!(!entry.is_blank());
    }

    #[test]
    fn display_dates_are_day_first_and_zero_padded() {
        assert_eq!(
            format_display_date(Some(date(2024, 3, 7))).as_deref(),
            Some("07/03/2024")
        );
        assert_eq!(format_display_date(None), None);
    }

    #[test]
    fn line_items_accept_web_field_names() {
        let json = r#"{
            "name": "Kashmiri Kahwa",
            "netContent": "100g",
            "packingDate": "2024-05-01",
            "expiryDate": "2025-05-01",
            "mrp": "199",
            "image": "/img/kahwa.png",
            "quantity": 4
        }"#;
        let item: LineItem = serde_json::from_str(json).expect("parse");
        assert_eq!(item.net_content, "100g");
        assert_eq!(item.mrp, Money::from_minor(19900));
        assert_eq!(item.image_ref.as_deref(), Some("/img/kahwa.png"));
        assert_eq!(item.quantity, 4);
        assert_eq!(item.batch_number, None);

        let minimal: LineItem = serde_json::from_str(r#"{"name":"Tea"}"#).expect("parse");
        assert_eq!(minimal.quantity, 1);
        assert_eq!(minimal.mrp, Money::ZERO);
    }
}
