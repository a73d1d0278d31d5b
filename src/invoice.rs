//! Quotation model: clients, line items, technical details and totals
//!
//! Dimensions are millimetres, prices are per square foot. Stored totals in
//! incoming JSON (`areaSqft`, `total`, `subtotal`, `grandTotal`) are ignored
//! and always recomputed from the line items, so a quotation can never carry
//! a total that disagrees with its items.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

/// Square millimetres per square foot (304.8 mm squared)
pub const SQ_MM_PER_SQ_FT: f64 = 92_903.04;

pub const DEFAULT_CGST_RATE: f64 = 9.0;
pub const DEFAULT_SGST_RATE: f64 = 9.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BankDetails {
    pub account_name: String,
    pub account_number: String,
    pub ifsc: String,
    pub bank_name: String,
}

/// The issuing company, shown in the preview header
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub gstin: Option<String>,
    pub bank_details: Option<BankDetails>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Client {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub gstin: Option<String>,
}

/// Product type of a line item. Names outside the known set (older records
/// carry `Standard`, for example) are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductKind {
    #[default]
    Window,
    Door,
    Slider,
    Fixed,
    Ventilator,
    Standard,
    Other(String),
}

impl ProductKind {
    pub fn as_str(&self) -> &str {
        match self {
            ProductKind::Window => "Window",
            ProductKind::Door => "Door",
            ProductKind::Slider => "Slider",
            ProductKind::Fixed => "Fixed",
            ProductKind::Ventilator => "Ventilator",
            ProductKind::Standard => "Standard",
            ProductKind::Other(name) => name,
        }
    }
}

impl From<String> for ProductKind {
    fn from(name: String) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "window" => ProductKind::Window,
            "door" => ProductKind::Door,
            "slider" => ProductKind::Slider,
            "fixed" => ProductKind::Fixed,
            "ventilator" => ProductKind::Ventilator,
            "standard" => ProductKind::Standard,
            _ => ProductKind::Other(name),
        }
    }
}

impl From<ProductKind> for String {
    fn from(kind: ProductKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TechnicalDetails {
    pub system: String,
    pub profiles: String,
    pub glazing: String,
    pub hardware: String,
    pub finish: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: String,
    /// Installation position label, e.g. `001 LIVING ROOM`. Stored records
    /// may carry a plain number.
    #[serde(deserialize_with = "position_label")]
    pub position: String,
    pub quantity: u32,
    pub description: String,
    /// Width in millimetres
    pub width: f64,
    /// Height in millimetres
    pub height: f64,
    pub price_per_sqft: f64,
    pub technical_details: TechnicalDetails,
    pub remarks: Option<String>,
}

impl Default for InvoiceItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            position: String::new(),
            quantity: 1,
            description: String::new(),
            width: 0.0,
            height: 0.0,
            price_per_sqft: 0.0,
            technical_details: TechnicalDetails::default(),
            remarks: None,
        }
    }
}

fn position_label<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Label>::deserialize(deserializer)? {
        Some(Label::Text(text)) => text,
        Some(Label::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

impl InvoiceItem {
    /// Area of one unit in square feet
    pub fn area_sqft(&self) -> f64 {
        self.width * self.height / SQ_MM_PER_SQ_FT
    }

    /// A quantity of zero is billed as one unit
    pub fn billed_quantity(&self) -> u32 {
        self.quantity.max(1)
    }

    pub fn line_total(&self) -> f64 {
        self.area_sqft() * self.price_per_sqft * self.billed_quantity() as f64
    }
}

/// Lifecycle state. Both the lowercase and the capitalized spellings used by
/// older records are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    #[serde(alias = "Draft")]
    Draft,
    #[serde(alias = "Sent")]
    Sent,
    Viewed,
    Accepted,
    Rejected,
    #[serde(alias = "Paid")]
    Paid,
    #[serde(alias = "Cancelled")]
    Cancelled,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Sent => "Sent",
            InvoiceStatus::Viewed => "Viewed",
            InvoiceStatus::Accepted => "Accepted",
            InvoiceStatus::Rejected => "Rejected",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Invoice {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub invoice_number: String,
    /// ISO date, `YYYY-MM-DD` or a full timestamp
    pub date: String,
    pub prepared_by: String,
    pub client_id: Option<String>,
    pub client_name: String,
    pub client_address: String,
    pub items: Vec<InvoiceItem>,
    pub freight: f64,
    pub discount: f64,
    pub cgst_rate: f64,
    pub sgst_rate: f64,
    pub igst_rate: f64,
    pub status: InvoiceStatus,
    pub terms_and_conditions: Vec<String>,
    pub notes: Option<String>,
}

impl Default for Invoice {
    fn default() -> Self {
        Self {
            id: None,
            invoice_number: String::new(),
            date: String::new(),
            prepared_by: String::new(),
            client_id: None,
            client_name: String::new(),
            client_address: String::new(),
            items: Vec::new(),
            freight: 0.0,
            discount: 0.0,
            cgst_rate: DEFAULT_CGST_RATE,
            sgst_rate: DEFAULT_SGST_RATE,
            igst_rate: 0.0,
            status: InvoiceStatus::Draft,
            terms_and_conditions: Vec::new(),
            notes: None,
        }
    }
}

/// Computed money amounts for a quotation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub discount: f64,
    /// Subtotal after discount; the base for every tax line
    pub taxable: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
    pub freight: f64,
    pub grand_total: f64,
}

impl Invoice {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn totals(&self) -> Totals {
        let subtotal: f64 = self.items.iter().map(InvoiceItem::line_total).sum();
        let taxable = subtotal - self.discount;
        let cgst = taxable * self.cgst_rate / 100.0;
        let sgst = taxable * self.sgst_rate / 100.0;
        let igst = taxable * self.igst_rate / 100.0;
        Totals {
            subtotal,
            discount: self.discount,
            taxable,
            cgst,
            sgst,
            igst,
            freight: self.freight,
            grand_total: taxable + cgst + sgst + igst + self.freight,
        }
    }

    /// Total number of units across all line items
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(InvoiceItem::billed_quantity).sum()
    }
}

/// Format an amount with two decimals and Indian digit grouping
/// (`12,34,567.50`).
pub fn format_amount(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let grouped = if whole.len() <= 3 {
        whole
    } else {
        let (head, last3) = whole.split_at(whole.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 2 {
            parts.push(&head[end - 2..end]);
            end -= 2;
        }
        parts.push(&head[..end]);
        parts.reverse();
        format!("{},{}", parts.join(","), last3)
    };

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, frac)
}
