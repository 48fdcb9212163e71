//! Record types for the mock fulfillment tables
//!
//! Everything here is plain serde data. Order and SKU documents keep the
//! camelCase field names the storefront API emits; the routing tables use
//! snake_case.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Customer loyalty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Gold,
    Silver,
    Bronze,
    #[default]
    Standard,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Gold => "gold",
            Tier::Silver => "silver",
            Tier::Bronze => "bronze",
            Tier::Standard => "standard",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRM customer record
///
/// `zip_code` and `tier` are optional in the table so that incomplete CRM
/// rows can be represented and reported rather than rejected at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub tier: Option<Tier>,
}

/// Stock of one product at one fulfillment location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub location_id: String,
    pub product_id: String,
    pub quantity: u32,
}

/// A carrier offer for shipping one product over a lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub product_id: String,
    pub carrier: String,
    pub cost: f64,
    pub days: u32,
    pub co2_kg: f64,
}

/// All carrier offers from a source location into a destination zone,
/// in table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingLane {
    pub source_location: String,
    pub destination_zone: String,
    pub options: Vec<ShippingOption>,
}

/// Zip code to shipping zone map plus an optional fallback zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneTable {
    pub assignments: BTreeMap<String, String>,
    #[serde(default)]
    pub default_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductWeight {
    pub product_id: String,
    pub weight_kg: f64,
}

/// Storefront order document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: String,
    pub display_order_id: String,
    pub status: String,
    pub payment_status: String,
    pub order_type: String,
    pub date_created: String,
    pub internal_order_id: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
    pub order_summary: OrderSummary,
    #[serde(default)]
    pub shipping_groups: Vec<ShippingGroup>,
}

/// Money breakdown; amounts are decimal strings as the storefront renders them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub subtotal: String,
    pub discount: String,
    pub shipping: String,
    pub fees: String,
    pub adjustments: String,
    pub taxes: String,
    pub total: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingGroup {
    pub group_title: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub delivery_address: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub sku: String,
    pub product_name: String,
    pub image_url: String,
    pub quantity: u32,
    pub item_total: String,
    pub currency: String,
    #[serde(default)]
    pub status_progress: Vec<String>,
}

/// Availability state of a SKU in a sales channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    Available,
    #[serde(rename = "Low stock")]
    LowStock,
    Backorder,
    Preorder,
    Discontinued,
}

impl StockStatus {
    /// Whether units can ship now without waiting on replenishment
    pub fn is_on_hand(&self) -> bool {
        matches!(self, StockStatus::Available | StockStatus::LowStock)
    }
}

/// Channel-level inventory row for a SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuInventoryRecord {
    pub sku_code: String,
    pub product_name: String,
    pub location: String,
    pub channel: String,
    pub status: StockStatus,
    pub avail_to_purchase: u32,
    pub avail_to_backorder: u32,
    pub avail_to_preorder: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&Tier::Gold).unwrap(), "\"gold\"");
        let tier: Tier = serde_json::from_str("\"standard\"").unwrap();
        assert_eq!(tier, Tier::Standard);
        assert_eq!(Tier::default(), Tier::Standard);
    }

    #[test]
    fn test_customer_optional_fields_default_to_none() {
        let customer: Customer = serde_json::from_str(r#"{"id": "cust999"}"#).unwrap();
        assert_eq!(customer.id, "cust999");
        assert!(customer.zip_code.is_none());
        assert!(customer.tier.is_none());
    }

    #[test]
    fn test_stock_status_uses_display_names() {
        let status: StockStatus = serde_json::from_str("\"Low stock\"").unwrap();
        assert_eq!(status, StockStatus::LowStock);
        assert!(status.is_on_hand());
        assert!(!StockStatus::Preorder.is_on_hand());
    }

    #[test]
    fn test_order_record_camel_case() {
        let json = r##"{
            "orderId": "1", "displayOrderId": "#1", "status": "Shipped",
            "paymentStatus": "Paid", "orderType": "WEB", "dateCreated": "today",
            "internalOrderId": "abc", "customerName": "Jo", "customerEmail": "jo@example.com",
            "trackingNumber": null,
            "orderSummary": {"subtotal": "1.00", "discount": "0.00", "shipping": "0.00",
                "fees": "0.00", "adjustments": "0.00", "taxes": "0.00", "total": "1.00",
                "currency": "USD"},
            "shippingGroups": [{"groupTitle": "S1", "type": "Delivery",
                "deliveryAddress": "1 Road", "lineItems": []}]
        }"##;
        let order: OrderRecord = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_id, "1");
        assert_eq!(order.display_order_id, "#1");
        assert!(order.tracking_number.is_none());
        assert_eq!(order.shipping_groups[0].group_type, "Delivery");
    }
}
