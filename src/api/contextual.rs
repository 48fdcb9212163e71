//! Read-only views over the repository for the dashboard endpoints

use crate::data::{OrderRecord, Repository};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize)]
pub struct ContextualData {
    pub customers: Vec<CustomerRow>,
    pub products: Vec<String>,
    pub inventory: InventoryBreakdown,
    pub shipping_options: Vec<LaneSummary>,
    pub zone_assignments: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_zone: Option<String>,
    pub counts: Counts,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryBreakdown {
    pub total_products: usize,
    pub warehouses: Vec<String>,
    /// product -> location -> units
    pub by_product: BTreeMap<String, BTreeMap<String, u32>>,
    pub total_units: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaneSummary {
    pub source_location: String,
    pub destination_zone: String,
    pub products: Vec<String>,
    pub carriers: Vec<String>,
    pub option_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Counts {
    pub warehouses: usize,
    pub products: usize,
    pub customers: usize,
    pub zones: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRow {
    pub customer_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub zip_code: Option<String>,
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryRow {
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub order_total: String,
    pub order_status: String,
    pub payment_status: String,
}

impl From<&OrderRecord> for OrderSummaryRow {
    fn from(order: &OrderRecord) -> Self {
        let summary = &order.order_summary;
        let symbol = if summary.currency == "USD" {
            "$"
        } else {
            summary.currency.as_str()
        };

        Self {
            order_number: order.order_id.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            order_total: format!("{symbol}{}", summary.total),
            order_status: order.status.clone(),
            payment_status: order.payment_status.clone(),
        }
    }
}

pub fn customer_rows(repository: &dyn Repository) -> Vec<CustomerRow> {
    repository
        .customers()
        .iter()
        .map(|customer| CustomerRow {
            customer_id: customer.id.clone(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            zip_code: customer.zip_code.clone(),
            tier: customer.tier.map(|tier| tier.as_str().to_string()),
        })
        .collect()
}

pub fn order_rows<'a>(orders: impl IntoIterator<Item = &'a OrderRecord>) -> Vec<OrderSummaryRow> {
    orders.into_iter().map(OrderSummaryRow::from).collect()
}

/// Aggregate the tables for `/contextual-data`
pub fn build_contextual_data(repository: &dyn Repository) -> ContextualData {
    let mut by_product: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
    for record in repository.inventory() {
        by_product
            .entry(record.product_id.clone())
            .or_default()
            .insert(record.location_id.clone(), record.quantity);
    }
    let total_units = repository
        .inventory()
        .iter()
        .map(|record| u64::from(record.quantity))
        .sum();

    let shipping_options: Vec<LaneSummary> = repository
        .shipping_lanes()
        .iter()
        .map(|lane| LaneSummary {
            source_location: lane.source_location.clone(),
            destination_zone: lane.destination_zone.clone(),
            products: unique(lane.options.iter().map(|o| o.product_id.clone())),
            carriers: unique(lane.options.iter().map(|o| o.carrier.clone())),
            option_count: lane.options.len(),
        })
        .collect();

    let zones = repository.zones();
    let zone_ids: BTreeSet<&String> = zones
        .assignments
        .values()
        .chain(zones.default_zone.iter())
        .chain(repository.shipping_lanes().iter().map(|l| &l.destination_zone))
        .collect();

    let warehouses = repository.locations();
    let products = repository.products();
    let customers = customer_rows(repository);

    ContextualData {
        counts: Counts {
            warehouses: warehouses.len(),
            products: products.len(),
            customers: customers.len(),
            zones: zone_ids.len(),
        },
        inventory: InventoryBreakdown {
            total_products: by_product.len(),
            warehouses: warehouses.clone(),
            by_product,
            total_units,
        },
        customers,
        products,
        shipping_options,
        zone_assignments: zones.assignments.clone(),
        default_zone: zones.default_zone.clone(),
    }
}

fn unique(values: impl Iterator<Item = String>) -> Vec<String> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}
