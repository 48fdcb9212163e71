//! Read-only repository over the fulfillment tables
//!
//! Lookup tools and the orchestrator only see the [`Repository`] trait, so
//! tests can inject hand-built tables and the server can load fixtures from
//! disk without touching tool code.

use super::model::{
    Customer, InventoryRecord, OrderRecord, ProductWeight, ShippingLane, SkuInventoryRecord,
    ZoneTable,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const CUSTOMERS_FILE: &str = "customers.json";
const INVENTORY_FILE: &str = "inventory.json";
const SHIPPING_FILE: &str = "shipping.json";
const ZONES_FILE: &str = "zones.json";
const PRODUCTS_FILE: &str = "products.json";
const ORDERS_FILE: &str = "orders.json";
const SKU_INVENTORY_FILE: &str = "sku_inventory.json";

/// Errors raised while loading fixture tables
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read fixture {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse fixture {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Fixture data violates {} integrity rule(s): {}", .0.len(), summarize(.0))]
    Integrity(Vec<IntegrityViolation>),
}

fn summarize(violations: &[IntegrityViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A broken cross-table invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrityViolation {
    #[error("product {product_id} is stocked but has no weight entry")]
    MissingProductWeight { product_id: String },
    #[error("customer {customer_id} zip {zip_code} resolves to no zone")]
    UnresolvableZip {
        customer_id: String,
        zip_code: String,
    },
    #[error("{carrier} on {source_location}->{destination_zone} has non-positive cost {cost}")]
    NonPositiveCost {
        source_location: String,
        destination_zone: String,
        carrier: String,
        cost: f64,
    },
    #[error("{carrier} on {source_location}->{destination_zone} has zero transit days")]
    ZeroTransitDays {
        source_location: String,
        destination_zone: String,
        carrier: String,
    },
    #[error("{carrier} on {source_location}->{destination_zone} has negative co2 {co2_kg}")]
    NegativeEmissions {
        source_location: String,
        destination_zone: String,
        carrier: String,
        co2_kg: f64,
    },
}

/// Read-only access to every mock table
pub trait Repository: Send + Sync {
    fn customers(&self) -> &[Customer];
    fn inventory(&self) -> &[InventoryRecord];
    fn shipping_lanes(&self) -> &[ShippingLane];
    fn zones(&self) -> &ZoneTable;
    fn product_weights(&self) -> &[ProductWeight];
    fn orders(&self) -> &[OrderRecord];
    fn sku_inventory(&self) -> &[SkuInventoryRecord];

    fn customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customers().iter().find(|c| c.id == customer_id)
    }

    fn order(&self, order_id: &str) -> Option<&OrderRecord> {
        self.orders().iter().find(|o| o.order_id == order_id)
    }

    fn sku(&self, sku_code: &str) -> Option<&SkuInventoryRecord> {
        self.sku_inventory().iter().find(|s| s.sku_code == sku_code)
    }

    fn shipping_lane(&self, source_location: &str, destination_zone: &str) -> Option<&ShippingLane> {
        self.shipping_lanes().iter().find(|lane| {
            lane.source_location == source_location && lane.destination_zone == destination_zone
        })
    }

    fn product_weight(&self, product_id: &str) -> Option<f64> {
        self.product_weights()
            .iter()
            .find(|w| w.product_id == product_id)
            .map(|w| w.weight_kg)
    }

    /// Inventory rows for one product, in table order
    fn stock_for_product(&self, product_id: &str) -> Vec<&InventoryRecord> {
        self.inventory()
            .iter()
            .filter(|r| r.product_id == product_id)
            .collect()
    }

    /// Distinct fulfillment locations, sorted
    fn locations(&self) -> Vec<String> {
        self.inventory()
            .iter()
            .map(|r| r.location_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct product ids across inventory and weights, sorted
    fn products(&self) -> Vec<String> {
        self.inventory()
            .iter()
            .map(|r| r.product_id.clone())
            .chain(self.product_weights().iter().map(|w| w.product_id.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Check the cross-table invariants; empty means consistent
    fn check_integrity(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        let stocked: BTreeSet<&str> = self
            .inventory()
            .iter()
            .map(|r| r.product_id.as_str())
            .collect();
        for product_id in stocked {
            if self.product_weight(product_id).is_none() {
                violations.push(IntegrityViolation::MissingProductWeight {
                    product_id: product_id.to_string(),
                });
            }
        }

        let zones = self.zones();
        for customer in self.customers() {
            if let Some(zip) = &customer.zip_code {
                if !zones.assignments.contains_key(zip) && zones.default_zone.is_none() {
                    violations.push(IntegrityViolation::UnresolvableZip {
                        customer_id: customer.id.clone(),
                        zip_code: zip.clone(),
                    });
                }
            }
        }

        for lane in self.shipping_lanes() {
            for option in &lane.options {
                if option.cost <= 0.0 {
                    violations.push(IntegrityViolation::NonPositiveCost {
                        source_location: lane.source_location.clone(),
                        destination_zone: lane.destination_zone.clone(),
                        carrier: option.carrier.clone(),
                        cost: option.cost,
                    });
                }
                if option.days == 0 {
                    violations.push(IntegrityViolation::ZeroTransitDays {
                        source_location: lane.source_location.clone(),
                        destination_zone: lane.destination_zone.clone(),
                        carrier: option.carrier.clone(),
                    });
                }
                if option.co2_kg < 0.0 {
                    violations.push(IntegrityViolation::NegativeEmissions {
                        source_location: lane.source_location.clone(),
                        destination_zone: lane.destination_zone.clone(),
                        carrier: option.carrier.clone(),
                        co2_kg: option.co2_kg,
                    });
                }
            }
        }

        violations
    }
}

/// Owned table set; build one directly in tests or load it from JSON
#[derive(Debug, Clone, Default)]
pub struct DataTables {
    pub customers: Vec<Customer>,
    pub inventory: Vec<InventoryRecord>,
    pub shipping_lanes: Vec<ShippingLane>,
    pub zones: ZoneTable,
    pub product_weights: Vec<ProductWeight>,
    pub orders: Vec<OrderRecord>,
    pub sku_inventory: Vec<SkuInventoryRecord>,
}

/// Repository backed by in-memory tables
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    tables: DataTables,
}

impl InMemoryRepository {
    pub fn new(tables: DataTables) -> Self {
        Self { tables }
    }

    /// Tables compiled into the binary
    pub fn seeded() -> Result<Self, DataError> {
        let tables = DataTables {
            customers: parse(CUSTOMERS_FILE, include_str!("../../fixtures/customers.json"))?,
            inventory: parse(INVENTORY_FILE, include_str!("../../fixtures/inventory.json"))?,
            shipping_lanes: parse(SHIPPING_FILE, include_str!("../../fixtures/shipping.json"))?,
            zones: parse(ZONES_FILE, include_str!("../../fixtures/zones.json"))?,
            product_weights: parse(PRODUCTS_FILE, include_str!("../../fixtures/products.json"))?,
            orders: parse(ORDERS_FILE, include_str!("../../fixtures/orders.json"))?,
            sku_inventory: parse(
                SKU_INVENTORY_FILE,
                include_str!("../../fixtures/sku_inventory.json"),
            )?,
        };
        Ok(Self::new(tables))
    }

    /// Load every fixture file from `dir` and reject inconsistent tables
    pub fn load_from_dir(dir: &Path) -> Result<Self, DataError> {
        info!(dir = %dir.display(), "Loading fixture tables");
        let tables = DataTables {
            customers: read(dir, CUSTOMERS_FILE)?,
            inventory: read(dir, INVENTORY_FILE)?,
            shipping_lanes: read(dir, SHIPPING_FILE)?,
            zones: read(dir, ZONES_FILE)?,
            product_weights: read(dir, PRODUCTS_FILE)?,
            orders: read(dir, ORDERS_FILE)?,
            sku_inventory: read(dir, SKU_INVENTORY_FILE)?,
        };
        let repository = Self::new(tables);

        let violations = repository.check_integrity();
        if !violations.is_empty() {
            return Err(DataError::Integrity(violations));
        }
        Ok(repository)
    }
}

fn parse<T: serde::de::DeserializeOwned>(file: &str, content: &str) -> Result<T, DataError> {
    serde_json::from_str(content).map_err(|source| DataError::Parse {
        file: file.to_string(),
        source,
    })
}

fn read<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<T, DataError> {
    let path = dir.join(file);
    debug!(path = %path.display(), "Reading fixture");
    let content = std::fs::read_to_string(&path).map_err(|source| DataError::FileRead {
        path: path.clone(),
        source,
    })?;
    parse(file, &content)
}

impl Repository for InMemoryRepository {
    fn customers(&self) -> &[Customer] {
        &self.tables.customers
    }

    fn inventory(&self) -> &[InventoryRecord] {
        &self.tables.inventory
    }

    fn shipping_lanes(&self) -> &[ShippingLane] {
        &self.tables.shipping_lanes
    }

    fn zones(&self) -> &ZoneTable {
        &self.tables.zones
    }

    fn product_weights(&self) -> &[ProductWeight] {
        &self.tables.product_weights
    }

    fn orders(&self) -> &[OrderRecord] {
        &self.tables.orders
    }

    fn sku_inventory(&self) -> &[SkuInventoryRecord] {
        &self.tables.sku_inventory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ShippingOption, Tier};

    #[test]
    fn test_seeded_tables_load() {
        let repo = InMemoryRepository::seeded().unwrap();

        assert_eq!(repo.customers().len(), 15);
        assert_eq!(repo.orders().len(), 5);
        assert_eq!(repo.sku_inventory().len(), 12);
        assert_eq!(
            repo.locations(),
            vec!["STORE_CENTRAL", "WH_EAST", "WH_SOUTH", "WH_WEST"]
        );
        assert_eq!(
            repo.products(),
            vec!["product_A", "product_B", "product_C", "product_D"]
        );
    }

    #[test]
    fn test_seeded_tables_are_consistent() {
        let repo = InMemoryRepository::seeded().unwrap();
        assert!(repo.check_integrity().is_empty());
    }

    #[test]
    fn test_customer_lookup() {
        let repo = InMemoryRepository::seeded().unwrap();
        let alice = repo.customer("cust123").unwrap();
        assert_eq!(alice.name.as_deref(), Some("Alice Wonderland"));
        assert_eq!(alice.zip_code.as_deref(), Some("10001"));
        assert_eq!(alice.tier, Some(Tier::Gold));
        assert!(repo.customer("nobody").is_none());
    }

    #[test]
    fn test_shipping_lane_lookup() {
        let repo = InMemoryRepository::seeded().unwrap();
        let lane = repo.shipping_lane("WH_EAST", "ZONE_1").unwrap();
        assert_eq!(lane.options[0].carrier, "CarrierX_Std");
        assert!(repo.shipping_lane("WH_NORTH", "ZONE_1").is_none());
    }

    #[test]
    fn test_integrity_reports_missing_weight_and_bad_lane() {
        let repo = InMemoryRepository::new(DataTables {
            inventory: vec![InventoryRecord {
                location_id: "WH_X".to_string(),
                product_id: "product_Z".to_string(),
                quantity: 1,
            }],
            shipping_lanes: vec![ShippingLane {
                source_location: "WH_X".to_string(),
                destination_zone: "ZONE_1".to_string(),
                options: vec![ShippingOption {
                    product_id: "product_Z".to_string(),
                    carrier: "Free".to_string(),
                    cost: 0.0,
                    days: 0,
                    co2_kg: -1.0,
                }],
            }],
            customers: vec![Customer {
                id: "c1".to_string(),
                name: None,
                email: None,
                zip_code: Some("99999".to_string()),
                tier: None,
            }],
            ..Default::default()
        });

        let violations = repo.check_integrity();
        assert_eq!(violations.len(), 5);
        assert!(violations.contains(&IntegrityViolation::MissingProductWeight {
            product_id: "product_Z".to_string()
        }));
        assert!(violations
            .iter()
            .any(|v| matches!(v, IntegrityViolation::UnresolvableZip { .. })));
    }

    #[test]
    fn test_load_from_dir_round_trips_seeded_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        for file in [
            CUSTOMERS_FILE,
            INVENTORY_FILE,
            SHIPPING_FILE,
            ZONES_FILE,
            PRODUCTS_FILE,
            ORDERS_FILE,
            SKU_INVENTORY_FILE,
        ] {
            std::fs::copy(src.join(file), dir.path().join(file)).unwrap();
        }

        let repo = InMemoryRepository::load_from_dir(dir.path()).unwrap();
        assert_eq!(repo.customers().len(), 15);
    }

    #[test]
    fn test_load_from_dir_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = InMemoryRepository::load_from_dir(dir.path());
        assert!(matches!(result, Err(DataError::FileRead { .. })));
    }

    #[test]
    fn test_load_from_dir_rejects_inconsistent_tables() {
        let dir = tempfile::tempdir().unwrap();
        let write = |file: &str, content: &str| {
            std::fs::write(dir.path().join(file), content).unwrap();
        };
        write(CUSTOMERS_FILE, "[]");
        write(
            INVENTORY_FILE,
            r#"[{"location_id": "WH_X", "product_id": "product_Q", "quantity": 3}]"#,
        );
        write(SHIPPING_FILE, "[]");
        write(ZONES_FILE, r#"{"assignments": {}}"#);
        write(PRODUCTS_FILE, "[]");
        write(ORDERS_FILE, "[]");
        write(SKU_INVENTORY_FILE, "[]");

        let result = InMemoryRepository::load_from_dir(dir.path());
        match result {
            Err(DataError::Integrity(violations)) => assert_eq!(violations.len(), 1),
            other => panic!("expected integrity error, got {other:?}"),
        }
    }
}
