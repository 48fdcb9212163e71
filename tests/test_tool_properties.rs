//! Property tests for the lookup tools and order validation

use order_router::agent::{BusinessPriority, RawOrder};
use order_router::data::{InMemoryRepository, Repository};
use order_router::error::sanitize_error_message;
use order_router::tools::builtin::{get_customer_zone, get_inventory, get_shipping_options};
use proptest::prelude::*;
use serde_json::json;

fn seeded() -> InMemoryRepository {
    InMemoryRepository::seeded().unwrap()
}

proptest! {
    #[test]
    fn inventory_only_returns_locations_with_enough_stock(
        product in prop::sample::select(vec!["product_A", "product_B", "product_C", "product_D"]),
        quantity in 0u32..40,
    ) {
        let repository = seeded();
        let stock = get_inventory(&repository, product, quantity);

        for (location, units) in &stock {
            prop_assert!(*units >= quantity);
            prop_assert!(repository.locations().contains(location));
        }

        let expected = repository
            .stock_for_product(product)
            .iter()
            .filter(|record| record.quantity >= quantity)
            .count();
        prop_assert_eq!(stock.len(), expected);
    }

    #[test]
    fn unknown_products_have_no_stock(product in "[a-z]{3,12}", quantity in 0u32..10) {
        prop_assume!(!product.starts_with("product"));
        prop_assert!(get_inventory(&seeded(), &product, quantity).is_empty());
    }

    #[test]
    fn unmapped_zips_fall_back_to_default_zone(zip in "[0-9]{5}") {
        let repository = seeded();
        prop_assume!(!repository.zones().assignments.contains_key(&zip));
        prop_assert_eq!(get_customer_zone(&repository, &zip), "ZONE_1");
    }

    #[test]
    fn unknown_source_locations_have_no_shipping(location in "WH_[A-Z]{6,10}") {
        let repository = seeded();
        prop_assume!(!repository.locations().contains(&location));
        prop_assert!(get_shipping_options(&repository, &location, "ZONE_1", "product_A").is_empty());
    }

    #[test]
    fn quantity_is_valid_iff_positive(quantity in any::<i64>()) {
        let parsed = RawOrder::parse(&json!({
            "product_id": "product_A",
            "quantity": quantity,
            "customer_id": "cust123",
        }));
        let representable = quantity > 0 && quantity <= i64::from(u32::MAX);
        prop_assert_eq!(parsed.is_ok(), representable);
    }

    #[test]
    fn priority_parsing_ignores_case(index in 0usize..5, upper in any::<bool>()) {
        let priority = BusinessPriority::ALL[index];
        let text = if upper {
            priority.as_str().to_string()
        } else {
            priority.as_str().to_lowercase()
        };
        prop_assert_eq!(text.parse::<BusinessPriority>().unwrap(), priority);
    }

    #[test]
    fn sanitized_messages_are_bounded(message in ".{0,2000}") {
        let sanitized = sanitize_error_message(&message);
        prop_assert!(sanitized.len() <= 500);
    }
}

#[test]
fn every_known_customer_has_zip_and_tier() {
    let repository = seeded();
    for customer in repository.customers() {
        assert!(
            customer.zip_code.as_deref().is_some_and(|zip| !zip.is_empty()),
            "customer {} has no zip",
            customer.id
        );
        assert!(customer.tier.is_some(), "customer {} has no tier", customer.id);
    }
}

#[test]
fn quantity_above_all_stock_yields_nothing() {
    assert!(get_inventory(&seeded(), "product_A", 10_000).is_empty());
    assert_eq!(get_inventory(&seeded(), "product_A", 0).len(), 4);
}
