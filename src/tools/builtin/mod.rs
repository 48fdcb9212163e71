//! Builtin lookup tools
//!
//! Each module keeps its lookups as pure functions over a [`Repository`] and
//! wraps them in thin [`Tool`] adapters that only parse parameters and render
//! results.

pub mod customer;
pub mod fulfillment;
pub mod orders;

pub use customer::{get_customer_details, CustomerDetails, CustomerDetailsTool};
pub use fulfillment::{
    get_customer_zone, get_inventory, get_shipping_options, CustomerZoneTool, InventoryTool,
    ShippingOptionsTool, UNKNOWN_ZONE,
};
pub use orders::{
    find_orders_for_customer, get_inventory_details_for_sku, get_order_status,
    get_overall_stock_for_product, get_product_eta, CustomerOrdersTool, OrderStatusTool,
    ProductEta, ProductEtaTool, ProductStockTool, SkuDetailsTool,
};

use crate::data::Repository;
use crate::tools::Tool;
use std::sync::Arc;

/// Every builtin tool bound to one repository
pub fn all_tools(repository: Arc<dyn Repository>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(CustomerDetailsTool::new(repository.clone())),
        Box::new(CustomerZoneTool::new(repository.clone())),
        Box::new(InventoryTool::new(repository.clone())),
        Box::new(ShippingOptionsTool::new(repository.clone())),
        Box::new(OrderStatusTool::new(repository.clone())),
        Box::new(CustomerOrdersTool::new(repository.clone())),
        Box::new(SkuDetailsTool::new(repository.clone())),
        Box::new(ProductStockTool::new(repository.clone())),
        Box::new(ProductEtaTool::new(repository)),
    ]
}
