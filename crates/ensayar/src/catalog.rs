//! Reference data for the demo store under test.
//!
//! The store's products, checkout test data and price math are immutable
//! reference data owned by the external system; tests assert against them
//! and the simulated driver serves them as its real backend catalog.

use serde::{Deserialize, Serialize};

/// A product listed in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier used in add-to-cart controls
    pub id: String,
    /// Display name
    pub name: String,
    /// Unit price in dollars
    pub price: f64,
}

impl Product {
    fn new(id: &str, name: &str, price: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
        }
    }

    /// Price formatted the way the store renders it
    #[must_use]
    pub fn display_price(&self) -> String {
        format_price(self.price)
    }
}

/// Product identifiers
pub mod ids {
    /// Sauce Labs Backpack
    pub const BACKPACK: &str = "sauce-labs-backpack";
    /// Sauce Labs Bike Light
    pub const BIKE_LIGHT: &str = "sauce-labs-bike-light";
    /// Sauce Labs Bolt T-Shirt
    pub const BOLT_T_SHIRT: &str = "sauce-labs-bolt-t-shirt";
    /// Sauce Labs Fleece Jacket
    pub const FLEECE_JACKET: &str = "sauce-labs-fleece-jacket";
    /// Sauce Labs Onesie
    pub const ONESIE: &str = "sauce-labs-onesie";
    /// Test.allTheThings() T-Shirt (Red)
    pub const RED_T_SHIRT: &str = "test.allthethings()-t-shirt-(red)";
}

/// The full store catalog, in the order the store lists it
#[must_use]
pub fn all() -> Vec<Product> {
    vec![
        Product::new(ids::BACKPACK, "Sauce Labs Backpack", 29.99),
        Product::new(ids::BIKE_LIGHT, "Sauce Labs Bike Light", 9.99),
        Product::new(ids::BOLT_T_SHIRT, "Sauce Labs Bolt T-Shirt", 15.99),
        Product::new(ids::FLEECE_JACKET, "Sauce Labs Fleece Jacket", 49.99),
        Product::new(ids::ONESIE, "Sauce Labs Onesie", 7.99),
        Product::new(
            ids::RED_T_SHIRT,
            "Test.allTheThings() T-Shirt (Red)",
            15.99,
        ),
    ]
}

/// Look up a product by id
#[must_use]
pub fn by_id(id: &str) -> Option<Product> {
    all().into_iter().find(|p| p.id == id)
}

/// Item total for a set of product ids (unknown ids contribute nothing)
#[must_use]
pub fn subtotal(product_ids: &[&str]) -> f64 {
    product_ids
        .iter()
        .filter_map(|id| by_id(id))
        .map(|p| p.price)
        .sum()
}

/// Store tax rate
pub const TAX_RATE: f64 = 0.08;

/// Tax on a subtotal, rounded to cents
#[must_use]
pub fn tax(subtotal: f64) -> f64 {
    (subtotal * TAX_RATE * 100.0).round() / 100.0
}

/// Format a dollar amount the way the store renders it
#[must_use]
pub fn format_price(amount: f64) -> String {
    format!("${amount:.2}")
}

/// Checkout information entered at step one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutInfo {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Postal code
    pub postal_code: String,
}

impl CheckoutInfo {
    /// Create checkout info
    #[must_use]
    pub fn new(first_name: &str, last_name: &str, postal_code: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            postal_code: postal_code.to_string(),
        }
    }

    /// The canonical test data used across the suite
    #[must_use]
    pub fn test_data() -> Self {
        Self::new("Test", "User", "12345")
    }
}
