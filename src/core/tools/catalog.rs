//! Product catalog and stock lookup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

const EMBEDDED_CATALOG: &str = include_str!("../../../assets/catalog.yaml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Printer,
    Material,
    Scanner,
    Part,
    Service,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    Backorder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub sku: String,
    pub category: Category,
    #[serde(default)]
    pub technology: Option<String>,
    pub price: u64,
    pub stock_status: StockStatus,
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// Short technical spec line, e.g. `FDM Tech`.
    pub fn specs(&self) -> Option<String> {
        self.technology.as_ref().map(|t| format!("{t} Tech"))
    }

    fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(query)
            || self
                .brand
                .as_ref()
                .is_some_and(|b| b.to_lowercase().contains(query))
            || self.sku.to_lowercase().contains(query)
            || (self.category == Category::Printer && query.contains("printer"))
    }

    /// Tool result for a successful lookup.
    pub fn stock_report(&self) -> Value {
        json!({
            "found": true,
            "product": self.name,
            "price": self.price,
            "stock_status": self.stock_status,
            "sku": self.sku,
            "description": self.description,
            "specs": self.specs(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: String,
    pub legal_name: Option<String>,
    pub website: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub currency: Option<String>,
    pub working_hours: Option<String>,
    pub delivery: Option<String>,
    pub returns: Option<String>,
    pub description: Option<String>,
}

/// Static storefront knowledge: company details and products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub company: CompanyInfo,
    pub products: Vec<Product>,
}

impl Catalog {
    /// Catalog shipped with the crate.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_yaml(EMBEDDED_CATALOG)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// First product matching the query, case-insensitively, by name, brand,
    /// SKU, or (for queries mentioning "printer") any printer.
    pub fn lookup(&self, query: &str) -> Option<&Product> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        self.products.iter().find(|p| p.matches(&query))
    }

    /// Tool result for a stock query.
    pub fn check_stock(&self, query: &str) -> Value {
        match self.lookup(query) {
            Some(product) => product.stock_report(),
            None => json!({
                "found": false,
                "message": "Product not found in local catalog.",
            }),
        }
    }
}
