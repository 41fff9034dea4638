//! The closed set of agent categories a query can be routed to

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Agent category
///
/// Declaration order is the routing priority: when two categories end up
/// with the same score, the one declared first is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "order_query_agent")]
    OrderQuery,
    #[serde(rename = "product_recommendation_agent")]
    ProductRecommendation,
    #[serde(rename = "technical_support_agent")]
    TechnicalSupport,
    #[serde(rename = "policy_information_agent")]
    PolicyInformation,
    #[serde(rename = "payment_shipping_agent")]
    PaymentShipping,
    #[serde(rename = "human_escalation_agent")]
    HumanEscalation,
    #[serde(rename = "inventory_management_agent")]
    InventoryManagement,
}

impl Category {
    /// All categories in priority order
    pub const ALL: [Category; 7] = [
        Category::OrderQuery,
        Category::ProductRecommendation,
        Category::TechnicalSupport,
        Category::PolicyInformation,
        Category::PaymentShipping,
        Category::HumanEscalation,
        Category::InventoryManagement,
    ];

    /// Where unroutable queries end up
    pub const ESCALATION: Category = Category::HumanEscalation;

    /// Wire name used in catalogs, prompts and tool calls
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderQuery => "order_query_agent",
            Self::ProductRecommendation => "product_recommendation_agent",
            Self::TechnicalSupport => "technical_support_agent",
            Self::PolicyInformation => "policy_information_agent",
            Self::PaymentShipping => "payment_shipping_agent",
            Self::HumanEscalation => "human_escalation_agent",
            Self::InventoryManagement => "inventory_management_agent",
        }
    }

    /// Port the agent listens on when endpoints are derived from a base URL
    pub fn default_port(&self) -> u16 {
        match self {
            Self::OrderQuery => 8001,
            Self::ProductRecommendation => 8002,
            Self::TechnicalSupport => 8003,
            Self::PolicyInformation => 8004,
            Self::PaymentShipping => 8005,
            Self::HumanEscalation => 8006,
            Self::InventoryManagement => 8007,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::OrderQuery => "Order status, tracking and order history",
            Self::ProductRecommendation => "Product suggestions and compatibility",
            Self::TechnicalSupport => "Installation and troubleshooting help",
            Self::PolicyInformation => "Returns, warranty and invoice policies",
            Self::PaymentShipping => "Payment methods, promotions and delivery",
            Self::HumanEscalation => "Hand-off to a human customer-service agent",
            Self::InventoryManagement => "Stock levels and restock dates",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| Error::UnknownCategory(name.to_string()))
    }
}
