use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// Customer-supplied order metadata collected at checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub notes: Option<String>,
}

impl OrderDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("customer_name", &self.customer_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidOrderDraft(format!("{field} must not be blank")));
            }
        }
        if !self.email.contains('@') {
            return Err(DomainError::InvalidOrderDraft(
                "email must contain an @ sign".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn order_total(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::line_total).sum()
}
