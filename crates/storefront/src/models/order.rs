//! Order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gtm_shop_core::{
    CartLine, Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

use super::{FieldError, required};

/// A line of a placed order, frozen from a cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: String,
    pub quantity: u32,
    /// Unit price at the time of purchase.
    pub price: f64,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id.clone(),
            product_name: line.product.name.clone(),
            product_image: line.product.image.clone(),
            quantity: line.quantity,
            price: line.product.price,
        }
    }
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Where an order ships. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl ShippingInfo {
    /// Trim every field, reject blanks, and normalize the email.
    ///
    /// # Errors
    ///
    /// Returns `FieldError` naming the first blank field, or
    /// `FieldError::InvalidEmail` if the email is malformed.
    pub fn validated(&self) -> Result<Self, FieldError> {
        let email = Email::parse_normalized(&required("email", &self.email)?)?;

        Ok(Self {
            full_name: required("full_name", &self.full_name)?,
            email: email.into_inner(),
            phone: required("phone", &self.phone)?,
            address: required("address", &self.address)?,
            city: required("city", &self.city)?,
            state: required("state", &self.state)?,
            zip_code: required("zip_code", &self.zip_code)?,
            country: required("country", &self.country)?,
        })
    }
}

/// An order as stored in the `orders` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderId>,
    pub user_id: UserId,
    pub user_email: String,
    pub items: Vec<OrderItem>,
    pub shipping_info: ShippingInfo,
    pub total_amount: f64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a pending order from cart lines.
    #[must_use]
    pub fn from_cart(
        user_id: UserId,
        user_email: impl Into<String>,
        lines: &[CartLine],
        shipping_info: ShippingInfo,
    ) -> Self {
        let items: Vec<OrderItem> = lines.iter().map(OrderItem::from).collect();
        let total_amount = items.iter().map(OrderItem::line_total).sum();

        Self {
            id: None,
            user_id,
            user_email: user_email.into(),
            items,
            shipping_info,
            total_amount,
            status: OrderStatus::Pending,
            payment_method: None,
            payment_status: None,
            payment_id: None,
            payment_details: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Total number of units across all items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Short human-facing reference (first 8 characters of the id, upper-cased).
    #[must_use]
    pub fn short_ref(&self) -> Option<String> {
        self.id.map(|id| id.short_ref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gtm_shop_core::Product;

    use super::*;

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            full_name: " Ada Lovelace ".to_string(),
            email: "Ada@Example.com".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            state: "LDN".to_string(),
            zip_code: "N1".to_string(),
            country: "UK".to_string(),
        }
    }

    fn line(id: &str, price: f64, quantity: u32) -> CartLine {
        CartLine::new(
            Product {
                id: ProductId::new(id),
                name: format!("Product {id}"),
                description: String::new(),
                price,
                category: "Apparel".to_string(),
                image: format!("{id}.png"),
                rating: None,
                reviews: None,
                in_stock: None,
            },
            quantity,
        )
    }

    #[test]
    fn test_shipping_validated_normalizes() {
        let info = shipping().validated().unwrap();
        assert_eq!(info.full_name, "Ada Lovelace");
        assert_eq!(info.email, "ada@example.com");
    }

    #[test]
    fn test_shipping_validated_rejects_blank_field() {
        let mut info = shipping();
        info.city = "   ".to_string();
        assert_eq!(info.validated(), Err(FieldError::Missing("city")));
    }

    #[test]
    fn test_shipping_validated_rejects_bad_email() {
        let mut info = shipping();
        info.email = "not-an-email".to_string();
        assert!(matches!(
            info.validated(),
            Err(FieldError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_from_cart_totals() {
        let order = Order::from_cart(
            UserId::random(),
            "ada@example.com",
            &[line("a", 10.0, 2), line("b", 5.0, 3)],
            shipping(),
        );
        assert!((order.total_amount - 35.0).abs() < 1e-9);
        assert_eq!(order.item_count(), 5);
        assert_eq!(order.items[0].product_name, "Product a");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.short_ref().is_none());
    }

    #[test]
    fn test_order_serializes_backend_columns() {
        let order = Order::from_cart(
            UserId::random(),
            "ada@example.com",
            &[line("a", 10.0, 1)],
            shipping(),
        );
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["items"][0]["product_id"], "a");
        assert_eq!(value["shipping_info"]["zip_code"], "N1");
        assert!(value.get("id").is_none());
        assert!(value.get("payment_status").is_none());
    }

    #[test]
    fn test_order_parses_backend_row() {
        let row = serde_json::json!({
            "id": "3f2b9c1a-0000-4000-8000-000000000000",
            "user_id": "11111111-2222-4333-8444-555555555555",
            "user_email": "ada@example.com",
            "items": [],
            "shipping_info": shipping(),
            "total_amount": 12.5,
            "status": "shipped",
            "payment_method": "paypal",
            "payment_status": "completed",
            "created_at": "2025-03-01T10:00:00.123456+00:00"
        });
        let order: Order = serde_json::from_value(row).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.payment_method, Some(PaymentMethod::Paypal));
        assert_eq!(order.short_ref().as_deref(), Some("3F2B9C1A"));
    }
}
