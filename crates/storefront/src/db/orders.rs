//! Order repository.

use serde_json::{Map, Value, json};
use tracing::instrument;

use gtm_shop_core::{OrderId, OrderStatus, PaymentStatus, UserId};

use super::{Direction, Filter, Query, RemoteStore, RepositoryError, Table, now_timestamp, single};
use crate::models::Order;

/// Repository for the `orders` table.
pub struct OrderRepository<'a> {
    store: &'a dyn RemoteStore,
}

fn by_id(order_id: OrderId) -> Vec<Filter> {
    vec![Filter {
        column: "id".to_string(),
        value: order_id.to_string(),
    }]
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Insert an order and return it with its server-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails or the stored row is invalid.
    #[instrument(skip(self, order), fields(user_id = %order.user_id, items = order.items.len()))]
    pub async fn create(&self, order: &Order) -> Result<Order, RepositoryError> {
        let row = self
            .store
            .insert(Table::Orders, serde_json::to_value(order)?)
            .await?;
        let created: Order = serde_json::from_value(row)?;
        tracing::info!(order_id = ?created.id, "Order created");
        Ok(created)
    }

    /// All orders for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is invalid.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order_by("created_at", Direction::Desc);

        let rows = self.store.select(Table::Orders, &query).await?;
        tracing::debug!(count = rows.len(), "Orders fetched");
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(RepositoryError::from))
            .collect()
    }

    /// Get one order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    #[instrument(skip(self))]
    pub async fn get(&self, order_id: OrderId) -> Result<Order, RepositoryError> {
        let query = Query::new().eq("id", order_id).limit(1);
        single(self.store.select(Table::Orders, &query).await?)
    }

    /// Set the fulfilment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let patch = json!({ "status": status, "updated_at": now_timestamp() });
        single(
            self.store
                .update(Table::Orders, &by_id(order_id), patch)
                .await?,
        )
    }

    /// Set the payment status, optionally recording gateway details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    #[instrument(skip(self, details))]
    pub async fn update_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
        details: Option<Value>,
    ) -> Result<Order, RepositoryError> {
        let mut patch = Map::new();
        patch.insert("payment_status".into(), json!(status));
        patch.insert("updated_at".into(), now_timestamp());
        if let Some(details) = details {
            patch.insert("payment_details".into(), details);
        }

        single(
            self.store
                .update(Table::Orders, &by_id(order_id), Value::Object(patch))
                .await?,
        )
    }
}
