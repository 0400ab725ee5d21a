use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CartLineKey, PlacedOrder, PlacedOrderId, PlacedOrderItem, PlacedOrderQuery, Result,
    SourceStatus, StoreError, StoreType,
    store::{PlacedOrderStore, validate_batch},
};

const UNIQUE_STORE_ORDER_TRADE: &str = "unique_store_order_trade";

const ORDER_COLUMNS: &str = "id, trade_id, store_type, store_id, store_order_id, source_status, \
     products_cost, shipping_cost, currency, tracking_url, created_at, updated_at";

/// PostgreSQL-backed placed order store implementation.
#[derive(Clone)]
pub struct PostgresPlacedOrderStore {
    pool: PgPool,
}

impl PostgresPlacedOrderStore {
    /// Creates a new PostgreSQL placed order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<PlacedOrder> {
        let store_type: String = row.try_get("store_type")?;
        let status: String = row.try_get("source_status")?;

        Ok(PlacedOrder {
            id: PlacedOrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            trade_id: row.try_get("trade_id")?,
            store_type: StoreType::parse(&store_type)
                .ok_or_else(|| StoreError::InvalidRow(format!("store_type {store_type}")))?,
            store_id: row.try_get("store_id")?,
            store_order_id: row.try_get("store_order_id")?,
            source_status: SourceStatus::parse(&status)
                .ok_or_else(|| StoreError::InvalidRow(format!("source_status {status}")))?,
            products_cost: row.try_get("products_cost")?,
            shipping_cost: row.try_get("shipping_cost")?,
            currency: row.try_get("currency")?,
            tracking_url: row.try_get("tracking_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            items: Vec::new(),
        })
    }

    fn row_to_item(row: &PgRow) -> Result<PlacedOrderItem> {
        let order_data_id: String = row.try_get("order_data_id")?;
        let quantity: i32 = row.try_get("quantity")?;

        Ok(PlacedOrderItem {
            id: row.try_get("id")?,
            order_data_id: CartLineKey::parse(&order_data_id)
                .map_err(|e| StoreError::InvalidRow(e.to_string()))?,
            product_id: row.try_get("product_id")?,
            variant_id: row.try_get("variant_id")?,
            title: row.try_get("title")?,
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::InvalidRow(format!("quantity {quantity}")))?,
            unit_cost: row.try_get("unit_cost")?,
            is_bundle: row.try_get("is_bundle")?,
            source_tracking: row.try_get("source_tracking")?,
            order_track_id: row.try_get("order_track_id")?,
            combined_trade_ids: row.try_get("combined_trade_ids")?,
        })
    }

    /// Loads items for the given orders and attaches them in position order.
    async fn attach_items(&self, mut orders: Vec<PlacedOrder>) -> Result<Vec<PlacedOrder>> {
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, placed_order_id, order_data_id, product_id, variant_id, title, quantity,
                   unit_cost, is_bundle, source_tracking, order_track_id, combined_trade_ids
            FROM placed_order_items
            WHERE placed_order_id = ANY($1)
            ORDER BY placed_order_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<PlacedOrderItem>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = row.try_get("placed_order_id")?;
            items.entry(order_id).or_default().push(Self::row_to_item(row)?);
        }

        for order in &mut orders {
            order.items = items.remove(&order.id.as_uuid()).unwrap_or_default();
        }

        Ok(orders)
    }

    async fn insert_items(
        tx: &mut Transaction<'_, Postgres>,
        order: &PlacedOrder,
    ) -> Result<()> {
        for (position, item) in order.items.iter().enumerate() {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| StoreError::InvalidBatch(format!("quantity {}", item.quantity)))?;

            sqlx::query(
                r#"
                INSERT INTO placed_order_items (id, placed_order_id, position, order_data_id,
                    product_id, variant_id, title, quantity, unit_cost, is_bundle,
                    source_tracking, order_track_id, combined_trade_ids)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(item.id)
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(item.order_data_id.to_string())
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.title)
            .bind(quantity)
            .bind(item.unit_cost)
            .bind(item.is_bundle)
            .bind(&item.source_tracking)
            .bind(item.order_track_id)
            .bind(&item.combined_trade_ids)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl PlacedOrderStore for PostgresPlacedOrderStore {
    async fn insert_batch(&self, orders: Vec<PlacedOrder>) -> Result<Vec<PlacedOrderId>> {
        validate_batch(&orders)?;

        // One transaction for the whole batch; dropping it on error rolls back
        let mut tx = self.pool.begin().await?;

        for order in &orders {
            sqlx::query(
                r#"
                INSERT INTO placed_orders (id, trade_id, store_type, store_id, store_order_id,
                    source_status, products_cost, shipping_cost, currency, tracking_url,
                    created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(&order.trade_id)
            .bind(order.store_type.as_str())
            .bind(order.store_id)
            .bind(&order.store_order_id)
            .bind(order.source_status.as_str())
            .bind(order.products_cost)
            .bind(order.shipping_cost)
            .bind(&order.currency)
            .bind(&order.tracking_url)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some(UNIQUE_STORE_ORDER_TRADE)
                {
                    metrics::counter!("order_store_duplicates_total").increment(1);
                    return StoreError::from(order.key());
                }
                StoreError::Database(e)
            })?;

            Self::insert_items(&mut tx, order).await?;
        }

        tx.commit().await?;
        metrics::counter!("order_store_inserts_total").increment(orders.len() as u64);

        Ok(orders.iter().map(|o| o.id).collect())
    }

    async fn get(&self, id: PlacedOrderId) -> Result<Option<PlacedOrder>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM placed_orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let order = Self::row_to_order(&row)?;
                Ok(self.attach_items(vec![order]).await?.pop())
            }
            None => Ok(None),
        }
    }

    async fn query(&self, query: PlacedOrderQuery) -> Result<Vec<PlacedOrder>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM placed_orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.store.is_some() {
            sql.push_str(&format!(
                " AND store_type = ${} AND store_id = ${}",
                param_count + 1,
                param_count + 2
            ));
            param_count += 2;
        }
        if query.store_order_ids.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND store_order_id = ANY(${param_count})"));
        }
        if query.order_data_ids.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND id IN (SELECT placed_order_id FROM placed_order_items WHERE order_data_id = ANY(${param_count}))"
            ));
        }
        if query.trade_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND trade_id = ${param_count}"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND source_status = ANY(${param_count})"));
        }
        if query.order_track_ids.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND id IN (SELECT placed_order_id FROM placed_order_items WHERE order_track_id = ANY(${param_count}))"
            ));
        }

        sql.push_str(" ORDER BY created_at ASC, trade_id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        // Build and execute query with parameters
        let mut sqlx_query = sqlx::query(&sql);

        if let Some(store) = query.store {
            sqlx_query = sqlx_query
                .bind(store.store_type.as_str())
                .bind(store.store_id);
        }
        if let Some(ids) = query.store_order_ids {
            sqlx_query = sqlx_query.bind(ids);
        }
        if let Some(lines) = query.order_data_ids {
            let lines: Vec<String> = lines.iter().map(ToString::to_string).collect();
            sqlx_query = sqlx_query.bind(lines);
        }
        if let Some(trade_id) = query.trade_id {
            sqlx_query = sqlx_query.bind(trade_id);
        }
        if let Some(statuses) = query.statuses {
            let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
            sqlx_query = sqlx_query.bind(statuses);
        }
        if let Some(track_ids) = query.order_track_ids {
            sqlx_query = sqlx_query.bind(track_ids);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        let orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        self.attach_items(orders).await
    }

    async fn update(&self, order: &PlacedOrder) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE placed_orders
            SET source_status = $2, products_cost = $3, shipping_cost = $4,
                tracking_url = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.source_status.as_str())
        .bind(order.products_cost)
        .bind(order.shipping_cost)
        .bind(&order.tracking_url)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(order.id));
        }

        sqlx::query("DELETE FROM placed_order_items WHERE placed_order_id = $1")
            .bind(order.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        Self::insert_items(&mut tx, order).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: PlacedOrderId) -> Result<Option<PlacedOrder>> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };

        // Items go with the order through ON DELETE CASCADE
        sqlx::query("DELETE FROM placed_orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(Some(order))
    }
}
