//! Order/Product aggregate store
//!
//! Owns the Order -> Product -> {Guarantee, Price} graph in SQLite.
//! Reads always return fully hydrated aggregates; multi-row creates
//! commit in one transaction; deletes cascade through foreign keys.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Guarantee, NewOrder, NewProduct, Order, Price, Product};

/// Open (and create if missing) the SQLite database at `path`.
/// Foreign keys are enabled so owner deletes cascade.
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!(
        "sqlite://{}",
        path.to_string_lossy().replace('\\', "/")
    ))
    .map_err(Error::storage("Failed to open database"))?
    .create_if_missing(true)
    .foreign_keys(true);

    SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .map_err(Error::storage("Failed to open database"))
}

type OrderRow = (i64, String, Option<String>, String);
type ProductRow = (
    i64,
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    bool,
    Option<String>,
    String,
);
type GuaranteeRow = (i64, i64, String, String);
type PriceRow = (i64, i64, f64, String, bool);

pub struct AggregateStore {
    pool: SqlitePool,
}

impl AggregateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the aggregate tables if missing.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                order_date TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::storage("Failed to initialize orders table"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                type TEXT NOT NULL,
                serial_number TEXT,
                photo TEXT,
                is_new INTEGER NOT NULL DEFAULT 0,
                specification TEXT,
                product_date TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::storage("Failed to initialize products table"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guarantees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL UNIQUE
                    REFERENCES products(id) ON DELETE CASCADE,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::storage("Failed to initialize guarantees table"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL
                    REFERENCES products(id) ON DELETE CASCADE,
                value REAL NOT NULL CHECK (value >= 0),
                symbol TEXT NOT NULL CHECK (length(symbol) > 0),
                is_default INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::storage("Failed to initialize prices table"))?;

        Ok(())
    }

    /// All orders newest-first, each hydrated with its products and
    /// their guarantees/prices.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        let order_rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT id, title, description, order_date FROM orders ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::storage("Failed to fetch orders"))?;

        let mut products_by_order = self.load_products_grouped().await?;

        Ok(order_rows
            .into_iter()
            .map(|(id, title, description, order_date)| Order {
                id,
                title,
                description,
                order_date: order_date.parse().unwrap_or_else(|_| Utc::now()),
                products: Some(products_by_order.remove(&id).unwrap_or_default()),
            })
            .collect())
    }

    pub async fn create_order(&self, input: NewOrder) -> Result<Order> {
        input.validate()?;

        let order_date = input.order_date.unwrap_or_else(Utc::now);

        let result =
            sqlx::query("INSERT INTO orders (title, description, order_date) VALUES (?, ?, ?)")
                .bind(&input.title)
                .bind(&input.description)
                .bind(order_date.to_rfc3339())
                .execute(&self.pool)
                .await
                .map_err(Error::storage("Failed to create order"))?;

        let id = result.last_insert_rowid();
        info!("[Store] Order created: {id} ({})", input.title);

        Ok(Order {
            id,
            title: input.title,
            description: input.description,
            order_date,
            products: None,
        })
    }

    /// Delete an order; its products and their guarantees/prices go
    /// with it (foreign-key cascade).
    pub async fn delete_order(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::storage("Failed to delete order"))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Order"));
        }

        info!("[Store] Order deleted: {id}");
        Ok(())
    }

    /// Products newest-first, optionally filtered by exact type, each
    /// hydrated with guarantee, prices, and owning order.
    pub async fn list_products(&self, type_filter: Option<&str>) -> Result<Vec<Product>> {
        let sql = "SELECT id, order_id, title, type, serial_number, photo, is_new, \
                   specification, product_date FROM products";
        let product_rows: Vec<ProductRow> = match type_filter {
            Some(product_type) => {
                sqlx::query_as(&format!("{sql} WHERE type = ? ORDER BY id DESC"))
                    .bind(product_type)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query_as(&format!("{sql} ORDER BY id DESC"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(Error::storage("Failed to fetch products"))?;

        let (mut guarantees, mut prices) = self.load_nested().await?;

        let order_rows: Vec<OrderRow> =
            sqlx::query_as("SELECT id, title, description, order_date FROM orders")
                .fetch_all(&self.pool)
                .await
                .map_err(Error::storage("Failed to fetch products"))?;
        let orders: HashMap<i64, Order> = order_rows
            .into_iter()
            .map(|(id, title, description, order_date)| {
                (
                    id,
                    Order {
                        id,
                        title,
                        description,
                        order_date: order_date.parse().unwrap_or_else(|_| Utc::now()),
                        products: None,
                    },
                )
            })
            .collect();

        Ok(product_rows
            .into_iter()
            .map(|row| {
                let order = orders.get(&row.1).cloned();
                let mut product = hydrate_product(row, &mut guarantees, &mut prices);
                product.order = order;
                product
            })
            .collect())
    }

    /// Stage the product row, the optional guarantee, and all prices,
    /// then commit them as one unit. Any nested failure rolls the
    /// whole transaction back; no partial product is ever visible.
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        input.validate()?;

        let product_date = input.product_date.unwrap_or_else(Utc::now);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(Error::storage("Failed to create product"))?;

        let result = sqlx::query(
            "INSERT INTO products (order_id, title, type, serial_number, photo, is_new, \
             specification, product_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.order_id)
        .bind(&input.title)
        .bind(&input.product_type)
        .bind(&input.serial_number)
        .bind(&input.photo)
        .bind(input.is_new)
        .bind(&input.specification)
        .bind(product_date.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(Error::storage("Failed to create product"))?;

        let product_id = result.last_insert_rowid();

        if let Some(guarantee) = &input.guarantee {
            sqlx::query(
                "INSERT INTO guarantees (product_id, start_date, end_date) VALUES (?, ?, ?)",
            )
            .bind(product_id)
            .bind(guarantee.start_date.to_rfc3339())
            .bind(guarantee.end_date.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(Error::storage("Failed to create product"))?;
        }

        for price in &input.prices {
            sqlx::query(
                "INSERT INTO prices (product_id, value, symbol, is_default) VALUES (?, ?, ?, ?)",
            )
            .bind(product_id)
            .bind(price.value)
            .bind(&price.symbol)
            .bind(price.is_default)
            .execute(&mut *tx)
            .await
            .map_err(Error::storage("Failed to create product"))?;
        }

        tx.commit()
            .await
            .map_err(Error::storage("Failed to create product"))?;

        info!("[Store] Product created: {product_id} ({})", input.title);

        self.get_product(product_id).await
    }

    /// Delete a product; its guarantee and prices cascade.
    pub async fn delete_product(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::storage("Failed to delete product"))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Product"));
        }

        info!("[Store] Product deleted: {id}");
        Ok(())
    }

    /// One product, hydrated with guarantee, prices, and owning order.
    pub async fn get_product(&self, id: i64) -> Result<Product> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, order_id, title, type, serial_number, photo, is_new, \
             specification, product_date FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::storage("Failed to fetch product"))?;

        let row = row.ok_or(Error::NotFound("Product"))?;

        let guarantee: Option<GuaranteeRow> = sqlx::query_as(
            "SELECT id, product_id, start_date, end_date FROM guarantees WHERE product_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::storage("Failed to fetch product"))?;

        let price_rows: Vec<PriceRow> = sqlx::query_as(
            "SELECT id, product_id, value, symbol, is_default FROM prices \
             WHERE product_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::storage("Failed to fetch product"))?;

        let order_row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, title, description, order_date FROM orders WHERE id = ?",
        )
        .bind(row.1)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::storage("Failed to fetch product"))?;

        let mut guarantees: HashMap<i64, Guarantee> = guarantee
            .into_iter()
            .map(|g| (g.1, guarantee_from_row(g)))
            .collect();
        let mut prices: HashMap<i64, Vec<Price>> = HashMap::new();
        prices.insert(id, price_rows.into_iter().map(price_from_row).collect());

        let mut product = hydrate_product(row, &mut guarantees, &mut prices);
        product.order = order_row.map(|(id, title, description, order_date)| Order {
            id,
            title,
            description,
            order_date: order_date.parse().unwrap_or_else(|_| Utc::now()),
            products: None,
        });

        Ok(product)
    }

    /// All products hydrated and grouped by owning order, newest-first
    /// within each group.
    async fn load_products_grouped(&self) -> Result<HashMap<i64, Vec<Product>>> {
        let product_rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, order_id, title, type, serial_number, photo, is_new, \
             specification, product_date FROM products ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::storage("Failed to fetch orders"))?;

        let (mut guarantees, mut prices) = self.load_nested().await?;

        let mut grouped: HashMap<i64, Vec<Product>> = HashMap::new();
        for row in product_rows {
            let order_id = row.1;
            grouped
                .entry(order_id)
                .or_default()
                .push(hydrate_product(row, &mut guarantees, &mut prices));
        }
        Ok(grouped)
    }

    /// Guarantees keyed by product id and prices grouped by product id.
    async fn load_nested(&self) -> Result<(HashMap<i64, Guarantee>, HashMap<i64, Vec<Price>>)> {
        let guarantee_rows: Vec<GuaranteeRow> =
            sqlx::query_as("SELECT id, product_id, start_date, end_date FROM guarantees")
                .fetch_all(&self.pool)
                .await
                .map_err(Error::storage("Failed to fetch guarantees"))?;

        let price_rows: Vec<PriceRow> = sqlx::query_as(
            "SELECT id, product_id, value, symbol, is_default FROM prices ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::storage("Failed to fetch prices"))?;

        let guarantees = guarantee_rows
            .into_iter()
            .map(|g| (g.1, guarantee_from_row(g)))
            .collect();

        let mut prices: HashMap<i64, Vec<Price>> = HashMap::new();
        for row in price_rows {
            prices.entry(row.1).or_default().push(price_from_row(row));
        }

        Ok((guarantees, prices))
    }
}

fn hydrate_product(
    row: ProductRow,
    guarantees: &mut HashMap<i64, Guarantee>,
    prices: &mut HashMap<i64, Vec<Price>>,
) -> Product {
    let (id, order_id, title, product_type, serial_number, photo, is_new, specification, date) =
        row;
    Product {
        id,
        order_id,
        title,
        product_type,
        serial_number,
        photo,
        is_new,
        specification,
        product_date: date.parse().unwrap_or_else(|_| Utc::now()),
        guarantee: guarantees.remove(&id),
        prices: prices.remove(&id).unwrap_or_default(),
        order: None,
    }
}

fn guarantee_from_row((id, product_id, start_date, end_date): GuaranteeRow) -> Guarantee {
    Guarantee {
        id,
        product_id,
        start_date: start_date.parse().unwrap_or_else(|_| Utc::now()),
        end_date: end_date.parse().unwrap_or_else(|_| Utc::now()),
    }
}

fn price_from_row((id, product_id, value, symbol, is_default): PriceRow) -> Price {
    Price {
        id,
        product_id,
        value,
        symbol,
        is_default,
    }
}
