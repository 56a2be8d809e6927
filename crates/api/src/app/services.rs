//! Service wiring: stores, catalog/cart services and the realtime channel.

use std::{convert::Infallible, sync::Arc, time::Duration};

use anyhow::Context;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use storefront_carts::Cart;
use storefront_catalog::{CatalogEvent, CatalogObserver, Product};
use storefront_core::IdStrategy;
use storefront_infra::{AggregateStore, CartService, CatalogService, InMemoryStore, JsonFileStore};

use crate::config::{Config, Storage};

pub type ProductStore = Arc<dyn AggregateStore<Product>>;
pub type CartStore = Arc<dyn AggregateStore<Cart>>;

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub topic: &'static str,
    pub payload: JsonValue,
}

/// Catalog observer that forwards every event onto the realtime channel.
///
/// Sending never blocks; with no subscribers the event is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<RealtimeMessage>,
}

impl BroadcastObserver {
    pub fn new(tx: broadcast::Sender<RealtimeMessage>) -> Self {
        Self { tx }
    }
}

impl CatalogObserver for BroadcastObserver {
    fn notify(&self, event: &CatalogEvent) {
        let payload = match serde_json::to_value(event) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, event_type = event.event_type(), "failed to encode catalog event");
                return;
            }
        };
        let _ = self.tx.send(RealtimeMessage {
            topic: event.event_type(),
            payload,
        });
    }
}

pub struct AppServices {
    catalog: CatalogService<ProductStore>,
    carts: CartService<CartStore, ProductStore>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl AppServices {
    /// Wire services over the given stores.
    pub fn new(products: ProductStore, carts: CartStore, realtime_buffer: usize) -> Self {
        let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(realtime_buffer.max(1));
        let observer: Arc<dyn CatalogObserver> = Arc::new(BroadcastObserver::new(realtime_tx.clone()));

        Self {
            catalog: CatalogService::new(products.clone()).with_observer(observer),
            carts: CartService::new(carts, products),
            realtime_tx,
        }
    }

    /// In-memory services, as used by tests and local development.
    pub fn in_memory(id_strategy: IdStrategy) -> Self {
        Self::new(
            Arc::new(InMemoryStore::<Product>::new(id_strategy)),
            Arc::new(InMemoryStore::<Cart>::new(id_strategy)),
            crate::config::DEFAULT_REALTIME_BUFFER,
        )
    }

    pub fn catalog(&self) -> &CatalogService<ProductStore> {
        &self.catalog
    }

    pub fn carts(&self) -> &CartService<CartStore, ProductStore> {
        &self.carts
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }
}

/// Build services for the configured storage backend.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let strategy = config.id_strategy;
    let (products, carts) = match &config.storage {
        Storage::Memory => {
            let products: ProductStore = Arc::new(InMemoryStore::<Product>::new(strategy));
            let carts: CartStore = Arc::new(InMemoryStore::<Cart>::new(strategy));
            (products, carts)
        }
        Storage::File { data_dir } => {
            tokio::fs::create_dir_all(data_dir)
                .await
                .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
            let products: ProductStore = Arc::new(JsonFileStore::<Product>::new(data_dir, strategy));
            let carts: CartStore = Arc::new(JsonFileStore::<Cart>::new(data_dir, strategy));
            (products, carts)
        }
        Storage::Postgres { database_url } => postgres_stores(database_url, strategy).await?,
    };

    tracing::info!(storage = ?config.storage, id_strategy = ?strategy, "storage initialized");
    Ok(AppServices::new(products, carts, config.realtime_buffer))
}

#[cfg(feature = "postgres")]
async fn postgres_stores(
    database_url: &str,
    strategy: IdStrategy,
) -> anyhow::Result<(ProductStore, CartStore)> {
    use storefront_infra::PostgresStore;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to postgres")?;
    storefront_infra::store::postgres::migrate(&pool)
        .await
        .context("failed to apply document table migration")?;

    let products: ProductStore = Arc::new(PostgresStore::<Product>::new(pool.clone(), strategy));
    let carts: CartStore = Arc::new(PostgresStore::<Cart>::new(pool, strategy));
    Ok((products, carts))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_stores(
    _database_url: &str,
    _strategy: IdStrategy,
) -> anyhow::Result<(ProductStore, CartStore)> {
    anyhow::bail!("STORAGE_BACKEND=postgres requires building with the `postgres` feature")
}

/// Build the catalog SSE stream (used by `/api/products/events`).
///
/// Lagging subscribers skip the events they missed.
pub fn catalog_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(m) => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
