//! Load simulator for the shopping cart sagas.
//!
//! A run seeds the inventory, lets concurrent clients fill, update, check out
//! and abandon carts, sweeps the abandoned ones with the expiry saga and then
//! audits that no stock was created or destroyed along the way.

pub mod client;
pub mod config;
pub mod error;
pub mod fixtures;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use document_store::{DocumentStore, Filter};
use domain::{Cart, CartState, InventoryRecord, Order, ProductId};
use futures_util::future::join_all;
use saga::{Action, Collections, ExpireCartsRequest, ExpireFailure, Instrumentation};
use stats::{InMemoryMetricsRecorder, Report};

pub use client::{ClientStats, Sagas, SimulatedClient};
pub use config::SimulatorConfig;
pub use error::{Result, SimulatorError};

/// Name the timing report is printed under.
pub const REPORT_NAME: &str = "shopping cart sagas";

/// Where every seeded unit of one product ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAudit {
    pub product_id: ProductId,
    pub seeded: u64,
    pub available: u64,
    pub reserved: u64,
    pub ordered: u64,
}

impl StockAudit {
    pub fn accounted(&self) -> u64 {
        self.available + self.reserved + self.ordered
    }

    pub fn is_conserved(&self) -> bool {
        self.accounted() == self.seeded
    }
}

/// Final cart states after the sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartTally {
    pub active: u64,
    pub complete: u64,
    pub expired: u64,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct SimulationSummary {
    pub stats: ClientStats,
    pub expired: usize,
    pub expire_failures: Vec<ExpireFailure>,
    pub carts: CartTally,
    pub orders: usize,
    pub audits: Vec<StockAudit>,
    pub report: Report,
}

/// Runs one simulation against `store`.
///
/// The collections are dropped and reseeded first. Fails with
/// [`SimulatorError::ConservationViolated`] if any product's stock does not
/// add up at the end.
pub async fn run_simulation<S>(
    store: S,
    config: &SimulatorConfig,
    recorder: InMemoryMetricsRecorder,
) -> Result<SimulationSummary>
where
    S: DocumentStore + Clone + 'static,
{
    let collections = Collections::new(store);
    let catalog = Arc::new(fixtures::catalog(config.products));
    fixtures::seed_inventory(&collections, &catalog, config.stock).await?;

    let instrumentation = Instrumentation::new(Arc::new(recorder.clone()), config.bucket_width());
    let sagas = Arc::new(Sagas::new(&collections, instrumentation));

    tracing::info!(
        clients = config.clients,
        iterations = config.iterations,
        "starting clients"
    );
    let handles = (0..config.clients).map(|id| {
        let client = SimulatedClient::new(id, sagas.clone(), catalog.clone());
        let iterations = config.iterations;
        tokio::spawn(async move { client.run(iterations).await })
    });

    let mut stats = ClientStats::default();
    for joined in join_all(handles).await {
        stats += joined?;
    }
    tracing::info!(?stats, "clients finished");

    let cutoff = TimeDelta::from_std(config.expire_after())
        .ok()
        .and_then(|after| Utc::now().checked_sub_signed(after))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let sweep = sagas.expire.execute(&ExpireCartsRequest { cutoff }).await?;
    for failure in &sweep.failures {
        tracing::warn!(cart_id = %failure.cart_id, error = %failure.error, "cart not expired");
    }

    let carts = tally_carts(&collections).await?;
    let (orders, audits) = audit_stock(&collections, &catalog, config.stock).await?;
    if let Some(broken) = audits.iter().find(|a| !a.is_conserved()) {
        return Err(SimulatorError::ConservationViolated {
            product_id: broken.product_id.clone(),
            seeded: broken.seeded,
            accounted: broken.accounted(),
        });
    }

    let report = Report::build(REPORT_NAME, &recorder.buckets()?, &[])?;

    Ok(SimulationSummary {
        stats,
        expired: sweep.expired.len(),
        expire_failures: sweep.failures,
        carts,
        orders,
        audits,
        report,
    })
}

async fn tally_carts<S: DocumentStore + Clone>(collections: &Collections<S>) -> Result<CartTally> {
    let mut tally = CartTally::default();
    for doc in collections.carts.find_many(&Filter::new()).await? {
        match Cart::from_document(&doc)?.state {
            CartState::Active => tally.active += 1,
            CartState::Complete => tally.complete += 1,
            CartState::Expired => tally.expired += 1,
        }
    }
    Ok(tally)
}

/// Sums available, reserved and ordered units per product.
async fn audit_stock<S: DocumentStore + Clone>(
    collections: &Collections<S>,
    catalog: &[domain::Product],
    stock: u32,
) -> Result<(usize, Vec<StockAudit>)> {
    let orders = collections.orders.find_many(&Filter::new()).await?;
    let mut ordered: HashMap<ProductId, u64> = HashMap::new();
    for doc in &orders {
        for line in Order::from_document(doc)?.products {
            *ordered.entry(line.product_id).or_default() += u64::from(line.quantity);
        }
    }

    let mut audits = Vec::with_capacity(catalog.len());
    for product in catalog {
        let (available, reserved) = match collections
            .inventories
            .find_one(&Filter::by_id(product.id.as_str()))
            .await?
        {
            Some(doc) => {
                let record = InventoryRecord::from_document(&doc)?;
                (u64::from(record.quantity), record.reserved_total())
            }
            None => (0, 0),
        };
        audits.push(StockAudit {
            product_id: product.id.clone(),
            seeded: u64::from(stock),
            available,
            reserved,
            ordered: ordered.get(&product.id).copied().unwrap_or_default(),
        });
    }
    Ok((orders.len(), audits))
}
