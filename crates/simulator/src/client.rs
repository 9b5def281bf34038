//! Simulated shopping clients.

use std::ops::AddAssign;
use std::sync::Arc;

use common::CartId;
use document_store::DocumentStore;
use domain::{PaymentInfo, Product, ShippingInfo};
use saga::{
    Action, AddProductRequest, AddProductToShoppingCart, CheckoutCart, CheckoutRequest,
    Collections, ExpireCarts, Instrumentation, SagaError, UpdateReservationQuantityForAProduct,
    UpdateReservationRequest,
};

/// Every saga a client can run, sharing one set of collections.
pub struct Sagas<S> {
    pub add: AddProductToShoppingCart<S>,
    pub update: UpdateReservationQuantityForAProduct<S>,
    pub checkout: CheckoutCart<S>,
    pub expire: ExpireCarts<S>,
}

impl<S: DocumentStore + Clone> Sagas<S> {
    pub fn new(collections: &Collections<S>, instrumentation: Instrumentation) -> Self {
        Self {
            add: AddProductToShoppingCart::new(collections, instrumentation.clone()),
            update: UpdateReservationQuantityForAProduct::new(collections, instrumentation.clone()),
            checkout: CheckoutCart::new(collections, instrumentation.clone()),
            expire: ExpireCarts::new(collections, instrumentation),
        }
    }
}

/// Saga outcomes counted by one or more clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub added: u64,
    pub add_rejected: u64,
    pub updated: u64,
    pub update_rejected: u64,
    pub checked_out: u64,
    /// Checkouts that lost a race on the cart's state.
    pub checkout_rejected: u64,
    pub abandoned: u64,
    /// Carts that ended up with no line because every add was rejected.
    pub empty: u64,
    /// Failures other than precondition failures.
    pub errors: u64,
}

impl AddAssign for ClientStats {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.add_rejected += rhs.add_rejected;
        self.updated += rhs.updated;
        self.update_rejected += rhs.update_rejected;
        self.checked_out += rhs.checked_out;
        self.checkout_rejected += rhs.checkout_rejected;
        self.abandoned += rhs.abandoned;
        self.empty += rhs.empty;
        self.errors += rhs.errors;
    }
}

/// What a client does with one cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartPlan {
    pub cart_id: CartId,
    /// Products to add, each with its initial quantity.
    pub lines: Vec<(Product, u32)>,
    /// New quantity for the first line that was added.
    pub updated_quantity: u32,
    pub abandon: bool,
}

/// A client filling one cart per iteration.
///
/// Choices are derived from the client and iteration numbers so runs are
/// reproducible.
pub struct SimulatedClient<S> {
    id: usize,
    sagas: Arc<Sagas<S>>,
    catalog: Arc<Vec<Product>>,
}

impl<S: DocumentStore + Clone> SimulatedClient<S> {
    pub fn new(id: usize, sagas: Arc<Sagas<S>>, catalog: Arc<Vec<Product>>) -> Self {
        Self { id, sagas, catalog }
    }

    /// Returns the plan for one iteration.
    pub fn plan(&self, iteration: usize) -> CartPlan {
        let seed = self.id * 31 + iteration * 7;
        let lines = if self.catalog.is_empty() {
            Vec::new()
        } else {
            let first = (self.id + iteration) % self.catalog.len();
            let mut picks = vec![first];
            if self.catalog.len() > 1 {
                picks.push((first + 1 + seed % (self.catalog.len() - 1)) % self.catalog.len());
            }
            picks
                .into_iter()
                .enumerate()
                .map(|(n, i)| (self.catalog[i].clone(), 1 + ((seed + n) % 3) as u32))
                .collect()
        };

        CartPlan {
            cart_id: CartId::new(format!("client-{}-{}", self.id, iteration)),
            lines,
            updated_quantity: 1 + (seed % 4) as u32,
            abandon: seed % 5 == 0,
        }
    }

    /// Runs `iterations` carts to completion and returns the tally.
    #[tracing::instrument(skip(self), fields(client = self.id))]
    pub async fn run(&self, iterations: usize) -> ClientStats {
        let mut stats = ClientStats::default();
        for iteration in 0..iterations {
            let plan = self.plan(iteration);
            self.run_cart(&plan, &mut stats).await;
        }
        tracing::debug!(?stats, "client finished");
        stats
    }

    async fn run_cart(&self, plan: &CartPlan, stats: &mut ClientStats) {
        let mut first_added = None;
        for (product, quantity) in &plan.lines {
            let request = AddProductRequest {
                cart_id: plan.cart_id.clone(),
                product: product.clone(),
                quantity: *quantity,
            };
            match self.sagas.add.execute(&request).await {
                Ok(()) => {
                    stats.added += 1;
                    first_added.get_or_insert_with(|| product.id.clone());
                }
                Err(e) => tally(e, &mut stats.add_rejected, &mut stats.errors),
            }
        }

        let Some(product_id) = first_added else {
            stats.empty += 1;
            return;
        };

        let update = UpdateReservationRequest {
            cart_id: plan.cart_id.clone(),
            product_id,
            quantity: plan.updated_quantity,
        };
        match self.sagas.update.execute(&update).await {
            Ok(_) => stats.updated += 1,
            Err(e) => tally(e, &mut stats.update_rejected, &mut stats.errors),
        }

        if plan.abandon {
            stats.abandoned += 1;
            return;
        }

        let checkout = CheckoutRequest {
            cart_id: plan.cart_id.clone(),
            shipping: ShippingInfo {
                name: format!("Client {}", self.id),
                address: format!("{} Simulation Way", self.id + 1),
            },
            payment: PaymentInfo {
                reference: format!("card-{:04}", self.id),
            },
        };
        match self.sagas.checkout.execute(&checkout).await {
            Ok(_) => stats.checked_out += 1,
            Err(e) => tally(e, &mut stats.checkout_rejected, &mut stats.errors),
        }
    }
}

/// Precondition failures are expected under contention; anything else is
/// logged as an error.
fn tally(error: SagaError, rejected: &mut u64, errors: &mut u64) {
    if error.is_precondition_failed() {
        tracing::debug!(%error, "saga rejected");
        *rejected += 1;
    } else {
        tracing::error!(%error, "saga failed");
        *errors += 1;
    }
}
