//! Cart steps.

use async_trait::async_trait;
use common::{CartId, ProductId};
use document_store::{Collection, DocumentStore, DocumentStoreError, Filter, Update, UpdateOptions};
use domain::fields::{ID, MODIFIED_ON, PRODUCTS, PRODUCTS_ID, PRODUCTS_MATCHED_QUANTITY, QUANTITY, STATE};
use domain::{Cart, CartState, LineItem, Product, encode};

use super::{
    ADD_LINE_ITEM, COMPLETE_CART, EXPIRE_CART, REMOVE_LINE_ITEM, RESTORE_LINE_ITEM_QUANTITY,
    SET_LINE_ITEM_QUANTITY, now,
};
use crate::action::Action;
use crate::{Result, SagaError};

fn active_cart(cart_id: &CartId) -> Filter {
    Filter::by_id(cart_id.as_str()).eq(STATE, CartState::Active.as_str())
}

/// Appends a line item to an active cart, creating the cart on first use.
pub struct AddLineItem<S> {
    carts: Collection<S>,
}

#[derive(Debug, Clone)]
pub struct AddLineItemRequest {
    pub cart_id: CartId,
    pub product: Product,
    pub quantity: u32,
}

impl<S: DocumentStore> AddLineItem<S> {
    pub fn new(carts: Collection<S>) -> Self {
        Self { carts }
    }

    /// Works out why an upsert collided with an existing cart.
    async fn rejection(&self, request: &AddLineItemRequest) -> SagaError {
        let existing = match self.carts.find_one(&Filter::by_id(request.cart_id.as_str())).await {
            Ok(existing) => existing,
            Err(e) => return e.into(),
        };

        let reason = match existing {
            Some(doc) if doc.get(STATE).and_then(|s| s.as_str()) != Some(CartState::Active.as_str()) => {
                format!("cart {} is not active", request.cart_id)
            }
            Some(_) => format!("product {} is already in cart {}", request.product.id, request.cart_id),
            None => format!("cart {} changed concurrently", request.cart_id),
        };
        SagaError::precondition(ADD_LINE_ITEM, reason)
    }
}

#[async_trait]
impl<S: DocumentStore> Action for AddLineItem<S> {
    type Request = AddLineItemRequest;
    type Response = ();

    fn name(&self) -> &'static str {
        ADD_LINE_ITEM
    }

    async fn execute(&self, request: &AddLineItemRequest) -> Result<()> {
        let filter = active_cart(&request.cart_id).ne(PRODUCTS_ID, request.product.id.as_str());
        let line = encode(&LineItem::new(&request.product, request.quantity))?;
        let update = Update::new().set(MODIFIED_ON, now()).push(PRODUCTS, line);

        match self.carts.update_one(&filter, &update, UpdateOptions::upsert()).await {
            Ok(result) if !result.is_noop() => Ok(()),
            Ok(_) => Err(SagaError::precondition(ADD_LINE_ITEM, "upsert matched nothing")),
            Err(DocumentStoreError::DuplicateKey { .. }) => Err(self.rejection(request).await),
            Err(e) => Err(e.into()),
        }
    }
}

/// Pulls a product's line item out of a cart.
pub struct RemoveLineItem<S> {
    carts: Collection<S>,
}

#[derive(Debug, Clone)]
pub struct RemoveLineItemRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
}

impl<S: DocumentStore> RemoveLineItem<S> {
    pub fn new(carts: Collection<S>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for RemoveLineItem<S> {
    type Request = RemoveLineItemRequest;
    type Response = ();

    fn name(&self) -> &'static str {
        REMOVE_LINE_ITEM
    }

    async fn execute(&self, request: &RemoveLineItemRequest) -> Result<()> {
        let filter = Filter::by_id(request.cart_id.as_str()).eq(PRODUCTS_ID, request.product_id.as_str());
        let update = Update::new().pull(PRODUCTS, Filter::new().eq(ID, request.product_id.as_str()));

        let result = self.carts.update_one(&filter, &update, UpdateOptions::new()).await?;
        if result.matched_count == 0 {
            return Err(SagaError::precondition(
                REMOVE_LINE_ITEM,
                format!("cart {} has no line for product {}", request.cart_id, request.product_id),
            ));
        }
        Ok(())
    }
}

/// The quantity of a line item before and after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemChange {
    pub previous: u32,
    pub current: u32,
}

impl LineItemChange {
    /// Units the reservation has to grow by (negative when it shrinks).
    pub fn delta(&self) -> i64 {
        i64::from(self.current) - i64::from(self.previous)
    }
}

/// Overwrites the quantity of one line in an active cart.
///
/// The write is conditioned on the quantity that was read, so a concurrent
/// change between the read and the write is reported instead of lost.
pub struct SetLineItemQuantity<S> {
    carts: Collection<S>,
}

#[derive(Debug, Clone)]
pub struct SetLineItemQuantityRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl<S: DocumentStore> SetLineItemQuantity<S> {
    pub fn new(carts: Collection<S>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for SetLineItemQuantity<S> {
    type Request = SetLineItemQuantityRequest;
    type Response = LineItemChange;

    fn name(&self) -> &'static str {
        SET_LINE_ITEM_QUANTITY
    }

    async fn execute(&self, request: &SetLineItemQuantityRequest) -> Result<LineItemChange> {
        let product_id = request.product_id.as_str();
        let doc = self
            .carts
            .find_one(&active_cart(&request.cart_id).eq(PRODUCTS_ID, product_id))
            .await?
            .ok_or_else(|| SagaError::not_found("cart line", format!("{}/{}", request.cart_id, product_id)))?;

        let cart = Cart::from_document(&doc)?;
        let previous = cart
            .line_item(&request.product_id)
            .map(|line| line.quantity)
            .ok_or_else(|| SagaError::not_found("cart line", format!("{}/{}", request.cart_id, product_id)))?;

        let filter = active_cart(&request.cart_id)
            .elem_match(PRODUCTS, Filter::new().eq(ID, product_id).eq(QUANTITY, previous));
        let update = Update::new()
            .set(PRODUCTS_MATCHED_QUANTITY, request.quantity)
            .set(MODIFIED_ON, now());

        let result = self.carts.update_one(&filter, &update, UpdateOptions::new()).await?;
        if result.matched_count == 0 {
            return Err(SagaError::precondition(
                SET_LINE_ITEM_QUANTITY,
                format!("line {product_id} in cart {} changed from quantity {previous}", request.cart_id),
            ));
        }

        Ok(LineItemChange {
            previous,
            current: request.quantity,
        })
    }
}

/// Writes back the quantity a line held before a failed update.
///
/// The write only applies while the line still holds the quantity the
/// update left in it; a change made since then is reported, not overwritten.
pub struct RestoreLineItemQuantity<S> {
    carts: Collection<S>,
}

#[derive(Debug, Clone)]
pub struct RestoreLineItemQuantityRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// The quantity the line must still hold.
    pub expected: u32,
    pub quantity: u32,
}

impl<S: DocumentStore> RestoreLineItemQuantity<S> {
    pub fn new(carts: Collection<S>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for RestoreLineItemQuantity<S> {
    type Request = RestoreLineItemQuantityRequest;
    type Response = ();

    fn name(&self) -> &'static str {
        RESTORE_LINE_ITEM_QUANTITY
    }

    async fn execute(&self, request: &RestoreLineItemQuantityRequest) -> Result<()> {
        let product_id = request.product_id.as_str();
        let filter = active_cart(&request.cart_id)
            .elem_match(PRODUCTS, Filter::new().eq(ID, product_id).eq(QUANTITY, request.expected));
        let update = Update::new()
            .set(PRODUCTS_MATCHED_QUANTITY, request.quantity)
            .set(MODIFIED_ON, now());

        let result = self.carts.update_one(&filter, &update, UpdateOptions::new()).await?;
        if result.matched_count == 0 {
            return Err(SagaError::precondition(
                RESTORE_LINE_ITEM_QUANTITY,
                format!(
                    "line {product_id} in cart {} no longer holds quantity {}",
                    request.cart_id, request.expected
                ),
            ));
        }
        Ok(())
    }
}

/// Marks an active cart complete at checkout.
pub struct CompleteCart<S> {
    carts: Collection<S>,
}

impl<S: DocumentStore> CompleteCart<S> {
    pub fn new(carts: Collection<S>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for CompleteCart<S> {
    type Request = CartId;
    type Response = ();

    fn name(&self) -> &'static str {
        COMPLETE_CART
    }

    async fn execute(&self, cart_id: &CartId) -> Result<()> {
        let update = Update::new()
            .set(STATE, CartState::Complete.as_str())
            .set(MODIFIED_ON, now());

        let result = self
            .carts
            .update_one(&active_cart(cart_id), &update, UpdateOptions::new())
            .await?;
        if result.matched_count == 0 {
            return Err(SagaError::precondition(
                COMPLETE_CART,
                format!("cart {cart_id} is not active"),
            ));
        }
        Ok(())
    }
}

/// Marks a cart expired, provided it is exactly as it was when read.
///
/// The write requires the same `modifiedOn`, the same number of lines and
/// every line at its read quantity. A line added after the read would
/// otherwise be left holding a reservation nobody releases.
pub struct ExpireCart<S> {
    carts: Collection<S>,
}

impl<S: DocumentStore> ExpireCart<S> {
    pub fn new(carts: Collection<S>) -> Self {
        Self { carts }
    }
}

fn unchanged_cart(cart: &Cart) -> Filter {
    let filter = active_cart(&cart.id)
        .eq(MODIFIED_ON, domain::timestamp(cart.modified_on))
        .exists(format!("{PRODUCTS}.{}", cart.products.len()), false);
    cart.products.iter().fold(filter, |filter, line| {
        filter.elem_match(
            PRODUCTS,
            Filter::new()
                .eq(ID, line.product_id.as_str())
                .eq(QUANTITY, line.quantity),
        )
    })
}

#[async_trait]
impl<S: DocumentStore> Action for ExpireCart<S> {
    type Request = Cart;
    type Response = ();

    fn name(&self) -> &'static str {
        EXPIRE_CART
    }

    async fn execute(&self, cart: &Cart) -> Result<()> {
        let update = Update::new()
            .set(STATE, CartState::Expired.as_str())
            .set(MODIFIED_ON, now());

        let result = self
            .carts
            .update_one(&unchanged_cart(cart), &update, UpdateOptions::new())
            .await?;
        if result.matched_count == 0 {
            return Err(SagaError::precondition(
                EXPIRE_CART,
                format!("cart {} is no longer active or changed since it was read", cart.id),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;
    use domain::Money;
    use domain::fields::CARTS;

    fn carts() -> Collection<InMemoryDocumentStore> {
        Collection::new(InMemoryDocumentStore::new(), CARTS)
    }

    fn add_request(product: &str, quantity: u32) -> AddLineItemRequest {
        AddLineItemRequest {
            cart_id: CartId::new("user-1"),
            product: Product::new(product, "Widget", Money::from_cents(100)),
            quantity,
        }
    }

    async fn load(carts: &Collection<InMemoryDocumentStore>) -> Cart {
        let doc = carts.find_one(&Filter::by_id("user-1")).await.unwrap().unwrap();
        Cart::from_document(&doc).unwrap()
    }

    #[tokio::test]
    async fn first_add_creates_active_cart() {
        let carts = carts();
        AddLineItem::new(carts.clone()).execute(&add_request("P1", 2)).await.unwrap();

        let cart = load(&carts).await;
        assert_eq!(cart.state, CartState::Active);
        assert_eq!(cart.products.len(), 1);
        assert_eq!(cart.products[0].quantity, 2);
    }

    #[tokio::test]
    async fn second_add_of_same_product_is_rejected() {
        let carts = carts();
        let step = AddLineItem::new(carts.clone());
        step.execute(&add_request("P1", 2)).await.unwrap();
        step.execute(&add_request("P2", 1)).await.unwrap();

        let err = step.execute(&add_request("P1", 3)).await.unwrap_err();

        assert!(matches!(err, SagaError::PreconditionFailed { step: ADD_LINE_ITEM, .. }));
        assert!(err.to_string().contains("already in cart"));
        assert_eq!(load(&carts).await.total_quantity(), 3);
    }

    #[tokio::test]
    async fn add_to_completed_cart_is_rejected() {
        let carts = carts();
        AddLineItem::new(carts.clone()).execute(&add_request("P1", 1)).await.unwrap();
        CompleteCart::new(carts.clone()).execute(&CartId::new("user-1")).await.unwrap();

        let err = AddLineItem::new(carts.clone())
            .execute(&add_request("P2", 1))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not active"));
        assert_eq!(load(&carts).await.products.len(), 1);
    }

    #[tokio::test]
    async fn set_quantity_reports_change() {
        let carts = carts();
        AddLineItem::new(carts.clone()).execute(&add_request("P1", 2)).await.unwrap();

        let change = SetLineItemQuantity::new(carts.clone())
            .execute(&SetLineItemQuantityRequest {
                cart_id: CartId::new("user-1"),
                product_id: ProductId::new("P1"),
                quantity: 5,
            })
            .await
            .unwrap();

        assert_eq!(change, LineItemChange { previous: 2, current: 5 });
        assert_eq!(change.delta(), 3);
        assert_eq!(load(&carts).await.products[0].quantity, 5);
    }

    #[tokio::test]
    async fn set_quantity_on_missing_line_is_not_found() {
        let carts = carts();
        AddLineItem::new(carts.clone()).execute(&add_request("P1", 2)).await.unwrap();

        let err = SetLineItemQuantity::new(carts)
            .execute(&SetLineItemQuantityRequest {
                cart_id: CartId::new("user-1"),
                product_id: ProductId::new("P9"),
                quantity: 1,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SagaError::RecordNotFound { kind: "cart line", .. }));
    }

    #[tokio::test]
    async fn remove_pulls_line_and_reports_missing() {
        let carts = carts();
        AddLineItem::new(carts.clone()).execute(&add_request("P1", 2)).await.unwrap();
        let remove = RemoveLineItem::new(carts.clone());
        let request = RemoveLineItemRequest {
            cart_id: CartId::new("user-1"),
            product_id: ProductId::new("P1"),
        };

        remove.execute(&request).await.unwrap();
        assert!(load(&carts).await.products.is_empty());

        let err = remove.execute(&request).await.unwrap_err();
        assert!(err.is_precondition_failed());
    }

    #[tokio::test]
    async fn cart_states_are_one_way() {
        let carts = carts();
        AddLineItem::new(carts.clone()).execute(&add_request("P1", 2)).await.unwrap();
        let cart_id = CartId::new("user-1");

        ExpireCart::new(carts.clone()).execute(&load(&carts).await).await.unwrap();
        let err = CompleteCart::new(carts.clone()).execute(&cart_id).await.unwrap_err();

        assert!(matches!(err, SagaError::PreconditionFailed { step: COMPLETE_CART, .. }));
        assert_eq!(load(&carts).await.state, CartState::Expired);
    }

    #[tokio::test]
    async fn expire_refuses_cart_changed_since_read() {
        let carts = carts();
        let add = AddLineItem::new(carts.clone());
        add.execute(&add_request("P1", 2)).await.unwrap();
        let snapshot = load(&carts).await;

        add.execute(&add_request("P2", 1)).await.unwrap();
        let err = ExpireCart::new(carts.clone()).execute(&snapshot).await.unwrap_err();

        assert!(matches!(err, SagaError::PreconditionFailed { step: EXPIRE_CART, .. }));
        let cart = load(&carts).await;
        assert_eq!(cart.state, CartState::Active);
        assert_eq!(cart.products.len(), 2);
    }

    #[tokio::test]
    async fn expire_refuses_line_with_changed_quantity() {
        let carts = carts();
        AddLineItem::new(carts.clone()).execute(&add_request("P1", 2)).await.unwrap();
        let mut snapshot = load(&carts).await;
        snapshot.products[0].quantity = 3;

        let err = ExpireCart::new(carts.clone()).execute(&snapshot).await.unwrap_err();

        assert!(err.is_precondition_failed());
        assert_eq!(load(&carts).await.state, CartState::Active);
    }

    #[tokio::test]
    async fn expire_accepts_empty_cart() {
        let carts = carts();
        let add = AddLineItem::new(carts.clone());
        add.execute(&add_request("P1", 2)).await.unwrap();
        RemoveLineItem::new(carts.clone())
            .execute(&RemoveLineItemRequest {
                cart_id: CartId::new("user-1"),
                product_id: ProductId::new("P1"),
            })
            .await
            .unwrap();

        ExpireCart::new(carts.clone()).execute(&load(&carts).await).await.unwrap();

        assert_eq!(load(&carts).await.state, CartState::Expired);
    }

    #[tokio::test]
    async fn restore_only_applies_over_expected_quantity() {
        let carts = carts();
        AddLineItem::new(carts.clone()).execute(&add_request("P1", 2)).await.unwrap();
        let restore = RestoreLineItemQuantity::new(carts.clone());
        let request = |expected| RestoreLineItemQuantityRequest {
            cart_id: CartId::new("user-1"),
            product_id: ProductId::new("P1"),
            expected,
            quantity: 1,
        };

        let err = restore.execute(&request(7)).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::PreconditionFailed { step: RESTORE_LINE_ITEM_QUANTITY, .. }
        ));
        assert_eq!(load(&carts).await.products[0].quantity, 2);

        restore.execute(&request(2)).await.unwrap();
        assert_eq!(load(&carts).await.products[0].quantity, 1);
    }
}
