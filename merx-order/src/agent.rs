use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use merx_core::money::Money;
use merx_core::{Error, Result};
use merx_payment::{InitPaymentResponse, PaymentProvider, PaymentRequest, PaymentState, PaymentStatus};
use merx_pricing::{PriceCalculator, PricingContext};
use rand::RngCore;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Complaint, Note, Order, OrderItemState, OrderState, PaymentInformation};
use crate::store::OrderStore;

/// Per-order operations: item-level changes and the payment state machine.
///
/// Bound to exactly one order for its lifetime. Every mutation works on a
/// copy, persists it with an optimistic version check, and only then replaces
/// the agent's view, so a failed save never leaves half-applied state.
pub struct OrderAgent {
    order: Order,
    store: Arc<dyn OrderStore>,
    calculator: Arc<PriceCalculator>,
    provider: Arc<dyn PaymentProvider>,
    gateway_timeout: Duration,
}

impl OrderAgent {
    pub(crate) fn new(
        order: Order,
        store: Arc<dyn OrderStore>,
        calculator: Arc<PriceCalculator>,
        provider: Arc<dyn PaymentProvider>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            order,
            store,
            calculator,
            provider,
            gateway_timeout,
        }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Cancel an order item. If a cleared payment exists, a proportional
    /// refund is issued through the bound provider before the cancellation is
    /// persisted; the returned note records the refund outcome.
    pub async fn item_cancel(&mut self, item_id: Uuid) -> Result<Note> {
        let item = self.order.item(item_id)?;
        if item.state == OrderItemState::Cancelled {
            return Err(Error::InvalidState(format!(
                "order item {item_id} is already cancelled"
            )));
        }

        let refund_amount = Money::new(item.total_price, &self.order.currency).rounded();
        let item_name = item.name.clone();

        let refund_outcome = match self.order.cleared_payment() {
            Some(payment) => {
                let transaction_id = payment.transaction_id.clone().unwrap_or_default();
                let reference = payment.reference.clone();
                let status = self
                    .bounded(self.provider.execute_credit(
                        &refund_amount,
                        &reference,
                        &transaction_id,
                    ))
                    .await?;
                format!(
                    "refund of {refund_amount} via '{}': {} ({})",
                    self.provider.name(),
                    status.state.as_str(),
                    status.transaction_id
                )
            }
            None => "no cleared payment, nothing refunded".to_string(),
        };

        let mut updated = self.order.clone();
        updated.item_mut(item_id)?.set_state(OrderItemState::Cancelled)?;
        recompute_totals(&mut updated, &self.calculator)?;

        if updated.state == OrderState::Committed && updated.all_items_cancelled() {
            updated.state = OrderState::Cancelled;
            tracing::info!(order_id = %updated.id, "all items cancelled, order cancelled");
        }

        let note = updated.add_note(
            "Item cancelled",
            format!("'{item_name}' ({item_id}) cancelled; {refund_outcome}"),
        );
        self.persist(updated).await?;
        Ok(note)
    }

    /// Record a complaint over part or all of an item's quantity. Does not
    /// refund by itself.
    pub async fn item_complaint(&mut self, item_id: Uuid, quantity: Decimal) -> Result<Note> {
        let item = self.order.item(item_id)?;
        if quantity <= Decimal::ZERO || quantity > item.quantity {
            return Err(Error::InvalidArgument(format!(
                "complaint quantity {quantity} outside (0, {}]",
                item.quantity
            )));
        }
        let item_name = item.name.clone();

        let mut updated = self.order.clone();
        let item = updated.item_mut(item_id)?;
        item.set_state(OrderItemState::Complaint)?;
        item.complaints.push(Complaint {
            quantity,
            created_at: Utc::now(),
        });

        let note = updated.add_note(
            "Item complaint",
            format!("complaint over {quantity} x '{item_name}' ({item_id})"),
        );
        self.persist(updated).await?;
        Ok(note)
    }

    /// Change an item's quantity and reprice it and the order through the
    /// pricing pipeline.
    pub async fn item_change_amount(&mut self, item_id: Uuid, quantity: Decimal) -> Result<Note> {
        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidArgument(format!(
                "change amount requires a positive quantity, got {quantity}"
            )));
        }
        let item = self.order.item(item_id)?;
        let old_quantity = item.quantity;
        let old_total = item.total_price;
        let item_name = item.name.clone();

        let mut updated = self.order.clone();
        let item = updated.item_mut(item_id)?;
        item.set_state(OrderItemState::Changed)?;
        item.quantity = quantity;
        item.total_price = item.line_amount();
        let new_total = item.total_price;
        recompute_totals(&mut updated, &self.calculator)?;

        let note = updated.add_note(
            "Item amount changed",
            format!(
                "'{item_name}' ({item_id}): quantity {old_quantity} -> {quantity}, \
                 total {old_total} -> {new_total}"
            ),
        );
        self.persist(updated).await?;
        Ok(note)
    }

    /// Set an item's status directly. The transition table is enforced;
    /// cancelling through here does not refund.
    pub async fn item_set_status(&mut self, item_id: Uuid, state: OrderItemState) -> Result<Note> {
        let item = self.order.item(item_id)?;
        let old_state = item.state;
        let item_name = item.name.clone();

        let mut updated = self.order.clone();
        updated.item_mut(item_id)?.set_state(state)?;
        let note = updated.add_note(
            "Item status changed",
            format!("'{item_name}' ({item_id}): {old_state:?} -> {state:?}"),
        );
        self.persist(updated).await?;
        Ok(note)
    }

    /// Return the active payment attempt, creating one when none exists or
    /// `force_new` is set. The fresh internal payment id is persisted before
    /// the provider is contacted, so the correlation key survives the
    /// redirect round trip.
    pub async fn start_payment(&mut self, force_new: bool) -> Result<PaymentInformation> {
        if !force_new {
            if let Some(existing) = self
                .order
                .payments
                .iter()
                .find(|p| p.active && !p.state.is_terminal())
            {
                return Ok(existing.clone());
            }
        }

        let reference = mint_payment_reference();
        let mut updated = self.order.clone();
        for payment in &mut updated.payments {
            payment.active = false;
        }
        updated
            .payments
            .push(PaymentInformation::new(&reference, self.provider.name()));
        self.persist(updated).await?;
        tracing::info!(
            order_id = %self.order.id,
            reference = %reference,
            "payment attempt created"
        );

        let total = Money::new(self.order.total, &self.order.currency);
        let init = self
            .bounded(
                self.provider
                    .init_payment(&total, &PaymentRequest::new(&reference)),
            )
            .await?;

        let mut updated = self.order.clone();
        if let Some(payment) = updated
            .payments
            .iter_mut()
            .find(|p| p.reference == reference)
        {
            match &init {
                InitPaymentResponse::Redirect { url, params } => {
                    payment
                        .provider_data
                        .insert("gateway_url".to_string(), url.clone());
                    payment.provider_data.extend(params.clone());
                }
                InitPaymentResponse::Form { action, fields } => {
                    payment
                        .provider_data
                        .insert("form_action".to_string(), action.clone());
                    payment.provider_data.extend(fields.clone());
                }
            }
        }
        self.persist(updated).await?;

        self.order
            .payment_by_reference(&reference)
            .cloned()
            .ok_or_else(|| Error::Store("payment vanished after save".to_string()))
    }

    /// Apply a verified gateway status to the order: the central state
    /// machine transition.
    ///
    /// Duplicate and already-terminal redeliveries are absorbed as no-ops
    /// that still return success, so gateway retries are always safe. A
    /// genuine transition is persisted all-or-nothing together with its audit
    /// note.
    pub async fn update_payment(&mut self, status: &PaymentStatus) -> Result<&mut Self> {
        let digest = status.digest();
        let (payment_state, already_applied) = {
            let payment = self
                .order
                .payment_by_reference(&status.reference)
                .ok_or_else(|| {
                    Error::NotFound(format!(
                        "payment '{}' on order {}",
                        status.reference, self.order.id
                    ))
                })?;
            (payment.state, payment.processed_digests.contains(&digest))
        };

        if already_applied {
            tracing::info!(
                order_id = %self.order.id,
                reference = %status.reference,
                "duplicate payment callback absorbed"
            );
            return Ok(self);
        }
        if payment_state.is_terminal() {
            if payment_state == status.state {
                tracing::info!(
                    order_id = %self.order.id,
                    reference = %status.reference,
                    "terminal payment state re-delivered, absorbed"
                );
                return Ok(self);
            }
            return Err(Error::InvalidState(format!(
                "payment '{}' is {} and cannot move to {}",
                status.reference,
                payment_state.as_str(),
                status.state.as_str()
            )));
        }

        let mut updated = self.order.clone();
        let payment = updated
            .payments
            .iter_mut()
            .find(|p| p.reference == status.reference)
            .ok_or_else(|| Error::NotFound(format!("payment '{}'", status.reference)))?;

        payment.state = status.state;
        payment.transaction_id = Some(status.transaction_id.clone());
        payment.processed_digests.push(digest);
        payment.provider_data.extend(status.data.clone());

        match status.state {
            PaymentState::Open => {}
            PaymentState::Authorized => {
                // Auth data lands in the payment's provider_data above; the
                // order keeps waiting for clearing.
            }
            PaymentState::Cleared => {
                if updated.state.is_terminal() {
                    return Err(Error::InvalidState(format!(
                        "order {} is {:?} and cannot commit",
                        updated.id, updated.state
                    )));
                }
                updated.state = OrderState::Committed;
                if !updated.completion_recorded {
                    updated.completion_recorded = true;
                    tracing::info!(order_id = %updated.id, "checkout completed");
                }
            }
            PaymentState::Cancelled => {
                if updated.state.is_terminal() {
                    return Err(Error::InvalidState(format!(
                        "order {} is {:?} and cannot abort",
                        updated.id, updated.state
                    )));
                }
                updated.state = OrderState::Aborted;
            }
        }

        updated.add_note(
            "Payment update",
            format!(
                "payment '{}' -> {} (transaction '{}'): {}",
                status.reference,
                status.state.as_str(),
                status.transaction_id,
                status.message
            ),
        );

        tracing::info!(
            order_id = %updated.id,
            reference = %status.reference,
            state = status.state.as_str(),
            order_state = ?updated.state,
            "payment status applied"
        );
        self.persist(updated).await?;
        Ok(self)
    }

    async fn persist(&mut self, mut updated: Order) -> Result<()> {
        updated.updated_at = Utc::now();
        self.store.save_order(&mut updated).await?;
        self.order = updated;
        Ok(())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.gateway_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::GatewayTimeout(self.gateway_timeout)),
        }
    }
}

/// Unguessable internal payment id; round-tripped through the gateway as the
/// correlation key.
fn mint_payment_reference() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn recompute_totals(order: &mut Order, calculator: &PriceCalculator) -> Result<()> {
    let open_items: Vec<_> = order
        .items
        .iter()
        .filter(|i| i.state != OrderItemState::Cancelled)
        .collect();
    let subtotal: Decimal = open_items.iter().map(|i| i.line_amount()).sum();
    let quantity: Decimal = open_items.iter().map(|i| i.quantity).sum();

    let ctx = PricingContext::new(&order.currency)
        .with_quantity(quantity)
        .with_voucher_codes(order.voucher_codes.clone());
    let priced = calculator.calculate(&Money::new(subtotal, &order.currency), &ctx)?;

    order.subtotal = priced.subtotal().amount();
    order.total = priced.total().amount();
    order.modifications = priced.modifications;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::OrderManager;
    use crate::store::OrderStore;
    use async_trait::async_trait;
    use merx_cart::{Cart, CartOwner};
    use merx_core::config::{ModifierConfig, PricingConfig};
    use merx_payment::MockGateway;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestStore {
        orders: Mutex<HashMap<Uuid, Order>>,
    }

    #[async_trait]
    impl OrderStore for TestStore {
        async fn insert_order_for_cart(&self, order: Order) -> Result<Order> {
            let mut orders = self.orders.lock().unwrap();
            if let Some(existing) = orders.values().find(|o| o.cart_id == order.cart_id) {
                return Ok(existing.clone());
            }
            orders.insert(order.id, order.clone());
            Ok(order)
        }

        async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
            Ok(self.orders.lock().unwrap().get(&id).cloned())
        }

        async fn find_order_by_cart(&self, cart_id: Uuid) -> Result<Option<Order>> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .values()
                .find(|o| o.cart_id == cart_id)
                .cloned())
        }

        async fn find_order_by_payment_reference(
            &self,
            reference: &str,
        ) -> Result<Option<Order>> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .values()
                .find(|o| o.payment_by_reference(reference).is_some())
                .cloned())
        }

        async fn save_order(&self, order: &mut Order) -> Result<()> {
            let mut orders = self.orders.lock().unwrap();
            let stored = orders
                .get(&order.id)
                .ok_or_else(|| Error::NotFound(format!("order {}", order.id)))?;
            if stored.version != order.version {
                return Err(Error::Conflict(format!("order {}", order.id)));
            }
            order.version += 1;
            orders.insert(order.id, order.clone());
            Ok(())
        }
    }

    fn manager(gateway: Arc<MockGateway>) -> OrderManager {
        let calculator = PriceCalculator::from_config(&PricingConfig {
            modifiers: vec![ModifierConfig::Tax {
                name: "vat".to_string(),
                rate_percent: dec!(19),
            }],
        })
        .unwrap();
        OrderManager::new(Arc::new(TestStore::default()), Arc::new(calculator), gateway)
    }

    async fn checked_out_agent(gateway: Arc<MockGateway>) -> (OrderManager, OrderAgent, Uuid) {
        let manager = manager(gateway);
        let mut cart = Cart::new("web", CartOwner::Guest, "EUR");
        cart.add_item(Uuid::new_v4(), "productA", dec!(10.00), dec!(2), None)
            .unwrap();
        // Assign the cart id without a cart store; only orders matter here.
        struct NullCartStore;
        #[async_trait]
        impl merx_cart::CartStore for NullCartStore {
            async fn put_cart(&self, _cart: &Cart) -> Result<()> {
                Ok(())
            }
            async fn get_cart(&self, _id: Uuid) -> Result<Option<Cart>> {
                Ok(None)
            }
            async fn remove_cart(&self, _id: Uuid) -> Result<()> {
                Ok(())
            }
        }
        cart.save(&NullCartStore).await.unwrap();

        let order = manager.get_or_create_order_from_cart(&cart).await.unwrap();
        let item_id = order.items[0].id;
        let agent = manager.create_order_agent(order);
        (manager, agent, item_id)
    }

    #[tokio::test]
    async fn test_order_snapshot_totals() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, agent, _) = checked_out_agent(gateway).await;

        let order = agent.order();
        assert_eq!(order.state, OrderState::Pending);
        assert_eq!(order.subtotal, dec!(20.00));
        assert_eq!(order.total, dec!(23.80));
    }

    #[tokio::test]
    async fn test_start_payment_reuses_active_attempt() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, _) = checked_out_agent(gateway).await;

        let first = agent.start_payment(false).await.unwrap();
        let again = agent.start_payment(false).await.unwrap();
        assert_eq!(first.reference, again.reference);

        let forced = agent.start_payment(true).await.unwrap();
        assert_ne!(first.reference, forced.reference);
        assert_eq!(agent.order().payments.len(), 2);
        assert_eq!(agent.order().active_payment().unwrap().reference, forced.reference);
    }

    #[tokio::test]
    async fn test_cleared_status_commits_order() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, _) = checked_out_agent(Arc::clone(&gateway)).await;

        let payment = agent.start_payment(false).await.unwrap();
        let raw = gateway
            .signed_callback(&payment.reference, "txn-1", "SUCCESS")
            .unwrap();
        let status = gateway.handle_response(&raw).await.unwrap();

        agent.update_payment(&status).await.unwrap();
        assert_eq!(agent.order().state, OrderState::Committed);
        assert!(agent.order().completion_recorded);
    }

    #[tokio::test]
    async fn test_redelivered_status_is_noop() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, _) = checked_out_agent(Arc::clone(&gateway)).await;

        let payment = agent.start_payment(false).await.unwrap();
        let raw = gateway
            .signed_callback(&payment.reference, "txn-1", "SUCCESS")
            .unwrap();
        let status = gateway.handle_response(&raw).await.unwrap();

        agent.update_payment(&status).await.unwrap();
        let version = agent.order().version;
        let notes = agent.order().notes.len();

        agent.update_payment(&status).await.unwrap();
        assert_eq!(agent.order().state, OrderState::Committed);
        assert_eq!(agent.order().version, version);
        assert_eq!(agent.order().notes.len(), notes);
    }

    #[tokio::test]
    async fn test_replayed_earlier_status_is_absorbed() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, _) = checked_out_agent(Arc::clone(&gateway)).await;

        let payment = agent.start_payment(false).await.unwrap();
        let raw = gateway
            .signed_callback(&payment.reference, "txn-1", "AUTHORIZED")
            .unwrap();
        let authorized = gateway.handle_response(&raw).await.unwrap();
        agent.update_payment(&authorized).await.unwrap();
        assert_eq!(agent.order().state, OrderState::Pending);

        let raw = gateway
            .signed_callback(&payment.reference, "txn-1", "SUCCESS")
            .unwrap();
        let cleared = gateway.handle_response(&raw).await.unwrap();
        agent.update_payment(&cleared).await.unwrap();
        assert_eq!(agent.order().state, OrderState::Committed);

        // The gateway re-delivers the old AUTHORIZED callback after the
        // payment already cleared: absorbed, nothing changes.
        let version = agent.order().version;
        let notes = agent.order().notes.len();
        agent.update_payment(&authorized).await.unwrap();
        assert_eq!(agent.order().state, OrderState::Committed);
        assert_eq!(agent.order().version, version);
        assert_eq!(agent.order().notes.len(), notes);
    }

    #[tokio::test]
    async fn test_authorized_data_is_scoped_to_the_order() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent_a, _) = checked_out_agent(Arc::clone(&gateway)).await;
        let (_, mut agent_b, _) = checked_out_agent(Arc::clone(&gateway)).await;

        let payment_a = agent_a.start_payment(false).await.unwrap();
        let mut raw = gateway
            .signed_callback(&payment_a.reference, "txn-a", "AUTHORIZED")
            .unwrap();
        raw.insert("card_token".to_string(), "tok-a".to_string());
        let status = gateway.handle_response(&raw).await.unwrap();
        agent_a.update_payment(&status).await.unwrap();

        let payment_b = agent_b.start_payment(false).await.unwrap();
        let mut raw = gateway
            .signed_callback(&payment_b.reference, "txn-b", "AUTHORIZED")
            .unwrap();
        raw.insert("card_token".to_string(), "tok-b".to_string());
        let status = gateway.handle_response(&raw).await.unwrap();
        agent_b.update_payment(&status).await.unwrap();

        // Both orders went through the same shared provider instance; each
        // keeps its own authorization data.
        let data_a = &agent_a.order().active_payment().unwrap().provider_data;
        let data_b = &agent_b.order().active_payment().unwrap().provider_data;
        assert_eq!(data_a["card_token"], "tok-a");
        assert_eq!(data_b["card_token"], "tok-b");
    }

    #[tokio::test]
    async fn test_cancelled_status_aborts_order() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, _) = checked_out_agent(Arc::clone(&gateway)).await;

        let payment = agent.start_payment(false).await.unwrap();
        let raw = gateway
            .signed_callback(&payment.reference, "txn-1", "FAILURE")
            .unwrap();
        let status = gateway.handle_response(&raw).await.unwrap();

        agent.update_payment(&status).await.unwrap();
        assert_eq!(agent.order().state, OrderState::Aborted);
    }

    #[tokio::test]
    async fn test_unknown_reference_is_not_found() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, _) = checked_out_agent(Arc::clone(&gateway)).await;
        agent.start_payment(false).await.unwrap();

        let raw = gateway.signed_callback("alien-ref", "txn-1", "SUCCESS").unwrap();
        let status = gateway.handle_response(&raw).await.unwrap();
        assert!(matches!(
            agent.update_payment(&status).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_double_cancel_rejected_without_duplicate_note() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, item_id) = checked_out_agent(gateway).await;

        agent.item_cancel(item_id).await.unwrap();
        let notes = agent.order().notes.len();

        assert!(matches!(
            agent.item_cancel(item_id).await,
            Err(Error::InvalidState(_))
        ));
        assert_eq!(agent.order().notes.len(), notes);
    }

    #[tokio::test]
    async fn test_cancel_after_clearing_refunds() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, item_id) = checked_out_agent(Arc::clone(&gateway)).await;

        let payment = agent.start_payment(false).await.unwrap();
        let raw = gateway
            .signed_callback(&payment.reference, "txn-1", "SUCCESS")
            .unwrap();
        let status = gateway.handle_response(&raw).await.unwrap();
        agent.update_payment(&status).await.unwrap();

        let note = agent.item_cancel(item_id).await.unwrap();
        assert!(note.description.contains("refund"));
        assert!(note.description.contains("CLEARED"));
        // Single item cancelled on a committed order: order is cancelled.
        assert_eq!(agent.order().state, OrderState::Cancelled);
    }

    #[tokio::test]
    async fn test_complaint_quantity_bounds() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, item_id) = checked_out_agent(gateway).await;

        assert!(matches!(
            agent.item_complaint(item_id, dec!(0)).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            agent.item_complaint(item_id, dec!(3)).await,
            Err(Error::InvalidArgument(_))
        ));

        let note = agent.item_complaint(item_id, dec!(1)).await.unwrap();
        assert!(note.description.contains("complaint"));
        assert_eq!(agent.order().items[0].state, OrderItemState::Complaint);
        assert_eq!(agent.order().items[0].complaints.len(), 1);
    }

    #[tokio::test]
    async fn test_change_amount_reprices_order() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, item_id) = checked_out_agent(gateway).await;

        agent.item_change_amount(item_id, dec!(3)).await.unwrap();
        let order = agent.order();
        assert_eq!(order.items[0].quantity, dec!(3));
        assert_eq!(order.items[0].total_price, dec!(30.00));
        assert_eq!(order.subtotal, dec!(30.00));
        assert_eq!(order.total, dec!(35.70));
        assert_eq!(order.items[0].state, OrderItemState::Changed);
    }

    #[tokio::test]
    async fn test_set_status_enforces_transitions() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (_, mut agent, item_id) = checked_out_agent(gateway).await;

        agent
            .item_set_status(item_id, OrderItemState::Cancelled)
            .await
            .unwrap();
        assert!(matches!(
            agent.item_set_status(item_id, OrderItemState::Open).await,
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_by_payment_status() {
        let gateway = Arc::new(MockGateway::new("s3cret"));
        let (manager, mut agent, _) = checked_out_agent(Arc::clone(&gateway)).await;

        let payment = agent.start_payment(false).await.unwrap();
        let raw = gateway
            .signed_callback(&payment.reference, "txn-1", "SUCCESS")
            .unwrap();
        let status = gateway.handle_response(&raw).await.unwrap();

        let found = manager.get_order_by_payment_status(&status).await.unwrap();
        assert_eq!(found.id, agent.order().id);
    }
}
