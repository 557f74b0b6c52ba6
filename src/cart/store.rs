use std::sync::Arc;

use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::events::{self, AppEvent, EventSender};
use crate::pricing::{PriceOracle, ProductInfo};

/// One cart row. Unit price is frozen at add-time: a later store price
/// change does not move an already-added item (the cart's pricing policy).
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Point-in-time view of one row, used to build the receipt.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// The shared source of truth for the running cart.
///
/// Mutated concurrently by the detection task and the UI task; every
/// read-modify-write runs under one mutex held only for the in-memory
/// part. Oracle lookups happen outside the lock so a slow store never
/// stalls the detection task.
#[derive(Clone)]
pub struct CartStore {
    items: Arc<Mutex<Vec<CartItem>>>,
    oracle: Arc<dyn PriceOracle>,
    events: EventSender,
}

impl CartStore {
    pub fn new(oracle: Arc<dyn PriceOracle>, events: EventSender) -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            oracle,
            events,
        }
    }

    /// Inserts `name` with quantity 1, priced by the oracle. Idempotent:
    /// adding an item already in the cart is a no-op; only `increment`
    /// bumps quantities.
    pub async fn add_item(&self, name: &str) {
        {
            let items = self.items.lock().await;
            if items.iter().any(|item| item.name == name) {
                return;
            }
        }

        // Lock released during the lookup; re-check before inserting in
        // case another task added the same item meanwhile.
        let info = self.oracle.lookup(name).await;

        let total = {
            let mut items = self.items.lock().await;
            if items.iter().any(|item| item.name == name) {
                return;
            }
            items.push(CartItem {
                name: name.to_string(),
                unit_price: info.price,
                quantity: 1,
            });
            info!("cart: added {} at {:.2} EUR", name, info.price);
            total_of(&items)
        };

        events::emit(&self.events, AppEvent::CartChanged { total });
    }

    /// Quantity += 1. Silent no-op when the item is not in the cart.
    pub async fn increment(&self, name: &str) {
        let total = {
            let mut items = self.items.lock().await;
            match items.iter_mut().find(|item| item.name == name) {
                Some(item) => item.quantity += 1,
                None => return,
            }
            total_of(&items)
        };

        events::emit(&self.events, AppEvent::CartChanged { total });
    }

    /// Quantity -= 1; the row is removed entirely when it would reach 0.
    pub async fn decrement(&self, name: &str) {
        let total = {
            let mut items = self.items.lock().await;
            let Some(pos) = items.iter().position(|item| item.name == name) else {
                return;
            };
            if items[pos].quantity > 1 {
                items[pos].quantity -= 1;
            } else {
                items.remove(pos);
            }
            total_of(&items)
        };

        events::emit(&self.events, AppEvent::CartChanged { total });
    }

    pub async fn remove_all(&self) {
        {
            let mut items = self.items.lock().await;
            items.clear();
        }

        events::emit(
            &self.events,
            AppEvent::CartChanged {
                total: Decimal::ZERO,
            },
        );
    }

    pub async fn total(&self) -> Decimal {
        let items = self.items.lock().await;
        total_of(&items)
    }

    /// Consistent point-in-time view in insertion order, taken under the
    /// same lock the mutators use so a concurrent add cannot tear it.
    pub async fn snapshot(&self) -> Vec<CartLine> {
        let items = self.items.lock().await;
        items
            .iter()
            .map(|item| CartLine {
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: Decimal::from(item.quantity) * item.unit_price,
            })
            .collect()
    }

    /// Snapshot-and-clear in one critical section: the receipt commit
    /// point. A detection landing after this instant stays in the cart for
    /// the next checkout instead of vanishing unreceipted.
    pub async fn take_all(&self) -> Vec<CartLine> {
        let lines = {
            let mut items = self.items.lock().await;
            let lines = items
                .iter()
                .map(|item| CartLine {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: Decimal::from(item.quantity) * item.unit_price,
                })
                .collect();
            items.clear();
            lines
        };

        events::emit(
            &self.events,
            AppEvent::CartChanged {
                total: Decimal::ZERO,
            },
        );

        lines
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Fresh oracle record for the nutrition popup; does not touch cart
    /// state or the frozen unit price.
    pub async fn product_info(&self, name: &str) -> ProductInfo {
        self.oracle.lookup(name).await
    }
}

fn total_of(items: &[CartItem]) -> Decimal {
    items
        .iter()
        .map(|item| Decimal::from(item.quantity) * item.unit_price)
        .sum()
}
