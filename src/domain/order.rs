use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub item_id: String,
    pub quantity: u32,
    pub unit_price: Option<BigDecimal>,
}

/// An order as supplied by a caller, before the repository assigns its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItem>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Opaque position in the order listing.
///
/// A cursor returned from a listing call must be handed back unmodified to
/// continue. [`Cursor::START`] both begins a listing and, when returned,
/// signals that iteration has wrapped around to the beginning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cursor(u64);

impl Cursor {
    pub const START: Cursor = Cursor(0);

    pub fn new(position: u64) -> Self {
        Self(position)
    }

    pub fn position(self) -> u64 {
        self.0
    }

    pub fn is_start(self) -> bool {
        self == Self::START
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: Cursor,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct FindResult {
    pub orders: Vec<Order>,
    pub cursor: Cursor,
}
