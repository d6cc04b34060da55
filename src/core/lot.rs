use super::money::{average, proportion};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;

/// Side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "Buy"),
            Direction::Sell => write!(f, "Sell"),
        }
    }
}

/// A (possibly partial) quantity of shares bought or sold on one day.
///
/// `total_price` is the GBP magnitude for the whole remaining quantity, never a
/// per-share price. It is non-negative for both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Lot {
    /// Source transaction ids merged into this lot, in input order
    pub ids: Vec<String>,
    #[schemars(with = "String")]
    pub date: NaiveDate,
    pub direction: Direction,
    pub quantity: u64,
    #[schemars(with = "String")]
    pub total_price: Decimal,
}

impl Lot {
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        direction: Direction,
        quantity: u64,
        total_price: Decimal,
    ) -> Self {
        Lot {
            ids: vec![id.into()],
            date,
            direction,
            quantity,
            total_price,
        }
    }

    pub fn average_price(&self) -> Decimal {
        average(self.total_price, self.quantity)
    }

    pub fn is_exhausted(&self) -> bool {
        self.quantity == 0
    }

    /// Remove `quantity` shares and their proportional share of the price.
    ///
    /// Returns the price slice taken. Taking everything leaves the lot at zero.
    pub fn consume(&mut self, quantity: u64) -> Decimal {
        let quantity = quantity.min(self.quantity);
        let slice = proportion(self.total_price, quantity, self.quantity);
        self.quantity -= quantity;
        self.total_price -= slice;
        if self.quantity == 0 {
            self.total_price = Decimal::ZERO;
        }
        slice
    }

    pub fn ids_display(&self) -> String {
        self.ids.join(", ")
    }
}

impl fmt::Display for Lot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} shares on {} for £{:.2} (IDs {})",
            self.direction,
            self.quantity,
            self.date,
            self.total_price,
            self.ids_display()
        )
    }
}

/// Stable handle to a lot held in a [`LotStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LotId(usize);

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena owning every lot of a single run.
///
/// Lots are never removed from the arena; outstanding lists refer to them by
/// [`LotId`], so mutation goes through the store rather than shared references.
#[derive(Debug, Default)]
pub struct LotStore {
    lots: Vec<Lot>,
}

impl LotStore {
    pub fn insert(&mut self, lot: Lot) -> LotId {
        self.lots.push(lot);
        LotId(self.lots.len() - 1)
    }

    pub fn get(&self, id: LotId) -> &Lot {
        &self.lots[id.0]
    }

    pub fn get_mut(&mut self, id: LotId) -> &mut Lot {
        &mut self.lots[id.0]
    }

    /// Split `quantity` shares off `id` into a new lot with the same ids and date.
    pub fn split_off(&mut self, id: LotId, quantity: u64) -> LotId {
        let lot = self.get_mut(id);
        let mut split = lot.clone();
        let price = lot.consume(quantity);
        split.quantity = quantity.min(split.quantity);
        split.total_price = price;
        self.insert(split)
    }
}
