use super::error::MatchError;
use super::lot::{Direction, Lot, LotId};
use super::money::{average, profit_or_loss, proportion};
use super::state::{MatchEvent, MatchingRule, OutstandingState};
use super::uk::TaxYear;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

/// Weighted-average holding of every share not matched by a higher-priority rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Section104Holding {
    /// Ids of every buy lot pooled since the holding was last empty
    pub ids: Vec<String>,
    pub quantity: u64,
    #[schemars(with = "String")]
    pub total_cost: Decimal,
}

impl Section104Holding {
    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    pub fn average_cost(&self) -> Decimal {
        average(self.total_cost, self.quantity)
    }

    /// Add to the pool (acquisition)
    pub fn add(&mut self, ids: &[String], quantity: u64, cost: Decimal) {
        self.ids.extend_from_slice(ids);
        self.quantity += quantity;
        self.total_cost += cost;
        log::debug!(
            "Pool ADD: qty={}, cost={}. New total: qty={}, cost={}",
            quantity,
            cost,
            self.quantity,
            self.total_cost
        );
    }

    /// Remove from the pool (disposal), returns allowable cost
    pub fn remove(&mut self, quantity: u64) -> Decimal {
        if quantity >= self.quantity {
            let cost = self.total_cost;
            log::debug!("Pool REMOVE ALL: qty={}, cost={}", self.quantity, cost);
            *self = Section104Holding::default();
            cost
        } else {
            let cost = proportion(self.total_cost, quantity, self.quantity);
            self.quantity -= quantity;
            self.total_cost -= cost;
            log::debug!(
                "Pool REMOVE: qty={}, cost={}. Remaining: qty={}, cost={}",
                quantity,
                cost,
                self.quantity,
                self.total_cost
            );
            cost
        }
    }
}

impl std::fmt::Display for Section104Holding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} shares costing £{:.2} (IDs {})",
            self.quantity,
            self.total_cost,
            self.ids.join(", ")
        )
    }
}

/// Snapshot of the pool after one addition or disposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PoolHistoryEntry {
    #[schemars(with = "String")]
    pub date: NaiveDate,
    pub direction: Direction,
    pub ids: Vec<String>,
    /// Shares added or removed in this step
    pub quantity: u64,
    /// Cost added or allowable cost removed in this step
    #[schemars(with = "String")]
    pub cost: Decimal,
    pub pool_quantity: u64,
    #[schemars(with = "String")]
    pub pool_cost: Decimal,
}

impl PoolHistoryEntry {
    fn new(lot: &Lot, quantity: u64, cost: Decimal, pool: &Section104Holding) -> Self {
        PoolHistoryEntry {
            date: lot.date,
            direction: lot.direction,
            ids: lot.ids.clone(),
            quantity,
            cost,
            pool_quantity: pool.quantity,
            pool_cost: pool.total_cost,
        }
    }
}

/// What the pool pass leaves behind besides the outstanding lots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section104Outcome {
    pub history: Vec<PoolHistoryEntry>,
    /// Residual holding to carry into a later period, if any
    pub carry_forward: Option<Section104Holding>,
}

/// Run every remaining lot through the Section 104 holding in date order.
///
/// Buys first cover any open short position, the rest is pooled. Sells are
/// matched against the pool at its average cost; whatever the pool cannot
/// cover is left outstanding for the acquisition-following-disposal rule.
pub fn match_section104(state: &mut OutstandingState) -> Result<Section104Outcome, MatchError> {
    // Sells ahead of buys, so a stable sort keeps same-date sells first
    let mut lots = std::mem::take(&mut state.sells);
    lots.append(&mut std::mem::take(&mut state.buys));
    lots.sort_by_key(|id| state.lot(*id).date);

    let mut holding = Section104Holding::default();
    let mut outcome = Section104Outcome::default();

    for id in lots {
        let direction = state.lot(id).direction;
        match direction {
            Direction::Buy => pool_acquisition(state, &mut holding, &mut outcome.history, id)?,
            Direction::Sell => match_disposal(state, &mut holding, &mut outcome.history, id),
        }
    }

    if !holding.is_empty() {
        log::warn!(
            "CARRY FORWARD: {} remain in the Section 104 holding and may need to be matched with future disposals",
            holding
        );
        outcome.carry_forward = Some(holding);
    }

    Ok(outcome)
}

/// Shares sold short in this pass that no set-aside buy covers yet
fn open_short_quantity(state: &OutstandingState) -> Result<u64, MatchError> {
    let sold = total_quantity(state, &state.sells)?;
    let covered = total_quantity(state, &state.buys)?;
    Ok(sold.saturating_sub(covered))
}

fn total_quantity(state: &OutstandingState, lots: &[LotId]) -> Result<u64, MatchError> {
    lots.iter().try_fold(0u64, |total, id| {
        let lot = state.lot(*id);
        total
            .checked_add(lot.quantity)
            .ok_or_else(|| MatchError::MalformedRecord {
                id: lot.ids_display(),
                description: lot.to_string(),
                reason: format!("outstanding {} quantity overflows", lot.direction),
            })
    })
}

fn pool_acquisition(
    state: &mut OutstandingState,
    holding: &mut Section104Holding,
    history: &mut Vec<PoolHistoryEntry>,
    buy: LotId,
) -> Result<(), MatchError> {
    let short = open_short_quantity(state)?;
    let quantity = state.lot(buy).quantity;

    if short >= quantity {
        log::info!("{} set aside to close a short position", state.lot(buy));
        state.buys.push(buy);
        return Ok(());
    }
    if short > 0 {
        let aside = state.store.split_off(buy, short);
        log::info!("{} set aside to close a short position", state.lot(aside));
        state.buys.push(aside);
    }

    let quantity = state.lot(buy).quantity;
    let cost = state.store.get_mut(buy).consume(quantity);
    let lot = state.lot(buy);
    holding.add(&lot.ids, quantity, cost);
    log::info!(
        "SECTION 104 {} shares priced at {} added to the holding on {} (IDs {})",
        quantity,
        average(cost, quantity),
        lot.date,
        lot.ids_display()
    );
    history.push(PoolHistoryEntry::new(lot, quantity, cost, holding));
    Ok(())
}

fn match_disposal(
    state: &mut OutstandingState,
    holding: &mut Section104Holding,
    history: &mut Vec<PoolHistoryEntry>,
    sell: LotId,
) {
    if holding.is_empty() {
        log::debug!("Pool empty, {} left outstanding", state.lot(sell));
        state.sells.push(sell);
        return;
    }

    let (sell_ids, sell_date, average_sell_price, sell_quantity, sell_total) = {
        let lot = state.lot(sell);
        (lot.ids.clone(), lot.date, lot.average_price(), lot.quantity, lot.total_price)
    };
    let quantity = sell_quantity.min(holding.quantity);
    let average_buy_price = holding.average_cost();
    let buy_ids = holding.ids.clone();
    let profit_or_loss = profit_or_loss(
        sell_total,
        sell_quantity,
        holding.total_cost,
        holding.quantity,
        quantity,
    );

    let proceeds = state.store.get_mut(sell).consume(quantity);
    let cost = holding.remove(quantity);

    let lot = state.lot(sell);
    history.push(PoolHistoryEntry::new(lot, quantity, cost, holding));
    if !lot.is_exhausted() {
        state.sells.push(sell);
    }

    state.record(MatchEvent {
        rule: MatchingRule::Section104,
        tax_year: TaxYear::from_date(sell_date),
        sell_ids,
        buy_ids,
        sell_date,
        buy_date: None,
        quantity,
        average_sell_price,
        average_buy_price,
        proceeds,
        cost,
        profit_or_loss,
    });
}
