use super::error::MatchError;
use super::lot::{Lot, LotId, LotStore};
use super::money::{profit_or_loss, round_gbp};
use super::uk::TaxYear;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

/// Which HMRC rule was used for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub enum MatchingRule {
    SameDay,
    BedAndBreakfast,
    Section104,
    AcquisitionFollowingDisposal,
}

impl MatchingRule {
    pub fn display(&self) -> &'static str {
        match self {
            MatchingRule::SameDay => "Same-Day",
            MatchingRule::BedAndBreakfast => "B&B",
            MatchingRule::Section104 => "S104",
            MatchingRule::AcquisitionFollowingDisposal => "Following",
        }
    }

    /// Heading used for the narrative report lines
    pub fn heading(&self) -> &'static str {
        match self {
            MatchingRule::SameDay => "SAME DAY",
            MatchingRule::BedAndBreakfast => "BED AND BREAKFAST",
            MatchingRule::Section104 => "SECTION 104",
            MatchingRule::AcquisitionFollowingDisposal => "ACQUISITION FOLLOWING DISPOSAL",
        }
    }
}

impl std::fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// One pairing of sold shares with their cost, under a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct MatchEvent {
    pub rule: MatchingRule,
    #[schemars(with = "String")]
    pub tax_year: TaxYear,
    pub sell_ids: Vec<String>,
    /// Buy lot ids, or every id ever pooled for a Section 104 match
    pub buy_ids: Vec<String>,
    #[schemars(with = "String")]
    pub sell_date: NaiveDate,
    /// None when matched against the Section 104 holding
    #[schemars(with = "Option<String>")]
    pub buy_date: Option<NaiveDate>,
    pub quantity: u64,
    #[schemars(with = "String")]
    pub average_sell_price: Decimal,
    #[schemars(with = "String")]
    pub average_buy_price: Decimal,
    #[schemars(with = "String")]
    pub proceeds: Decimal,
    #[schemars(with = "String")]
    pub cost: Decimal,
    #[schemars(with = "String")]
    pub profit_or_loss: Decimal,
}

/// Running realised totals. Losses accumulate as negative amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ledger {
    pub total_gains: Decimal,
    pub total_losses: Decimal,
}

impl Ledger {
    pub fn record(&mut self, profit_or_loss: Decimal) {
        if profit_or_loss >= Decimal::ZERO {
            self.total_gains += profit_or_loss;
        } else {
            self.total_losses += profit_or_loss;
        }
    }

    pub fn gains(&self) -> Decimal {
        round_gbp(self.total_gains)
    }

    pub fn losses(&self) -> Decimal {
        round_gbp(self.total_losses)
    }

    pub fn net(&self) -> Decimal {
        round_gbp(self.gains() + self.losses())
    }
}

/// Residual lots and totals threaded through every matcher of a run.
#[derive(Debug, Default)]
pub struct OutstandingState {
    pub store: LotStore,
    /// Unmatched buys, ascending by date
    pub buys: Vec<LotId>,
    /// Unmatched sells, ascending by date
    pub sells: Vec<LotId>,
    pub ledger: Ledger,
    pub events: Vec<MatchEvent>,
}

impl OutstandingState {
    pub fn new(mut buys: Vec<Lot>, mut sells: Vec<Lot>) -> Self {
        buys.sort_by_key(|l| l.date);
        sells.sort_by_key(|l| l.date);

        let mut state = OutstandingState::default();
        state.buys = buys.into_iter().map(|l| state.store.insert(l)).collect();
        state.sells = sells.into_iter().map(|l| state.store.insert(l)).collect();
        state
    }

    pub fn lot(&self, id: LotId) -> &Lot {
        self.store.get(id)
    }

    pub fn is_outstanding_sell(&self, id: LotId) -> bool {
        self.sells.contains(&id)
    }

    pub fn outstanding_buys(&self) -> Vec<Lot> {
        self.buys.iter().map(|id| self.lot(*id).clone()).collect()
    }

    pub fn outstanding_sells(&self) -> Vec<Lot> {
        self.sells.iter().map(|id| self.lot(*id).clone()).collect()
    }

    /// Match one buy lot against one sell lot.
    ///
    /// Consumes `min(buy, sell)` shares from both, splitting whichever is larger
    /// proportionally; exhausted lots leave their outstanding list. The profit or
    /// loss is taken from the unrounded slices and rounded once, then recorded in
    /// the ledger and returned with the event.
    pub fn match_pair(
        &mut self,
        buy: LotId,
        sell: LotId,
        rule: MatchingRule,
    ) -> Result<MatchEvent, MatchError> {
        let (buy_ids, buy_date, average_buy_price, buy_quantity, buy_total) = {
            let lot = self.lot(buy);
            (lot.ids.clone(), lot.date, lot.average_price(), lot.quantity, lot.total_price)
        };
        let (sell_ids, sell_date, average_sell_price, sell_quantity, sell_total) = {
            let lot = self.lot(sell);
            (lot.ids.clone(), lot.date, lot.average_price(), lot.quantity, lot.total_price)
        };

        let quantity = buy_quantity.min(sell_quantity);
        let profit_or_loss =
            profit_or_loss(sell_total, sell_quantity, buy_total, buy_quantity, quantity);
        let cost = self.store.get_mut(buy).consume(quantity);
        let proceeds = self.store.get_mut(sell).consume(quantity);

        log::debug!(
            "{} match qty={}: proceeds={}, cost={}, remaining buy={}, remaining sell={}",
            rule,
            quantity,
            proceeds,
            cost,
            self.lot(buy).quantity,
            self.lot(sell).quantity
        );

        if self.lot(buy).is_exhausted() {
            remove(&mut self.buys, buy, "buy")?;
        }
        if self.lot(sell).is_exhausted() {
            remove(&mut self.sells, sell, "sell")?;
        }

        let event = MatchEvent {
            rule,
            tax_year: TaxYear::from_date(sell_date),
            sell_ids,
            buy_ids,
            sell_date,
            buy_date: Some(buy_date),
            quantity,
            average_sell_price,
            average_buy_price,
            proceeds,
            cost,
            profit_or_loss,
        };
        self.record(event.clone());
        Ok(event)
    }

    /// Book a match in the ledger and the event log
    pub fn record(&mut self, event: MatchEvent) {
        log::info!(
            "{} sell {} on {} matched {} shares: {} {}",
            event.rule.heading(),
            event.sell_ids.join(", "),
            event.sell_date,
            event.quantity,
            if event.profit_or_loss >= Decimal::ZERO { "profit" } else { "loss" },
            event.profit_or_loss
        );
        self.ledger.record(event.profit_or_loss);
        self.events.push(event);
    }
}

fn remove(list: &mut Vec<LotId>, id: LotId, name: &'static str) -> Result<(), MatchError> {
    let index = list
        .iter()
        .position(|l| *l == id)
        .ok_or(MatchError::MissingLot { id, list: name })?;
    list.remove(index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lot::Direction;
    use rust_decimal_macros::dec;

    fn lot(date: &str, direction: Direction, quantity: u64, total: Decimal) -> Lot {
        Lot::new(
            format!("{direction}-{date}"),
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            direction,
            quantity,
            total,
        )
    }

    fn single_pair(buy: Lot, sell: Lot) -> (OutstandingState, MatchEvent) {
        let mut state = OutstandingState::new(vec![buy], vec![sell]);
        let (b, s) = (state.buys[0], state.sells[0]);
        let event = state.match_pair(b, s, MatchingRule::SameDay).unwrap();
        (state, event)
    }

    #[test]
    fn equal_quantities_consume_both() {
        let (state, event) = single_pair(
            lot("2022-05-16", Direction::Buy, 10, dec!(199.99)),
            lot("2022-05-16", Direction::Sell, 10, dec!(206.54)),
        );

        assert_eq!(event.profit_or_loss, dec!(6.55));
        assert_eq!(event.quantity, 10);
        assert!(state.buys.is_empty());
        assert!(state.sells.is_empty());
        assert_eq!(state.ledger.gains(), dec!(6.55));
        assert_eq!(state.ledger.losses(), Decimal::ZERO);
    }

    #[test]
    fn larger_sell_is_split() {
        // Buy 15 for 120.10, sell 30 for 250.00 on the same day
        let (state, event) = single_pair(
            lot("2024-01-10", Direction::Buy, 15, dec!(120.10)),
            lot("2024-01-10", Direction::Sell, 30, dec!(250.00)),
        );

        assert_eq!(event.quantity, 15);
        assert_eq!(event.proceeds, dec!(125.00));
        assert_eq!(event.cost, dec!(120.10));
        assert_eq!(event.profit_or_loss, dec!(4.90));

        assert!(state.buys.is_empty());
        let sell = state.lot(state.sells[0]);
        assert_eq!(sell.quantity, 15);
        assert_eq!(sell.total_price, dec!(125.00));
    }

    #[test]
    fn larger_buy_is_split_and_loss_recorded_negative() {
        // Buy 200 for 3500.45, sell 100 for 250.00
        let (state, event) = single_pair(
            lot("2024-01-10", Direction::Buy, 200, dec!(3500.45)),
            lot("2024-01-10", Direction::Sell, 100, dec!(250.00)),
        );

        // half of 3500.45 = 1750.225, rounded half-even to 1750.22
        assert_eq!(event.cost, dec!(1750.22));
        assert_eq!(event.profit_or_loss, dec!(-1500.22));

        let buy = state.lot(state.buys[0]);
        assert_eq!(buy.quantity, 100);
        assert_eq!(buy.total_price + event.cost, dec!(3500.45));
        assert!(state.sells.is_empty());
        assert_eq!(state.ledger.losses(), dec!(-1500.22));
        assert_eq!(state.ledger.net(), dec!(-1500.22));
    }

    #[test]
    fn profit_at_half_penny_is_rounded_once() {
        // Sell 1 of 2 for 0.125 against a buy costing 0.01: 0.115 rounds to 0.12
        let (state, event) = single_pair(
            lot("2024-01-10", Direction::Buy, 1, dec!(0.01)),
            lot("2024-01-10", Direction::Sell, 2, dec!(0.25)),
        );

        assert_eq!(event.profit_or_loss, dec!(0.12));
        assert_eq!(event.proceeds, dec!(0.12));
        assert_eq!(event.cost, dec!(0.01));
        assert_eq!(state.ledger.gains(), dec!(0.12));

        let sell = state.lot(state.sells[0]);
        assert_eq!(sell.quantity, 1);
        assert_eq!(sell.total_price + event.proceeds, dec!(0.25));
    }

    #[test]
    fn conservation_holds_for_matched_pair() {
        let buy = lot("2024-03-01", Direction::Buy, 7, dec!(100.00));
        let sell = lot("2024-03-01", Direction::Sell, 3, dec!(50.00));
        let (state, event) = single_pair(buy.clone(), sell.clone());

        let remaining = state.lot(state.buys[0]);
        assert_eq!(buy.quantity, remaining.quantity + event.quantity);
        assert_eq!(buy.total_price, remaining.total_price + event.cost);
        assert_eq!(sell.total_price, event.proceeds);
    }

    #[test]
    fn ledger_net_adds_negative_losses() {
        let mut ledger = Ledger::default();
        ledger.record(dec!(10.005));
        ledger.record(dec!(-2.50));
        ledger.record(Decimal::ZERO);

        assert_eq!(ledger.gains(), dec!(10.00));
        assert_eq!(ledger.losses(), dec!(-2.50));
        assert_eq!(ledger.net(), dec!(7.50));
    }

    #[test]
    fn missing_lot_is_reported() {
        let mut state = OutstandingState::new(
            vec![lot("2024-01-01", Direction::Buy, 1, dec!(1))],
            vec![],
        );
        let id = state.buys[0];
        state.buys.clear();

        let err = remove(&mut state.buys, id, "buy").unwrap_err();
        assert_eq!(err, MatchError::MissingLot { id, list: "buy" });
    }
}
