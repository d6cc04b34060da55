use super::error::MatchError;
use super::lot::Direction;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A single statement row as handed over by ingestion.
///
/// `amount` is the signed GBP change on the account: sells positive, buys negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

impl RawRecord {
    /// Direction encoded by the leading word of the description.
    pub fn direction(&self) -> Result<Direction, MatchError> {
        if self.description.starts_with("Sell") {
            Ok(Direction::Sell)
        } else if self.description.starts_with("Buy ") {
            Ok(Direction::Buy)
        } else {
            Err(self.malformed("unknown transaction type"))
        }
    }

    /// Share count following the direction word, e.g. "Buy 1,250 Company A@..." is 1250.
    pub fn quantity(&self) -> Result<u64, MatchError> {
        let rest = self
            .description
            .strip_prefix("Buy ")
            .or_else(|| self.description.strip_prefix("Sell "))
            .ok_or_else(|| self.malformed("unknown transaction type"))?;

        let digits: String = rest
            .chars()
            .take_while(|c| !c.is_whitespace())
            .filter(|c| *c != ',')
            .collect();

        match digits.parse::<u64>() {
            Ok(0) => Err(self.malformed("zero share quantity")),
            Ok(quantity) => Ok(quantity),
            Err(_) => Err(self.malformed("share quantity is not a whole number")),
        }
    }

    /// GBP magnitude of the trade with buys negated back to positive.
    pub fn total_price(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::Sell => self.amount,
            Direction::Buy => -self.amount,
        }
    }

    fn malformed(&self, reason: &str) -> MatchError {
        MatchError::MalformedRecord {
            id: self.id.clone(),
            description: self.description.clone(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(description: &str, amount: Decimal) -> RawRecord {
        RawRecord {
            id: "abcdefg-123456-hijk7890".to_string(),
            date: NaiveDate::from_ymd_opt(2022, 5, 16).unwrap(),
            description: description.to_string(),
            amount,
        }
    }

    #[test]
    fn classifies_buy_and_sell() {
        assert_eq!(record("Buy 10 Company A", dec!(-199.99)).direction(), Ok(Direction::Buy));
        assert_eq!(record("Sell 10 Company A", dec!(206.54)).direction(), Ok(Direction::Sell));
    }

    #[test]
    fn rejects_fee_rows() {
        let err = record("Transaction and/or third party fees", dec!(-0.42))
            .direction()
            .unwrap_err();
        assert!(matches!(err, MatchError::MalformedRecord { ref id, .. } if id == "abcdefg-123456-hijk7890"));
    }

    #[test]
    fn rejects_buyback_style_prefix() {
        // "Buyback" must not be mistaken for a buy
        assert!(record("Buyback 10 Company A", dec!(0)).direction().is_err());
    }

    #[test]
    fn parses_comma_formatted_quantity() {
        assert_eq!(record("Buy 1,250 Company A@1.2 GBP", dec!(-1500)).quantity(), Ok(1250));
        assert_eq!(record("Sell 10 Company A", dec!(206.54)).quantity(), Ok(10));
    }

    #[test]
    fn rejects_non_numeric_quantity() {
        let err = record("Buy ten Company A", dec!(-1)).quantity().unwrap_err();
        assert!(matches!(err, MatchError::MalformedRecord { ref reason, .. } if reason.contains("whole number")));
    }

    #[test]
    fn buy_amounts_become_positive_cost() {
        let buy = record("Buy 10 Company A", dec!(-199.99));
        assert_eq!(buy.total_price(Direction::Buy), dec!(199.99));
        let sell = record("Sell 10 Company A", dec!(206.54));
        assert_eq!(sell.total_price(Direction::Sell), dec!(206.54));
    }
}
