use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::chain::{Chain, ChainTable};

/// A wallet of shares per chain. Used both for the bank's supply and for
/// each player's holdings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stocks {
    stocks: ChainTable<u8>,
}

#[derive(Error, Debug)]
pub enum StockError {
    #[error("there is not enough stock to withdraw")]
    InsufficientStock,
}

impl Stocks {
    pub fn new(initial_value: u8) -> Self {
        Self {
            stocks: ChainTable::new(initial_value),
        }
    }

    pub fn amount(&self, chain: Chain) -> u8 {
        self.stocks.get(&chain)
    }

    pub fn has_any(&self, chain: Chain) -> bool {
        self.has_amount(chain, 1)
    }

    pub fn has_amount(&self, chain: Chain, amount: u8) -> bool {
        self.stocks[&chain] >= amount
    }

    pub fn deposit(&mut self, chain: Chain, amount: u8) {
        if amount == 0 {
            return;
        }

        self.stocks.set(&chain, self.stocks.get(&chain) + amount);
    }

    pub fn withdraw(&mut self, chain: Chain, withdraw_amount: u8) -> Result<(), StockError> {
        let amount_available = self.stocks.get(&chain);

        if withdraw_amount > amount_available {
            return Err(StockError::InsufficientStock);
        }

        self.stocks.set(&chain, amount_available - withdraw_amount);

        Ok(())
    }

    /// Withdraws everything, returning the amount that was held.
    pub fn drain(&mut self, chain: Chain) -> u8 {
        let amount = self.stocks.get(&chain);
        self.stocks.set(&chain, 0);
        amount
    }
}

#[cfg(test)]
mod test {
    use crate::chain::Chain;
    use crate::stock::Stocks;

    #[test]
    fn test_deposit_withdraw() {
        let mut stocks = Stocks::new(0);
        stocks.deposit(Chain::Luxor, 3);
        assert_eq!(stocks.amount(Chain::Luxor), 3);
        assert!(stocks.has_amount(Chain::Luxor, 3));

        stocks.withdraw(Chain::Luxor, 2).unwrap();
        assert_eq!(stocks.amount(Chain::Luxor), 1);

        assert!(stocks.withdraw(Chain::Luxor, 2).is_err());
        assert_eq!(stocks.amount(Chain::Luxor), 1);
    }

    #[test]
    fn test_drain() {
        let mut stocks = Stocks::new(5);
        assert_eq!(stocks.drain(Chain::Tower), 5);
        assert_eq!(stocks.amount(Chain::Tower), 0);
        assert_eq!(stocks.amount(Chain::Luxor), 5);
    }
}
