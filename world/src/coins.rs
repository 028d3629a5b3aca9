//! Coins lying on the ground.

use std::collections::BTreeMap;

use skirmish_core::{CoinAmount, CoinError, TileCoord};

/// Map from tile to the coin resting on it. At most one coin per tile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoinLedger {
    coins: BTreeMap<TileCoord, CoinAmount>,
}

impl CoinLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from generated coins. Later entries replace earlier ones.
    pub fn from_coins<I>(coins: I) -> Self
    where
        I: IntoIterator<Item = (TileCoord, CoinAmount)>,
    {
        Self {
            coins: coins.into_iter().collect(),
        }
    }

    /// Drops a coin on the tile, replacing whatever was there.
    ///
    /// Amounts other than 1, 3 or 5 are refused. Ground checks belong to the caller.
    pub fn place_coin(&mut self, tile: TileCoord, amount: u32) -> Result<CoinAmount, CoinError> {
        let amount = CoinAmount::try_from(amount)?;
        let _ = self.coins.insert(tile, amount);
        Ok(amount)
    }

    /// Removes the coin on the tile and returns its value, or 0 when empty.
    pub fn collect_coin(&mut self, tile: TileCoord) -> u32 {
        self.take(tile).map_or(0, |amount| amount.get())
    }

    pub(crate) fn take(&mut self, tile: TileCoord) -> Option<CoinAmount> {
        self.coins.remove(&tile)
    }

    /// Reports whether a coin rests on the tile.
    #[must_use]
    pub fn has_coin(&self, tile: TileCoord) -> bool {
        self.coins.contains_key(&tile)
    }

    /// Denomination of the coin on the tile.
    #[must_use]
    pub fn amount_at(&self, tile: TileCoord) -> Option<CoinAmount> {
        self.coins.get(&tile).copied()
    }

    /// Number of coins on the ground.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    /// Reports whether no coin is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Sum of every coin on the ground.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.coins.values().map(CoinAmount::get).sum()
    }

    /// Coins in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, CoinAmount)> + '_ {
        self.coins.iter().map(|(tile, amount)| (*tile, *amount))
    }
}
