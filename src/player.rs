use std::fmt::{Debug, Formatter};
use serde::{Deserialize, Serialize};
use crate::stock::Stocks;
use crate::tile::Tile;

/// Seating-order index into `GameState::players`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl Debug for PlayerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("P_{}", self.0))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_human: bool,
    pub money: u32,
    pub stocks: Stocks,
    pub tiles: Vec<Tile>,
}

impl Player {
    pub fn has_tile(&self, tile: Tile) -> bool {
        self.tiles.contains(&tile)
    }
}
