use std::time::SystemTime;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use crate::board::Board;
use crate::chain::{Chain, ChainTable};
use crate::player::{Player, PlayerId};
use crate::stock::Stocks;
use crate::tile::Tile;

pub struct Options {
    pub num_players: u8,
    pub human_player_index: Option<u8>,
    pub tiles_per_player: u8,
    pub grid_width: u8,
    pub grid_height: u8,
    pub num_stock: u8,
    pub starting_money: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            num_players: 4,
            human_player_index: Some(0),
            tiles_per_player: 6,
            grid_width: 12,
            grid_height: 9,
            num_stock: 25,
            starting_money: 6000,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GamePhase {
    Setup,
    Playing,
    GameOver,
}

/// The turn state machine's current state. Merger resolution carries its
/// sub-state inline so the whole machine serializes with the game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TurnPhase {
    PlaceTile,
    FoundChain { options: Vec<Chain> },
    ResolveMerger(MergerContext),
    HandleMergerStock(MergerStockContext),
    BuyStocks,
    EndTurn,
}

/// Snapshot taken when a merger is triggered. The acquired chains' sizes
/// are captured before the chains are stripped from the board, because
/// removal destroys the size information the bonus math needs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MergerContext {
    pub surviving_chain: Chain,
    /// Largest first; equal sizes ordered by chain enumeration order.
    pub acquired_chains: Vec<Chain>,
    pub acquired_chain_sizes: ChainTable<u16>,
    pub current_acquired_index: usize,
}

impl MergerContext {
    pub fn current_acquired_chain(&self) -> Option<Chain> {
        self.acquired_chains.get(self.current_acquired_index).copied()
    }

    pub fn current_acquired_chain_size(&self) -> u16 {
        match self.current_acquired_chain() {
            Some(chain) => self.acquired_chain_sizes.get(&chain),
            None => 0,
        }
    }
}

/// Per-chain stock resolution: which players, in seating order starting
/// from the acting player, still owe a keep/sell/trade decision.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MergerStockContext {
    pub acquired_chain: Chain,
    pub surviving_chain: Chain,
    /// Pre-removal size of the acquired chain.
    pub chain_size: u16,
    pub player_order: Vec<PlayerId>,
    pub decision_index: usize,
    pub merger_context: MergerContext,
}

impl MergerStockContext {
    pub fn current_decider(&self) -> Option<PlayerId> {
        self.player_order.get(self.decision_index).copied()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameLogEntry {
    pub timestamp: SystemTime,
    pub message: String,
}

impl GameLogEntry {
    pub fn new(message: String) -> Self {
        Self {
            timestamp: SystemTime::now(),
            message,
        }
    }
}

/// The single unit of truth for one game. Fully serializable; the engine
/// is the only mutator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub players: Vec<Player>,
    pub current_player_id: PlayerId,
    pub tile_bag: Vec<Tile>,
    pub stock_market: Stocks,
    pub phase: GamePhase,
    pub turn_phase: TurnPhase,
    pub game_log: Vec<GameLogEntry>,
}

impl GameState {
    pub fn new<R: Rng>(rng: &mut R, options: &Options) -> Self {
        let board = Board::new(options.grid_width, options.grid_height);

        let mut tiles = vec![];
        for y in 0..board.height as i8 {
            for x in 0..board.width as i8 {
                tiles.push(Tile::new(x, y));
            }
        }

        tiles.shuffle(rng);

        let players = (0..options.num_players)
            .map(|id| {
                let is_human = options.human_player_index == Some(id);
                Player {
                    id: PlayerId(id),
                    name: if is_human {
                        "You".to_string()
                    } else {
                        format!("Computer {}", id)
                    },
                    is_human,
                    money: options.starting_money,
                    stocks: Stocks::new(0),
                    tiles: (0..options.tiles_per_player).map(|_| tiles.remove(0)).collect(),
                }
            })
            .collect();

        Self {
            board,
            players,
            current_player_id: PlayerId(0),
            tile_bag: tiles,
            stock_market: Stocks::new(options.num_stock),
            phase: GamePhase::Playing,
            turn_phase: TurnPhase::PlaceTile,
            game_log: vec![],
        }
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.0 as usize]
    }

    pub fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id.0 as usize]
    }

    pub fn current_player(&self) -> &Player {
        self.player(self.current_player_id)
    }

    /// Seating order starting from `starting_player_id`, wrapping around.
    pub fn player_ids_in_order(&self, starting_player_id: PlayerId) -> Vec<PlayerId> {
        (0..self.players.len() as u8)
            .map(|n| PlayerId((starting_player_id.0 + n) % self.players.len() as u8))
            .collect()
    }

    pub fn log(&mut self, message: String) {
        self.game_log.push(GameLogEntry::new(message));
    }
}
