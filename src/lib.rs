pub mod tile;
pub mod chain;
pub mod board;
pub mod money;
pub mod stock;
pub mod player;
pub mod state;
pub mod engine;
pub mod ai;
pub mod save;

pub use ai::{AiPlayer, Difficulty};
pub use chain::Chain;
pub use engine::{GameEngine, MergerStockDecision, TilePlacement};
pub use state::{GamePhase, GameState, Options, TurnPhase};
pub use tile::{Position, Tile};
