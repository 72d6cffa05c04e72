use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use ahash::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use crate::chain::{Chain, ChainTable, CHAIN_ARRAY};
use crate::tile::Position;

pub const SAFE_CHAIN_SIZE: u16 = 11;
pub const GAME_ENDING_CHAIN_SIZE: u16 = 41;

/// Tile occupancy and chain membership for the rectangular grid.
///
/// A position appears in `placed` at most once, and appears in `membership`
/// only if it is placed. `chain_sizes` is a cache kept in sync by the
/// mutating operations so size queries stay O(1).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "BoardRepr", from = "BoardRepr")]
pub struct Board {
    pub width: u8,
    pub height: u8,
    placed: HashSet<Position>,
    membership: HashMap<Position, Chain>,
    chain_sizes: ChainTable<u16>,
    last_placed: Option<Position>,
}

impl Board {
    pub fn new(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            placed: Default::default(),
            membership: Default::default(),
            chain_sizes: Default::default(),
            last_placed: None,
        }
    }

    // --- queries ---

    pub fn has_tile(&self, pos: Position) -> bool {
        self.placed.contains(&pos)
    }

    pub fn chain_at(&self, pos: Position) -> Option<Chain> {
        self.membership.get(&pos).copied()
    }

    pub fn chain_size(&self, chain: Chain) -> u16 {
        self.chain_sizes.get(&chain)
    }

    pub fn is_safe(&self, chain: Chain) -> bool {
        self.chain_size(chain) >= SAFE_CHAIN_SIZE
    }

    pub fn all_chains_are_safe(&self) -> bool {
        let active = self.active_chains();
        !active.is_empty() && active.iter().all(|chain| self.is_safe(*chain))
    }

    pub fn game_ending_chain_exists(&self) -> bool {
        self.chain_sizes.0.iter().any(|size| *size >= GAME_ENDING_CHAIN_SIZE)
    }

    /// Chains with at least one tile on the board, in enumeration order.
    pub fn active_chains(&self) -> Vec<Chain> {
        CHAIN_ARRAY
            .iter()
            .filter(|chain| self.chain_size(**chain) > 0)
            .copied()
            .collect()
    }

    /// Chains with no tiles on the board, in enumeration order.
    pub fn inactive_chains(&self) -> Vec<Chain> {
        CHAIN_ARRAY
            .iter()
            .filter(|chain| self.chain_size(**chain) == 0)
            .copied()
            .collect()
    }

    /// Placed positions that belong to no chain yet.
    pub fn independent_tiles(&self) -> HashSet<Position> {
        self.placed
            .iter()
            .filter(|pos| !self.membership.contains_key(pos))
            .copied()
            .collect()
    }

    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    pub fn total_positions(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn last_placed(&self) -> Option<Position> {
        self.last_placed
    }

    /// Flood fill over orthogonally adjacent placed positions. Returns the
    /// full connected component containing `start`, or the empty set when
    /// `start` is unoccupied.
    pub fn connected_positions(&self, start: Position) -> HashSet<Position> {
        let mut visited: HashSet<Position> = Default::default();

        if !self.placed.contains(&start) {
            return visited;
        }

        let mut queue: VecDeque<Position> = Default::default();
        queue.push_back(start);
        visited.insert(start);

        while let Some(pos) = queue.pop_front() {
            for neighbour in pos.neighbours() {
                if self.placed.contains(&neighbour) && visited.insert(neighbour) {
                    queue.push_back(neighbour);
                }
            }
        }

        visited
    }

    // --- mutations (engine only) ---

    /// Marks a position occupied. The engine guarantees the position was
    /// unoccupied and in bounds.
    pub fn place_tile(&mut self, pos: Position) {
        self.placed.insert(pos);
        self.last_placed = Some(pos);
    }

    /// Sets chain membership for a set of positions. Connectivity is the
    /// caller's responsibility.
    pub fn assign_chain(&mut self, chain: Chain, positions: impl IntoIterator<Item = Position>) {
        for pos in positions {
            debug_assert!(self.placed.contains(&pos));

            match self.membership.insert(pos, chain) {
                Some(old) if old == chain => {}
                Some(old) => {
                    self.chain_sizes.set(&old, self.chain_sizes.get(&old) - 1);
                    self.chain_sizes.set(&chain, self.chain_sizes.get(&chain) + 1);
                }
                None => {
                    self.chain_sizes.set(&chain, self.chain_sizes.get(&chain) + 1);
                }
            }
        }
    }

    /// Clears membership for all positions of a chain. The positions stay
    /// placed, they just become independent again.
    pub fn remove_chain(&mut self, chain: Chain) {
        self.membership.retain(|_, c| *c != chain);
        self.chain_sizes.set(&chain, 0);
    }
}

/// Serialization mirror: JSON object keys must be strings, so the
/// position-keyed membership map travels as a pair list.
#[derive(Serialize, Deserialize)]
struct BoardRepr {
    width: u8,
    height: u8,
    placed: Vec<Position>,
    membership: Vec<(Position, Chain)>,
    last_placed: Option<Position>,
}

impl From<Board> for BoardRepr {
    fn from(board: Board) -> Self {
        Self {
            width: board.width,
            height: board.height,
            placed: board.placed.into_iter().collect(),
            membership: board.membership.into_iter().collect(),
            last_placed: board.last_placed,
        }
    }
}

impl From<BoardRepr> for Board {
    fn from(repr: BoardRepr) -> Self {
        let mut board = Board::new(repr.width, repr.height);
        board.placed = repr.placed.into_iter().collect();
        board.last_placed = repr.last_placed;

        let mut chain_sizes: ChainTable<u16> = Default::default();
        for (_, chain) in &repr.membership {
            chain_sizes.set(chain, chain_sizes.get(chain) + 1);
        }
        board.membership = repr.membership.into_iter().collect();
        board.chain_sizes = chain_sizes;

        board
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(12, 9)
    }
}

#[allow(unused_must_use)]
impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for y in 0..self.height as i8 {
            for x in 0..self.width as i8 {
                let pos = Position { x, y };
                if let Some(chain) = self.chain_at(pos) {
                    write!(f, "{}", chain.initial());
                } else if self.has_tile(pos) {
                    write!(f, "■");
                } else {
                    write!(f, "□");
                }
                write!(f, "  ");
            }
            writeln!(f);
        }

        Ok(())
    }
}
