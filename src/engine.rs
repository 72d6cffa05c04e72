use ahash::HashMap;
use itertools::Itertools;
use rand::Rng;
use thiserror::Error;
use crate::board::Board;
use crate::chain::{Chain, ChainTable, CHAIN_ARRAY};
use crate::money;
use crate::player::{Player, PlayerId};
use crate::state::{
    GameLogEntry, GamePhase, GameState, MergerContext, MergerStockContext, Options, TurnPhase,
};
use crate::tile::{Position, Tile};

pub const MAX_STOCK_PURCHASES_PER_TURN: u8 = 3;

/// Why a tile cannot be played right now. Surfaced as data rather than a
/// rejection so the caller can explain the situation.
#[derive(Error, Copy, Clone, Debug, Eq, PartialEq)]
pub enum IllegalPlacement {
    #[error("cannot merge two safe hotel chains")]
    WouldMergeSafeChains,
    #[error("all hotel chains are already active")]
    NoChainAvailable,
}

/// What placing a given tile would do to the board.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TilePlacement {
    Independent,
    FoundsChain,
    GrowsChain(Chain),
    Merger {
        surviving: Chain,
        /// Largest first; equal sizes ordered by chain enumeration order.
        acquired: Vec<Chain>,
    },
    Illegal(IllegalPlacement),
}

/// The rules engine. Owns the state and is its only mutator; every command
/// validates against the current phase and silently no-ops when the
/// precondition fails, since the caller is expected to offer only legal
/// actions.
#[derive(Clone, Debug)]
pub struct GameEngine {
    state: GameState,
}

impl GameEngine {
    pub fn new<R: Rng>(rng: &mut R, options: &Options) -> Self {
        Self {
            state: GameState::new(rng, options),
        }
    }

    /// Resumes a game from a previously serialized state.
    pub fn from_state(state: GameState) -> Self {
        Self { state }
    }

    // --- read access ---

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        &self.state.board
    }

    pub fn players(&self) -> &[Player] {
        &self.state.players
    }

    pub fn current_player(&self) -> &Player {
        self.state.current_player()
    }

    pub fn turn_phase(&self) -> &TurnPhase {
        &self.state.turn_phase
    }

    pub fn game_phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn game_log(&self) -> &[GameLogEntry] {
        &self.state.game_log
    }

    // --- queries ---

    pub fn stock_price(&self, chain: Chain) -> u32 {
        money::stock_price(chain, self.state.board.chain_size(chain))
    }

    pub fn available_stock(&self, chain: Chain) -> u8 {
        self.state.stock_market.amount(chain)
    }

    pub fn can_buy_stock(&self, chain: Chain) -> bool {
        self.state.board.chain_size(chain) > 0
            && self.available_stock(chain) > 0
            && self.current_player().money >= self.stock_price(chain)
    }

    pub fn can_play_tile(&self, tile: Tile) -> bool {
        if self.state.turn_phase != TurnPhase::PlaceTile {
            return false;
        }
        if !self.current_player().has_tile(tile) {
            return false;
        }
        !matches!(self.analyze_tile_placement(tile), TilePlacement::Illegal(_))
    }

    /// Classifies what placing this tile would do, from the orthogonally
    /// adjacent occupied positions.
    pub fn analyze_tile_placement(&self, tile: Tile) -> TilePlacement {
        let board = &self.state.board;
        let pos = tile.position();

        let occupied_neighbours: Vec<Position> = pos
            .neighbours()
            .into_iter()
            .filter(|n| board.has_tile(*n))
            .collect();

        if occupied_neighbours.is_empty() {
            return TilePlacement::Independent;
        }

        let adjacent_chains: Vec<Chain> = occupied_neighbours
            .iter()
            .filter_map(|n| board.chain_at(*n))
            .unique()
            .collect();

        let num_safe = adjacent_chains
            .iter()
            .filter(|chain| board.is_safe(**chain))
            .count();
        if num_safe >= 2 {
            return TilePlacement::Illegal(IllegalPlacement::WouldMergeSafeChains);
        }

        match adjacent_chains.len() {
            0 => {
                if board.active_chains().len() >= CHAIN_ARRAY.len() {
                    TilePlacement::Illegal(IllegalPlacement::NoChainAvailable)
                } else {
                    TilePlacement::FoundsChain
                }
            }
            1 => TilePlacement::GrowsChain(adjacent_chains[0]),
            _ => {
                // Largest chain survives; equal sizes break by enumeration
                // order so the outcome is deterministic. Safe chains can
                // never be acquired.
                let by_size: Vec<Chain> = adjacent_chains
                    .into_iter()
                    .sorted_by_key(|chain| {
                        (std::cmp::Reverse(board.chain_size(*chain)), chain.as_index())
                    })
                    .collect();

                let surviving = by_size[0];
                let acquired = by_size[1..]
                    .iter()
                    .filter(|chain| !board.is_safe(**chain))
                    .copied()
                    .collect();

                TilePlacement::Merger { surviving, acquired }
            }
        }
    }

    // --- commands ---

    pub fn play_tile(&mut self, tile: Tile) {
        if !self.can_play_tile(tile) {
            return;
        }

        let pos = tile.position();
        let analysis = self.analyze_tile_placement(tile);

        self.state.board.place_tile(pos);

        let player_id = self.state.current_player_id;
        self.state.player_mut(player_id).tiles.retain(|t| *t != tile);

        self.state
            .log(format!("{} placed tile {}", self.current_player().name, tile));

        match analysis {
            TilePlacement::Independent => {
                self.state.turn_phase = TurnPhase::BuyStocks;
            }

            TilePlacement::FoundsChain => {
                self.state.turn_phase = TurnPhase::FoundChain {
                    options: self.state.board.inactive_chains(),
                };
            }

            TilePlacement::GrowsChain(chain) => {
                // the whole component: old chain tiles, this tile, and any
                // independent tiles this placement joined up
                let connected = self.state.board.connected_positions(pos);
                self.state.board.assign_chain(chain, connected);
                self.state
                    .log(format!("{} grew to {} tiles", chain, self.state.board.chain_size(chain)));
                self.state.turn_phase = TurnPhase::BuyStocks;
            }

            TilePlacement::Merger { surviving, acquired } => {
                self.start_merger(surviving, acquired, pos);
            }

            TilePlacement::Illegal(_) => unreachable!("can_play_tile rejects illegal tiles"),
        }
    }

    pub fn found_chain(&mut self, chain: Chain) {
        let TurnPhase::FoundChain { options } = &self.state.turn_phase else {
            return;
        };
        if !options.contains(&chain) {
            return;
        }

        let Some(trigger) = self.state.board.last_placed() else {
            return;
        };

        // the founding group is the just-placed tile's component, which at
        // this point consists solely of independent tiles
        let group = self.state.board.connected_positions(trigger);
        let independent = self.state.board.independent_tiles();
        if group.len() >= 2 && group.is_subset(&independent) {
            self.state.board.assign_chain(chain, group);
        }

        // founder's reward: one free share, or its cash value if the bank
        // has none left
        let player_id = self.state.current_player_id;
        if self.state.stock_market.withdraw(chain, 1).is_ok() {
            self.state.player_mut(player_id).stocks.deposit(chain, 1);
            self.state.log(format!(
                "{} founded {} and received 1 free stock",
                self.state.player(player_id).name,
                chain
            ));
        } else {
            let price = self.stock_price(chain);
            self.state.player_mut(player_id).money += price;
            self.state.log(format!(
                "{} founded {} and received ${} (no stock available)",
                self.state.player(player_id).name,
                chain,
                price
            ));
        }

        self.state.turn_phase = TurnPhase::BuyStocks;
    }

    fn start_merger(&mut self, surviving: Chain, acquired: Vec<Chain>, trigger: Position) {
        log::debug!("merger: {} acquires {:?}", surviving, acquired);
        self.state.log(format!(
            "Merger! {} acquires {}",
            surviving,
            acquired.iter().join(", ")
        ));

        // capture sizes before any board mutation destroys them
        let mut sizes: ChainTable<u16> = Default::default();
        for chain in &acquired {
            sizes.set(chain, self.state.board.chain_size(*chain));
        }

        let sorted_acquired: Vec<Chain> = acquired
            .into_iter()
            .sorted_by_key(|chain| (std::cmp::Reverse(sizes.get(chain)), chain.as_index()))
            .collect();

        let connected = self.state.board.connected_positions(trigger);
        self.state.board.assign_chain(surviving, connected);
        for chain in &sorted_acquired {
            self.state.board.remove_chain(*chain);
        }

        self.state.turn_phase = TurnPhase::ResolveMerger(MergerContext {
            surviving_chain: surviving,
            acquired_chains: sorted_acquired,
            acquired_chain_sizes: sizes,
            current_acquired_index: 0,
        });

        self.process_next_merger_chain();
    }

    /// Pays bonuses for the current acquired chain and queues up its
    /// shareholders' decisions; chains nobody holds are skipped outright.
    fn process_next_merger_chain(&mut self) {
        loop {
            let TurnPhase::ResolveMerger(context) = &self.state.turn_phase else {
                return;
            };
            let mut context = context.clone();

            let Some(acquired_chain) = context.current_acquired_chain() else {
                self.state.turn_phase = TurnPhase::BuyStocks;
                return;
            };
            let chain_size = context.current_acquired_chain_size();

            self.pay_bonuses(acquired_chain, chain_size);

            let player_order: Vec<PlayerId> = self
                .state
                .player_ids_in_order(self.state.current_player_id)
                .into_iter()
                .filter(|id| self.state.player(*id).stocks.has_any(acquired_chain))
                .collect();

            if player_order.is_empty() {
                context.current_acquired_index += 1;
                self.state.turn_phase = TurnPhase::ResolveMerger(context);
                continue;
            }

            self.state.turn_phase = TurnPhase::HandleMergerStock(MergerStockContext {
                acquired_chain,
                surviving_chain: context.surviving_chain,
                chain_size,
                player_order,
                decision_index: 0,
                merger_context: context,
            });
            return;
        }
    }

    /// Pays majority/minority bonuses for one chain valued at `size`. Used
    /// mid-merger (with the stored pre-removal size) and at game end (with
    /// the live size).
    fn pay_bonuses(&mut self, chain: Chain, size: u16) {
        let holdings: Vec<(PlayerId, u8)> = self
            .state
            .players
            .iter()
            .map(|player| (player.id, player.stocks.amount(chain)))
            .collect();

        let payouts = money::bonus_payouts(&holdings, chain, size);

        for id in self.state.player_ids_in_order(PlayerId(0)) {
            if let Some(bonus) = payouts.get(&id) {
                self.state.player_mut(id).money += bonus;
                self.state.log(format!(
                    "{} receives ${} shareholder bonus for {}",
                    self.state.player(id).name,
                    bonus,
                    chain
                ));
            }
        }
    }

    pub fn handle_merger_stock_decision(&mut self, decision: MergerStockDecision) {
        let TurnPhase::HandleMergerStock(context) = &self.state.turn_phase else {
            return;
        };
        let mut context = context.clone();
        let Some(player_id) = context.current_decider() else {
            return;
        };

        let acquired = context.acquired_chain;
        let surviving = context.surviving_chain;
        let held = self.state.player(player_id).stocks.amount(acquired);

        // shares must partition exactly, and trades happen two-for-one
        let total = decision.sell as u16 + decision.trade as u16 + decision.keep as u16;
        if total != held as u16 || decision.trade % 2 != 0 {
            return;
        }

        if decision.sell > 0 {
            let price = money::stock_price(acquired, context.chain_size);
            let proceeds = price * decision.sell as u32;
            let player = self.state.player_mut(player_id);
            player.money += proceeds;
            player
                .stocks
                .withdraw(acquired, decision.sell)
                .expect("validated against held amount");
            self.state.stock_market.deposit(acquired, decision.sell);
            self.state.log(format!(
                "{} sold {} {} stock for ${}",
                self.state.player(player_id).name,
                decision.sell,
                acquired,
                proceeds
            ));
        }

        if decision.trade > 0 {
            // the full trade amount is surrendered either way; the bank may
            // not have enough surviving stock to pay out the whole half
            let received = u8::min(decision.trade / 2, self.state.stock_market.amount(surviving));

            let player = self.state.player_mut(player_id);
            player
                .stocks
                .withdraw(acquired, decision.trade)
                .expect("validated against held amount");
            player.stocks.deposit(surviving, received);

            self.state.stock_market.deposit(acquired, decision.trade);
            self.state
                .stock_market
                .withdraw(surviving, received)
                .expect("received is capped by bank supply");

            self.state.log(format!(
                "{} traded {} {} for {} {}",
                self.state.player(player_id).name,
                decision.trade,
                acquired,
                received,
                surviving
            ));
        }

        if decision.keep > 0 {
            self.state.log(format!(
                "{} kept {} {} stock",
                self.state.player(player_id).name,
                decision.keep,
                acquired
            ));
        }

        context.decision_index += 1;

        if context.current_decider().is_none() {
            let mut merger_context = context.merger_context;
            merger_context.current_acquired_index += 1;
            self.state.turn_phase = TurnPhase::ResolveMerger(merger_context);
            self.process_next_merger_chain();
        } else {
            self.state.turn_phase = TurnPhase::HandleMergerStock(context);
        }
    }

    pub fn buy_stocks(&mut self, purchases: &HashMap<Chain, u8>) {
        if self.state.turn_phase != TurnPhase::BuyStocks {
            return;
        }

        let total_count: u16 = purchases.values().map(|count| *count as u16).sum();
        if total_count > MAX_STOCK_PURCHASES_PER_TURN as u16 {
            return;
        }

        let mut total_cost: u32 = 0;
        for (chain, count) in purchases {
            if *count == 0 {
                continue;
            }
            if self.state.board.chain_size(*chain) == 0 {
                return;
            }
            if self.available_stock(*chain) < *count {
                return;
            }
            total_cost += self.stock_price(*chain) * *count as u32;
        }

        if self.current_player().money < total_cost {
            return;
        }

        let player_id = self.state.current_player_id;
        for chain in &CHAIN_ARRAY {
            let Some(count) = purchases.get(chain).copied().filter(|count| *count > 0) else {
                continue;
            };

            let cost = self.stock_price(*chain) * count as u32;
            let player = self.state.player_mut(player_id);
            player.money -= cost;
            player.stocks.deposit(*chain, count);
            self.state
                .stock_market
                .withdraw(*chain, count)
                .expect("validated against bank supply");
            self.state.log(format!(
                "{} bought {} {} stock for ${}",
                self.state.player(player_id).name,
                count,
                chain,
                cost
            ));
        }

        self.state.turn_phase = TurnPhase::EndTurn;
    }

    pub fn skip_buying_stocks(&mut self) {
        if self.state.turn_phase != TurnPhase::BuyStocks {
            return;
        }
        self.state.turn_phase = TurnPhase::EndTurn;
    }

    pub fn end_turn(&mut self) {
        if self.state.turn_phase != TurnPhase::EndTurn {
            return;
        }

        let player_id = self.state.current_player_id;

        if !self.state.tile_bag.is_empty() {
            let tile = self.state.tile_bag.remove(0);
            self.state.player_mut(player_id).tiles.push(tile);
        }

        self.replace_unplayable_tiles();

        // a computer player always declares as soon as it can; a human is
        // merely eligible, and the prompt is the caller's concern
        if self.can_declare_game_over() && !self.current_player().is_human {
            self.declare_game_over();
            return;
        }

        self.state.current_player_id =
            PlayerId((player_id.0 + 1) % self.state.players.len() as u8);
        self.state.turn_phase = TurnPhase::PlaceTile;
    }

    /// Tiles with no legal placement leave the game; each removal draws a
    /// replacement while the bag lasts.
    fn replace_unplayable_tiles(&mut self) {
        let player_id = self.state.current_player_id;

        let unplayable: Vec<Tile> = self
            .state
            .player(player_id)
            .tiles
            .iter()
            .filter(|tile| matches!(self.analyze_tile_placement(**tile), TilePlacement::Illegal(_)))
            .copied()
            .collect();

        if unplayable.is_empty() {
            return;
        }

        for tile in &unplayable {
            self.state.player_mut(player_id).tiles.retain(|t| t != tile);
            if !self.state.tile_bag.is_empty() {
                let replacement = self.state.tile_bag.remove(0);
                self.state.player_mut(player_id).tiles.push(replacement);
            }
        }

        self.state.log(format!(
            "{} exchanged {} unplayable tile(s)",
            self.state.player(player_id).name,
            unplayable.len()
        ));
    }

    pub fn can_declare_game_over(&self) -> bool {
        if self.state.phase != GamePhase::Playing {
            return false;
        }

        self.state.board.all_chains_are_safe() || self.state.board.game_ending_chain_exists()
    }

    pub fn declare_game_over(&mut self) {
        if !self.can_declare_game_over() {
            return;
        }

        log::debug!("game over declared by {:?}", self.state.current_player_id);
        self.state
            .log(format!("Game over declared by {}", self.current_player().name));

        // final bonuses at live sizes, then full liquidation
        for chain in self.state.board.active_chains() {
            let size = self.state.board.chain_size(chain);
            self.pay_bonuses(chain, size);
        }

        for chain in self.state.board.active_chains() {
            let price = self.stock_price(chain);
            for id in self.state.player_ids_in_order(PlayerId(0)) {
                let count = self.state.player_mut(id).stocks.drain(chain);
                if count > 0 {
                    let proceeds = price * count as u32;
                    self.state.player_mut(id).money += proceeds;
                    self.state.stock_market.deposit(chain, count);
                    self.state.log(format!(
                        "{} sold {} {} for ${}",
                        self.state.player(id).name,
                        count,
                        chain,
                        proceeds
                    ));
                }
            }
        }

        self.state.phase = GamePhase::GameOver;

        let standings: Vec<(String, u32)> = self
            .state
            .players
            .iter()
            .map(|player| (player.name.clone(), player.money))
            .sorted_by_key(|(_, money)| std::cmp::Reverse(*money))
            .collect();

        self.state.log("Final standings:".to_string());
        for (rank, (name, money)) in standings.into_iter().enumerate() {
            self.state.log(format!("{}. {}: ${}", rank + 1, name, money));
        }
    }
}

/// A shareholder's disposal of an acquired chain's stock. All held shares
/// must be accounted for: `sell + trade + keep == held`, with `trade` even
/// (two acquired shares buy one surviving share).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MergerStockDecision {
    pub sell: u8,
    pub trade: u8,
    pub keep: u8,
}
