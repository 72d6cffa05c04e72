use ahash::HashMap;
use itertools::Itertools;
use rand::Rng;
use rand::seq::SliceRandom;
use crate::board::SAFE_CHAIN_SIZE;
use crate::chain::{Chain, CHAIN_ARRAY};
use crate::engine::{GameEngine, MergerStockDecision, TilePlacement, MAX_STOCK_PURCHASES_PER_TURN};
use crate::player::Player;
use crate::tile::Tile;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Difficulty {
    Easy,
    Medium,
    /// Currently identical to `Medium`; reserved for a stronger heuristic.
    Hard,
}

/// Stateless heuristic decision maker for computer players. Only ever
/// reads engine state; the caller feeds the chosen action back through
/// the engine's command surface like any human action.
pub struct AiPlayer {
    difficulty: Difficulty,
}

impl AiPlayer {
    pub fn new(difficulty: Difficulty) -> Self {
        Self { difficulty }
    }

    // --- tile choice ---

    pub fn choose_tile_to_play<R: Rng>(&self, rng: &mut R, engine: &GameEngine) -> Option<Tile> {
        let playable: Vec<Tile> = engine
            .current_player()
            .tiles
            .iter()
            .filter(|tile| engine.can_play_tile(**tile))
            .copied()
            .collect();

        if playable.is_empty() {
            return None;
        }

        match self.difficulty {
            Difficulty::Easy => playable.choose(rng).copied(),
            Difficulty::Medium | Difficulty::Hard => {
                Some(self.evaluate_best_tile(&playable, engine).unwrap_or(playable[0]))
            }
        }
    }

    fn evaluate_best_tile(&self, tiles: &[Tile], engine: &GameEngine) -> Option<Tile> {
        let player = engine.current_player();

        let mut best: Option<(Tile, f64)> = None;
        for tile in tiles {
            let score = self.evaluate_tile_placement(*tile, player, engine);
            // strict comparison keeps the first of equally-scored tiles
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((*tile, score));
            }
        }

        best.map(|(tile, _)| tile)
    }

    fn evaluate_tile_placement(&self, tile: Tile, player: &Player, engine: &GameEngine) -> f64 {
        match engine.analyze_tile_placement(tile) {
            TilePlacement::Independent => 1.0,

            TilePlacement::FoundsChain => {
                let mut score = 10.0;
                // reactivating dead stock is very valuable
                for chain in &CHAIN_ARRAY {
                    if player.stocks.has_any(*chain) && engine.board().chain_size(*chain) == 0 {
                        score += 20.0;
                    }
                }
                score
            }

            TilePlacement::GrowsChain(chain) => {
                let our_stock = player.stocks.amount(chain);
                if our_stock > 0 {
                    5.0 + our_stock as f64 * 0.5
                } else {
                    2.0
                }
            }

            TilePlacement::Merger { surviving, acquired } => {
                let mut score = 0.0;
                for chain in acquired {
                    let our_stock = player.stocks.amount(chain);
                    let chain_size = engine.board().chain_size(chain);
                    let max_holding = engine
                        .players()
                        .iter()
                        .map(|p| p.stocks.amount(chain))
                        .max()
                        .unwrap_or(0);

                    if our_stock == max_holding && our_stock > 0 {
                        // we collect the majority bonus
                        score += 15.0 + chain_size as f64 * 2.0;
                    } else if our_stock > 0 {
                        score += 5.0 + chain_size as f64;
                    }
                }

                if player.stocks.has_any(surviving) {
                    score += 3.0;
                }
                score
            }

            TilePlacement::Illegal(_) => f64::NEG_INFINITY,
        }
    }

    // --- chain founding ---

    pub fn choose_chain_to_found(&self, options: &[Chain], player: &Player, engine: &GameEngine) -> Option<Chain> {
        if options.is_empty() {
            return None;
        }

        // dead stock first: founding that chain makes it worth something again
        if let Some(dead) = options.iter().find(|chain| player.stocks.has_any(**chain)) {
            return Some(*dead);
        }

        // cheap chains early, expensive chains late
        let progress =
            engine.board().placed_count() as f64 / engine.board().total_positions() as f64;

        if progress < 0.3 {
            options.iter().min_by_key(|chain| crate::money::chain_tier(**chain)).copied()
        } else {
            options.iter().max_by_key(|chain| crate::money::chain_tier(**chain)).copied()
        }
    }

    // --- stock purchases ---

    pub fn choose_stock_purchases(&self, engine: &GameEngine) -> HashMap<Chain, u8> {
        let player = engine.current_player();
        let mut purchases: HashMap<Chain, u8> = HashMap::default();
        let mut remaining_budget = player.money;
        let mut remaining_purchases = MAX_STOCK_PURCHASES_PER_TURN;

        let scored: Vec<(Chain, f64, u32)> = engine
            .board()
            .active_chains()
            .into_iter()
            .filter_map(|chain| {
                let price = engine.stock_price(chain);
                if price > remaining_budget || engine.available_stock(chain) == 0 {
                    return None;
                }
                Some((chain, self.evaluate_stock_purchase(chain, player, engine), price))
            })
            .sorted_by(|a, b| b.1.total_cmp(&a.1))
            .collect();

        for (chain, score, price) in scored {
            if score <= 0.0 {
                continue;
            }
            if remaining_purchases == 0 {
                break;
            }

            let affordable = (remaining_budget / price) as u8;
            let count = affordable
                .min(engine.available_stock(chain))
                .min(remaining_purchases);

            if count > 0 {
                purchases.insert(chain, count);
                remaining_budget -= price * count as u32;
                remaining_purchases -= count;
            }
        }

        purchases
    }

    fn evaluate_stock_purchase(&self, chain: Chain, player: &Player, engine: &GameEngine) -> f64 {
        let mut score = 0.0;

        let our_stock = player.stocks.amount(chain);
        let chain_size = engine.board().chain_size(chain);
        let price = engine.stock_price(chain);

        let holdings: Vec<u8> = engine
            .players()
            .iter()
            .map(|p| p.stocks.amount(chain))
            .sorted_by(|a, b| b.cmp(a))
            .collect();
        let max_holding = holdings.first().copied().unwrap_or(0);
        let second_max_holding = holdings.get(1).copied().unwrap_or(0);

        let max_buyable = MAX_STOCK_PURCHASES_PER_TURN;
        if our_stock >= max_holding {
            score += 10.0; // maintain or gain the majority
        } else if our_stock + max_buyable > max_holding {
            score += 8.0; // can overtake this turn
        } else if our_stock > second_max_holding || our_stock + max_buyable > second_max_holding {
            score += 5.0; // minority position within reach
        }

        if chain_size >= SAFE_CHAIN_SIZE {
            score += 3.0;
        } else if chain_size >= 6 {
            score += 1.0;
        }

        score -= price as f64 / 200.0;

        // diversification: a first share somewhere is usually worth having
        if our_stock == 0 && !engine.board().active_chains().is_empty() {
            score += 2.0;
        }

        score
    }

    // --- merger stock ---

    pub fn choose_merger_decision(
        &self,
        acquired_chain: Chain,
        surviving_chain: Chain,
        player: &Player,
        engine: &GameEngine,
    ) -> MergerStockDecision {
        let held = player.stocks.amount(acquired_chain);
        let surviving_available = engine.available_stock(surviving_chain);
        let surviving_size = engine.board().chain_size(surviving_chain);
        let surviving_is_safe = engine.board().is_safe(surviving_chain);

        let mut sell = 0;
        let mut trade = 0;
        let mut keep = 0;

        if surviving_is_safe || surviving_size >= SAFE_CHAIN_SIZE / 2 {
            // the survivor looks solid, convert as much as the bank allows
            let max_trade = u8::min(held, surviving_available.saturating_mul(2));
            trade = (max_trade / 2) * 2;
            sell = held - trade;
        } else {
            // small survivor might itself be swallowed later, cash out
            sell = held;
        }

        // hold a few shares back if we could refound the chain ourselves
        let has_founding_tile = player
            .tiles
            .iter()
            .any(|tile| engine.analyze_tile_placement(*tile) == TilePlacement::FoundsChain);

        if has_founding_tile && sell > 0 {
            let held_back = u8::min(sell, MAX_STOCK_PURCHASES_PER_TURN);
            keep = held_back;
            sell -= held_back;
        }

        MergerStockDecision { sell, trade, keep }
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use crate::ai::{AiPlayer, Difficulty};
    use crate::chain::Chain;
    use crate::engine::GameEngine;
    use crate::player::PlayerId;
    use crate::state::{GameState, Options};
    use crate::tile;
    use crate::tile::{Position, Tile};

    fn state_test_instance() -> GameState {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(2);
        GameState::new(&mut rng, &Options::default())
    }

    /// Puts a chain of the given size on the board, in the given row.
    fn build_chain(state: &mut GameState, chain: Chain, row: &str, cols: std::ops::RangeInclusive<i8>) {
        for col in cols {
            let tile: Tile = format!("{row}{col}").as_str().try_into().unwrap();
            state.board.place_tile(tile.position());
        }
        let first: Tile = format!("{row}{}", 1).as_str().try_into().unwrap();
        let group = state.board.connected_positions(first.position());
        state.board.assign_chain(chain, group);
    }

    #[test]
    fn test_easy_picks_some_playable_tile() {
        let engine = GameEngine::from_state(state_test_instance());
        let ai = AiPlayer::new(Difficulty::Easy);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);

        let tile = ai.choose_tile_to_play(&mut rng, &engine).expect("a playable tile");
        assert!(engine.can_play_tile(tile));
    }

    #[test]
    fn test_medium_prefers_founding_over_independent() {
        let mut state = state_test_instance();
        state.board.place_tile(tile!("A1"));
        state.player_mut(PlayerId(0)).tiles = vec![tile!("E5"), tile!("A2")];
        let engine = GameEngine::from_state(state);

        let ai = AiPlayer::new(Difficulty::Medium);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);

        // A2 founds a chain (score 10), E5 is merely independent (score 1)
        assert_eq!(ai.choose_tile_to_play(&mut rng, &engine), Some(tile!("A2")));
    }

    #[test]
    fn test_no_playable_tile_returns_none() {
        let mut state = state_test_instance();
        state.player_mut(PlayerId(0)).tiles = vec![];
        let engine = GameEngine::from_state(state);

        let ai = AiPlayer::new(Difficulty::Medium);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        assert_eq!(ai.choose_tile_to_play(&mut rng, &engine), None);
    }

    #[test]
    fn test_founding_chain_prefers_dead_stock() {
        let mut state = state_test_instance();
        state.player_mut(PlayerId(0)).stocks.deposit(Chain::Imperial, 2);
        let engine = GameEngine::from_state(state);

        let ai = AiPlayer::new(Difficulty::Medium);
        let options = vec![Chain::Tower, Chain::Imperial, Chain::Luxor];
        let player = engine.current_player().clone();

        assert_eq!(
            ai.choose_chain_to_found(&options, &player, &engine),
            Some(Chain::Imperial)
        );
    }

    #[test]
    fn test_founding_chain_prefers_cheap_early() {
        let engine = GameEngine::from_state(state_test_instance());
        let ai = AiPlayer::new(Difficulty::Medium);
        let player = engine.current_player().clone();

        // empty board: progress is 0, lowest tier wins
        assert_eq!(
            ai.choose_chain_to_found(&[Chain::Imperial, Chain::Luxor], &player, &engine),
            Some(Chain::Luxor)
        );
    }

    #[test]
    fn test_founding_chain_prefers_expensive_late() {
        let mut state = state_test_instance();
        // cover a third of the board with independent tiles
        for y in 0..3i8 {
            for x in 0..12i8 {
                state.board.place_tile(Position::new(x, y));
            }
        }
        let engine = GameEngine::from_state(state);

        let ai = AiPlayer::new(Difficulty::Medium);
        let player = engine.current_player().clone();

        assert_eq!(
            ai.choose_chain_to_found(&[Chain::Luxor, Chain::Imperial], &player, &engine),
            Some(Chain::Imperial)
        );
    }

    #[test]
    fn test_stock_purchases_respect_cap_and_budget() {
        let mut state = state_test_instance();
        build_chain(&mut state, Chain::Tower, "A", 1..=2);
        build_chain(&mut state, Chain::American, "C", 1..=2);
        let engine = GameEngine::from_state(state);

        let ai = AiPlayer::new(Difficulty::Medium);
        let purchases = ai.choose_stock_purchases(&engine);

        let total: u16 = purchases.values().map(|c| *c as u16).sum();
        assert!(total <= 3);
        assert!(total > 0);

        let cost: u32 = purchases
            .iter()
            .map(|(chain, count)| engine.stock_price(*chain) * *count as u32)
            .sum();
        assert!(cost <= engine.current_player().money);
    }

    #[test]
    fn test_merger_decision_trades_into_strong_survivor() {
        let mut state = state_test_instance();
        build_chain(&mut state, Chain::Tower, "A", 1..=8);
        let engine = GameEngine::from_state(state);

        let mut player = engine.current_player().clone();
        player.stocks.deposit(Chain::Luxor, 8);
        player.tiles = vec![];

        let ai = AiPlayer::new(Difficulty::Medium);
        let decision = ai.choose_merger_decision(Chain::Luxor, Chain::Tower, &player, &engine);

        // survivor of size 8 is past half the safe threshold: trade everything
        assert_eq!(decision.trade, 8);
        assert_eq!(decision.sell, 0);
        assert_eq!(decision.keep, 0);
    }

    #[test]
    fn test_merger_decision_sells_out_of_weak_survivor() {
        let mut state = state_test_instance();
        build_chain(&mut state, Chain::Tower, "A", 1..=3);
        let engine = GameEngine::from_state(state);

        let mut player = engine.current_player().clone();
        player.stocks.deposit(Chain::Luxor, 5);
        player.tiles = vec![];

        let ai = AiPlayer::new(Difficulty::Medium);
        let decision = ai.choose_merger_decision(Chain::Luxor, Chain::Tower, &player, &engine);

        assert_eq!(decision.sell, 5);
        assert_eq!(decision.trade, 0);
        assert_eq!(decision.keep, 0);
    }

    #[test]
    fn test_merger_decision_keeps_shares_for_refounding() {
        let mut state = state_test_instance();
        build_chain(&mut state, Chain::Tower, "A", 1..=3);
        // an isolated tile makes E5 a founding placement
        state.board.place_tile(tile!("E4"));
        let engine = GameEngine::from_state(state);

        let mut player = engine.current_player().clone();
        player.stocks.deposit(Chain::Luxor, 5);
        player.tiles = vec![tile!("E5")];

        let ai = AiPlayer::new(Difficulty::Medium);
        let decision = ai.choose_merger_decision(Chain::Luxor, Chain::Tower, &player, &engine);

        assert_eq!(decision.keep, 3);
        assert_eq!(decision.sell, 2);
        assert_eq!(decision.trade, 0);
        assert_eq!(decision.sell + decision.trade + decision.keep, 5);
    }

    /// Plays a whole game with every seat on the same heuristic, stopping
    /// when the game ends, a player has no legal move, or the step cap is
    /// hit (a stalled bag can leave the game unfinishable).
    fn drive_full_game(seed: u64) -> GameEngine {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let options = crate::state::Options {
            human_player_index: None,
            ..crate::state::Options::default()
        };
        let mut engine = GameEngine::new(&mut rng, &options);
        let ai = AiPlayer::new(Difficulty::Medium);

        for _ in 0..10_000 {
            if engine.game_phase() == crate::state::GamePhase::GameOver {
                break;
            }

            match engine.turn_phase().clone() {
                crate::state::TurnPhase::PlaceTile => {
                    match ai.choose_tile_to_play(&mut rng, &engine) {
                        Some(tile) => engine.play_tile(tile),
                        None => break,
                    }
                }
                crate::state::TurnPhase::FoundChain { options } => {
                    let player = engine.current_player().clone();
                    let chain = ai
                        .choose_chain_to_found(&options, &player, &engine)
                        .expect("founding always offers at least one chain");
                    engine.found_chain(chain);
                }
                crate::state::TurnPhase::HandleMergerStock(context) => {
                    let decider = context.current_decider().expect("a pending decider");
                    let player = engine.state().player(decider).clone();
                    let decision = ai.choose_merger_decision(
                        context.acquired_chain,
                        context.surviving_chain,
                        &player,
                        &engine,
                    );
                    engine.handle_merger_stock_decision(decision);
                }
                crate::state::TurnPhase::BuyStocks => {
                    let purchases = ai.choose_stock_purchases(&engine);
                    if purchases.is_empty() {
                        engine.skip_buying_stocks();
                    } else {
                        engine.buy_stocks(&purchases);
                    }
                }
                crate::state::TurnPhase::EndTurn => engine.end_turn(),
                crate::state::TurnPhase::ResolveMerger(_) => {
                    unreachable!("mergers resolve without handing back control")
                }
            }
        }

        engine
    }

    #[test]
    fn test_ai_vs_ai_game_preserves_invariants() {
        for seed in [3, 11, 42] {
            let engine = drive_full_game(seed);

            // every share is either in the bank or in someone's hands
            for chain in crate::chain::CHAIN_ARRAY {
                let held: u16 = engine
                    .players()
                    .iter()
                    .map(|p| p.stocks.amount(chain) as u16)
                    .sum();
                assert_eq!(held + engine.available_stock(chain) as u16, 25);
            }

            // chain size caches stay consistent with the membership map
            for chain in crate::chain::CHAIN_ARRAY {
                if engine.board().chain_size(chain) > 0 {
                    assert!(engine.board().chain_size(chain) >= 2);
                }
            }

            assert!(engine.board().placed_count() > 0);
            assert!(!engine.game_log().is_empty());
        }
    }

    #[test]
    fn test_merger_decision_always_partitions_held_shares() {
        let mut state = state_test_instance();
        build_chain(&mut state, Chain::Tower, "A", 1..=8);
        let engine = GameEngine::from_state(state);

        let ai = AiPlayer::new(Difficulty::Medium);
        for held in 0..=12u8 {
            let mut player = engine.current_player().clone();
            player.stocks.drain(Chain::Luxor);
            player.stocks.deposit(Chain::Luxor, held);
            player.tiles = vec![];

            let decision = ai.choose_merger_decision(Chain::Luxor, Chain::Tower, &player, &engine);
            assert_eq!(decision.sell + decision.trade + decision.keep, held);
            assert_eq!(decision.trade % 2, 0);
        }
    }
}
