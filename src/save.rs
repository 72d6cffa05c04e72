use thiserror::Error;
use crate::state::GameState;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("could not serialize the game: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("could not read the saved game: {0}")]
    Deserialize(#[source] serde_json::Error),
}

/// Serializes the whole game, mid-merger sub-states included, so a
/// resumed game continues exactly where it stopped.
pub fn encode(state: &GameState) -> Result<String, SaveError> {
    serde_json::to_string(state).map_err(SaveError::Serialize)
}

pub fn decode(data: &str) -> Result<GameState, SaveError> {
    serde_json::from_str(data).map_err(SaveError::Deserialize)
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use crate::chain::{Chain, CHAIN_ARRAY};
    use crate::engine::GameEngine;
    use crate::save::{decode, encode};
    use crate::state::{GameState, Options, TurnPhase};
    use crate::tile::Tile;

    fn state_test_instance() -> GameState {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(2);
        GameState::new(&mut rng, &Options::default())
    }

    fn assert_states_match(a: &GameState, b: &GameState) {
        assert_eq!(a.players, b.players);
        assert_eq!(a.current_player_id, b.current_player_id);
        assert_eq!(a.tile_bag, b.tile_bag);
        assert_eq!(a.stock_market, b.stock_market);
        assert_eq!(a.phase, b.phase);
        assert_eq!(a.turn_phase, b.turn_phase);
        assert_eq!(a.game_log, b.game_log);

        assert_eq!(a.board.placed_count(), b.board.placed_count());
        assert_eq!(a.board.last_placed(), b.board.last_placed());
        for chain in CHAIN_ARRAY {
            assert_eq!(a.board.chain_size(chain), b.board.chain_size(chain));
        }
    }

    #[test]
    fn test_fresh_game_round_trips() {
        let state = state_test_instance();

        let encoded = encode(&state).unwrap();
        let decoded = decode(&encoded).unwrap();

        assert_states_match(&state, &decoded);
    }

    #[test]
    fn test_game_in_progress_round_trips() {
        let mut engine = GameEngine::from_state(state_test_instance());

        // a couple of placements, including one that opens chain founding
        let state = engine.state().clone();
        let first = state.current_player().tiles[0];
        engine.play_tile(first);
        if *engine.turn_phase() == TurnPhase::BuyStocks {
            engine.skip_buying_stocks();
            engine.end_turn();
        }

        let encoded = encode(engine.state()).unwrap();
        let decoded = decode(&encoded).unwrap();

        assert_states_match(engine.state(), &decoded);

        // the board's occupancy survives, not just its counters
        assert!(decoded.board.has_tile(first.position()));

        // a resumed engine accepts commands as usual
        let resumed = GameEngine::from_state(decoded);
        assert_eq!(resumed.turn_phase(), engine.turn_phase());
    }

    #[test]
    fn test_chain_membership_round_trips() {
        let mut state = state_test_instance();
        for col in 1..=3i8 {
            let t: Tile = format!("A{col}").as_str().try_into().unwrap();
            state.board.place_tile(t.position());
        }
        let first: Tile = "A1".try_into().unwrap();
        let group = state.board.connected_positions(first.position());
        state.board.assign_chain(Chain::Tower, group);

        let decoded = decode(&encode(&state).unwrap()).unwrap();

        let probe: Tile = "A2".try_into().unwrap();
        assert_eq!(decoded.board.chain_size(Chain::Tower), 3);
        assert_eq!(decoded.board.chain_at(probe.position()), Some(Chain::Tower));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not a saved game").is_err());
        assert!(decode("{\"players\": []}").is_err());
    }
}
