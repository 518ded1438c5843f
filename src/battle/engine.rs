use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    catalog::ScoringCatalog,
    state::{
        BattleEvent, BattleOutcome, BattleState, Contestant, IntegrityError, Move, RoundNumber,
        Winner, DEFAULT_NAMES,
    },
};

/// 操作员提交给引擎的指令。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BattleCommand {
    Score {
        contestant: Contestant,
        criterion: String,
    },
    AdvanceRound,
    Rename {
        contestant: Contestant,
        name: String,
    },
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum BattleError {
    #[error("unknown criterion `{name}`")]
    UnknownCriterion { name: String },
    #[error("name for contestant {contestant} must not be blank")]
    InvalidName { contestant: Contestant },
    #[error("no round transition is available from round {round}")]
    IllegalTransition { round: RoundNumber },
    #[error("battle state failed its integrity check: {error}")]
    IntegrityViolation { error: IntegrityError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleResolution {
    pub state: BattleState,
    pub events: Vec<BattleEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BattleOutcome>,
}

impl BattleResolution {
    pub fn new(state: BattleState, events: Vec<BattleEvent>) -> Self {
        let outcome = state.outcome();
        Self {
            state,
            events,
            outcome,
        }
    }
}

/// 对战状态机：所有对 `BattleState` 的修改都经过这里。
#[derive(Debug, Clone)]
pub struct BattleEngine {
    catalog: ScoringCatalog,
    default_names: [String; 2],
    strict_transitions: bool,
}

impl BattleEngine {
    pub fn new() -> Self {
        Self {
            catalog: ScoringCatalog::default(),
            default_names: DEFAULT_NAMES.map(String::from),
            strict_transitions: false,
        }
    }

    pub fn with_catalog(mut self, catalog: ScoringCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_default_names(mut self, names: [String; 2]) -> Self {
        self.default_names = names;
        self
    }

    /// 严格模式下，无效的推进回合会返回 `IllegalTransition`，而不是静默忽略。
    pub fn with_strict_transitions(mut self, strict: bool) -> Self {
        self.strict_transitions = strict;
        self
    }

    pub fn catalog(&self) -> &ScoringCatalog {
        &self.catalog
    }

    pub fn new_battle(&self) -> BattleState {
        let [name_a, name_b] = self.default_names.clone();
        BattleState::new(name_a, name_b)
    }

    fn ensure_integrity(state: &BattleState) -> Result<(), BattleError> {
        match state.integrity_check() {
            Ok(()) => Ok(()),
            Err(error) => Self::reject(BattleError::IntegrityViolation { error }),
        }
    }

    fn reject<T>(error: BattleError) -> Result<T, BattleError> {
        warn!(%error, "command rejected");
        Err(error)
    }

    fn push(state: &mut BattleState, events: &mut Vec<BattleEvent>, event: BattleEvent) {
        state.record_event(event.clone());
        events.push(event);
    }

    /// 可宣布的胜者与本回合上一次宣布的不同时，追加 `BattleConcluded`。
    fn announce_conclusion(state: &mut BattleState, events: &mut Vec<BattleEvent>) -> bool {
        let round = state.current_round();
        let winner = match round {
            2 if state.is_concluded() => state.majority_through(2),
            3 => state.battle_winner(),
            _ => return false,
        };
        if !winner.is_decisive() || state.last_conclusion(round) == Some(winner) {
            return false;
        }

        info!(?winner, round, "battle winner announced");
        Self::push(state, events, BattleEvent::BattleConcluded { winner, round });
        true
    }

    pub fn score(
        &self,
        state: &mut BattleState,
        contestant: Contestant,
        criterion: &str,
    ) -> Result<Vec<BattleEvent>, BattleError> {
        Self::ensure_integrity(state)?;
        let Ok(criterion) = self.catalog.lookup(criterion) else {
            return Self::reject(BattleError::UnknownCriterion {
                name: criterion.to_string(),
            });
        };

        let entry = Move::from(criterion);
        let points = entry.points;
        let round = state.record_move(contestant, entry);
        debug!(%contestant, round, criterion = %criterion.name, %points, "move scored");

        let mut events = Vec::new();
        Self::push(
            state,
            &mut events,
            BattleEvent::MoveScored {
                contestant,
                round,
                criterion: criterion.name.clone(),
                points,
            },
        );

        Self::announce_conclusion(state, &mut events);
        Ok(events)
    }

    pub fn advance_round(&self, state: &mut BattleState) -> Result<Vec<BattleEvent>, BattleError> {
        Self::ensure_integrity(state)?;
        let mut events = Vec::new();

        match state.current_round() {
            1 => {
                let winner = state.current_round_winner();
                state.open_round(2);
                info!(?winner, "round 1 closed");
                Self::push(state, &mut events, BattleEvent::RoundClosed { round: 1, winner });
            }
            2 => {
                let majority = state.majority_through(2);
                if majority.is_decisive() {
                    if state.is_concluded() {
                        if Self::announce_conclusion(state, &mut events) {
                            return Ok(events);
                        }
                        return self.over_advance(state);
                    }
                    let winner = state.current_round_winner();
                    state.set_concluded(true);
                    info!(?majority, "battle decided after two rounds");
                    Self::push(state, &mut events, BattleEvent::RoundClosed { round: 2, winner });
                    Self::push(
                        state,
                        &mut events,
                        BattleEvent::BattleConcluded {
                            winner: majority,
                            round: 2,
                        },
                    );
                } else {
                    let winner = state.current_round_winner();
                    state.open_round(3);
                    info!("rounds split, decisive round started");
                    Self::push(state, &mut events, BattleEvent::RoundClosed { round: 2, winner });
                    Self::push(state, &mut events, BattleEvent::TiebreakStarted);
                }
            }
            _ => {
                if !Self::announce_conclusion(state, &mut events) {
                    return self.over_advance(state);
                }
            }
        }

        Ok(events)
    }

    fn over_advance(&self, state: &BattleState) -> Result<Vec<BattleEvent>, BattleError> {
        if self.strict_transitions {
            return Self::reject(BattleError::IllegalTransition {
                round: state.current_round(),
            });
        }
        debug!(round = state.current_round(), "advance ignored");
        Ok(Vec::new())
    }

    pub fn rename_contestant(
        &self,
        state: &mut BattleState,
        contestant: Contestant,
        name: &str,
    ) -> Result<Vec<BattleEvent>, BattleError> {
        Self::ensure_integrity(state)?;
        let name = name.trim();
        if name.is_empty() {
            return Self::reject(BattleError::InvalidName { contestant });
        }

        state.contestant_mut(contestant).set_name(name.to_string());
        debug!(%contestant, name, "contestant renamed");

        let mut events = Vec::new();
        Self::push(
            state,
            &mut events,
            BattleEvent::ContestantRenamed {
                contestant,
                name: name.to_string(),
            },
        );
        Ok(events)
    }

    /// 整体替换为全新状态，名字恢复默认值。
    pub fn reset(&self, state: &mut BattleState) -> Vec<BattleEvent> {
        *state = self.new_battle();
        info!("battle reset");
        vec![BattleEvent::BattleReset]
    }

    pub fn apply(
        &self,
        state: &mut BattleState,
        command: BattleCommand,
    ) -> Result<Vec<BattleEvent>, BattleError> {
        match command {
            BattleCommand::Score {
                contestant,
                criterion,
            } => self.score(state, contestant, &criterion),
            BattleCommand::AdvanceRound => self.advance_round(state),
            BattleCommand::Rename { contestant, name } => {
                self.rename_contestant(state, contestant, &name)
            }
            BattleCommand::Reset => Ok(self.reset(state)),
        }
    }

    pub fn current_round_winner(state: &BattleState) -> Winner {
        state.current_round_winner()
    }

    pub fn battle_winner(state: &BattleState) -> Winner {
        state.battle_winner()
    }

    pub fn is_complete(state: &BattleState) -> bool {
        state.is_complete()
    }
}

impl Default for BattleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::points::Points;

    fn score_many(engine: &BattleEngine, state: &mut BattleState, contestant: Contestant, picks: &[&str]) {
        for criterion in picks {
            engine
                .score(state, contestant, criterion)
                .expect("criterion should be in the catalog");
        }
    }

    fn round(a: &[&'static str], b: &[&'static str]) -> (Vec<&'static str>, Vec<&'static str>) {
        (a.to_vec(), b.to_vec())
    }

    fn play_rounds(engine: &BattleEngine, rounds: &[(Vec<&str>, Vec<&str>)]) -> BattleState {
        let mut state = engine.new_battle();
        for (index, (a, b)) in rounds.iter().enumerate() {
            if index > 0 {
                engine
                    .advance_round(&mut state)
                    .expect("advance should succeed");
            }
            score_many(engine, &mut state, Contestant::A, a);
            score_many(engine, &mut state, Contestant::B, b);
        }
        state
    }

    #[test]
    fn repeated_criterion_accumulates() {
        let engine = BattleEngine::new();
        let mut state = engine.new_battle();
        score_many(&engine, &mut state, Contestant::A, &["Fatality"; 3]);

        let a = state.contestant(Contestant::A);
        assert_eq!(a.round_score(1), Some(Points::whole(9)));
        assert_eq!(a.moves_in(1).len(), 3);
        assert!(state.integrity_check().is_ok());
    }

    #[test]
    fn unknown_criterion_leaves_state_untouched() {
        let engine = BattleEngine::new();
        let mut state = engine.new_battle();
        score_many(&engine, &mut state, Contestant::B, &["Flow"]);
        let before = state.clone();

        let result = engine.score(&mut state, Contestant::A, "NotACriterion");

        assert_eq!(
            result,
            Err(BattleError::UnknownCriterion {
                name: "NotACriterion".into()
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn round_one_always_advances() {
        let engine = BattleEngine::new().with_strict_transitions(true);
        let mut state = engine.new_battle();

        let events = engine
            .advance_round(&mut state)
            .expect("round 1 always advances");

        assert_eq!(state.current_round(), 2);
        assert_eq!(
            events,
            vec![BattleEvent::RoundClosed {
                round: 1,
                winner: Winner::Tie
            }]
        );
    }

    #[test]
    fn split_rounds_open_the_tiebreak() {
        // 5:3 然后 2:6
        let engine = BattleEngine::new();
        let mut state = play_rounds(
            &engine,
            &[
                round(&["Fatality", "Punch Line"], &["Fatality"]),
                round(&["Punch Line"], &["Fatality", "Fatality"]),
            ],
        );
        assert_eq!(state.battle_winner(), Winner::Tie);

        let events = engine
            .advance_round(&mut state)
            .expect("advance should succeed");

        assert_eq!(state.current_round(), 3);
        assert!(events.contains(&BattleEvent::TiebreakStarted));
        assert!(!state.is_complete());
    }

    #[test]
    fn decisive_majority_concludes_after_round_two() {
        // 5:3 然后 4:1
        let engine = BattleEngine::new();
        let mut state = play_rounds(
            &engine,
            &[
                round(&["Fatality", "Punch Line"], &["Fatality"]),
                round(&["Punch Line", "Punch Line"], &["Bom"]),
            ],
        );
        assert_eq!(state.battle_winner(), Winner::A);

        let events = engine
            .advance_round(&mut state)
            .expect("advance should succeed");

        assert_eq!(state.current_round(), 2);
        assert!(state.is_complete());
        assert!(events.contains(&BattleEvent::BattleConcluded {
            winner: Winner::A,
            round: 2
        }));
        assert_eq!(
            state.outcome().map(|outcome| outcome.winner),
            Some(Winner::A)
        );

        let again = engine
            .advance_round(&mut state)
            .expect("lenient engine ignores extra advances");
        assert!(again.is_empty());
        assert_eq!(state.current_round(), 2);
    }

    #[test]
    fn strict_engine_rejects_advancing_a_finished_battle() {
        let engine = BattleEngine::new().with_strict_transitions(true);
        let mut state = play_rounds(&engine, &[round(&["Bom"], &[]), round(&["Bom"], &[])]);
        engine
            .advance_round(&mut state)
            .expect("first advance concludes the battle");
        let before = state.clone();

        assert_eq!(
            engine.advance_round(&mut state),
            Err(BattleError::IllegalTransition { round: 2 })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn round_three_is_absorbing_and_completes_on_first_move() {
        let engine = BattleEngine::new();
        let mut state = play_rounds(&engine, &[round(&["Bom"], &[]), round(&[], &["Bom"])]);
        engine
            .advance_round(&mut state)
            .expect("tied rounds open round 3");

        let events = engine
            .score(&mut state, Contestant::B, "Flow")
            .expect("scoring round 3");
        assert!(events.contains(&BattleEvent::BattleConcluded {
            winner: Winner::B,
            round: 3
        }));
        assert!(state.is_complete());

        assert!(engine
            .advance_round(&mut state)
            .expect("lenient no-op")
            .is_empty());
        assert_eq!(state.current_round(), 3);

        // 1:0.5，胜者变化才再次宣布
        let later = engine
            .score(&mut state, Contestant::A, "Bom")
            .expect("scoring stays open in the core");
        assert_eq!(
            later.last(),
            Some(&BattleEvent::BattleConcluded {
                winner: Winner::A,
                round: 3
            })
        );
        let same = engine
            .score(&mut state, Contestant::A, "Flow")
            .expect("scoring stays open in the core");
        assert_eq!(same.len(), 1);
    }

    #[test]
    fn first_round_three_scorer_can_still_lose() {
        let engine = BattleEngine::new();
        let mut state = play_rounds(&engine, &[round(&["Bom"], &[]), round(&[], &["Bom"])]);
        engine
            .advance_round(&mut state)
            .expect("tied rounds open round 3");

        engine
            .score(&mut state, Contestant::A, "Regular")
            .expect("first tap");
        let events = engine
            .score(&mut state, Contestant::B, "Fatality")
            .expect("answer");

        assert!(events.contains(&BattleEvent::BattleConcluded {
            winner: Winner::B,
            round: 3
        }));
        assert_eq!(state.last_conclusion(3), Some(Winner::B));
        assert_eq!(
            state.outcome(),
            Some(BattleOutcome {
                winner: Winner::B,
                round: 3
            })
        );
    }

    #[test]
    fn tied_tiebreak_announces_nobody() {
        let engine = BattleEngine::new();
        let mut state = play_rounds(&engine, &[round(&["Bom"], &[]), round(&[], &["Bom"])]);
        engine
            .advance_round(&mut state)
            .expect("tied rounds open round 3");

        engine.score(&mut state, Contestant::A, "Flow").expect("A");
        let events = engine.score(&mut state, Contestant::B, "Flow").expect("B");

        assert_eq!(events.len(), 1);
        assert_eq!(state.battle_winner(), Winner::Tie);
    }

    #[test]
    fn flipped_round_two_result_is_announced_again() {
        let engine = BattleEngine::new();
        let mut state = play_rounds(&engine, &[round(&[], &[]), round(&["Bom"], &[])]);
        engine.advance_round(&mut state).expect("concludes for A");
        assert_eq!(state.last_conclusion(2), Some(Winner::A));

        let events = engine
            .score(&mut state, Contestant::B, "Fatality")
            .expect("late score");

        assert_eq!(
            events.last(),
            Some(&BattleEvent::BattleConcluded {
                winner: Winner::B,
                round: 2
            })
        );
        assert_eq!(
            state.outcome().map(|outcome| outcome.winner),
            Some(Winner::B)
        );
        assert!(engine
            .advance_round(&mut state)
            .expect("already announced")
            .is_empty());
    }

    #[test]
    fn advance_announces_a_winner_missing_from_the_log() {
        let engine = BattleEngine::new();
        let mut state = play_rounds(&engine, &[round(&[], &[]), round(&["Bom"], &[])]);
        engine.advance_round(&mut state).expect("concludes for A");

        // 日志为空的状态（例如前端只回传了分数）
        let mut value = serde_json::to_value(&state).expect("serialize");
        value["event_log"] = serde_json::json!([]);
        let mut restored: BattleState = serde_json::from_value(value).expect("restore");

        let events = engine
            .advance_round(&mut restored)
            .expect("re-announces");
        assert_eq!(
            events,
            vec![BattleEvent::BattleConcluded {
                winner: Winner::A,
                round: 2
            }]
        );
    }

    #[test]
    fn strict_engine_rejects_advancing_past_round_three() {
        let engine = BattleEngine::new().with_strict_transitions(true);
        let mut state = play_rounds(&engine, &[round(&["Bom"], &[]), round(&[], &["Bom"])]);
        engine
            .advance_round(&mut state)
            .expect("tied rounds open round 3");
        let before = state.clone();

        assert_eq!(
            engine.advance_round(&mut state),
            Err(BattleError::IllegalTransition { round: 3 })
        );
        assert_eq!(state, before);

        engine.score(&mut state, Contestant::A, "Bom").expect("round 3 move");
        assert_eq!(
            engine.advance_round(&mut state),
            Err(BattleError::IllegalTransition { round: 3 })
        );
    }

    #[test]
    fn rescoring_after_conclusion_can_reopen_the_tiebreak() {
        let engine = BattleEngine::new();
        let mut state = play_rounds(&engine, &[round(&["Bom"], &[]), round(&[], &[])]);
        engine.advance_round(&mut state).expect("concludes");
        assert!(state.is_complete());

        score_many(&engine, &mut state, Contestant::B, &["Bom"]);
        assert!(!state.is_complete());

        engine.advance_round(&mut state).expect("re-evaluates");
        assert_eq!(state.current_round(), 3);
        assert!(!state.is_concluded());
    }

    #[test]
    fn rename_trims_and_rejects_blank() {
        let engine = BattleEngine::new();
        let mut state = engine.new_battle();

        engine
            .rename_contestant(&mut state, Contestant::A, "  Orochi ")
            .expect("valid name");
        assert_eq!(state.contestant(Contestant::A).name(), "Orochi");

        let before = state.clone();
        assert_eq!(
            engine.rename_contestant(&mut state, Contestant::B, "   "),
            Err(BattleError::InvalidName {
                contestant: Contestant::B
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn reset_restores_a_fresh_battle() {
        let engine = BattleEngine::new();
        let mut state = play_rounds(&engine, &[round(&["Bom"], &[]), round(&[], &["Bom"])]);
        engine.advance_round(&mut state).expect("tiebreak");
        engine
            .rename_contestant(&mut state, Contestant::B, "Neo")
            .expect("rename");

        let events = engine.reset(&mut state);

        assert_eq!(events, vec![BattleEvent::BattleReset]);
        assert_eq!(state, engine.new_battle());
        assert_eq!(state.current_round(), 1);
        assert_eq!(state.contestant(Contestant::B).name(), "MC 2");
    }

    #[test]
    fn apply_dispatches_json_commands() {
        let engine = BattleEngine::new();
        let mut state = engine.new_battle();
        let command: BattleCommand =
            serde_json::from_str(r#"{"type":"Score","contestant":"B","criterion":"Showman"}"#)
                .expect("command json");

        engine.apply(&mut state, command).expect("apply score");

        assert_eq!(
            state.contestant(Contestant::B).round_score(1),
            Some(Points::from_centi(50))
        );
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn corrupted_state_is_rejected_before_mutation() {
        let engine = BattleEngine::new();
        let mut state: BattleState = serde_json::from_value(serde_json::json!({
            "current_round": 1,
            "contestant_a": {
                "name": "MC 1",
                "round_scores": [5.0, 0.0, 0.0],
                "round_moves": [[], [], []]
            },
            "contestant_b": {
                "name": "MC 2",
                "round_scores": [0.0, 0.0, 0.0],
                "round_moves": [[], [], []]
            }
        }))
        .expect("state json");

        let before = state.clone();

        let result = engine.score(&mut state, Contestant::A, "Bom");
        assert!(matches!(
            result,
            Err(BattleError::IntegrityViolation {
                error: IntegrityError::ScoreMismatch { .. }
            })
        ));
        assert!(matches!(
            engine.advance_round(&mut state),
            Err(BattleError::IntegrityViolation { .. })
        ));
        assert_eq!(state, before);
    }
}
