use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::Criterion;
use super::points::Points;

/// 一场对战最多三个回合。
pub const ROUND_COUNT: usize = 3;
pub const DEFAULT_NAMES: [&str; 2] = ["MC 1", "MC 2"];
const TIE_LABEL: &str = "Empate";

/// 回合编号，取值 1..=3。
pub type RoundNumber = u8;

/// 参赛席位。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Contestant {
    A,
    B,
}

impl Contestant {
    pub const BOTH: [Contestant; 2] = [Contestant::A, Contestant::B];

    pub fn index(self) -> usize {
        match self {
            Contestant::A => 0,
            Contestant::B => 1,
        }
    }
}

impl fmt::Display for Contestant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contestant::A => f.write_str("A"),
            Contestant::B => f.write_str("B"),
        }
    }
}

impl FromStr for Contestant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "1" | "mc1" | "mc 1" => Ok(Contestant::A),
            "b" | "2" | "mc2" | "mc 2" => Ok(Contestant::B),
            _ => Err(()),
        }
    }
}

/// 比较结果：A 胜、B 胜或平局。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Winner {
    A,
    B,
    Tie,
}

impl Winner {
    /// 严格大于者胜，相等为平局。
    pub fn compare<T: Ord>(a: T, b: T) -> Self {
        match a.cmp(&b) {
            Ordering::Greater => Winner::A,
            Ordering::Less => Winner::B,
            Ordering::Equal => Winner::Tie,
        }
    }

    pub fn is_decisive(self) -> bool {
        !matches!(self, Winner::Tie)
    }

    pub fn contestant(self) -> Option<Contestant> {
        match self {
            Winner::A => Some(Contestant::A),
            Winner::B => Some(Contestant::B),
            Winner::Tie => None,
        }
    }

    /// 胜者的显示名；平局显示 "Empate"。
    pub fn label(self, state: &BattleState) -> &str {
        match self.contestant() {
            Some(contestant) => state.contestant(contestant).name(),
            None => TIE_LABEL,
        }
    }
}

impl From<Contestant> for Winner {
    fn from(contestant: Contestant) -> Self {
        match contestant {
            Contestant::A => Winner::A,
            Contestant::B => Winner::B,
        }
    }
}

/// 一次得分记录，分值在打分时从目录中快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Move {
    pub criterion: String,
    pub points: Points,
}

impl Move {
    pub fn new(criterion: impl Into<String>, points: Points) -> Self {
        Self {
            criterion: criterion.into(),
            points,
        }
    }
}

impl From<&Criterion> for Move {
    fn from(criterion: &Criterion) -> Self {
        Move::new(criterion.name.clone(), criterion.points)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContestantState {
    name: String,
    round_scores: [Points; ROUND_COUNT],
    round_moves: [Vec<Move>; ROUND_COUNT],
}

impl ContestantState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            round_scores: [Points::ZERO; ROUND_COUNT],
            round_moves: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn round_scores(&self) -> &[Points; ROUND_COUNT] {
        &self.round_scores
    }

    pub fn round_moves(&self) -> &[Vec<Move>; ROUND_COUNT] {
        &self.round_moves
    }

    pub fn round_score(&self, round: RoundNumber) -> Option<Points> {
        round_index(round).map(|index| self.round_scores[index])
    }

    pub fn moves_in(&self, round: RoundNumber) -> &[Move] {
        round_index(round)
            .map(|index| self.round_moves[index].as_slice())
            .unwrap_or(&[])
    }

    pub fn total(&self) -> Points {
        self.round_scores.iter().sum()
    }

    pub fn all_moves(&self) -> impl Iterator<Item = &Move> + '_ {
        self.round_moves.iter().flatten()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn push_move(&mut self, index: usize, entry: Move) {
        self.round_scores[index] += entry.points;
        self.round_moves[index].push(entry);
    }
}

/// 对战结束时的裁定。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BattleOutcome {
    pub winner: Winner,
    pub round: RoundNumber,
}

/// 对战事件流，供通知层渲染。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BattleEvent {
    MoveScored {
        contestant: Contestant,
        round: RoundNumber,
        criterion: String,
        points: Points,
    },
    ContestantRenamed {
        contestant: Contestant,
        name: String,
    },
    RoundClosed {
        round: RoundNumber,
        winner: Winner,
    },
    TiebreakStarted,
    BattleConcluded {
        winner: Winner,
        round: RoundNumber,
    },
    BattleReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("current round {round} is outside 1..=3")]
    RoundOutOfRange { round: RoundNumber },
    #[error("contestant {contestant} round {round} records {recorded} pts but its moves add up to {expected} pts")]
    ScoreMismatch {
        contestant: Contestant,
        round: RoundNumber,
        recorded: Points,
        expected: Points,
    },
    #[error("contestant {contestant} has points in round {round}, which has not started")]
    FutureRoundScored {
        contestant: Contestant,
        round: RoundNumber,
    },
    #[error("contestant {contestant} has a blank name")]
    BlankName { contestant: Contestant },
    #[error("a battle can only be concluded early in round 2, found round {round}")]
    MisplacedConclusion { round: RoundNumber },
}

/// 对战整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BattleState {
    current_round: RoundNumber,
    contestant_a: ContestantState,
    contestant_b: ContestantState,
    #[serde(default)]
    concluded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    event_log: Vec<BattleEvent>,
}

impl BattleState {
    pub fn new(name_a: impl Into<String>, name_b: impl Into<String>) -> Self {
        Self {
            current_round: 1,
            contestant_a: ContestantState::new(name_a),
            contestant_b: ContestantState::new(name_b),
            concluded: false,
            event_log: Vec::new(),
        }
    }

    pub fn current_round(&self) -> RoundNumber {
        self.current_round
    }

    pub fn contestant(&self, contestant: Contestant) -> &ContestantState {
        match contestant {
            Contestant::A => &self.contestant_a,
            Contestant::B => &self.contestant_b,
        }
    }

    pub(crate) fn contestant_mut(&mut self, contestant: Contestant) -> &mut ContestantState {
        match contestant {
            Contestant::A => &mut self.contestant_a,
            Contestant::B => &mut self.contestant_b,
        }
    }

    /// 第二回合后已分出胜负并被封盘。
    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.event_log
    }

    /// 事件日志里该回合最近一次宣布的胜者。
    pub fn last_conclusion(&self, round: RoundNumber) -> Option<Winner> {
        self.event_log.iter().rev().find_map(|event| match *event {
            BattleEvent::BattleConcluded {
                winner,
                round: concluded,
            } if concluded == round => Some(winner),
            _ => None,
        })
    }

    pub fn round_winner(&self, round: RoundNumber) -> Option<Winner> {
        let a = self.contestant_a.round_score(round)?;
        let b = self.contestant_b.round_score(round)?;
        Some(Winner::compare(a, b))
    }

    pub fn current_round_winner(&self) -> Winner {
        self.round_winner(self.current_round)
            .unwrap_or(Winner::Tie)
    }

    /// 统计第 1 回合到 `through` 回合（含）中双方各赢了几个回合。
    pub fn round_wins(&self, through: RoundNumber) -> (usize, usize) {
        let last = through.min(ROUND_COUNT as RoundNumber);
        (1..=last)
            .filter_map(|round| self.round_winner(round))
            .fold((0, 0), |(a, b), winner| match winner {
                Winner::A => (a + 1, b),
                Winner::B => (a, b + 1),
                Winner::Tie => (a, b),
            })
    }

    /// 多数规则：回合胜场严格更多者胜。
    pub fn majority_through(&self, through: RoundNumber) -> Winner {
        let (a, b) = self.round_wins(through);
        Winner::compare(a, b)
    }

    /// 三回合胜场比较；未进行的回合为 0:0，不计入任何一方。
    pub fn battle_winner(&self) -> Winner {
        self.majority_through(ROUND_COUNT as RoundNumber)
    }

    pub fn round_has_moves(&self, round: RoundNumber) -> bool {
        Contestant::BOTH
            .iter()
            .any(|&contestant| !self.contestant(contestant).moves_in(round).is_empty())
    }

    pub fn is_complete(&self) -> bool {
        match self.current_round {
            2 => self.concluded && self.majority_through(2).is_decisive(),
            3 => self.round_has_moves(3),
            _ => false,
        }
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        if !self.is_complete() {
            return None;
        }
        Some(BattleOutcome {
            winner: self.battle_winner(),
            round: self.current_round,
        })
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if round_index(self.current_round).is_none() {
            return Err(IntegrityError::RoundOutOfRange {
                round: self.current_round,
            });
        }
        if self.concluded && self.current_round != 2 {
            return Err(IntegrityError::MisplacedConclusion {
                round: self.current_round,
            });
        }

        for contestant in Contestant::BOTH {
            let state = self.contestant(contestant);
            if state.name.trim().is_empty() {
                return Err(IntegrityError::BlankName { contestant });
            }
            for (index, (recorded, moves)) in state
                .round_scores
                .iter()
                .zip(state.round_moves.iter())
                .enumerate()
            {
                let round = index as RoundNumber + 1;
                let expected: Points = moves.iter().map(|entry| entry.points).sum();
                if *recorded != expected {
                    return Err(IntegrityError::ScoreMismatch {
                        contestant,
                        round,
                        recorded: *recorded,
                        expected,
                    });
                }
                if round > self.current_round && (!moves.is_empty() || !recorded.is_zero()) {
                    return Err(IntegrityError::FutureRoundScored { contestant, round });
                }
            }
        }

        Ok(())
    }

    /// 把一次得分写入当前回合，返回写入的回合编号。
    pub(crate) fn record_move(&mut self, contestant: Contestant, entry: Move) -> RoundNumber {
        let round = self.current_round;
        if let Some(index) = round_index(round) {
            self.contestant_mut(contestant).push_move(index, entry);
        }
        round
    }

    pub(crate) fn open_round(&mut self, round: RoundNumber) {
        debug_assert!(round > self.current_round);
        self.current_round = round;
        self.concluded = false;
    }

    pub(crate) fn set_concluded(&mut self, concluded: bool) {
        self.concluded = concluded;
    }

    pub(crate) fn record_event(&mut self, event: BattleEvent) {
        self.event_log.push(event);
    }
}

impl Default for BattleState {
    fn default() -> Self {
        Self::new(DEFAULT_NAMES[0], DEFAULT_NAMES[1])
    }
}

fn round_index(round: RoundNumber) -> Option<usize> {
    let index = usize::from(round).checked_sub(1)?;
    (index < ROUND_COUNT).then_some(index)
}
