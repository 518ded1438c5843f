use serde::{Deserialize, Serialize};

use super::{
    catalog::{Criterion, ScoringCatalog},
    points::Points,
    state::{BattleState, Contestant, Winner},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CriterionCount {
    pub criterion: String,
    pub count: u32,
}

/// 每个评分项被打出的次数，按目录顺序排列。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MoveFrequency {
    counts: Vec<CriterionCount>,
}

impl MoveFrequency {
    /// 目录外的评分项返回 0。
    pub fn get(&self, criterion: &str) -> u32 {
        self.counts
            .iter()
            .find(|entry| entry.criterion == criterion)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CriterionCount> + '_ {
        self.counts.iter()
    }

    pub fn max(&self) -> u32 {
        self.counts.iter().map(|entry| entry.count).max().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|entry| entry.count).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContestantStats {
    pub contestant: Contestant,
    pub name: String,
    pub round_scores: Vec<Points>,
    pub total: Points,
    pub frequency: MoveFrequency,
}

/// 导出层使用的统计快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub contestants: Vec<ContestantStats>,
    pub overall_winner: Winner,
    pub battle_winner: Winner,
    pub max_frequency: u32,
    pub catalog: Vec<Criterion>,
}

/// 基于 `BattleState` 的只读投影，每次查询都重新计算。
#[derive(Debug, Clone, Copy)]
pub struct StatsAggregator<'a> {
    state: &'a BattleState,
    catalog: &'a ScoringCatalog,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(state: &'a BattleState, catalog: &'a ScoringCatalog) -> Self {
        Self { state, catalog }
    }

    pub fn total_score(&self, contestant: Contestant) -> Points {
        self.state.contestant(contestant).total()
    }

    pub fn move_frequency(&self, contestant: Contestant) -> MoveFrequency {
        let mut counts: Vec<CriterionCount> = self
            .catalog
            .criteria()
            .iter()
            .map(|criterion| CriterionCount {
                criterion: criterion.name.clone(),
                count: 0,
            })
            .collect();

        for entry in self.state.contestant(contestant).all_moves() {
            if let Some(index) = self.catalog.position(&entry.criterion) {
                counts[index].count += 1;
            }
        }

        MoveFrequency { counts }
    }

    /// 双方所有评分项中的最大次数，至少为 1，可直接作为归一化分母。
    pub fn max_frequency(&self) -> u32 {
        Contestant::BOTH
            .iter()
            .map(|&contestant| self.move_frequency(contestant).max())
            .max()
            .unwrap_or(0)
            .max(1)
    }

    /// 按总分比较；与按回合胜场的 `battle_winner` 是两个独立指标。
    pub fn overall_winner(&self) -> Winner {
        Winner::compare(
            self.total_score(Contestant::A),
            self.total_score(Contestant::B),
        )
    }

    pub fn battle_winner(&self) -> Winner {
        self.state.battle_winner()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let contestants = Contestant::BOTH
            .iter()
            .map(|&contestant| {
                let state = self.state.contestant(contestant);
                ContestantStats {
                    contestant,
                    name: state.name().to_string(),
                    round_scores: state.round_scores().to_vec(),
                    total: state.total(),
                    frequency: self.move_frequency(contestant),
                }
            })
            .collect();

        StatsSnapshot {
            contestants,
            overall_winner: self.overall_winner(),
            battle_winner: self.battle_winner(),
            max_frequency: self.max_frequency(),
            catalog: self.catalog.criteria().to_vec(),
        }
    }
}
