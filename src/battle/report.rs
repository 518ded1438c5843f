use serde::{Deserialize, Serialize};

use super::{
    catalog::ScoringCatalog,
    points::Points,
    state::{BattleState, Contestant, Move, RoundNumber, Winner},
    stats::StatsAggregator,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundReport {
    pub round: RoundNumber,
    pub score: Points,
    pub moves: Vec<Move>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContestantReport {
    pub contestant: Contestant,
    pub name: String,
    pub rounds: Vec<RoundReport>,
    pub total: Points,
}

/// 频次图的一行；`ratio_*` 为次数除以最大频次，取值 0..=1。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrequencyRow {
    pub criterion: String,
    pub points: Points,
    pub count_a: u32,
    pub count_b: u32,
    pub ratio_a: f64,
    pub ratio_b: f64,
}

/// 战报：统计弹窗与 PDF 所需的全部数据，不含任何排版信息。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleReport {
    pub contestants: Vec<ContestantReport>,
    pub overall_winner: Winner,
    pub winner_label: String,
    pub battle_winner: Winner,
    pub frequency_chart: Vec<FrequencyRow>,
    pub max_frequency: u32,
    pub legend: [String; 2],
}

impl BattleReport {
    pub fn build(state: &BattleState, catalog: &ScoringCatalog) -> Self {
        let stats = StatsAggregator::new(state, catalog);

        let contestants = Contestant::BOTH
            .iter()
            .map(|&contestant| {
                let record = state.contestant(contestant);
                let rounds = record
                    .round_scores()
                    .iter()
                    .zip(record.round_moves().iter())
                    .enumerate()
                    .map(|(index, (score, moves))| RoundReport {
                        round: index as RoundNumber + 1,
                        score: *score,
                        moves: moves.clone(),
                    })
                    .collect();
                ContestantReport {
                    contestant,
                    name: record.name().to_string(),
                    rounds,
                    total: stats.total_score(contestant),
                }
            })
            .collect();

        let frequency_a = stats.move_frequency(Contestant::A);
        let frequency_b = stats.move_frequency(Contestant::B);
        let max_frequency = stats.max_frequency();
        let frequency_chart = catalog
            .criteria()
            .iter()
            .map(|criterion| {
                let count_a = frequency_a.get(&criterion.name);
                let count_b = frequency_b.get(&criterion.name);
                FrequencyRow {
                    criterion: criterion.name.clone(),
                    points: criterion.points,
                    count_a,
                    count_b,
                    ratio_a: f64::from(count_a) / f64::from(max_frequency),
                    ratio_b: f64::from(count_b) / f64::from(max_frequency),
                }
            })
            .collect();

        let overall_winner = stats.overall_winner();
        Self {
            contestants,
            overall_winner,
            winner_label: overall_winner.label(state).to_string(),
            battle_winner: stats.battle_winner(),
            frequency_chart,
            max_frequency,
            legend: [
                state.contestant(Contestant::A).name().to_string(),
                state.contestant(Contestant::B).name().to_string(),
            ],
        }
    }
}

/// 文档生成方（PDF、打印等）实现的接口。
pub trait ReportExporter {
    type Output;
    type Error;

    fn export(&self, report: &BattleReport) -> Result<Self::Output, Self::Error>;
}

/// 把战报序列化为 JSON，交给前端的文档生成器。
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportExporter {
    pub pretty: bool,
}

impl JsonReportExporter {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ReportExporter for JsonReportExporter {
    type Output = String;
    type Error = serde_json::Error;

    fn export(&self, report: &BattleReport) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        }
    }
}
