//! 对战评分核心（目录、状态机、统计与战报数据）。

pub mod catalog;
pub mod engine;
pub mod points;
pub mod report;
pub mod state;
pub mod stats;

pub use catalog::{CatalogError, Criterion, ScoringCatalog};
pub use engine::{BattleCommand, BattleEngine, BattleError, BattleResolution};
pub use points::Points;
pub use report::{
    BattleReport, ContestantReport, FrequencyRow, JsonReportExporter, ReportExporter, RoundReport,
};
pub use state::{
    BattleEvent,
    BattleOutcome,
    BattleState,
    Contestant,
    ContestantState,
    IntegrityError,
    Move,
    RoundNumber,
    Winner,
    DEFAULT_NAMES,
    ROUND_COUNT,
};
pub use stats::{ContestantStats, CriterionCount, MoveFrequency, StatsAggregator, StatsSnapshot};
