pub mod battle;
pub mod config;

use std::str::FromStr;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub use battle::{
    BattleCommand, BattleEngine, BattleError, BattleEvent, BattleOutcome, BattleReport,
    BattleResolution, BattleState, CatalogError, Contestant, ContestantState, Criterion,
    IntegrityError, JsonReportExporter, Move, MoveFrequency, Points, ReportExporter,
    RoundNumber, ScoringCatalog, StatsAggregator, StatsSnapshot, Winner,
};
pub use config::{BattleConfig, ConfigError};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    web_sys::console::log_1(&"Rima Justa: sistema de avaliação de MCs carregado".into());
}

fn to_js_error(error: BattleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn display_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_contestant(value: &str) -> Result<Contestant, JsValue> {
    Contestant::from_str(value)
        .map_err(|_| JsValue::from_str(&format!("unknown contestant `{value}`")))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(display_to_js_error)
}

/// 持有引擎与当前对战状态的会话，供前端逐条提交指令。
#[wasm_bindgen]
pub struct BattleSession {
    engine: BattleEngine,
    state: BattleState,
}

impl BattleSession {
    pub fn with_engine(engine: BattleEngine) -> Self {
        let state = engine.new_battle();
        Self { engine, state }
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn execute(&mut self, command: BattleCommand) -> Result<BattleResolution, BattleError> {
        let events = self.engine.apply(&mut self.state, command)?;
        Ok(BattleResolution::new(self.state.clone(), events))
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsAggregator::new(&self.state, self.engine.catalog()).snapshot()
    }

    pub fn report(&self) -> BattleReport {
        BattleReport::build(&self.state, self.engine.catalog())
    }

    fn execute_json(&mut self, command: BattleCommand) -> Result<String, JsValue> {
        let resolution = self.execute(command).map_err(to_js_error)?;
        to_json(&resolution)
    }
}

#[wasm_bindgen]
impl BattleSession {
    /// `config_toml` 为空时使用内置目录与默认选手名。
    #[wasm_bindgen(constructor)]
    pub fn new(config_toml: Option<String>) -> Result<BattleSession, JsValue> {
        let config = match config_toml {
            Some(source) => BattleConfig::from_toml_str(&source).map_err(display_to_js_error)?,
            None => BattleConfig::default(),
        };
        let engine = config.build_engine().map_err(display_to_js_error)?;
        Ok(BattleSession::with_engine(engine))
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(&self.state)
    }

    pub fn catalog_json(&self) -> Result<String, JsValue> {
        to_json(self.engine.catalog())
    }

    pub fn score(&mut self, contestant: &str, criterion: &str) -> Result<String, JsValue> {
        let contestant = parse_contestant(contestant)?;
        self.execute_json(BattleCommand::Score {
            contestant,
            criterion: criterion.to_string(),
        })
    }

    pub fn advance_round(&mut self) -> Result<String, JsValue> {
        self.execute_json(BattleCommand::AdvanceRound)
    }

    pub fn rename(&mut self, contestant: &str, name: &str) -> Result<String, JsValue> {
        let contestant = parse_contestant(contestant)?;
        self.execute_json(BattleCommand::Rename {
            contestant,
            name: name.to_string(),
        })
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        self.execute_json(BattleCommand::Reset)
    }

    pub fn apply_json(&mut self, command_json: &str) -> Result<String, JsValue> {
        let command: BattleCommand =
            serde_json::from_str(command_json).map_err(display_to_js_error)?;
        self.execute_json(command)
    }

    pub fn current_round(&self) -> u8 {
        self.state.current_round()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn stats_json(&self) -> Result<String, JsValue> {
        to_json(&self.stats())
    }

    pub fn report_json(&self) -> Result<String, JsValue> {
        JsonReportExporter::default()
            .export(&self.report())
            .map_err(display_to_js_error)
    }
}

fn with_state<F>(state: JsValue, command: F) -> Result<JsValue, JsValue>
where
    F: FnOnce(&BattleEngine, &mut BattleState) -> Result<Vec<BattleEvent>, BattleError>,
{
    let mut state: BattleState = from_value(state).map_err(JsValue::from)?;
    let engine = BattleEngine::new();
    let events = command(&engine, &mut state).map_err(to_js_error)?;
    to_value(&BattleResolution::new(state, events)).map_err(JsValue::from)
}

/// 返回一场使用默认选手名的新对战。
#[wasm_bindgen(js_name = "createBattleState")]
pub fn create_battle_state() -> Result<JsValue, JsValue> {
    to_value(&BattleEngine::new().new_battle()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "scoringCatalog")]
pub fn scoring_catalog() -> Result<JsValue, JsValue> {
    to_value(ScoringCatalog::standard()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "scoreMove")]
pub fn score_move(state: JsValue, contestant: &str, criterion: &str) -> Result<JsValue, JsValue> {
    let contestant = parse_contestant(contestant)?;
    with_state(state, |engine, state| {
        engine.score(state, contestant, criterion)
    })
}

#[wasm_bindgen(js_name = "advanceRound")]
pub fn advance_round(state: JsValue) -> Result<JsValue, JsValue> {
    with_state(state, |engine, state| engine.advance_round(state))
}

#[wasm_bindgen(js_name = "renameContestant")]
pub fn rename_contestant(state: JsValue, contestant: &str, name: &str) -> Result<JsValue, JsValue> {
    let contestant = parse_contestant(contestant)?;
    with_state(state, |engine, state| {
        engine.rename_contestant(state, contestant, name)
    })
}

#[wasm_bindgen(js_name = "resetBattle")]
pub fn reset_battle(state: JsValue) -> Result<JsValue, JsValue> {
    with_state(state, |engine, state| Ok(engine.reset(state)))
}

#[wasm_bindgen(js_name = "currentRoundWinner")]
pub fn current_round_winner(state: JsValue) -> Result<JsValue, JsValue> {
    let state: BattleState = from_value(state).map_err(JsValue::from)?;
    to_value(&BattleEngine::current_round_winner(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "battleWinner")]
pub fn battle_winner(state: JsValue) -> Result<JsValue, JsValue> {
    let state: BattleState = from_value(state).map_err(JsValue::from)?;
    to_value(&BattleEngine::battle_winner(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "battleStats")]
pub fn battle_stats(state: JsValue) -> Result<JsValue, JsValue> {
    let state: BattleState = from_value(state).map_err(JsValue::from)?;
    let snapshot = StatsAggregator::new(&state, ScoringCatalog::standard()).snapshot();
    to_value(&snapshot).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "battleReport")]
pub fn battle_report(state: JsValue) -> Result<JsValue, JsValue> {
    let state: BattleState = from_value(state).map_err(JsValue::from)?;
    to_value(&BattleReport::build(&state, ScoringCatalog::standard())).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: BattleState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(BattleError::IntegrityViolation { error }))?;
    Ok(())
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
