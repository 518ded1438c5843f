//! Rima Justa judge console
//!
//! Scores a battle from the terminal: one operator command per line, read from
//! stdin or from a script file.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::Parser;
use rima_justa::{
    BattleCommand, BattleConfig, BattleEvent, BattleReport, BattleState, Contestant,
    JsonReportExporter, ReportExporter, ScoringCatalog, StatsAggregator, Winner,
};

/// Rima Justa judge console - score a freestyle battle from the terminal
#[derive(Parser, Debug)]
#[command(name = "rima-judge")]
#[command(about = "Score a two-MC freestyle battle one command at a time")]
struct Args {
    /// TOML file with the scoring catalog and default names
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read commands from this file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,

    /// Print the JSON battle report when input ends
    #[arg(long)]
    report: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Command(BattleCommand),
    Stats,
    Report,
    Help,
    Quit,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::default(),
    };
    let engine = config.build_engine()?;
    let mut state = engine.new_battle();
    tracing::info!(criteria = engine.catalog().len(), "judge console ready");

    let interactive = args.script.is_none();
    let reader: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    if interactive {
        print_help(engine.catalog());
    }

    let mut lines = reader.lines();
    loop {
        if interactive {
            print!("[round {}] > ", state.current_round());
            io::stdout().flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let input = match parse_line(&line, engine.catalog()) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match input {
            Input::Quit => break,
            Input::Help => print_help(engine.catalog()),
            Input::Stats => print_stats(&state, engine.catalog()),
            Input::Report => print_report(&state, engine.catalog())?,
            Input::Command(command) => match engine.apply(&mut state, command) {
                Ok(events) => {
                    for event in &events {
                        println!("{}", describe_event(event, &state));
                    }
                    print_status(&state);
                }
                Err(error) => println!("rejected: {error}"),
            },
        }
    }

    if args.report {
        print_report(&state, engine.catalog())?;
    }

    Ok(())
}

fn parse_line(line: &str, catalog: &ScoringCatalog) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let input = match verb.to_lowercase().as_str() {
        "quit" | "q" | "exit" => Input::Quit,
        "help" | "h" | "?" => Input::Help,
        "stats" | "s" => Input::Stats,
        "report" => Input::Report,
        "next" | "n" | "advance" => Input::Command(BattleCommand::AdvanceRound),
        "reset" => Input::Command(BattleCommand::Reset),
        "score" => {
            let (who, criterion) = split_contestant(rest)
                .ok_or_else(|| "Usage: score <a|b> <criterion>".to_string())?;
            let criterion = resolve_criterion(catalog, criterion)
                .ok_or_else(|| format!("unknown criterion `{criterion}`"))?;
            Input::Command(BattleCommand::Score {
                contestant: who,
                criterion,
            })
        }
        "rename" => {
            let (who, name) = split_contestant(rest)
                .ok_or_else(|| "Usage: rename <a|b> <name>".to_string())?;
            Input::Command(BattleCommand::Rename {
                contestant: who,
                name: name.to_string(),
            })
        }
        other => return Err(format!("unknown command `{other}` (type `help`)")),
    };

    Ok(Some(input))
}

fn split_contestant(rest: &str) -> Option<(Contestant, &str)> {
    let (who, tail) = rest.split_once(char::is_whitespace)?;
    let contestant = who.parse::<Contestant>().ok()?;
    Some((contestant, tail.trim()))
}

/// Exact name first, then a case-insensitive match so `punch line` finds `Punch Line`.
fn resolve_criterion(catalog: &ScoringCatalog, input: &str) -> Option<String> {
    if catalog.contains(input) {
        return Some(input.to_string());
    }
    let wanted = input.to_lowercase();
    catalog
        .names()
        .find(|name| name.to_lowercase() == wanted)
        .map(str::to_string)
}

fn describe_event(event: &BattleEvent, state: &BattleState) -> String {
    match event {
        BattleEvent::MoveScored {
            contestant,
            criterion,
            points,
            ..
        } => format!(
            "{} +{} ({})",
            state.contestant(*contestant).name(),
            points,
            criterion
        ),
        BattleEvent::ContestantRenamed { contestant, name } => {
            format!("MC {} agora é {}", contestant.index() + 1, name)
        }
        BattleEvent::RoundClosed { round, winner } => {
            format!("Round {round} Finalizado! Vencedor: {}", winner.label(state))
        }
        BattleEvent::TiebreakStarted => {
            "Terceiro Round! Empate nos rounds anteriores. Round decisivo iniciado!".to_string()
        }
        BattleEvent::BattleConcluded { winner, .. } => match winner {
            Winner::Tie => "Batalha Finalizada! Empate.".to_string(),
            _ => format!("Batalha Finalizada! {} venceu a batalha!", winner.label(state)),
        },
        BattleEvent::BattleReset => {
            "Nova Batalha: placar zerado e pronto para nova batalha!".to_string()
        }
    }
}

fn print_status(state: &BattleState) {
    let line = Contestant::BOTH
        .iter()
        .map(|&contestant| {
            let record = state.contestant(contestant);
            let rounds: Vec<String> = record
                .round_scores()
                .iter()
                .map(|score| score.to_string())
                .collect();
            format!("{} [{}]", record.name(), rounds.join(" | "))
        })
        .collect::<Vec<_>>()
        .join("  vs  ");
    let marker = if state.is_complete() { " (finalizada)" } else { "" };
    println!("Round {}{}: {}", state.current_round(), marker, line);
}

fn print_stats(state: &BattleState, catalog: &ScoringCatalog) {
    let stats = StatsAggregator::new(state, catalog);
    for contestant in Contestant::BOTH {
        println!(
            "{}: {} pts",
            state.contestant(contestant).name(),
            stats.total_score(contestant)
        );
    }

    let a = stats.move_frequency(Contestant::A);
    let b = stats.move_frequency(Contestant::B);
    for criterion in catalog.criteria() {
        println!(
            "  {:<12} {}|{}",
            criterion.name,
            a.get(&criterion.name),
            b.get(&criterion.name)
        );
    }
    println!("Vencedor (pontos): {}", stats.overall_winner().label(state));
    println!("Vencedor (rounds): {}", stats.battle_winner().label(state));
}

fn print_report(state: &BattleState, catalog: &ScoringCatalog) -> Result<(), serde_json::Error> {
    let report = BattleReport::build(state, catalog);
    println!("{}", JsonReportExporter::pretty().export(&report)?);
    Ok(())
}

fn print_help(catalog: &ScoringCatalog) {
    println!("\n=== RIMA JUSTA ===");
    println!("Commands:");
    println!("  score <a|b> <criterion>  - Award a criterion to MC A or B");
    println!("  next                     - Close the current round");
    println!("  rename <a|b> <name>      - Rename an MC");
    println!("  stats                    - Show totals and move frequency");
    println!("  report                   - Print the JSON battle report");
    println!("  reset                    - Start a new battle");
    println!("  quit                     - Exit");
    let criteria: Vec<String> = catalog
        .criteria()
        .iter()
        .map(|criterion| format!("{} ({})", criterion.name, criterion.points))
        .collect();
    println!("Criteria: {}\n", criteria.join(", "));
}
