#![deny(warnings)]

//! Headless CLI: run a seeded insurance campaign for N turns and print
//! per-turn KPI lines.

use anyhow::Result;
use chrono::NaiveDate;
use persistence::MemoryStore;
use rust_decimal::Decimal;
use sim_core::*;
use sim_runtime::Session;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    turns: u32,
    seed: u64,
    speed: GameSpeed,
    difficulty: Difficulty,
    json: bool,
    version: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        turns: 8,
        seed: 42,
        speed: GameSpeed::Medium,
        difficulty: Difficulty::Normal,
        json: false,
        version: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--turns" => {
                if let Some(n) = it.next().and_then(|s| s.parse().ok()) {
                    args.turns = n;
                }
            }
            "--seed" => {
                if let Some(n) = it.next().and_then(|s| s.parse().ok()) {
                    args.seed = n;
                }
            }
            "--speed" => {
                args.speed = match it.next().as_deref() {
                    Some("fast") => GameSpeed::Fast,
                    Some("slow") => GameSpeed::Slow,
                    _ => GameSpeed::Medium,
                };
            }
            "--difficulty" => {
                args.difficulty = match it.next().as_deref() {
                    Some("easy") => Difficulty::Easy,
                    Some("hard") => Difficulty::Hard,
                    _ => Difficulty::Normal,
                };
            }
            "--json" => args.json = true,
            "--version" => args.version = true,
            _ => {}
        }
    }
    args
}

/// A showcase decision set for the opening turn.
fn opening_decisions() -> Vec<Decision> {
    vec![
        Decision {
            id: "dec:1:1".to_string(),
            lever: "hr.hiring".to_string(),
            value: 12.0,
            product: None,
        },
        Decision {
            id: "dec:1:2".to_string(),
            lever: "it.data_program".to_string(),
            value: 8.0,
            product: None,
        },
        Decision {
            id: "dec:1:3".to_string(),
            lever: "finance.asset_allocation".to_string(),
            value: 0.03,
            product: None,
        },
    ]
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    if args.version {
        println!("assur-tycoon {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_SHA"));
        return Ok(());
    }
    info!(turns = args.turns, seed = args.seed, "starting campaign");

    let mut session = Session::new(
        "cli",
        args.seed,
        args.speed,
        args.difficulty,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        vec![
            ProductLine::new("auto", "Auto"),
            ProductLine::new("home", "Home"),
        ],
        Decimal::new(2_000_000, 0),
        EngineConfig::default(),
        MemoryStore::new(),
    );

    for turn in 1..=args.turns {
        session.advance_phase()?; // Events
        session.advance_phase()?; // Decisions
        if turn == 1 {
            for decision in opening_decisions() {
                session.submit_decision(decision)?;
            }
        }
        let feedback = session.resolve()?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&feedback)?);
        } else {
            let state = session.state();
            println!(
                "T{:02} {} | IAC {:>5.1} | IPQO {:>5.1} | IERH {:>5.1} | IRF {:>5.1} | IMD {:>5.1} | IS {:>5.1} | IPP {:>5.1} | result ${} | budget ${} | alerts {}",
                turn,
                state.date,
                state.indices.get(IndexId::CommercialAttractiveness),
                state.indices.get(IndexId::OperationalQuality),
                state.indices.get(IndexId::HrBalance),
                state.indices.get(IndexId::FinancialResilience),
                state.indices.get(IndexId::DataMaturity),
                state.indices.get(IndexId::Sincerity),
                state.indices.get(IndexId::PnlPerformance),
                state.pnl.result.round_dp(0),
                state.budget.round_dp(0),
                feedback.alerts.len(),
            );
            for variation in &feedback.major_variations {
                let top = variation
                    .drivers
                    .first()
                    .map(|d| format!("{} ({:.0}%)", d.label, d.share_pct))
                    .unwrap_or_else(|| "no significant driver".to_string());
                println!(
                    "    {} {:+.1} -> {:.1} | top driver: {}",
                    variation.index, variation.delta, variation.current, top
                );
            }
        }
        if turn < args.turns {
            session.next_turn()?;
        }
    }

    println!(
        "Campaign done | turns: {} | stored: {} | pending effects: {} | applied effects: {}",
        args.turns,
        session.store().len(),
        session.state().queue.pending.len(),
        session.state().queue.applied.len(),
    );
    Ok(())
}
