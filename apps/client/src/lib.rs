pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod device;
pub mod migration;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;

use chrono::{Local, Utc};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, DeviceAction, LegacyAction};
use crate::commands::study::ReviewInput;
use crate::config::Config;
use crate::state::AppState;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let state = AppState::open(&config)?;

    // Every start, before anything reads the store.
    let migrated = commands::data::migrate(&state)?;
    if migrated.migrated > 0 {
        tracing::info!(migrated = migrated.migrated, "legacy records imported on startup");
    }

    dispatch(&state, cli.command, cli.json).await
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

async fn dispatch(state: &AppState, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Queue { kind, limit } => {
            let queue = commands::study::get_study_queue(state, kind, limit, Utc::now())?;
            emit(json, &queue, |queue| {
                println!("{} due, {} new ({})", queue.due_cards.len(), queue.new_cards.len(), kind.as_str());
                for card in &queue.due_cards {
                    println!(
                        "  {:>6}  {}  {}",
                        card.id,
                        card.lemma,
                        card.reading.as_deref().unwrap_or("")
                    );
                }
            })
        }
        Command::Review {
            card_id,
            rating,
            quality,
        } => {
            let input = match (rating, quality) {
                (Some(rating), _) => ReviewInput::Rating(rating),
                (None, Some(quality)) => ReviewInput::Quality(quality),
                (None, None) => anyhow::bail!("a rating or --quality is required"),
            };
            let submitted = commands::study::submit_review(state, card_id, input, Utc::now())?;
            emit(json, &submitted.response, |response| {
                println!(
                    "card {card_id}: {:?}, next review {}{}",
                    response.new_state.status,
                    response.next_due,
                    if response.mastered { " (mastered)" } else { "" }
                );
            })?;
            // Let the detached push finish before the process exits.
            if let Some(handle) = submitted.cloud_push {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background cloud push aborted");
                }
            }
            Ok(())
        }
        Command::Sync => {
            let report = commands::sync::start_sync(state).await?;
            emit(json, &report, |report| {
                println!(
                    "merged {} cards ({} from cloud, {} kept local); {}",
                    report.merged, report.taken_remote + report.remote_only, report.kept_local, report.message
                );
            })
        }
        Command::Device { action } => match action {
            DeviceAction::Show => {
                let status = commands::sync::get_device_status(state).await?;
                emit(json, &status, |status| {
                    println!("{}", status.device_id);
                    if !status.cloud_configured {
                        println!("cloud sync disabled (set TANGO_CLOUD_URL)");
                    }
                })
            }
            DeviceAction::Adopt { token } => {
                let (device, report) = commands::sync::adopt_device(state, &token).await?;
                emit(json, &report, |report| {
                    println!("now using device id {device}");
                    if let Some(report) = report {
                        println!("synced {} cards: {}", report.merged, report.message);
                    }
                })
            }
        },
        Command::Stats { days } => {
            let stats = commands::stats::get_study_stats(state, days as usize, Utc::now(), &Local)?;
            emit(json, &stats, |stats| {
                let o = &stats.overview;
                println!(
                    "{} cards: {} learned ({}%), {} mastered, {} due now",
                    o.total_cards, o.learned, o.learning_progress, o.mastered, o.due_now
                );
                println!(
                    "streak: {} days (longest {})",
                    stats.streak.current_streak, stats.streak.longest_streak
                );
                for day in &stats.daily {
                    println!("  {}  {:>4} reviews  {:>5.1}%", day.date, day.total_reviews, day.accuracy);
                }
            })
        }
        Command::Migrate => {
            let report = commands::data::migrate(state)?;
            emit(json, &report, |report| {
                println!("migrated {}, skipped {}", report.migrated, report.skipped);
            })
        }
        Command::Legacy {
            action: LegacyAction::Purge,
        } => {
            commands::data::purge_legacy(state)?;
            emit(json, &serde_json::json!({ "purged": true }), |_| {
                println!("legacy store deleted");
            })
        }
        Command::Reset => {
            let cleared = commands::data::reset(state)?;
            emit(json, &serde_json::json!({ "cleared": cleared }), |_| {
                println!("cleared {cleared} scheduling records and the review log");
            })
        }
    }
}
