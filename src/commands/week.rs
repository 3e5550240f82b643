use chrono::Utc;
use clap::{Args, Subcommand};

use crate::store::WeekStore;
use crate::week::WeekId;

use super::AppContext;

#[derive(Args)]
pub struct WeekCommand {
    #[command(subcommand)]
    pub command: WeekSubcommand,
}

#[derive(Subcommand)]
pub enum WeekSubcommand {
    /// Show the current calendar week
    Current,
    /// Show a week's status and snapshot summary
    Show {
        /// Week identifier, e.g. 2026-W04 (defaults to the current week)
        id: Option<String>,
    },
    /// Lock a week and capture its delivery snapshot
    Lock {
        /// Week identifier, e.g. 2026-W04 (defaults to the current week)
        id: Option<String>,
    },
    /// Return a locked week to draft
    Unlock {
        /// Week identifier, e.g. 2026-W04
        id: String,
    },
    /// Show the week after the given one
    Next {
        /// Week identifier, e.g. 2026-W04 (defaults to the current week)
        id: Option<String>,
    },
    /// Show the week before the given one
    Prev {
        /// Week identifier, e.g. 2026-W04 (defaults to the current week)
        id: Option<String>,
    },
}

fn parse_week_id(id: &Option<String>) -> Result<WeekId, Box<dyn std::error::Error>> {
    match id {
        Some(raw) => Ok(raw
            .parse()
            .map_err(|_| format!("Invalid week id '{}'. Expected YYYY-Www, e.g. 2026-W04", raw))?),
        None => Ok(WeekId::from_date(Utc::now().date_naive())),
    }
}

impl WeekCommand {
    pub async fn run(&self, ctx: &mut AppContext) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            WeekSubcommand::Current => {
                let id = WeekId::from_date(Utc::now().date_naive());
                println!("{}  ({})", id, id.format_range());
                Ok(())
            }
            WeekSubcommand::Show { id } => {
                let week_id = parse_week_id(id)?;
                let store = WeekStore::from_records(ctx.data.weeks.values().cloned());
                match store.get(&week_id) {
                    Some(record) => {
                        println!("Week:      {}  ({})", week_id, week_id.format_range());
                        println!("Status:    {:?}", record.status);
                        if let Some(locked_at) = record.locked_at {
                            println!("Locked at: {}", locked_at.format("%Y-%m-%d %H:%M UTC"));
                        }
                        if let Some(snapshot) = &record.snapshot {
                            println!(
                                "Snapshot:  {} client menus, {} delivery stops",
                                snapshot.menu.len(),
                                snapshot.stops.len()
                            );
                        }
                        if store.is_read_only(&week_id) {
                            println!("This week is in the past and read-only.");
                        }
                    }
                    None => {
                        println!("Week:      {}  ({})", week_id, week_id.format_range());
                        println!("Status:    Draft (not yet created)");
                    }
                }
                Ok(())
            }
            WeekSubcommand::Lock { id } => {
                let week_id = parse_week_id(id)?;
                let mut store = WeekStore::from_records(ctx.data.weeks.values().cloned());
                let record = store.lock(&week_id, &ctx.data.menu_items, &ctx.data.clients);
                let snapshot_note = match &record.snapshot {
                    Some(snapshot) => format!(
                        "{} client menus, {} delivery stops",
                        snapshot.menu.len(),
                        snapshot.stops.len()
                    ),
                    None => "no snapshot".to_string(),
                };
                println!("Locked {}: {}", week_id, snapshot_note);
                ctx.data.weeks = store
                    .records()
                    .map(|r| (r.id.to_string(), r.clone()))
                    .collect();
                ctx.save().await?;
                Ok(())
            }
            WeekSubcommand::Unlock { id } => {
                let week_id: WeekId = id
                    .parse()
                    .map_err(|_| format!("Invalid week id '{}'. Expected YYYY-Www, e.g. 2026-W04", id))?;
                let mut store = WeekStore::from_records(ctx.data.weeks.values().cloned());
                store.unlock(&week_id)?;
                println!("Unlocked {}. The week is editable again.", week_id);
                ctx.data.weeks = store
                    .records()
                    .map(|r| (r.id.to_string(), r.clone()))
                    .collect();
                ctx.save().await?;
                Ok(())
            }
            WeekSubcommand::Next { id } => {
                let week_id = parse_week_id(id)?;
                let next = week_id.next();
                println!("{}  ({})", next, next.format_range());
                Ok(())
            }
            WeekSubcommand::Prev { id } => {
                let week_id = parse_week_id(id)?;
                let prev = week_id.prev();
                println!("{}  ({})", prev, prev.format_range());
                Ok(())
            }
        }
    }
}
