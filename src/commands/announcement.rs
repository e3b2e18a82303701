use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use futures::StreamExt;
use std::time::Duration;
use technanas_core::models::format_date;
use technanas_core::{Announcement, AnnouncementType, IdentityContext};

use super::{confirm, report_refresh, truncate, OutputFormat};
use technanas::session::{Session, SessionError};
use technanas::sync::AnnouncementSync;

#[derive(Args)]
pub struct AnnouncementCommand {
    #[command(subcommand)]
    pub command: AnnouncementSubcommand,
}

#[derive(Subcommand)]
pub enum AnnouncementSubcommand {
    /// Refresh and list all announcements, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one cached announcement
    Show {
        /// Announcement ID
        id: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Publish a new announcement
    Create {
        /// Title
        title: String,

        /// Type: general, price, training, promotion or event
        #[arg(long = "type", default_value = "general")]
        kind: AnnouncementType,

        /// One-line summary
        #[arg(long)]
        short: Option<String>,

        /// Full text
        #[arg(long)]
        full: Option<String>,

        /// Link for more information
        #[arg(long)]
        url: Option<String>,

        /// Publication date (YYYY-MM-DD), defaults to now
        #[arg(long)]
        date: Option<String>,
    },

    /// Edit the cached copy of an announcement
    Update {
        /// Announcement ID
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long = "type")]
        kind: Option<AnnouncementType>,

        #[arg(long)]
        short: Option<String>,

        #[arg(long)]
        full: Option<String>,

        #[arg(long)]
        url: Option<String>,
    },

    /// Remove the cached copy of an announcement
    Delete {
        /// Announcement ID
        id: i64,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// List the announcements you published
    Mine {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the announcement list whenever it changes
    Watch {
        /// Seconds between remote refreshes
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
}

impl AnnouncementCommand {
    pub async fn run(
        &self,
        sync: &AnnouncementSync,
        session: &Session,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AnnouncementSubcommand::List { format } => {
                report_refresh(&sync.refresh_all().await?);
                let announcements = sync.list_cached().await?;
                print_list(&announcements, format)
            }

            AnnouncementSubcommand::Show { id, format } => {
                let announcement = sync
                    .get(*id)
                    .await?
                    .ok_or_else(|| format!("Announcement not found: {}", id))?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&announcement)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", announcement);
                        if let Some(owner) = sync.find_owner_email(&announcement).await {
                            println!("Posted by: {}", owner);
                        }
                    }
                }
                Ok(())
            }

            AnnouncementSubcommand::Create {
                title,
                kind,
                short,
                full,
                url,
                date,
            } => {
                let owner = session.current_email().ok_or(SessionError::NotLoggedIn)?;
                if title.trim().is_empty() {
                    return Err("Announcement title cannot be empty".into());
                }

                let published_at = match date {
                    Some(date) => parse_date_millis(date)?,
                    None => Utc::now().timestamp_millis(),
                };

                let mut announcement = Announcement::new(title.trim(), *kind, published_at);
                if let Some(short) = short {
                    announcement = announcement.with_short_description(short);
                }
                if let Some(full) = full {
                    announcement = announcement.with_full_description(full);
                }
                if let Some(url) = url {
                    announcement = announcement.with_external_url(url);
                }

                let id = sync.create(&announcement, &owner).await?;
                announcement.id = id;
                println!("Published announcement:");
                println!("{}", announcement);
                Ok(())
            }

            AnnouncementSubcommand::Update {
                id,
                title,
                kind,
                short,
                full,
                url,
            } => {
                if title.is_none()
                    && kind.is_none()
                    && short.is_none()
                    && full.is_none()
                    && url.is_none()
                {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut announcement = sync
                    .get(*id)
                    .await?
                    .ok_or_else(|| format!("Announcement not found: {}", id))?;

                if let Some(title) = title {
                    announcement.title = title.trim().to_string();
                }
                if let Some(kind) = kind {
                    announcement.kind = *kind;
                }
                if let Some(short) = short {
                    announcement.short_description = short.clone();
                }
                if let Some(full) = full {
                    announcement.full_description = full.clone();
                }
                if let Some(url) = url {
                    announcement.external_url = Some(url.clone());
                }

                sync.update(&announcement).await?;
                println!("Updated announcement (this device only):");
                println!("{}", announcement);
                Ok(())
            }

            AnnouncementSubcommand::Delete { id, force } => {
                let announcement = sync
                    .get(*id)
                    .await?
                    .ok_or_else(|| format!("Announcement not found: {}", id))?;

                if !force && !confirm(&format!("Delete announcement '{}'?", announcement.title))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                sync.delete(&announcement).await?;
                println!("Deleted announcement (this device only): {}", announcement.title);
                Ok(())
            }

            AnnouncementSubcommand::Mine { format } => {
                let owner = session.current_email().ok_or(SessionError::NotLoggedIn)?;
                let announcements = sync.list_for_owner(&owner).await?;
                print_list(&announcements, format)
            }

            AnnouncementSubcommand::Watch { interval } => {
                let stream = sync.watch_all();
                futures::pin_mut!(stream);

                let mut ticker = tokio::time::interval(Duration::from_secs(*interval));
                println!("Watching announcements (Ctrl-C to stop)");

                loop {
                    tokio::select! {
                        item = stream.next() => match item {
                            Some(announcements) => {
                                println!();
                                print_list(&announcements?, &OutputFormat::Text)?;
                            }
                            None => break,
                        },
                        _ = ticker.tick() => {
                            report_refresh(&sync.refresh_all().await?);
                        }
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Midnight UTC of a `YYYY-MM-DD` date, in epoch milliseconds.
fn parse_date_millis(date: &str) -> Result<i64, String> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD.", date))?;
    parsed
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| format!("Invalid date '{}'", date))
}

fn print_list(
    announcements: &[Announcement],
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if announcements.is_empty() {
        println!("No announcements found");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(announcements)?);
        }
        OutputFormat::Text => {
            println!("{:<6}  {:<11}  {:<9}  TITLE", "ID", "DATE", "TYPE");
            println!("{}", "-".repeat(80));
            for announcement in announcements {
                println!(
                    "{:<6}  {:<11}  {:<9}  {}",
                    announcement.id,
                    format_date(announcement.published_at),
                    announcement.kind.as_str(),
                    truncate(&announcement.title, 48)
                );
            }
            println!("\nTotal: {} announcement(s)", announcements.len());
        }
    }
    Ok(())
}
