use clap::{Args, Subcommand};
use technanas_core::Farm;

use super::{confirm, report_refresh, truncate, OutputFormat};
use technanas::session::{Session, SessionUser};
use technanas::sync::FarmSync;

#[derive(Args)]
pub struct FarmCommand {
    #[command(subcommand)]
    pub command: FarmSubcommand,
}

#[derive(Subcommand)]
pub enum FarmSubcommand {
    /// Refresh and list your farms
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one of your farms
    Show {
        /// Farm ID
        id: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a farm or business location
    Add {
        /// Farm name
        name: String,

        /// Size, e.g. "5 acres"
        #[arg(long)]
        size: Option<String>,

        /// State
        #[arg(long)]
        state: Option<String>,

        /// Street address
        #[arg(long)]
        address: Option<String>,

        /// Latitude (requires --longitude)
        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,

        /// Longitude (requires --latitude)
        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
    },

    /// Edit one of your farms
    Update {
        /// Farm ID
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        size: Option<String>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,

        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
    },

    /// Delete one of your farms
    Delete {
        /// Farm ID
        id: i64,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl FarmCommand {
    pub async fn run(
        &self,
        sync: &FarmSync,
        session: &Session,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let user = session.require_user()?;

        match &self.command {
            FarmSubcommand::List { format } => {
                report_refresh(&sync.refresh_for_owner(user.user_id, &user.email).await?);
                let farms = sync.list_for_user(user.user_id).await?;

                if farms.is_empty() {
                    println!("No farms found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&farms)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<6}  {:<30}  {:<16}  SIZE", "ID", "NAME", "STATE");
                        println!("{}", "-".repeat(70));
                        for farm in &farms {
                            println!(
                                "{:<6}  {:<30}  {:<16}  {}",
                                farm.id,
                                truncate(&farm.name, 30),
                                truncate(farm.state.as_deref().unwrap_or("-"), 16),
                                farm.size.as_deref().unwrap_or("-")
                            );
                        }
                        println!("\nTotal: {} farm(s)", farms.len());
                    }
                }
                Ok(())
            }

            FarmSubcommand::Show { id, format } => {
                let farm = find_own_farm(sync, user, *id).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&farm)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", farm);
                    }
                }
                Ok(())
            }

            FarmSubcommand::Add {
                name,
                size,
                state,
                address,
                latitude,
                longitude,
            } => {
                if name.trim().is_empty() {
                    return Err("Farm name cannot be empty".into());
                }

                let mut farm = Farm::new(user.user_id, name.trim());
                farm.size = size.clone();
                farm.state = state.clone();
                farm.address = address.clone();
                if let (Some(lat), Some(lng)) = (latitude, longitude) {
                    farm = farm.with_location(*lat, *lng);
                }

                let created = sync.create(&farm, &user.email).await?;
                println!("Added farm:");
                println!("{}", created);
                Ok(())
            }

            FarmSubcommand::Update {
                id,
                name,
                size,
                state,
                address,
                latitude,
                longitude,
            } => {
                let has_updates = name.is_some()
                    || size.is_some()
                    || state.is_some()
                    || address.is_some()
                    || latitude.is_some();
                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut farm = find_own_farm(sync, user, *id).await?;

                if let Some(new_name) = name {
                    if new_name.trim().is_empty() {
                        return Err("Farm name cannot be empty".into());
                    }
                    farm.name = new_name.trim().to_string();
                }
                if size.is_some() {
                    farm.size = size.clone();
                }
                if state.is_some() {
                    farm.state = state.clone();
                }
                if address.is_some() {
                    farm.address = address.clone();
                }
                if let (Some(lat), Some(lng)) = (latitude, longitude) {
                    farm.latitude = Some(*lat);
                    farm.longitude = Some(*lng);
                }

                let updated = sync.update(&farm, &user.email).await?;
                println!("Updated farm:");
                println!("{}", updated);
                Ok(())
            }

            FarmSubcommand::Delete { id, force } => {
                let farm = find_own_farm(sync, user, *id).await?;

                if !force && !confirm(&format!("Delete farm '{}'?", farm.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                sync.delete(&farm).await?;
                println!("Deleted farm: {}", farm.name);
                Ok(())
            }
        }
    }
}

/// Looks up a cached farm that belongs to the signed-in user.
async fn find_own_farm(
    sync: &FarmSync,
    user: &SessionUser,
    id: i64,
) -> Result<Farm, Box<dyn std::error::Error>> {
    match sync.get(id).await? {
        Some(farm) if farm.user_id == user.user_id => Ok(farm),
        _ => Err(format!("Farm not found: {}", id).into()),
    }
}
