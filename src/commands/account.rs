use clap::{Args, Subcommand};
use technanas_core::validation::{is_valid_name, is_valid_phone};
use technanas_core::{validate_registration, Account, IdentityContext, Role, SubRole};

use super::{report_refresh, truncate, OutputFormat};
use technanas::session::{Session, SessionError};
use technanas::sync::AccountSync;

#[derive(Args)]
pub struct AccountCommand {
    #[command(subcommand)]
    pub command: AccountSubcommand,
}

#[derive(Subcommand)]
pub enum AccountSubcommand {
    /// Register a new account
    Register {
        /// Full name
        #[arg(long)]
        name: String,

        /// Email address (used to sign in)
        #[arg(long)]
        email: String,

        /// Phone number
        #[arg(long)]
        phone: String,

        /// Password
        #[arg(long)]
        password: String,

        /// Password again
        #[arg(long)]
        confirm_password: String,

        /// Role: entrepreneur or buyer
        #[arg(long, default_value = "entrepreneur")]
        role: Role,

        /// Sub-role for entrepreneurs: farmer, wholesaler or retailer
        #[arg(long)]
        sub_role: Option<SubRole>,
    },

    /// Sign in with a cached account
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Edit the signed-in account's profile
    Update {
        /// New full name
        #[arg(long)]
        name: Option<String>,

        /// New phone number
        #[arg(long)]
        phone: Option<String>,

        /// New role
        #[arg(long)]
        role: Option<Role>,

        /// New sub-role
        #[arg(long)]
        sub_role: Option<SubRole>,
    },

    /// List entrepreneurs in the directory
    Entrepreneurs {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl AccountCommand {
    pub async fn run(
        &self,
        sync: &AccountSync,
        session: &mut Session,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AccountSubcommand::Register {
                name,
                email,
                phone,
                password,
                confirm_password,
                role,
                sub_role,
            } => {
                let name = name.trim();
                let email = email.trim();
                let phone = phone.trim();
                validate_registration(name, phone, email, password, confirm_password)?;
                if *role == Role::Admin {
                    return Err("Admin accounts cannot be self-registered".into());
                }

                let mut account = Account::new(name, email, password.as_str())
                    .with_phone(phone)
                    .with_role(*role);
                if let Some(sub_role) = sub_role {
                    account = account.with_sub_role(*sub_role);
                }

                let registered = sync.register(&account).await?;
                println!("Registered account:");
                println!("{}", registered);
                Ok(())
            }

            AccountSubcommand::Login { email, password } => {
                let email = email.trim();
                sync.login(email, password).await?;

                // Pick up profile edits made on other devices.
                report_refresh(&sync.refresh_one(email).await?);
                let account = sync
                    .get_by_email(email)
                    .await?
                    .ok_or("Account disappeared from the cache")?;

                session.save_login(&account)?;
                println!("Logged in as {} ({})", account.full_name, account.email);
                Ok(())
            }

            AccountSubcommand::Logout => {
                if !session.is_logged_in() {
                    println!("Not logged in.");
                    return Ok(());
                }
                session.logout()?;
                println!("Logged out.");
                Ok(())
            }

            AccountSubcommand::Show { format } => {
                let email = session.current_email().ok_or(SessionError::NotLoggedIn)?;
                report_refresh(&sync.refresh_one(&email).await?);

                let account = sync
                    .get_by_email(&email)
                    .await?
                    .ok_or_else(|| format!("Account not found: {}", email))?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&account)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", account);
                    }
                }
                Ok(())
            }

            AccountSubcommand::Update {
                name,
                phone,
                role,
                sub_role,
            } => {
                if name.is_none() && phone.is_none() && role.is_none() && sub_role.is_none() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let email = session.current_email().ok_or(SessionError::NotLoggedIn)?;
                let mut account = sync
                    .get_by_email(&email)
                    .await?
                    .ok_or_else(|| format!("Account not found: {}", email))?;

                if let Some(new_name) = name {
                    if !is_valid_name(new_name) {
                        return Err("Name must be at least 3 characters".into());
                    }
                    account.full_name = new_name.trim().to_string();
                }
                if let Some(new_phone) = phone {
                    if !is_valid_phone(new_phone) {
                        return Err("Phone number must be 8 to 15 characters".into());
                    }
                    account.phone = new_phone.trim().to_string();
                }
                if let Some(new_role) = role {
                    if *new_role == Role::Admin && !account.is_admin {
                        return Err("Only administrators can hold the admin role".into());
                    }
                    account.role = new_role.to_string();
                    if *new_role != Role::Entrepreneur {
                        account.sub_role = None;
                    }
                }
                if let Some(new_sub_role) = sub_role {
                    account.sub_role = Some(new_sub_role.to_string());
                }

                let updated = sync.update_profile(&account).await?;
                session.update_name(&updated.full_name)?;
                session.update_role(&updated.role, updated.sub_role.as_deref())?;

                println!("Updated profile:");
                println!("{}", updated);
                Ok(())
            }

            AccountSubcommand::Entrepreneurs { format } => {
                report_refresh(&sync.refresh_scoped(Role::Entrepreneur.as_str()).await?);
                let entrepreneurs = sync.list_entrepreneurs().await?;

                if entrepreneurs.is_empty() {
                    println!("No entrepreneurs found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entrepreneurs)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<30}  {:<30}  {:<12}  TYPE", "NAME", "EMAIL", "PHONE");
                        println!("{}", "-".repeat(90));
                        for account in &entrepreneurs {
                            println!(
                                "{:<30}  {:<30}  {:<12}  {}",
                                truncate(&account.full_name, 30),
                                truncate(&account.email, 30),
                                account.phone,
                                account.sub_role.as_deref().unwrap_or("-")
                            );
                        }
                        println!("\nTotal: {} entrepreneur(s)", entrepreneurs.len());
                    }
                }
                Ok(())
            }
        }
    }
}
