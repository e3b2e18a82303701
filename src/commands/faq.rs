use clap::{Args, Subcommand};
use technanas_core::Faq;

use super::OutputFormat;
use technanas::db::FaqRepository;

#[derive(Args)]
pub struct FaqCommand {
    #[command(subcommand)]
    pub command: FaqSubcommand,
}

#[derive(Subcommand)]
pub enum FaqSubcommand {
    /// List all frequently asked questions
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find questions mentioning a word
    Search {
        /// Word to look for in questions, answers and keywords
        term: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl FaqCommand {
    pub async fn run(&self, repo: &FaqRepository) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            FaqSubcommand::List { format } => {
                let faqs = repo.list().await?;
                print_faqs(&faqs, format)
            }
            FaqSubcommand::Search { term, format } => {
                if term.trim().is_empty() {
                    return Err("Search term cannot be empty".into());
                }
                let faqs = repo.search(term).await?;
                print_faqs(&faqs, format)
            }
        }
    }
}

fn print_faqs(faqs: &[Faq], format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    if faqs.is_empty() {
        println!("No questions found");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(faqs)?);
        }
        OutputFormat::Text => {
            for (i, faq) in faqs.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("[{}] {}", faq.category, faq);
            }
        }
    }
    Ok(())
}
