//! Startup seeding of the local cache.

use technanas_core::{Faq, FaqCategory};
use tracing::{debug, info};

use crate::db::Cache;
use crate::sync::{AnnouncementSync, RefreshOutcome};

/// The built-in FAQ set used by the FAQ assistant.
pub fn sample_faqs() -> Vec<Faq> {
    vec![
        Faq::new(
            "What is TechNanas?",
            "TechNanas is an app that supports pineapple entrepreneurs with announcements, FAQs and useful links.",
            FaqCategory::General,
            "what is technanas app platform pineapple",
        ),
        Faq::new(
            "How do I register an account?",
            "On the login screen, tap Register, fill in your details and submit. If your email is already used, you must choose another email.",
            FaqCategory::Account,
            "register account create sign up email password",
        ),
        Faq::new(
            "How can I update my farm information?",
            "Open the Profile from the top menu, then tap Edit Profile. You can update your farm name, size and address.",
            FaqCategory::Account,
            "update profile farm information edit",
        ),
        Faq::new(
            "Where can I see pineapple price information?",
            "Go to the Announcements tab and look for items tagged as Price. They contain the latest price information.",
            FaqCategory::Price,
            "pineapple price latest announcements price info",
        ),
    ]
}

/// Refreshes announcements (a stale result is fine) and seeds the FAQ table
/// when it is empty.
pub async fn prepopulate(
    cache: &Cache,
    announcements: &AnnouncementSync,
) -> Result<RefreshOutcome, sqlx::Error> {
    let outcome = announcements.refresh_all().await?;

    let faqs = cache.faqs();
    if faqs.count().await? == 0 {
        let sample = sample_faqs();
        faqs.insert_all(&sample).await?;
        info!(count = sample.len(), "Seeded FAQs");
    } else {
        debug!("FAQs already present");
    }

    Ok(outcome)
}
