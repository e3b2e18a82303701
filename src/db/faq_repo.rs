use futures::Stream;
use technanas_core::{Faq, FaqCategory};

use super::{live_query, Cache, Change, Table};

pub struct FaqRepository {
    cache: Cache,
}

#[derive(sqlx::FromRow)]
struct FaqRow {
    id: i64,
    question: String,
    answer: String,
    category: String,
    keywords: String,
}

impl From<FaqRow> for Faq {
    fn from(row: FaqRow) -> Self {
        Faq {
            id: row.id,
            question: row.question,
            answer: row.answer,
            category: row.category.parse::<FaqCategory>().unwrap_or_default(),
            keywords: row.keywords,
        }
    }
}

impl FaqRepository {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn insert_all(&self, faqs: &[Faq]) -> Result<(), sqlx::Error> {
        let mut tx = self.cache.pool().begin().await?;
        for faq in faqs {
            sqlx::query(
                "INSERT INTO faqs (question, answer, category, keywords) VALUES (?, ?, ?, ?)",
            )
            .bind(&faq.question)
            .bind(&faq.answer)
            .bind(faq.category.as_str())
            .bind(&faq.keywords)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.cache.publish(Table::Faqs, Change::Inserted);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Faq>, sqlx::Error> {
        let rows: Vec<FaqRow> = sqlx::query_as("SELECT * FROM faqs ORDER BY id ASC")
            .fetch_all(self.cache.pool())
            .await?;
        Ok(rows.into_iter().map(Faq::from).collect())
    }

    /// Case-insensitive match against question, answer or keywords.
    pub async fn search(&self, term: &str) -> Result<Vec<Faq>, sqlx::Error> {
        let pattern = format!("%{}%", term.trim());
        let rows: Vec<FaqRow> = sqlx::query_as(
            r#"
            SELECT * FROM faqs
            WHERE question LIKE ?1 OR answer LIKE ?1 OR keywords LIKE ?1
            ORDER BY id ASC
            "#,
        )
        .bind(pattern)
        .fetch_all(self.cache.pool())
        .await?;
        Ok(rows.into_iter().map(Faq::from).collect())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM faqs")
            .fetch_one(self.cache.pool())
            .await?;
        Ok(count)
    }

    pub fn watch_all(&self) -> impl Stream<Item = Result<Vec<Faq>, sqlx::Error>> {
        let cache = self.cache.clone();
        live_query(self.cache.changes().subscribe(Table::Faqs), move || {
            let repo = FaqRepository::new(cache.clone());
            async move { repo.list().await }
        })
    }
}
