use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FaqCategory {
    #[default]
    General,
    Account,
    Price,
}

impl FaqCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaqCategory::General => "GENERAL",
            FaqCategory::Account => "ACCOUNT",
            FaqCategory::Price => "PRICE",
        }
    }
}

impl fmt::Display for FaqCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaqCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GENERAL" => Ok(FaqCategory::General),
            "ACCOUNT" => Ok(FaqCategory::Account),
            "PRICE" => Ok(FaqCategory::Price),
            _ => Err(format!("Invalid FAQ category '{}'", s)),
        }
    }
}

/// A frequently asked question, cached locally for the FAQ assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Faq {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: FaqCategory,
    /// Space separated search keywords.
    pub keywords: String,
}

impl Faq {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        category: FaqCategory,
        keywords: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            question: question.into(),
            answer: answer.into(),
            category,
            keywords: keywords.into(),
        }
    }
}

impl fmt::Display for Faq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Q: {}", self.question)?;
        write!(f, "A: {}", self.answer)
    }
}
