//! Prompt rendering and guess matching.
//!
//! A single strategy configured along two axes: the prompt's language and
//! how the model's free-text guess is matched against the category list.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::AiError;

/// Language of the prompt sent to the model.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptLocale {
    #[default]
    En,
    It,
}

impl FromStr for PromptLocale {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(PromptLocale::En),
            "it" => Ok(PromptLocale::It),
            other => Err(AiError::InvalidConfig(format!(
                "unsupported prompt locale '{other}' (expected en or it)"
            ))),
        }
    }
}

/// How a model guess is matched against the category names.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// The cleaned guess must equal a category name.
    #[default]
    Exact,
    /// The first category name (in list order) contained in the guess,
    /// ignoring case.
    SubstringContains,
}

impl FromStr for MatchMode {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "substring-contains" => Ok(MatchMode::SubstringContains),
            other => Err(AiError::InvalidConfig(format!(
                "unsupported match mode '{other}' (expected exact or substring-contains)"
            ))),
        }
    }
}

impl MatchMode {
    /// Resolve a model guess to a category name from `categories`.
    pub fn find<'a>(&self, categories: &'a [String], guess: &str) -> Option<&'a String> {
        match self {
            MatchMode::Exact => categories.iter().find(|c| c.as_str() == guess),
            MatchMode::SubstringContains => {
                let guess = guess.to_lowercase();
                categories
                    .iter()
                    .filter(|c| !c.is_empty())
                    .find(|c| guess.contains(&c.to_lowercase()))
            }
        }
    }
}

/// Prompt template plus matching strategy.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    pub locale: PromptLocale,
    pub match_mode: MatchMode,
}

impl PromptTemplate {
    pub fn new(locale: PromptLocale, match_mode: MatchMode) -> Self {
        Self { locale, match_mode }
    }

    pub fn render(&self, categories: &[String], destination_name: &str, description: &str) -> String {
        let categories = categories.join(", ");
        match self.locale {
            PromptLocale::En => format!(
                "Given i want to categorize transactions on my bank account into this categories: {categories}\n\
In which category would a transaction from \"{destination_name}\" with the subject \"{description}\" fall into?\n\
Just output the name of the category. Does not have to be a complete sentence."
            ),
            PromptLocale::It => format!(
                "Voglio classificare le transazioni del mio conto bancario in queste categorie: {categories}\n\
In quale categoria rientra una transazione verso \"{destination_name}\" con causale \"{description}\"?\n\
Rispondi solo con il nome della categoria, non serve una frase completa."
            ),
        }
    }

    /// Strip line breaks and surrounding whitespace from raw model output.
    pub fn clean_guess(raw: &str) -> String {
        raw.replace(['\r', '\n'], "").trim().to_string()
    }

    /// Match raw model output against `categories` using the configured mode.
    pub fn match_guess<'a>(&self, categories: &'a [String], raw: &str) -> Option<&'a String> {
        self.match_mode.find(categories, &Self::clean_guess(raw))
    }
}
