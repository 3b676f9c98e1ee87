use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{InstalledLanguage, Translator};
use crate::error::{Result, RedubError};

/// One model hop of a translation route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub source: String,
    pub target: String,
}

/// Ordered model hops taking text from the job's source to its target
/// language. Empty when both languages are the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRoute {
    hops: Vec<Hop>,
}

impl TranslationRoute {
    pub fn direct(source: &str, target: &str) -> Self {
        Self {
            hops: vec![Hop {
                source: source.to_string(),
                target: target.to_string(),
            }],
        }
    }

    pub fn via(source: &str, pivot: &str, target: &str) -> Self {
        Self {
            hops: vec![
                Hop {
                    source: source.to_string(),
                    target: pivot.to_string(),
                },
                Hop {
                    source: pivot.to_string(),
                    target: target.to_string(),
                },
            ],
        }
    }

    pub fn identity() -> Self {
        Self { hops: Vec::new() }
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Pick a direct pair if installed, else bridge through `pivot`.
    pub fn resolve(
        languages: &[InstalledLanguage],
        source: &str,
        target: &str,
        pivot: Option<&str>,
    ) -> Result<Self> {
        if source == target {
            return Ok(Self::identity());
        }

        let reaches = |from: &str, to: &str| {
            languages
                .iter()
                .any(|l| l.code == from && l.targets.iter().any(|t| t == to))
        };

        if reaches(source, target) {
            return Ok(Self::direct(source, target));
        }

        if let Some(pivot) = pivot.filter(|p| !p.is_empty() && *p != source && *p != target) {
            if reaches(source, pivot) && reaches(pivot, target) {
                debug!("No direct {}->{} model, routing via {}", source, target, pivot);
                return Ok(Self::via(source, pivot, target));
            }
        }

        Err(RedubError::Configuration(format!(
            "No installed translation model for {} -> {}{}",
            source,
            target,
            pivot
                .filter(|p| !p.is_empty())
                .map(|p| format!(" (also tried via {})", p))
                .unwrap_or_default()
        )))
    }

    /// Run `text` through every hop. An empty result at any hop is an error.
    pub async fn translate(&self, translator: &dyn Translator, text: &str) -> Result<String> {
        let mut current = text.to_string();
        for hop in &self.hops {
            current = translator.translate(&current, &hop.source, &hop.target).await?;
            if current.trim().is_empty() {
                return Err(RedubError::Translation(format!(
                    "Empty translation received for {} -> {}",
                    hop.source, hop.target
                )));
            }
        }
        Ok(current)
    }
}

impl std::fmt::Display for TranslationRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.hops.first() {
            None => write!(f, "identity"),
            Some(first) => {
                write!(f, "{}", first.source)?;
                for hop in &self.hops {
                    write!(f, " -> {}", hop.target)?;
                }
                Ok(())
            }
        }
    }
}
