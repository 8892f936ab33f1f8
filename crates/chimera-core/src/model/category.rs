use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::CoreError;

/// Content categories a stock Device Service can block.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlockCategory {
    AdsTrackers,
    Gambling,
    SocialMedia,
    Porn,
    Gaming,
    Streaming,
    Facebook,
    Instagram,
    Tiktok,
    Netflix,
    Youtube,
    Ai,
    Safesearch,
}

/// The set of blocklist categories a deployment recognizes.
///
/// Defaults to every [`BlockCategory`]; deployments with extra or fewer
/// categories configure their own list. Order is kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCatalog(IndexSet<String>);

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl CategoryCatalog {
    /// The stock catalog.
    pub fn standard() -> Self {
        BlockCategory::iter().map(|c| c.as_ref().to_owned()).collect()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains(category)
    }

    /// `Ok` if `category` is recognized, `InvalidCategory` otherwise.
    pub fn validate(&self, category: &str) -> Result<(), CoreError> {
        if self.contains(category) {
            Ok(())
        } else {
            Err(CoreError::InvalidCategory {
                category: category.to_owned(),
            })
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CategoryCatalog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
