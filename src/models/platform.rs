use serde::{Deserialize, Serialize};

use super::Locale;

/// A news outlet, keyed by canonical domain. Created lazily the first time a
/// feed from the domain is ingested; a platform is only created when the site
/// exposes a meta description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub domain: String,
    pub name: String,
    pub description: String,
    pub avatar_url: Option<String>,
    pub website_url: String,
    pub is_verified: bool,
    pub locale: Locale,
}
