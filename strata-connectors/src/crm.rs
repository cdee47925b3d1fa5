//! Customer-profile record.

use serde::{Deserialize, Serialize};

use crate::DomainRecord;

const MAX_TAGS: usize = 64;
const MAX_ATTRIBUTES: usize = 128;

/// Canonical customer profile, the distilled account/contact view the CRM
/// systems of record agree on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Engagement segment (e.g. "vip", "bulk"), the usual warm-tier query
    /// dimension.
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub marketing_opt_in: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form source-system attributes, carried through unmodified.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl DomainRecord for CustomerProfile {
    const KIND: &'static str = "profile";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".to_owned());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_owned());
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(format!("email {email:?} is not an address"));
            }
        }
        if self.tags.len() > MAX_TAGS {
            return Err(format!("more than {MAX_TAGS} tags"));
        }
        if self.attributes.len() > MAX_ATTRIBUTES {
            return Err(format!("more than {MAX_ATTRIBUTES} attributes"));
        }
        Ok(())
    }
}
