use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::modlist::Modlist;

/// Accent colour of release embeds.
pub const RELEASE_COLOR: u32 = 0xbb86fc;

pub const FOOTER_TEXT: &str = "WabbaBot";

/// Rich embed announcing a modlist release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub footer: String,
}

impl Notification {
    /// Build the announcement for a release (or a revision of one).
    /// Everything but the body is derived from the modlist's current fields.
    pub fn release(author_name: &str, modlist: &Modlist, body: &str) -> Self {
        Self {
            title: format!(
                "{author_name} just released {} {}!",
                modlist.display_title(),
                modlist.version
            ),
            description: body.to_string(),
            color: RELEASE_COLOR,
            timestamp: Utc::now(),
            image_url: (!modlist.image_link.is_empty()).then(|| modlist.image_link.clone()),
            footer: FOOTER_TEXT.to_string(),
        }
    }
}

/// Plain-text mention of a role.
pub fn role_mention(role_id: &str) -> String {
    format!("<@&{role_id}>")
}
