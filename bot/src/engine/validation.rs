/// Maximum length of a chat message the platform accepts.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Maximum length of an embed description (release body).
pub const MAX_RELEASE_BODY_LENGTH: usize = 4096;

/// Maximum modlist id length.
pub const MAX_MODLIST_ID_LENGTH: usize = 64;

/// Validate a modlist machine id. Must be 1-64 chars of letters, digits, `_`, `-` or `.`.
pub fn validate_modlist_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("Modlist id cannot be empty".into());
    }
    if id.len() > MAX_MODLIST_ID_LENGTH {
        return Err(format!(
            "Modlist id too long (max {} characters)",
            MAX_MODLIST_ID_LENGTH
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(
            "Modlist id can only contain letters, numbers, underscores, hyphens and dots".into(),
        );
    }
    Ok(())
}

/// Validate the free text of a release or revision.
pub fn validate_release_body(body: &str) -> Result<(), String> {
    if body.trim().is_empty() {
        return Err("Release message cannot be empty".into());
    }
    if body.len() > MAX_RELEASE_BODY_LENGTH {
        return Err(format!(
            "Release message too long (max {} characters)",
            MAX_RELEASE_BODY_LENGTH
        ));
    }
    Ok(())
}
