//! Codec for the `roles` column of `guild_info`.
//!
//! Role lists are stored as a JSON array of strings. Decoding is fail-closed:
//! anything that is not a JSON array of strings yields an empty list, and
//! duplicate names are dropped keeping the first occurrence.

/// Serialize a role list for storage.
pub fn encode_roles(roles: &[String]) -> String {
    // Serializing a slice of strings cannot fail; fall back to an empty array anyway.
    serde_json::to_string(roles).unwrap_or_else(|_| String::from("[]"))
}

/// Deserialize a stored role list.
///
/// Returns an empty list (and logs a warning) when the stored text is corrupt.
pub fn decode_roles(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(roles) => dedup_roles(roles),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding malformed stored role list");
            Vec::new()
        }
    }
}

/// Remove duplicate role names, keeping the first occurrence of each.
pub fn dedup_roles(roles: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(roles.len());
    for role in roles {
        if !out.contains(&role) {
            out.push(role);
        }
    }
    out
}
