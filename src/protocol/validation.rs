use super::errors::RoomError;

/// Longest display name we will store or fan out.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 32;

/// Validate a participant display name: non-empty after trimming, bounded
/// length, and limited to characters that render safely on the big screen.
pub fn validate_display_name(name: &str) -> Result<String, RoomError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RoomError::validation("display name must not be empty"));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(RoomError::validation(format!(
            "display name must be at most {MAX_DISPLAY_NAME_LENGTH} characters"
        )));
    }
    let ok = trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '\'');
    if !ok {
        return Err(RoomError::validation(
            "display name may only contain letters, numbers, spaces, - _ '",
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_names() {
        assert_eq!(validate_display_name("Ada Lovelace").unwrap(), "Ada Lovelace");
        assert_eq!(validate_display_name("  padded  ").unwrap(), "padded");
        assert_eq!(validate_display_name("O'Brien").unwrap(), "O'Brien");
        assert_eq!(validate_display_name("player_2").unwrap(), "player_2");
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
    }

    #[test]
    fn rejects_oversized_names() {
        let long = "x".repeat(MAX_DISPLAY_NAME_LENGTH + 1);
        assert!(validate_display_name(&long).is_err());
    }

    #[test]
    fn rejects_markup_characters() {
        assert!(validate_display_name("<script>").is_err());
        assert!(validate_display_name("a\nb").is_err());
    }
}
