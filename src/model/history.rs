use crate::model::algorithm;
use crate::utils::errors::WardenError;

///
/// Reuse detection over the account's bounded window of retired digests.
///
/// Each stored digest carries its own salt, so equal plaintexts never produce
/// equal digest strings - the only way to detect reuse is to run the verify
/// primitive against every entry. This is deliberately slow work; callers run
/// it on the blocking pool.
///
pub fn is_reused(plain_text_password: &str, history: &[String]) -> Result<bool, WardenError> {
    for phc in history {
        if algorithm::verify(plain_text_password, phc)? {
            return Ok(true)
        }
    }

    Ok(false)
}

///
/// Retire a digest into the history, dropping entries from the front until the
/// window fits max_entries. A window of zero disables reuse checking and always
/// yields an empty history.
///
pub fn push_history(mut history: Vec<String>, retired_phc: String, max_entries: usize) -> Vec<String> {
    if max_entries == 0 {
        return Vec::new()
    }

    history.push(retired_phc);

    while history.len() > max_entries {
        history.remove(0);
    }

    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::algorithm::BcryptPolicy;

    fn digest(plain_text_password: &str) -> String {
        // Cheap bcrypt cost - these tests hash a lot.
        BcryptPolicy::default().hash_into_phc(plain_text_password).unwrap()
    }

    #[test]
    fn test_the_window_never_exceeds_its_cap() {
        let mut history = Vec::new();
        for n in 1..=5 {
            history = push_history(history, format!("digest-{}", n), 3);
            assert!(history.len() <= 3);
        }

        // The survivors are the last three pushed, oldest first.
        assert_eq!(history, vec!["digest-3", "digest-4", "digest-5"]);
    }

    #[test]
    fn test_a_zero_cap_disables_the_window() {
        let history = vec!["digest-1".to_string(), "digest-2".to_string()];
        assert!(push_history(history, "digest-3".to_string(), 0).is_empty());
    }

    #[test]
    fn test_a_shrunken_cap_trims_existing_entries() {
        let history = vec!["digest-1".to_string(), "digest-2".to_string(), "digest-3".to_string()];
        assert_eq!(push_history(history, "digest-4".to_string(), 2), vec!["digest-3", "digest-4"]);
    }

    #[test]
    fn test_reuse_is_detected_against_any_entry() -> Result<(), WardenError> {
        let history = vec![digest("Ancient9X!"), digest("OldPass1!")];

        assert!(is_reused("OldPass1!", &history)?);
        assert!(is_reused("Ancient9X!", &history)?);
        Ok(())
    }

    #[test]
    fn test_a_fresh_password_never_reports_reuse() -> Result<(), WardenError> {
        let history = vec![digest("Ancient9X!"), digest("OldPass1!")];

        assert!(!is_reused("NewPass2!", &history)?);
        assert!(!is_reused("", &history)?);
        Ok(())
    }

    #[test]
    fn test_an_empty_window_never_reports_reuse() -> Result<(), WardenError> {
        assert!(!is_reused("Anything1!", &[])?);
        Ok(())
    }
}
