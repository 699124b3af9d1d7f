/// A raw mail-session record: one row per `MailSessionLog` the Ingestor
/// processed, regardless of whether it turned into a gradeable submission.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Submission {
    pub submission_id: String,
    pub timestamp: i64,
    pub user: String,
    pub recipient: String,
    pub email_count: i32,
    pub in_reply_to: Option<String>,
    pub status: String,
}

/// Clears the low 16 bits of a Message-ID local-part and reformats it as
/// `<hex>0000`, mirroring `hex[:-4] + "0000"` from the reference
/// implementation. Idempotent: masking an already-masked id is a no-op.
pub fn mask_message_id(local_part: &str) -> String {
    if local_part.len() <= 4 {
        return "0000".to_string();
    }
    let (head, _tail) = local_part.split_at(local_part.len() - 4);
    format!("{head}0000")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_low_sixteen_bits() {
        // clearing the low 16 bits (4 hex digits) preserves the string's
        // length, zeroing the trailing 4 characters.
        assert_eq!(mask_message_id("abcdef01"), "abcd0000");
    }

    #[test]
    fn mask_is_idempotent() {
        let once = mask_message_id("abcdef01");
        let twice = mask_message_id(&once);
        assert_eq!(once, twice);
    }
}
