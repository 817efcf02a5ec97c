//! Log masking for contact values
//!
//! Raw emails and phone numbers never reach the logs; every log site that
//! touches a contact value routes it through these helpers first.

/// Masks an email for logging: first two characters, then `***@domain`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(2).collect();
            format!("{}***@{}", visible, domain)
        }
        None => "***".to_string(),
    }
}

/// Masks a phone for logging: country prefix, asterisks, last two digits
pub fn mask_phone(phone: &str) -> String {
    if phone.len() < 6 {
        return "****".to_string();
    }
    let prefix: String = phone.chars().take(3).collect();
    let suffix: String = phone.chars().skip(phone.chars().count() - 2).collect();
    format!("{}****{}", prefix, suffix)
}

/// Masks a list of emails element-wise
pub fn mask_emails<'a, I: IntoIterator<Item = &'a String>>(emails: I) -> Vec<String> {
    emails.into_iter().map(|e| mask_email(e)).collect()
}

/// Masks a list of phones element-wise
pub fn mask_phones<'a, I: IntoIterator<Item = &'a String>>(phones: I) -> Vec<String> {
    phones.into_iter().map(|p| mask_phone(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("info@example.se"), "in***@example.se");
        assert_eq!(mask_email("kontakt@acme.nu"), "ko***@acme.nu");
    }

    #[test]
    fn test_mask_short_localpart() {
        assert_eq!(mask_email("a@acme.se"), "a***@acme.se");
    }

    #[test]
    fn test_mask_not_an_email() {
        assert_eq!(mask_email("garbage"), "***");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+46812345678"), "+46****78");
        assert_eq!(mask_phone("+4684002227"), "+46****27");
    }

    #[test]
    fn test_mask_short_phone() {
        assert_eq!(mask_phone("+461"), "****");
    }

    #[test]
    fn test_mask_lists() {
        let emails = vec!["info@a.se".to_string(), "hej@b.se".to_string()];
        assert_eq!(mask_emails(&emails), vec!["in***@a.se", "he***@b.se"]);

        let phones = vec!["+46812345678".to_string()];
        assert_eq!(mask_phones(&phones), vec!["+46****78"]);
    }
}
