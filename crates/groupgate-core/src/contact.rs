//! Contact cards and their vCard 3.0 rendering.

use serde::{Deserialize, Serialize};

/// A contact to be shared with the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCard {
    /// Name shown on the card (`FN`).
    pub display_name: String,
    /// Mobile number (`TEL;TYPE=CELL`).
    pub phone_number: String,
}

impl ContactCard {
    /// Creates a new contact card.
    pub fn new(display_name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            phone_number: phone_number.into(),
        }
    }

    /// Renders the card as a vCard 3.0 text block.
    ///
    /// Lines are separated by `\n`, with no trailing newline.
    pub fn to_vcard(&self) -> String {
        format!(
            "BEGIN:VCARD\nVERSION:3.0\nFN:{}\nTEL;TYPE=CELL:{}\nEND:VCARD",
            escape_text(&self.display_name),
            escape_text(&self.phone_number),
        )
    }
}

/// Escapes a vCard 3.0 text value.
///
/// Backslash, comma and semicolon are backslash-escaped and line breaks become
/// `\n`, so a value can never start a new property line.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vcard_layout() {
        let card = ContactCard::new("Alice", "15551234567");
        insta::assert_snapshot!(card.to_vcard(), @r"
        BEGIN:VCARD
        VERSION:3.0
        FN:Alice
        TEL;TYPE=CELL:15551234567
        END:VCARD
        ");
    }

    #[test]
    fn vcard_contains_exact_fields() {
        let vcard = ContactCard::new("Alice", "15551234567").to_vcard();
        let lines: Vec<&str> = vcard.lines().collect();
        assert!(lines.contains(&"FN:Alice"));
        assert!(lines.contains(&"TEL;TYPE=CELL:15551234567"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("FN:")).count(), 1);
    }

    #[test]
    fn escape_special_characters() {
        assert_eq!(escape_text("Doe, Jane; Jr\\"), "Doe\\, Jane\\; Jr\\\\");
        assert_eq!(escape_text("a\r\nb\nc"), "a\\nb\\nc");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn injected_newline_does_not_add_property() {
        let card = ContactCard::new("Mallory\nTEL:000", "1");
        let vcard = card.to_vcard();
        assert_eq!(vcard.lines().count(), 5);
        assert!(vcard.contains("FN:Mallory\\nTEL:000"));
    }
}
