//! Contact details: email and French phone numbers

use serde::{Deserialize, Serialize};

use crate::validation::FieldErrors;

/// Check the shape of an email address: one `@`, a non-empty local part
/// and a dotted domain whose TLD has at least two characters.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return false;
    }
    labels.last().map(|tld| tld.len() >= 2).unwrap_or(false)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A French phone number in national form (`0612345678`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse user input. Accepts spaces, dots, dashes and the `+33` /
    /// `0033` international prefixes.
    pub fn parse(input: &str) -> Option<Self> {
        let mut digits = String::with_capacity(input.len());
        for (i, c) in input.trim().chars().enumerate() {
            match c {
                '0'..='9' => digits.push(c),
                '+' if i == 0 => digits.push('+'),
                ' ' | '.' | '-' | '(' | ')' => {}
                _ => return None,
            }
        }

        let national = if let Some(rest) = digits.strip_prefix("+33") {
            format!("0{}", rest.trim_start_matches('0'))
        } else if let Some(rest) = digits.strip_prefix("0033") {
            format!("0{}", rest.trim_start_matches('0'))
        } else {
            digits
        };

        let bytes = national.as_bytes();
        if bytes.len() != 10 || bytes[0] != b'0' || !(b'1'..=b'9').contains(&bytes[1]) {
            return None;
        }
        Some(Self(national))
    }

    /// Mobile numbers (06 / 07) are the only ones that can receive SMS
    pub fn is_mobile(&self) -> bool {
        self.0.starts_with("06") || self.0.starts_with("07")
    }

    pub fn national(&self) -> &str {
        &self.0
    }

    /// E.164 form for SMS gateways (`+33612345678`)
    pub fn e164(&self) -> String {
        format!("+33{}", &self.0[1..])
    }

    /// Display form with the middle pairs hidden: `06 12 ** ** 78`
    pub fn masked(&self) -> String {
        self.0
            .as_bytes()
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| {
                if i == 2 || i == 3 {
                    "**".to_string()
                } else {
                    String::from_utf8_lossy(pair).into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contact step of the lead forms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub first_name: String,
    pub email: String,
    pub phone_number: String,
}

/// Contact details that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub first_name: String,
    pub email: String,
    pub phone_number: PhoneNumber,
}

impl ContactForm {
    pub fn validate(&self) -> Result<Contact, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            errors.add("firstName", "Le prénom est requis");
        } else if first_name.chars().count() > 80 {
            errors.add("firstName", "Le prénom est trop long");
        }

        if self.email.trim().is_empty() {
            errors.add("email", "L'email est requis");
        } else if !is_valid_email(&self.email) {
            errors.add("email", "Adresse email invalide");
        }

        let phone = if self.phone_number.trim().is_empty() {
            errors.add("phoneNumber", "Le numéro de téléphone est requis");
            None
        } else {
            match PhoneNumber::parse(&self.phone_number) {
                Some(p) if p.is_mobile() => Some(p),
                Some(_) => {
                    errors.add("phoneNumber", "Un numéro de mobile (06 ou 07) est requis");
                    None
                }
                None => {
                    errors.add("phoneNumber", "Numéro de téléphone invalide");
                    None
                }
            }
        };

        match phone {
            Some(phone_number) if errors.is_empty() => Ok(Contact {
                first_name: first_name.to_string(),
                email: normalize_email(&self.email),
                phone_number,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email(" jean.dupont+guide@orange.fr "));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("a b@c.fr"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("a@b..fr"));
    }

    #[test]
    fn test_phone_formats() {
        let expected = Some(PhoneNumber("0612345678".to_string()));
        assert_eq!(PhoneNumber::parse("0612345678"), expected);
        assert_eq!(PhoneNumber::parse("06 12 34 56 78"), expected);
        assert_eq!(PhoneNumber::parse("06.12.34.56.78"), expected);
        assert_eq!(PhoneNumber::parse("+33 6 12 34 56 78"), expected);
        assert_eq!(PhoneNumber::parse("+33 (0)6 12 34 56 78"), expected);
        assert_eq!(PhoneNumber::parse("0033612345678"), expected);

        assert_eq!(PhoneNumber::parse("061234567"), None);
        assert_eq!(PhoneNumber::parse("0012345678"), None);
        assert_eq!(PhoneNumber::parse("06a2345678"), None);
    }

    #[test]
    fn test_masked_display() {
        let phone = PhoneNumber::parse("0612345678").unwrap();
        assert_eq!(phone.masked(), "06 12 ** ** 78");
        assert_eq!(phone.e164(), "+33612345678");
    }

    #[test]
    fn test_landline_is_not_mobile() {
        let phone = PhoneNumber::parse("0556123456").unwrap();
        assert!(!phone.is_mobile());

        let form = ContactForm {
            first_name: "Jean".into(),
            email: "a@b.com".into(),
            phone_number: "0556123456".into(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.contains("phoneNumber"));
    }

    #[test]
    fn test_contact_form_collects_all_errors() {
        let errors = ContactForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
