//! Field rules applied to candidate records before any write reaches the store.
//!
//! Checks run in a fixed order (name, age, email) and stop at the first failure.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::contract::model::{AgeInput, UserDraft, UserPatch};

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 254;

/// Minimal `local@domain.tld` shape, anchored at the start only.
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").expect("email pattern compiles"));

/// Letters only: general category L, so letter-numbers and combining marks are out.
static NAME_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}+$").expect("name pattern compiles"));

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,
    #[error("Name must be at least 3 characters")]
    NameTooShort,
    #[error("Name must be less than 50 characters")]
    NameTooLong,
    #[error("Name must be alphabetic")]
    NameNotAlphabetic,
    #[error("Age is required")]
    AgeRequired,
    #[error("Age must be a whole number")]
    AgeNotWhole,
    #[error("Age must fit in a 32-bit signed integer")]
    AgeOutOfRange,
    #[error("Email is required")]
    EmailRequired,
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Email must be less than 254 characters")]
    EmailTooLong,
}

impl ValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        use ValidationError::*;
        match self {
            NameRequired | NameTooShort | NameTooLong | NameNotAlphabetic => "name",
            AgeRequired | AgeNotWhole | AgeOutOfRange => "age",
            EmailRequired | InvalidEmail | EmailTooLong => "email",
        }
    }
}

/// Create input that passed every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidUser {
    pub name: String,
    pub age: i32,
    pub email: String,
}

/// Update input that passed every rule for the fields it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidPatch {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub email: Option<String>,
}

impl ValidPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.email.is_none()
    }
}

pub fn validate_new_user(draft: &UserDraft) -> Result<ValidUser, ValidationError> {
    let name = match draft.name.as_deref() {
        None | Some("") => return Err(ValidationError::NameRequired),
        Some(n) => check_name(n)?,
    };
    let age = match draft.age {
        None => return Err(ValidationError::AgeRequired),
        Some(a) => check_age(a)?,
    };
    let email = match draft.email.as_deref() {
        None | Some("") => return Err(ValidationError::EmailRequired),
        Some(e) => check_email(e)?,
    };
    Ok(ValidUser { name, age, email })
}

/// Absent fields are skipped; a supplied empty string or zero is checked like any value.
pub fn validate_user_patch(patch: &UserPatch) -> Result<ValidPatch, ValidationError> {
    Ok(ValidPatch {
        name: patch.name.as_deref().map(check_name).transpose()?,
        age: patch.age.map(check_age).transpose()?,
        email: patch.email.as_deref().map(check_email).transpose()?,
    })
}

pub fn check_name(name: &str) -> Result<String, ValidationError> {
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(ValidationError::NameTooShort);
    }
    if len > NAME_MAX_CHARS {
        return Err(ValidationError::NameTooLong);
    }
    // Spaces count as non-alphabetic, so "John Smith" is rejected.
    if !NAME_LETTERS.is_match(name) {
        return Err(ValidationError::NameNotAlphabetic);
    }
    Ok(name.to_owned())
}

pub fn check_age(age: AgeInput) -> Result<i32, ValidationError> {
    match age {
        AgeInput::Whole(v) => i32::try_from(v).map_err(|_| ValidationError::AgeOutOfRange),
        AgeInput::Fractional(v) => {
            if !v.is_finite() || v.fract() != 0.0 {
                return Err(ValidationError::AgeNotWhole);
            }
            if v < f64::from(i32::MIN) || v > f64::from(i32::MAX) {
                return Err(ValidationError::AgeOutOfRange);
            }
            Ok(v as i32)
        }
    }
}

pub fn check_email(email: &str) -> Result<String, ValidationError> {
    if !EMAIL_SHAPE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        return Err(ValidationError::EmailTooLong);
    }
    Ok(email.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, age: i64, email: &str) -> UserDraft {
        UserDraft::new(name, age, email)
    }

    #[test]
    fn accepts_minimal_valid_user() {
        let v = validate_new_user(&draft("alice", 30, "a@b.com")).unwrap();
        assert_eq!(
            v,
            ValidUser {
                name: "alice".into(),
                age: 30,
                email: "a@b.com".into()
            }
        );
    }

    #[test]
    fn name_length_bounds() {
        assert_eq!(check_name("ab"), Err(ValidationError::NameTooShort));
        assert!(check_name("abc").is_ok());
        assert!(check_name(&"a".repeat(50)).is_ok());
        assert_eq!(check_name(&"a".repeat(51)), Err(ValidationError::NameTooLong));
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        // 3 chars, 6 bytes
        assert!(check_name("äöü").is_ok());
        assert_eq!(check_name(&"é".repeat(51)), Err(ValidationError::NameTooLong));
    }

    #[test]
    fn name_rejects_non_alphabetic() {
        for bad in ["John Smith", "bob1", "o'neil", "anne-marie", "tab\tbed"] {
            assert_eq!(
                check_name(bad),
                Err(ValidationError::NameNotAlphabetic),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn name_accepts_only_letter_categories() {
        assert!(check_name("Zoë").is_ok());
        assert!(check_name("Łukasz").is_ok());
        assert!(check_name("李小龍").is_ok());
        // Roman numeral twelve is a letter-number (Nl), not a letter.
        assert_eq!(
            check_name("\u{216B}\u{216B}\u{216B}"),
            Err(ValidationError::NameNotAlphabetic)
        );
        // Combining ypogegrammeni is alphabetic but a mark (Mn).
        assert_eq!(
            check_name("ab\u{0345}"),
            Err(ValidationError::NameNotAlphabetic)
        );
        assert_eq!(check_name("abc\n"), Err(ValidationError::NameNotAlphabetic));
    }

    #[test]
    fn patterns_compile() {
        Lazy::force(&EMAIL_SHAPE);
        Lazy::force(&NAME_LETTERS);
    }

    #[test]
    fn missing_fields_report_required_in_order() {
        let mut d = draft("alice", 30, "a@b.com");
        d.name = None;
        d.email = None;
        assert_eq!(validate_new_user(&d), Err(ValidationError::NameRequired));

        let mut d = draft("alice", 30, "a@b.com");
        d.name = Some(String::new());
        assert_eq!(validate_new_user(&d), Err(ValidationError::NameRequired));

        let mut d = draft("alice", 30, "a@b.com");
        d.age = None;
        assert_eq!(validate_new_user(&d), Err(ValidationError::AgeRequired));

        let mut d = draft("alice", 30, "a@b.com");
        d.email = Some(String::new());
        assert_eq!(validate_new_user(&d), Err(ValidationError::EmailRequired));
    }

    #[test]
    fn first_failure_wins() {
        let d = draft("x", 30, "broken");
        assert_eq!(validate_new_user(&d), Err(ValidationError::NameTooShort));
    }

    #[test]
    fn age_zero_is_a_value_on_create() {
        let v = validate_new_user(&draft("alice", 0, "a@b.com")).unwrap();
        assert_eq!(v.age, 0);
    }

    #[test]
    fn age_whole_number_rules() {
        assert_eq!(check_age(AgeInput::Fractional(30.5)), Err(ValidationError::AgeNotWhole));
        assert_eq!(check_age(AgeInput::Fractional(f64::NAN)), Err(ValidationError::AgeNotWhole));
        assert_eq!(check_age(AgeInput::Fractional(30.0)), Ok(30));
        assert_eq!(check_age(AgeInput::Whole(-4)), Ok(-4));
        assert_eq!(
            check_age(AgeInput::Whole(i64::from(i32::MAX) + 1)),
            Err(ValidationError::AgeOutOfRange)
        );
        assert_eq!(
            check_age(AgeInput::Fractional(1e12)),
            Err(ValidationError::AgeOutOfRange)
        );
    }

    #[test]
    fn email_shape() {
        for ok in ["a@b.com", "first.last@sub.example.org", "x@y.z"] {
            assert!(check_email(ok).is_ok(), "{ok}");
        }
        for bad in ["plain", "@b.com", "a@", "a@b", "a@@b.com", "a@.com"] {
            assert_eq!(check_email(bad), Err(ValidationError::InvalidEmail), "{bad}");
        }
    }

    #[test]
    fn email_length_limit() {
        let local = "a".repeat(254 - "@b.com".len());
        let at_limit = format!("{local}@b.com");
        assert_eq!(at_limit.len(), 254);
        assert!(check_email(&at_limit).is_ok());

        let over = format!("a{at_limit}");
        assert_eq!(check_email(&over), Err(ValidationError::EmailTooLong));
    }

    #[test]
    fn patch_skips_absent_fields_only() {
        let only_age = UserPatch {
            age: Some(AgeInput::Whole(0)),
            ..Default::default()
        };
        let v = validate_user_patch(&only_age).unwrap();
        assert_eq!(v.age, Some(0));
        assert!(v.name.is_none() && v.email.is_none());

        let empty_name = UserPatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            validate_user_patch(&empty_name),
            Err(ValidationError::NameTooShort)
        );

        let empty_email = UserPatch {
            email: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            validate_user_patch(&empty_email),
            Err(ValidationError::InvalidEmail)
        );

        assert!(validate_user_patch(&UserPatch::default()).unwrap().is_empty());
    }

    #[test]
    fn errors_know_their_field() {
        assert_eq!(ValidationError::NameNotAlphabetic.field(), "name");
        assert_eq!(ValidationError::AgeNotWhole.field(), "age");
        assert_eq!(ValidationError::EmailTooLong.field(), "email");
    }
}
