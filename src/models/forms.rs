use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

static EG_NATIONAL_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:1[0125]\d{8}|2\d{8}|3\d{7}|[4-9]\d{7,8})$").unwrap());

const REQUIRED: &str = "This field is required.";
const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 5;

/// Field name -> error messages, in the shape returned to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Replaces any messages already recorded for `field`
    pub fn set(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), vec![message.into()]);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fields: {}", self.fields().join(", "))
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form = FormErrors::default();
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                form.add(field, message);
            }
        }
        form
    }
}

/// Phone number region used to validate and format shipping numbers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhoneRegion {
    #[default]
    Egypt,
}

impl PhoneRegion {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "EG" => Some(PhoneRegion::Egypt),
            _ => None,
        }
    }

    fn country_calling_code(self) -> &'static str {
        match self {
            PhoneRegion::Egypt => "20",
        }
    }

    fn is_valid_national_number(self, digits: &str) -> bool {
        match self {
            PhoneRegion::Egypt => EG_NATIONAL_NUMBER_RE.is_match(digits),
        }
    }

    /// Parses a local or international number and returns it in E.164,
    /// or `None` when it is not a valid number for the region.
    pub fn to_e164(self, raw: &str) -> Option<String> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect();
        let cc = self.country_calling_code();

        let national = if let Some(rest) = cleaned.strip_prefix('+') {
            rest.strip_prefix(cc)?
        } else if let Some(rest) = cleaned.strip_prefix("00") {
            rest.strip_prefix(cc)?
        } else if let Some(rest) = cleaned.strip_prefix('0') {
            rest
        } else {
            cleaned.as_str()
        };

        if !national.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if self.is_valid_national_number(national) {
            Some(format!("+{}{}", cc, national))
        } else {
            None
        }
    }
}

/// Checkout shipping details as submitted by the customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ShippingForm {
    #[serde(default)]
    #[validate(length(max = 50, message = "Ensure this value has at most 50 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "Ensure this value has at most 50 characters."))]
    pub last_name: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Ensure this value has at most 20 characters."))]
    pub postal_code: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Shipping form after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidShipping {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub city_id: Option<Uuid>,
    pub address: String,
    pub postal_code: String,
    /// E.164
    pub phone_number: String,
}

impl ShippingForm {
    fn trimmed(&self) -> ShippingForm {
        ShippingForm {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            city_id: self
                .city_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            address: self.address.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
        }
    }
}

/// Field-level validation of the shipping form. City existence is checked
/// by the caller against the store.
pub fn validate_shipping_form(
    form: &ShippingForm,
    region: PhoneRegion,
) -> Result<ValidShipping, FormErrors> {
    let form = form.trimmed();
    let mut errors = match form.validate() {
        Ok(()) => FormErrors::default(),
        Err(e) => FormErrors::from(e),
    };

    for (field, value) in [
        ("first_name", &form.first_name),
        ("last_name", &form.last_name),
        ("email", &form.email),
        ("address", &form.address),
        ("postal_code", &form.postal_code),
    ] {
        if value.is_empty() {
            errors.set(field, REQUIRED);
        }
    }

    let city_id = match form.city_id.as_deref() {
        None => None,
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add(
                    "city_id",
                    "Select a valid choice. That choice is not one of the available choices.",
                );
                None
            }
        },
    };

    let phone_number = if form.phone_number.is_empty() {
        errors.add("phone_number", REQUIRED);
        None
    } else {
        let formatted = region.to_e164(&form.phone_number);
        if formatted.is_none() {
            errors.add(
                "phone_number",
                "Enter a valid phone number (e.g. 010 12345678) or a number with an international call prefix.",
            );
        }
        formatted
    };

    errors.into_result()?;

    Ok(ValidShipping {
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        city_id,
        address: form.address,
        postal_code: form.postal_code,
        phone_number: phone_number.unwrap_or_default(),
    })
}

/// Product review as submitted, by a signed-in or anonymous customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReviewForm {
    #[serde(default)]
    #[validate(length(max = 50, message = "Ensure this value has at most 50 characters."))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    /// Raw form value; parsed by `validate_review_form`
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub review: String,
}

/// Review form after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReview {
    pub name: Option<String>,
    pub email: Option<String>,
    pub rating: i32,
    pub review: String,
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn validate_review_form(form: &ReviewForm) -> Result<ValidReview, FormErrors> {
    let normalized = ReviewForm {
        name: blank_to_none(&form.name),
        email: blank_to_none(&form.email),
        rating: blank_to_none(&form.rating),
        review: form.review.trim().to_string(),
    };

    let mut errors = match normalized.validate() {
        Ok(()) => FormErrors::default(),
        Err(e) => FormErrors::from(e),
    };
    let rating = match normalized.rating.as_deref().map(str::parse::<i32>) {
        None => {
            errors.set("rating", REQUIRED);
            None
        }
        Some(Ok(rating)) if (MIN_RATING..=MAX_RATING).contains(&rating) => Some(rating),
        Some(Ok(_)) => {
            errors.set("rating", "Rating must be between 1 and 5.");
            None
        }
        Some(Err(_)) => {
            errors.set("rating", "Enter a whole number.");
            None
        }
    };
    if normalized.review.is_empty() {
        errors.set("review", REQUIRED);
    }
    errors.into_result()?;

    Ok(ValidReview {
        name: normalized.name,
        email: normalized.email,
        rating: rating.unwrap_or_default(),
        review: normalized.review,
    })
}
