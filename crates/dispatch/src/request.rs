//! Alert request validation and normalization.
//!
//! A raw [`AlertInput`] is validated into an immutable [`AlertRequest`]
//! before any quota reservation or provider call. Requests rejected here
//! produce no side effects and no audit record.

use crate::error::ValidationError;
use crate::provider::phone;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

pub const MAX_RECIPIENTS: usize = 3;
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// One destination targeted by an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub display_name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    pub fn maps_url(&self) -> String {
        format!(
            "https://maps.google.com/?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Raw request fields as handed over by the boundary layer.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertInput {
    /// Optional custom message; the emergency template is synthesized when absent.
    pub message: Option<String>,
    pub recipients: Vec<Recipient>,
    pub location: Option<GeoLocation>,
    /// Submission timestamp; defaults to now when the boundary omits it.
    pub timestamp: Option<OffsetDateTime>,
}

/// A validated alert request. Immutable once built.
#[derive(Debug, Clone)]
pub struct AlertRequest {
    message: String,
    recipients: Vec<Recipient>,
    location: Option<GeoLocation>,
    sent_at: OffsetDateTime,
    units_needed: i32,
}

impl AlertRequest {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn location(&self) -> Option<&GeoLocation> {
        self.location.as_ref()
    }

    pub fn sent_at(&self) -> OffsetDateTime {
        self.sent_at
    }

    /// Pre-check cost: one unit per text part plus one per location part.
    pub fn units_needed(&self) -> i32 {
        self.units_needed
    }
}

impl AlertInput {
    /// Validate and normalize into an [`AlertRequest`].
    pub fn normalize(self) -> Result<AlertRequest, ValidationError> {
        if self.recipients.is_empty() {
            return Err(ValidationError::NoRecipients);
        }
        if self.recipients.len() > MAX_RECIPIENTS {
            return Err(ValidationError::TooManyRecipients(self.recipients.len()));
        }

        let mut recipients = Vec::with_capacity(self.recipients.len());
        for recipient in self.recipients {
            if recipient.display_name.trim().is_empty() {
                return Err(ValidationError::EmptyDisplayName);
            }
            let phone_number = phone::normalize(&recipient.phone_number)
                .ok_or_else(|| ValidationError::InvalidPhoneNumber(recipient.phone_number.clone()))?;
            recipients.push(Recipient {
                display_name: recipient.display_name,
                phone_number,
            });
        }

        if let Some(location) = &self.location {
            if !(-90.0..=90.0).contains(&location.latitude) {
                return Err(ValidationError::InvalidLatitude(location.latitude));
            }
            if !(-180.0..=180.0).contains(&location.longitude) {
                return Err(ValidationError::InvalidLongitude(location.longitude));
            }
        }

        let sent_at = self.timestamp.unwrap_or_else(OffsetDateTime::now_utc);
        let message = match self.message {
            Some(message) => {
                let chars = message.chars().count();
                if chars == 0 {
                    return Err(ValidationError::EmptyMessage);
                }
                if chars > MAX_MESSAGE_CHARS {
                    return Err(ValidationError::MessageTooLong(chars));
                }
                message
            }
            None => emergency_message(self.location.as_ref(), sent_at),
        };

        let parts_per_recipient = if self.location.is_some() { 2 } else { 1 };
        let units_needed = (recipients.len() * parts_per_recipient) as i32;

        Ok(AlertRequest {
            message,
            recipients,
            location: self.location,
            sent_at,
            units_needed,
        })
    }
}

/// Synthesize the default emergency message when the caller sent none.
pub fn emergency_message(location: Option<&GeoLocation>, sent_at: OffsetDateTime) -> String {
    let location_text = match location {
        Some(loc) => format!(
            "📍 Location: {}, {}\n{}",
            loc.latitude,
            loc.longitude,
            loc.maps_url()
        ),
        None => "📍 Location: not available".to_string(),
    };
    let time_fmt = format_description!("[hour]:[minute]:[second] UTC");
    let date_fmt = format_description!("[year]-[month]-[day]");
    format!(
        "🚨 EMERGENCY ALERT 🚨\n\nI need urgent help.\n\n{location_text}\n\n⏰ Time: {}\n📅 Date: {}\n\nThis is an automated emergency message.",
        sent_at.format(&time_fmt).unwrap_or_default(),
        sent_at.format(&date_fmt).unwrap_or_default(),
    )
}

/// Default body for the test-message operation.
pub fn test_message(sent_at: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    format!(
        "🧪 Test message\n\nThis is a test to verify that the emergency messaging service is configured correctly.\n\n⏰ {}",
        sent_at.format(&fmt).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn recipient(phone: &str) -> Recipient {
        Recipient {
            display_name: "Ada".to_string(),
            phone_number: phone.to_string(),
        }
    }

    fn input(recipients: Vec<Recipient>) -> AlertInput {
        AlertInput {
            message: Some("Help".to_string()),
            recipients,
            location: None,
            timestamp: Some(datetime!(2025-06-01 12:00:00 UTC)),
        }
    }

    #[test]
    fn rejects_empty_and_oversized_recipient_lists() {
        assert_eq!(
            input(vec![]).normalize().unwrap_err(),
            ValidationError::NoRecipients
        );
        let four = (0..4).map(|i| recipient(&format!("+3460000000{i}"))).collect();
        assert_eq!(
            input(four).normalize().unwrap_err(),
            ValidationError::TooManyRecipients(4)
        );
    }

    #[test]
    fn normalizes_phone_numbers() {
        let request = input(vec![recipient("+34 600 000 001")]).normalize().unwrap();
        assert_eq!(request.recipients()[0].phone_number, "+34600000001");
    }

    #[test]
    fn rejects_malformed_phone_numbers() {
        assert_eq!(
            input(vec![recipient("600000001")]).normalize().unwrap_err(),
            ValidationError::InvalidPhoneNumber("600000001".to_string())
        );
    }

    #[test]
    fn units_account_for_the_location_part() {
        let mut raw = input(vec![recipient("+34600000001"), recipient("+34600000002")]);
        assert_eq!(raw.clone().normalize().unwrap().units_needed(), 2);

        raw.location = Some(GeoLocation {
            latitude: 37.0,
            longitude: -1.0,
        });
        assert_eq!(raw.normalize().unwrap().units_needed(), 4);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut raw = input(vec![recipient("+34600000001")]);
        raw.location = Some(GeoLocation {
            latitude: 90.5,
            longitude: 0.0,
        });
        assert_eq!(
            raw.clone().normalize().unwrap_err(),
            ValidationError::InvalidLatitude(90.5)
        );
        raw.location = Some(GeoLocation {
            latitude: 0.0,
            longitude: -181.0,
        });
        assert_eq!(
            raw.normalize().unwrap_err(),
            ValidationError::InvalidLongitude(-181.0)
        );
    }

    #[test]
    fn enforces_message_length_bounds() {
        let mut raw = input(vec![recipient("+34600000001")]);
        raw.message = Some(String::new());
        assert_eq!(raw.clone().normalize().unwrap_err(), ValidationError::EmptyMessage);

        raw.message = Some("x".repeat(MAX_MESSAGE_CHARS + 1));
        assert_eq!(
            raw.normalize().unwrap_err(),
            ValidationError::MessageTooLong(MAX_MESSAGE_CHARS + 1)
        );
    }

    #[test]
    fn synthesizes_template_when_message_absent() {
        let mut raw = input(vec![recipient("+34600000001")]);
        raw.message = None;
        raw.location = Some(GeoLocation {
            latitude: 37.0,
            longitude: -1.0,
        });
        let request = raw.normalize().unwrap();
        assert!(request.message().contains("EMERGENCY ALERT"));
        assert!(request.message().contains("https://maps.google.com/?q=37,-1"));
        assert!(request.message().contains("2025-06-01"));
    }

    #[test]
    fn template_without_location_says_unavailable() {
        let mut raw = input(vec![recipient("+34600000001")]);
        raw.message = None;
        let request = raw.normalize().unwrap();
        assert!(request.message().contains("not available"));
    }
}
