//! Core ticket data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::media::{ImageRef, MediaKind};

// ============================================================================
// Lucky Number
// ============================================================================

/// Smallest lucky number that can be drawn.
pub const LUCKY_NUMBER_MIN: u32 = 100_000;

/// Largest lucky number that can be drawn.
pub const LUCKY_NUMBER_MAX: u32 = 999_999;

/// A six-digit decimal string in `[100000, 999999]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LuckyNumber(String);

impl LuckyNumber {
    /// Build from a numeric value, `None` when out of range.
    pub fn from_value(value: u32) -> Option<Self> {
        (LUCKY_NUMBER_MIN..=LUCKY_NUMBER_MAX)
            .contains(&value)
            .then(|| Self(value.to_string()))
    }

    /// Build from any value, clamped into range.
    pub fn clamped(value: u32) -> Self {
        Self(value.clamp(LUCKY_NUMBER_MIN, LUCKY_NUMBER_MAX).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decimal digits, most significant first.
    pub fn digits(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b - b'0')
    }
}

impl TryFrom<String> for LuckyNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("lucky number must be six digits, got '{}'", value));
        }
        if value.starts_with('0') {
            return Err(format!("lucky number must not start with 0, got '{}'", value));
        }
        Ok(Self(value))
    }
}

impl From<LuckyNumber> for String {
    fn from(number: LuckyNumber) -> Self {
        number.0
    }
}

impl fmt::Display for LuckyNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Templates and Messages
// ============================================================================

/// RGB colors used to paint a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplatePalette {
    pub background: [u8; 3],
    pub border: [u8; 3],
    pub ink: [u8; 3],
}

/// Visual theme of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketTemplate {
    Golden,
    Sakura,
    FortuneCat,
    Starlight,
}

impl TicketTemplate {
    /// Every template, in draw order.
    pub const ALL: [TicketTemplate; 4] = [
        TicketTemplate::Golden,
        TicketTemplate::Sakura,
        TicketTemplate::FortuneCat,
        TicketTemplate::Starlight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketTemplate::Golden => "golden",
            TicketTemplate::Sakura => "sakura",
            TicketTemplate::FortuneCat => "fortune_cat",
            TicketTemplate::Starlight => "starlight",
        }
    }

    /// Image file sent to the composition service as the target.
    pub fn file_name(&self) -> String {
        format!("{}.png", self.as_str())
    }

    pub fn palette(&self) -> TemplatePalette {
        match self {
            TicketTemplate::Golden => TemplatePalette {
                background: [250, 214, 92],
                border: [176, 120, 20],
                ink: [92, 52, 4],
            },
            TicketTemplate::Sakura => TemplatePalette {
                background: [252, 222, 232],
                border: [214, 96, 140],
                ink: [120, 28, 72],
            },
            TicketTemplate::FortuneCat => TemplatePalette {
                background: [255, 246, 236],
                border: [200, 40, 40],
                ink: [60, 20, 20],
            },
            TicketTemplate::Starlight => TemplatePalette {
                background: [28, 34, 78],
                border: [236, 200, 90],
                ink: [248, 240, 210],
            },
        }
    }
}

impl fmt::Display for TicketTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fortune printed on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketMessage {
    GreatFortune,
    WishesComeTrue,
    LuckFollows,
    GoodNewsSoon,
    BrightDays,
    JackpotEnergy,
}

impl TicketMessage {
    pub const ALL: [TicketMessage; 6] = [
        TicketMessage::GreatFortune,
        TicketMessage::WishesComeTrue,
        TicketMessage::LuckFollows,
        TicketMessage::GoodNewsSoon,
        TicketMessage::BrightDays,
        TicketMessage::JackpotEnergy,
    ];

    /// Display string.
    pub fn text(&self) -> &'static str {
        match self {
            TicketMessage::GreatFortune => "Great fortune is coming your way!",
            TicketMessage::WishesComeTrue => "Today your wishes come true.",
            TicketMessage::LuckFollows => "Luck follows you wherever you go.",
            TicketMessage::GoodNewsSoon => "Good news will arrive soon.",
            TicketMessage::BrightDays => "Bright days are ahead of you.",
            TicketMessage::JackpotEnergy => "You are radiating jackpot energy!",
        }
    }

    /// Reverse of [`text`](Self::text).
    pub fn from_text(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.text() == text)
    }
}

// ============================================================================
// Ticket Record
// ============================================================================

/// A finished ticket. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Time-ordered unique id (UUID v7).
    pub id: String,
    pub lucky_number: LuckyNumber,
    /// The rasterized ticket image.
    pub image_ref: ImageRef,
    pub created_at: DateTime<Utc>,
    /// Display text of the fortune.
    pub message: String,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TicketTemplate>,
}

impl TicketRecord {
    pub fn new(
        lucky_number: LuckyNumber,
        image_ref: ImageRef,
        message: TicketMessage,
        kind: MediaKind,
        template: TicketTemplate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            lucky_number,
            image_ref,
            created_at,
            message: message.text().to_string(),
            kind,
            template: Some(template),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lucky_number_bounds() {
        assert!(LuckyNumber::from_value(99_999).is_none());
        assert!(LuckyNumber::from_value(1_000_000).is_none());
        assert_eq!(LuckyNumber::from_value(100_000).unwrap().as_str(), "100000");
        assert_eq!(LuckyNumber::from_value(999_999).unwrap().as_str(), "999999");
        assert_eq!(LuckyNumber::clamped(7).as_str(), "100000");
    }

    #[test]
    fn test_lucky_number_rejects_bad_strings() {
        assert!(LuckyNumber::try_from("12345".to_string()).is_err());
        assert!(LuckyNumber::try_from("012345".to_string()).is_err());
        assert!(LuckyNumber::try_from("12a456".to_string()).is_err());
        assert!(serde_json::from_str::<LuckyNumber>("\"1234567\"").is_err());
    }

    #[test]
    fn test_lucky_number_digits() {
        let number = LuckyNumber::from_value(407_193).unwrap();
        assert_eq!(number.digits().collect::<Vec<_>>(), vec![4, 0, 7, 1, 9, 3]);
    }

    #[test]
    fn test_message_text_lookup() {
        for message in TicketMessage::ALL {
            assert_eq!(TicketMessage::from_text(message.text()), Some(message));
        }
        assert_eq!(TicketMessage::from_text("nope"), None);
    }

    #[test]
    fn test_record_ids_are_unique() {
        let make = || {
            TicketRecord::new(
                LuckyNumber::from_value(123_456).unwrap(),
                ImageRef::local("/tmp/t.png"),
                TicketMessage::BrightDays,
                MediaKind::Photo,
                TicketTemplate::Golden,
                Utc::now(),
            )
        };
        let a = make();
        let b = make();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_record_serialization() {
        let record = TicketRecord::new(
            LuckyNumber::from_value(654_321).unwrap(),
            ImageRef::local("/data/tickets/a.png"),
            TicketMessage::GreatFortune,
            MediaKind::Video,
            TicketTemplate::FortuneCat,
            Utc::now(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["lucky_number"], "654321");
        assert_eq!(json["kind"], "video");
        assert_eq!(json["template"], "fortune_cat");
        assert_eq!(json["message"], "Great fortune is coming your way!");

        let parsed: TicketRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
