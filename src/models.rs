//! Request and response bodies for the reading endpoints.
//!
//! Bodies are parsed in two passes: first as arbitrary JSON (a failure there is "invalid JSON"),
//! then into a loose [`ReadingPayload`] whose fields are all optional. The typed requests are
//! only built once every required field is present, so a handler never sees a partial reading.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ReadingError;

/// Shown in prompts when a card arrives without a name.
pub const UNKNOWN_CARD_NAME: &str = "未知卡牌";

/// Number of cards in a spread.
pub const SPREAD_SIZE: usize = 3;

/// A drawn card as the browser sends it. Extra fields (meanings, image paths...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default = "unknown_card_name")]
    pub name: String,
    #[serde(rename = "isReversed", default)]
    pub is_reversed: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn unknown_card_name() -> String {
    UNKNOWN_CARD_NAME.to_owned()
}

impl Card {
    pub fn orientation(&self) -> Orientation {
        if self.is_reversed {
            Orientation::Reversed
        } else {
            Orientation::Upright
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Upright,
    Reversed,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Upright => f.write_str("正位"),
            Orientation::Reversed => f.write_str("逆位"),
        }
    }
}

/// The union of every field either endpoint reads.
#[derive(Debug, Default, Deserialize)]
pub struct ReadingPayload {
    pub topic: Option<String>,
    pub question: Option<String>,
    pub drawn_cards: Option<Vec<Card>>,
    pub concise_interpretation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingRequest {
    pub topic: String,
    pub question: String,
    pub drawn_cards: [Card; SPREAD_SIZE],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedRequest {
    pub reading: ReadingRequest,
    pub concise_interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConciseResult {
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedResult {
    pub advice: String,
}

/// A request type that can be assembled from a [`ReadingPayload`].
pub trait FromPayload: Sized {
    /// Listed in the 400 response when assembly fails.
    const REQUIRED_FIELDS: &'static str;

    fn from_payload(payload: ReadingPayload) -> Option<Self>;

    fn parse(body: &[u8]) -> Result<Self, ReadingError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| ReadingError::InvalidJson)?;
        ReadingPayload::deserialize(value)
            .ok()
            .and_then(Self::from_payload)
            .ok_or(ReadingError::MissingFields(Self::REQUIRED_FIELDS))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl FromPayload for ReadingRequest {
    const REQUIRED_FIELDS: &'static str = "topic, question, or drawn_cards (must be 3).";

    fn from_payload(payload: ReadingPayload) -> Option<Self> {
        Some(Self {
            topic: non_empty(payload.topic)?,
            question: non_empty(payload.question)?,
            drawn_cards: payload.drawn_cards?.try_into().ok()?,
        })
    }
}

impl FromPayload for DetailedRequest {
    const REQUIRED_FIELDS: &'static str =
        "topic, question, drawn_cards (must be 3), or concise_interpretation.";

    fn from_payload(mut payload: ReadingPayload) -> Option<Self> {
        let concise_interpretation = non_empty(payload.concise_interpretation.take())?;
        Some(Self {
            reading: ReadingRequest::from_payload(payload)?,
            concise_interpretation,
        })
    }
}
