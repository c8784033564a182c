//! Shared domain enumerations aligned with the content store's wire values.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    #[default]
    Text,
    Textarea,
    Image,
    Video,
    Gallery,
    Testimonial,
    Feature,
    CallToAction,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "TEXT",
            ContentType::Textarea => "TEXTAREA",
            ContentType::Image => "IMAGE",
            ContentType::Video => "VIDEO",
            ContentType::Gallery => "GALLERY",
            ContentType::Testimonial => "TESTIMONIAL",
            ContentType::Feature => "FEATURE",
            ContentType::CallToAction => "CALL_TO_ACTION",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ContentType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "TEXT" => Ok(ContentType::Text),
            "TEXTAREA" => Ok(ContentType::Textarea),
            "IMAGE" => Ok(ContentType::Image),
            "VIDEO" => Ok(ContentType::Video),
            "GALLERY" => Ok(ContentType::Gallery),
            "TESTIMONIAL" => Ok(ContentType::Testimonial),
            "FEATURE" => Ok(ContentType::Feature),
            "CALL_TO_ACTION" => Ok(ContentType::CallToAction),
            _ => Err(()),
        }
    }
}

/// Non-content domains assembled by the aggregation cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Vessels,
    Packages,
    Itineraries,
    Posts,
    Faqs,
}

impl Domain {
    /// Every domain, in the order the aggregation cache fetches them.
    pub const ALL: [Domain; 5] = [
        Domain::Vessels,
        Domain::Packages,
        Domain::Itineraries,
        Domain::Posts,
        Domain::Faqs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Vessels => "vessels",
            Domain::Packages => "packages",
            Domain::Itineraries => "itineraries",
            Domain::Posts => "posts",
            Domain::Faqs => "faqs",
        }
    }

    /// Heading used when the index is rendered as plain text.
    pub fn heading(self) -> &'static str {
        match self {
            Domain::Vessels => "Fleet",
            Domain::Packages => "Packages",
            Domain::Itineraries => "Itineraries",
            Domain::Posts => "Posts",
            Domain::Faqs => "Frequently asked questions",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Domain {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "vessels" => Ok(Domain::Vessels),
            "packages" => Ok(Domain::Packages),
            "itineraries" => Ok(Domain::Itineraries),
            "posts" => Ok(Domain::Posts),
            "faqs" => Ok(Domain::Faqs),
            _ => Err(()),
        }
    }
}
