//! Keys exported to derived artifacts and their hardcoded defaults.
//!
//! The same table feeds the mobile configuration and the constants module,
//! so both targets always agree on what an absent key falls back to.

/// One allow-listed content key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Key in the content store.
    pub key: &'static str,
    /// Property name inside its group of the mobile configuration.
    pub property: &'static str,
    /// Identifier in the constants module.
    pub constant: &'static str,
    pub default: &'static str,
}

/// A named group of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGroup {
    pub name: &'static str,
    pub fields: &'static [Field],
    /// Whether the group is part of the mobile configuration.
    pub mobile: bool,
}

const fn field(
    key: &'static str,
    property: &'static str,
    constant: &'static str,
    default: &'static str,
) -> Field {
    Field {
        key,
        property,
        constant,
        default,
    }
}

pub const DEVELOPER: FieldGroup = FieldGroup {
    name: "developer",
    mobile: true,
    fields: &[
        field("developer_name", "name", "DEVELOPER_NAME", "Tidecast Studio"),
        field("developer_email", "email", "DEVELOPER_EMAIL", "dev@bluehorizonvoyages.com"),
        field("developer_website", "website", "DEVELOPER_WEBSITE", "https://bluehorizonvoyages.com"),
    ],
};

pub const ITINERARY: FieldGroup = FieldGroup {
    name: "itinerary",
    mobile: true,
    fields: &[
        field("itinerary_title", "title", "ITINERARY_TITLE", "Our Itineraries"),
        field(
            "itinerary_subtitle",
            "subtitle",
            "ITINERARY_SUBTITLE",
            "Island-hopping routes through the archipelago",
        ),
        field(
            "itinerary_description",
            "description",
            "ITINERARY_DESCRIPTION",
            "Day-by-day voyages between marine parks, quiet anchorages and village landings.",
        ),
    ],
};

pub const COMPANY: FieldGroup = FieldGroup {
    name: "company",
    mobile: true,
    fields: &[
        field("company_name", "name", "COMPANY_NAME", "Blue Horizon Voyages"),
        field("company_short_name", "shortName", "COMPANY_SHORT_NAME", "Blue Horizon"),
        field("company_tagline", "tagline", "COMPANY_TAGLINE", "Sail beyond the ordinary"),
        field(
            "company_description",
            "description",
            "COMPANY_DESCRIPTION",
            "Liveaboard cruises and island tours aboard traditional wooden sailing ships.",
        ),
        field("company_website", "website", "COMPANY_WEBSITE", "https://bluehorizonvoyages.com"),
        field("contact_phone", "phone", "CONTACT_PHONE", "+62 361 000 000"),
        field("contact_email", "email", "CONTACT_EMAIL", "hello@bluehorizonvoyages.com"),
        field("contact_address", "address", "CONTACT_ADDRESS", "Labuan Bajo, Flores, Indonesia"),
        field("contact_whatsapp", "whatsapp", "CONTACT_WHATSAPP", "+62 812 0000 0000"),
    ],
};

pub const FLEET: FieldGroup = FieldGroup {
    name: "fleet",
    mobile: false,
    fields: &[
        field("fleet_title", "title", "FLEET_TITLE", "Our Fleet"),
        field("fleet_subtitle", "subtitle", "FLEET_SUBTITLE", "Handcrafted phinisi schooners"),
        field(
            "fleet_description",
            "description",
            "FLEET_DESCRIPTION",
            "Every vessel is crewed by local sailors and fitted for multi-day voyages.",
        ),
    ],
};

pub const PACKAGES: FieldGroup = FieldGroup {
    name: "packages",
    mobile: false,
    fields: &[
        field("packages_title", "title", "PACKAGES_TITLE", "Tour Packages"),
        field("packages_subtitle", "subtitle", "PACKAGES_SUBTITLE", "Private and shared trips"),
        field(
            "packages_description",
            "description",
            "PACKAGES_DESCRIPTION",
            "From overnight escapes to week-long expeditions, all meals included.",
        ),
    ],
};

pub const MEDIA: FieldGroup = FieldGroup {
    name: "media",
    mobile: false,
    fields: &[
        field("global_logo", "logo", "GLOBAL_LOGO", "/images/logo.png"),
        field("hero_image", "heroImage", "HERO_IMAGE", "/images/hero.jpg"),
        field("hero_video", "heroVideo", "HERO_VIDEO", "/videos/hero.mp4"),
        field("hero_video_title", "heroVideoTitle", "HERO_VIDEO_TITLE", "Welcome aboard"),
    ],
};

/// Every group, in emission order.
pub const GROUPS: [FieldGroup; 6] = [DEVELOPER, ITINERARY, COMPANY, FLEET, PACKAGES, MEDIA];

/// All allow-listed store keys, in emission order.
pub fn keys() -> Vec<&'static str> {
    GROUPS
        .iter()
        .flat_map(|group| group.fields.iter().map(|field| field.key))
        .collect()
}

/// The field definition for `key`, if allow-listed.
pub fn lookup(key: &str) -> Option<&'static Field> {
    GROUPS
        .iter()
        .flat_map(|group| group.fields.iter())
        .find(|field| field.key == key)
}

/// Hardcoded default for an allow-listed key.
pub fn default_for(key: &str) -> Option<&'static str> {
    lookup(key).map(|field| field.default)
}
