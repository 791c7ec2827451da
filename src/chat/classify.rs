use serde::Serialize;

/// Which agent handles a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Summary,
    SqlAgent,
    MedicalQa,
}

pub const SUMMARY_KEYWORDS: &[&str] = &[
    "summary",
    "summarize",
    "summarise",
    "recap",
    "recapitulate",
    "consultation summary",
    "consultation report",
    "what did we discuss",
    "what we discussed",
    "give me a summary",
    "show summary",
];

pub const SQL_KEYWORDS: &[&str] = &[
    // booking
    "book",
    "booking",
    "reserve",
    "reservation",
    "reservations",
    // cancellation
    "cancel",
    "cancellation",
    "delete",
    "remove",
    // slots and appointments
    "slot",
    "slots",
    "available",
    "availability",
    "my appointments",
    "my bookings",
    "my reservations",
    "appointment",
    "appointments",
    "database",
    "db",
    "slot_id",
    "slot id",
];

/// Sub-keywords on the sql path that trigger slot pre-fetching.
pub const AVAILABILITY_KEYWORDS: &[&str] = &["slot", "available", "show", "see"];

/// A keyword set mapped to an intent. Matching is substring-based on the lower-cased message.
#[derive(Debug, Clone, Copy)]
pub struct RoutingRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
}

impl RoutingRule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// Evaluated in order; the first matching rule wins, otherwise [`Intent::MedicalQa`].
pub const ROUTING_RULES: &[RoutingRule] = &[
    RoutingRule {
        intent: Intent::Summary,
        keywords: SUMMARY_KEYWORDS,
    },
    RoutingRule {
        intent: Intent::SqlAgent,
        keywords: SQL_KEYWORDS,
    },
];

pub fn classify(message: &str) -> Intent {
    let lowered = message.to_lowercase();
    ROUTING_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.intent)
        .unwrap_or(Intent::MedicalQa)
}

/// Whether an sql-routed message asks to see open slots.
pub fn wants_slot_listing(message: &str) -> bool {
    let lowered = message.to_lowercase();
    AVAILABILITY_KEYWORDS.iter().any(|k| lowered.contains(k))
}
