pub mod cadet;
pub mod event;
pub mod session;

/// The default events created for an empty catalog.
pub const DEFAULT_EVENTS: [(&str, &str); 3] = [
    ("llab", "2025-09-17"),
    ("class", "2025-09-17"),
    ("2025 FTX", "2025-10-01"),
];
