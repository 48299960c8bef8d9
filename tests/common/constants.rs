//! Shared test data

#![allow(dead_code)]

pub const UPLOADER_ID: u32 = 42;
pub const OTHER_UPLOADER_ID: u32 = 7;

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n%test sheet\n";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nthumbnail";

pub const CHOPIN: &str = "Frédéric Chopin";
pub const CHOPIN_SAFE: &str = "frederic-chopin";
pub const CHOPIN_PORTRAIT: &str = "https://assets.openopus.org/portraits/12.jpg";

pub const LISZT: &str = "Franz Liszt";
pub const LISZT_SAFE: &str = "franz-liszt";
