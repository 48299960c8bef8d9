mod client;

pub use client::{HttpThumbnailClient, ThumbnailRenderer};
