mod lookup;
mod registry;

pub use lookup::{
    confident_match, ComposerLookup, ComposerMetadata, OpenOpusClient, OPEN_OPUS_API_BASE,
};
pub use registry::ComposerRegistry;
