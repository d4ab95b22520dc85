//! voxscreen Features
//!
//! Turns recordings into fixed-width acoustic feature vectors.
//!
//! The crate is split along the processing stages:
//! - [`decode`]: container/codec decoding to mono samples (symphonia, ffmpeg fallback)
//! - [`resample`]: sample rate conversion to the 16 kHz analysis rate
//! - [`trim`]: leading/trailing silence removal
//! - [`mfcc`]: the feature extractor producing 13 MFCC means
//! - [`loader`]: the decode -> resample -> trim chain used by the service and trainer

pub mod decode;
pub mod loader;
pub mod mfcc;
pub mod resample;
pub mod trim;

pub use decode::{decode_file, DecodedAudio};
pub use loader::AudioLoader;
pub use mfcc::{Extraction, FeatureExtractor, MfccConfig};
pub use resample::resample;
pub use trim::{trim_silence, TrimConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::loader::AudioLoader;
    pub use crate::mfcc::{Extraction, FeatureExtractor, MfccConfig};
    pub use crate::trim::TrimConfig;
}
