//! Request coalescing in front of the result cache (spec C3, C5).

pub mod singleflight;

pub use singleflight::SingleFlight;
