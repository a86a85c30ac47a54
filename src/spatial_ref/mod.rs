mod srs;

pub use srs::SpatialRef;
