mod encoder;

pub use encoder::*;
