//! AMF0 value model and codec

pub mod amf0;
pub mod value;

pub use amf0::Amf0Codec;
pub use value::{Amf0Object, Amf0Value};
