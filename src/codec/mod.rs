//! Frame-level encoding and decoding over async stream halves.

mod framed;

pub use framed::{FrameReader, FrameWriter};
