pub mod fits_header;

pub use fits_header::{parse_angle, read_coordinates};
