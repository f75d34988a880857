pub mod roller;

pub use roller::Roller;
