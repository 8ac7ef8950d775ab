//! Hardware Abstractions
//!
//! - `capabilities` - the `MemoryDevice` trait the sampler is written against
//! - `minipro` - driver shelling out to the `minipro` programmer tool
//! - `mock` - simulated UV-erasable device for tests and dry runs

pub mod capabilities;
pub mod minipro;
pub mod mock;

pub use capabilities::MemoryDevice;
pub use minipro::Minipro;
pub use mock::MockEprom;
