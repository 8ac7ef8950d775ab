//! Hardware Capabilities
//!
//! Capability traits the acquisition code is written against. The sampler needs exactly
//! one: a device whose whole memory image can be read and written through a programmer.
//!
//! # Design Philosophy
//!
//! Each capability trait:
//! - Is async (uses #[async_trait])
//! - Is thread-safe (requires Send + Sync)
//! - Returns the crate `AppResult`
//! - Focuses on ONE thing
//!
//! # Example
//!
//! ```rust,ignore
//! async fn blank_check<D: MemoryDevice + ?Sized>(device: &D) -> AppResult<bool> {
//!     let image = device.read().await?;
//!     Ok(classify(&image).erased)
//! }
//! ```

use crate::error::AppResult;
use async_trait::async_trait;

/// Capability: Whole-image memory access
///
/// Devices that expose their full contents as a byte buffer (EPROMs behind a
/// universal programmer, simulated parts in tests).
///
/// # Contract
/// - `read` returns the full memory image; its length is the device size
/// - `write` programs the full image; `verify` asks the programmer to read back
/// - Failures are external tool errors and are fatal for the caller: no retry
/// - Calls are blocking from the caller's point of view and carry no timeout of
///   their own
#[async_trait]
pub trait MemoryDevice: Send + Sync {
    /// Device identifier as understood by the programmer (e.g. `M27C256B@DIP28`)
    fn name(&self) -> &str;

    /// Programmer identity recorded in run headers
    fn programmer(&self) -> &str;

    /// Read the full memory image
    async fn read(&self) -> AppResult<Vec<u8>>;

    /// Program the full memory image
    ///
    /// # Arguments
    /// * `image` - Bytes to program, normally exactly the device size
    /// * `verify` - Read back and compare after programming
    async fn write(&self, image: &[u8], verify: bool) -> AppResult<()>;
}
