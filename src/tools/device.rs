//! Direct device operations: zeroing and erase-state checks.

use crate::classifier::{classify, signature, Classification};
use crate::error::AppResult;
use crate::hardware::capabilities::MemoryDevice;
use tracing::info;

/// Probe the device size with one read, then program every bit to 0.
///
/// Returns the device size in bytes.
pub async fn zero<D: MemoryDevice + ?Sized>(device: &D) -> AppResult<usize> {
    info!("Checking programmer...");
    let size = device.read().await?.len();
    info!("Device is {} bytes", size);
    device.write(&vec![0u8; size], true).await?;
    info!(device = device.name(), "Zeroed");
    Ok(size)
}

/// Read once and log the erase state.
pub async fn check<D: MemoryDevice + ?Sized>(device: &D) -> AppResult<Classification> {
    let image = device.read().await?;
    let state = classify(&image);
    info!(
        "is_erased {} w/ erase_percent {:8.3}%, sig {}",
        u8::from(state.erased),
        state.erase_percent,
        signature(&image)
    );
    Ok(state)
}

/// Check back to back, `reads` times or forever when `None`.
///
/// Returns the last classification.
pub async fn check_loop<D: MemoryDevice + ?Sized>(
    device: &D,
    reads: Option<u64>,
) -> AppResult<Option<Classification>> {
    let mut last = None;
    let mut done = 0u64;
    while reads.map_or(true, |limit| done < limit) {
        last = Some(check(device).await?);
        done += 1;
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockEprom;
    use tokio::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn zero_programs_every_byte() {
        let eprom = MockEprom::new("2716", 8)
            .with_contents(vec![0xFF; 8])
            .with_erase_window(Duration::from_secs(60), Duration::from_secs(120));
        assert!(check(&eprom).await.unwrap().erased);

        assert_eq!(zero(&eprom).await.unwrap(), 8);
        assert_eq!(eprom.write_count(), 1);
        let state = check(&eprom).await.unwrap();
        assert!(!state.erased);
        assert_eq!(state.erase_percent, 0.0);
    }

    #[tokio::test]
    async fn bounded_loop_stops() {
        let eprom = MockEprom::scripted("script", vec![vec![0x00], vec![0xFF]]);
        let last = check_loop(&eprom, Some(2)).await.unwrap();
        assert!(last.unwrap().erased);
        assert_eq!(eprom.read_count(), 2);
    }
}
