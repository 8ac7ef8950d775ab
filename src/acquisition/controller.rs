//! Sampling loop controller.
//!
//! Reads the device at a paced interval until the image has read fully erased for a
//! sustained tail of the run, appending one `read` record per tick and a `footer` on
//! completion.
//!
//! # Pacing
//!
//! The frame lock never starts a read sooner than `interval` after the previous read
//! returned. There is no upper bound: a slow programmer simply slows the loop down.
//!
//! # Timeout
//!
//! Checked between ticks, before the read, against elapsed time since the run started.
//! A hung read is not interrupted.

use crate::acquisition::state::{RunStatus, SamplingState};
use crate::classifier::{classify, signature};
use crate::error::{AppResult, EetimeError};
use crate::hardware::capabilities::MemoryDevice;
use crate::runlog::record::{Footer, ReadSample, Record, TimeoutRecord, READ_META_ZLIB};
use crate::runlog::snapshot;
use crate::runlog::writer::RunLogWriter;
use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

/// Sub-interval at which the frame lock polls the clock.
pub const FRAME_LOCK_POLL: Duration = Duration::from_millis(100);

/// Parameters of one sampling run.
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    /// Minimum time between the end of one read and the start of the next
    pub interval: Duration,
    /// Percent of elapsed ticks that must end in an erased streak
    pub erased_threshold: f64,
    /// Seconds after which the run is abandoned
    pub timeout: Option<f64>,
    /// Seconds spent zeroing the device before this run, copied into the footer
    pub prog_time: Option<f64>,
    /// 1-based pass number, for progress output
    pub pass: u32,
    /// Total passes, for progress output
    pub passes: u32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            erased_threshold: 20.0,
            timeout: None,
            prog_time: None,
            pass: 1,
            passes: 1,
        }
    }
}

/// Wait until at least `interval` has passed since `last`, polling at a coarse granularity.
async fn frame_lock(last: Instant, interval: Duration) {
    loop {
        let waited = last.elapsed();
        if waited >= interval {
            return;
        }
        sleep((interval - waited).min(FRAME_LOCK_POLL)).await;
    }
}

/// Run the sampling loop against `device`, appending records to `log`.
///
/// Returns the footer written on completion. On timeout a `timeout` record is appended
/// and [`EetimeError::Timeout`] returned; device errors propagate immediately. Every
/// record is flushed as it is written, so the log is readable on every exit path.
pub async fn wait_erased<D>(
    device: &D,
    log: &mut RunLogWriter,
    settings: &SamplerSettings,
) -> AppResult<Footer>
where
    D: MemoryDevice + ?Sized,
{
    let start = Instant::now();
    let mut last_read_done: Option<Instant> = None;
    let mut state = SamplingState::default();

    let run_time = loop {
        if let Some(done) = last_read_done {
            frame_lock(done, settings.interval).await;
        }

        let elapsed = start.elapsed().as_secs_f64();
        let iter = state.iter + 1;

        if state.check_timeout(elapsed, settings.timeout) == RunStatus::TimedOut {
            log.append(&Record::Timeout(TimeoutRecord {
                iter,
                seconds: elapsed,
            }))?;
            warn!(
                path = %log.path().display(),
                iter,
                "Timed out after {:.1} sec",
                elapsed
            );
            return Err(EetimeError::Timeout {
                iterations: iter,
                seconds: elapsed,
            });
        }

        let image = device.read().await?;
        last_read_done = Some(Instant::now());

        let sample = classify(&image);
        let (next, report) = state.advance(elapsed, sample, settings.erased_threshold);
        state = next;

        log.append(&Record::Read(ReadSample {
            iter: report.iter,
            seconds: elapsed,
            read: snapshot::encode(&image)?,
            read_meta: READ_META_ZLIB.to_string(),
            complete_percent: report.complete_percent,
            erase_percent: sample.erase_percent,
            erased: sample.erased,
        }))?;

        info!(
            "pass {} / {}, iter {:3} @ {}: is_erased {} w/ erase_percent {:8.3}%, sig {}, end_check: {:.1}%",
            settings.pass,
            settings.passes,
            report.iter,
            format_hms(elapsed),
            u8::from(sample.erased),
            sample.erase_percent,
            signature(&image),
            report.end_check
        );
        if report.half_erased_now {
            info!("50% erased after {:.1} sec", elapsed);
        }

        if report.status == RunStatus::Done {
            break elapsed;
        }
    };

    let footer = Footer {
        erase_time: state.streak_start,
        run_time,
        half_erase_time: state.half_erase_time,
        prog_time: settings.prog_time,
    };
    if let Some(erase_time) = footer.erase_time {
        info!("Erased 100% after {:.1} sec", erase_time);
    }
    info!("Erased 120% after {:.1} sec", run_time);
    log.append(&Record::Footer(footer.clone()))?;
    Ok(footer)
}

/// Format elapsed seconds as `hh:mm:ss`, truncating fractions.
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockEprom;
    use crate::runlog::reader::load_run;
    use tempfile::tempdir;

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_hms(0.0), "00:00:00");
        assert_eq!(format_hms(59.9), "00:00:59");
        assert_eq!(format_hms(3723.4), "01:02:03");
    }

    #[tokio::test(start_paused = true)]
    async fn footer_reports_start_of_final_streak() {
        let blank = vec![0xFF; 4];
        let dirty = vec![0x00; 4];
        let eprom = MockEprom::scripted(
            "script",
            vec![
                dirty.clone(),
                blank.clone(),
                dirty,
                blank.clone(),
                blank.clone(),
                blank,
            ],
        );
        let dir = tempdir().unwrap();
        let path = dir.path().join("iter_01.jl");
        let mut log = RunLogWriter::create(&path).unwrap();
        let settings = SamplerSettings {
            interval: Duration::from_secs(1),
            erased_threshold: 60.0,
            ..Default::default()
        };

        let footer = wait_erased(&eprom, &mut log, &settings).await.unwrap();

        // One tick per second. The streak broken at t=2 restarts at t=3 and first
        // covers 60% of the run at t=7 (5 of 8 ticks).
        let close = |a: Option<f64>, b: f64| a.is_some_and(|a| (a - b).abs() < 0.01);
        assert!(close(footer.erase_time, 3.0), "{:?}", footer);
        assert!(close(Some(footer.run_time), 7.0), "{:?}", footer);
        assert!(close(footer.half_erase_time, 1.0), "{:?}", footer);
        assert_eq!(eprom.read_count(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn frame_lock_waits_from_read_completion() {
        let eprom = MockEprom::new("slow", 1).with_read_latency(Duration::from_millis(400));
        let start = Instant::now();
        eprom.read().await.unwrap();
        frame_lock(Instant::now(), Duration::from_secs(2)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2400), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(2410), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn device_error_leaves_readable_log() {
        struct Broken;

        #[async_trait::async_trait]
        impl MemoryDevice for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn programmer(&self) -> &str {
                "mock"
            }
            async fn read(&self) -> AppResult<Vec<u8>> {
                Err(EetimeError::Programmer("exit status 1".into()))
            }
            async fn write(&self, _image: &[u8], _verify: bool) -> AppResult<()> {
                Ok(())
            }
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join("iter_01.jl");
        let mut log = RunLogWriter::create(&path).unwrap();
        log.append(&Record::Header(crate::runlog::record::Header {
            prog: "mock".into(),
            prog_dev: "broken".into(),
            datetime: chrono::Utc::now().naive_utc(),
            interval: 1.0,
            erased_threshold: 20.0,
            user: None,
            sn: None,
            eraser: None,
            bulb: None,
            read: None,
        }))
        .unwrap();

        let result = wait_erased(&Broken, &mut log, &SamplerSettings::default()).await;
        assert!(matches!(result, Err(EetimeError::Programmer(_))));

        let run = load_run(&path).unwrap();
        assert!(run.reads.is_empty());
        assert!(!run.is_complete());
    }
}
