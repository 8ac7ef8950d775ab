//! Multi-pass collect session.
//!
//! A session probes the device once, then for every pass writes `iter_NN.jl`:
//! optional initial snapshot, optional zeroing write, header, sampling loop.

use crate::acquisition::controller::{wait_erased, SamplerSettings};
use crate::config::CollectConfig;
use crate::error::{AppResult, EetimeError};
use crate::hardware::capabilities::MemoryDevice;
use crate::runlog::record::{Footer, Header, Record};
use crate::runlog::snapshot;
use crate::runlog::writer::RunLogWriter;
use chrono::{NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::time::{Duration, Instant};
use tracing::info;

/// Free-form metadata stamped into every header of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMetadata {
    /// Operator
    pub user: Option<String>,
    /// Serial number of the part under test
    pub sn: Option<String>,
    /// Eraser fixture
    pub eraser: Option<String>,
    /// Bulb id, the key of the bulb scalar table
    pub bulb: Option<String>,
}

/// Options for one collect session.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Output directory, created if missing
    pub dir: PathBuf,
    /// Program/erase cycles, one log each
    pub passes: u32,
    /// Minimum time between reads
    pub interval: Duration,
    /// Percent of ticks the trailing erased streak must cover
    pub erased_threshold: f64,
    /// Per-pass timeout in seconds
    pub timeout: Option<f64>,
    /// Snapshot the device into the header before each pass
    pub read_init: bool,
    /// Zero the device before each pass
    pub write_init: bool,
    /// Stamped into every header
    pub metadata: RunMetadata,
}

impl CollectOptions {
    /// Build options from the `[collect]` configuration section.
    pub fn from_config(config: &CollectConfig, dir: impl Into<PathBuf>) -> AppResult<Self> {
        Ok(Self {
            dir: dir.into(),
            passes: config.passes,
            interval: interval_from_secs(config.interval_secs)?,
            erased_threshold: config.erased_threshold,
            timeout: config.timeout(),
            read_init: config.read_init,
            write_init: config.write_init,
            metadata: RunMetadata {
                user: config.user.clone(),
                ..Default::default()
            },
        })
    }

    /// Reject option combinations a session cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.passes == 0 {
            return Err(EetimeError::Configuration(
                "passes must be at least 1".to_string(),
            ));
        }
        if self.passes > 1 && !self.write_init {
            return Err(EetimeError::Configuration(
                "Must write_init if > 1 pass".to_string(),
            ));
        }
        if !(self.erased_threshold > 0.0 && self.erased_threshold <= 100.0) {
            return Err(EetimeError::Configuration(format!(
                "erased_threshold {} must be in (0, 100]",
                self.erased_threshold
            )));
        }
        Ok(())
    }

    fn sampler(&self, pass: u32, prog_time: Option<f64>) -> SamplerSettings {
        SamplerSettings {
            interval: self.interval,
            erased_threshold: self.erased_threshold,
            timeout: self.timeout,
            prog_time,
            pass,
            passes: self.passes,
        }
    }
}

/// Convert a sampling interval in seconds, rejecting values that are not positive or do
/// not fit a [`Duration`].
pub fn interval_from_secs(secs: f64) -> AppResult<Duration> {
    if !(secs > 0.0) {
        return Err(EetimeError::Configuration(format!(
            "interval {secs} must be > 0"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| EetimeError::Configuration(format!("interval {secs}: {e}")))
}

/// Log file name of a 1-based pass.
pub fn pass_log_name(pass: u32) -> String {
    format!("iter_{pass:02}.jl")
}

/// Run every pass of a session, returning one footer per pass.
///
/// Stops at the first failing pass; logs of earlier passes are left complete.
pub async fn run_session<D>(device: &D, options: &CollectOptions) -> AppResult<Vec<Footer>>
where
    D: MemoryDevice + ?Sized,
{
    options.validate()?;
    fs::create_dir_all(&options.dir)?;

    info!("Checking programmer...");
    let size = device.read().await?.len();
    info!("Device is {} bytes", size);
    let init_image = vec![0u8; size];

    let mut footers = Vec::with_capacity(options.passes as usize);
    for pass in 1..=options.passes {
        let path = options.dir.join(pass_log_name(pass));
        info!(path = %path.display(), "Writing pass {} / {}", pass, options.passes);

        let initial = if options.read_init {
            info!("Reading initial state");
            Some(snapshot::encode(&device.read().await?)?)
        } else {
            None
        };

        let prog_time = if options.write_init {
            info!("Writing initial buffer...");
            let started = Instant::now();
            device.write(&init_image, false).await?;
            let seconds = started.elapsed().as_secs_f64();
            info!("Wrote in {:.1} sec", seconds);
            Some(seconds)
        } else {
            None
        };

        let mut log = RunLogWriter::create(&path)?;
        log.append(&Record::Header(Header {
            prog: device.programmer().to_string(),
            prog_dev: device.name().to_string(),
            datetime: Utc::now().naive_utc(),
            interval: options.interval.as_secs_f64(),
            erased_threshold: options.erased_threshold,
            user: options.metadata.user.clone(),
            sn: options.metadata.sn.clone(),
            eraser: options.metadata.eraser.clone(),
            bulb: options.metadata.bulb.clone(),
            read: initial,
        }))?;

        // Close on every exit path; a sampling error takes precedence over a close error
        let sampled = wait_erased(device, &mut log, &options.sampler(pass, prog_time)).await;
        let closed = log.close();
        footers.push(sampled?);
        closed?;
    }
    Ok(footers)
}

/// Descriptive directory suffix used when none is given.
pub fn default_postfix(metadata: &RunMetadata) -> String {
    format!(
        "sn-{}_bulb-{}",
        metadata.sn.as_deref().unwrap_or("None"),
        metadata.bulb.as_deref().unwrap_or("None")
    )
}

/// First free `<root>/<date>_<NN>[_<postfix>]` directory name.
///
/// A sequence number is taken when no entry of `root` starts with `<date>_<NN>`.
pub fn default_run_dir(root: &Path, postfix: Option<&str>, date: NaiveDate) -> AppResult<PathBuf> {
    let existing: Vec<String> = match fs::read_dir(root) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let datestr = date.format("%Y-%m-%d");
    let mut n = 1u32;
    loop {
        let stem = format!("{datestr}_{n:02}");
        if !existing.iter().any(|name| name.starts_with(&stem)) {
            let name = match postfix {
                Some(postfix) if !postfix.is_empty() => format!("{stem}_{postfix}"),
                _ => stem,
            };
            return Ok(root.join(name));
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockEprom;
    use crate::runlog::reader::load_run;
    use tempfile::tempdir;

    fn options(dir: &Path) -> CollectOptions {
        CollectOptions {
            dir: dir.to_path_buf(),
            passes: 1,
            interval: Duration::from_secs(1),
            erased_threshold: 20.0,
            timeout: None,
            read_init: true,
            write_init: false,
            metadata: RunMetadata {
                sn: Some("ee20".into()),
                bulb: Some("2".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn multiple_passes_need_write_init() {
        let mut opts = options(Path::new("unused"));
        opts.passes = 2;
        assert!(matches!(
            opts.validate(),
            Err(EetimeError::Configuration(_))
        ));
        opts.write_init = true;
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn interval_must_fit_a_duration() {
        assert_eq!(interval_from_secs(2.5).unwrap(), Duration::from_millis(2500));
        assert!(interval_from_secs(0.0).is_err());
        assert!(interval_from_secs(f64::NAN).is_err());
        assert!(matches!(
            interval_from_secs(f64::INFINITY),
            Err(EetimeError::Configuration(_))
        ));

        let config = CollectConfig {
            interval_secs: 1e30,
            ..Default::default()
        };
        assert!(CollectOptions::from_config(&config, "out").is_err());
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn timed_out_pass_still_closes_its_log() {
        let dir = tempdir().unwrap();
        let eprom = MockEprom::new("2716", 16)
            .with_erase_window(Duration::from_secs(100), Duration::from_secs(200));
        let mut opts = options(dir.path());
        opts.timeout = Some(3.0);

        let result = run_session(&eprom, &opts).await;
        assert!(matches!(result, Err(EetimeError::Timeout { .. })));
        assert!(logs_contain("Closed run log"));

        let run = load_run(&dir.path().join("iter_01.jl")).unwrap();
        assert!(run.timeout.is_some());
    }

    #[test]
    fn run_dir_takes_first_free_sequence_number() {
        let root = tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2022, 3, 23).unwrap();
        fs::create_dir(root.path().join("2022-03-23_01_ee17")).unwrap();
        fs::create_dir(root.path().join("2022-03-23_02")).unwrap();

        let dir = default_run_dir(root.path(), Some("sn-EE20_bulb-2"), date).unwrap();
        assert_eq!(dir, root.path().join("2022-03-23_03_sn-EE20_bulb-2"));

        let missing = root.path().join("missing");
        assert_eq!(
            default_run_dir(&missing, None, date).unwrap(),
            missing.join("2022-03-23_01")
        );
    }

    #[test]
    fn postfix_names_serial_and_bulb() {
        let metadata = RunMetadata {
            sn: Some("EE20".into()),
            ..Default::default()
        };
        assert_eq!(default_postfix(&metadata), "sn-EE20_bulb-None");
    }

    #[tokio::test(start_paused = true)]
    async fn passes_write_numbered_logs_with_prog_time() {
        let dir = tempdir().unwrap();
        let eprom = MockEprom::new("2716", 16)
            .with_erase_window(Duration::from_secs(2), Duration::from_secs(4))
            .with_write_latency(Duration::from_secs(2));
        let mut opts = options(dir.path());
        opts.passes = 2;
        opts.write_init = true;

        let footers = run_session(&eprom, &opts).await.unwrap();
        assert_eq!(footers.len(), 2);
        assert_eq!(eprom.write_count(), 2);

        for pass in 1..=2 {
            let run = load_run(&dir.path().join(pass_log_name(pass))).unwrap();
            assert!(run.is_complete());
            assert_eq!(run.header.prog, "mock");
            assert_eq!(run.header.prog_dev, "2716");
            assert_eq!(run.header.sn.as_deref(), Some("EE20"));
            assert!(run.header.read.is_some());
            let prog_time = run.footer.unwrap().prog_time.unwrap();
            assert!((prog_time - 2.0).abs() < 0.01);
        }
    }
}
