use crate::models::Bar;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const BAR_SNAPSHOT_VERSION: u32 = 1;

/// Source of historical bars. The engine performs exactly one fetch per
/// run, before the simulation loop starts.
pub trait BarSource {
    fn get_bars(
        &self,
        symbols: &[String],
        timeframe: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>>;
}

fn filter_bars(
    bars: &[Bar],
    symbols: &[String],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Bar> {
    let wanted: HashSet<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let mut selected: Vec<Bar> = bars
        .iter()
        .filter(|bar| wanted.contains(bar.symbol.as_str()))
        .filter(|bar| start.map(|s| bar.date >= s).unwrap_or(true))
        .filter(|bar| end.map(|e| bar.date <= e).unwrap_or(true))
        .cloned()
        .collect();
    selected.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));
    selected
}

/// In-memory bar source, mainly for tests and programmatic use.
#[derive(Debug, Clone, Default)]
pub struct MemoryBarSource {
    bars: Vec<Bar>,
}

impl MemoryBarSource {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }
}

impl BarSource for MemoryBarSource {
    fn get_bars(
        &self,
        symbols: &[String],
        _timeframe: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>> {
        Ok(filter_bars(&self.bars, symbols, start, end))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BarSnapshot {
    version: u32,
    #[serde(default)]
    generated_at: Option<DateTime<Utc>>,
    bars: Vec<Bar>,
}

/// Bar source backed by a JSON snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotBarSource {
    path: PathBuf,
}

impl SnapshotBarSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<BarSnapshot> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open bar snapshot {}", self.path.display()))?;
        let snapshot: BarSnapshot = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse bar snapshot {}", self.path.display()))?;
        if snapshot.version > BAR_SNAPSHOT_VERSION {
            return Err(anyhow!(
                "Bar snapshot {} has unsupported version {} (expected <= {})",
                self.path.display(),
                snapshot.version,
                BAR_SNAPSHOT_VERSION
            ));
        }
        Ok(snapshot)
    }
}

impl BarSource for SnapshotBarSource {
    fn get_bars(
        &self,
        symbols: &[String],
        timeframe: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>> {
        if timeframe != "1D" {
            warn!(
                "Snapshot source only stores daily bars; ignoring timeframe {}",
                timeframe
            );
        }
        let snapshot = self.load()?;
        let selected = filter_bars(&snapshot.bars, symbols, start, end);
        info!(
            "Loaded {} bars for {} symbols from {}",
            selected.len(),
            symbols.len(),
            self.path.display()
        );
        Ok(selected)
    }
}
