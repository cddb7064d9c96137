use chrono::{DateTime, Utc};

/// Counters for one enrichment run.
#[derive(Debug, Clone)]
pub struct RunState {
    pub started_at: DateTime<Utc>,
    pub pages_scanned: u32,
    /// Scraped records looked up in the index.
    pub seen: usize,
    pub matched: usize,
    /// Stored records changed by this run; one count per merge that changed
    /// something.
    pub updated: usize,
    /// Positions of changed records, first change first, no repeats.
    pub updated_positions: Vec<usize>,
    pending_write: bool,
    save_interval: usize,
}

impl RunState {
    pub fn new(save_interval: usize) -> Self {
        Self {
            started_at: Utc::now(),
            pages_scanned: 0,
            seen: 0,
            matched: 0,
            updated: 0,
            updated_positions: Vec::new(),
            pending_write: false,
            save_interval: save_interval.max(1),
        }
    }

    /// Scraped records that matched nothing and were dropped.
    pub fn dropped(&self) -> usize {
        self.seen.saturating_sub(self.matched)
    }

    /// Returns true when a checkpoint is due.
    pub fn record_update(&mut self, position: usize) -> bool {
        self.updated += 1;
        self.pending_write = true;
        if !self.updated_positions.contains(&position) {
            self.updated_positions.push(position);
        }
        self.updated % self.save_interval == 0
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending_write
    }

    pub fn mark_saved(&mut self) {
        self.pending_write = false;
    }

    pub fn summary(&self) -> String {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        format!(
            "pages={} seen={} matched={} dropped={} updated={} elapsed={}s",
            self.pages_scanned,
            self.seen,
            self.matched,
            self.dropped(),
            self.updated,
            elapsed.num_seconds()
        )
    }
}
