//! Scan page-size normalization for bounded head/tail scans.

/// Upper bound any single scan call may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Requested row cap for one non-resumable scan.
#[derive(Clone, Copy, Debug)]
pub struct ScanPage {
    pub size: u32,
}

impl ScanPage {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn from_config(cfg: &configs::ScanConfig) -> Self {
        Self { size: cfg.page_size }
    }

    /// Clamp to `1..=MAX_PAGE_SIZE`.
    pub fn normalize(self) -> u32 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }
}

impl Default for ScanPage {
    fn default() -> Self {
        Self { size: 10 }
    }
}
