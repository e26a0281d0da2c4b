/// Depth thresholds reported at most once per page load, in ascending order.
pub const MILESTONES: [u8; 4] = [25, 50, 75, 100];

/// Raw viewport geometry as the page reports it, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub document_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn new(scroll_top: f64, document_height: f64, viewport_height: f64) -> Self {
        Self {
            scroll_top,
            document_height,
            viewport_height,
        }
    }

    /// Rounded scroll percentage, or `None` when the page cannot scroll
    /// (document no taller than the viewport).
    pub fn percent(&self) -> Option<u8> {
        let scrollable = self.document_height - self.viewport_height;
        if scrollable.is_nan() || scrollable <= 0.0 || !self.scroll_top.is_finite() {
            return None;
        }
        let pct = (self.scroll_top.max(0.0) / scrollable * 100.0).round();
        Some(pct.min(100.0) as u8)
    }
}

/// Milestones already reported for the current page view.
#[derive(Debug, Clone, Default)]
pub struct ScrollMilestones {
    reported: Vec<u8>,
}

impl ScrollMilestones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every milestone at or below `percent` that was not reported yet
    /// and return just those, lowest first.
    pub fn advance(&mut self, percent: u8) -> Vec<u8> {
        let mut crossed = Vec::new();
        for milestone in MILESTONES {
            if percent >= milestone && !self.reported.contains(&milestone) {
                self.reported.push(milestone);
                crossed.push(milestone);
            }
        }
        crossed
    }

    pub fn reported(&self) -> &[u8] {
        &self.reported
    }
}

/// Coalesces bursts of scroll notifications into one check per animation frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameThrottle {
    pending: bool,
}

impl FrameThrottle {
    /// Returns `true` when a frame has to be requested, i.e. no check is queued yet.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Consumes the queued check, if any.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}
