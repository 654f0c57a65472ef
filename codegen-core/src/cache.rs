// codegen-core/src/cache.rs

//! Point replay cache.
//!
//! Records every point/result pair observed by the pipeline. When the
//! optimizer later resubmits a point that was already generated, the
//! cached result short-circuits the dispatch instead of launching
//! another generation run. Lookup is a linear scan; session point
//! counts stay small enough that this has not mattered.

use crate::message::{Message, PointMessage};

#[derive(Debug, Default)]
pub struct PointCache {
    entries: Vec<(PointMessage, Message)>,
}

impl PointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded result for a previously seen point.
    pub fn lookup(&self, point: &PointMessage) -> Option<&Message> {
        self.entries
            .iter()
            .find(|(cached, _)| cached == point)
            .map(|(_, result)| result)
    }

    /// Records an observed point/result pair. A point that is already
    /// cached is left untouched.
    pub fn record(&mut self, point: PointMessage, result: Message) {
        if self.lookup(&point).is_some() {
            return;
        }
        self.entries.push((point, result));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
