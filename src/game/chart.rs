use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::clock::Cu;
use crate::error::CoreError;
use crate::game::note::NoteData;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub name: String,
    notes: Vec<NoteData>,
}

impl Chart {
    /// Builds a chart, ordering notes by position. Same-position notes keep
    /// their authored order.
    pub fn new(name: impl Into<String>, mut notes: Vec<NoteData>) -> Self {
        let name = name.into();
        if !notes.is_sorted_by_key(|n| n.position) {
            warn!("Chart '{name}' notes were out of order; sorting by position.");
            notes.sort_by_key(|n| n.position);
        }
        Self { name, notes }
    }

    #[inline(always)]
    pub fn notes(&self) -> &[NoteData] {
        &self.notes
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Position of the last note, relative to the section start.
    pub fn last_position(&self) -> Cu {
        self.notes.last().map_or(0, |n| n.position)
    }
}

/// Read-only list of charts, indexed by section ordinal.
#[derive(Clone, Debug, Default)]
pub struct ChartStore {
    charts: Vec<Arc<Chart>>,
}

impl ChartStore {
    pub fn new(charts: Vec<Chart>) -> Self {
        Self {
            charts: charts.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Result<Arc<Chart>, CoreError> {
        self.charts
            .get(index)
            .cloned()
            .ok_or(CoreError::ChartNotFound {
                index,
                available: self.charts.len(),
            })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.charts.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(pitch: usize, position: Cu) -> NoteData {
        NoteData { pitch, position }
    }

    #[test]
    fn new_orders_notes_by_position_stably() {
        let chart = Chart::new("c", vec![n(0, 30), n(1, 10), n(2, 10), n(3, 0)]);
        let order: Vec<_> = chart.notes().iter().map(|x| (x.pitch, x.position)).collect();
        assert_eq!(order, vec![(3, 0), (1, 10), (2, 10), (0, 30)]);
        assert_eq!(chart.last_position(), 30);
    }

    #[test]
    fn store_reports_missing_index() {
        let store = ChartStore::new(vec![Chart::new("only", vec![n(0, 0)])]);
        assert!(store.get(0).is_ok());
        assert_eq!(
            store.get(3).unwrap_err(),
            CoreError::ChartNotFound {
                index: 3,
                available: 1
            }
        );
    }
}
