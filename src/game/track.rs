use crate::game::note::LiveNote;

/// Notes that have spawned and are not yet resolved, one time-ordered list per
/// lane.
#[derive(Clone, Debug, Default)]
pub struct Track {
    lanes: Vec<Vec<LiveNote>>,
}

impl Track {
    pub fn new(num_lanes: usize) -> Self {
        Self {
            lanes: vec![Vec::new(); num_lanes],
        }
    }

    #[inline(always)]
    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Inserts keeping the lane ordered by scheduled position; same-position
    /// notes keep insertion order. Returns false for a lane outside the track.
    pub fn insert(&mut self, note: LiveNote) -> bool {
        let Some(lane) = self.lanes.get_mut(note.lane()) else {
            return false;
        };
        let at = lane.partition_point(|n| n.scheduled <= note.scheduled);
        lane.insert(at, note);
        true
    }

    /// Notes of one lane, earliest first. Empty for an unknown lane.
    #[inline(always)]
    pub fn lane(&self, lane: usize) -> &[LiveNote] {
        self.lanes.get(lane).map_or(&[][..], Vec::as_slice)
    }

    pub fn remove(&mut self, lane: usize, index: usize) -> Option<LiveNote> {
        let notes = self.lanes.get_mut(lane)?;
        (index < notes.len()).then(|| notes.remove(index))
    }

    /// Earliest note of a lane.
    #[inline(always)]
    pub fn front(&self, lane: usize) -> Option<&LiveNote> {
        self.lane(lane).first()
    }

    pub fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(Vec::is_empty)
    }

    /// All live notes ordered by scheduled position, then lane.
    pub fn iter_by_time(&self) -> impl Iterator<Item = &LiveNote> {
        let mut all: Vec<&LiveNote> = self.lanes.iter().flatten().collect();
        all.sort_by_key(|n| (n.scheduled, n.lane()));
        all.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::Cu;
    use crate::game::note::NoteData;

    fn live(pitch: usize, position: Cu) -> LiveNote {
        LiveNote::spawn(NoteData { pitch, position }, 0)
    }

    #[test]
    fn lanes_stay_ordered() {
        let mut t = Track::new(2);
        assert!(t.insert(live(0, 30)));
        assert!(t.insert(live(0, 10)));
        assert!(t.insert(live(1, 20)));
        assert!(t.insert(live(0, 20)));
        let lane0: Vec<_> = t.lane(0).iter().map(|n| n.scheduled).collect();
        assert_eq!(lane0, vec![10, 20, 30]);
        let all: Vec<_> = t.iter_by_time().map(|n| (n.lane(), n.scheduled)).collect();
        assert_eq!(all, vec![(0, 10), (0, 20), (1, 20), (0, 30)]);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn out_of_range_lane_is_rejected() {
        let mut t = Track::new(1);
        assert!(!t.insert(live(3, 0)));
        assert!(t.is_empty());
        assert!(t.lane(3).is_empty());
        assert_eq!(t.remove(3, 0), None);
    }

    #[test]
    fn remove_and_clear() {
        let mut t = Track::new(1);
        t.insert(live(0, 5));
        t.insert(live(0, 7));
        assert_eq!(t.remove(0, 0).map(|n| n.scheduled), Some(5));
        assert_eq!(t.remove(0, 5), None);
        assert_eq!(t.front(0).map(|n| n.scheduled), Some(7));
        t.clear();
        assert!(t.is_empty());
    }
}
