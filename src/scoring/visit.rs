use thiserror::Error;

/// Highest total a single dart can score (treble 20).
pub const MAX_DART_SCORE: u16 = 60;
/// Highest total a three-dart visit can score.
pub const MAX_VISIT_SCORE: u16 = 180;
/// Number of darts in a full visit.
pub const DARTS_PER_VISIT: usize = 3;

/// Segment number of the bullseye ring.
pub const BULL_SEGMENT: u8 = 25;

/// Multiplier ring a dart landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplier {
    /// Plain segment (or outer bull for segment 25).
    Single,
    /// Double ring (or inner bull for segment 25).
    Double,
    /// Treble ring. Not available on the bull.
    Treble,
}

impl Multiplier {
    fn factor(self) -> u16 {
        match self {
            Multiplier::Single => 1,
            Multiplier::Double => 2,
            Multiplier::Treble => 3,
        }
    }
}

/// Error raised when a dart or visit payload is not a legal board entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DartError {
    /// Segment is not on the board (1-20 or bull; 0 encodes a miss).
    #[error("segment {0} does not exist on a dartboard")]
    UnknownSegment(u8),
    /// The bull has no treble ring.
    #[error("the bull cannot be trebled")]
    TrebledBull,
    /// A miss scores zero and carries no multiplier.
    #[error("a miss cannot carry a multiplier")]
    MultipliedMiss,
}

/// A single thrown dart: a board segment plus the ring it landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dart {
    segment: u8,
    multiplier: Multiplier,
}

impl Dart {
    /// Build a dart, validating the segment/multiplier combination.
    ///
    /// Segment 0 encodes a miss and must be a plain single; segments 1-20
    /// accept any ring; the bull (25) accepts single and double only.
    pub fn new(segment: u8, multiplier: Multiplier) -> Result<Self, DartError> {
        match (segment, multiplier) {
            (0, Multiplier::Single) => {}
            (0, _) => return Err(DartError::MultipliedMiss),
            (1..=20, _) => {}
            (BULL_SEGMENT, Multiplier::Single | Multiplier::Double) => {}
            (BULL_SEGMENT, Multiplier::Treble) => return Err(DartError::TrebledBull),
            (other, _) => return Err(DartError::UnknownSegment(other)),
        }

        Ok(Self {
            segment,
            multiplier,
        })
    }

    /// Convenience constructor for a missed dart.
    pub fn miss() -> Self {
        Self {
            segment: 0,
            multiplier: Multiplier::Single,
        }
    }

    /// Board segment this dart landed in (0 for a miss).
    pub fn segment(&self) -> u8 {
        self.segment
    }

    /// Ring the dart landed in.
    pub fn multiplier(&self) -> Multiplier {
        self.multiplier
    }

    /// Score contribution of this dart.
    pub fn value(&self) -> u16 {
        u16::from(self.segment) * self.multiplier.factor()
    }

    /// Whether this dart landed in a double (checkout-legal under double-out).
    pub fn is_double(&self) -> bool {
        self.multiplier == Multiplier::Double
    }
}

/// Every score a single dart can produce, misses included.
fn single_dart_scores() -> impl Iterator<Item = u16> {
    let singles = (0..=20u16).chain([25]);
    let doubles = (1..=20u16).map(|s| s * 2).chain([50]);
    let trebles = (1..=20u16).map(|s| s * 3);
    singles.chain(doubles).chain(trebles)
}

/// Whether `total` can be scored with exactly `darts` darts.
///
/// Rules out classic impossible aggregates such as 179 with three darts, so
/// aggregate-entry visits get the same scrutiny as dart-by-dart ones.
pub fn total_is_reachable(total: u16, darts: u8) -> bool {
    if !(1..=DARTS_PER_VISIT as u8).contains(&darts) {
        return false;
    }

    let mut reachable = vec![false; usize::from(MAX_VISIT_SCORE) + 1];
    reachable[0] = true;
    for _ in 0..darts {
        let mut next = vec![false; reachable.len()];
        for (sum, hit) in reachable.iter().enumerate() {
            if !hit {
                continue;
            }
            for score in single_dart_scores() {
                let candidate = sum + usize::from(score);
                if candidate < next.len() {
                    next[candidate] = true;
                }
            }
        }
        reachable = next;
    }

    usize::from(total) < reachable.len() && reachable[usize::from(total)]
}

/// Collects up to three darts for the active player's current visit.
///
/// Pure bookkeeping: the accumulator never looks at the match score, it only
/// guards the queue length and exposes the running total.
#[derive(Debug, Clone, Default)]
pub struct VisitAccumulator {
    darts: Vec<Dart>,
}

/// Error raised when a fourth dart is pushed into a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a visit holds at most {DARTS_PER_VISIT} darts")]
pub struct VisitFull;

impl VisitAccumulator {
    /// Fresh, empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a dart for the current visit. Fails once three darts are queued.
    pub fn add_dart(&mut self, dart: Dart) -> Result<(), VisitFull> {
        if self.darts.len() >= DARTS_PER_VISIT {
            return Err(VisitFull);
        }
        self.darts.push(dart);
        Ok(())
    }

    /// Remove and return the most recently queued dart, if any.
    pub fn undo_last(&mut self) -> Option<Dart> {
        self.darts.pop()
    }

    /// Clear the queue, e.g. after a commit or an acknowledged bust.
    pub fn reset(&mut self) {
        self.darts.clear();
    }

    /// Running total of the queued darts.
    pub fn total(&self) -> u16 {
        self.darts.iter().map(Dart::value).sum()
    }

    /// Number of darts queued so far.
    pub fn len(&self) -> usize {
        self.darts.len()
    }

    /// Whether no dart has been queued yet.
    pub fn is_empty(&self) -> bool {
        self.darts.is_empty()
    }

    /// Borrow the queued darts in throw order.
    pub fn darts(&self) -> &[Dart] {
        &self.darts
    }

    /// Drain the queue for a commit, leaving the accumulator empty.
    pub fn take(&mut self) -> Vec<Dart> {
        std::mem::take(&mut self.darts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dart(segment: u8, multiplier: Multiplier) -> Dart {
        Dart::new(segment, multiplier).unwrap()
    }

    #[test]
    fn dart_values_follow_rings() {
        assert_eq!(dart(20, Multiplier::Treble).value(), 60);
        assert_eq!(dart(25, Multiplier::Double).value(), 50);
        assert_eq!(Dart::miss().value(), 0);
    }

    #[test]
    fn invalid_darts_are_rejected() {
        assert_eq!(
            Dart::new(21, Multiplier::Single),
            Err(DartError::UnknownSegment(21))
        );
        assert_eq!(Dart::new(25, Multiplier::Treble), Err(DartError::TrebledBull));
        assert_eq!(Dart::new(0, Multiplier::Double), Err(DartError::MultipliedMiss));
    }

    #[test]
    fn accumulator_caps_at_three_darts() {
        let mut visit = VisitAccumulator::new();
        for _ in 0..3 {
            visit.add_dart(dart(20, Multiplier::Treble)).unwrap();
        }
        assert_eq!(visit.add_dart(Dart::miss()), Err(VisitFull));
        assert_eq!(visit.total(), 180);
    }

    #[test]
    fn undo_removes_most_recent_dart() {
        let mut visit = VisitAccumulator::new();
        visit.add_dart(dart(20, Multiplier::Single)).unwrap();
        visit.add_dart(dart(5, Multiplier::Single)).unwrap();

        assert_eq!(visit.undo_last(), Some(dart(5, Multiplier::Single)));
        assert_eq!(visit.total(), 20);
        visit.reset();
        assert!(visit.is_empty());
        assert_eq!(visit.undo_last(), None);
    }

    #[test]
    fn reachability_matches_known_aggregates() {
        assert!(total_is_reachable(180, 3));
        assert!(total_is_reachable(0, 3));
        assert!(total_is_reachable(60, 1));
        assert!(total_is_reachable(50, 1));
        // The classic impossible three-dart totals.
        for total in [163, 166, 169, 172, 173, 175, 176, 178, 179] {
            assert!(!total_is_reachable(total, 3), "{total} should be impossible");
        }
        assert!(!total_is_reachable(61, 1));
        assert!(!total_is_reachable(121, 2));
        assert!(!total_is_reachable(10, 0));
    }
}
