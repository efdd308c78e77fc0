//! The filter seam.

use catalog::{Candidate, GroupConstraints};
use model::Result;

/// One hard constraint over a candidate set.
///
/// Filters take ownership of the candidates and return the survivors, so
/// chaining them never clones movie records.
pub trait Filter: Send + Sync {
    /// Name used in pipeline debug logs
    fn name(&self) -> &str;

    /// `constraints` are the round's merged constraints for the current
    /// relaxation pass.
    fn apply(
        &self,
        candidates: Vec<Candidate>,
        constraints: &GroupConstraints,
    ) -> Result<Vec<Candidate>>;
}
