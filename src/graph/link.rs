use super::{LinkId, SlotRef};
use serde::{Deserialize, Serialize};

/// A directed edge between two slots of the same kind.
///
/// Execution links run from a predecessor's output execution slot to a
/// successor's input execution slot. Value links run from a producer's output
/// value slot to a consumer's input value slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: SlotRef,
    pub target: SlotRef,
}
