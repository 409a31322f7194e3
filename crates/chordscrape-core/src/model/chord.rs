use serde::{Deserialize, Serialize};

use crate::model::ids::ChordId;

/// A chord symbol exactly as it appeared on a song page (`Am`, `Dsus2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    pub id: ChordId,
    pub symbol: String,
}
