use serde::{Deserialize, Serialize};

use crate::model::ids::ArtistId;

/// An artist as listed on the index site. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
}
