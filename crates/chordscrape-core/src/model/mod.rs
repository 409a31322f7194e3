pub mod artist;
pub mod chord;
pub mod ids;
pub mod song;

pub use artist::Artist;
pub use chord::Chord;
pub use ids::{ArtistId, ChordId, SongId};
pub use song::{Song, SongRecord};
