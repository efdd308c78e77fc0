//! Core catalog and taste types shared by every crate in the workspace.
//!
//! Identifiers are plain type aliases: rounds, picks, groups and members are
//! UUIDs minted by the surrounding product, movie ids come from the external
//! catalog provider.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{EngineError, Result};

// =============================================================================
// Type Aliases
// =============================================================================

/// Identifier of a family group.
pub type GroupId = Uuid;

/// Identifier of a group member (the effective actor, never the login principal).
pub type MemberId = Uuid;

/// Identifier of a voting round.
pub type RoundId = Uuid;

/// Identifier of a committed pick.
pub type PickId = Uuid;

/// Catalog movie id as issued by the external provider.
pub type MovieId = u32;

// =============================================================================
// Genres
// =============================================================================

/// Movie genres understood by the catalog provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Family,
    Fantasy,
    History,
    Horror,
    Music,
    Mystery,
    Romance,
    SciFi,
    Thriller,
    TvMovie,
    War,
    Western,
}

impl Genre {
    pub const ALL: [Genre; 19] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Family,
        Genre::Fantasy,
        Genre::History,
        Genre::Horror,
        Genre::Music,
        Genre::Mystery,
        Genre::Romance,
        Genre::SciFi,
        Genre::Thriller,
        Genre::TvMovie,
        Genre::War,
        Genre::Western,
    ];

    /// Numeric genre id used by TMDB-compatible catalogs.
    pub fn catalog_id(self) -> u32 {
        match self {
            Genre::Action => 28,
            Genre::Adventure => 12,
            Genre::Animation => 16,
            Genre::Comedy => 35,
            Genre::Crime => 80,
            Genre::Documentary => 99,
            Genre::Drama => 18,
            Genre::Family => 10751,
            Genre::Fantasy => 14,
            Genre::History => 36,
            Genre::Horror => 27,
            Genre::Music => 10402,
            Genre::Mystery => 9648,
            Genre::Romance => 10749,
            Genre::SciFi => 878,
            Genre::Thriller => 53,
            Genre::TvMovie => 10770,
            Genre::War => 10752,
            Genre::Western => 37,
        }
    }

    pub fn from_catalog_id(id: u32) -> Option<Genre> {
        Genre::ALL.into_iter().find(|g| g.catalog_id() == id)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Family => "Family",
            Genre::Fantasy => "Fantasy",
            Genre::History => "History",
            Genre::Horror => "Horror",
            Genre::Music => "Music",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::SciFi => "Science Fiction",
            Genre::Thriller => "Thriller",
            Genre::TvMovie => "TV Movie",
            Genre::War => "War",
            Genre::Western => "Western",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = EngineError;

    /// Case-insensitive; accepts display names and a few common spellings.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let genre = match normalized.as_str() {
            "action" => Genre::Action,
            "adventure" => Genre::Adventure,
            "animation" | "animated" => Genre::Animation,
            "comedy" => Genre::Comedy,
            "crime" => Genre::Crime,
            "documentary" => Genre::Documentary,
            "drama" => Genre::Drama,
            "family" | "children" | "childrens" => Genre::Family,
            "fantasy" => Genre::Fantasy,
            "history" => Genre::History,
            "horror" => Genre::Horror,
            "music" | "musical" => Genre::Music,
            "mystery" => Genre::Mystery,
            "romance" => Genre::Romance,
            "scifi" | "sciencefiction" => Genre::SciFi,
            "thriller" => Genre::Thriller,
            "tvmovie" => Genre::TvMovie,
            "war" => Genre::War,
            "western" => Genre::Western,
            _ => return Err(EngineError::Validation(format!("unknown genre: {s:?}"))),
        };
        Ok(genre)
    }
}

// =============================================================================
// Content ratings
// =============================================================================

/// Content rating on the fixed, ordered certification scale.
///
/// Ordering is by permissiveness: `G < Pg < Pg13 < R < Nc17`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContentRating {
    #[serde(rename = "G")]
    G,
    #[serde(rename = "PG")]
    Pg,
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "NC-17")]
    Nc17,
}

impl ContentRating {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentRating::G => "G",
            ContentRating::Pg => "PG",
            ContentRating::Pg13 => "PG-13",
            ContentRating::R => "R",
            ContentRating::Nc17 => "NC-17",
        }
    }
}

impl fmt::Display for ContentRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentRating {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "G" => Ok(ContentRating::G),
            "PG" => Ok(ContentRating::Pg),
            "PG-13" | "PG13" => Ok(ContentRating::Pg13),
            "R" => Ok(ContentRating::R),
            "NC-17" | "NC17" => Ok(ContentRating::Nc17),
            _ => Err(EngineError::Validation(format!(
                "unknown content rating: {s:?}"
            ))),
        }
    }
}

// =============================================================================
// Movies
// =============================================================================

/// A movie record as returned by the catalog, denormalized into suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: Option<u16>,
    pub poster_path: Option<String>,
    pub genres: Vec<Genre>,
    /// `None` when the catalog has no certification for the movie.
    pub content_rating: Option<ContentRating>,
    pub overview: String,
    /// Raw catalog popularity, unbounded and only comparable within a pool.
    pub popularity: f32,
    /// Average audience rating on a 0-10 scale.
    pub vote_average: f32,
}

impl Movie {
    /// Minimal record, mostly useful for tests and fixtures.
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            year: None,
            poster_path: None,
            genres: Vec::new(),
            content_rating: None,
            overview: String::new(),
            popularity: 0.0,
            vote_average: 0.0,
        }
    }

    pub fn with_genres(mut self, genres: impl IntoIterator<Item = Genre>) -> Self {
        self.genres = genres.into_iter().collect();
        self
    }

    pub fn with_rating(mut self, rating: ContentRating) -> Self {
        self.content_rating = Some(rating);
        self
    }

    pub fn with_popularity(mut self, popularity: f32) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn has_genre(&self, genre: Genre) -> bool {
        self.genres.contains(&genre)
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Per-member taste profile within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub group_id: GroupId,
    pub member_id: MemberId,
    pub liked_genres: BTreeSet<Genre>,
    pub disliked_genres: BTreeSet<Genre>,
    /// Most permissive rating this member may watch; `None` means no ceiling.
    pub max_rating: Option<ContentRating>,
}

impl PreferenceProfile {
    /// Build a profile, rejecting a genre that is both liked and disliked.
    pub fn new(
        group_id: GroupId,
        member_id: MemberId,
        liked_genres: impl IntoIterator<Item = Genre>,
        disliked_genres: impl IntoIterator<Item = Genre>,
        max_rating: Option<ContentRating>,
    ) -> Result<Self> {
        let profile = Self {
            group_id,
            member_id,
            liked_genres: liked_genres.into_iter().collect(),
            disliked_genres: disliked_genres.into_iter().collect(),
            max_rating,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(genre) = self.liked_genres.intersection(&self.disliked_genres).next() {
            return Err(EngineError::Validation(format!(
                "genre {genre} cannot be both liked and disliked"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_catalog_ids_round_trip() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_catalog_id(genre.catalog_id()), Some(genre));
        }
        assert_eq!(Genre::from_catalog_id(1), None);
    }

    #[test]
    fn test_genre_parsing_is_lenient() {
        assert_eq!("comedy".parse::<Genre>().unwrap(), Genre::Comedy);
        assert_eq!("Science Fiction".parse::<Genre>().unwrap(), Genre::SciFi);
        assert_eq!("Sci-Fi".parse::<Genre>().unwrap(), Genre::SciFi);
        assert_eq!("Children's".parse::<Genre>().unwrap(), Genre::Family);
        assert!("Polka".parse::<Genre>().is_err());
    }

    #[test]
    fn test_content_rating_order() {
        assert!(ContentRating::G < ContentRating::Pg);
        assert!(ContentRating::Pg < ContentRating::Pg13);
        assert!(ContentRating::Pg13 < ContentRating::R);
        assert!(ContentRating::R < ContentRating::Nc17);
        assert_eq!("pg-13".parse::<ContentRating>().unwrap(), ContentRating::Pg13);
    }

    #[test]
    fn test_content_rating_serde_uses_certification_labels() {
        let json = serde_json::to_string(&ContentRating::Pg13).unwrap();
        assert_eq!(json, "\"PG-13\"");
    }

    #[test]
    fn test_profile_rejects_overlapping_genres() {
        let result = PreferenceProfile::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            [Genre::Comedy, Genre::Drama],
            [Genre::Drama],
            None,
        );
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }
}
