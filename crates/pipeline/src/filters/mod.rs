//! Filter implementations for the candidate pipeline.
//!
//! Listed in the order the relaxation engine applies them. The rating
//! ceiling is the only one that is never relaxed.

pub mod content_rating;
pub mod disliked_genre;
pub mod liked_genre;

// Re-export for convenience
pub use content_rating::ContentRatingFilter;
pub use disliked_genre::DislikedGenreFilter;
pub use liked_genre::LikedGenreFilter;
