//! TMDB-compatible HTTP catalog.

use async_trait::async_trait;
use model::{ContentRating, Genre, Movie, MovieId};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::provider::{CatalogError, CatalogProvider};
use crate::types::{CatalogPage, DiscoverQuery};

const CERTIFICATION_COUNTRY: &str = "US";

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    page: u32,
    total_pages: u32,
    results: Vec<MovieSummary>,
}

#[derive(Debug, Deserialize)]
struct MovieSummary {
    id: MovieId,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    popularity: f32,
    #[serde(default)]
    vote_average: f32,
}

#[derive(Debug, Deserialize)]
struct MovieDetails {
    id: MovieId,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    genres: Vec<GenreEntry>,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    popularity: f32,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    release_dates: Option<ReleaseDates>,
}

#[derive(Debug, Deserialize)]
struct GenreEntry {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct ReleaseDates {
    results: Vec<CountryReleases>,
}

#[derive(Debug, Deserialize)]
struct CountryReleases {
    iso_3166_1: String,
    release_dates: Vec<ReleaseEntry>,
}

#[derive(Debug, Deserialize)]
struct ReleaseEntry {
    #[serde(default)]
    certification: String,
}

fn release_year(date: Option<&str>) -> Option<u16> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

impl MovieSummary {
    /// Discovery results carry no certification. It is left unset here and
    /// resolved per movie through the detail endpoint.
    fn into_movie(self) -> Movie {
        Movie {
            id: self.id,
            title: self.title,
            year: release_year(self.release_date.as_deref()),
            poster_path: self.poster_path,
            genres: self
                .genre_ids
                .into_iter()
                .filter_map(Genre::from_catalog_id)
                .collect(),
            content_rating: None,
            overview: self.overview,
            popularity: self.popularity,
            vote_average: self.vote_average,
        }
    }
}

impl MovieDetails {
    fn certification(&self) -> Option<ContentRating> {
        self.release_dates
            .as_ref()?
            .results
            .iter()
            .find(|c| c.iso_3166_1 == CERTIFICATION_COUNTRY)?
            .release_dates
            .iter()
            .find_map(|r| r.certification.parse().ok())
    }

    fn into_movie(self) -> Movie {
        let content_rating = self.certification();
        Movie {
            id: self.id,
            title: self.title,
            year: release_year(self.release_date.as_deref()),
            poster_path: self.poster_path,
            genres: self
                .genres
                .into_iter()
                .filter_map(|g| Genre::from_catalog_id(g.id))
                .collect(),
            content_rating,
            overview: self.overview,
            popularity: self.popularity,
            vote_average: self.vote_average,
        }
    }
}

/// Client for a TMDB-style `/discover/movie` + `/movie/{id}` API.
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("movie-night")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn discover_params(query: &DiscoverQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort_by", "popularity.desc".to_string()),
            ("include_adult", "false".to_string()),
            ("page", query.page.to_string()),
        ];

        if !query.with_genres.is_empty() {
            params.push(("with_genres", join_ids(&query.with_genres, "|")));
        }
        if !query.without_genres.is_empty() {
            params.push(("without_genres", join_ids(&query.without_genres, ",")));
        }
        if let Some(ceiling) = query.max_rating {
            params.push(("certification_country", CERTIFICATION_COUNTRY.to_string()));
            params.push(("certification.lte", ceiling.as_str().to_string()));
        }

        params
    }
}

fn join_ids<'a>(genres: impl IntoIterator<Item = &'a Genre>, sep: &str) -> String {
    genres
        .into_iter()
        .map(|g| g.catalog_id().to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

#[async_trait]
impl CatalogProvider for HttpCatalog {
    fn name(&self) -> &str {
        "tmdb"
    }

    #[instrument(skip(self, query), fields(page = query.page))]
    async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
        let url = format!("{}/discover/movie", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&Self::discover_params(query))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body: DiscoverResponse = serde_json::from_slice(&response.bytes().await?)?;
        debug!(results = body.results.len(), "Fetched discovery page");

        Ok(CatalogPage {
            page: body.page,
            total_pages: body.total_pages,
            results: body
                .results
                .into_iter()
                .map(MovieSummary::into_movie)
                .collect(),
        })
    }

    #[instrument(skip(self))]
    async fn movie_details(&self, id: MovieId) -> Result<Option<Movie>, CatalogError> {
        let url = format!("{}/movie/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("append_to_response", "release_dates")])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let details: MovieDetails = serde_json::from_slice(&response.bytes().await?)?;
                Ok(Some(details.into_movie()))
            }
            status => Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            }),
        }
    }
}
