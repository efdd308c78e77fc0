//! Parser for offline catalog dumps.
//!
//! Format, one movie per line, `::`-separated like the MovieLens `.dat` files:
//!
//! ```text
//! id::Title (Year)::Genre|Genre::RATING::popularity::vote_average::overview
//! ```
//!
//! `RATING` may be empty for uncertified movies; the overview is optional and
//! may itself contain `::`. Lines starting with `#` are comments.

use crate::error::ParseError;
use crate::types::{ContentRating, Genre, Movie};
use std::path::Path;

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a catalog dump from disk.
pub fn parse_catalog(path: &Path) -> Result<Vec<Movie>> {
    let content = std::fs::read_to_string(path)?;
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    parse_catalog_str(&content, &file)
}

/// Parse catalog lines already held in memory. `file` is only used in errors.
pub fn parse_catalog_str(content: &str, file: &str) -> Result<Vec<Movie>> {
    let mut movies = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() || line_trimmed.starts_with('#') {
            continue;
        }

        let err = |reason: String| ParseError::Line {
            file: file.to_string(),
            line: line_no,
            reason,
        };

        let mut parts = line_trimmed.splitn(7, "::");
        let mut next_field = |name: &str| {
            parts
                .next()
                .ok_or_else(|| err(format!("Missing {name}")))
        };

        let id = next_field("id")?;
        let raw_title = next_field("title")?;
        let genres = next_field("genres")?;
        let rating = next_field("rating")?;
        let popularity = next_field("popularity")?;
        let vote_average = next_field("vote_average")?;
        let overview = parts.next().unwrap_or("");

        let (title, year) = split_title_year(raw_title);

        let movie = Movie {
            id: id
                .parse()
                .map_err(|e| err(format!("Invalid id: {e}")))?,
            title,
            year,
            poster_path: None,
            genres: parse_genres(genres).map_err(|e| err(e.to_string()))?,
            content_rating: if rating.trim().is_empty() {
                None
            } else {
                Some(
                    rating
                        .parse::<ContentRating>()
                        .map_err(|e| err(e.to_string()))?,
                )
            },
            overview: overview.trim().to_string(),
            popularity: popularity
                .parse()
                .map_err(|e| err(format!("Invalid popularity: {e}")))?,
            vote_average: vote_average
                .parse()
                .map_err(|e| err(format!("Invalid vote_average: {e}")))?,
        };
        movies.push(movie);
    }

    Ok(movies)
}

fn parse_genres(s: &str) -> crate::error::Result<Vec<Genre>> {
    s.split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::parse)
        .collect()
}

/// Split `"Toy Story (1995)"` into the bare title and year.
fn split_title_year(raw: &str) -> (String, Option<u16>) {
    let raw = raw.trim();
    if let Some(open) = raw.rfind('(') {
        if raw.ends_with(')') {
            if let Ok(year) = raw[open + 1..raw.len() - 1].parse::<u16>() {
                return (raw[..open].trim_end().to_string(), Some(year));
            }
        }
    }
    (raw.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_lines() {
        let content = "\
# id::title::genres::rating::popularity::vote_average::overview
1::Paddington 2 (2017)::Family|Comedy::PG::88.5::7.8::A bear in London.
2::Alien (1979)::Horror|Science Fiction::R::120.0::8.1
3::Home Movie::Documentary::::1.5::6.0::Overview with :: inside
";
        let movies = parse_catalog_str(content, "test.dat").unwrap();
        assert_eq!(movies.len(), 3);

        assert_eq!(movies[0].title, "Paddington 2");
        assert_eq!(movies[0].year, Some(2017));
        assert_eq!(movies[0].genres, vec![Genre::Family, Genre::Comedy]);
        assert_eq!(movies[0].content_rating, Some(ContentRating::Pg));

        assert_eq!(movies[1].genres, vec![Genre::Horror, Genre::SciFi]);
        assert_eq!(movies[1].overview, "");

        assert_eq!(movies[2].year, None);
        assert_eq!(movies[2].content_rating, None);
        assert_eq!(movies[2].overview, "Overview with :: inside");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let content = "1::Ok (2000)::Drama::PG::1::5\nx::Bad::Drama::PG::1::5\n";
        let err = parse_catalog_str(content, "bad.dat").unwrap_err();
        match err {
            ParseError::Line { line, file, .. } => {
                assert_eq!(line, 2);
                assert_eq!(file, "bad.dat");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_split_title_year() {
        assert_eq!(
            split_title_year("Toy Story (1995)"),
            ("Toy Story".to_string(), Some(1995))
        );
        assert_eq!(split_title_year("Se7en"), ("Se7en".to_string(), None));
        assert_eq!(
            split_title_year("Film (Director's Cut)"),
            ("Film (Director's Cut)".to_string(), None)
        );
    }
}
