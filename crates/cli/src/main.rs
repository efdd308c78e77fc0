use anyhow::{Context, Result, anyhow};
use catalog::{CachedCatalog, CatalogProvider, FileCatalog, HttpCatalog};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use engine::{ActorContext, CreateRoundRequest, EngineConfig, RoundEngine};
use model::{
    ContentRating, Genre, GroupId, MemberId, Movie, MovieId, PreferenceProfile, RatingScore,
    RoundId, RoundStatus, VoteDirection,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use store::{GroupRecord, MemoryStore, RoundStore};
use uuid::Uuid;

/// movie-night - pick tonight's family movie
#[derive(Parser)]
#[command(name = "movie-night")]
#[command(about = "Suggest, vote on and pick a movie for family movie night", long_about = None)]
struct Cli {
    /// JSON snapshot holding groups, rounds, votes and ratings
    #[arg(long, env = "MOVIE_NIGHT_STATE", default_value = "movie-night.json")]
    state: PathBuf,

    /// Offline catalog dump; used instead of the HTTP catalog when given
    #[arg(long, env = "MOVIE_NIGHT_CATALOG")]
    catalog: Option<PathBuf>,

    /// API key for the HTTP catalog
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "TMDB_BASE_URL", default_value = "https://api.themoviedb.org/3")]
    base_url: String,

    /// Engine config file (JSON); missing fields take their defaults
    #[arg(long, env = "MOVIE_NIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured slate size
    #[arg(long, env = "MOVIE_NIGHT_SLATE_SIZE")]
    slate_size: Option<usize>,

    /// Acting member, by display name
    #[arg(long = "as", global = true)]
    actor: Option<String>,

    /// Act on behalf of another member of the same group
    #[arg(long = "for", global = true)]
    on_behalf_of: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a group with its members
    Seed {
        /// Group name
        #[arg(long)]
        group: String,

        /// Member display name; repeat for each member
        #[arg(long = "member", required = true)]
        members: Vec<String>,
    },

    /// Set the acting member's taste profile
    Prefs {
        #[arg(long = "like", value_delimiter = ',')]
        liked: Vec<Genre>,

        #[arg(long = "dislike", value_delimiter = ',')]
        disliked: Vec<Genre>,

        /// Most permissive content rating, e.g. PG
        #[arg(long)]
        max_rating: Option<ContentRating>,
    },

    /// Save a movie to the group's watchlist
    Watchlist {
        #[arg(long)]
        movie: MovieId,
    },

    /// Start a round and print its slate
    CreateRound {
        /// Attending members by name; defaults to the whole group
        #[arg(long = "attendee")]
        attendees: Vec<String>,

        /// Movies to keep off the slate
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<MovieId>,

        /// Fold the group's watchlist into the candidates
        #[arg(long)]
        watchlist: bool,
    },

    /// Show a round with live tallies
    Show {
        /// Round id; defaults to the group's latest round
        round: Option<RoundId>,
    },

    /// Vote on a slate movie
    Vote {
        #[arg(long)]
        movie: MovieId,

        #[arg(long, value_enum)]
        direction: Direction,

        round: Option<RoundId>,
    },

    /// Stop voting
    Close { round: Option<RoundId> },

    /// Commit the round's pick
    Pick {
        #[arg(long)]
        movie: MovieId,

        round: Option<RoundId>,
    },

    /// Mark the picked movie as watched
    Watched { round: Option<RoundId> },

    /// Undo a mistaken "watched"
    Unwatch { round: Option<RoundId> },

    /// Rate the watched movie: disliked, okay or loved
    Rate {
        #[arg(long)]
        score: RatingScore,

        round: Option<RoundId>,
    },

    /// Ranked results with ties, pick and ratings
    Results { round: Option<RoundId> },

    /// Abandon a round that has no pick
    Discard { round: Option<RoundId> },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for VoteDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => VoteDirection::Up,
            Direction::Down => VoteDirection::Down,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = Arc::new(load_store(&cli.state)?);

    match &cli.command {
        Commands::Seed { group, members } => handle_seed(&store, group, members).await?,
        Commands::Prefs {
            liked,
            disliked,
            max_rating,
        } => {
            let ctx = resolve_actor(&store, &cli).await?;
            let profile = PreferenceProfile::new(
                ctx.group_id,
                ctx.member_id,
                liked.iter().copied(),
                disliked.iter().copied(),
                *max_rating,
            )?;
            store.put_profile(profile).await?;
            println!("{} Saved preferences", "✓".green());
        }
        Commands::Watchlist { movie } => {
            let ctx = resolve_actor(&store, &cli).await?;
            let catalog = build_catalog(&cli, &load_config(&cli)?, true)?;
            let movie = catalog
                .movie_details(*movie)
                .await?
                .ok_or_else(|| anyhow!("Movie {} not found in catalog", movie))?;
            println!("{} Added {} to the watchlist", "✓".green(), movie.title.bold());
            store.add_to_watchlist(ctx.group_id, movie).await?;
        }
        command => {
            let ctx = resolve_actor(&store, &cli).await?;
            let config = load_config(&cli)?;
            let needs_catalog =
                matches!(command, Commands::CreateRound { .. } | Commands::Pick { .. });
            let catalog = build_catalog(&cli, &config, needs_catalog)?;
            let engine = RoundEngine::new(store.clone(), store.clone(), catalog, config)?;
            let names = member_names(&store).await;
            handle_round_command(&engine, &store, &ctx, &names, command).await?;
        }
    }

    store
        .save(&cli.state)
        .await
        .with_context(|| format!("Failed to save state to {}", cli.state.display()))?;
    Ok(())
}

fn load_store(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        return Ok(MemoryStore::new());
    }
    MemoryStore::load(path).with_context(|| format!("Failed to load state from {}", path.display()))
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&content).context("Invalid engine config")?
        }
        None => EngineConfig::default(),
    };
    if let Some(slate_size) = cli.slate_size {
        config = config.with_slate_size(slate_size);
    }
    config.validate()?;
    Ok(config)
}

/// Pick the catalog backend. Commands that never consult the catalog run
/// against an empty one when nothing is configured.
fn build_catalog(
    cli: &Cli,
    config: &EngineConfig,
    required: bool,
) -> Result<Arc<dyn CatalogProvider>> {
    let inner: Arc<dyn CatalogProvider> = match (&cli.catalog, &cli.api_key) {
        (Some(path), _) => {
            let start = Instant::now();
            let catalog = FileCatalog::from_path(path)
                .with_context(|| format!("Failed to load catalog from {}", path.display()))?;
            tracing::info!("Loaded {} movies in {:?}", catalog.len(), start.elapsed());
            Arc::new(catalog)
        }
        (None, Some(key)) => Arc::new(HttpCatalog::new(cli.base_url.clone(), key.clone())?),
        (None, None) if !required => Arc::new(FileCatalog::new(Vec::new())),
        (None, None) => {
            return Err(anyhow!(
                "No catalog configured: pass --catalog or set TMDB_API_KEY"
            ));
        }
    };
    Ok(Arc::new(CachedCatalog::new(
        inner,
        config.cache_capacity,
        config.cache_ttl(),
    )))
}

async fn find_member(store: &MemoryStore, name: &str) -> Result<(GroupId, MemberId)> {
    store
        .find_member(name)
        .await
        .map(|(group_id, member)| (group_id, member.id))
        .ok_or_else(|| anyhow!("Member {:?} not found", name))
}

/// Build the actor from `--as`, and `--for` when acting for someone else.
async fn resolve_actor(store: &MemoryStore, cli: &Cli) -> Result<ActorContext> {
    let name = cli
        .actor
        .as_deref()
        .ok_or_else(|| anyhow!("This command needs --as <member>"))?;
    let (group_id, member_id) = find_member(store, name).await?;
    let ctx = ActorContext::new(group_id, member_id);

    match cli.on_behalf_of.as_deref() {
        Some(other) => {
            let (other_group, other_id) = find_member(store, other).await?;
            if other_group != group_id {
                return Err(anyhow!("{} is not in {}'s group", other, name));
            }
            Ok(ctx.acting_as(other_id))
        }
        None => Ok(ctx),
    }
}

async fn member_names(store: &MemoryStore) -> HashMap<MemberId, String> {
    store
        .groups()
        .await
        .into_iter()
        .flat_map(|g| g.members)
        .map(|m| (m.id, m.name))
        .collect()
}

/// The explicit round, or the group's most recent one.
async fn round_or_latest(
    store: &MemoryStore,
    ctx: &ActorContext,
    round: Option<RoundId>,
) -> Result<RoundId> {
    if let Some(round) = round {
        return Ok(round);
    }
    store
        .list_rounds(ctx.group_id)
        .await?
        .into_iter()
        .max_by_key(|r| r.created_at)
        .map(|r| r.id)
        .ok_or_else(|| anyhow!("No rounds yet; run create-round first"))
}

/// Handle the 'seed' command
async fn handle_seed(store: &MemoryStore, group: &str, members: &[String]) -> Result<()> {
    for name in members {
        if store.find_member(name).await.is_some() {
            return Err(anyhow!("A member named {:?} already exists", name));
        }
    }

    let group_id = Uuid::new_v4();
    store
        .insert_group(GroupRecord {
            id: group_id,
            name: group.to_string(),
            ..Default::default()
        })
        .await;
    for name in members {
        store.add_member(group_id, name.clone()).await?;
    }

    println!(
        "{} Created group {} with {} members",
        "✓".green(),
        group.bold(),
        members.len()
    );
    Ok(())
}

async fn handle_round_command(
    engine: &RoundEngine,
    store: &MemoryStore,
    ctx: &ActorContext,
    names: &HashMap<MemberId, String>,
    command: &Commands,
) -> Result<()> {
    let name_of = |id: &MemberId| names.get(id).cloned().unwrap_or_else(|| id.to_string());

    match command {
        Commands::CreateRound {
            attendees,
            exclude,
            watchlist,
        } => {
            let attendees = if attendees.is_empty() {
                None
            } else {
                let mut ids = Vec::with_capacity(attendees.len());
                for name in attendees {
                    ids.push(find_member(store, name).await?.1);
                }
                Some(ids)
            };
            let start = Instant::now();
            let created = engine
                .create_round(
                    ctx,
                    CreateRoundRequest {
                        attendees,
                        exclude: exclude.clone(),
                        include_watchlist: *watchlist,
                    },
                )
                .await?;

            println!(
                "{} Round {} created in {:?}",
                "✓".green(),
                created.round.id.to_string().bold(),
                start.elapsed()
            );
            if !created.relaxed_constraints.is_empty() {
                println!(
                    "{} Relaxed: {}",
                    "!".yellow(),
                    created.relaxed_constraints.join(", ")
                );
            }
            if created.slate.is_empty() {
                println!("{}", "No movies fit everyone's limits tonight.".yellow());
            }
            for suggestion in &created.slate {
                print_movie(suggestion.position + 1, &suggestion.movie);
                println!("   {}", suggestion.reason.dimmed());
            }
        }

        Commands::Show { round } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let view = engine.get_round(ctx, round_id).await?;

            println!(
                "{} {} [{}]",
                "Round".bold().blue(),
                view.round.id,
                status_label(view.round.status)
            );
            println!(
                "Voted: {}/{}",
                view.progress.voted, view.progress.attendees
            );
            for entry in &view.slate {
                print_movie(entry.suggestion.position + 1, &entry.suggestion.movie);
                let voters = entry
                    .voters
                    .iter()
                    .map(|v| match v.direction {
                        VoteDirection::Up => format!("+{}", name_of(&v.member_id)),
                        VoteDirection::Down => format!("-{}", name_of(&v.member_id)),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "   {} {}  {}  {}",
                    format!("▲{}", entry.up).green(),
                    format!("▼{}", entry.down).red(),
                    format!("net {}", entry.net).bold(),
                    voters.dimmed()
                );
            }
            if let Some(pick) = &view.pick {
                println!("{} movie {}", "Picked:".bold(), pick.movie_id);
            }
        }

        Commands::Vote {
            movie,
            direction,
            round,
        } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let vote = engine
                .submit_vote(ctx, round_id, *movie, (*direction).into())
                .await?;
            println!(
                "{} {} voted {:?} on {}",
                "✓".green(),
                name_of(&vote.member_id),
                vote.direction,
                vote.movie_id
            );
        }

        Commands::Close { round } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let round = engine.close_round(ctx, round_id).await?;
            println!("{} Round is {}", "✓".green(), status_label(round.status));
        }

        Commands::Pick { movie, round } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let pick = engine.pick_movie(ctx, round_id, *movie).await?;
            println!(
                "{} {} picked movie {}",
                "✓".green(),
                name_of(&pick.picked_by),
                pick.movie_id.to_string().bold()
            );
        }

        Commands::Watched { round } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let pick = engine.mark_watched(ctx, round_id).await?;
            println!("{} Movie {} marked watched", "✓".green(), pick.movie_id);
        }

        Commands::Unwatch { round } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let pick = engine.undo_watched(ctx, round_id).await?;
            println!("{} Movie {} back to unwatched", "✓".green(), pick.movie_id);
        }

        Commands::Rate { score, round } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let rating = engine.submit_rating(ctx, round_id, *score).await?;
            println!(
                "{} {} rated it {:?}",
                "✓".green(),
                name_of(&rating.member_id),
                rating.score
            );
        }

        Commands::Results { round } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let results = engine.get_round_results(ctx, round_id).await?;

            println!(
                "{} {} [{}]",
                "Results".bold().blue(),
                results.round.id,
                status_label(results.round.status)
            );
            for entry in &results.ranking {
                print_movie(entry.rank, &entry.movie);
                let tie = if entry.tied { " (tie)".yellow().to_string() } else { String::new() };
                println!(
                    "   net {} (▲{} ▼{}){}",
                    entry.net, entry.up, entry.down, tie
                );
            }
            if let Some(pick) = &results.pick {
                let watched = if pick.watched { ", watched" } else { "" };
                println!("{} movie {}{}", "Picked:".bold(), pick.movie_id, watched);
            }
            for rating in &results.ratings {
                println!("  {}: {:?}", name_of(&rating.member_id), rating.score);
            }
        }

        Commands::Discard { round } => {
            let round_id = round_or_latest(store, ctx, *round).await?;
            let round = engine.discard_round(ctx, round_id).await?;
            println!("{} Round is {}", "✓".green(), status_label(round.status));
        }

        Commands::Seed { .. } | Commands::Prefs { .. } | Commands::Watchlist { .. } => {
            unreachable!("handled before the engine is built")
        }
    }
    Ok(())
}

fn status_label(status: RoundStatus) -> colored::ColoredString {
    match status {
        RoundStatus::Voting => status.as_str().green(),
        RoundStatus::Closed => status.as_str().yellow(),
        RoundStatus::Discarded => status.as_str().red(),
        _ => status.as_str().cyan(),
    }
}

/// Helper function to format and print a movie line
fn print_movie(rank: usize, movie: &Movie) {
    let genres = movie
        .genres
        .iter()
        .map(|g| g.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let year = movie.year.map(|y| format!(" ({y})")).unwrap_or_default();
    let rating = movie
        .content_rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "NR".to_string());
    println!(
        "{}. {}{} [{}] {} - id {}",
        rank.to_string().green(),
        movie.title,
        year,
        genres,
        rating.dimmed(),
        movie.id
    );
}
