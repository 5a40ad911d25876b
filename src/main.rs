use blink::{
    autoplay,
    config::{ConfigStore, FileConfigStore},
    progress::{Achievement, HistoryEntry, ProgressStore},
    rules::GameKind,
    stats::StatsDb,
    util::ScoreSummary,
};
use clap::{Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use std::{error::Error, fs::File, io, path::PathBuf};
use time_humanize::HumanTime;

const RECENT_SESSIONS: usize = 5;

/// timed mini-games for short focus breaks
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Three timed mini-games (tap the target, track the moving colour, repeat the sequence) with lifetime points, best scores and streaks. Sessions can be played headless by a scripted player."
)]
pub struct Cli {
    /// progress database to use instead of the default state location
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// play one session with the scripted player and record the result
    Simulate {
        /// game to play
        #[clap(short = 'g', long, value_enum)]
        game: Game,

        /// seed for rounds and the player (overrides the config file)
        #[clap(short = 's', long)]
        seed: Option<u64>,

        /// probability of a correct tap, 0.0 to 1.0 (overrides the config file)
        #[clap(short = 'a', long, value_parser = parse_accuracy)]
        accuracy: Option<f64>,

        /// print the result as JSON
        #[clap(long)]
        json: bool,
    },
    /// show lifetime progress, achievements and recent sessions
    Stats,
    /// export the session history
    History {
        /// destination file, `-` for stdout
        #[clap(long)]
        csv: PathBuf,
    },
    /// clear points, best scores, streak and history
    Reset,
    /// mark onboarding as complete
    Onboard,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
pub enum Game {
    PulseTap,
    FocusShift,
    PatternRecall,
}

impl From<Game> for GameKind {
    fn from(g: Game) -> Self {
        match g {
            Game::PulseTap => GameKind::PulseTap,
            Game::FocusShift => GameKind::FocusShift,
            Game::PatternRecall => GameKind::PatternRecall,
        }
    }
}

fn parse_accuracy(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{v} is not between 0.0 and 1.0"))
    }
}

fn open_db(cli: &Cli) -> Result<StatsDb, Box<dyn Error>> {
    let db = match &cli.db {
        Some(path) => StatsDb::open(path)?,
        None => StatsDb::open_default()?,
    };
    Ok(db)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let mut db = open_db(&cli)?;

    match cli.command {
        Command::Simulate {
            game,
            seed,
            accuracy,
            json,
        } => {
            let mut config = FileConfigStore::new().load();
            if seed.is_some() {
                config.seed = seed;
            }
            if let Some(accuracy) = accuracy {
                config.autoplay.accuracy = accuracy;
            }
            let kind = GameKind::from(game);
            let Some(result) = autoplay::simulate(kind.rules(), &config, &mut db)? else {
                return Err("session did not finish".into());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", kind.title());
                println!("  score          {}", result.score);
                println!("  level          {}", result.level);
                println!("  perfect        {}", result.perfect);
                println!("  earned points  {}", result.earned_points);
                if result.new_best {
                    println!("  new best score!");
                }
                if result.streak_awarded {
                    println!("  streak +1");
                }
            }
        }
        Command::Stats => print_stats(&db)?,
        Command::History { csv } => {
            let rows = if csv.as_os_str() == "-" {
                db.export_history_csv(io::stdout())?
            } else {
                db.export_history_csv(File::create(&csv)?)?
            };
            eprintln!("exported {rows} sessions");
        }
        Command::Reset => {
            db.reset_all()?;
            println!("progress reset");
        }
        Command::Onboard => {
            db.complete_onboarding()?;
            println!("onboarding complete");
        }
    }

    Ok(())
}

fn print_stats(db: &StatsDb) -> Result<(), Box<dyn Error>> {
    let record = db.load()?;
    println!("lifetime points  {}", record.lifetime_points);
    println!("games played     {}", record.games_played);
    println!("current streak   {}", record.current_streak);
    println!("onboarding       {}", if record.onboarding_complete { "done" } else { "pending" });

    println!();
    println!("best scores");
    for game in GameKind::ALL.into_iter().filter(|g| g.rules().tracks_best_score) {
        println!("  {:<15} {}", game.title(), record.best_score(game));
    }

    println!();
    println!("achievements");
    for a in Achievement::ALL {
        let mark = if a.unlocked(&record) { "x" } else { " " };
        println!("  [{mark}] {:<12} {}", a.to_string(), a.description());
    }
    let unlocked = record.achievements();
    if !unlocked.is_empty() {
        println!("  unlocked: {}", unlocked.iter().join(", "));
    }

    let recent = db.recent_sessions(RECENT_SESSIONS)?;
    if recent.is_empty() {
        return Ok(());
    }
    println!();
    println!("recent sessions");
    for entry in &recent {
        println!("  {}", describe(entry));
    }
    let scores: Vec<u32> = recent.iter().map(|e| e.score).collect();
    if let Some(summary) = ScoreSummary::from_scores(&scores) {
        println!(
            "  average score {:.1} (sd {:.1}), best {}",
            summary.mean, summary.std_dev, summary.best
        );
    }
    if let Some(path) = db.path() {
        log::debug!("stats read from {}", path.display());
    }
    Ok(())
}

fn describe(entry: &HistoryEntry) -> String {
    let age = (chrono::Local::now() - entry.played_at).num_seconds().max(0);
    format!(
        "{:<15} score {:>4}  +{:<5} {}",
        entry.game.title(),
        entry.score,
        entry.earned_points,
        HumanTime::from_seconds(-age)
    )
}
