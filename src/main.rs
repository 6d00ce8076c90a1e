//! Binary entrypoint for the guildquest CLI.
//!
//! Commands:
//! - `init` - write a starter `guildquest.toml` and create the data directory
//! - `status` - record counts and process counters
//! - `register` / `login` - create an account or check credentials (passwords are prompted)
//! - `guild ...`, `task ...`, `quest ...` - manage guilds, tasks and quests
//! - `complete <task> --user <id>` - record a completion and grant its reward
//! - `stats`, `leaderboard`, `completions` - read-only views
//!
//! Events raised by a command are printed as JSON lines after its result.
//! See the library crate docs for module-level details: `guildquest::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;

use guildquest::config::Config;
use guildquest::game::{
    self, CompletionFilter, GameStore, GameStoreBuilder, NewQuest, NewTask, QuestType, TaskFilter,
    TaskType,
};
use guildquest::metrics;
use guildquest::notify::{NotificationChannel, NotificationHub, Subscription};

#[derive(Parser)]
#[command(name = "guildquest")]
#[command(about = "Reward and progression engine for guild task tracking")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "guildquest.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show record counts and counters
    Status,
    /// Register a new account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
    },
    /// Check an email/password pair
    Login {
        #[arg(short, long)]
        email: String,
    },
    /// Guild management
    Guild {
        #[command(subcommand)]
        action: GuildAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Record that a user completed a task
    Complete {
        task_id: String,
        #[arg(short, long)]
        user: String,
    },
    /// Quest management
    Quest {
        #[command(subcommand)]
        action: QuestAction,
    },
    /// Lifetime totals for a user
    Stats { user_id: String },
    /// Users ranked by level then XP
    Leaderboard {
        #[arg(short, long)]
        guild: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// List completions, newest first
    Completions {
        #[arg(short, long)]
        user: Option<String>,
        #[arg(short, long)]
        task: Option<String>,
    },
}

#[derive(Subcommand)]
enum GuildAction {
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    List,
    /// Guild record plus its member roster
    Show { guild_id: String },
    Join {
        guild_id: String,
        #[arg(short, long)]
        user: String,
    },
    Leave {
        guild_id: String,
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    Add {
        title: String,
        #[arg(short, long)]
        guild: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// daily, weekly or monthly
        #[arg(short = 't', long = "type", default_value = "daily")]
        task_type: TaskType,
        #[arg(long)]
        xp: Option<u64>,
        #[arg(long)]
        gold: Option<u64>,
        #[arg(long)]
        created_by: Option<String>,
    },
    List {
        #[arg(short, long)]
        guild: Option<String>,
        #[arg(short = 't', long = "type")]
        task_type: Option<TaskType>,
    },
    Delete { task_id: String },
}

#[derive(Subcommand)]
enum QuestAction {
    Add {
        title: String,
        #[arg(short, long)]
        guild: String,
        #[arg(long)]
        goal: u32,
        #[arg(short, long, default_value = "")]
        description: String,
        /// team or raid
        #[arg(short = 't', long = "type", default_value = "team")]
        quest_type: QuestType,
        #[arg(long, default_value_t = 0)]
        xp: u64,
        #[arg(long, default_value_t = 0)]
        gold: u64,
        /// Reward item id (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,
    },
    List {
        #[arg(short, long)]
        guild: Option<String>,
    },
    /// Advance a quest by one step
    Progress { quest_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config, so there is nothing to load yet
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load_if_present(&cli.config).await?,
    };
    init_logging(&pre_config, cli.verbose);

    if let Commands::Init = cli.command {
        info!("Initializing new guildquest configuration");
        let cfg = Config::default();
        let serialized = toml::to_string_pretty(&cfg)?;
        tokio::fs::write(&cli.config, serialized).await?;
        tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
        info!("Configuration file created at {}", cli.config);
        println!("Wrote {} (data in {})", cli.config, cfg.storage.data_dir);
        return Ok(());
    }

    let config = match pre_config {
        Some(config) => config,
        None => {
            warn!("No config at {}; using defaults", cli.config);
            Config::default()
        }
    };
    let store = open_store(&config)?;
    let hub = NotificationHub::new();
    let mut observer = hub.subscribe();
    let rules = config.progression_rules();

    match cli.command {
        Commands::Init => {}
        Commands::Status => {
            let counts = store.counts();
            let m = metrics::snapshot();
            println!("{} v{}", config.service.name, env!("CARGO_PKG_VERSION"));
            println!("Database: {}", config.storage.database_path().display());
            println!(
                "Users: {}  Guilds: {}  Tasks: {}  Completions: {}  Quests: {}",
                counts.users, counts.guilds, counts.tasks, counts.completions, counts.quests
            );
            println!(
                "This process: {} completions, {} quest advances, {} events delivered, {} dropped",
                m.tasks_completed, m.quest_advances, m.events_delivered, m.events_dropped
            );
        }
        Commands::Register { username, email } => {
            let pass1 = rpassword::prompt_password("Password: ")?;
            let pass2 = rpassword::prompt_password("Confirm password: ")?;
            if pass1 != pass2 {
                println!("Error: passwords do not match.");
                return Ok(());
            }
            let argon = config.password_hasher();
            print_json(&game::register_user(&store, &argon, &username, &email, &pass1)?)?;
        }
        Commands::Login { email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let argon = config.password_hasher();
            print_json(&game::authenticate(&store, &argon, &email, &password)?)?;
        }
        Commands::Guild { action } => match action {
            GuildAction::Create { name, description } => {
                print_json(&game::create_guild(&store, &name, &description)?)?;
            }
            GuildAction::List => print_json(&game::list_guilds(&store)?)?,
            GuildAction::Show { guild_id } => {
                print_json(&store.get_guild(&guild_id)?)?;
                print_json(&game::guild_roster(&store, &guild_id)?)?;
            }
            GuildAction::Join { guild_id, user } => {
                print_json(&game::join_guild(&store, &hub, &guild_id, &user)?)?;
            }
            GuildAction::Leave { guild_id, user } => {
                print_json(&game::leave_guild(&store, &hub, &guild_id, &user)?)?;
            }
        },
        Commands::Task { action } => match action {
            TaskAction::Add {
                title,
                guild,
                description,
                task_type,
                xp,
                gold,
                created_by,
            } => {
                let request = NewTask {
                    title,
                    description,
                    task_type,
                    guild_id: guild,
                    xp_reward: xp,
                    gold_reward: gold,
                    created_by,
                };
                print_json(&game::create_task(&store, &hub, request)?)?;
            }
            TaskAction::List { guild, task_type } => {
                let filter = TaskFilter {
                    guild_id: guild,
                    task_type,
                };
                print_json(&game::list_tasks(&store, &filter)?)?;
            }
            TaskAction::Delete { task_id } => {
                print_json(&game::delete_task(&store, &task_id)?)?;
            }
        },
        Commands::Complete { task_id, user } => {
            let receipt = game::complete_task(&store, &hub, &rules, &task_id, &user)?;
            print_json(&receipt)?;
        }
        Commands::Quest { action } => match action {
            QuestAction::Add {
                title,
                guild,
                goal,
                description,
                quest_type,
                xp,
                gold,
                items,
            } => {
                let request = NewQuest {
                    title,
                    description,
                    quest_type,
                    guild_id: guild,
                    goal,
                    reward_xp: xp,
                    reward_gold: gold,
                    reward_items: items,
                };
                print_json(&game::create_quest(&store, request)?)?;
            }
            QuestAction::List { guild } => {
                print_json(&game::list_quests(&store, guild.as_deref())?)?;
            }
            QuestAction::Progress { quest_id } => {
                print_json(&game::advance_quest_progress(&store, &hub, &quest_id)?)?;
            }
        },
        Commands::Stats { user_id } => print_json(&game::user_stats(&store, &user_id)?)?,
        Commands::Leaderboard { guild, limit } => {
            let limit = limit.unwrap_or(config.progression.leaderboard_limit);
            print_json(&game::leaderboard(&store, guild.as_deref(), limit)?)?;
        }
        Commands::Completions { user, task } => {
            let filter = CompletionFilter {
                user_id: user,
                task_id: task,
            };
            print_json(&game::list_completions(&store, &filter)?)?;
        }
    }

    print_events(&mut observer)?;
    hub.unsubscribe(observer.id);
    Ok(())
}

fn open_store(config: &Config) -> Result<GameStore> {
    let path = config.storage.database_path();
    let mut builder = GameStoreBuilder::new(&path);
    if let Some(bytes) = config.storage.cache_capacity {
        builder = builder.cache_capacity(bytes);
    }
    let store = builder.open()?;
    info!("Opened game store at {}", path.display());
    Ok(store)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_events(observer: &mut Subscription) -> Result<()> {
    for event in observer.drain() {
        println!("event: {}", event.to_json()?);
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Warn);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });
    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when someone is watching
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
