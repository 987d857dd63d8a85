//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use quill_core::api::{CommentId, PostId};
use quill_core::{config, logging};

mod commands;
mod context;

use context::AppContext;

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Terminal client for the blog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Browse the post feed
    Feed {
        /// Comma-separated tags to filter by
        #[arg(long, value_name = "TAGS")]
        tags: Option<String>,

        /// Load this many pages and exit instead of reading commands from stdin
        #[arg(long, value_name = "N")]
        pages: Option<u32>,
    },

    /// Read and write posts
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Toggle the like on a post for this device
    Like {
        /// The post to like or unlike
        #[arg(value_name = "POST_ID")]
        id: PostId,

        /// Only show whether this device likes the post
        #[arg(long)]
        status: bool,
    },

    /// Read and write comments
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long, env = "QUILL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in
    Signup {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long, env = "QUILL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show whether the stored session is valid
    Whoami,

    /// Ask an admin for permission to write posts
    RequestAuthor,

    /// Show visitor counts and popular tags
    Sidebar,

    /// Show this device's anonymous id (created on first use)
    Device,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum PostCommands {
    /// Show a post with its comments
    Show {
        #[arg(value_name = "POST_ID")]
        id: PostId,
    },
    /// Publish a new post
    Create {
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Replace an existing post
    Update {
        #[arg(value_name = "POST_ID")]
        id: PostId,

        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Delete a post
    Delete {
        #[arg(value_name = "POST_ID")]
        id: PostId,
    },
    /// Upload an image and print its URL
    UploadImage {
        #[arg(value_name = "PATH")]
        path: std::path::PathBuf,
    },
}

/// Post fields shared by create and update.
#[derive(clap::Args, Debug, Clone)]
struct DraftArgs {
    #[arg(long)]
    title: String,

    /// Post body (markdown)
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    content: Option<String>,

    /// Read the post body from a file
    #[arg(long, value_name = "PATH")]
    file: Option<std::path::PathBuf>,

    /// Comma-separated tags
    #[arg(long, default_value = "")]
    tags: String,
}

#[derive(clap::Subcommand)]
enum CommentCommands {
    /// List comments on a post
    List {
        #[arg(value_name = "POST_ID")]
        post_id: PostId,
    },
    /// Comment on a post (anonymously when --name is given)
    Add {
        #[arg(value_name = "POST_ID")]
        post_id: PostId,

        content: String,

        #[command(flatten)]
        author: AnonymousArgs,
    },
    /// Edit a comment
    Edit {
        #[arg(value_name = "COMMENT_ID")]
        id: CommentId,

        /// Post the comment belongs to
        #[arg(long = "post", value_name = "POST_ID")]
        post_id: PostId,

        content: String,

        #[command(flatten)]
        author: AnonymousArgs,
    },
    /// Delete a comment
    Delete {
        #[arg(value_name = "COMMENT_ID")]
        id: CommentId,

        /// Delete password of an anonymous comment
        #[arg(long)]
        password: Option<String>,
    },
}

/// Identity of an anonymous comment author.
#[derive(clap::Args, Debug, Clone, Default)]
struct AnonymousArgs {
    /// Display name for an anonymous comment
    #[arg(long, requires = "password")]
    name: Option<String>,

    /// Password needed later to edit or delete an anonymous comment
    #[arg(long)]
    password: Option<String>,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config commands must work even when the config file is broken.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        };
    }

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&logging::LogConfig::from_settings(&config.log))
        .unwrap_or_else(|e| {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        });

    let app = AppContext::open(config)?;

    match cli.command {
        Commands::Feed { tags, pages } => commands::feed::run(&app, tags.as_deref(), pages).await,

        Commands::Post { command } => match command {
            PostCommands::Show { id } => commands::posts::show(&app, id).await,
            PostCommands::Create { draft } => commands::posts::create(&app, &draft.into_draft()?).await,
            PostCommands::Update { id, draft } => {
                commands::posts::update(&app, id, &draft.into_draft()?).await
            }
            PostCommands::Delete { id } => commands::posts::delete(&app, id).await,
            PostCommands::UploadImage { path } => commands::posts::upload_image(&app, &path).await,
        },

        Commands::Like { id, status } => {
            if status {
                commands::likes::status(&app, id).await
            } else {
                commands::likes::toggle(&app, id).await
            }
        }

        Commands::Comment { command } => match command {
            CommentCommands::List { post_id } => commands::comments::list(&app, post_id).await,
            CommentCommands::Add {
                post_id,
                content,
                author,
            } => commands::comments::add(&app, post_id, &content, author.name, author.password).await,
            CommentCommands::Edit {
                id,
                post_id,
                content,
                author,
            } => {
                commands::comments::edit(&app, id, post_id, &content, author.name, author.password)
                    .await
            }
            CommentCommands::Delete { id, password } => {
                commands::comments::delete(&app, id, password).await
            }
        },

        Commands::Login { email, password } => {
            commands::auth::login(&app, &email, password).await
        }
        Commands::Signup {
            username,
            email,
            password,
        } => commands::auth::signup(&app, &username, &email, password).await,
        Commands::Logout => commands::auth::logout(&app),
        Commands::Whoami => commands::auth::whoami(&app).await,
        Commands::RequestAuthor => commands::auth::request_author(&app).await,

        Commands::Sidebar => commands::sidebar::show(&app).await,
        Commands::Device => commands::device::show(&app),

        Commands::Config { .. } => Ok(()),
    }
}

impl DraftArgs {
    fn into_draft(self) -> Result<quill_core::api::PostDraft> {
        let content = match (self.content, self.file) {
            (Some(content), _) => content,
            (None, Some(path)) => std::fs::read_to_string(&path)
                .with_context(|| format!("read post body from {}", path.display()))?,
            (None, None) => anyhow::bail!("Provide --content or --file"),
        };
        Ok(quill_core::api::PostDraft::new(self.title, content, &self.tags))
    }
}
