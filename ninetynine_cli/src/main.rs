use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ninetynine_cli::{
    api::{ApiResponse, GameApi},
    config::Config,
    console::{self, Console},
    protocol::ClientAction,
    session::RoomSession,
    utils,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Poke at a ninetynine game server by hand", long_about = None)]
struct Args {
    /// Server base URL, overrides NINETYNINE_SERVER
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Also write the response body to this JSON file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// POST /register
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: String,
    },
    /// POST /login
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Send the older {username, password, email} body
        #[arg(long)]
        username: Option<String>,
    },
    /// POST /createroom
    CreateRoom {
        #[arg(long)]
        user_id: String,
    },
    /// POST /joinroom
    JoinRoom {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        room_id: String,
    },
    /// POST /accountsetting
    AccountSetting {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
    },
    /// POST any JSON body to any path
    Post {
        #[arg(long, default_value = "/login")]
        path: String,
        /// Inline JSON body
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        /// Read the JSON body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
    /// Join a room over WebSocket and send actions typed at the prompt
    Play {
        /// Room to join
        #[arg(long, required_unless_present = "create_room")]
        room: Option<String>,
        /// Create a fresh room owned by --user-id first
        #[arg(long, conflicts_with = "room")]
        create_room: bool,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        profile_pic: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ninetynine_cli=info,ninetynine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    // A stdin read can still be parked on the blocking pool after the server hangs up.
    runtime.shutdown_timeout(Duration::from_millis(200));
    result
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = Config::from_env()?;
    if let Some(server) = &args.server {
        config = config.with_server(server)?;
    }
    let api = GameApi::new(config)?;

    let shows_room = matches!(
        args.command,
        Command::CreateRoom { .. } | Command::JoinRoom { .. }
    );
    let res = match args.command {
        Command::Play {
            room,
            create_room: _,
            user_id,
            username,
            profile_pic,
        } => {
            let output = args.output.as_deref();
            return play(&api, output, room, user_id, username, profile_pic).await;
        }
        Command::Register {
            username,
            password,
            email,
        } => api.register(&username, &password, &email).await?,
        Command::Login {
            email,
            password,
            username,
        } => api.login(&email, &password, username.as_deref()).await?,
        Command::CreateRoom { user_id } => api.create_room(&user_id).await?,
        Command::JoinRoom { user_id, room_id } => api.join_room(&user_id, &room_id).await?,
        Command::AccountSetting {
            user_id,
            email,
            username,
        } => api.account_setting(&user_id, &email, &username).await?,
        Command::Post {
            path,
            body,
            body_file,
        } => {
            let body = read_body(body, body_file)?;
            api.post_raw(&path, &body).await?
        }
    };

    utils::print_response(&res);
    if shows_room {
        print_room(&res);
    }
    save_output(args.output.as_deref(), &res)?;
    Ok(())
}

fn save_output(output: Option<&Path>, res: &ApiResponse) -> Result<(), Box<dyn Error>> {
    if let Some(path) = output {
        utils::save_json(&res.body, path)?;
    }
    Ok(())
}

fn print_room(res: &ApiResponse) {
    if !res.is_success() {
        return;
    }
    match res.room() {
        Ok(room) => {
            println!("{}", utils::format_room(&room));
            if room.is_full() {
                println!("⚠️ room {} is now full", room.room_id);
            }
        }
        Err(e) => tracing::warn!("response is not a room: {}", e),
    }
}

fn read_body(body: Option<String>, body_file: Option<PathBuf>) -> Result<Value, Box<dyn Error>> {
    if let Some(path) = body_file {
        let text = std::fs::read_to_string(&path)?;
        return Ok(serde_json::from_str(&text)?);
    }
    match body {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(json!({
            "username": "test",
            "password": "123456",
            "email": "test@email.com"
        })),
    }
}

async fn play(
    api: &GameApi,
    output: Option<&Path>,
    room: Option<String>,
    user_id: String,
    username: String,
    profile_pic: String,
) -> Result<(), Box<dyn Error>> {
    let room_id = match room {
        Some(id) => {
            if output.is_some() {
                tracing::warn!("--output only applies with --create-room, nothing to save");
            }
            id
        }
        None => {
            let res = api.create_room(&user_id).await?;
            utils::print_response(&res);
            save_output(output, &res)?;
            if !res.is_success() {
                return Err(format!(
                    "could not create room: {}",
                    res.error_message().unwrap_or("unexpected response")
                )
                .into());
            }
            let room = res.room()?;
            println!("{}", utils::format_room(&room));
            room.room_id
        }
    };

    let url = api.config().room_socket_url(&room_id)?;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            utils::print_event(&event);
        }
    });

    let join = ClientAction::join(user_id, username, profile_pic);
    let session = RoomSession::open(&url, &join, events_tx).await?;
    println!("joined room {room_id}");

    let mut console = Console::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
    console::run(session, &mut console).await?;

    let _ = printer.await;
    Ok(())
}
