use clap::Parser;
use palaver::core::config::{self, CliOverrides};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "palaver", about = "Terminal chat front end for a hosted assistant")]
struct Args {
    /// Chat service base URL (omit for local-only mode)
    #[arg(long)]
    api_url: Option<String>,

    /// Backdrop image for wide terminals
    #[arg(long)]
    background: Option<String>,

    /// Backdrop image for narrow terminals
    #[arg(long)]
    mobile_background: Option<String>,

    /// Avatar image for your messages
    #[arg(long)]
    user_avatar: Option<String>,

    /// Avatar image for the assistant's messages
    #[arg(long)]
    assistant_avatar: Option<String>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            api_url: args.api_url,
            background: args.background,
            mobile_background: args.mobile_background,
            user_avatar: args.user_avatar,
            assistant_avatar: args.assistant_avatar,
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to palaver.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("palaver.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().map_err(std::io::Error::other)?;
    let resolved = config::resolve(&file_config, &args.into());

    log::info!(
        "Palaver starting up (endpoint: {})",
        resolved
            .endpoint
            .as_ref()
            .map_or("none, local-only", |e| e.base_url.as_str())
    );

    palaver::tui::run(resolved)
}
