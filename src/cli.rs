use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding the library, telegram settings and config.yaml.
    /// Defaults to ~/.local/share/vidrelay
    #[clap(long, global = true)]
    pub base_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the saved bot token (masked) and channel id
    Show {},
    /// Save bot token and channel id
    Set {
        /// Telegram bot token
        #[clap(long)]
        bot_token: String,

        /// Channel id, e.g. "@yourchannelname" or "-100123456789"
        #[clap(long, allow_hyphen_values = true)]
        channel_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Announce a video in the telegram channel and add it to the library
    Add {
        /// Video url (YouTube, Vimeo, etc.)
        #[clap(allow_hyphen_values = true)]
        url: String,
    },
    /// List videos, newest first
    List {
        /// Print the count
        #[clap(short = 'c', long, default_value = "false")]
        count: bool,
    },
    /// Delete a video from the library and its message from the channel
    Delete {
        /// Video id
        id: String,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },
    /// Print playback and share links of a video
    Links {
        /// Video id
        id: String,
    },
    /// Manage telegram settings
    Config {
        #[clap(subcommand)]
        action: ConfigAction,
    },
}
