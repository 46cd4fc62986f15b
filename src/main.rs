use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context};
use clap::Parser;
use inquire::error::InquireResult;
use tracing_subscriber::EnvFilter;

use vidrelay::{
    classify, embed_url, share_url, BackendLocal, ChannelConfig, Config, KeyValueStore, Library,
    NoticeGateway, TelegramGateway,
};

mod cli;

use cli::{Command, ConfigAction};

fn default_base_path() -> anyhow::Result<PathBuf> {
    let home = homedir::my_home()
        .context("couldnt find home dir")?
        .context("couldnt find home dir")?;
    Ok(home.join(".local/share/vidrelay"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn videos_label(count: usize) -> String {
    format!(
        "You have {count} video{} in your library",
        if count == 1 { "" } else { "s" }
    )
}

fn add(library: &mut Library, gateway: &dyn NoticeGateway, url: &str) -> anyhow::Result<()> {
    let url = url.trim();
    if url.is_empty() {
        bail!("please enter a valid video url");
    }
    url::Url::parse(url).context("please enter a valid url including http:// or https://")?;

    let channel = library.channel_config()?;
    if !channel.is_complete() {
        bail!("telegram configuration missing, run `vidrelay config set` first");
    }

    // don't announce a video that add_video would refuse afterwards
    let source = classify(url);
    if source.platform.is_known() && library.contains(&source.id) {
        bail!("video {} is already in your library", source.id);
    }

    let message_id = gateway.post_notice(url, &channel)?;
    let record = library.add_video(url, Some(message_id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    log::info!("video sent to telegram and added to your library");
    Ok(())
}

fn delete(library: &mut Library, id: &str, yes: bool) -> anyhow::Result<()> {
    let Some(record) = library.get(id) else {
        bail!("video not found: {id}");
    };

    if !yes {
        let prompt = match record.remote_message_id {
            Some(_) => format!(
                "Delete \"{}\" from your library and the telegram channel?",
                record.title
            ),
            None => format!("Delete \"{}\" from your library?", record.title),
        };
        match inquire::prompt_confirmation(prompt) {
            InquireResult::Ok(true) => {}
            InquireResult::Ok(false) => return Ok(()),
            InquireResult::Err(err) => bail!("An error occurred: {}", err),
        }
    }

    library.delete_video(id)?;
    println!("video {id} deleted");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging();

    let base_path = match args.base_path {
        Some(path) => path,
        None => default_base_path()?,
    };

    let config = Config::load_with(&base_path).context("loading config")?;
    let store: Arc<dyn KeyValueStore> =
        Arc::new(BackendLocal::new(&base_path).context("opening data directory")?);
    let gateway = Arc::new(TelegramGateway::new(&config.telegram_api_base));
    let mut library = Library::load(store, gateway.clone()).context("loading library")?;

    match args.command {
        Command::Add { url } => {
            add(&mut library, gateway.as_ref(), &url).context("Error adding video")
        }

        Command::List { count } => {
            if count {
                println!("{}", videos_label(library.len()));
            } else {
                println!("{}", serde_json::to_string_pretty(library.list())?);
            }
            Ok(())
        }

        Command::Delete { id, yes } => {
            delete(&mut library, &id, yes).context("Error deleting video")
        }

        Command::Links { id } => {
            let record = library
                .get(&id)
                .with_context(|| format!("video not found: {id}"))?;
            println!("embed: {}", embed_url(&record.url));
            println!("share: {}", share_url(&record.url));
            Ok(())
        }

        Command::Config { action } => match action {
            ConfigAction::Show {} => {
                let channel = library.channel_config()?;
                println!("bot token:  {}", channel.masked_token());
                println!("channel id: {}", channel.channel_id);
                Ok(())
            }
            ConfigAction::Set {
                bot_token,
                channel_id,
            } => {
                library
                    .save_channel_config(&ChannelConfig::new(bot_token, channel_id))
                    .context("Error saving configuration")?;
                println!("configuration saved");
                Ok(())
            }
        },
    }
}
