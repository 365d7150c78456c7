use std::{
    io::{self, BufRead as _},
    sync::{mpsc, Arc},
    thread,
    time::Instant,
};

use anyhow::{bail, Context as _, Result};
use clap::Parser as _;
use nowplaying::{
    lyrics::{LrclibProvider, LyricsSource, NavidromeConfig, NavidromeProvider},
    output::WaybarCustomModule,
    Backend, Capabilities, Command, Config, LyricsProvider, MprisBackend, ProviderChain, Registry,
};

mod args;

/// Registry key of the followed player
const PLAYER: &str = "mpris";

fn main() -> Result<()> {
    let args = args::Args::parse();
    args.init_tracing_subscriber()?;

    let cache_dir = args
        .cache_dir
        .clone()
        .unwrap_or_else(Config::default_cache_dir);
    tracing::debug!(?cache_dir, "Using cover cache");
    let registry = Registry::new(Config::new(cache_dir), Arc::new(lyrics_providers(&args)?));

    let measures = (0..args.measures.get())
        .map(|_| {
            registry.attach(PLAYER, || {
                Ok(Box::new(MprisBackend::connect(args.player.clone())?) as Box<dyn Backend>)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut capabilities = Capabilities::empty();
    if !args.no_cover {
        capabilities |= Capabilities::COVER;
    }
    if !args.no_lyrics {
        capabilities |= Capabilities::LYRICS;
    }
    for measure in &measures {
        measure.register(capabilities);
    }

    let commands = read_commands()?;
    let interval = args.interval();
    let mut last_output = None;
    loop {
        let started = Instant::now();

        for measure in &measures {
            measure.poll();
        }
        let Some(first) = measures.first() else {
            bail!("No measure attached");
        };
        for command in commands.try_iter() {
            tracing::debug!(?command, "Executing command");
            first.execute(command);
        }

        let module = WaybarCustomModule::from_snapshot(&first.snapshot());
        if last_output.as_ref() != Some(&module) {
            module.print().context("Failed to write output")?;
            last_output = Some(module);
        }

        thread::sleep(interval.saturating_sub(started.elapsed()));
    }
}

/// Build the lyrics providers in the order they were given.
fn lyrics_providers(args: &args::Args) -> Result<ProviderChain> {
    let mut providers: Vec<Box<dyn LyricsProvider>> = Vec::new();
    for source in &args.lyrics_provider {
        match source {
            LyricsSource::Lrclib => providers.push(Box::new(LrclibProvider::default())),
            LyricsSource::Navidrome => {
                let (Some(server_url), Some(username), Some(password)) = (
                    args.navidrome_server_url.clone(),
                    args.navidrome_username.clone(),
                    args.navidrome_password.clone(),
                ) else {
                    bail!("Navidrome needs --navidrome-server-url, --navidrome-username and --navidrome-password");
                };
                providers.push(Box::new(NavidromeProvider::new(NavidromeConfig {
                    server_url,
                    username,
                    password,
                })));
            }
        }
    }
    Ok(ProviderChain::new(providers))
}

/// Parse commands from stdin, one per line, on a separate thread.
fn read_commands() -> Result<mpsc::Receiver<Command>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("commands".to_owned())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line.inspect_err(|e| tracing::warn!(?e, "Failed to read stdin")) else {
                    return;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if tx.send(command).is_err() {
                            return;
                        }
                    }
                    Err(e) => tracing::warn!(%line, ?e, "Ignoring invalid command"),
                }
            }
            tracing::debug!("Stdin closed, no more commands");
        })
        .context("Failed to start command reader")?;
    Ok(rx)
}
