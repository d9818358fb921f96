use anyhow::{Context, Result, anyhow};
use clap::Parser;
use env_logger::{Env, Target};
use log::{debug, info};
use std::fs::File;
use termpiano::{
    App, Cli, Command, GameConfig, MidiOutEngine, PlayArgs, Session, SongArgs, VERSION_STRING,
    build_catalog, describe_event, instrument_name, parse_instrument, run_in_terminal,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("{}", VERSION_STRING);
            Ok(())
        }
        Command::Songs(args) => {
            env_logger::init();
            list_songs(&args)
        }
        Command::Play(args) => {
            init_play_logging(&args)?;
            play(&args)
        }
    }
}

/// The game owns the terminal, so play logs go to a file (or nowhere).
fn init_play_logging(args: &PlayArgs) -> Result<()> {
    if args.dry_run {
        env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
        return Ok(());
    }

    match args.log_file.as_ref() {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file '{}'", path.display()))?;
            env_logger::Builder::from_env(Env::default().default_filter_or("info"))
                .target(Target::Pipe(Box::new(file)))
                .init();
        }
        None => {
            env_logger::Builder::from_env(Env::default().default_filter_or("off")).init();
        }
    }

    Ok(())
}

fn list_songs(args: &SongArgs) -> Result<()> {
    let catalog = build_catalog(args)?;

    for song in catalog.songs() {
        println!(
            "{:40} {:>4} events {:>4} notes {:>7.2}s",
            song.title(),
            song.events.len(),
            song.note_count(),
            song.last_offset()
        );
    }

    Ok(())
}

fn play(args: &PlayArgs) -> Result<()> {
    let catalog = build_catalog(&args.songs)?;

    let song = match args.song.as_deref() {
        Some(title) => Some(catalog.get(title).ok_or_else(|| {
            anyhow!(
                "No song titled '{}'..! Available: {:?}",
                title,
                catalog.titles()
            )
        })?),
        None => None,
    };

    if args.dry_run {
        let song = song
            .or_else(|| catalog.songs().first().cloned())
            .ok_or_else(|| anyhow!("No songs to preview..!"))?;

        info!(
            "Previewing at most {} events of '{}'..!",
            args.dry_run_max,
            song.title()
        );
        for (i, event) in song.events.iter().take(args.dry_run_max).enumerate() {
            info!("Event {}: {}", i, describe_event(event));
        }
        return Ok(());
    }

    let program = parse_instrument(&args.instrument);
    info!("Instrument: {} ({})", instrument_name(program), program);

    let synth = MidiOutEngine::connect(args.port.as_deref())?;
    debug!("Synth: {:?}", synth);

    let config = GameConfig::from(args);
    let session = Session::new(synth, config, program, args.volume);
    let mut app = App::new(catalog, session, config.frame_rate);
    if song.is_some() {
        app.open(song);
    }

    let result = run_in_terminal(&mut app);
    app.into_session().into_synth().close();
    result?;

    info!("Exiting..!");
    Ok(())
}
