use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const VERSION_STRING: &str = "TermPiano version: 1.0.0";

#[derive(Parser, Debug)]
#[command(
    name = "termpiano",
    about = "An interactive terminal piano with a falling-notes rhythm game!"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launches the terminal piano application.
    Play(PlayArgs),

    /// Lists the songs available to play.
    Songs(SongArgs),

    /// Shows the version number.
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SongArgs {
    /// YAML file with extra songs. May be given more than once.
    #[arg(long = "song-file")]
    pub song_files: Vec<PathBuf>,

    /// MIDI file to import as a song. May be given more than once.
    #[arg(long = "midi-file")]
    pub midi_files: Vec<PathBuf>,

    /// Transpose imported MIDI files in semitones (positive or negative).
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    pub transpose: i32,
}

#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    #[command(flatten)]
    pub songs: SongArgs,

    /// Skip the song menu and start on the song with this title.
    #[arg(short, long)]
    pub song: Option<String>,

    /// Connect to the first MIDI output port whose name contains this text.
    #[arg(short, long)]
    pub port: Option<String>,

    /// Instrument to start with: a General MIDI program number (0-127) or part of its name.
    #[arg(short, long, default_value = "0")]
    pub instrument: String,

    /// Starting channel volume (0-127).
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=127))]
    pub volume: u8,

    /// How fast notes fall, in rows per second.
    #[arg(long = "fall-speed", default_value_t = 12.0)]
    pub fall_speed: f64,

    /// Frame updates per second.
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Height of the hit window at the bottom of the note field, in rows.
    #[arg(long = "hit-window", default_value_t = 10.0)]
    pub hit_window: f64,

    /// Write log output to this file (the terminal is busy drawing the game).
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Dry run (log the first dry_run_max events of the chosen song and exit).
    #[arg(short, long, default_value_t = false)]
    pub dry_run: bool,

    /// Maximum events to print in dry run.
    #[arg(long, default_value_t = 80)]
    pub dry_run_max: usize,

    /// Logs every spawn, hit and miss.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Tunables of the timing and scoring engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    pub fall_speed: f64,
    pub frame_rate: f64,
    pub hit_window: f64,
    pub verbose: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            fall_speed: 12.0,
            frame_rate: 60.0,
            hit_window: 10.0,
            verbose: false,
        }
    }
}

impl From<&PlayArgs> for GameConfig {
    fn from(args: &PlayArgs) -> Self {
        Self {
            fall_speed: args.fall_speed.max(0.0),
            frame_rate: f64::from(args.fps.max(1)),
            hit_window: args.hit_window.max(0.0),
            verbose: args.verbose,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn play_defaults() {
        let cli = Cli::try_parse_from(["termpiano", "play"]).unwrap();
        let Command::Play(args) = cli.command else {
            panic!("expected the play command");
        };

        assert_eq!(args.instrument, "0");
        assert_eq!(args.volume, 100);
        assert!(args.song.is_none());
        assert_eq!(GameConfig::from(&args), GameConfig::default());
    }

    #[test]
    fn play_options() {
        let cli = Cli::try_parse_from([
            "termpiano",
            "play",
            "--song",
            "Twinkle Twinkle Little Star",
            "--fps",
            "30",
            "--song-file",
            "a.yaml",
            "--song-file",
            "b.yaml",
            "--transpose",
            "-12",
        ])
        .unwrap();
        let Command::Play(args) = cli.command else {
            panic!("expected the play command");
        };

        assert_eq!(args.song.as_deref(), Some("Twinkle Twinkle Little Star"));
        assert_eq!(args.songs.song_files.len(), 2);
        assert_eq!(args.songs.transpose, -12);
        assert_eq!(GameConfig::from(&args).frame_rate, 30.0);
    }

    #[test]
    fn rejects_out_of_range_volume() {
        assert!(Cli::try_parse_from(["termpiano", "play", "--volume", "128"]).is_err());
    }

    #[test]
    fn version_command() {
        let cli = Cli::try_parse_from(["termpiano", "version"]).unwrap();
        assert!(matches!(cli.command, Command::Version));
    }
}
