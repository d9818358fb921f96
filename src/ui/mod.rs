pub mod piano;
pub mod screens;

pub use screens::{FREE_PLAY, GameAreas, draw_game, draw_song_select};
