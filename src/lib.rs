mod app;
mod engine;
mod game;
mod midi_importer;
mod model;
mod scheduler;
mod session;
mod ui;
mod util;

pub use app::*;
pub use engine::midi_out::*;
pub use engine::*;
pub use game::*;
pub use midi_importer::*;
pub use model::catalog::*;
pub use model::config::*;
pub use model::instruments::*;
pub use model::keyboard::*;
pub use model::notes::*;
pub use model::song::*;
pub use scheduler::*;
pub use session::*;
pub use util::*;
