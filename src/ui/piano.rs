use crate::game::Game;
use crate::model::keyboard::{BLACK_KEY_ROWS, BLACK_KEY_WIDTH, KeyLayout};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

/// White keys are two rows taller than the black keys above them.
pub const PIANO_ROWS: u16 = BLACK_KEY_ROWS + 2;

const WHITE_KEY: Color = Color::White;
const BLACK_KEY: Color = Color::Black;
const LIT_KEY: Color = Color::LightYellow;
const HIT_WINDOW: Color = Color::Indexed(236);
const WHITE_NOTE: Color = Color::Cyan;
const BLACK_NOTE: Color = Color::Magenta;

/// The part of `area` the piano (and the note field over it) occupies: the
/// keyboard width, centred.
pub fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y,
        width,
        height: area.height,
    }
}

fn put(buf: &mut Buffer, area: Rect, x: u16, y: u16, symbol: &str, style: Style) {
    if x >= area.width || y >= area.height {
        return;
    }
    if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
        cell.set_symbol(symbol);
        cell.set_style(style);
    }
}

/// The keyboard. Keys for which `is_lit` is true are drawn highlighted.
pub struct PianoWidget<'a, F: Fn(&str) -> bool> {
    layout: &'a KeyLayout,
    is_lit: F,
}

impl<'a, F: Fn(&str) -> bool> PianoWidget<'a, F> {
    pub fn new(layout: &'a KeyLayout, is_lit: F) -> Self {
        Self { layout, is_lit }
    }
}

impl<F: Fn(&str) -> bool> Widget for PianoWidget<'_, F> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = centered(area, self.layout.width());
        let label_row = area.height.saturating_sub(1);

        for key in self.layout.white_keys() {
            let bg = if (self.is_lit)(key.note) { LIT_KEY } else { WHITE_KEY };
            let face = Style::default().bg(bg).fg(Color::DarkGray);

            for y in 0..area.height {
                for dx in 0..key.width {
                    let edge = dx == key.width - 1;
                    put(buf, area, key.x + dx, y, if edge { "▕" } else { " " }, face);
                }
            }

            if let Some(binding) = key.binding {
                let label = binding.to_string();
                put(buf, area, key.x + 1, label_row, &label, face.fg(Color::Black));
            }
        }

        for key in self.layout.black_keys() {
            let bg = if (self.is_lit)(key.note) { LIT_KEY } else { BLACK_KEY };
            let face = Style::default().bg(bg).fg(Color::Gray);

            for y in 0..BLACK_KEY_ROWS.min(area.height) {
                for dx in 0..BLACK_KEY_WIDTH {
                    put(buf, area, key.x + dx, y, " ", face);
                }
            }

            if let Some(binding) = key.binding {
                let label = binding.to_string();
                let row = BLACK_KEY_ROWS.min(area.height).saturating_sub(1);
                put(buf, area, key.x, row, &label, face);
            }
        }
    }
}

/// Falling notes over the hit window. Row 0 is the spawn line; a note's
/// leading edge sits `vertical_position` rows below it and its tail trails
/// upwards in proportion to its duration.
pub struct NoteField<'a> {
    game: &'a Game,
    layout: &'a KeyLayout,
}

impl<'a> NoteField<'a> {
    pub fn new(game: &'a Game, layout: &'a KeyLayout) -> Self {
        Self { game, layout }
    }
}

impl Widget for NoteField<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = centered(area, self.layout.width());
        let (top, _) = self.game.hit_window();
        let window_top = top.max(0.0).floor() as u16;

        for y in window_top..area.height {
            for x in 0..area.width {
                let symbol = if y == window_top { "┄" } else { " " };
                put(buf, area, x, y, symbol, Style::default().bg(HIT_WINDOW).fg(Color::Gray));
            }
        }

        let fall_speed = self.game.config().fall_speed;
        for note in self.game.active_notes() {
            let (width, color) = match self.layout.key(&note.note) {
                Some(key) if key.black => (key.width, BLACK_NOTE),
                Some(key) => (key.width - 1, WHITE_NOTE),
                None => (BLACK_KEY_WIDTH, Color::Red),
            };

            let lead = note.vertical_position.floor() as i64;
            let rows = (note.duration_seconds * fall_speed).round().max(1.0) as i64;
            let style = Style::default().bg(color);

            for y in (lead - rows + 1)..=lead {
                if y < 0 {
                    continue;
                }
                for dx in 0..width {
                    put(buf, area, note.horizontal_position + dx, y as u16, " ", style);
                }
            }
        }
    }
}
