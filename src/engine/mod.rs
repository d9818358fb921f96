use anyhow::anyhow;
use midly::MidiMessage;
use midly::num::u7;

pub mod midi_out;

pub const SUSTAIN_CONTROLLER: u8 = 64;
pub const VOLUME_CONTROLLER: u8 = 7;
pub const ALL_NOTES_OFF_CONTROLLER: u8 = 123;
pub const DEFAULT_VELOCITY: u8 = 100;

fn data_byte(value: u8) -> u7 {
    u7::new(value.min(127))
}

/// Anything that can sound MIDI channel messages for the piano.
///
/// The engine does not own the synthesizer's lifetime: it is handed an open
/// connection and only sends through it.
pub trait SynthEngine {
    /// Emit a single channel message.
    fn send(&mut self, message: MidiMessage) -> anyhow::Result<()>;

    fn note_on(&mut self, key: u8, velocity: u8) -> anyhow::Result<()> {
        if velocity == 0 {
            return Err(anyhow!("velocity must be greater than 0..!"));
        }

        self.send(MidiMessage::NoteOn {
            key: data_byte(key),
            vel: data_byte(velocity),
        })
    }

    fn note_off(&mut self, key: u8) -> anyhow::Result<()> {
        self.send(MidiMessage::NoteOff {
            key: data_byte(key),
            vel: u7::new(0),
        })
    }

    fn control_change(&mut self, controller: u8, value: u8) -> anyhow::Result<()> {
        self.send(MidiMessage::Controller {
            controller: data_byte(controller),
            value: data_byte(value),
        })
    }

    fn program_change(&mut self, program: u8) -> anyhow::Result<()> {
        self.send(MidiMessage::ProgramChange {
            program: data_byte(program),
        })
    }

    fn set_sustain(&mut self, on: bool) -> anyhow::Result<()> {
        self.control_change(SUSTAIN_CONTROLLER, if on { 127 } else { 0 })
    }

    fn set_volume(&mut self, value: u8) -> anyhow::Result<()> {
        self.control_change(VOLUME_CONTROLLER, value)
    }

    fn all_notes_off(&mut self) -> anyhow::Result<()> {
        self.control_change(ALL_NOTES_OFF_CONTROLLER, 0)
    }
}

/// Keeps every message it is asked to send.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub sent: Vec<MidiMessage>,
}

#[cfg(test)]
impl RecordingEngine {
    pub fn note_ons(&self) -> Vec<u8> {
        self.sent
            .iter()
            .filter_map(|m| match m {
                MidiMessage::NoteOn { key, .. } => Some(key.as_int()),
                _ => None,
            })
            .collect()
    }

    pub fn note_offs(&self) -> Vec<u8> {
        self.sent
            .iter()
            .filter_map(|m| match m {
                MidiMessage::NoteOff { key, .. } => Some(key.as_int()),
                _ => None,
            })
            .collect()
    }

    pub fn controls(&self) -> Vec<(u8, u8)> {
        self.sent
            .iter()
            .filter_map(|m| match m {
                MidiMessage::Controller { controller, value } => {
                    Some((controller.as_int(), value.as_int()))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl SynthEngine for RecordingEngine {
    fn send(&mut self, message: MidiMessage) -> anyhow::Result<()> {
        self.sent.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn helpers_build_channel_messages() {
        let mut engine = RecordingEngine::default();

        engine.note_on(60, DEFAULT_VELOCITY).unwrap();
        engine.note_off(60).unwrap();
        engine.set_sustain(true).unwrap();
        engine.set_sustain(false).unwrap();
        engine.set_volume(200).unwrap();
        engine.all_notes_off().unwrap();
        engine.program_change(40).unwrap();

        assert_eq!(engine.note_ons(), vec![60]);
        assert_eq!(engine.note_offs(), vec![60]);
        assert_eq!(
            engine.controls(),
            vec![(64, 127), (64, 0), (7, 127), (123, 0)]
        );
        assert_eq!(
            engine.sent.last(),
            Some(&MidiMessage::ProgramChange {
                program: u7::new(40)
            })
        );
    }

    #[test]
    fn silent_note_on_is_rejected() {
        let mut engine = RecordingEngine::default();
        assert!(engine.note_on(60, 0).is_err());
        assert!(engine.sent.is_empty());
    }
}
