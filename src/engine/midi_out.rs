use crate::engine::SynthEngine;
use anyhow::{Result, anyhow, bail};
use log::{debug, info, warn};
use midir::{MidiOutput, MidiOutputConnection};
use midly::MidiMessage;
use midly::live::LiveEvent;
use midly::num::u4;

const CLIENT_NAME: &str = "termpiano";
const PORT_NAME: &str = "termpiano output";

/// Sends piano messages to a system MIDI output port.
///
/// Without a connection every message is dropped, so the game stays playable
/// (silently) on machines that have no synthesizer.
pub struct MidiOutEngine {
    channel: u4,
    connection: Option<MidiOutputConnection>,
    port_name: Option<String>,
    buffer: Vec<u8>,
}

impl std::fmt::Debug for MidiOutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiOutEngine")
            .field("channel", &self.channel)
            .field("port_name", &self.port_name)
            .finish()
    }
}

impl MidiOutEngine {
    pub fn silent() -> Self {
        Self {
            channel: u4::new(0),
            connection: None,
            port_name: None,
            buffer: Vec::with_capacity(3),
        }
    }

    /// Opens an output port.
    ///
    /// With a `filter`, the first port whose name contains it (ignoring case) is
    /// used and a missing match is an error. Without one, the first available
    /// port is used, then a virtual port where the platform supports it, then
    /// silence.
    pub fn connect(filter: Option<&str>) -> Result<Self> {
        let output = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to initialise MIDI output: {}", e))?;

        let ports = output.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|port| output.port_name(port).unwrap_or_else(|_| "<unnamed>".into()))
            .collect();
        debug!("MIDI output ports: {:?}", names);

        let chosen = match filter {
            Some(filter) => {
                let needle = filter.to_lowercase();
                match names.iter().position(|n| n.to_lowercase().contains(&needle)) {
                    Some(i) => Some(i),
                    None => bail!(
                        "No MIDI output port matching '{}'..! Available: {:?}",
                        filter,
                        names
                    ),
                }
            }
            None => (!ports.is_empty()).then_some(0),
        };

        if let Some(i) = chosen {
            let connection = output
                .connect(&ports[i], PORT_NAME)
                .map_err(|e| anyhow!("Failed to connect to MIDI port '{}': {}", names[i], e))?;
            info!("Connected to MIDI output port '{}'..!", names[i]);

            return Ok(Self {
                connection: Some(connection),
                port_name: Some(names[i].clone()),
                ..Self::silent()
            });
        }

        Ok(Self::virtual_or_silent(output))
    }

    #[cfg(unix)]
    fn virtual_or_silent(output: MidiOutput) -> Self {
        use midir::os::unix::VirtualOutput;

        match output.create_virtual(PORT_NAME) {
            Ok(connection) => {
                info!(
                    "No MIDI output ports found, created virtual port '{}' for a synth to listen on..!",
                    PORT_NAME
                );
                Self {
                    connection: Some(connection),
                    port_name: Some(PORT_NAME.to_owned()),
                    ..Self::silent()
                }
            }
            Err(why) => {
                warn!("No MIDI output available, playing silently..! why: {}", why);
                Self::silent()
            }
        }
    }

    #[cfg(not(unix))]
    fn virtual_or_silent(_output: MidiOutput) -> Self {
        warn!("No MIDI output ports found, playing silently..!");
        Self::silent()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn close(mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            debug!("Closed MIDI output connection..!");
        }
    }
}

/// Encodes a channel message as raw MIDI bytes into `buffer`.
pub fn encode(channel: u4, message: MidiMessage, buffer: &mut Vec<u8>) -> Result<()> {
    buffer.clear();
    LiveEvent::Midi { channel, message }
        .write_std(&mut *buffer)
        .map_err(|e| anyhow!("Failed to encode MIDI message {:?}: {}", message, e))
}

impl SynthEngine for MidiOutEngine {
    fn send(&mut self, message: MidiMessage) -> Result<()> {
        let Some(connection) = self.connection.as_mut() else {
            return Ok(());
        };

        encode(self.channel, message, &mut self.buffer)?;
        connection
            .send(&self.buffer)
            .map_err(|e| anyhow!("Failed to send MIDI bytes {:02X?}: {}", self.buffer, e))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use midly::num::u7;

    #[test]
    fn encodes_status_bytes() {
        let mut buffer = Vec::new();

        encode(
            u4::new(0),
            MidiMessage::NoteOn {
                key: u7::new(60),
                vel: u7::new(100),
            },
            &mut buffer,
        )
        .unwrap();
        assert_eq!(buffer, vec![0x90, 60, 100]);

        encode(
            u4::new(0),
            MidiMessage::Controller {
                controller: u7::new(64),
                value: u7::new(127),
            },
            &mut buffer,
        )
        .unwrap();
        assert_eq!(buffer, vec![0xB0, 64, 127]);

        encode(
            u4::new(0),
            MidiMessage::ProgramChange { program: u7::new(5) },
            &mut buffer,
        )
        .unwrap();
        assert_eq!(buffer, vec![0xC0, 5]);
    }

    #[test]
    fn silent_engine_swallows_messages() {
        let mut engine = MidiOutEngine::silent();
        assert!(!engine.is_connected());
        assert!(engine.note_on(60, 100).is_ok());
        assert!(engine.all_notes_off().is_ok());
        assert_eq!(engine.port_name(), None);
    }
}
