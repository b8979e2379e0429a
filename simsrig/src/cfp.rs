//! `.cfp` keyframe streams.
//!
//! A stream holds seven channels back to back (position x/y/z, then the four rotation
//! components). The file does not record how long each channel is; the counts come from the
//! skill that references it.

use crate::input::{BinaryInput, RecordReader};
use crate::{AnimFrameTable, ChannelCounts, Error};

const FORMAT: &str = "animation frames";

const CODE_LITERAL: u8 = 0xFF;
const CODE_REPEAT: u8 = 0xFE;

/// Value added to the previous sample for a delta code. Every byte other than `0xFE` and
/// `0xFF` is a delta code, `0xFD` included.
pub fn delta(code: u8) -> f32 {
    let d = code as f32 - 126.0;
    3.9676e-10 * d * d * d * d.abs()
}

impl AnimFrameTable {
    pub fn from_cfp_bytes(bytes: &[u8], counts: ChannelCounts) -> Result<Self, Error> {
        let mut input = BinaryInput::new(FORMAT, bytes);
        let mut channels: [Vec<f32>; 7] = Default::default();
        for (i, (channel, count)) in channels.iter_mut().zip(counts.as_array()).enumerate() {
            *channel = read_channel(&mut input, count).map_err(|e| with_channel(e, i))?;
        }
        if input.remaining() > 0 {
            log::warn!("{} trailing bytes after animation frames", input.remaining());
        }

        let [px, py, pz, r0, r1, r2, r3] = channels;
        Ok(Self {
            position: [px, py, pz],
            rotation: [r0, r1, r2, r3],
        })
    }
}

fn read_channel(input: &mut BinaryInput<'_>, count: usize) -> Result<Vec<f32>, Error> {
    let mut out = Vec::with_capacity(count.min(1 << 20));
    let mut previous = 0.0f32;
    while out.len() < count {
        match input.read_u8()? {
            CODE_LITERAL => {
                previous = input.read_f32()?;
                out.push(previous);
            }
            CODE_REPEAT => {
                let run = input.read_u16()? as usize + 1;
                if out.len() + run > count {
                    return Err(Error::format(
                        FORMAT,
                        format!(
                            "repeat of {run} overflows channel ({} of {count} filled)",
                            out.len()
                        ),
                    ));
                }
                out.resize(out.len() + run, previous);
            }
            code => {
                previous += delta(code);
                out.push(previous);
            }
        }
    }
    Ok(out)
}

fn with_channel(e: Error, channel: usize) -> Error {
    match e {
        Error::Format { format, message } => Error::Format {
            format,
            message: format!("channel {channel}: {message}"),
        },
        other => other,
    }
}
