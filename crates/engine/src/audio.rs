//! Shared PCM buffer drained by the audio device's pull callback.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to open audio output device: {0}")]
    DeviceOpen(String),
}

/// Decoded track handed to the controller at session start.
///
/// The byte region is opaque to the engine; whatever container it came from
/// was unpacked by the embedding application.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub spec: crate::gfx::AudioSpec,
    pub pcm: Vec<u8>,
}

#[derive(Debug)]
struct DrainState {
    pcm: Vec<u8>,
    cursor: usize,
}

/// Cursor/length pair shared between the render/control loop and the audio
/// notification context.
///
/// The notification context calls [`drain`]; the control loop only reads
/// [`remaining`] (its loop predicate) and flips the paused flag. Nothing
/// orders the two contexts against each other, so both go through one mutex.
///
/// [`drain`]: DrainBuffer::drain
/// [`remaining`]: DrainBuffer::remaining
#[derive(Debug)]
pub struct DrainBuffer {
    state: Mutex<DrainState>,
    paused: AtomicBool,
}

impl DrainBuffer {
    pub fn new(pcm: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(DrainState { pcm, cursor: 0 }),
            paused: AtomicBool::new(false),
        }
    }

    /// Bytes not yet consumed. Playback ends when this reaches zero.
    pub fn remaining(&self) -> usize {
        let state = self.state.lock();
        state.pcm.len() - state.cursor
    }

    /// Mirrors the session pause flag into the drain path.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Fills `dest` with the next chunk of samples, returning the byte count
    /// written.
    ///
    /// An exhausted buffer writes nothing and returns 0, paused or not.
    /// While paused the device receives silence of `min(requested,
    /// remaining)` bytes and the cursor stays put: pausing freezes
    /// consumption, it does not discard buffered audio. Otherwise up to
    /// `remaining` bytes are copied and consumed.
    ///
    /// Called from the audio notification context; must never block beyond
    /// the short lock it takes here.
    pub fn drain(&self, dest: &mut [u8]) -> usize {
        let mut state = self.state.lock();
        let remaining = state.pcm.len() - state.cursor;
        if remaining == 0 {
            return 0;
        }
        let count = dest.len().min(remaining);
        if self.paused.load(Ordering::Acquire) {
            dest[..count].fill(0);
            return count;
        }
        let cursor = state.cursor;
        dest[..count].copy_from_slice(&state.pcm[cursor..cursor + count]);
        state.cursor += count;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(bytes: &[u8]) -> DrainBuffer {
        DrainBuffer::new(bytes.to_vec())
    }

    #[test]
    fn zero_length_request_is_idempotent() {
        let buffer = buffer_with(&[1, 2, 3]);
        assert_eq!(buffer.drain(&mut []), 0);
        assert_eq!(buffer.remaining(), 3);
    }

    #[test]
    fn drain_copies_and_consumes() {
        let buffer = buffer_with(&[10, 20, 30, 40]);
        let mut dest = [0u8; 3];
        assert_eq!(buffer.drain(&mut dest), 3);
        assert_eq!(dest, [10, 20, 30]);
        assert_eq!(buffer.remaining(), 1);
    }

    #[test]
    fn oversized_request_returns_exactly_remaining() {
        let buffer = buffer_with(&[7, 8]);
        let mut dest = [0u8; 16];
        assert_eq!(buffer.drain(&mut dest), 2);
        assert_eq!(&dest[..2], &[7, 8]);
        assert_eq!(buffer.remaining(), 0);
        // Exhausted: further requests write nothing.
        let mut dest = [0xffu8; 4];
        assert_eq!(buffer.drain(&mut dest), 0);
        assert_eq!(dest, [0xff; 4]);
    }

    #[test]
    fn paused_drain_fills_silence_without_consuming() {
        let buffer = buffer_with(&[5, 6, 7]);
        buffer.set_paused(true);
        let mut dest = [0xaau8; 8];
        // Oversized request while paused still caps at remaining.
        assert_eq!(buffer.drain(&mut dest), 3);
        assert_eq!(&dest[..3], &[0, 0, 0]);
        assert_eq!(buffer.remaining(), 3);

        buffer.set_paused(false);
        let mut dest = [0u8; 3];
        assert_eq!(buffer.drain(&mut dest), 3);
        assert_eq!(dest, [5, 6, 7]);
    }

    #[test]
    fn exhausted_buffer_returns_zero_even_when_paused() {
        let buffer = buffer_with(&[]);
        buffer.set_paused(true);
        let mut dest = [1u8; 4];
        assert_eq!(buffer.drain(&mut dest), 0);
        assert_eq!(dest, [1; 4]);
    }
}
