//! Single-slot mailbox for handing a decoded scan line from the UART receive
//! path to the foreground loop without a mutex.
//!
//! The producer (an interrupt or a polling receive task) pushes bytes one at
//! a time with [`ScanBuffer::push_byte`]. Once a full frame has been
//! accumulated the buffer locks itself; further pushes are ignored until the
//! consumer calls [`ScanBuffer::release`]. This mirrors `creader_buff` and its
//! `ISR(USART0_RX_vect)` handler: the index resets to zero whenever the
//! framing bytes don't match, and the lock is owned jointly by the producer
//! (sets it) and the consumer (clears it).

use crate::decoder::FRAME_SIZE;

const LF: u8 = 0x0A;
const CR: u8 = 0x0D;

/// Holds one EM4100 wire frame (`decoder::encode_tag_frame` layout: leading
/// LF, ten hex digits, trailing CR) between producer and consumer.
pub struct ScanBuffer {
    bytes: [u8; FRAME_SIZE],
    index: usize,
    locked: bool,
}

impl ScanBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; FRAME_SIZE],
            index: 0,
            locked: false,
        }
    }

    /// Feed one received byte into the buffer.
    ///
    /// No-op while a completed frame is still locked and unconsumed, so the
    /// producer never overwrites a frame the consumer hasn't read yet.
    pub fn push_byte(&mut self, c: u8) {
        if self.locked {
            return;
        }

        if (self.index == 0 && c != LF) || (self.index == FRAME_SIZE - 1 && c != CR) {
            self.index = 0;
            return;
        }

        self.bytes[self.index] = c;
        self.index += 1;

        if self.index >= FRAME_SIZE {
            self.index = 0;
            // Insert NUL at the framing positions so the id in between reads
            // as a NUL-terminated string, matching `creader_buff.ID_str`.
            self.bytes[0] = 0;
            self.bytes[FRAME_SIZE - 1] = 0;
            self.locked = true;
        }
    }

    /// True once a full, correctly-framed scan is waiting to be consumed.
    pub fn is_ready(&self) -> bool {
        self.locked
    }

    /// Borrow the completed frame. Only meaningful while [`Self::is_ready`].
    /// The framing bytes (LF/CR) have been overwritten with NUL, leaving the
    /// id as a NUL-terminated string starting at index 1.
    pub fn payload(&self) -> &[u8] {
        &self.bytes
    }

    /// The ten hex digits of the scan, without the leading LF / trailing CR.
    pub fn hex_digits(&self) -> &[u8] {
        &self.bytes[1..FRAME_SIZE - 1]
    }

    /// Unlock the buffer so the producer can start accumulating the next
    /// frame. Safe to call when not ready; does nothing in that case.
    pub fn release(&mut self) {
        self.locked = false;
    }
}

impl Default for ScanBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_all(buf: &mut ScanBuffer, bytes: &[u8]) {
        for &b in bytes {
            buf.push_byte(b);
        }
    }

    fn well_formed_frame() -> [u8; FRAME_SIZE] {
        let mut frame = [0u8; FRAME_SIZE];
        frame[0] = LF;
        frame[1..FRAME_SIZE - 1].copy_from_slice(b"0011223344");
        frame[FRAME_SIZE - 1] = CR;
        frame
    }

    /// `payload()` after a completed frame: NUL, ten hex digits, NUL.
    fn nul_terminated(hex: &[u8]) -> [u8; FRAME_SIZE] {
        let mut frame = [0u8; FRAME_SIZE];
        frame[1..FRAME_SIZE - 1].copy_from_slice(hex);
        frame
    }

    #[test]
    fn accepts_a_well_formed_frame() {
        let mut buf = ScanBuffer::new();
        let frame = well_formed_frame();
        push_all(&mut buf, &frame);

        assert!(buf.is_ready());
        assert_eq!(buf.payload(), &nul_terminated(b"0011223344"));
        assert_eq!(buf.hex_digits(), b"0011223344");
    }

    #[test]
    fn resyncs_when_first_byte_is_not_lf() {
        let mut buf = ScanBuffer::new();
        buf.push_byte(b'9');
        assert!(!buf.is_ready());

        let frame = well_formed_frame();
        push_all(&mut buf, &frame);
        assert!(buf.is_ready());
        assert_eq!(buf.payload(), &nul_terminated(b"0011223344"));
    }

    #[test]
    fn resyncs_when_last_byte_is_not_cr() {
        let mut buf = ScanBuffer::new();
        let mut bad = well_formed_frame();
        bad[FRAME_SIZE - 1] = b'X';
        push_all(&mut buf, &bad);
        assert!(!buf.is_ready());

        let good = well_formed_frame();
        push_all(&mut buf, &good);
        assert!(buf.is_ready());
        assert_eq!(buf.payload(), &nul_terminated(b"0011223344"));
    }

    #[test]
    fn release_is_idempotent() {
        let mut buf = ScanBuffer::new();
        push_all(&mut buf, &well_formed_frame());
        assert!(buf.is_ready());

        buf.release();
        assert!(!buf.is_ready());
        buf.release();
        assert!(!buf.is_ready());
    }

    #[test]
    fn locked_buffer_ignores_new_bytes_until_released() {
        let mut buf = ScanBuffer::new();
        let first = well_formed_frame();
        push_all(&mut buf, &first);
        assert!(buf.is_ready());

        let mut second = well_formed_frame();
        second[1..FRAME_SIZE - 1].copy_from_slice(b"9988776655");
        push_all(&mut buf, &second);

        assert_eq!(
            buf.payload(),
            &nul_terminated(&first[1..FRAME_SIZE - 1]),
            "locked frame must survive contention"
        );

        buf.release();
        push_all(&mut buf, &second);
        assert!(buf.is_ready());
        assert_eq!(buf.payload(), &nul_terminated(b"9988776655"));
    }
}
