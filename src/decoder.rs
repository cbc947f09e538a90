//! Manchester/EM4100 frame decoder.
//!
//! Bit-rate-agnostic: the pipeline only ever asks its [`SampleSource`] for the
//! next binary sample, so the same segmenter/symbol-reader/frame-validator
//! code runs whether the samples come from a GPIO bit-banged off the EM4095
//! demodulator output or from a canned test vector.
//!
//! This is a Rust port of the decode logic in
//! `decoder_firmware.c` (the EM4095-facing board) and `manchester.c` (the
//! desktop analysis tool), unified into one pipeline.

/// Sample-count threshold distinguishing a half-bit run from a full-bit run.
///
/// The decoder board firmware samples at roughly 8 samples per half-bit and
/// uses `TOLERANCE = 4`; the desktop tool used `TOLERANCE = 6` against a
/// lower oversampling capture. We keep the firmware board's value since it
/// is the one actually driving this appliance's antenna front end.
pub const TOLERANCE: u32 = 4;

/// A run longer than this indicates the carrier dropped out entirely.
const MAX_RUN: u32 = TOLERANCE * 8;

/// Number of ASCII hex characters in a decoded tag id.
pub const TAG_HEX_LEN: usize = 10;

/// A decoded EM4100 tag id: 10 uppercase ASCII hex digits.
pub type TagHex = [u8; TAG_HEX_LEN];

/// 12-byte wire frame matching the inter-board UART contract: `0x0A` + 10 hex
/// chars + `0x0D`.
pub const FRAME_SIZE: usize = 12;

/// Source of oversampled binary signal samples, one per tick.
///
/// Implementors must never drop a sample while the decoder is actively
/// consuming — `next_sample` blocks (or otherwise waits) until one is ready.
pub trait SampleSource {
    fn next_sample(&mut self) -> bool;
}

impl<T: SampleSource + ?Sized> SampleSource for &mut T {
    fn next_sample(&mut self) -> bool {
        (**self).next_sample()
    }
}

/// Reasons a decode attempt failed. All of these are local — the caller just
/// restarts the header search at the next scan attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A run of identical samples exceeded the frame budget: the carrier is
    /// gone, or no tag is present.
    SignalLoss,
    /// Row `row` (0-indexed, 0..10) had odd parity.
    BadRowParity { row: usize },
    /// One of the four column parities was odd.
    BadColumnParity,
    /// The trailing stop bit was not 0.
    BadStopBit,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DecodeError::SignalLoss => write!(f, "signal loss: no transition within frame budget"),
            DecodeError::BadRowParity { row } => write!(f, "row {row} failed parity check"),
            DecodeError::BadColumnParity => write!(f, "column parity check failed"),
            DecodeError::BadStopBit => write!(f, "stop bit was not 0"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Run-length segmenter state (`spec.md` §4.2): tracks the current logic
/// level and how many consecutive samples preceded the last change.
struct Segmenter<S: SampleSource> {
    source: S,
    current_logic: bool,
    prev_run_length: u32,
    initialized: bool,
}

impl<S: SampleSource> Segmenter<S> {
    fn new(source: S) -> Self {
        Self {
            source,
            current_logic: false,
            prev_run_length: 0,
            initialized: false,
        }
    }

    /// Reads samples until one differs from `current_logic`, then records the
    /// new logic value and the run length that preceded it.
    ///
    /// The very first call after construction only establishes
    /// `current_logic` — its run length is not meaningful and is not counted
    /// against `MAX_RUN`.
    fn advance_until_change(&mut self) -> Result<(), DecodeError> {
        if !self.initialized {
            self.current_logic = self.source.next_sample();
            self.initialized = true;
        }

        let mut run: u32 = 1;
        loop {
            let sample = self.source.next_sample();
            if sample != self.current_logic {
                self.current_logic = sample;
                self.prev_run_length = run;
                return Ok(());
            }
            run += 1;
            if run > MAX_RUN {
                return Err(DecodeError::SignalLoss);
            }
        }
    }
}

/// Manchester symbol reader (`spec.md` §4.3).
struct SymbolReader<S: SampleSource> {
    seg: Segmenter<S>,
}

impl<S: SampleSource> SymbolReader<S> {
    fn new(source: S) -> Self {
        Self {
            seg: Segmenter::new(source),
        }
    }

    /// Locates a start-of-bit edge: reads samples until a run longer than
    /// [`TOLERANCE`] is seen, then returns the logic value after that run.
    fn first_manchester(&mut self) -> Result<bool, DecodeError> {
        loop {
            self.seg.advance_until_change()?;
            if self.seg.prev_run_length > TOLERANCE {
                return Ok(self.seg.current_logic);
            }
        }
    }

    /// Decodes the next Manchester-encoded logical bit.
    fn next_manchester(&mut self) -> Result<bool, DecodeError> {
        self.seg.advance_until_change()?;
        if self.seg.prev_run_length <= TOLERANCE {
            // Half-bit run: the transition was mid-bit, one more change lands
            // us on the bit boundary.
            self.seg.advance_until_change()?;
            Ok(self.seg.current_logic)
        } else {
            // Full-bit run: no mid-bit transition, so the bit is the inverse
            // of the level we were sitting on.
            Ok(!self.seg.current_logic)
        }
    }
}

fn format_hex_nibble(n: u8) -> u8 {
    match n {
        0..=9 => b'0' + n,
        10..=15 => b'A' + (n - 10),
        _ => unreachable!("nibble out of range: {n}"),
    }
}

/// Runs the full EM4100 frame validator (`spec.md` §4.4) over `source`,
/// returning the 10 decoded hex digits on success.
///
/// On failure the caller should simply call this again to restart the
/// header search — no state survives a failed attempt.
pub fn decode_frame<S: SampleSource>(source: S) -> Result<TagHex, DecodeError> {
    let mut reader = SymbolReader::new(source);

    // Header sync: accumulate consecutive 1s, reset on any 0, until we see 9.
    let mut ones = if reader.first_manchester()? { 1u32 } else { 0u32 };
    while ones < 9 {
        ones = if reader.next_manchester()? { ones + 1 } else { 0 };
    }

    let mut nibbles = [0u8; TAG_HEX_LEN];
    let mut col_parity = [0u8; 4];

    for (row, nibble) in nibbles.iter_mut().enumerate() {
        let mut value = 0u8;
        let mut row_parity = 0u8;
        for j in (0..4).rev() {
            let bit = reader.next_manchester()?;
            if bit {
                value |= 1 << j;
                row_parity += 1;
                col_parity[j] += 1;
            }
        }
        if reader.next_manchester()? {
            row_parity += 1;
        }
        if row_parity & 1 != 0 {
            return Err(DecodeError::BadRowParity { row });
        }
        *nibble = value;
    }

    for parity in col_parity.iter_mut() {
        if reader.next_manchester()? {
            *parity += 1;
        }
        if *parity & 1 != 0 {
            return Err(DecodeError::BadColumnParity);
        }
    }

    if reader.next_manchester()? {
        return Err(DecodeError::BadStopBit);
    }

    let mut hex = [0u8; TAG_HEX_LEN];
    for (dst, &nibble) in hex.iter_mut().zip(nibbles.iter()) {
        *dst = format_hex_nibble(nibble);
    }
    Ok(hex)
}

/// Frames a decoded tag id as the 12-byte inter-board wire frame: `0x0A` + 10
/// hex chars + `0x0D`, matching `spec.md` §6.
pub fn encode_tag_frame(hex: &TagHex) -> [u8; FRAME_SIZE] {
    let mut frame = [0u8; FRAME_SIZE];
    frame[0] = 0x0A;
    frame[1..1 + TAG_HEX_LEN].copy_from_slice(hex);
    frame[FRAME_SIZE - 1] = 0x0D;
    frame
}


/// Hardware sample source bit-banging the EM4095 `DEMOD_OUT` line.
#[cfg(feature = "hw")]
pub mod hw {
    use super::SampleSource;
    use esp_idf_svc::hal::delay::Ets;
    use esp_idf_svc::hal::gpio::{AnyInputPin, Input, PinDriver};

    /// Microsecond delay between samples. A half-bit at the tag's native
    /// 125 kHz / 64 divider bit rate is 256us; this tick must keep a
    /// half-bit run at or below [`super::TOLERANCE`] samples so a merged,
    /// untransitioned full bit (roughly double the run length) reads as
    /// long. 80us yields ~3 samples per half-bit and ~6 per full bit,
    /// which satisfies that with room to spare.
    const SAMPLE_DELAY_US: u32 = 80;

    /// Reads the EM4095 demodulator output on a fixed tick, oversampling the
    /// Manchester signal for the decoder pipeline above.
    pub struct Em4095SampleSource<'a> {
        demod_out: PinDriver<'a, AnyInputPin, Input>,
    }

    impl<'a> Em4095SampleSource<'a> {
        pub fn new(demod_out: AnyInputPin) -> anyhow::Result<Self> {
            Ok(Self {
                demod_out: PinDriver::input(demod_out)?,
            })
        }
    }

    impl SampleSource for Em4095SampleSource<'_> {
        fn next_sample(&mut self) -> bool {
            Ets::delay_us(SAMPLE_DELAY_US);
            self.demod_out.is_high()
        }
    }
}
