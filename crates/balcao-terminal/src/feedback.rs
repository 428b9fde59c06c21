//! # Scan Feedback Port
//!
//! The audible/visual cue the operator gets for every scan resolution.
//!
//! ## Contract
//! The two-outcome distinction is the contract: an accepted scan and a
//! rejected scan must be distinguishable without looking at the screen.
//! The concrete tone values below are presentation details the UI host may
//! substitute.
//!
//! Implementations must be fire-and-forget: the pipeline calls these
//! synchronously between resolving a scan and accepting the next one, so a
//! blocking implementation would stall scanning. Play the tone on the UI
//! side of the bridge, or spawn it.

/// A tone specification for a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueSpec {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

/// Short high beep: the product landed in the cart.
pub const ACCEPTED_CUE: CueSpec = CueSpec {
    frequency_hz: 1320,
    duration_ms: 80,
};

/// Longer low buzz: unknown barcode, or nothing could be added.
pub const REJECTED_CUE: CueSpec = CueSpec {
    frequency_hz: 220,
    duration_ms: 260,
};

/// The feedback port the scan pipeline signals through.
pub trait ScanFeedback: Send + Sync {
    /// The scan resolved and the product is represented in the cart.
    fn accepted(&self);

    /// The scan resolved to nothing the operator can sell right now.
    fn rejected(&self);
}

/// No-op feedback, for tests and headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl ScanFeedback for SilentFeedback {
    fn accepted(&self) {}
    fn rejected(&self) {}
}
