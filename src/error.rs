use thiserror::Error;

/// Errors produced by capture, tracking, and actuation.
///
/// Losing the target is not an error. Loss is a normal outcome reported
/// through [`TrackOutcome::Lost`](crate::tracker::TrackOutcome), and a
/// template patch that falls outside the frame only suppresses template
/// adoption for that cycle.
#[derive(Debug, Error)]
pub enum Error {
    #[error("expected equal dimensions but got {a_rows}x{a_cols} and {b_rows}x{b_cols}")]
    DimensionMismatch {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },

    #[error("expected {rows}x{cols} frame to hold {expected} bytes but got {len}")]
    BufferSize {
        rows: usize,
        cols: usize,
        expected: usize,
        len: usize,
    },

    #[error(
        "{template_rows}x{template_cols} template does not fit a {frame_rows}x{frame_cols} frame"
    )]
    TemplateTooLarge {
        template_rows: usize,
        template_cols: usize,
        frame_rows: usize,
        frame_cols: usize,
    },

    #[error("template has no pixels")]
    EmptyTemplate,

    #[error("frame capture failed: {reason}")]
    Capture { reason: String },

    #[error("motor channel {channel} rejected command: {reason}")]
    Motor { channel: u8, reason: String },

    #[error("failed to load parameters: {reason}")]
    Params { reason: String },

    #[error("failed to write diagnostic frame: {reason}")]
    Sink { reason: String },
}
