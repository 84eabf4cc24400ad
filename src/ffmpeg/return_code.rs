use std::fmt::Display;
use std::process::ExitStatus;

pub const RETURN_CODE_SUCCESS: i32 = 0;
/// ffmpeg exits with 255 when interrupted; a killed job reports the same.
pub const RETURN_CODE_CANCEL: i32 = 255;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    Success,
    Cancelled,
    Other(i32),
}

impl Outcome {
    pub fn from_return_code(code: i32) -> Self {
        match code {
            RETURN_CODE_SUCCESS => Outcome::Success,
            RETURN_CODE_CANCEL => Outcome::Cancelled,
            _ => Outcome::Other(code),
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Cancelled => write!(f, "cancelled"),
            Outcome::Other(code) => write!(f, "return code {}", code),
        }
    }
}

/// A process terminated by a signal has no exit code; treat it as cancelled.
pub fn return_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(RETURN_CODE_CANCEL)
}
