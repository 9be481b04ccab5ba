use super::ScanError;

/// The capture device behind a scan session: something that can begin a
/// continuous decode feed, stop it, and release whatever it holds. `stop`
/// and `clear` are idempotent so the session can call them on every exit
/// path without tracking which one already ran.
pub trait ScanSource: Send {
    /// Acquire the device and begin decoding.
    fn start(&mut self) -> Result<(), ScanError>;

    /// Stop the decode feed.
    fn stop(&mut self);

    /// Release the handle entirely.
    fn clear(&mut self);

    fn is_active(&self) -> bool;
}

/// Server-side lease over an operator device's camera. The device mirrors
/// start/stop commands; the lease tracks whether the feed is allowed to
/// deliver decodes, so a decode posted after stop is ignored upstream.
#[derive(Debug, Default)]
pub struct CameraLease {
    active: bool,
}

impl CameraLease {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScanSource for CameraLease {
    fn start(&mut self) -> Result<(), ScanError> {
        if self.active {
            return Err(ScanError::AlreadyScanning);
        }
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn clear(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
