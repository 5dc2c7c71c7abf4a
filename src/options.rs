/// Run-wide policy handed down every recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Never prompt; destructive confirmations proceed with a warning.
    pub unattended: bool,
    /// Demote per-item failures to warnings instead of aborting.
    pub skip_errors: bool,
}

impl RunOptions {
    pub fn unattended() -> Self {
        Self {
            unattended: true,
            skip_errors: false,
        }
    }

    pub fn with_skip_errors(mut self, skip_errors: bool) -> Self {
        self.skip_errors = skip_errors;
        self
    }
}
