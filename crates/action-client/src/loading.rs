/// Loading-state callback.
pub type LoadingCallback<'a> = Box<dyn FnMut(bool) + Send + 'a>;

/// Fires `true` on creation and `false` when dropped.
///
/// Holding the guard for the lifetime of a request makes each transition fire
/// exactly once on every exit path.
pub struct LoadingGuard<'a> {
    callback: Option<LoadingCallback<'a>>,
}

impl<'a> LoadingGuard<'a> {
    pub fn new(mut callback: Option<LoadingCallback<'a>>) -> Self {
        if let Some(cb) = callback.as_mut() {
            cb(true);
        }
        Self { callback }
    }

    /// Fire `false` now instead of at drop.
    pub fn finish(self) {}
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(cb) = self.callback.as_mut() {
            cb(false);
        }
    }
}
