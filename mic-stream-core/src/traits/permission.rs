/// Completion for a permission request: `true` when granted.
pub type PermissionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// OS-level microphone permission.
pub trait PermissionProvider: Send + Sync {
    /// Current grant status, without prompting.
    fn check(&self) -> bool;

    /// Prompt the user. `on_result` may be invoked synchronously, later on
    /// the owner thread, or never if the user does not answer.
    fn request(&self, on_result: PermissionCallback);
}
