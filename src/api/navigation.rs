/// Where the user is sent when the server rejects their session.
pub const LOGIN_ROUTE: &str = "/login";

/// Moves the user to another view. The CLI implements this by telling the
/// user to log in again.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}
