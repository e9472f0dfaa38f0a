//! Application services used by the admission gates and route handlers.

pub mod auth;
pub mod backup;
pub mod cookies;
pub mod csrf;

pub use auth::{AuthError, AuthService, AuthSession, ClientInfo, LoginResult};
pub use backup::BackupError;
pub use cookies::{extract_cookie, CookieHelper, CSRF_COOKIE, SESSION_COOKIE};
pub use csrf::{CsrfError, CsrfTokens};
