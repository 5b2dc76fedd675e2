// Authentication: identity-provider token verification, app session cookies,
// and the sign-up / sign-in / sign-out endpoints.

pub mod handlers;
pub mod identity;
pub mod session;
