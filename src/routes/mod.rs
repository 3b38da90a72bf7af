/// Router Module Index
///
/// Routes are split by access level so that protection is applied once, as a layer on
/// the whole authenticated module, instead of being remembered handler by handler.

/// Routes open to anonymous visitors: browsing and the login/registration flow.
pub mod public;

/// Routes behind `auth::require_login`. Anonymous requests are redirected to `/login`.
pub mod authenticated;
