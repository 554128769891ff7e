/// Router Module Index
///
/// Routes are split by the access level they require. Guarded modules attach their
/// middleware to each method router, leaving the 405 fallback unguarded.

/// Anonymous access: reading blogs and categories, login, registration.
pub mod public;

/// Any signed-in user: the caller's own profile.
pub mod authenticated;

/// Administrators only: every write to content, image management and user management.
pub mod admin;
