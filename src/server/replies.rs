//! Human-readable reason strings carried in `Response` and `Error` replies.

pub const REGISTERED: &str = "Registration successful";
pub const REGISTER_FAILED: &str = "Registration failed";
pub const USERNAME_LENGTH: &str = "Username must be 3-20 characters";
pub const PASSWORD_LENGTH: &str = "Password must be at least 4 characters";
pub const USERNAME_CHARSET: &str = "Username must be alphanumeric";

pub const LOGGED_IN: &str = "Login successful";
pub const ALREADY_LOGGED_IN: &str = "User already logged in";
pub const AUTH_FAILED: &str = "Authentication failed";
pub const GOODBYE: &str = "Goodbye!";

pub const CONTACT_ADDED: &str = "Contact added";
pub const CONTACT_REMOVED: &str = "Contact removed";
pub const ADD_CONTACT_FAILED: &str = "Failed to add contact";
pub const REMOVE_CONTACT_FAILED: &str = "Failed to remove contact";
pub const INVALID_USERNAME: &str = "Invalid username";

pub const AVATAR_UPDATED: &str = "Avatar updated";
pub const AVATAR_TOO_LARGE: &str = "Avatar too large (max 512KB)";
pub const AVATAR_FAILED: &str = "Failed to update avatar";

pub const NOT_AUTHENTICATED: &str = "Not authenticated";
pub const UNKNOWN_COMMAND: &str = "Unknown command";
pub const USER_OFFLINE: &str = "User is offline";
