pub mod admins;
pub mod announcements;
pub mod auth;
pub mod events;
pub mod root;
pub mod uploads;
