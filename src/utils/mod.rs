pub mod attachments;
pub mod badge_cache;
pub mod badge_filter;
pub mod db_utils;
