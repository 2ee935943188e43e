mod common;
mod moderation;
mod registry;
