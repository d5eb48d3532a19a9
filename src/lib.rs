//! Terminal diary client backed by a hosted Supabase project.

pub mod app;
pub mod auth_form;
pub mod backend;
pub mod composer;
pub mod config;
pub mod diary_entry;
pub mod diary_state;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod text_input;
pub mod ui;
