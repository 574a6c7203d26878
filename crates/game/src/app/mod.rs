mod bootstrap;
mod hud;
mod loop_runner;
mod renderer;

pub(crate) use bootstrap::{build_app, init_tracing};
pub(crate) use loop_runner::run;
pub(crate) use renderer::{HIDDEN_CARD_LABEL, MATCHED_CARD_LABEL};
