pub mod app;
pub mod args;
pub mod completer;
pub mod executor;
pub mod factory;
pub mod format;
pub mod logging;
pub mod prompt;
pub mod refresher;
pub mod special;
pub mod terminal;

#[cfg(test)]
mod testing;
