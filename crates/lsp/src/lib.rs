//! buildsense Language Server Protocol front end.
//!
//! Publishes build diagnostics, offers compiler-suggested quick fixes as
//! code actions, and forwards hover, completion, definition and symbol
//! queries to the analysis tool. Connects to editors via the
//! `buildsense lsp` CLI subcommand over stdio.

pub mod code_actions;
pub mod diagnostics;
pub mod document;
pub mod queries;
pub mod server;
pub mod uri;

/// Run the LSP server over stdio. This is the public entry point
/// called by `buildsense lsp`.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    server::run()
}
