//! LSP server main loop with request/notification dispatch.
//!
//! Uses `lsp-server` (synchronous, crossbeam-based) for the transport. Calls
//! into the analysis tool are async; each message is driven to completion
//! on a current-thread runtime before the next one is read, so the updates
//! of two build results never interleave.

use std::error::Error;
use std::path::{Path, PathBuf};

use buildsense_core::{
    AnalysisBackend, BackendError, BuildConfig, BuildReport, Notice, Orchestrator, ProcessBackend,
};
use lsp_server::{Connection, ErrorCode, Message, Notification, Request, RequestId, Response};
use lsp_types::notification::{
    DidChangeConfiguration, DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument,
    DidSaveTextDocument, Notification as _, PublishDiagnostics, ShowMessage,
};
use lsp_types::request::{
    CodeActionRequest, Completion, DocumentSymbolRequest, ExecuteCommand, GotoDefinition,
    HoverRequest, Request as _,
};
use lsp_types::{
    CodeActionKind, CodeActionOptions, CodeActionProviderCapability, CompletionOptions,
    CompletionResponse, DocumentSymbolResponse, ExecuteCommandOptions, GotoDefinitionResponse,
    HoverProviderCapability, InitializeParams, MessageType, OneOf, SaveOptions, ServerCapabilities,
    ShowMessageParams, TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::code_actions;
use crate::diagnostics;
use crate::document::DocumentState;
use crate::queries;
use crate::uri::{uri_str_to_path, uri_to_path};

/// `workspace/executeCommand` name that runs a full build.
pub const BUILD_COMMAND: &str = "buildsense.build";

/// Run the LSP server over stdio until shutdown.
pub fn run() -> Result<(), Box<dyn Error>> {
    let (connection, io_threads) = Connection::stdio();
    serve(&connection)?;
    io_threads.join()?;
    Ok(())
}

/// Run the initialize handshake and the main loop on `connection`.
pub fn serve(connection: &Connection) -> Result<(), Box<dyn Error>> {
    // ── Initialize handshake ──────────────────────────────────────────
    let init_json = serde_json::to_value(build_capabilities())?;
    let init_params: InitializeParams =
        serde_json::from_value(connection.initialize(init_json)?)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut session = Session::new(connection, runtime, &init_params);
    info!(
        root = ?session.orchestrator.root(),
        "language server initialized"
    );

    // ── Main loop ─────────────────────────────────────────────────────
    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    break;
                }
                session.handle_request(req)?;
            }
            Message::Notification(not) => {
                session.handle_notification(not)?;
            }
            Message::Response(_) => {
                // Ignore responses (we don't send requests to the client)
            }
        }
    }
    Ok(())
}

fn build_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
                ..Default::default()
            },
        )),
        code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
            code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
            ..Default::default()
        })),
        execute_command_provider: Some(ExecuteCommandOptions {
            commands: vec![BUILD_COMMAND.to_string()],
            ..Default::default()
        }),
        definition_provider: Some(OneOf::Left(true)),
        document_symbol_provider: Some(OneOf::Left(true)),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(vec![".".into()]),
            resolve_provider: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Extract workspace root path from InitializeParams.
#[allow(deprecated)] // root_path/root_uri are deprecated but needed for backwards compat
fn extract_workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    // Try workspace_folders first (modern LSP)
    if let Some(folders) = &params.workspace_folders {
        if let Some(folder) = folders.first() {
            return Some(uri_str_to_path(folder.uri.as_str()));
        }
    }
    // Fall back to root_uri
    if let Some(root_uri) = &params.root_uri {
        return Some(uri_str_to_path(root_uri.as_str()));
    }
    // Fall back to root_path (deprecated but still sent by VS Code)
    if let Some(root_path) = &params.root_path {
        if !root_path.is_empty() {
            return Some(PathBuf::from(root_path));
        }
    }
    None
}

/// `buildsense.toml` under `root` overlaid with editor `settings`. Problems
/// are logged and fall back to what could be loaded.
pub fn load_config(root: Option<&Path>, settings: Option<&serde_json::Value>) -> BuildConfig {
    let base = match root.map(BuildConfig::load) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            warn!(error = %e, "using default configuration");
            BuildConfig::default()
        }
        None => BuildConfig::default(),
    };
    match settings {
        Some(settings) => base.overlay(settings).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring editor settings");
            base.clone()
        }),
        None => base,
    }
}

/// A query result, or `None` after logging the failure. Query failures are
/// confined to the request that caused them.
fn settle<T>(kind: &'static str, result: Result<T, BackendError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(kind, error = %e, "query failed");
            None
        }
    }
}

fn to_core_position(position: lsp_types::Position) -> buildsense_core::Position {
    buildsense_core::Position::new(position.line, position.character)
}

struct Session<'a> {
    connection: &'a Connection,
    runtime: Runtime,
    orchestrator: Orchestrator<ProcessBackend>,
    documents: DocumentState,
}

impl<'a> Session<'a> {
    fn new(connection: &'a Connection, runtime: Runtime, params: &InitializeParams) -> Self {
        let root = extract_workspace_root(params);
        let config = load_config(root.as_deref(), params.initialization_options.as_ref());
        let backend = ProcessBackend::new(&config, root.as_deref());
        Session {
            connection,
            runtime,
            orchestrator: Orchestrator::new(backend, config, root),
            documents: DocumentState::new(),
        }
    }

    fn handle_request(&mut self, req: Request) -> Result<(), Box<dyn Error>> {
        let id = req.id.clone();
        let result = match self.dispatch_request(req) {
            Ok(result) => result,
            Err(resp) => {
                self.connection.sender.send(Message::Response(resp))?;
                return Ok(());
            }
        };
        let resp = Response::new_ok(id, result);
        self.connection.sender.send(Message::Response(resp))?;
        Ok(())
    }

    /// The JSON result for `req`, or a ready-made error response.
    fn dispatch_request(&mut self, req: Request) -> Result<serde_json::Value, Response> {
        if req.method == CodeActionRequest::METHOD {
            let params: lsp_types::CodeActionParams = decode(&req)?;
            let path = uri_to_path(&params.text_document.uri);
            let actions = code_actions::compute_code_actions(
                self.orchestrator.store(),
                &path,
                &params.range,
                &params.context.diagnostics,
            );
            let result: Option<lsp_types::CodeActionResponse> =
                if actions.is_empty() { None } else { Some(actions) };
            to_json(&req.id, result)
        } else if req.method == HoverRequest::METHOD {
            let params: lsp_types::HoverParams = decode(&req)?;
            let doc = &params.text_document_position_params;
            let path = uri_to_path(&doc.text_document.uri);
            let position = to_core_position(doc.position);
            let result = self
                .runtime
                .block_on(self.orchestrator.backend().hover(&path, position));
            let hover = settle("hover", result).flatten().map(queries::to_hover);
            to_json(&req.id, hover)
        } else if req.method == Completion::METHOD {
            let params: lsp_types::CompletionParams = decode(&req)?;
            let doc = &params.text_document_position;
            let path = uri_to_path(&doc.text_document.uri);
            let position = to_core_position(doc.position);
            let result = self
                .runtime
                .block_on(self.orchestrator.backend().completions(&path, position));
            let items = settle("completion", result).map(|entries| {
                CompletionResponse::Array(
                    entries.into_iter().map(queries::to_completion_item).collect(),
                )
            });
            to_json(&req.id, items)
        } else if req.method == GotoDefinition::METHOD {
            let params: lsp_types::GotoDefinitionParams = decode(&req)?;
            let doc = &params.text_document_position_params;
            let path = uri_to_path(&doc.text_document.uri);
            let position = to_core_position(doc.position);
            let result = self
                .runtime
                .block_on(self.orchestrator.backend().definition(&path, position));
            let location = settle("definition", result)
                .flatten()
                .and_then(|loc| queries::to_location(&loc))
                .map(GotoDefinitionResponse::Scalar);
            to_json(&req.id, location)
        } else if req.method == DocumentSymbolRequest::METHOD {
            let params: lsp_types::DocumentSymbolParams = decode(&req)?;
            let path = uri_to_path(&params.text_document.uri);
            let result = self
                .runtime
                .block_on(self.orchestrator.backend().symbols(&path));
            let symbols = settle("symbols", result)
                .filter(|entries| !entries.is_empty())
                .map(|entries| {
                    DocumentSymbolResponse::Nested(
                        entries.into_iter().map(queries::to_document_symbol).collect(),
                    )
                });
            to_json(&req.id, symbols)
        } else if req.method == ExecuteCommand::METHOD {
            let params: lsp_types::ExecuteCommandParams = decode(&req)?;
            if params.command != BUILD_COMMAND {
                return Err(Response::new_err(
                    req.id,
                    ErrorCode::InvalidParams as i32,
                    format!("unknown command: {}", params.command),
                ));
            }
            let report = self.runtime.block_on(self.orchestrator.run_full_build());
            self.apply_report(&report).map_err(|e| {
                Response::new_err(req.id.clone(), ErrorCode::InternalError as i32, e.to_string())
            })?;
            Ok(serde_json::Value::Null)
        } else {
            // Unknown request -- method not found
            Err(Response::new_err(
                req.id,
                ErrorCode::MethodNotFound as i32,
                format!("method not found: {}", req.method),
            ))
        }
    }

    fn handle_notification(&mut self, not: Notification) -> Result<(), Box<dyn Error>> {
        match not.method.as_str() {
            m if m == DidOpenTextDocument::METHOD => {
                let Some(params) =
                    decode_notification::<lsp_types::DidOpenTextDocumentParams>(not)
                else {
                    return Ok(());
                };
                let path = uri_to_path(&params.text_document.uri);
                self.documents.open(path, params.text_document.version);
            }
            m if m == DidChangeTextDocument::METHOD => {
                let Some(params) =
                    decode_notification::<lsp_types::DidChangeTextDocumentParams>(not)
                else {
                    return Ok(());
                };
                let path = uri_to_path(&params.text_document.uri);
                self.documents.change(&path, params.text_document.version);
            }
            m if m == DidSaveTextDocument::METHOD => {
                let Some(params) =
                    decode_notification::<lsp_types::DidSaveTextDocumentParams>(not)
                else {
                    return Ok(());
                };
                let path = uri_to_path(&params.text_document.uri);
                let report = self.runtime.block_on(self.orchestrator.on_save(&path));
                if let Some(report) = report {
                    self.apply_report(&report)?;
                }
            }
            m if m == DidCloseTextDocument::METHOD => {
                let Some(params) =
                    decode_notification::<lsp_types::DidCloseTextDocumentParams>(not)
                else {
                    return Ok(());
                };
                // Build diagnostics outlive the buffer; only stop tracking it.
                self.documents.close(&uri_to_path(&params.text_document.uri));
            }
            m if m == DidChangeConfiguration::METHOD => {
                let Some(params) =
                    decode_notification::<lsp_types::DidChangeConfigurationParams>(not)
                else {
                    return Ok(());
                };
                let config = load_config(self.orchestrator.root(), Some(&params.settings));
                self.orchestrator.reload_config(config);
            }
            _ => {
                // Unknown notification -- ignore
            }
        }
        Ok(())
    }

    /// Publish every file update of `report` and show its notice.
    fn apply_report(&self, report: &BuildReport) -> Result<(), Box<dyn Error>> {
        for update in &report.updates {
            let version = self.documents.version(&update.path);
            let Some(params) = diagnostics::publish_params(update, version) else {
                warn!(path = %update.path.display(), "cannot publish diagnostics for path");
                continue;
            };
            let not = Notification::new(PublishDiagnostics::METHOD.to_string(), params);
            self.connection.sender.send(Message::Notification(not))?;
        }

        if let Some(notice) = &report.notice {
            let typ = match notice {
                Notice::Succeeded => MessageType::INFO,
                Notice::CompletedWithErrors => MessageType::WARNING,
                Notice::Failed(_) => MessageType::ERROR,
            };
            let params = ShowMessageParams {
                typ,
                message: notice.message(),
            };
            let not = Notification::new(ShowMessage::METHOD.to_string(), params);
            self.connection.sender.send(Message::Notification(not))?;
        }
        debug!(
            generation = %report.generation,
            outcome = ?report.outcome,
            files = report.updates.len(),
            "build report published"
        );
        Ok(())
    }
}

/// Serialize a request result, or an `InternalError` response.
fn to_json<T: Serialize>(id: &RequestId, value: T) -> Result<serde_json::Value, Response> {
    serde_json::to_value(value)
        .map_err(|e| Response::new_err(id.clone(), ErrorCode::InternalError as i32, e.to_string()))
}

/// Decode request params, or an `InvalidParams` error response.
fn decode<P: DeserializeOwned>(req: &Request) -> Result<P, Response> {
    serde_json::from_value(req.params.clone()).map_err(|e| {
        Response::new_err(
            req.id.clone(),
            ErrorCode::InvalidParams as i32,
            format!("invalid params for {}: {}", req.method, e),
        )
    })
}

/// Decode notification params; malformed notifications are logged and
/// dropped.
fn decode_notification<P: DeserializeOwned>(not: Notification) -> Option<P> {
    match serde_json::from_value(not.params) {
        Ok(params) => Some(params),
        Err(e) => {
            warn!(method = %not.method, error = %e, "dropping malformed notification");
            None
        }
    }
}
