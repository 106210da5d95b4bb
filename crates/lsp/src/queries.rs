//! Query results from the analysis tool converted to LSP responses.

use buildsense_core::{
    CompletionEntry, CompletionKind, HoverInfo, SourceLocation, SymbolEntry, SymbolKind,
};
use lsp_types::{
    CompletionItem, CompletionItemKind, DocumentSymbol, Hover, HoverContents, Location,
    MarkupContent, MarkupKind,
};

use crate::diagnostics::to_lsp_range;
use crate::uri::path_to_uri;

pub fn to_hover(info: HoverInfo) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: info.contents,
        }),
        range: info
            .range
            .map(|r| to_lsp_range(&buildsense_core::Range::from(r))),
    }
}

pub fn to_completion_item(entry: CompletionEntry) -> CompletionItem {
    let kind = match entry.kind {
        CompletionKind::Function => CompletionItemKind::FUNCTION,
        CompletionKind::Value => CompletionItemKind::VALUE,
        CompletionKind::Type => CompletionItemKind::CLASS,
        CompletionKind::Constructor => CompletionItemKind::ENUM_MEMBER,
        CompletionKind::Module => CompletionItemKind::MODULE,
        CompletionKind::Keyword => CompletionItemKind::KEYWORD,
        CompletionKind::Other => CompletionItemKind::TEXT,
    };
    CompletionItem {
        label: entry.label,
        kind: Some(kind),
        detail: entry.detail,
        ..Default::default()
    }
}

pub fn to_location(location: &SourceLocation) -> Option<Location> {
    Some(Location {
        uri: path_to_uri(&location.path)?,
        range: to_lsp_range(&buildsense_core::Range::from(location.range)),
    })
}

#[allow(deprecated)] // DocumentSymbol::deprecated is required by the struct literal
pub fn to_document_symbol(entry: SymbolEntry) -> DocumentSymbol {
    let kind = match entry.kind {
        SymbolKind::Module => lsp_types::SymbolKind::MODULE,
        SymbolKind::Function => lsp_types::SymbolKind::FUNCTION,
        SymbolKind::Value => lsp_types::SymbolKind::VARIABLE,
        SymbolKind::Type => lsp_types::SymbolKind::CLASS,
        SymbolKind::Constructor => lsp_types::SymbolKind::ENUM_MEMBER,
        SymbolKind::Field => lsp_types::SymbolKind::FIELD,
        SymbolKind::Other => lsp_types::SymbolKind::OBJECT,
    };
    let range = to_lsp_range(&buildsense_core::Range::from(entry.range));
    DocumentSymbol {
        name: entry.name,
        detail: entry.container,
        kind,
        tags: None,
        deprecated: None,
        range,
        selection_range: range,
        children: None,
    }
}
