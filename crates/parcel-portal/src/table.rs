//! Parcel table extraction from the deliveries page.
//!
//! Positional on purpose: a row's code is the first cell's first child and
//! its status the last cell's first child. When the portal changes shape the
//! row fails loudly instead of being skipped.

use scraper::{ElementRef, Html, Node};
use tracing::warn;

use crate::error::{CellPosition, ExtractError, PollError};
use crate::parcel::Parcel;
use crate::parser::parse_row;

/// Raw text of one table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub code: String,
    pub status: String,
}

/// First `<table id="{table_id}">` in document order.
pub fn find_table<'a>(document: &'a Html, table_id: &str) -> Result<ElementRef<'a>, ExtractError> {
    let mut stack = vec![document.root_element()];

    while let Some(element) = stack.pop() {
        let value = element.value();
        if value.name() == "table" && value.attr("id") == Some(table_id) {
            return Ok(element);
        }
        // Reversed so the leftmost child is popped first.
        let children: Vec<_> = element.children().filter_map(ElementRef::wrap).collect();
        stack.extend(children.into_iter().rev());
    }

    Err(ExtractError::TableNotFound(table_id.to_string()))
}

/// Every `<tr>` under `table`, nested tables included, in document order.
pub fn extract_rows(table: ElementRef<'_>) -> Result<Vec<RawRow>, ExtractError> {
    let mut rows = Vec::new();
    let mut stack = vec![table];

    while let Some(element) = stack.pop() {
        if element.value().name() == "tr" {
            rows.push(read_row(element, rows.len())?);
        }
        let children: Vec<_> = element.children().filter_map(ElementRef::wrap).collect();
        stack.extend(children.into_iter().rev());
    }

    Ok(rows)
}

fn read_row(row: ElementRef<'_>, index: usize) -> Result<RawRow, ExtractError> {
    let mut cells = row.children().filter_map(ElementRef::wrap);
    let first = cells.next();
    let last = cells.last().or(first);

    let code = first
        .and_then(first_child_text)
        .ok_or(ExtractError::MissingCell {
            row: index,
            position: CellPosition::First,
        })?;
    let status = last
        .and_then(first_child_text)
        .ok_or(ExtractError::MissingCell {
            row: index,
            position: CellPosition::Last,
        })?;

    Ok(RawRow { code, status })
}

/// Text content of a cell's first child node.
fn first_child_text(cell: ElementRef<'_>) -> Option<String> {
    let child = cell.first_child()?;
    match child.value() {
        Node::Text(text) => Some(text.trim().to_string()),
        Node::Element(_) => {
            let text: String = ElementRef::wrap(child)?.text().collect();
            Some(text.trim().to_string())
        }
        _ => None,
    }
}

/// Extract and parse every parcel row in `page`.
///
/// Any row without an actor aborts the whole snapshot; date problems are
/// logged and the row is kept.
pub fn scrape_parcels(page: &str, table_id: &str) -> Result<Vec<Parcel>, PollError> {
    let document = Html::parse_document(page);
    let table = find_table(&document, table_id)?;
    let rows = extract_rows(table)?;

    let mut parcels = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let parsed = parse_row(&row.code, &row.status).map_err(|source| PollError::Parse {
            row: index,
            code: row.code.clone(),
            source,
        })?;
        if let Some(e) = &parsed.date_error {
            warn!(code = %row.code, error = %e, "Failed to parse parcel date");
        }
        parcels.push(parsed.parcel);
    }

    Ok(parcels)
}
