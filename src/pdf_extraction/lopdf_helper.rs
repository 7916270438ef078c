// lopdf helper - Pure Rust PDF operations on in-memory documents
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::types::{DocumentKind, ReportError, Result};

/// Load a PDF document from uploaded bytes
pub fn load_pdf(bytes: &[u8], kind: DocumentKind) -> Result<Document> {
    if bytes.is_empty() {
        return Err(ReportError::malformed(kind, "empty upload"));
    }
    Document::load_mem(bytes)
        .map_err(|e| ReportError::malformed(kind, format!("not a readable PDF ({})", e)))
}

/// Execute an operation with a PDF document
pub fn with_pdf<F, R>(bytes: &[u8], kind: DocumentKind, f: F) -> Result<R>
where
    F: FnOnce(&Document) -> Result<R>,
{
    let document = load_pdf(bytes, kind)?;
    f(&document)
}

/// Follow indirect references until a direct object is reached
pub fn resolve<'a>(document: &'a Document, mut object: &'a Object) -> Option<&'a Object> {
    // Reference chains deeper than this are treated as broken
    for _ in 0..16 {
        match object {
            Object::Reference(id) => object = document.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

pub fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(document, object)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Page resources, walking up the page tree for inherited ones
pub fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = document.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..32 {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(document, resources);
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve_dict(document, parent)?;
    }
    None
}

// Helper to get numeric value from dictionary
pub fn get_number(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<f32> {
    match resolve(document, dict.get(key).ok()?)? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

pub fn get_name<'a>(document: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match resolve(document, dict.get(key).ok()?)? {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Stream filters in application order (`/Filter` may be a name or array)
pub fn filter_names(document: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict.get(b"Filter").ok().and_then(|f| resolve(document, f)) else {
        return Vec::new();
    };
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match resolve(document, item)? {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
