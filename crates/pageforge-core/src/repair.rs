//! Structural repair
//!
//! Best-effort recovery of damaged documents. The cheap path is a plain
//! load and fresh serialization, which alone fixes broken offsets, bad
//! stream lengths and trailing garbage. When the cross-reference table is
//! too damaged to load at all, a byte-level pass scans for object headers,
//! appends a rebuilt xref and trailer, and retries the load.

use crate::error::PageForgeError;
use crate::save_document;
use lopdf::Document;
use std::collections::BTreeMap;

/// Recovered object header: generation and byte offset of `N G obj`
type ObjectMap = BTreeMap<u32, (u16, usize)>;

/// Rebuild a document into a conformant file.
///
/// Fails with `Unrecoverable` when no load strategy produces a document,
/// and with `EncryptedInput` when the recovered document is encrypted.
pub fn repair(bytes: &[u8]) -> Result<Vec<u8>, PageForgeError> {
    // A lenient load can report success with an empty object table when the
    // cross-reference data itself is damaged; a pageless result means the
    // page tree was lost, so it goes to the scan path like a hard failure.
    match Document::load_mem(bytes) {
        Ok(doc) if !doc.get_pages().is_empty() => {
            tracing::debug!("document loaded normally, re-serializing");
            finish(doc)
        }
        Ok(_) => {
            tracing::warn!("load produced no pages, scanning for object headers");
            rescan(bytes, "load produced no pages")
        }
        Err(load_err) => {
            tracing::warn!(error = %load_err, "load failed, scanning for object headers");
            rescan(bytes, &load_err.to_string())
        }
    }
}

/// Byte-level recovery: find object headers, rebuild the xref and trailer,
/// and load the result.
fn rescan(bytes: &[u8], reason: &str) -> Result<Vec<u8>, PageForgeError> {
    let objects = scan_object_headers(bytes);
    if objects.is_empty() {
        return Err(PageForgeError::Unrecoverable(format!(
            "No object headers found ({})",
            reason
        )));
    }
    let root = find_catalog(bytes, &objects).ok_or_else(|| {
        PageForgeError::Unrecoverable("No document catalog found".to_string())
    })?;

    let rebuilt = rebuild_with_xref(bytes, &objects, root);
    let doc = Document::load_mem(&rebuilt)
        .map_err(|e| PageForgeError::Unrecoverable(format!("Recovery load failed: {}", e)))?;
    if doc.get_pages().is_empty() {
        return Err(PageForgeError::Unrecoverable(
            "Recovered document has no pages".to_string(),
        ));
    }
    tracing::info!(objects = objects.len(), "recovered document via header scan");
    finish(doc)
}

fn finish(mut doc: Document) -> Result<Vec<u8>, PageForgeError> {
    if doc.is_encrypted() {
        return Err(PageForgeError::EncryptedInput(
            "Cannot repair an encrypted document; remove the password first".to_string(),
        ));
    }
    doc.prune_objects();
    save_document(&mut doc)
}

/// Scan for `N G obj` headers, keeping the last offset seen per object
/// number so incremental updates win over the objects they replace.
fn scan_object_headers(bytes: &[u8]) -> ObjectMap {
    let mut found = ObjectMap::new();
    let mut pos = 0;

    while let Some(rel) = find_pattern(&bytes[pos..], b"obj") {
        let kw = pos + rel;
        if let Some((num, gen, start)) = parse_header_before(bytes, kw) {
            found.insert(num, (gen, start));
        }
        pos = kw + 3;
    }
    found
}

/// Walk backwards from an `obj` keyword to its object and generation
/// numbers. Returns the byte offset of the object number.
fn parse_header_before(bytes: &[u8], kw: usize) -> Option<(u32, u16, usize)> {
    // Delimiter after the keyword rules out words like "objective"
    match bytes.get(kw + 3) {
        Some(b) if b.is_ascii_alphanumeric() => return None,
        None => return None,
        _ => {}
    }
    if kw == 0 || !bytes[kw - 1].is_ascii_whitespace() {
        return None;
    }

    let mut i = kw - 1;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let gen_end = i;
    while i > 0 && bytes[i - 1].is_ascii_digit() {
        i -= 1;
    }
    let gen_start = i;
    if gen_start == gen_end || gen_end - gen_start > 5 {
        return None;
    }

    if i == 0 || !bytes[i - 1].is_ascii_whitespace() {
        return None;
    }
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let num_end = i;
    while i > 0 && bytes[i - 1].is_ascii_digit() {
        i -= 1;
    }
    let num_start = i;
    if num_start == num_end || num_end - num_start > 10 {
        return None;
    }
    if num_start > 0 && bytes[num_start - 1].is_ascii_alphanumeric() {
        return None;
    }

    let num: u32 = std::str::from_utf8(&bytes[num_start..num_end])
        .ok()?
        .parse()
        .ok()?;
    let gen: u16 = std::str::from_utf8(&bytes[gen_start..gen_end])
        .ok()?
        .parse()
        .ok()?;
    Some((num, gen, num_start))
}

/// Pick the first recovered object whose body mentions `/Catalog`.
fn find_catalog(bytes: &[u8], objects: &ObjectMap) -> Option<(u32, u16)> {
    for (&num, &(gen, start)) in objects {
        let end = find_pattern(&bytes[start..], b"endobj")
            .map(|p| start + p)
            .unwrap_or(bytes.len());
        if contains_pattern(&bytes[start..end], b"/Catalog") {
            return Some((num, gen));
        }
    }
    None
}

/// Append a fresh xref table and trailer pointing at the scanned offsets.
fn rebuild_with_xref(bytes: &[u8], objects: &ObjectMap, root: (u32, u16)) -> Vec<u8> {
    let mut out = bytes.to_vec();
    if !out.ends_with(b"\n") {
        out.push(b'\n');
    }
    let xref_offset = out.len();

    out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");

    // Contiguous object numbers share one subsection
    let ids: Vec<u32> = objects.keys().copied().collect();
    let mut i = 0;
    while i < ids.len() {
        let run_start = i;
        while i + 1 < ids.len() && ids[i + 1] == ids[i] + 1 {
            i += 1;
        }
        out.extend_from_slice(format!("{} {}\n", ids[run_start], i - run_start + 1).as_bytes());
        for &id in &ids[run_start..=i] {
            let (gen, offset) = objects[&id];
            out.extend_from_slice(format!("{:010} {:05} n \n", offset, gen).as_bytes());
        }
        i += 1;
    }

    let size = ids.last().map(|n| n + 1).unwrap_or(1);
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} {} R >>\nstartxref\n{}\n%%EOF\n",
            size, root.0, root.1, xref_offset
        )
        .as_bytes(),
    );
    out
}

fn find_pattern(bytes: &[u8], pattern: &[u8]) -> Option<usize> {
    bytes
        .windows(pattern.len())
        .position(|window| window == pattern)
}

fn contains_pattern(bytes: &[u8], pattern: &[u8]) -> bool {
    find_pattern(bytes, pattern).is_some()
}
