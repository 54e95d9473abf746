use std::collections::HashMap;

use crate::assets::data_uri::{encode_data_uri, guess_mime, is_data_uri};
use crate::assets::fetch::AssetFetcher;
use crate::markup::document::{Document, NodeId};
use crate::timeline::clip::MediaType;

/// Outcome of inlining the raster assets of a document.
#[derive(Clone, Debug, Default)]
pub struct EmbedReport {
    /// Original reference of every `<image>` that had one, embedded or not.
    pub originals: HashMap<NodeId, String>,
    /// Number of references replaced by data URIs.
    pub embedded: usize,
    /// Number of references kept because fetching failed.
    pub failed: usize,
}

fn href_attr(doc: &Document, node: NodeId) -> Option<&'static str> {
    if doc.attr(node, "href").is_some() {
        Some("href")
    } else if doc.attr(node, "xlink:href").is_some() {
        Some("xlink:href")
    } else {
        None
    }
}

/// Replace every external `<image>` reference with a self-contained data URI.
///
/// Video references stay as they are; they are sampled through the frame services instead. A
/// fetch failure keeps the original reference and is logged.
pub fn embed_assets(doc: &mut Document, fetcher: &dyn AssetFetcher) -> EmbedReport {
    let mut report = EmbedReport::default();
    let images: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&n| doc.name(n) == Some("image"))
        .collect();

    for node in images {
        let Some(attr) = href_attr(doc, node) else {
            continue;
        };
        let reference = doc.attr(node, attr).unwrap_or_default().trim().to_string();
        if reference.is_empty() {
            continue;
        }
        report.originals.insert(node, reference.clone());
        if is_data_uri(&reference) || MediaType::from_path(&reference) == MediaType::Video {
            continue;
        }
        match fetcher.fetch(&reference) {
            Ok(bytes) => {
                let mime = guess_mime(&bytes, &reference);
                doc.set_attr(node, attr, encode_data_uri(&mime, &bytes));
                report.embedded += 1;
            }
            Err(e) => {
                tracing::warn!(source = %reference, error = %e, "keeping original asset reference");
                report.failed += 1;
            }
        }
    }
    tracing::debug!(
        embedded = report.embedded,
        failed = report.failed,
        "raster assets inlined"
    );
    report
}

#[cfg(test)]
#[path = "../../tests/unit/template/embed.rs"]
mod tests;
