//! PDF merge
//!
//! Concatenates PDFs in the order given using `lopdf`. Object ids of each
//! input are shifted past the previous ones, inherited page attributes are
//! pinned onto the pages themselves and a fresh page tree and catalog are
//! built on top, so no input's structure leaks into another's pages.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use super::ConversionError;

const TOOL: &str = "pdf-merge";

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct Merger {
    timeout: Duration,
}

impl Merger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Merge `inputs` in order into `output` on the blocking pool.
    ///
    /// Returns the number of pages written.
    pub async fn merge(&self, inputs: Vec<PathBuf>, output: PathBuf) -> Result<usize, ConversionError> {
        if inputs.len() < 2 {
            return Err(ConversionError::NotEnoughInputs(inputs.len()));
        }

        tracing::debug!(inputs = inputs.len(), output = %output.display(), "Merging PDFs");

        let target = output.clone();
        let abandoned = Arc::new(AtomicBool::new(false));
        let worker_abandoned = Arc::clone(&abandoned);
        let mut task = tokio::task::spawn_blocking(move || {
            merge_into(&inputs, &target, &worker_abandoned)
        });
        let waited = tokio::time::timeout(self.timeout, &mut task).await;
        let result = match waited {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ConversionError::Worker {
                tool: TOOL.to_string(),
                message: e.to_string(),
            }),
            Err(_) => {
                // The blocking worker cannot be interrupted. It checks the
                // flag before publishing, and whatever it left is removed
                // once it returns.
                abandoned.store(true, Ordering::SeqCst);
                let orphaned = output.clone();
                tokio::spawn(async move {
                    let _ = task.await;
                    discard_output(&orphaned).await;
                });
                Err(ConversionError::TimedOut {
                    tool: TOOL.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        if result.is_err() {
            discard_output(&output).await;
        }
        result
    }
}

async fn discard_output(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), "Failed to remove merge output: {}", e);
        }
    }
}

/// Merge the PDFs at `inputs`, in order, into `output`.
pub fn merge_files(inputs: &[PathBuf], output: &Path) -> Result<usize, ConversionError> {
    merge_into(inputs, output, &AtomicBool::new(false))
}

fn merge_into(inputs: &[PathBuf], output: &Path, abandoned: &AtomicBool) -> Result<usize, ConversionError> {
    if inputs.len() < 2 {
        return Err(ConversionError::NotEnoughInputs(inputs.len()));
    }

    let documents = inputs
        .iter()
        .map(Document::load)
        .collect::<Result<Vec<_>, _>>()?;

    let mut merged = merge_documents(documents)?;
    let page_count = merged.get_pages().len();

    // Written under a hidden name first; only a complete file is ever
    // visible under `output`.
    let partial = partial_path(output);
    let saved = merged
        .save(&partial)
        .map(|_| ())
        .map_err(|e| std::io::Error::other(e.to_string()));
    if saved.is_ok() && abandoned.load(Ordering::SeqCst) {
        let _ = std::fs::remove_file(&partial);
        return Err(ConversionError::Worker {
            tool: TOOL.to_string(),
            message: "merge abandoned after timeout".to_string(),
        });
    }
    let saved = saved.and_then(|()| std::fs::rename(&partial, output));
    if let Err(e) = saved {
        let _ = std::fs::remove_file(&partial);
        return Err(ConversionError::Io {
            tool: TOOL.to_string(),
            source: e,
        });
    }

    tracing::info!(pages = page_count, output = %output.display(), "PDF merge complete");
    Ok(page_count)
}

/// `.<name>.part` next to `output`.
fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{}.part", name))
}

/// Merge loaded documents into a new one, pages in input order.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document, ConversionError> {
    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(next_id);
        next_id = doc.objects.keys().map(|(number, _)| *number).max().unwrap_or(next_id) + 1;

        // get_pages is keyed by page number, so this keeps page order.
        for page_id in doc.get_pages().into_values() {
            pages.push((page_id, page_with_inherited_attributes(&doc, page_id)?));
        }
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    for (id, object) in objects {
        let kind = match &object {
            Object::Dictionary(dict) => dict
                .get(b"Type")
                .and_then(Object::as_name)
                .map(<[u8]>::to_vec)
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        match kind.as_slice() {
            // Rebuilt below.
            b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                merged.objects.insert(id, object);
            }
        }
    }

    merged.max_id = merged
        .objects
        .keys()
        .chain(pages.iter().map(|(id, _)| id))
        .map(|(number, _)| *number)
        .max()
        .unwrap_or(0);
    let pages_id = merged.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    let count = pages.len() as i64;
    for (page_id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    Ok(merged)
}

/// Page dictionary with inherited attributes copied from its ancestors.
fn page_with_inherited_attributes(doc: &Document, page_id: ObjectId) -> Result<Dictionary, lopdf::Error> {
    let mut page = doc.get_object(page_id)?.as_dict()?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    let mut depth = 0;
    while let Some(parent_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        depth += 1;

        let node = doc.get_object(parent_id)?.as_dict()?;
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}
