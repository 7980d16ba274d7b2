//! Workflow plans
//!
//! A workflow is a list of operations applied strictly in order, each step
//! consuming the previous step's output bytes. Steps are plain data so a
//! plan can be stored as JSON, previewed, and re-run. On failure the run
//! aborts at the failing step and reports its index and operation name;
//! nothing is rolled back because earlier steps already produced complete
//! intermediate documents.

use crate::error::PageForgeError;
use crate::overlay::OverlayElement;
use crate::permissions::PermissionPolicy;
use crate::resize::PageSize;
use crate::watermark::WatermarkOptions;
use crate::{
    compress, delete, encryption, flatten, metadata, overlay, reorder, repair, resize, rotate,
    watermark,
};
use serde::{Deserialize, Serialize};

/// One operation in a workflow plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "params", rename_all = "camelCase")]
pub enum WorkflowStep {
    /// Delete the pages named by a selection like "2, 5-7"
    Delete { pages: String },
    /// Keep only the pages named by the selection
    Extract { pages: String },
    /// Rearrange pages; the order lists every page index exactly once
    Reorder { order: Vec<usize> },
    /// Rescale pages to a named size or explicit dimensions in points
    Resize {
        #[serde(default)]
        size: Option<PageSize>,
        #[serde(default)]
        width: Option<f64>,
        #[serde(default)]
        height: Option<f64>,
    },
    /// Set the view rotation of selected pages (all pages when omitted)
    Rotate {
        #[serde(default)]
        pages: Option<String>,
        degrees: i32,
    },
    /// Burn form fields into static content
    Flatten,
    /// Stamp text across every page
    Watermark {
        text: String,
        #[serde(default)]
        options: WatermarkOptions,
    },
    /// Stamp text, images or date marks onto one page
    Overlay {
        page: usize,
        elements: Vec<OverlayElement>,
        #[serde(default = "default_render_scale")]
        render_scale: f64,
    },
    /// Password-protect the document
    Encrypt { policy: PermissionPolicy },
    /// Remove password protection
    Decrypt {
        #[serde(default)]
        password: String,
    },
    /// Rebuild a damaged document
    Repair,
    /// Remove the Info dictionary and XMP metadata
    StripMetadata,
    /// Structural compression
    Compress,
}

fn default_render_scale() -> f64 {
    1.0
}

impl WorkflowStep {
    /// The step's wire tag, used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::Delete { .. } => "delete",
            WorkflowStep::Extract { .. } => "extract",
            WorkflowStep::Reorder { .. } => "reorder",
            WorkflowStep::Resize { .. } => "resize",
            WorkflowStep::Rotate { .. } => "rotate",
            WorkflowStep::Flatten => "flatten",
            WorkflowStep::Watermark { .. } => "watermark",
            WorkflowStep::Overlay { .. } => "overlay",
            WorkflowStep::Encrypt { .. } => "encrypt",
            WorkflowStep::Decrypt { .. } => "decrypt",
            WorkflowStep::Repair => "repair",
            WorkflowStep::StripMetadata => "stripMetadata",
            WorkflowStep::Compress => "compress",
        }
    }

    fn apply(&self, bytes: &[u8]) -> Result<Vec<u8>, PageForgeError> {
        match self {
            WorkflowStep::Delete { pages } => delete::delete_pages(bytes, pages),
            WorkflowStep::Extract { pages } => delete::extract_pages(bytes, pages),
            WorkflowStep::Reorder { order } => reorder::reorder_pages(bytes, order),
            WorkflowStep::Resize {
                size,
                width,
                height,
            } => match (size, width, height) {
                (Some(size), _, _) => resize::resize_pages_to(bytes, *size),
                (None, Some(w), Some(h)) => resize::resize_pages(bytes, *w, *h),
                _ => Err(PageForgeError::ValidationError(
                    "Resize needs a named size or both width and height".to_string(),
                )),
            },
            WorkflowStep::Rotate { pages, degrees } => {
                rotate::rotate_pages(bytes, pages.as_deref(), *degrees)
            }
            WorkflowStep::Flatten => flatten::flatten_forms(bytes),
            WorkflowStep::Watermark { text, options } => watermark::watermark(bytes, text, options),
            WorkflowStep::Overlay {
                page,
                elements,
                render_scale,
            } => overlay::apply_overlay(bytes, *page, elements, *render_scale),
            WorkflowStep::Encrypt { policy } => encryption::set_encryption(bytes, policy),
            WorkflowStep::Decrypt { password } => encryption::remove_password(bytes, password),
            WorkflowStep::Repair => repair::repair(bytes),
            WorkflowStep::StripMetadata => metadata::strip_metadata(bytes),
            WorkflowStep::Compress => compress::compress_document(bytes),
        }
    }
}

/// Parse a JSON plan into workflow steps.
pub fn parse_plan(json: &str) -> Result<Vec<WorkflowStep>, PageForgeError> {
    serde_json::from_str(json).map_err(|e| PageForgeError::SerializationError(e.to_string()))
}

/// Run a plan over a document, returning the final bytes.
///
/// Each step loads the previous step's output from scratch, so a fault in
/// one operation cannot leak half-applied state into the next.
pub fn run_workflow(initial: &[u8], plan: &[WorkflowStep]) -> Result<Vec<u8>, PageForgeError> {
    let mut current = initial.to_vec();
    for (index, step) in plan.iter().enumerate() {
        tracing::info!(step = index, operation = step.name(), "running workflow step");
        current = step
            .apply(&current)
            .map_err(|e| e.at_step(index, step.name()))?;
    }
    Ok(current)
}
