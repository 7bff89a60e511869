//! Discovery of image XObjects, page by page

use crate::error::Result;
use crate::filters::resolve;
use crate::task::ImageRef;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Upper bound on `/Parent` links followed when looking for inherited resources
const MAX_TREE_DEPTH: usize = 64;

/// Image references of an already loaded document, in page order then
/// resource order.
///
/// Images drawn through Form XObjects are included. An image used several
/// times on one page is listed once for that page.
pub fn page_images(doc: &Document) -> Result<Vec<ImageRef>> {
    let mut images = Vec::new();

    // get_pages is keyed by 1-based page number, so iteration follows page order
    for (page_number, page_id) in doc.get_pages() {
        let before = images.len();

        if let Some(resources) = page_resources(doc, page_id)? {
            let mut seen = HashSet::new();
            let mut forms = HashSet::new();
            collect_images(doc, resources, &mut seen, &mut forms, &mut images);
        }

        debug!("page {}: {} image(s)", page_number, images.len() - before);
    }

    Ok(images)
}

/// Open `path` once and list its image references. No pixel data is decoded.
pub fn locate_images<P: AsRef<Path>>(path: P) -> Result<Vec<ImageRef>> {
    let doc = Document::load(path.as_ref())?;
    page_images(&doc)
}

/// The `/Resources` of a page, or of its nearest ancestor in the page tree
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Option<&Dictionary>> {
    let mut node = doc.get_dictionary(page_id)?;
    let mut visited = HashSet::from([page_id]);

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            if let Ok(Object::Dictionary(resources)) = resolve(doc, resources) {
                return Ok(Some(resources));
            }
        }

        let parent = match node.get(b"Parent") {
            Ok(Object::Reference(id)) if visited.insert(*id) => *id,
            _ => return Ok(None),
        };
        node = doc.get_dictionary(parent)?;
    }

    Ok(None)
}

/// Walk the `/XObject` entries of `resources`, descending into forms.
///
/// `seen` holds the images already listed for the current page and `forms`
/// the forms already entered, which also stops self-referencing forms.
fn collect_images<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    seen: &mut HashSet<ObjectId>,
    forms: &mut HashSet<ObjectId>,
    images: &mut Vec<ImageRef>,
) {
    let xobjects = match resources.get(b"XObject").map(|x| resolve(doc, x)) {
        Ok(Ok(Object::Dictionary(xobjects))) => xobjects,
        _ => return,
    };

    for (name, value) in xobjects.iter() {
        let id = match value {
            Object::Reference(id) => *id,
            _ => continue,
        };

        let stream = match doc.get_object(id) {
            Ok(Object::Stream(stream)) => stream,
            Ok(_) => continue,
            Err(e) => {
                warn!(
                    "skipping XObject /{} ({} {} R): {}",
                    String::from_utf8_lossy(name),
                    id.0,
                    id.1,
                    e
                );
                continue;
            }
        };

        match stream.dict.get(b"Subtype") {
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Image" => {
                if seen.insert(id) {
                    images.push(ImageRef::from(id));
                }
            }
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Form" => {
                if !forms.insert(id) {
                    continue;
                }
                if let Ok(Object::Dictionary(form_resources)) = stream
                    .dict
                    .get(b"Resources")
                    .map_err(Into::into)
                    .and_then(|r| resolve(doc, r))
                {
                    collect_images(doc, form_resources, seen, forms, images);
                }
            }
            _ => {}
        }
    }
}
