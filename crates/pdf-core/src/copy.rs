//! Deep copy of objects between documents

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Copies the object graph reachable from one root into another document,
/// assigning fresh object ids in the target.
pub(crate) struct ObjectCopier<'a> {
    source: &'a Document,
    /// Source id -> target id
    mapped: BTreeMap<ObjectId, ObjectId>,
    /// Source ids allocated in the target but not yet copied
    pending: Vec<ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    pub(crate) fn new(source: &'a Document) -> Self {
        Self {
            source,
            mapped: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    /// Rewrite every reference inside `object` to point at target ids,
    /// then copy all objects those references reach.
    ///
    /// Returns the number of indirect objects copied.
    pub(crate) fn copy_into(&mut self, object: &mut Object, target: &mut Document) -> usize {
        self.remap(object, target);

        let mut copied = 0;
        while let Some(source_id) = self.pending.pop() {
            // Dangling references become null, as a reader would treat them
            let mut copy = self
                .source
                .get_object(source_id)
                .cloned()
                .unwrap_or(Object::Null);
            self.remap(&mut copy, target);

            if let Some(&target_id) = self.mapped.get(&source_id) {
                target.objects.insert(target_id, copy);
                copied += 1;
            }
        }
        copied
    }

    fn remap(&mut self, object: &mut Object, target: &mut Document) {
        match object {
            Object::Reference(id) => *id = self.target_id(*id, target),
            Object::Array(items) => {
                for item in items.iter_mut() {
                    self.remap(item, target);
                }
            }
            Object::Dictionary(dict) => self.remap_dict(dict, target),
            Object::Stream(stream) => self.remap_dict(&mut stream.dict, target),
            _ => {}
        }
    }

    fn remap_dict(&mut self, dict: &mut Dictionary, target: &mut Document) {
        // Annotations point at their page through /P, page tree nodes
        // through /Parent. Following either drags in every source page.
        // Structure elements use /P for their parent element; keep it.
        if dict.has(b"Subtype") {
            dict.remove(b"P");
        }
        let in_page_tree = dict
            .get(b"Type")
            .and_then(Object::as_name)
            .map(|name| matches!(name, b"Page" | b"Pages"))
            .unwrap_or(false);
        if in_page_tree {
            dict.remove(b"Parent");
        }
        for (_, value) in dict.iter_mut() {
            self.remap(value, target);
        }
    }

    fn target_id(&mut self, source_id: ObjectId, target: &mut Document) -> ObjectId {
        if let Some(&id) = self.mapped.get(&source_id) {
            return id;
        }
        let id = target.new_object_id();
        self.mapped.insert(source_id, id);
        self.pending.push(source_id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_copies_reachable_objects_with_new_ids() {
        let mut source = Document::with_version("1.7");
        let shared = source.add_object(dictionary! { "Kind" => "Shared" });
        let stream = source.add_object(Stream::new(dictionary! {}, b"0 0 m".to_vec()));
        let _unrelated = source.add_object(dictionary! { "Kind" => "Unrelated" });

        let mut target = Document::with_version("1.7");
        target.add_object(dictionary! { "Existing" => true });

        let mut root = Object::Dictionary(dictionary! {
            "A" => shared,
            "B" => vec![Object::Reference(shared), Object::Reference(stream)],
        });

        let copied = ObjectCopier::new(&source).copy_into(&mut root, &mut target);

        // shared is referenced twice but copied once
        assert_eq!(copied, 2);
        assert_eq!(target.objects.len(), 3);

        let dict = root.as_dict().unwrap();
        let new_shared = dict.get(b"A").unwrap().as_reference().unwrap();
        assert_ne!(new_shared, shared);
        assert_eq!(
            target.get_object(new_shared).unwrap().as_dict().unwrap().get(b"Kind").unwrap().as_name().unwrap(),
            b"Shared"
        );
    }

    #[test]
    fn test_backlinks_are_dropped() {
        let mut source = Document::with_version("1.7");
        let pages = source.add_object(dictionary! { "Type" => "Pages" });
        let annot = source.add_object(dictionary! { "Subtype" => "Text", "P" => pages });

        let mut target = Document::with_version("1.7");
        let mut root = Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages,
            "Annots" => vec![Object::Reference(annot)],
        });

        let copied = ObjectCopier::new(&source).copy_into(&mut root, &mut target);

        assert_eq!(copied, 1);
        assert!(root.as_dict().unwrap().get(b"Parent").is_err());
    }

    #[test]
    fn test_form_field_parent_is_kept() {
        let mut source = Document::with_version("1.7");
        let field = source.add_object(dictionary! { "FT" => "Tx" });
        let widget = source.add_object(dictionary! { "Subtype" => "Widget", "Parent" => field });

        let mut target = Document::with_version("1.7");
        let mut root = Object::Array(vec![Object::Reference(widget)]);

        let copied = ObjectCopier::new(&source).copy_into(&mut root, &mut target);

        assert_eq!(copied, 2);
    }

    #[test]
    fn test_structure_element_parent_is_kept() {
        let mut source = Document::with_version("1.7");
        let tree_root = source.add_object(dictionary! { "Type" => "StructTreeRoot" });
        let element = source.add_object(dictionary! {
            "Type" => "StructElem",
            "S" => "P",
            "P" => tree_root,
        });

        let mut target = Document::with_version("1.7");
        let mut root = Object::Dictionary(dictionary! { "StructParent" => element });

        let copied = ObjectCopier::new(&source).copy_into(&mut root, &mut target);

        assert_eq!(copied, 2);
        let new_element = root.as_dict().unwrap().get(b"StructParent").unwrap().as_reference().unwrap();
        let parent = target
            .get_object(new_element)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"P")
            .unwrap()
            .as_reference()
            .unwrap();
        assert_eq!(
            target.get_object(parent).unwrap().as_dict().unwrap().get(b"Type").unwrap().as_name().unwrap(),
            b"StructTreeRoot"
        );
    }

    #[test]
    fn test_dangling_reference_becomes_null() {
        let source = Document::with_version("1.7");
        let mut target = Document::with_version("1.7");
        let mut root = Object::Dictionary(dictionary! { "Missing" => Object::Reference((99, 0)) });

        let copied = ObjectCopier::new(&source).copy_into(&mut root, &mut target);

        assert_eq!(copied, 1);
        let id = root.as_dict().unwrap().get(b"Missing").unwrap().as_reference().unwrap();
        assert_eq!(target.get_object(id).unwrap(), &Object::Null);
    }
}
