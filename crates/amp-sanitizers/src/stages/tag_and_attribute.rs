//! Allow-list enforcement.

use amp_dom::{Document, NodeId};

use super::allowlist::{AllowList, TagPolicy};
use super::convert_each;
use crate::{Args, SanitizeError, Sanitizer};

/// Removes everything the AMP allow-list does not permit.
///
/// Dangerous tags are removed with their content, other unknown tags are
/// replaced by their children, and disallowed attributes are dropped
/// (including `on*` handlers and `javascript:` URLs). `data-*` and `aria-*`
/// attributes are always kept.
///
/// Unwrapping can hoist content where the HTML parser would not leave it
/// (block content into a `p`, a `li` into another `li`). The stage then
/// re-parses its own output and enforces again until the markup is stable,
/// so running it twice changes nothing the second time.
///
/// Arguments:
/// - `allowed_tags`: extra tag names to keep.
/// - `allowed_attributes`: extra attribute names to keep on any tag.
#[derive(Debug, Default)]
pub struct TagAndAttributeSanitizer;

/// Upper bound on enforce-and-reparse rounds.
const MAX_PASSES: usize = 4;

impl TagAndAttributeSanitizer {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sanitizer for TagAndAttributeSanitizer {
    fn name(&self) -> &'static str {
        "tag_and_attribute"
    }

    fn sanitize(&mut self, doc: &mut Document, args: &Args) -> Result<usize, SanitizeError> {
        let allow_list = AllowList::from_args(args);
        let mut changed = 0;

        for _ in 0..MAX_PASSES {
            let mut unwrapped = false;
            let elements = doc.elements();
            changed += convert_each(self.name(), doc, &elements, |doc, id| {
                let policy = allow_list.tag_policy(doc, id);
                unwrapped |= policy == TagPolicy::Unwrap;
                enforce(&allow_list, policy, doc, id)
            });
            if !unwrapped {
                return Ok(changed);
            }

            // Hoisted children can form markup the parser would rebuild
            // differently (a `div` lifted into a `p`). Settle on the parsed form.
            let html = doc.to_html();
            let reparsed = Document::parse(&html);
            if reparsed.to_html() == html {
                return Ok(changed);
            }
            tracing::debug!(stage = self.name(), "unwrapped markup restructured by the parser");
            *doc = reparsed;
        }

        tracing::warn!(stage = self.name(), passes = MAX_PASSES, "allow-list did not settle");
        Ok(changed)
    }
}

/// Apply `policy` to one element. Returns whether anything changed.
fn enforce(
    allow_list: &AllowList,
    policy: TagPolicy,
    doc: &mut Document,
    id: NodeId,
) -> Result<bool, SanitizeError> {
    match policy {
        TagPolicy::Remove => {
            doc.detach(id);
            Ok(true)
        }
        TagPolicy::Unwrap => {
            doc.unwrap_node(id)?;
            Ok(true)
        }
        TagPolicy::Keep => Ok(filter_attributes(allow_list, doc, id)),
    }
}

fn filter_attributes(allow_list: &AllowList, doc: &mut Document, id: NodeId) -> bool {
    let Some(tag) = doc.tag(id).map(str::to_owned) else {
        return false;
    };
    let Some(attrs) = doc.attrs_mut(id) else {
        return false;
    };
    let before = attrs.len();
    attrs.retain(|name, value| allow_list.allows_attr(&tag, name, value));
    attrs.len() != before
}
