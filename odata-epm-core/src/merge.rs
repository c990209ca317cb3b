//! Reconciling user supplied ATOM metadata with the metadata implied by EPM
//! mappings.

use std::borrow::Cow;

use tracing::{debug, instrument};

use crate::atom::{AtomEntryMetadata, AtomTextConstruct};
use crate::behavior::WriterBehavior;
use crate::error::{EpmError, Result};
use crate::value::format_timestamp;

/// Merges `custom` metadata into the EPM-synthesized `epm` metadata.
///
/// When either side is absent the other is returned as is; a lone `custom`
/// is returned borrowed. Otherwise the EPM container becomes the result:
/// scalar fields present on both sides must be equal, list fields are
/// concatenated with the EPM items first, and `source` always comes from
/// `custom`.
///
/// When the writer behavior echoes timestamp strings, `published_string` and
/// `updated_string` are compared as text: `2011-03-04T05:06:07Z` and
/// `2011-03-04T05:06:07+00:00` conflict even though they name the same
/// instant.
#[instrument(skip_all)]
pub fn merge<'a>(
    custom: Option<&'a AtomEntryMetadata>,
    epm: Option<AtomEntryMetadata>,
    behavior: &WriterBehavior,
) -> Result<Option<Cow<'a, AtomEntryMetadata>>> {
    let (custom, mut epm) = match (custom, epm) {
        (None, None) => return Ok(None),
        (Some(custom), None) => return Ok(Some(Cow::Borrowed(custom))),
        (None, Some(epm)) => return Ok(Some(Cow::Owned(epm))),
        (Some(custom), Some(epm)) => (custom, epm),
    };

    merge_scalar("Title", &mut epm.title, &custom.title, describe_text)?;
    merge_scalar("Summary", &mut epm.summary, &custom.summary, describe_text)?;
    merge_scalar("Rights", &mut epm.rights, &custom.rights, describe_text)?;

    if behavior.uses_string_timestamps() {
        merge_scalar("Published", &mut epm.published_string, &custom.published_string, String::clone)?;
        merge_scalar("Updated", &mut epm.updated_string, &custom.updated_string, String::clone)?;
    }
    merge_scalar("Published", &mut epm.published, &custom.published, format_timestamp)?;
    merge_scalar("Updated", &mut epm.updated, &custom.updated, format_timestamp)?;

    concat(&mut epm.authors, &custom.authors);
    concat(&mut epm.contributors, &custom.contributors);
    concat(&mut epm.categories, &custom.categories);
    concat(&mut epm.links, &custom.links);

    debug_assert!(epm.source.is_none(), "mapped metadata never carries a source");
    epm.source = custom.source.clone();

    debug!("merged custom and mapped entry metadata");
    Ok(Some(Cow::Owned(epm)))
}

/// Takes `custom` when the mapped side is absent; both present must agree.
fn merge_scalar<T: Clone + PartialEq>(
    field: &'static str,
    epm: &mut Option<T>,
    custom: &Option<T>,
    describe: impl Fn(&T) -> String,
) -> Result<()> {
    let Some(custom) = custom else {
        return Ok(());
    };
    match epm {
        None => {
            *epm = Some(custom.clone());
            Ok(())
        }
        Some(mapped) if *mapped == *custom => Ok(()),
        Some(mapped) => Err(EpmError::MetadataConflict {
            field,
            custom: describe(custom),
            epm: describe(mapped),
        }),
    }
}

fn describe_text(construct: &AtomTextConstruct) -> String {
    construct.text.clone().unwrap_or_default()
}

fn concat<T: Clone>(epm: &mut Option<Vec<T>>, custom: &Option<Vec<T>>) {
    if let Some(custom) = custom {
        epm.get_or_insert_with(Vec::new).extend(custom.iter().cloned());
    }
}
