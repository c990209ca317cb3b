//! `#[epm(...)]` field attributes.
//!
//! Keys:
//! - `target` (required): a `Syndication*` name such as `SyndicationTitle`,
//!   or a slash separated custom element path (`@name` for an attribute)
//! - `path`: sub-path below the field, for mapping into a complex value
//! - `keep_in_content` (default `true`)
//! - `content_kind`: `"text"`, `"html"` or `"xhtml"`
//! - `namespace_uri`, `namespace_prefix`: required / optional for custom targets

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Field, LitBool, LitStr, Type};

use crate::FieldAttrs;

const SYNDICATION_TARGETS: &[(&str, &str)] = &[
    ("SyndicationTitle", "Title"),
    ("SyndicationSummary", "Summary"),
    ("SyndicationRights", "Rights"),
    ("SyndicationUpdated", "Updated"),
    ("SyndicationPublished", "Published"),
    ("SyndicationAuthorName", "AuthorName"),
    ("SyndicationAuthorEmail", "AuthorEmail"),
    ("SyndicationAuthorUri", "AuthorUri"),
    ("SyndicationContributorName", "ContributorName"),
    ("SyndicationContributorEmail", "ContributorEmail"),
    ("SyndicationContributorUri", "ContributorUri"),
    ("SyndicationCategory", "Category"),
];

struct EpmAttr {
    target: LitStr,
    path: Option<String>,
    keep_in_content: Option<LitBool>,
    content_kind: Option<LitStr>,
    namespace_uri: Option<LitStr>,
    namespace_prefix: Option<LitStr>,
}

/// Statements pushing the field's mapping descriptors into `mappings`.
pub fn generate_field_mappings(
    field: &Field,
    property_name: &str,
    attrs: &FieldAttrs,
) -> syn::Result<Vec<TokenStream>> {
    let mut statements = Vec::new();

    for attr in &field.attrs {
        if !attr.path().is_ident("epm") {
            continue;
        }
        let epm = parse_epm_attr(attr)?;
        let descriptor = descriptor_expr(&epm, property_name)?;
        statements.push(quote! { mappings.push(#descriptor); });
    }

    if attrs.complex {
        let inner = option_inner(&field.ty).unwrap_or(&field.ty);
        statements.push(quote! {
            mappings.extend(
                <#inner as ::odata_epm_core::ComplexType>::epm_mappings()
                    .iter()
                    .map(|mapping| mapping.nested_under(#property_name)),
            );
        });
    }

    Ok(statements)
}

fn parse_epm_attr(attr: &syn::Attribute) -> syn::Result<EpmAttr> {
    let mut target = None;
    let mut path = None;
    let mut keep_in_content = None;
    let mut content_kind = None;
    let mut namespace_uri = None;
    let mut namespace_prefix = None;

    attr.parse_nested_meta(|meta| {
        let ident = meta
            .path
            .get_ident()
            .map(ToString::to_string)
            .unwrap_or_default();
        match ident.as_str() {
            "target" => target = Some(meta.value()?.parse::<LitStr>()?),
            "path" => path = Some(meta.value()?.parse::<LitStr>()?.value()),
            "keep_in_content" => keep_in_content = Some(meta.value()?.parse::<LitBool>()?),
            "content_kind" => {
                let value: LitStr = meta.value()?.parse()?;
                if !matches!(value.value().as_str(), "text" | "plaintext" | "html" | "xhtml") {
                    return Err(syn::Error::new_spanned(
                        &value,
                        "content_kind must be \"text\", \"html\" or \"xhtml\"",
                    ));
                }
                content_kind = Some(value);
            }
            "namespace_uri" => namespace_uri = Some(meta.value()?.parse::<LitStr>()?),
            "namespace_prefix" => namespace_prefix = Some(meta.value()?.parse::<LitStr>()?),
            _ => return Err(meta.error("unsupported epm attribute")),
        }
        Ok(())
    })?;

    let Some(target) = target else {
        return Err(syn::Error::new_spanned(attr, "epm mapping requires a target"));
    };

    Ok(EpmAttr {
        target,
        path,
        keep_in_content,
        content_kind,
        namespace_uri,
        namespace_prefix,
    })
}

fn descriptor_expr(epm: &EpmAttr, property_name: &str) -> syn::Result<TokenStream> {
    let source_path = match &epm.path {
        Some(path) => format!("{property_name}/{}", path.trim_matches('/')),
        None => property_name.to_string(),
    };
    let target = epm.target.value();

    let mut descriptor = if target.starts_with("Syndication") {
        let Some((_, variant)) = SYNDICATION_TARGETS.iter().find(|(name, _)| *name == target) else {
            return Err(syn::Error::new_spanned(&epm.target, "unknown syndication target"));
        };
        let variant = format_ident!("{}", variant);
        quote! {
            ::odata_epm_core::MappingDescriptor::syndication(
                #source_path,
                ::odata_epm_core::SyndicationItem::#variant,
            )
        }
    } else {
        let Some(namespace_uri) = &epm.namespace_uri else {
            return Err(syn::Error::new_spanned(
                &epm.target,
                "custom targets require a namespace_uri",
            ));
        };
        let prefix = match &epm.namespace_prefix {
            Some(prefix) => quote! { ::std::option::Option::Some(#prefix) },
            None => quote! { ::std::option::Option::None },
        };
        quote! {
            ::odata_epm_core::MappingDescriptor::custom(#source_path, #namespace_uri, #prefix, #target)
        }
    };

    if let Some(keep) = &epm.keep_in_content {
        descriptor = quote! { #descriptor.with_keep_in_content(#keep) };
    }
    if let Some(kind) = &epm.content_kind {
        let variant = match kind.value().as_str() {
            "html" => format_ident!("Html"),
            "xhtml" => format_ident!("Xhtml"),
            _ => format_ident!("Plaintext"),
        };
        descriptor = quote! {
            #descriptor.with_content_kind(::odata_epm_core::TextContentKind::#variant)
        };
    }

    Ok(descriptor)
}

/// `T` for a field typed `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
