use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod mappings;

/// Derive macro for the `ComplexType` and `ToPropertyValue` traits.
///
/// Each named field becomes a property of the same name; the field type must
/// implement `ToPropertyValue`.
///
/// # Example
///
/// ```ignore
/// use odata_epm_core::ComplexType;
///
/// #[derive(ComplexType)]
/// #[odata(type_name = "NS.Product")]
/// struct Product {
///     #[epm(target = "SyndicationTitle", keep_in_content = false)]
///     name: String,
///     #[odata(rename = "Code")]
///     #[epm(target = "code", namespace_uri = "urn:shop", namespace_prefix = "s")]
///     code: i32,
/// }
/// ```
///
/// # Attributes
///
/// - `#[odata(type_name = "NS.T")]` on the struct - EDM type name (defaults to the struct name)
/// - `#[odata(skip)]` - Leave the field out of the property list
/// - `#[odata(rename = "Name")]` - Use a custom property name
/// - `#[odata(complex)]` - The field's type (or `Option` of it) is itself a
///   `ComplexType`; its mappings are included under this property
/// - `#[epm(target = "...")]` - Map the field; keys are `target`, `path`,
///   `keep_in_content`, `content_kind`, `namespace_uri` and `namespace_prefix`
#[proc_macro_derive(ComplexType, attributes(odata, epm))]
pub fn derive_complex_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_complex_type_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_complex_type_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "ComplexType can only be derived for structs with named fields",
                ));
            }
        },
        syn::Data::Enum(_) => {
            return Err(syn::Error::new_spanned(input, "ComplexType cannot be derived for enums"));
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(input, "ComplexType cannot be derived for unions"));
        }
    };

    let type_name = parse_type_name(&input.attrs)?.unwrap_or_else(|| name.to_string());

    let mut properties = Vec::new();
    let mut mapping_pushes = Vec::new();
    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let property_name = attrs.rename.clone().unwrap_or_else(|| ident.to_string());

        properties.push(quote! {
            ::odata_epm_core::Property::new(
                #property_name,
                ::odata_epm_core::ToPropertyValue::to_property_value(&self.#ident),
            )
        });
        mapping_pushes.extend(mappings::generate_field_mappings(field, &property_name, &attrs)?);
    }

    Ok(quote! {
        impl #impl_generics ::odata_epm_core::ToPropertyValue for #name #ty_generics #where_clause {
            fn to_property_value(&self) -> ::odata_epm_core::PropertyValue {
                ::odata_epm_core::PropertyValue::complex(
                    #type_name,
                    ::odata_epm_core::ComplexType::to_properties(self),
                )
            }

            fn edm_type_name() -> ::std::option::Option<::std::string::String> {
                ::std::option::Option::Some(::std::string::String::from(#type_name))
            }
        }

        impl #impl_generics ::odata_epm_core::ComplexType for #name #ty_generics #where_clause {
            fn type_name() -> &'static str {
                #type_name
            }

            fn to_properties(&self) -> ::std::vec::Vec<::odata_epm_core::Property> {
                ::std::vec![#(#properties),*]
            }

            fn epm_mappings() -> ::std::vec::Vec<::odata_epm_core::MappingDescriptor> {
                #[allow(unused_mut)]
                let mut mappings = ::std::vec::Vec::new();
                #(#mapping_pushes)*
                mappings
            }
        }
    })
}

fn parse_type_name(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut type_name = None;
    for attr in attrs {
        if !attr.path().is_ident("odata") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type_name") {
                let value: syn::LitStr = meta.value()?.parse()?;
                type_name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported odata attribute"))
            }
        })?;
    }
    Ok(type_name)
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub skip: bool,
    pub rename: Option<String>,
    pub complex: bool,
}

pub(crate) fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("odata") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else if meta.path.is_ident("complex") {
                result.complex = true;
            } else {
                return Err(meta.error("unsupported odata attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}
