use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments, Type,
    parse_macro_input, spanned::Spanned,
};

/// Derive the `Trackable` entity contract.
///
/// Opt-in is per field: exactly one `#[tracked(key)]` field supplies the
/// entity identity, every other `#[tracked(...)]` field becomes part of the
/// tracking metadata. Untagged fields are invisible to the engine.
///
/// Field attributes:
/// - `#[tracked]`: scalar field, structural equality
/// - `#[tracked(ordered)]`: scalar field, comparison-based equality
/// - `#[tracked(reference)]`: to-one reference
/// - `#[tracked(references)]`: reference collection, optionally with
///   `inverse(ty = "Other", field = "mirror")`
/// - `#[tracked(values)]`: value collection
///
/// The container attribute `#[trackable(name = "...")]` overrides the
/// entity type name (defaults to the struct identifier).
///
/// Besides the trait impl, an inherent `fn trackable_type()` is generated
/// returning the `TrackableType` descriptor for startup registration.
#[proc_macro_derive(Trackable, attributes(trackable, tracked))]
pub fn derive_trackable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_trackable(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TrackedKind {
    Scalar,
    Ordered,
    Reference,
    References,
    Values,
}

struct TrackedField {
    ident: Ident,
    ty: Type,
    kind: TrackedKind,
    inverse: Option<(String, String)>,
}

fn expand_trackable(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident.clone();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Trackable does not support generic structs yet",
        ));
    }

    let entity_name = parse_trackable_name(&input)?.unwrap_or_else(|| struct_name.to_string());

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Trackable can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Trackable requires named fields",
            ));
        }
    };

    let mut key_field: Option<Ident> = None;
    let mut tracked_fields = Vec::<TrackedField>::new();

    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Trackable requires named fields"))?;

        let Some(spec) = parse_tracked_attr(&field)? else {
            continue;
        };

        match spec {
            TrackedSpec::Key => {
                if key_field.is_some() {
                    return Err(syn::Error::new(
                        ident.span(),
                        "only one field may be marked #[tracked(key)]",
                    ));
                }
                key_field = Some(ident);
            }
            TrackedSpec::Field { kind, inverse } => {
                if inverse.is_some() && kind != TrackedKind::References {
                    return Err(syn::Error::new(
                        ident.span(),
                        "inverse(..) is only valid on #[tracked(references)] fields",
                    ));
                }
                tracked_fields.push(TrackedField {
                    ident,
                    ty: field.ty.clone(),
                    kind,
                    inverse,
                });
            }
        }
    }

    let key_field = key_field.ok_or_else(|| {
        syn::Error::new(
            struct_name.span(),
            "Trackable requires exactly one #[tracked(key)] field",
        )
    })?;

    if tracked_fields.is_empty() {
        return Err(syn::Error::new(
            struct_name.span(),
            "Trackable requires at least one tracked field besides the key",
        ));
    }

    let field_arms = tracked_fields.iter().map(field_value_arm);
    let descriptors = tracked_fields.iter().map(descriptor_tokens);

    Ok(quote! {
        impl ::rustentitytrack::Trackable for #struct_name {
            fn entity_type(&self) -> &'static str {
                #entity_name
            }

            fn entity_key(&self) -> Option<::rustentitytrack::EntityKey> {
                ::rustentitytrack::TrackedKey::entity_key(&self.#key_field)
            }

            fn field_value(
                &self,
                field: &str,
            ) -> ::rustentitytrack::Result<::rustentitytrack::TrackedValue> {
                match field {
                    #(#field_arms)*
                    _ => Err(::rustentitytrack::TrackError::UnknownField(
                        field.to_string(),
                        #entity_name.to_string(),
                    )),
                }
            }
        }

        impl #struct_name {
            /// Tracking metadata for startup registration.
            pub fn trackable_type() -> ::rustentitytrack::TrackableType {
                ::rustentitytrack::TrackableType::new(
                    #entity_name,
                    vec![#(#descriptors),*],
                )
            }
        }
    })
}

enum TrackedSpec {
    Key,
    Field {
        kind: TrackedKind,
        inverse: Option<(String, String)>,
    },
}

fn parse_trackable_name(input: &DeriveInput) -> syn::Result<Option<String>> {
    let mut name = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("trackable") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported #[trackable(..)] option, expected `name`"))
            }
        })?;
    }
    Ok(name)
}

fn parse_tracked_attr(field: &syn::Field) -> syn::Result<Option<TrackedSpec>> {
    let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("tracked")) else {
        return Ok(None);
    };

    // Bare `#[tracked]` is a plain scalar field.
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(Some(TrackedSpec::Field {
            kind: TrackedKind::Scalar,
            inverse: None,
        }));
    }

    let mut is_key = false;
    let mut kind: Option<TrackedKind> = None;
    let mut inverse: Option<(String, String)> = None;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("key") {
            is_key = true;
            Ok(())
        } else if meta.path.is_ident("ordered") {
            set_kind(&mut kind, TrackedKind::Ordered, &meta)
        } else if meta.path.is_ident("reference") {
            set_kind(&mut kind, TrackedKind::Reference, &meta)
        } else if meta.path.is_ident("references") {
            set_kind(&mut kind, TrackedKind::References, &meta)
        } else if meta.path.is_ident("values") {
            set_kind(&mut kind, TrackedKind::Values, &meta)
        } else if meta.path.is_ident("inverse") {
            let mut ty = None;
            let mut inverse_field = None;
            meta.parse_nested_meta(|nested| {
                if nested.path.is_ident("ty") {
                    let value: LitStr = nested.value()?.parse()?;
                    ty = Some(value.value());
                    Ok(())
                } else if nested.path.is_ident("field") {
                    let value: LitStr = nested.value()?.parse()?;
                    inverse_field = Some(value.value());
                    Ok(())
                } else {
                    Err(nested.error("expected `ty` or `field`"))
                }
            })?;
            match (ty, inverse_field) {
                (Some(ty), Some(inverse_field)) => {
                    inverse = Some((ty, inverse_field));
                    Ok(())
                }
                _ => Err(meta.error("inverse(..) requires both `ty` and `field`")),
            }
        } else {
            Err(meta.error(
                "unsupported #[tracked(..)] option, expected one of \
                 `key`, `ordered`, `reference`, `references`, `values`, `inverse`",
            ))
        }
    })?;

    if is_key {
        if kind.is_some() || inverse.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "#[tracked(key)] cannot be combined with other options",
            ));
        }
        return Ok(Some(TrackedSpec::Key));
    }

    Ok(Some(TrackedSpec::Field {
        kind: kind.unwrap_or(TrackedKind::Scalar),
        inverse,
    }))
}

fn set_kind(
    slot: &mut Option<TrackedKind>,
    kind: TrackedKind,
    meta: &syn::meta::ParseNestedMeta<'_>,
) -> syn::Result<()> {
    if slot.is_some() {
        return Err(meta.error("conflicting #[tracked(..)] kinds"));
    }
    *slot = Some(kind);
    Ok(())
}

fn field_value_arm(field: &TrackedField) -> TokenStream2 {
    let ident = &field.ident;
    let name = ident.to_string();

    let expr = match field.kind {
        TrackedKind::Scalar => quote! {
            ::rustentitytrack::TrackedFieldValue::tracked_value(&self.#ident)
        },
        TrackedKind::Ordered => quote! {
            ::rustentitytrack::TrackedFieldValue::tracked_value(&self.#ident).into_ordered()
        },
        TrackedKind::Reference => {
            if option_inner(&field.ty).is_some() {
                quote! {
                    match &self.#ident {
                        Some(member) => ::rustentitytrack::TrackedValue::Reference(
                            ::rustentitytrack::AsEntityRef::as_entity_ref(member),
                        ),
                        None => ::rustentitytrack::TrackedValue::Absent,
                    }
                }
            } else {
                quote! {
                    ::rustentitytrack::TrackedValue::Reference(
                        ::rustentitytrack::AsEntityRef::as_entity_ref(&self.#ident),
                    )
                }
            }
        }
        TrackedKind::References => quote! {
            ::rustentitytrack::TrackedReferences::tracked_references(&self.#ident)
        },
        TrackedKind::Values => quote! {
            ::rustentitytrack::TrackedValues::tracked_values(&self.#ident)
        },
    };

    quote! {
        #name => Ok(#expr),
    }
}

fn descriptor_tokens(field: &TrackedField) -> TokenStream2 {
    let name = field.ident.to_string();
    let base = match field.kind {
        TrackedKind::Scalar => quote! {
            ::rustentitytrack::FieldDescriptor::scalar(#name)
        },
        TrackedKind::Ordered => quote! {
            ::rustentitytrack::FieldDescriptor::ordered(#name)
        },
        TrackedKind::Reference => quote! {
            ::rustentitytrack::FieldDescriptor::reference(#name)
        },
        TrackedKind::References => quote! {
            ::rustentitytrack::FieldDescriptor::references(#name)
        },
        TrackedKind::Values => quote! {
            ::rustentitytrack::FieldDescriptor::values(#name)
        },
    };

    match &field.inverse {
        Some((ty, inverse_field)) => quote! {
            #base.with_inverse(#ty, #inverse_field)
        },
        None => base,
    }
}

/// `Option<T>` detection by path shape; type aliases are not seen through.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
