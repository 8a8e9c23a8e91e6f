//! Procedural macros for the modelrest project.
//!
//! `#[derive(Model)]` implements `modelrest::model::Model` for a struct with named fields,
//! producing its static field schema from the field types and attributes:
//!
//! ```ignore
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! #[model(resource = "users", type_name = "User")]
//! pub struct User {
//!     pub id: Option<String>,
//!     #[field(not_empty)]
//!     pub name: String,
//!     #[field(pattern = r"^[^@]+@[^@]+$")]
//!     pub email: Option<String>,
//!     #[field(past)]
//!     pub birth_date: Option<DateTime<Utc>>,
//!     pub roles: Vec<String>,
//! }
//! ```
//!
//! Field kinds are inferred from `String`, `bool`, the integer types,
//! `chrono::DateTime<Utc>` and `Vec<String>`, each optionally wrapped in `Option`.
//! Other types need `#[field(kind = "...")]` or `#[field(skip)]`.

#[allow(unused_extern_crates)]
extern crate self as modelrest_macros;

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Data, DeriveInput, Field, Fields, GenericArgument, LitStr, PathArguments, Type,
    ext::IdentExt, parse_macro_input,
};

const INTEGER_TYPES: [&str; 12] = [
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];

#[proc_macro_derive(Model, attributes(model, field))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_model(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_model(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "`Model` cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => return Err(syn::Error::new_spanned(ident, "`Model` requires named fields")),
        },
        _ => return Err(syn::Error::new_spanned(ident, "`Model` can only be derived for structs")),
    };

    let (type_name, resource) = model_names(input)?;

    let mut id_field = None;
    let mut descriptors = Vec::new();

    for field in fields {
        let name = field_name(field);

        if name == "id" {
            check_id_type(field)?;
            id_field = field.ident.clone();
            continue;
        }

        if let Some(descriptor) = field_descriptor(field, &name)? {
            descriptors.push(descriptor);
        }
    }

    let id_field = id_field.ok_or_else(|| {
        syn::Error::new_spanned(ident, "`Model` requires an `id: Option<String>` field")
    })?;

    Ok(quote! {
        impl ::modelrest::model::Model for #ident {
            fn id(&self) -> ::core::option::Option<&str> {
                self.#id_field.as_deref()
            }

            fn set_id(&mut self, id: ::std::string::String) {
                self.#id_field = ::core::option::Option::Some(id);
            }

            fn schema() -> &'static ::modelrest::schema::ModelSchema {
                static SCHEMA: ::std::sync::OnceLock<::modelrest::schema::ModelSchema> =
                    ::std::sync::OnceLock::new();

                SCHEMA.get_or_init(|| {
                    ::modelrest::schema::ModelSchema::builder(#type_name, #resource)
                        #( .field(#descriptors) )*
                        .build()
                })
            }
        }
    })
}

/// Reads `#[model(type_name = "...", resource = "...")]`, defaulting to the struct name
/// and its lowercase plural.
fn model_names(input: &DeriveInput) -> syn::Result<(LitStr, LitStr)> {
    let mut type_name: Option<LitStr> = None;
    let mut resource: Option<LitStr> = None;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type_name") {
                type_name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("resource") {
                resource = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `type_name` or `resource`"))
            }
        })?;
    }

    let type_name = type_name
        .unwrap_or_else(|| LitStr::new(&input.ident.unraw().to_string(), input.ident.span()));
    let resource = resource.unwrap_or_else(|| {
        LitStr::new(&format!("{}s", type_name.value().to_lowercase()), type_name.span())
    });

    Ok((type_name, resource))
}

fn field_name(field: &Field) -> String {
    field
        .ident
        .as_ref()
        .map(|ident| ident.unraw().to_string())
        .unwrap_or_default()
}

fn check_id_type(field: &Field) -> syn::Result<()> {
    let is_optional_string = option_inner(&field.ty)
        .map(|inner| last_ident(inner).as_deref() == Some("String"))
        .unwrap_or(false);

    if is_optional_string {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(&field.ty, "the `id` field must be `Option<String>`"))
    }
}

/// Builds the `FieldDescriptor` expression for one field, or `None` for skipped fields.
fn field_descriptor(field: &Field, name: &str) -> syn::Result<Option<TokenStream2>> {
    let mut skip = false;
    let mut kind: Option<Ident> = None;
    let mut modifiers = Vec::new();

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("field")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
            } else if meta.path.is_ident("required") {
                modifiers.push(quote! { .required() });
            } else if meta.path.is_ident("not_empty") {
                modifiers.push(quote! { .not_empty() });
            } else if meta.path.is_ident("past") {
                modifiers.push(quote! { .past() });
            } else if meta.path.is_ident("pattern") {
                let pattern: LitStr = meta.value()?.parse()?;
                modifiers.push(quote! { .pattern(#pattern) });
            } else if meta.path.is_ident("kind") {
                let value: LitStr = meta.value()?.parse()?;
                kind = Some(kind_from_name(&value)?);
            } else {
                return Err(meta.error(
                    "expected one of `not_empty`, `required`, `pattern`, `past`, `kind`, `skip`",
                ));
            }

            Ok(())
        })?;
    }

    if skip {
        return Ok(None);
    }

    let kind = match kind.or_else(|| infer_kind(&field.ty)) {
        Some(kind) => kind,
        None => {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "cannot infer a field kind for this type; add #[field(kind = \"...\")] or #[field(skip)]",
            ));
        }
    };

    Ok(Some(quote! {
        ::modelrest::schema::FieldDescriptor::new(#name, ::modelrest::schema::FieldKind::#kind)
            #( #modifiers )*
    }))
}

fn kind_from_name(value: &LitStr) -> syn::Result<Ident> {
    let variant = match value.value().as_str() {
        "string" => "String",
        "boolean" => "Boolean",
        "datetime" => "DateTime",
        "integer" => "Integer",
        "string_list" => "StringList",
        _ => {
            return Err(syn::Error::new_spanned(
                value,
                "expected `string`, `boolean`, `datetime`, `integer` or `string_list`",
            ));
        }
    };

    Ok(Ident::new(variant, Span::call_site()))
}

fn infer_kind(ty: &Type) -> Option<Ident> {
    let ty = option_inner(ty).unwrap_or(ty);
    let name = last_ident(ty)?;

    let variant = match name.as_str() {
        "String" => "String",
        "bool" => "Boolean",
        "DateTime" => "DateTime",
        "Vec" if generic_arg(ty).and_then(last_ident).as_deref() == Some("String") => "StringList",
        other if INTEGER_TYPES.contains(&other) => "Integer",
        _ => return None,
    };

    Some(Ident::new(variant, Span::call_site()))
}

fn last_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|segment| segment.ident.to_string()),
        _ => None,
    }
}

fn generic_arg(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };

    match &path.path.segments.last()?.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    if last_ident(ty).as_deref() == Some("Option") {
        generic_arg(ty)
    } else {
        None
    }
}
