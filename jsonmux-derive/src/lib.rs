//! `#[derive(DemuxSchema)]` — generates a [`jsonmux::Schema`] and typed
//! field accessors from a plain struct definition, so callers don't
//! hand-write the `SchemaBuilder` call themselves.
//!
//! ```ignore
//! #[derive(DemuxSchema)]
//! struct Message {
//!     role: String,
//!     #[demux(enumerated("low", "medium", "high"))]
//!     priority: String,
//!     #[demux(stream)]
//!     body: String,
//! }
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

#[proc_macro_derive(DemuxSchema, attributes(demux))]
pub fn derive_demux_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(&input, "DemuxSchema requires named fields")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "DemuxSchema can only be derived for structs")
                .to_compile_error()
                .into()
        }
    };

    let mut schema_fields = Vec::new();
    let mut accessors = Vec::new();

    for field in fields {
        let field_ident = field.ident.clone().expect("named field");
        let field_name = field_ident.to_string();
        let attrs = match DemuxFieldAttrs::parse(field) {
            Ok(attrs) => attrs,
            Err(e) => return e.to_compile_error().into(),
        };

        if attrs.stream {
            schema_fields.push(quote! {
                .field(#field_name, ::jsonmux::SinkKind::Stream, ::jsonmux::ValueKind::String)
            });
            let getter = format_ident!("{}_stream", field_ident);
            accessors.push(quote! {
                /// Returns a replay cursor over this field's fragments.
                pub fn #getter(demux: &::jsonmux::Demux) -> Option<::jsonmux::sink::StreamCursor<'_, char>> {
                    demux.stream(#field_name).map(::jsonmux::sink::StreamSink::iterate)
                }
            });
            continue;
        }

        if let Some(members) = &attrs.enumerated {
            schema_fields.push(quote! {
                .field(
                    #field_name,
                    ::jsonmux::SinkKind::Single,
                    ::jsonmux::ValueKind::Enumerated(::std::sync::Arc::new(
                        ::std::collections::BTreeSet::from([#(#members.to_string()),*])
                    )),
                )
            });
            accessors.push(scalar_accessor(&field_ident, &field_name, quote! { String }, quote! {
                ::jsonmux::DemuxValue::Enumerated(v) => Ok(v),
            }));
            continue;
        }

        let value_kind = match rust_type_to_value_kind(&field.ty) {
            Some(vk) => vk,
            None => {
                return syn::Error::new_spanned(
                    &field.ty,
                    "unsupported field type for DemuxSchema (expected String, an integer, a float or bool)",
                )
                .to_compile_error()
                .into()
            }
        };
        schema_fields.push(quote! {
            .field(#field_name, ::jsonmux::SinkKind::Single, #value_kind)
        });
        accessors.push(scalar_accessor_for_kind(&field_ident, &field_name, &field.ty));
    }

    let expanded = quote! {
        impl ::jsonmux::DemuxSchemaDef for #struct_name {
            fn demux_schema() -> ::jsonmux::Schema {
                ::jsonmux::SchemaBuilder::new()
                    #(#schema_fields)*
                    .build()
            }
        }

        impl #struct_name {
            #(#accessors)*
        }
    };

    expanded.into()
}

struct DemuxFieldAttrs {
    stream: bool,
    enumerated: Option<Vec<syn::LitStr>>,
}

impl DemuxFieldAttrs {
    fn parse(field: &syn::Field) -> syn::Result<Self> {
        let mut stream = false;
        let mut enumerated = None;
        for attr in &field.attrs {
            if !attr.path().is_ident("demux") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("stream") {
                    stream = true;
                    return Ok(());
                }
                if meta.path.is_ident("enumerated") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let members =
                        content.parse_terminated(<syn::LitStr as syn::parse::Parse>::parse, syn::Token![,])?;
                    enumerated = Some(members.into_iter().collect());
                    return Ok(());
                }
                Err(meta.error("unrecognized demux attribute"))
            })?;
        }
        Ok(Self { stream, enumerated })
    }
}

fn rust_type_to_value_kind(ty: &Type) -> Option<proc_macro2::TokenStream> {
    let Type::Path(p) = ty else { return None };
    let ident = p.path.segments.last()?.ident.to_string();
    Some(match ident.as_str() {
        "String" => quote! { ::jsonmux::ValueKind::String },
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "usize" | "isize" => {
            quote! { ::jsonmux::ValueKind::Integer }
        }
        "f32" | "f64" => quote! { ::jsonmux::ValueKind::Float },
        "bool" => quote! { ::jsonmux::ValueKind::Boolean },
        _ => return None,
    })
}

fn scalar_accessor(
    field_ident: &syn::Ident,
    field_name: &str,
    rust_ty: proc_macro2::TokenStream,
    match_arm: proc_macro2::TokenStream,
) -> proc_macro2::TokenStream {
    quote! {
        /// Awaits this field's value, coerced to its declared Rust type.
        pub async fn #field_ident(demux: &::jsonmux::Demux) -> Option<::std::result::Result<#rust_ty, ::jsonmux::DemuxError>> {
            let sink = demux.get(#field_name)?;
            Some(match sink.get().await {
                Ok(value) => match value {
                    #match_arm
                    other => unreachable!("schema guarantees {:?} coerces to the declared type", other),
                },
                Err(e) => Err(e),
            })
        }
    }
}

fn scalar_accessor_for_kind(field_ident: &syn::Ident, field_name: &str, ty: &Type) -> proc_macro2::TokenStream {
    let Type::Path(p) = ty else {
        return quote! {};
    };
    let ident = p.path.segments.last().map(|s| s.ident.to_string()).unwrap_or_default();
    match ident.as_str() {
        "String" => scalar_accessor(field_ident, field_name, quote! { String }, quote! {
            ::jsonmux::DemuxValue::String(v) => Ok(v),
        }),
        "bool" => scalar_accessor(field_ident, field_name, quote! { bool }, quote! {
            ::jsonmux::DemuxValue::Boolean(v) => Ok(v),
        }),
        "f32" => scalar_accessor(field_ident, field_name, quote! { f32 }, quote! {
            ::jsonmux::DemuxValue::Float(v) => Ok(v as f32),
        }),
        "f64" => scalar_accessor(field_ident, field_name, quote! { f64 }, quote! {
            ::jsonmux::DemuxValue::Float(v) => Ok(v),
        }),
        "i64" => scalar_accessor(field_ident, field_name, quote! { i64 }, quote! {
            ::jsonmux::DemuxValue::Integer(v) => Ok(v),
        }),
        narrow @ ("i8" | "i16" | "i32" | "u8" | "u16" | "u32" | "u64" | "usize" | "isize") => {
            let ty_ident = format_ident!("{narrow}");
            scalar_accessor(field_ident, field_name, quote! { #ty_ident }, quote! {
                ::jsonmux::DemuxValue::Integer(v) => ::std::convert::TryInto::<#ty_ident>::try_into(v)
                    .map_err(|_| ::jsonmux::DemuxError::NumericOverflow {
                        field: #field_name.to_string(),
                        raw: v.to_string(),
                    }),
            })
        }
        _ => scalar_accessor(field_ident, field_name, quote! { i64 }, quote! {
            ::jsonmux::DemuxValue::Integer(v) => Ok(v),
        }),
    }
}
